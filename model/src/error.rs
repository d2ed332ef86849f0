//! Error kinds raised during model construction and encoding.

use crate::ids::Label;

/// Failures raised while building entities, before any SMT assertion exists.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate {kind} name {name:?}")]
    DuplicateName { kind: &'static str, name: Label },

    #[error("{entity:?}.{field} must be non-negative, got {value}")]
    NegativeValue {
        entity: Label,
        field: &'static str,
        value: i64,
    },

    #[error("task {task:?} has inconsistent duration bounds: min {min} > max {max}")]
    InconsistentDurationBounds { task: Label, min: i64, max: i64 },

    #[error("task {task:?} has an empty allowed-durations set")]
    EmptyAllowedDurations { task: Label },

    #[error("buffer {buffer:?} has crossing bounds: lower {lower} > upper {upper}")]
    BufferBoundsCrossing { buffer: Label, lower: i64, upper: i64 },

    #[error("resource {resource:?} cannot be assigned to itself on task {task:?}")]
    ResourceSelfAssignment { task: Label, resource: Label },

    #[error("SelectWorkers {name:?} requires n={n} out of range for a pool of {pool_size} candidates")]
    SelectWorkersCountOutOfRange { name: Label, n: i64, pool_size: usize },

    #[error("{entity:?}.{field} has a non-integer coefficient: {value}")]
    NonIntegerCoefficient {
        entity: Label,
        field: &'static str,
        value: f64,
    },

    #[error("unknown {kind} reference {name:?}")]
    UnknownReference { kind: &'static str, name: Label },

    #[error("problem is already solving or solved; no further entities may be added")]
    ProblemFrozen,
}

/// Failures raised while translating a frozen model into SMT assertions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("objective {objective:?} references indicator {indicator:?}, which is not in the problem")]
    UnknownIndicator { objective: Label, indicator: Label },

    #[error("task {task:?} has dynamic worker {worker:?} but is not optional, so it lacks a scheduled guard")]
    DynamicWorkerMissingScheduledGuard { task: Label, worker: Label },

    #[error("reference to unknown task {task:?}")]
    UnknownTask { task: Label },

    #[error("reference to unknown resource {resource:?}")]
    UnknownResource { resource: Label },

    #[error("reference to unknown buffer {buffer:?}")]
    UnknownBuffer { buffer: Label },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RcpspError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
