//! Declarative resource-constrained scheduling model: build a `Problem` out
//! of tasks, resources, buffers, constraints, indicators and objectives,
//! then `encode` it against any `smt_backend::SmtBackend` implementation.

pub mod arith;
pub mod buffer;
pub mod constraint;
pub mod ctx;
pub mod error;
pub mod functions;
pub mod ids;
pub mod indicator;
pub mod objective;
pub mod problem;
pub mod registry;
pub mod resolved;
pub mod resource;
pub mod task;

pub use buffer::{Buffer, BufferBuilder, BufferEvent, BufferVars, EventKind};
pub use constraint::fol::FolConstraint;
pub use constraint::resource::ResourceConstraint;
pub use constraint::task::{CmpKind, CountKind, PrecedenceKind, TaskConstraint};
pub use constraint::{Constraint, ConstraintBody};
pub use ctx::{DebugGuard, EncoderCtx, Horizon};
pub use error::{EncodingError, ModelError, RcpspError};
pub use functions::{Accumulator, Function, Rational};
pub use ids::{BufferId, ConstraintId, IndicatorId, Label, ObjectiveId, ResourceId, TaskId};
pub use indicator::{Indicator, IndicatorKind};
pub use objective::{Objective, ObjectiveKind};
pub use problem::{EncodedProblem, HorizonSpec, Problem};
pub use resolved::{Resolved, ResourceUsage};
pub use resource::{Resource, ResourceBuilder, ResourceKind, SelectKind, SelectWorkers};
pub use task::{DurationPolicy, ResourceRequirement, Task, TaskBuilder, TaskVars};
