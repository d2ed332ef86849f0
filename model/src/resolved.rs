//! The resolved-variable bag threaded between encoding phases: once tasks,
//! select nodes and buffers have contributed their variables, indicators,
//! constraints and objectives all look them up here by label rather than
//! re-deriving them, matching §9's "name-indexed arena ... `EncoderCtx`
//! that exposes variable lookup" translation strategy for cyclic
//! cross-references.

use crate::buffer::BufferVars;
use crate::ctx::Horizon;
use crate::error::EncodingError;
use crate::ids::Label;
use crate::task::TaskVars;
use smallvec::SmallVec;
use smt_backend::{BoolExpr, IntCst, VarId};
use std::collections::HashMap;

/// Most resources see only a handful of candidate tasks; inlining up to 4
/// avoids a heap allocation for the common case.
pub type UsageList = SmallVec<[ResourceUsage; 4]>;

/// One task's participation in a resource, with the guard under which its
/// non-overlap / cumulative-capacity clauses are active.
#[derive(Debug, Clone)]
pub struct ResourceUsage {
    pub task: Label,
    pub guard: BoolExpr,
    pub dynamic: bool,
}

#[derive(Default)]
pub struct Resolved {
    pub tasks: HashMap<Label, TaskVars>,
    pub select: HashMap<Label, HashMap<Label, VarId>>,
    pub buffers: HashMap<Label, BufferVars>,
    pub resource_usage: HashMap<Label, UsageList>,
    pub join_vars: HashMap<(Label, Label), VarId>,
    pub horizon: Option<Horizon>,
    /// Every task's `due_date`, present whether or not it is a hard
    /// deadline — indicators such as `Tardiness` use it as a soft target
    /// regardless of `due_date_is_deadline`.
    pub due_dates: HashMap<Label, IntCst>,
}

impl Resolved {
    pub fn new() -> Self {
        Resolved::default()
    }

    pub fn task(&self, label: &str) -> Result<&TaskVars, EncodingError> {
        self.tasks.get(label).ok_or_else(|| EncodingError::UnknownTask { task: label.into() })
    }

    pub fn buffer(&self, label: &str) -> Result<&BufferVars, EncodingError> {
        self.buffers.get(label).ok_or_else(|| EncodingError::UnknownBuffer { buffer: label.into() })
    }

    pub fn horizon(&self) -> &Horizon {
        self.horizon.as_ref().expect("horizon resolved before use")
    }
}
