//! Objective entity (§3.5): a named target over an indicator.

use crate::ids::{Label, ObjectiveId};
use smt_backend::IntCst;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    Minimize,
    Maximize,
    /// A target value rather than a direction: encoded by the solver
    /// driver as an equality constraint on the indicator rather than fed
    /// into the weighted sum.
    Exact(IntCst),
}

#[derive(Debug, Clone)]
pub struct Objective {
    pub(crate) id: ObjectiveId,
    pub(crate) label: Label,
    pub(crate) indicator: Label,
    pub(crate) kind: ObjectiveKind,
    pub(crate) weight: IntCst,
}

impl Objective {
    pub fn new(label: impl Into<Label>, indicator: impl Into<Label>, kind: ObjectiveKind, weight: IntCst) -> Self {
        Objective {
            id: ObjectiveId::next(),
            label: label.into(),
            indicator: indicator.into(),
            kind,
            weight: weight.max(1),
        }
    }

    pub fn minimize(label: impl Into<Label>, indicator: impl Into<Label>) -> Self {
        Objective::new(label, indicator, ObjectiveKind::Minimize, 1)
    }

    pub fn maximize(label: impl Into<Label>, indicator: impl Into<Label>) -> Self {
        Objective::new(label, indicator, ObjectiveKind::Maximize, 1)
    }

    pub fn with_weight(mut self, w: IntCst) -> Self {
        self.weight = w.max(1);
        self
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn indicator(&self) -> &Label {
        &self.indicator
    }

    pub fn kind(&self) -> ObjectiveKind {
        self.kind
    }

    pub fn weight(&self) -> IntCst {
        self.weight
    }
}
