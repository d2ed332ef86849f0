//! Resource entity (§3.2, §4.3): atomic `Worker`/`CumulativeWorker`
//! variants plus the `SelectWorkers` choice node.

use crate::ctx::EncoderCtx;
use crate::error::ModelError;
use crate::functions::Function;
use crate::ids::{Label, ResourceId};
use smt_backend::{eq, ge, le, IntCst, LinExpr, SmtBackend, VarId};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum ResourceKind {
    Worker,
    /// Internally "`size` virtual Worker slots"; the capacity bound is
    /// enforced directly as a per-event-instant counting clause (§4.3)
    /// rather than by materializing `size` separate Worker entities.
    CumulativeWorker { size: IntCst },
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) label: Label,
    pub(crate) kind: ResourceKind,
    pub(crate) productivity: IntCst,
    pub(crate) cost: Option<Function>,
}

impl Resource {
    pub fn worker(label: impl Into<Label>, productivity: IntCst) -> ResourceBuilder {
        ResourceBuilder {
            resource: Resource {
                id: ResourceId::next(),
                label: label.into(),
                kind: ResourceKind::Worker,
                productivity,
                cost: None,
            },
        }
    }

    pub fn cumulative_worker(label: impl Into<Label>, size: IntCst, productivity: IntCst) -> ResourceBuilder {
        ResourceBuilder {
            resource: Resource {
                id: ResourceId::next(),
                label: label.into(),
                kind: ResourceKind::CumulativeWorker { size },
                productivity,
                cost: None,
            },
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn productivity(&self) -> IntCst {
        self.productivity
    }

    pub fn capacity(&self) -> IntCst {
        match self.kind {
            ResourceKind::Worker => 1,
            ResourceKind::CumulativeWorker { size } => size,
        }
    }

    pub fn cost(&self) -> Option<&Function> {
        self.cost.as_ref()
    }
}

pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    pub fn cost(mut self, f: Function) -> Self {
        self.resource.cost = Some(f);
        self
    }

    pub fn build(self) -> Result<Resource, ModelError> {
        let r = self.resource;
        if r.productivity < 0 {
            return Err(ModelError::NegativeValue {
                entity: r.label.clone(),
                field: "productivity",
                value: r.productivity,
            });
        }
        if let ResourceKind::CumulativeWorker { size } = r.kind {
            if size < 1 {
                return Err(ModelError::NegativeValue {
                    entity: r.label.clone(),
                    field: "size",
                    value: size,
                });
            }
        }
        if let Some(f) = &r.cost {
            f.validate(&r.label, "cost")?;
        }
        Ok(r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectKind {
    Exact,
    Min,
    Max,
}

/// A choice node, not itself a resource: picks `n` workers out of `list`
/// under `kind`, guarding each candidate's participation by its own
/// `picked_w` boolean (§3.2).
#[derive(Debug, Clone)]
pub struct SelectWorkers {
    pub(crate) id: ResourceId,
    pub(crate) label: Label,
    pub(crate) candidates: Vec<Label>,
    pub(crate) n: IntCst,
    pub(crate) kind: SelectKind,
}

impl SelectWorkers {
    pub fn new(label: impl Into<Label>, candidates: Vec<Label>, n: IntCst, kind: SelectKind) -> Result<Self, ModelError> {
        let label = label.into();
        if n < 0 || n as usize > candidates.len() {
            return Err(ModelError::SelectWorkersCountOutOfRange {
                name: label,
                n,
                pool_size: candidates.len(),
            });
        }
        Ok(SelectWorkers {
            id: ResourceId::next(),
            label,
            candidates,
            n,
            kind,
        })
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn candidates(&self) -> &[Label] {
        &self.candidates
    }

    pub fn encode<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>) -> HashMap<Label, VarId> {
        let uid = self.id.uid();
        let mut picked = HashMap::new();
        for candidate in &self.candidates {
            let v = ctx.new_bool("SelectWorkers", &self.label, uid, &format!("picked_{candidate}"));
            picked.insert(candidate.clone(), v);
        }
        let sum = LinExpr::sum(picked.values().map(|v| LinExpr::var(*v)));
        let clause = match self.kind {
            SelectKind::Exact => eq(sum, LinExpr::constant(self.n)),
            SelectKind::Min => ge(sum, LinExpr::constant(self.n)),
            SelectKind::Max => le(sum, LinExpr::constant(self.n)),
        };
        ctx.assert_named(format!("{}_cardinality", self.label), clause);
        picked
    }
}
