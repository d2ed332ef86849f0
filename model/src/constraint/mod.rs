//! Constraint algebra (§3.6, §4.4–§4.6): atomic task/resource constraints
//! plus the recursive first-order combinators over them, flattened into a
//! single tagged `Constraint` type per the design notes' resolution of the
//! "deep class hierarchy" translation strategy.

pub mod fol;
pub mod resource;
pub mod task;

use crate::ctx::EncoderCtx;
use crate::error::EncodingError;
use crate::ids::{ConstraintId, Label};
use crate::resolved::Resolved;
use fol::FolConstraint;
use resource::ResourceConstraint;
use smt_backend::{bvar, implies, BoolExpr, SmtBackend, VarId};
use task::TaskConstraint;

pub enum ConstraintBody {
    Task(TaskConstraint),
    Resource(ResourceConstraint),
    Fol(FolConstraint),
}

pub struct Constraint {
    pub(crate) id: ConstraintId,
    pub(crate) label: Label,
    pub(crate) optional: bool,
    pub(crate) body: ConstraintBody,
}

impl Constraint {
    pub fn new(label: impl Into<Label>, body: ConstraintBody) -> Self {
        Constraint {
            id: ConstraintId::next(),
            label: label.into(),
            optional: false,
            body,
        }
    }

    pub fn task(label: impl Into<Label>, body: TaskConstraint) -> Self {
        Constraint::new(label, ConstraintBody::Task(body))
    }

    pub fn resource(label: impl Into<Label>, body: ResourceConstraint) -> Self {
        Constraint::new(label, ConstraintBody::Resource(body))
    }

    pub fn fol(label: impl Into<Label>, body: FolConstraint) -> Self {
        Constraint::new(label, ConstraintBody::Fol(body))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The constraint's own semantic condition, not yet gated by its
    /// `optional`/`applied` flag — the piece combinators reify directly.
    pub(crate) fn body<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, resolved: &Resolved) -> Result<BoolExpr, EncodingError> {
        match &self.body {
            ConstraintBody::Task(t) => t.body(ctx, resolved),
            ConstraintBody::Resource(r) => Ok(r.body(ctx, resolved)),
            ConstraintBody::Fol(f) => f.body(ctx, resolved),
        }
    }

    /// Asserts this constraint into the model, introducing and returning
    /// its `applied` boolean when `optional`.
    pub fn assert<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, resolved: &Resolved) -> Result<Option<VarId>, EncodingError> {
        let body = self.body(ctx, resolved)?;
        let uid = self.id.uid();
        Ok(if self.optional {
            let applied = ctx.new_bool("Constraint", &self.label, uid, "applied");
            ctx.assert_named(self.label.clone(), implies(bvar(applied), body));
            Some(applied)
        } else {
            ctx.assert_named(self.label.clone(), body);
            None
        })
    }
}
