//! First-order-logic combinators (§4.6): each reifies its children by a
//! fresh boolean equivalent to the conjunction of that child's own emitted
//! clauses, then composes those reification booleans.

use crate::constraint::Constraint;
use crate::ctx::EncoderCtx;
use crate::error::EncodingError;
use crate::resolved::Resolved;
use smt_backend::{and, bvar, iff, implies, ite_bool, not, or, xor, BoolExpr, SmtBackend};

pub enum FolConstraint {
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Xor(Box<Constraint>, Box<Constraint>),
    Not(Box<Constraint>),
    /// `cond => AND(children)`, where `cond` is itself a raw boolean term
    /// over resolved variables (e.g. another constraint's reified body).
    Implies(Box<Constraint>, Vec<Constraint>),
    IfThenElse(Box<Constraint>, Vec<Constraint>, Vec<Constraint>),
    /// Passes a raw boolean term straight into the pool.
    FromExpression(std::sync::Arc<dyn Fn(&Resolved) -> Result<BoolExpr, EncodingError> + Send + Sync>),
}

/// Reifies `constraint` behind a fresh boolean equivalent to its body.
fn reify_child<B: SmtBackend>(ctx: &mut EncoderCtx<B>, constraint: &Constraint, resolved: &Resolved) -> Result<BoolExpr, EncodingError> {
    let body = constraint.body(ctx, resolved)?;
    let r = ctx.fresh_bool(&format!("{}_reif", constraint.label()));
    ctx.assert_named(format!("{}_reif_def", constraint.label()), iff(bvar(r), body));
    Ok(bvar(r))
}

fn reify_all<B: SmtBackend>(ctx: &mut EncoderCtx<B>, children: &[Constraint], resolved: &Resolved) -> Result<Vec<BoolExpr>, EncodingError> {
    children.iter().map(|c| reify_child(ctx, c, resolved)).collect()
}

impl FolConstraint {
    pub fn body<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, resolved: &Resolved) -> Result<BoolExpr, EncodingError> {
        Ok(match self {
            FolConstraint::And(children) => and(reify_all(ctx, children, resolved)?),
            FolConstraint::Or(children) => or(reify_all(ctx, children, resolved)?),
            FolConstraint::Xor(a, b) => {
                let ra = reify_child(ctx, a, resolved)?;
                let rb = reify_child(ctx, b, resolved)?;
                xor(ra, rb)
            }
            FolConstraint::Not(c) => not(reify_child(ctx, c, resolved)?),
            FolConstraint::Implies(cond, thens) => {
                let rc = reify_child(ctx, cond, resolved)?;
                let body = and(reify_all(ctx, thens, resolved)?);
                implies(rc, body)
            }
            FolConstraint::IfThenElse(cond, thens, elses) => {
                let rc = reify_child(ctx, cond, resolved)?;
                let then_body = and(reify_all(ctx, thens, resolved)?);
                let else_body = and(reify_all(ctx, elses, resolved)?);
                ite_bool(rc, then_body, else_body)
            }
            FolConstraint::FromExpression(f) => f(resolved)?,
        })
    }
}
