//! Indicator entity (§3.4, §4.7): an integer variable tied to an expression
//! over task/resource/buffer variables, with built-in templates for the
//! common scheduling metrics.

use crate::arith::{guarded, max_with_zero};
use crate::ctx::EncoderCtx;
use crate::error::EncodingError;
use crate::ids::{IndicatorId, Label};
use crate::resolved::Resolved;
use smt_backend::{eq, ge, gt, implies, le, BoolExpr, IntCst, LinExpr, SmtBackend, VarId};
use std::sync::Arc;

/// A user-supplied expression: given the resolved variable bag, returns the
/// `LinExpr` the indicator is defined to equal. Boxed behind `Arc` so
/// `Indicator` stays `Clone`.
pub type CustomExpr = Arc<dyn Fn(&Resolved) -> Result<LinExpr, EncodingError> + Send + Sync>;

#[derive(Clone)]
pub enum IndicatorKind {
    Custom(CustomExpr),
    /// Masks unscheduled optional tasks out of the max, per the design
    /// notes' resolution of the open question on `Makespan` semantics.
    Makespan,
    Flowtime,
    FlowtimeSingleResource { resource: Label, from: IntCst, to: IntCst },
    /// Tasks without a `due_date` do not contribute.
    Tardiness,
    Earliness,
    MaximumLateness,
    NumberOfTardyTasks,
    ResourceUtilization { resource: Label },
    NumberTasksAssigned { resource: Label },
    /// Computed from the concrete solution, not asserted into the SMT
    /// model — see the module docs on `ResourceCost` for why.
    ResourceCost { resources: Vec<Label> },
    MaxBufferLevel { buffer: Label },
    MinBufferLevel { buffer: Label },
}

#[derive(Clone)]
pub struct Indicator {
    pub(crate) id: IndicatorId,
    pub(crate) label: Label,
    pub(crate) kind: IndicatorKind,
    pub(crate) bounds: Option<(IntCst, IntCst)>,
}

impl Indicator {
    pub fn new(label: impl Into<Label>, kind: IndicatorKind) -> Self {
        Indicator {
            id: IndicatorId::next(),
            label: label.into(),
            kind,
            bounds: None,
        }
    }

    pub fn custom(label: impl Into<Label>, f: impl Fn(&Resolved) -> Result<LinExpr, EncodingError> + Send + Sync + 'static) -> Self {
        Indicator::new(label, IndicatorKind::Custom(Arc::new(f)))
    }

    pub fn with_bounds(mut self, lb: IntCst, ub: IntCst) -> Self {
        self.bounds = Some((lb, ub));
        self
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn kind(&self) -> &IndicatorKind {
        &self.kind
    }

    /// The large default ceiling used for indicator variables whose exact
    /// range isn't known a priori; narrowed by `with_bounds` when given.
    fn default_range(&self, resolved: &Resolved) -> (IntCst, IntCst) {
        let h = resolved.horizon().ceiling();
        match &self.kind {
            IndicatorKind::NumberOfTardyTasks | IndicatorKind::NumberTasksAssigned { .. } => (0, resolved.tasks.len() as IntCst),
            IndicatorKind::ResourceUtilization { .. } => (0, 100),
            _ => (-h.max(1), h.max(1) * resolved.tasks.len().max(1) as IntCst),
        }
    }

    pub fn encode<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, resolved: &Resolved) -> Result<VarId, EncodingError> {
        let uid = self.id.uid();
        let (default_lb, default_ub) = self.bounds.unwrap_or_else(|| self.default_range(resolved));
        let value = ctx.new_int("Indicator", &self.label, uid, "value", default_lb, default_ub);

        match &self.kind {
            IndicatorKind::Custom(f) => {
                let expr = f(resolved)?;
                ctx.assert_named(format!("{}_def", self.label), eq(LinExpr::var(value), expr));
            }
            IndicatorKind::Makespan => {
                let terms: Vec<(BoolExpr, LinExpr)> = resolved
                    .tasks
                    .values()
                    .map(|t| (t.guard(), LinExpr::var(t.end)))
                    .collect();
                assert_max(ctx, &self.label, value, &terms);
            }
            IndicatorKind::Flowtime => {
                let parts: Vec<LinExpr> = resolved
                    .tasks
                    .values()
                    .map(|t| guarded(ctx, &self.label, t.guard(), LinExpr::var(t.end)))
                    .collect();
                ctx.assert_named(format!("{}_def", self.label), eq(LinExpr::var(value), LinExpr::sum(parts)));
            }
            IndicatorKind::FlowtimeSingleResource { resource, from, to } => {
                let usages = resolved.resource_usage.get(resource).cloned().unwrap_or_default();
                let parts: Vec<LinExpr> = usages
                    .iter()
                    .map(|u| {
                        let t = resolved.task(&u.task).expect("resource usage references an already-encoded task");
                        let within = smt_backend::and([
                            ge(LinExpr::var(t.end), LinExpr::constant(*from)),
                            le(LinExpr::var(t.end), LinExpr::constant(*to)),
                        ]);
                        let guard = smt_backend::and([u.guard.clone(), within]);
                        guarded(ctx, &self.label, guard, LinExpr::var(t.end))
                    })
                    .collect();
                ctx.assert_named(format!("{}_def", self.label), eq(LinExpr::var(value), LinExpr::sum(parts)));
            }
            IndicatorKind::Tardiness => {
                let parts: Vec<LinExpr> = resolved
                    .tasks
                    .iter()
                    .filter_map(|(label, t)| {
                        let due = resolved.due_dates.get(label).copied()?;
                        let lateness = LinExpr::var(t.end).sub(LinExpr::constant(due));
                        let ceiling = resolved.horizon().ceiling();
                        let capped = max_with_zero(ctx, &self.label, lateness, ceiling);
                        Some(guarded(ctx, &self.label, t.guard(), capped))
                    })
                    .collect();
                ctx.assert_named(format!("{}_def", self.label), eq(LinExpr::var(value), LinExpr::sum(parts)));
            }
            IndicatorKind::Earliness => {
                let parts: Vec<LinExpr> = resolved
                    .tasks
                    .iter()
                    .filter_map(|(label, t)| {
                        let due = resolved.due_dates.get(label).copied()?;
                        let earliness = LinExpr::constant(due).sub(LinExpr::var(t.end));
                        let ceiling = resolved.horizon().ceiling();
                        let capped = max_with_zero(ctx, &self.label, earliness, ceiling);
                        Some(guarded(ctx, &self.label, t.guard(), capped))
                    })
                    .collect();
                ctx.assert_named(format!("{}_def", self.label), eq(LinExpr::var(value), LinExpr::sum(parts)));
            }
            IndicatorKind::MaximumLateness => {
                let terms: Vec<(BoolExpr, LinExpr)> = resolved
                    .tasks
                    .iter()
                    .filter_map(|(label, t)| {
                        let due = resolved.due_dates.get(label).copied()?;
                        Some((t.guard(), LinExpr::var(t.end).sub(LinExpr::constant(due))))
                    })
                    .collect();
                assert_max(ctx, &self.label, value, &terms);
            }
            IndicatorKind::NumberOfTardyTasks => {
                let parts: Vec<LinExpr> = resolved
                    .tasks
                    .iter()
                    .filter_map(|(label, t)| {
                        let due = resolved.due_dates.get(label).copied()?;
                        let is_tardy = gt(LinExpr::var(t.end), LinExpr::constant(due));
                        let flag = ctx.fresh_bool(&format!("{}_tardy", self.label));
                        ctx.assert_named(format!("{}_tardy_def", self.label), smt_backend::reify(flag, smt_backend::and([t.guard(), is_tardy])));
                        Some(LinExpr::var(flag))
                    })
                    .collect();
                ctx.assert_named(format!("{}_def", self.label), eq(LinExpr::var(value), LinExpr::sum(parts)));
            }
            IndicatorKind::ResourceUtilization { resource } => {
                let usages = resolved.resource_usage.get(resource).cloned().unwrap_or_default();
                let busy_parts: Vec<LinExpr> = usages
                    .iter()
                    .map(|u| {
                        let t = resolved.task(&u.task).expect("resource usage references an already-encoded task");
                        guarded(ctx, &self.label, u.guard.clone(), LinExpr::var(t.duration))
                    })
                    .collect();
                let busy = ctx.fresh_int(&format!("{}_busy", self.label), 0, resolved.horizon().ceiling());
                ctx.assert_named(format!("{}_busy_def", self.label), eq(LinExpr::var(busy), LinExpr::sum(busy_parts)));
                let h = resolved.horizon().ceiling().max(1);
                // Integer-rounded `(100 * busy) / H`: the unique `util` with
                // `util*H <= 100*busy < (util+1)*H`.
                ctx.assert_named(
                    format!("{}_util_lo", self.label),
                    le(LinExpr::var(value).scale(h), LinExpr::var(busy).scale(100)),
                );
                ctx.assert_named(
                    format!("{}_util_hi", self.label),
                    smt_backend::lt(LinExpr::var(busy).scale(100), LinExpr::var(value).add(LinExpr::constant(1)).scale(h)),
                );
            }
            IndicatorKind::NumberTasksAssigned { resource } => {
                let usages = resolved.resource_usage.get(resource).cloned().unwrap_or_default();
                let parts: Vec<LinExpr> = usages
                    .iter()
                    .map(|u| {
                        let flag = ctx.fresh_bool(&format!("{}_assigned", self.label));
                        ctx.assert_named(format!("{}_assigned_def", self.label), smt_backend::reify(flag, u.guard.clone()));
                        LinExpr::var(flag)
                    })
                    .collect();
                ctx.assert_named(format!("{}_def", self.label), eq(LinExpr::var(value), LinExpr::sum(parts)));
            }
            IndicatorKind::ResourceCost { .. } => {
                // Intentionally left unconstrained at the SMT level: cost
                // integrals over a `Linear`/`Polynomial` function of an
                // as-yet-undetermined busy window are not linear in the
                // decision variables. The solver driver fills `value`'s
                // reported quantity in from the concrete solution instead
                // of by assertion (see `solver::solution::resource_cost`).
            }
            IndicatorKind::MaxBufferLevel { buffer } => {
                let bvars = resolved.buffer(buffer)?;
                let terms: Vec<(BoolExpr, LinExpr)> = std::iter::once((BoolExpr::Const(true), LinExpr::var(bvars.initial)))
                    .chain(bvars.breakpoints.iter().map(|bp| (BoolExpr::Const(true), LinExpr::var(bp.level))))
                    .collect();
                assert_max(ctx, &self.label, value, &terms);
            }
            IndicatorKind::MinBufferLevel { buffer } => {
                let bvars = resolved.buffer(buffer)?;
                let terms: Vec<(BoolExpr, LinExpr)> = std::iter::once((BoolExpr::Const(true), LinExpr::var(bvars.initial)))
                    .chain(bvars.breakpoints.iter().map(|bp| (BoolExpr::Const(true), LinExpr::var(bp.level))))
                    .collect();
                assert_min(ctx, &self.label, value, &terms);
            }
        }

        Ok(value)
    }
}

/// `result = max` over the guarded terms, with `result = 0` when none are
/// active (the `Makespan` masking convention).
fn assert_max<B: SmtBackend>(ctx: &mut EncoderCtx<B>, label: &str, result: VarId, terms: &[(BoolExpr, LinExpr)]) {
    for (guard, value) in terms {
        ctx.assert_named(format!("{label}_max_ge"), implies(guard.clone(), ge(LinExpr::var(result), value.clone())));
    }
    let any_active = smt_backend::or(terms.iter().map(|(g, _)| g.clone()));
    let tight: Vec<BoolExpr> = terms
        .iter()
        .map(|(g, v)| smt_backend::and([g.clone(), eq(LinExpr::var(result), v.clone())]))
        .collect();
    ctx.assert_named(format!("{label}_max_tight"), implies(any_active.clone(), smt_backend::or(tight)));
    ctx.assert_named(
        format!("{label}_max_empty"),
        implies(smt_backend::not(any_active), eq(LinExpr::var(result), LinExpr::constant(0))),
    );
}

/// `result = min` over the (always-active) terms.
fn assert_min<B: SmtBackend>(ctx: &mut EncoderCtx<B>, label: &str, result: VarId, terms: &[(BoolExpr, LinExpr)]) {
    for (guard, value) in terms {
        ctx.assert_named(format!("{label}_min_le"), implies(guard.clone(), le(LinExpr::var(result), value.clone())));
    }
    let tight: Vec<BoolExpr> = terms.iter().map(|(_, v)| eq(LinExpr::var(result), v.clone())).collect();
    if !tight.is_empty() {
        ctx.assert_named(format!("{label}_min_tight"), smt_backend::or(tight));
    }
}
