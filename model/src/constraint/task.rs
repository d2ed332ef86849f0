//! Atomic task constraints (§4.4).

use crate::arith::overlaps;
use crate::constraint::Constraint;
use crate::ctx::EncoderCtx;
use crate::error::EncodingError;
use crate::ids::Label;
use crate::resolved::Resolved;
use smt_backend::{and, bvar, eq, ge, gt, implies, le, lt, or, BoolExpr, IntCst, LinExpr, SmtBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    Lax,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecedenceKind {
    Lax,
    Strict,
    /// Equality: `A.end + offset == B.start`.
    Tight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKind {
    Exact,
    Min,
    Max,
}

impl CountKind {
    pub fn assert(self, lhs: LinExpr, rhs: LinExpr) -> BoolExpr {
        match self {
            CountKind::Exact => eq(lhs, rhs),
            CountKind::Min => ge(lhs, rhs),
            CountKind::Max => le(lhs, rhs),
        }
    }
}

pub enum TaskConstraint {
    StartAt(Label, IntCst),
    EndAt(Label, IntCst),
    StartAfter(Label, IntCst, CmpKind),
    EndBefore(Label, IntCst, CmpKind),
    Precedence(Label, Label, PrecedenceKind, IntCst),
    StartsSynced(Label, Label),
    EndsSynced(Label, Label),
    DontOverlap(Label, Label),
    Contiguous(Vec<Label>),
    OrderedGroup(Vec<Label>, PrecedenceKind, IntCst),
    UnorderedGroup(Vec<Label>, IntCst, IntCst),
    ScheduleNInIntervals(Vec<Label>, IntCst, Vec<(IntCst, IntCst)>, CountKind),
    ForceScheduleNOptional(Vec<Label>, IntCst, CountKind),
    OptionalDependency(Label, Label),
    OptionalConditionSchedule(Label, Box<Constraint>),
}

/// `(A.end <= B.start) || (B.end <= A.start)`, guarded by both tasks'
/// scheduled flags — reused by `DontOverlap` and by every pairwise
/// non-overlap check the resource encoder emits (§4.3).
pub fn dont_overlap_term(resolved: &Resolved, a: &str, b: &str) -> Result<BoolExpr, EncodingError> {
    let ta = resolved.task(a)?;
    let tb = resolved.task(b)?;
    let guard = and([ta.guard(), tb.guard()]);
    Ok(implies(
        guard,
        or([le(LinExpr::var(ta.end), LinExpr::var(tb.start)), le(LinExpr::var(tb.end), LinExpr::var(ta.start))]),
    ))
}

impl TaskConstraint {
    pub fn body<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, resolved: &Resolved) -> Result<BoolExpr, EncodingError> {
        Ok(match self {
            TaskConstraint::StartAt(t, v) => {
                let tv = resolved.task(t)?;
                implies(tv.guard(), eq(LinExpr::var(tv.start), LinExpr::constant(*v)))
            }
            TaskConstraint::EndAt(t, v) => {
                let tv = resolved.task(t)?;
                implies(tv.guard(), eq(LinExpr::var(tv.end), LinExpr::constant(*v)))
            }
            TaskConstraint::StartAfter(t, v, kind) => {
                let tv = resolved.task(t)?;
                let cmp = match kind {
                    CmpKind::Lax => ge(LinExpr::var(tv.start), LinExpr::constant(*v)),
                    CmpKind::Strict => gt(LinExpr::var(tv.start), LinExpr::constant(*v)),
                };
                implies(tv.guard(), cmp)
            }
            TaskConstraint::EndBefore(t, v, kind) => {
                let tv = resolved.task(t)?;
                let cmp = match kind {
                    CmpKind::Lax => le(LinExpr::var(tv.end), LinExpr::constant(*v)),
                    CmpKind::Strict => lt(LinExpr::var(tv.end), LinExpr::constant(*v)),
                };
                implies(tv.guard(), cmp)
            }
            TaskConstraint::Precedence(a, b, kind, offset) => {
                let ta = resolved.task(a)?;
                let tb = resolved.task(b)?;
                let guard = and([ta.guard(), tb.guard()]);
                let lhs = LinExpr::var(ta.end).add(LinExpr::constant(*offset));
                let cmp = match kind {
                    PrecedenceKind::Lax => le(lhs, LinExpr::var(tb.start)),
                    PrecedenceKind::Strict => lt(lhs, LinExpr::var(tb.start)),
                    PrecedenceKind::Tight => eq(lhs, LinExpr::var(tb.start)),
                };
                implies(guard, cmp)
            }
            TaskConstraint::StartsSynced(a, b) => {
                let ta = resolved.task(a)?;
                let tb = resolved.task(b)?;
                implies(and([ta.guard(), tb.guard()]), eq(LinExpr::var(ta.start), LinExpr::var(tb.start)))
            }
            TaskConstraint::EndsSynced(a, b) => {
                let ta = resolved.task(a)?;
                let tb = resolved.task(b)?;
                implies(and([ta.guard(), tb.guard()]), eq(LinExpr::var(ta.end), LinExpr::var(tb.end)))
            }
            TaskConstraint::DontOverlap(a, b) => dont_overlap_term(resolved, a, b)?,
            TaskConstraint::Contiguous(list) => {
                let mut clauses = Vec::new();
                for pair in list.windows(2) {
                    let ta = resolved.task(&pair[0])?;
                    let tb = resolved.task(&pair[1])?;
                    clauses.push(implies(and([ta.guard(), tb.guard()]), eq(LinExpr::var(ta.end), LinExpr::var(tb.start))));
                }
                and(clauses)
            }
            TaskConstraint::OrderedGroup(list, kind, offset) => {
                let mut clauses = Vec::new();
                for pair in list.windows(2) {
                    let ta = resolved.task(&pair[0])?;
                    let tb = resolved.task(&pair[1])?;
                    let guard = and([ta.guard(), tb.guard()]);
                    let lhs = LinExpr::var(ta.end).add(LinExpr::constant(*offset));
                    let cmp = match kind {
                        PrecedenceKind::Lax => le(lhs, LinExpr::var(tb.start)),
                        PrecedenceKind::Strict => lt(lhs, LinExpr::var(tb.start)),
                        PrecedenceKind::Tight => eq(lhs, LinExpr::var(tb.start)),
                    };
                    clauses.push(implies(guard, cmp));
                }
                and(clauses)
            }
            TaskConstraint::UnorderedGroup(list, lb, ub) => {
                let group_start = ctx.fresh_int("group_start", *lb, *ub);
                let group_end = ctx.fresh_int("group_end", *lb, *ub);
                let mut clauses = vec![
                    ge(LinExpr::var(group_start), LinExpr::constant(*lb)),
                    le(LinExpr::var(group_end), LinExpr::constant(*ub)),
                ];
                for label in list {
                    let t = resolved.task(label)?;
                    clauses.push(implies(t.guard(), le(LinExpr::var(group_start), LinExpr::var(t.start))));
                    clauses.push(implies(t.guard(), le(LinExpr::var(t.end), LinExpr::var(group_end))));
                }
                and(clauses)
            }
            TaskConstraint::ScheduleNInIntervals(list, n, intervals, kind) => {
                let mut parts = Vec::new();
                for label in list {
                    let t = resolved.task(label)?;
                    let inside = or(intervals.iter().map(|(a, b)| overlaps(LinExpr::var(t.start), LinExpr::var(t.end), *a, *b)));
                    let flag = ctx.fresh_bool("inside_interval");
                    ctx.assert_named("inside_interval_def".to_string(), smt_backend::reify(flag, and([t.guard(), inside])));
                    parts.push(LinExpr::var(flag));
                }
                kind.assert(LinExpr::sum(parts), LinExpr::constant(*n))
            }
            TaskConstraint::ForceScheduleNOptional(list, n, kind) => {
                let mut parts = Vec::new();
                for label in list {
                    let t = resolved.task(label)?;
                    parts.push(LinExpr::var(t.scheduled.expect("ForceScheduleNOptionalTasks requires optional tasks")));
                }
                kind.assert(LinExpr::sum(parts), LinExpr::constant(*n))
            }
            TaskConstraint::OptionalDependency(a, b) => {
                let ta = resolved.task(a)?;
                let tb = resolved.task(b)?;
                implies(bvar(ta.scheduled.expect("OptionalTasksDependency.a must be optional")), tb.guard())
            }
            TaskConstraint::OptionalConditionSchedule(t, cond) => {
                let tv = resolved.task(t)?;
                let cond_body = cond.body(ctx, resolved)?;
                implies(cond_body, bvar(tv.scheduled.expect("OptionalTaskConditionSchedule requires an optional task")))
            }
        })
    }
}
