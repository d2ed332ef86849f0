//! Atomic resource constraints (§4.5).
//!
//! `ResourceNonDelay` and `ResourceTasksDistance(distance=0, mode=exact)`
//! describe the same thing under two names — the design notes flag this as
//! an open question. This module resolves it by implementing both through
//! one shared "immediately-precedes" encoding (`adjacent_pairs`):
//! `ResourceNonDelay(R)` is defined as `ResourceTasksDistance(R, 0, None,
//! Exact)` over the same candidate pairs, so the two constraints are
//! provably equivalent rather than merely similar.

use crate::arith::{guarded, overlap_amount};
use crate::constraint::task::CountKind;
use crate::ctx::EncoderCtx;
use crate::ids::Label;
use crate::resolved::Resolved;
use smt_backend::{and, bvar, eq, ge, iff, implies, le, not, or, BoolExpr, IntCst, LinExpr, SmtBackend};

pub enum ResourceConstraint {
    WorkLoad(Label, Vec<(IntCst, IntCst, IntCst)>, CountKind),
    Unavailable(Label, Vec<(IntCst, IntCst)>),
    NonDelay(Label),
    TasksDistance(Label, IntCst, Option<Vec<(IntCst, IntCst)>>, CountKind),
    DistinctWorkers(Label, Label),
    SameWorkers(Label, Label),
}

/// For every ordered pair `(i, j)` of active usages of `resource`, the
/// boolean "`j` immediately follows `i` with nothing else of `resource`'s
/// work occupying the gap between them" plus the pair's own start/end
/// variables, reused by both `NonDelay` and `TasksDistance`.
fn adjacent_pairs<B: SmtBackend>(ctx: &mut EncoderCtx<B>, resolved: &Resolved, resource: &str) -> Vec<(BoolExpr, LinExpr, LinExpr)> {
    let usages = resolved.resource_usage.get(resource).cloned().unwrap_or_default();
    let mut out = Vec::new();
    for (i, ui) in usages.iter().enumerate() {
        let ti = resolved.task(&ui.task).expect("resource usage references an already-encoded task");
        for (j, uj) in usages.iter().enumerate() {
            if i == j {
                continue;
            }
            let tj = resolved.task(&uj.task).expect("resource usage references an already-encoded task");
            let order_ij = le(LinExpr::var(ti.end), LinExpr::var(tj.start));
            let mut nobody_between = Vec::new();
            for (k, uk) in usages.iter().enumerate() {
                if k == i || k == j {
                    continue;
                }
                let tk = resolved.task(&uk.task).expect("resource usage references an already-encoded task");
                let k_between = and([
                    uk.guard.clone(),
                    ge(LinExpr::var(tk.start), LinExpr::var(ti.end)),
                    le(LinExpr::var(tk.end), LinExpr::var(tj.start)),
                ]);
                nobody_between.push(not(k_between));
            }
            let adjacent = and(
                std::iter::once(ui.guard.clone())
                    .chain(std::iter::once(uj.guard.clone()))
                    .chain(std::iter::once(order_ij))
                    .chain(nobody_between),
            );
            let flag = ctx.fresh_bool(&format!("{resource}_adjacent_{i}_{j}"));
            ctx.assert_named(format!("{resource}_adjacent_{i}_{j}_def"), iff(bvar(flag), adjacent));
            out.push((bvar(flag), LinExpr::var(ti.end), LinExpr::var(tj.start)));
        }
    }
    out
}

fn within_any(start: LinExpr, end: LinExpr, intervals: &[(IntCst, IntCst)]) -> BoolExpr {
    or(intervals
        .iter()
        .map(|(a, b)| and([ge(start.clone(), LinExpr::constant(*a)), le(end.clone(), LinExpr::constant(*b))])))
}

impl ResourceConstraint {
    pub fn body<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, resolved: &Resolved) -> BoolExpr {
        match self {
            ResourceConstraint::WorkLoad(resource, entries, kind) => {
                let usages = resolved.resource_usage.get(resource).cloned().unwrap_or_default();
                let ceiling = resolved.horizon().ceiling();
                let mut clauses = Vec::new();
                for (idx, (a, b, n)) in entries.iter().enumerate() {
                    let parts: Vec<LinExpr> = usages
                        .iter()
                        .map(|u| {
                            let t = resolved.task(&u.task).expect("resource usage references an already-encoded task");
                            let amount = overlap_amount(
                                ctx,
                                &format!("{resource}_workload_{idx}_{}", u.task),
                                LinExpr::var(t.start),
                                LinExpr::var(t.end),
                                *a,
                                *b,
                                ceiling,
                            );
                            guarded(ctx, &format!("{resource}_workload_{idx}_{}", u.task), u.guard.clone(), amount)
                        })
                        .collect();
                    clauses.push(kind.assert(LinExpr::sum(parts), LinExpr::constant(*n)));
                }
                and(clauses)
            }
            ResourceConstraint::Unavailable(resource, intervals) => {
                let entries: Vec<(IntCst, IntCst, IntCst)> = intervals.iter().map(|(a, b)| (*a, *b, 0)).collect();
                ResourceConstraint::WorkLoad(resource.clone(), entries, CountKind::Exact).body(ctx, resolved)
            }
            ResourceConstraint::NonDelay(resource) => {
                ResourceConstraint::TasksDistance(resource.clone(), 0, None, CountKind::Exact).body(ctx, resolved)
            }
            ResourceConstraint::TasksDistance(resource, d, intervals, kind) => {
                let pairs = adjacent_pairs(ctx, resolved, resource);
                let mut clauses = Vec::new();
                for (adjacent, end_i, start_j) in pairs {
                    let gap = start_j.clone().sub(end_i.clone());
                    let mut cond = adjacent;
                    if let Some(intervals) = intervals {
                        cond = and([cond, within_any(end_i, start_j, intervals)]);
                    }
                    clauses.push(implies(cond, kind.assert(gap, LinExpr::constant(*d))));
                }
                and(clauses)
            }
            ResourceConstraint::DistinctWorkers(s1, s2) => {
                let p1 = resolved.select.get(s1).cloned().unwrap_or_default();
                let p2 = resolved.select.get(s2).cloned().unwrap_or_default();
                let mut clauses = Vec::new();
                for (candidate, v1) in &p1 {
                    if let Some(v2) = p2.get(candidate) {
                        clauses.push(not(and([bvar(*v1), bvar(*v2)])));
                    }
                }
                and(clauses)
            }
            ResourceConstraint::SameWorkers(s1, s2) => {
                let p1 = resolved.select.get(s1).cloned().unwrap_or_default();
                let p2 = resolved.select.get(s2).cloned().unwrap_or_default();
                let mut candidates: Vec<&Label> = p1.keys().chain(p2.keys()).collect();
                candidates.sort();
                candidates.dedup();
                let mut clauses = Vec::new();
                for candidate in candidates {
                    let left = p1.get(candidate).map(|v| bvar(*v)).unwrap_or(BoolExpr::Const(false));
                    let right = p2.get(candidate).map(|v| bvar(*v)).unwrap_or(BoolExpr::Const(false));
                    clauses.push(iff(left, right));
                }
                and(clauses)
            }
        }
    }
}
