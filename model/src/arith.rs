//! Small nonlinear-looking building blocks (`max`, `min`, `overlap`)
//! linearized with a fresh auxiliary variable plus guarding `Implies`
//! clauses — the same "fresh variable + two guards" technique used
//! throughout `indicator.rs` and `constraint::resource`.

use crate::ctx::EncoderCtx;
use smt_backend::{eq, ge, ite_bool, le, BoolExpr, IntCst, LinExpr, SmtBackend};

/// `result = max(0, value)`, bounded to `[0, ub]`.
pub fn max_with_zero<B: SmtBackend>(ctx: &mut EncoderCtx<B>, label: &str, value: LinExpr, ub: IntCst) -> LinExpr {
    let v = ctx.fresh_int(&format!("{label}_pos"), 0, ub.max(0));
    ctx.assert_named(format!("{label}_pos_ge_val"), ge(LinExpr::var(v), value.clone()));
    ctx.assert_named(
        format!("{label}_pos_tight"),
        smt_backend::or([eq(LinExpr::var(v), value), eq(LinExpr::var(v), LinExpr::constant(0))]),
    );
    LinExpr::var(v)
}

/// `result = min(a, b)`.
pub fn min2<B: SmtBackend>(ctx: &mut EncoderCtx<B>, label: &str, a: LinExpr, b: LinExpr, lb: IntCst, ub: IntCst) -> LinExpr {
    let v = ctx.fresh_int(&format!("{label}_min"), lb, ub);
    ctx.assert_named(format!("{label}_min_le_a"), le(LinExpr::var(v), a.clone()));
    ctx.assert_named(format!("{label}_min_le_b"), le(LinExpr::var(v), b.clone()));
    let a_le_b = le(a.clone(), b.clone());
    ctx.assert_named(format!("{label}_min_tight"), ite_bool(a_le_b, eq(LinExpr::var(v), a), eq(LinExpr::var(v), b)));
    LinExpr::var(v)
}

/// `result = max(a, b)`.
pub fn max2<B: SmtBackend>(ctx: &mut EncoderCtx<B>, label: &str, a: LinExpr, b: LinExpr, lb: IntCst, ub: IntCst) -> LinExpr {
    let v = ctx.fresh_int(&format!("{label}_max"), lb, ub);
    ctx.assert_named(format!("{label}_max_ge_a"), ge(LinExpr::var(v), a.clone()));
    ctx.assert_named(format!("{label}_max_ge_b"), ge(LinExpr::var(v), b.clone()));
    let a_ge_b = ge(a.clone(), b.clone());
    ctx.assert_named(format!("{label}_max_tight"), ite_bool(a_ge_b, eq(LinExpr::var(v), a), eq(LinExpr::var(v), b)));
    LinExpr::var(v)
}

/// `result = guard ? value : 0`, materialized as a fresh variable — the
/// general "reify away an optional contribution" building block used by
/// sum-valued indicators and per-interval resource loads alike.
pub fn guarded<B: SmtBackend>(ctx: &mut EncoderCtx<B>, label: &str, guard: BoolExpr, value: LinExpr) -> LinExpr {
    let v = ctx.fresh_int(&format!("{label}_guarded"), IntCst::MIN / 4, IntCst::MAX / 4);
    ctx.assert_named(
        format!("{label}_guarded_def"),
        ite_bool(guard, eq(LinExpr::var(v), value), eq(LinExpr::var(v), LinExpr::constant(0))),
    );
    LinExpr::var(v)
}

/// Length of the intersection of `[start, end]` with `[a, b]`, clamped to
/// zero when disjoint: `max(0, min(end, b) - max(start, a))`.
pub fn overlap_amount<B: SmtBackend>(
    ctx: &mut EncoderCtx<B>,
    label: &str,
    start: LinExpr,
    end: LinExpr,
    a: IntCst,
    b: IntCst,
    ceiling: IntCst,
) -> LinExpr {
    let hi = min2(ctx, &format!("{label}_hi"), end, LinExpr::constant(b), 0, ceiling.max(b));
    let lo = max2(ctx, &format!("{label}_lo"), start, LinExpr::constant(a), 0, ceiling.max(b));
    max_with_zero(ctx, &format!("{label}_len"), hi.sub(lo), ceiling.max(b))
}

/// Boolean "does `[start, end)` overlap `[a, b)`" test: `start < b && end > a`.
pub fn overlaps(start: LinExpr, end: LinExpr, a: IntCst, b: IntCst) -> BoolExpr {
    smt_backend::and([smt_backend::lt(start, LinExpr::constant(b)), smt_backend::gt(end, LinExpr::constant(a))])
}
