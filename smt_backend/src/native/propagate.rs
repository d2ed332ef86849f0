//! Bound-consistency propagation for the linear-arithmetic-plus-booleans
//! term language of [`crate::term`].
//!
//! Every atom is linear, so a single constraint `sum(c_i * x_i) + k <= 0`
//! can tighten each `x_i` in isolation from the current bounds of every
//! other term — the classic bound-propagation rule for linear sum
//! constraints. `Or`/`And` propagate by unit-resolution: when every child
//! but one is already decided, the last one is forced.

use crate::native::domain::{Conflict, Domains};
use crate::term::{BoolExpr, IntCst, LinExpr, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tri {
    True,
    False,
    Unknown,
}

fn div_floor(a: IntCst, b: IntCst) -> IntCst {
    debug_assert!(b != 0);
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: IntCst, b: IntCst) -> IntCst {
    div_floor(a + (b.signum() * (b.abs() - 1)), b)
}

/// Conservative `[lo, hi]` interval of a linear expression given current
/// variable domains.
pub fn interval(lin: &LinExpr, domains: &Domains) -> (IntCst, IntCst) {
    let mut lo = lin.constant;
    let mut hi = lin.constant;
    for &(coeff, var) in &lin.terms {
        let (vlo, vhi) = domains.bounds(var);
        if coeff >= 0 {
            lo += coeff * vlo;
            hi += coeff * vhi;
        } else {
            lo += coeff * vhi;
            hi += coeff * vlo;
        }
    }
    (lo, hi)
}

/// Tightens every variable of `lin <= 0` to the smallest range consistent
/// with the others' current bounds.
pub fn propagate_le_zero(lin: &LinExpr, domains: &mut Domains) -> Result<(), Conflict> {
    if lin.terms.is_empty() {
        return if lin.constant <= 0 { Ok(()) } else { Err(Conflict) };
    }
    for &(coeff, var) in &lin.terms {
        if coeff == 0 {
            continue;
        }
        let mut min_of_others = lin.constant;
        for &(c2, v2) in &lin.terms {
            if v2 == var {
                continue;
            }
            let (lo2, hi2) = domains.bounds(v2);
            min_of_others += if c2 >= 0 { c2 * lo2 } else { c2 * hi2 };
        }
        if coeff > 0 {
            let new_hi = div_floor(-min_of_others, coeff);
            domains.tighten_ub(var, new_hi)?;
        } else {
            let new_lo = div_ceil(-min_of_others, coeff);
            domains.tighten_lb(var, new_lo)?;
        }
    }
    Ok(())
}

/// Tightens every variable of `lin == 0`.
pub fn propagate_eq_zero(lin: &LinExpr, domains: &mut Domains) -> Result<(), Conflict> {
    propagate_le_zero(lin, domains)?;
    propagate_le_zero(&lin.clone().neg(), domains)
}

/// Propagates `lin != 0`: only prunes when forced to zero, or when the
/// forced single remaining value sits at a domain endpoint.
fn propagate_ne_zero(lin: &LinExpr, domains: &mut Domains) -> Result<(), Conflict> {
    let (lo, hi) = interval(lin, domains);
    if lo == 0 && hi == 0 {
        return Err(Conflict);
    }
    if lin.terms.len() == 1 {
        let (coeff, var) = lin.terms[0];
        if coeff != 0 && (lin.constant) % coeff == 0 {
            let forced = -lin.constant / coeff;
            let (vlo, vhi) = domains.bounds(var);
            if forced == vlo {
                domains.tighten_lb(var, vlo + 1)?;
            } else if forced == vhi {
                domains.tighten_ub(var, vhi - 1)?;
            }
        }
    }
    Ok(())
}

fn eval_tri(term: &BoolExpr, domains: &Domains) -> Tri {
    match term {
        BoolExpr::Const(true) => Tri::True,
        BoolExpr::Const(false) => Tri::False,
        BoolExpr::Var(v) => {
            let (lo, hi) = domains.bounds(*v);
            if lo == 1 && hi == 1 {
                Tri::True
            } else if lo == 0 && hi == 0 {
                Tri::False
            } else {
                Tri::Unknown
            }
        }
        BoolExpr::Not(inner) => match eval_tri(inner, domains) {
            Tri::True => Tri::False,
            Tri::False => Tri::True,
            Tri::Unknown => Tri::Unknown,
        },
        BoolExpr::And(children) => {
            let mut any_unknown = false;
            for c in children {
                match eval_tri(c, domains) {
                    Tri::False => return Tri::False,
                    Tri::Unknown => any_unknown = true,
                    Tri::True => {}
                }
            }
            if any_unknown {
                Tri::Unknown
            } else {
                Tri::True
            }
        }
        BoolExpr::Or(children) => {
            let mut any_unknown = false;
            for c in children {
                match eval_tri(c, domains) {
                    Tri::True => return Tri::True,
                    Tri::Unknown => any_unknown = true,
                    Tri::False => {}
                }
            }
            if any_unknown {
                Tri::Unknown
            } else {
                Tri::False
            }
        }
        BoolExpr::Le(lin) => {
            let (lo, hi) = interval(lin, domains);
            if hi <= 0 {
                Tri::True
            } else if lo > 0 {
                Tri::False
            } else {
                Tri::Unknown
            }
        }
        BoolExpr::Eq(lin) => {
            let (lo, hi) = interval(lin, domains);
            if lo == 0 && hi == 0 {
                Tri::True
            } else if lo > 0 || hi < 0 {
                Tri::False
            } else {
                Tri::Unknown
            }
        }
    }
}

/// Propagates that `term` must hold, tightening domains accordingly.
pub fn propagate_true(term: &BoolExpr, domains: &mut Domains) -> Result<(), Conflict> {
    match term {
        BoolExpr::Const(true) => Ok(()),
        BoolExpr::Const(false) => Err(Conflict),
        BoolExpr::Var(v) => domains.fix(*v, 1),
        BoolExpr::Not(inner) => propagate_false(inner, domains),
        BoolExpr::And(children) => {
            for c in children {
                propagate_true(c, domains)?;
            }
            Ok(())
        }
        BoolExpr::Or(children) => {
            let statuses: Vec<Tri> = children.iter().map(|c| eval_tri(c, domains)).collect();
            if statuses.iter().any(|s| *s == Tri::True) {
                return Ok(());
            }
            let unknowns: Vec<usize> = statuses
                .iter()
                .enumerate()
                .filter(|(_, s)| **s == Tri::Unknown)
                .map(|(i, _)| i)
                .collect();
            match unknowns.as_slice() {
                [] => Err(Conflict),
                [only] => propagate_true(&children[*only], domains),
                _ => Ok(()),
            }
        }
        BoolExpr::Le(lin) => propagate_le_zero(lin, domains),
        BoolExpr::Eq(lin) => propagate_eq_zero(lin, domains),
    }
}

/// Propagates that `term` must NOT hold.
pub fn propagate_false(term: &BoolExpr, domains: &mut Domains) -> Result<(), Conflict> {
    match term {
        BoolExpr::Const(b) => propagate_true(&BoolExpr::Const(!b), domains),
        BoolExpr::Var(v) => domains.fix(*v, 0),
        BoolExpr::Not(inner) => propagate_true(inner, domains),
        BoolExpr::Or(children) => {
            for c in children {
                propagate_false(c, domains)?;
            }
            Ok(())
        }
        BoolExpr::And(children) => {
            let statuses: Vec<Tri> = children.iter().map(|c| eval_tri(c, domains)).collect();
            if statuses.iter().any(|s| *s == Tri::False) {
                return Ok(());
            }
            let unknowns: Vec<usize> = statuses
                .iter()
                .enumerate()
                .filter(|(_, s)| **s == Tri::Unknown)
                .map(|(i, _)| i)
                .collect();
            match unknowns.as_slice() {
                [] => Err(Conflict),
                [only] => propagate_false(&children[*only], domains),
                _ => Ok(()),
            }
        }
        BoolExpr::Le(lin) => {
            // NOT(lin <= 0)  <=>  lin >= 1  <=>  -lin + 1 <= 0
            propagate_le_zero(&lin.clone().neg().add(LinExpr::constant(1)), domains)
        }
        BoolExpr::Eq(lin) => propagate_ne_zero(lin, domains),
    }
}

/// Runs `propagate_true` over every term to a fixpoint (no more domains
/// shrink), short-circuiting on the first conflict.
pub fn propagate_fixpoint(terms: &[BoolExpr], domains: &mut Domains) -> Result<(), Conflict> {
    loop {
        let before: Vec<(IntCst, IntCst)> = (0..domains.num_vars())
            .map(|i| domains.bounds(VarId(i as u32)))
            .collect();
        for t in terms {
            propagate_true(t, domains)?;
        }
        let changed = (0..domains.num_vars()).any(|i| domains.bounds(VarId(i as u32)) != before[i]);
        if !changed {
            return Ok(());
        }
    }
}

/// Final, exact evaluation used as a safety net once every referenced
/// variable is singleton-valued.
pub fn eval_complete(term: &BoolExpr, domains: &Domains) -> bool {
    matches!(eval_tri(term, domains), Tri::True)
}
