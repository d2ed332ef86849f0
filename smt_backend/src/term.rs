//! The term language exchanged with an [`SmtBackend`](crate::backend::SmtBackend).
//!
//! Every decision variable, integer or boolean, lives in a single id space
//! ([`VarId`]): a boolean variable is simply an integer variable whose domain
//! is `[0, 1]`, with `1` read as `true`. This is the same trick every LIA-with-
//! booleans encoding relies on and lets a linear expression sum booleans and
//! integers without a second term language.

use std::fmt;

/// The integer type used for constants and bounds throughout the backend.
pub type IntCst = i64;

/// Opaque handle to a declared variable (integer or boolean).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A linear combination `sum(coeff_i * var_i) + constant`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinExpr {
    pub terms: Vec<(IntCst, VarId)>,
    pub constant: IntCst,
}

impl LinExpr {
    pub fn constant(c: IntCst) -> LinExpr {
        LinExpr {
            terms: Vec::new(),
            constant: c,
        }
    }

    pub fn var(v: VarId) -> LinExpr {
        LinExpr {
            terms: vec![(1, v)],
            constant: 0,
        }
    }

    pub fn scaled(coeff: IntCst, v: VarId) -> LinExpr {
        LinExpr {
            terms: vec![(coeff, v)],
            constant: 0,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|(c, _)| *c == 0)
    }

    pub fn add(mut self, other: LinExpr) -> LinExpr {
        self.terms.extend(other.terms);
        self.constant += other.constant;
        self.normalize()
    }

    pub fn sub(self, other: LinExpr) -> LinExpr {
        self.add(other.neg())
    }

    pub fn neg(self) -> LinExpr {
        LinExpr {
            terms: self.terms.into_iter().map(|(c, v)| (-c, v)).collect(),
            constant: -self.constant,
        }
    }

    pub fn scale(self, k: IntCst) -> LinExpr {
        LinExpr {
            terms: self.terms.into_iter().map(|(c, v)| (c * k, v)).collect(),
            constant: self.constant * k,
        }
    }

    /// Merges duplicate variable occurrences, dropping zero-coefficient terms.
    fn normalize(mut self) -> LinExpr {
        self.terms.sort_by_key(|(_, v)| v.0);
        let mut merged: Vec<(IntCst, VarId)> = Vec::with_capacity(self.terms.len());
        for (c, v) in self.terms {
            if let Some(last) = merged.last_mut() {
                if last.1 == v {
                    last.0 += c;
                    continue;
                }
            }
            merged.push((c, v));
        }
        merged.retain(|(c, _)| *c != 0);
        self.terms = merged;
        self
    }

    pub fn sum(exprs: impl IntoIterator<Item = LinExpr>) -> LinExpr {
        exprs.into_iter().fold(LinExpr::constant(0), |acc, e| acc.add(e))
    }
}

impl From<IntCst> for LinExpr {
    fn from(c: IntCst) -> Self {
        LinExpr::constant(c)
    }
}

impl From<VarId> for LinExpr {
    fn from(v: VarId) -> Self {
        LinExpr::var(v)
    }
}

/// A first-order boolean term over [`LinExpr`] atoms.
///
/// Only `Le` (non-strict `<=`) and `Eq` are primitive comparisons; `<`, `>=`,
/// `>`, `!=` and the higher combinators (`implies`, `xor`, `ite`) are derived
/// from them and from `And`/`Or`/`Not` by the free functions below, mirroring
/// the way the modeling layer's `Implies`/`IfThenElse`/`Xor` combinators are
/// themselves defined in terms of `And`/`Or`/`Not` over reified booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoolExpr {
    Const(bool),
    Var(VarId),
    Not(Box<BoolExpr>),
    And(Vec<BoolExpr>),
    Or(Vec<BoolExpr>),
    /// `lhs <= 0`
    Le(LinExpr),
    /// `lhs == 0`
    Eq(LinExpr),
}

pub fn bvar(v: VarId) -> BoolExpr {
    BoolExpr::Var(v)
}

pub fn not(e: BoolExpr) -> BoolExpr {
    match e {
        BoolExpr::Const(b) => BoolExpr::Const(!b),
        BoolExpr::Not(inner) => *inner,
        other => BoolExpr::Not(Box::new(other)),
    }
}

pub fn and(es: impl IntoIterator<Item = BoolExpr>) -> BoolExpr {
    let mut flat = Vec::new();
    for e in es {
        match e {
            BoolExpr::Const(true) => continue,
            BoolExpr::Const(false) => return BoolExpr::Const(false),
            BoolExpr::And(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => BoolExpr::Const(true),
        1 => flat.into_iter().next().unwrap(),
        _ => BoolExpr::And(flat),
    }
}

pub fn or(es: impl IntoIterator<Item = BoolExpr>) -> BoolExpr {
    let mut flat = Vec::new();
    for e in es {
        match e {
            BoolExpr::Const(false) => continue,
            BoolExpr::Const(true) => return BoolExpr::Const(true),
            BoolExpr::Or(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => BoolExpr::Const(false),
        1 => flat.into_iter().next().unwrap(),
        _ => BoolExpr::Or(flat),
    }
}

/// `a <= b`
pub fn le(a: LinExpr, b: LinExpr) -> BoolExpr {
    BoolExpr::Le(a.sub(b))
}

/// `a < b`  <=>  `a + 1 <= b`
pub fn lt(a: LinExpr, b: LinExpr) -> BoolExpr {
    le(a.add(LinExpr::constant(1)), b)
}

/// `a >= b`
pub fn ge(a: LinExpr, b: LinExpr) -> BoolExpr {
    le(b, a)
}

/// `a > b`
pub fn gt(a: LinExpr, b: LinExpr) -> BoolExpr {
    lt(b, a)
}

/// `a == b`
pub fn eq(a: LinExpr, b: LinExpr) -> BoolExpr {
    BoolExpr::Eq(a.sub(b))
}

/// `a != b`
pub fn ne(a: LinExpr, b: LinExpr) -> BoolExpr {
    not(eq(a, b))
}

/// `cond => then`
pub fn implies(cond: BoolExpr, then: BoolExpr) -> BoolExpr {
    or([not(cond), then])
}

/// `a XOR b`
pub fn xor(a: BoolExpr, b: BoolExpr) -> BoolExpr {
    and([or([a.clone(), b.clone()]), or([not(a), not(b)])])
}

/// `a <-> b`
pub fn iff(a: BoolExpr, b: BoolExpr) -> BoolExpr {
    and([implies(a.clone(), b.clone()), implies(b, a)])
}

/// `if cond { then } else { otherwise }` at the boolean-term level.
pub fn ite_bool(cond: BoolExpr, then: BoolExpr, otherwise: BoolExpr) -> BoolExpr {
    and([implies(cond.clone(), then), implies(not(cond), otherwise)])
}

/// Links a fresh reification variable `r` to `body`: asserting the result
/// makes `r == 1` exactly when `body` holds. This is the general mechanism
/// behind every combinator that "reifies a child by a fresh boolean", per
/// the constraint algebra's first-order combinators.
pub fn reify(r: VarId, body: BoolExpr) -> BoolExpr {
    iff(bvar(r), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> VarId {
        VarId(i)
    }

    #[test]
    fn lin_normalizes_duplicate_vars() {
        let e = LinExpr::var(v(0)).add(LinExpr::scaled(2, v(0))).add(LinExpr::constant(5));
        assert_eq!(e.terms, vec![(3, v(0))]);
        assert_eq!(e.constant, 5);
    }

    #[test]
    fn lin_drops_zero_coefficients() {
        let e = LinExpr::scaled(3, v(0)).add(LinExpr::scaled(-3, v(0)));
        assert!(e.terms.is_empty());
    }

    #[test]
    fn and_flattens_and_short_circuits() {
        let e = and([BoolExpr::Const(true), bvar(v(0)), and([bvar(v(1))])]);
        assert_eq!(e, BoolExpr::And(vec![bvar(v(0)), bvar(v(1))]));
        assert_eq!(and([BoolExpr::Const(false), bvar(v(0))]), BoolExpr::Const(false));
    }

    #[test]
    fn double_negation_cancels() {
        assert_eq!(not(not(bvar(v(0)))), bvar(v(0)));
    }
}
