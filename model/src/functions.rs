//! Cost/productivity functions (component 2): a closed algebraic family with
//! one evaluation operation and one "integral over `[a, b]`" operation,
//! both integer-exact.
//!
//! `Linear` and `Polynomial` integrals are not integer term-by-term (the
//! closed form divides by `2` or by `k+1`). Rather than reject any window
//! whose individual integral isn't integral (which would make `Linear`
//! unusable on odd-length windows, per the caveat in the design notes),
//! contributions are accumulated as exact rationals and only floored once,
//! after every busy window has been summed — see [`Accumulator`].

use crate::error::ModelError;
use crate::ids::Label;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Constant(i64),
    Linear { slope: i64, intercept: i64 },
    /// `c[0] + c[1]*t + c[2]*t^2 + ...`
    Polynomial(Vec<i64>),
}

impl Function {
    pub fn eval(&self, t: i64) -> i64 {
        match self {
            Function::Constant(k) => *k,
            Function::Linear { slope, intercept } => slope * t + intercept,
            Function::Polynomial(coeffs) => {
                let mut acc = 0i64;
                let mut pow = 1i64;
                for c in coeffs {
                    acc += c * pow;
                    pow *= t;
                }
                acc
            }
        }
    }

    /// Exact-rational contribution of `self` integrated over `[a, b]`.
    pub fn integral(&self, a: i64, b: i64) -> Rational {
        match self {
            Function::Constant(k) => Rational::from_int(*k as i128 * (b - a) as i128),
            Function::Linear { slope, intercept } => {
                let sq = (b as i128) * (b as i128) - (a as i128) * (a as i128);
                Rational::new(*slope as i128 * sq, 2).add(Rational::from_int(*intercept as i128 * (b - a) as i128))
            }
            Function::Polynomial(coeffs) => {
                let mut acc = Rational::zero();
                for (k, c) in coeffs.iter().enumerate() {
                    let power = (k + 1) as u32;
                    let term = Rational::new(*c as i128 * (ipow(b, power) - ipow(a, power)), (power) as i128);
                    acc = acc.add(term);
                }
                acc
            }
        }
    }

    /// Validates that this function can legally serve as the given field on
    /// `entity`: coefficients finite, and (for the caller's sake) that the
    /// function was not built from a non-integer literal. Since every field
    /// here is already an integer type, this mainly exists as the single
    /// choke point `Task`/`Resource` builders route through, matching the
    /// construction-time validation pattern.
    pub fn validate(&self, entity: &Label, field: &'static str) -> Result<(), ModelError> {
        if let Function::Polynomial(coeffs) = self {
            if coeffs.is_empty() {
                return Err(ModelError::NonIntegerCoefficient {
                    entity: entity.clone(),
                    field,
                    value: f64::NAN,
                });
            }
        }
        Ok(())
    }
}

fn ipow(base: i64, exp: u32) -> i128 {
    (base as i128).pow(exp)
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// An exact rational `num/den` with `den > 0`, kept reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub fn zero() -> Self {
        Rational { num: 0, den: 1 }
    }

    pub fn from_int(n: i128) -> Self {
        Rational { num: n, den: 1 }
    }

    pub fn new(num: i128, den: i128) -> Self {
        assert!(den != 0, "zero denominator in cost integral");
        let sign = den.signum();
        let (num, den) = (num * sign, den * sign);
        let g = gcd(num, den).max(1);
        Rational { num: num / g, den: den / g }
    }

    pub fn add(self, other: Rational) -> Rational {
        Rational::new(self.num * other.den + other.num * self.den, self.den * other.den)
    }

    /// Floors to the nearest integer below or equal to this value, matching
    /// the library's "integer-exact, floor at the end" accumulation policy.
    pub fn floor(self) -> i64 {
        let q = self.num.div_euclid(self.den);
        q as i64
    }
}

/// Accumulates cost contributions across several busy windows, flooring
/// only once the full sum is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator(Option<Rational>);

impl Accumulator {
    pub fn new() -> Self {
        Accumulator(None)
    }

    pub fn add(&mut self, r: Rational) {
        self.0 = Some(match self.0 {
            Some(acc) => acc.add(r),
            None => r,
        });
    }

    pub fn finish(self) -> i64 {
        self.0.map(Rational::floor).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_integral_is_exact() {
        let f = Function::Constant(3);
        assert_eq!(f.integral(0, 4).floor(), 12);
    }

    #[test]
    fn linear_integral_over_odd_window_floors_once() {
        let f = Function::Linear { slope: 1, intercept: 0 };
        // integral of t dt from 0 to 3 = 4.5 -> floors to 4, not rejected.
        assert_eq!(f.integral(0, 3).floor(), 4);
    }

    #[test]
    fn accumulator_sums_before_flooring() {
        let f = Function::Linear { slope: 1, intercept: 0 };
        let mut acc = Accumulator::new();
        acc.add(f.integral(0, 3)); // 4.5
        acc.add(f.integral(0, 3)); // 4.5
        // Summed first (9.0) then floored, not 4 + 4 = 8.
        assert_eq!(acc.finish(), 9);
    }

    #[test]
    fn polynomial_matches_eval_at_small_degree() {
        let f = Function::Polynomial(vec![0, 0, 3]); // 3t^2
        // integral of 3t^2 from 0 to 2 = 8
        assert_eq!(f.integral(0, 2).floor(), 8);
    }
}
