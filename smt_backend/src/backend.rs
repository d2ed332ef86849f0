//! The black-box SMT/MaxSMT backend contract.
//!
//! Nothing above this trait (the modeling or solver-driver crates) may
//! depend on how a concrete implementation discharges `check`; the contract
//! is exactly the one the system overview scopes out of the core: declare
//! variables, assert boolean terms, push/pop scopes, check, optionally
//! minimize/maximize, and read back a model.

use crate::term::{BoolExpr, IntCst, LinExpr, VarId};
use std::fmt;

/// The outcome of a single `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Sat,
    Unsat,
    Unknown,
}

/// A signed assumption literal used for incremental `check` and for
/// debug-mode unsat-core extraction: `(var, expected)` where `expected` is
/// `0` or `1` for boolean variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assumption {
    pub var: VarId,
    pub expected: IntCst,
}

impl Assumption {
    pub fn is_true(var: VarId) -> Assumption {
        Assumption { var, expected: 1 }
    }
    pub fn is_false(var: VarId) -> Assumption {
        Assumption { var, expected: 0 }
    }
}

/// Read-only view of a satisfying assignment.
pub trait BackendModel {
    fn int_value(&self, var: VarId) -> IntCst;

    fn bool_value(&self, var: VarId) -> bool {
        self.int_value(var) != 0
    }

    fn eval_lin(&self, e: &LinExpr) -> IntCst {
        e.constant + e.terms.iter().map(|(c, v)| c * self.int_value(*v)).sum::<IntCst>()
    }
}

/// The priority policy used to combine multiple registered objectives in
/// `optimize`-mode solving (see `Solver::optimize_priority` in the driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizePriority {
    Lex,
    Box,
    Pareto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("backend failure: {0}")]
    Failure(String),
}

/// A black-box SMT backend exposing exactly the primitives the core needs:
/// variable declaration, assertion, push/pop scoping, incremental check
/// (optionally under assumptions), and a native `minimize`/`maximize` hook
/// for `optimize`-mode solving.
pub trait SmtBackend {
    type Model<'a>: BackendModel
    where
        Self: 'a;

    fn declare_int(&mut self, name: &str, lb: IntCst, ub: IntCst) -> VarId;

    fn declare_bool(&mut self, name: &str) -> VarId {
        self.declare_int(name, 0, 1)
    }

    fn assert(&mut self, term: BoolExpr);

    fn push(&mut self);

    fn pop(&mut self);

    /// Depth of the push/pop stack; used by callers to assert the
    /// "strictly nested" push/pop discipline.
    fn depth(&self) -> u32;

    fn check(&mut self, assumptions: &[Assumption]) -> CheckOutcome;

    fn model(&self) -> Option<Self::Model<'_>>;

    fn set_logic(&mut self, logic: &str);

    fn set_param(&mut self, key: &str, value: &str);

    /// Registers an objective for the backend's native `optimize` search.
    /// Has no effect on `check`'s semantics until `check` is called again
    /// with the registered objectives still active.
    fn minimize(&mut self, objective: LinExpr);

    fn maximize(&mut self, objective: LinExpr);

    /// Clears any objectives registered via `minimize`/`maximize`.
    fn clear_objectives(&mut self);

    fn set_priority(&mut self, priority: OptimizePriority);
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Sat => write!(f, "sat"),
            CheckOutcome::Unsat => write!(f, "unsat"),
            CheckOutcome::Unknown => write!(f, "unknown"),
        }
    }
}
