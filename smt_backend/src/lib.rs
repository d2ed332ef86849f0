//! The black-box SMT/MaxSMT backend boundary: a term language, the
//! [`SmtBackend`] contract, and one concrete in-process implementation
//! (`NativeBackend`) so the workspace has something to solve against
//! without shelling out to an external solver process.

pub mod backend;
pub mod native;
pub mod term;

pub use backend::{Assumption, BackendModel, CheckOutcome, ObjectiveSense, OptimizePriority, SmtBackend};
pub use native::NativeBackend;
pub use term::{and, bvar, eq, ge, gt, iff, implies, ite_bool, le, lt, ne, not, or, reify, xor, BoolExpr, IntCst, LinExpr, VarId};
