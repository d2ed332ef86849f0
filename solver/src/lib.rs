//! Drives a `rcpsp_model::Problem` to a concrete schedule against any
//! `smt_backend::SmtBackend` (components 6-8): the search driver, the
//! solution snapshot, and a JSON export façade.

pub mod driver;
pub mod error;
pub mod options;
pub mod solution;

pub use driver::{Solver, SolutionIter};
pub use error::SolveError;
pub use options::{OptimizerMode, SolverOptions};
pub use solution::{ScheduleExport, Solution, TaskRecord};
