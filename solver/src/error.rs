//! Failures a `Solver::solve` call can surface (§7).

use rcpsp_model::{Label, RcpspError};

#[derive(thiserror::Error, Debug, Clone)]
pub enum SolveError {
    #[error("unsatisfiable{}", core.as_ref().map(|c| format!(" (core: {c:?})")).unwrap_or_default())]
    Unsatisfiable { core: Option<Vec<Label>> },

    #[error("backend returned unknown")]
    Unknown,

    #[error("timed out after {elapsed_s:.1}s with no solution found")]
    Timeout { elapsed_s: f64 },

    #[error("backend failure: {0}")]
    BackendFailure(String),

    #[error(transparent)]
    Model(#[from] RcpspError),
}
