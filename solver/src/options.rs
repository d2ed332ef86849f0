//! Knobs for one `Solver::solve` call (§4.9, §5).

use env_param::EnvParam;
use smt_backend::OptimizePriority;

static DEFAULT_TIMEOUT_S: EnvParam<f64> = EnvParam::new("RCPSP_DEFAULT_TIMEOUT_S", "30.0");
static DEFAULT_VERBOSITY: EnvParam<u8> = EnvParam::new("RCPSP_DEFAULT_VERBOSITY", "0");

/// Which search strategy the driver runs once the model is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerMode {
    /// Repeated `check` calls, each asserting a strictly-better bound on the
    /// combined objective (§4.9 steps 1-5). Works against any backend.
    Incremental,
    /// Hands the objectives to the backend's native `minimize`/`maximize`
    /// search via a single `check` (§4.9's alternative path).
    Optimize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Reifies every assertion behind a fresh guard so an UNSAT outcome can
    /// be shrunk to an approximate unsat core (§4.9, §7).
    pub debug: bool,
    pub max_time_s: f64,
    pub parallel: bool,
    pub logic: Option<&'static str>,
    pub verbosity: u8,
    pub optimizer: OptimizerMode,
    pub optimize_priority: OptimizePriority,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            debug: false,
            max_time_s: DEFAULT_TIMEOUT_S.get(),
            parallel: false,
            logic: None,
            verbosity: DEFAULT_VERBOSITY.get(),
            optimizer: OptimizerMode::Incremental,
            optimize_priority: OptimizePriority::Lex,
        }
    }
}
