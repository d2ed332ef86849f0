//! The solver driver (component 6, §4.9, §5, §7): turns an encoded
//! [`Problem`] plus a set of [`SolverOptions`] into [`Solution`]s.

use crate::error::SolveError;
use crate::options::{OptimizerMode, SolverOptions};
use crate::solution::Solution;
use rcpsp_model::{DebugGuard, EncodedProblem, ObjectiveKind, Problem};
use smt_backend::{eq, lt, ne, Assumption, BackendModel, CheckOutcome, LinExpr, SmtBackend, VarId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{instrument, warn};

/// Drives one model to a [`Solution`] against a concrete backend `B`.
///
/// Owns the [`Problem`] and [`Arc`]-clonable `backend`; `encode` runs lazily
/// on the first `solve`/`find_another_solution`/`iter_solutions` call and is
/// cached afterwards, matching the registry's "frozen once solving begins"
/// contract.
pub struct Solver<B: SmtBackend> {
    backend: B,
    problem: Problem,
    encoded: Option<EncodedProblem>,
    options: SolverOptions,
    cancel: Arc<AtomicBool>,
}

impl<B: SmtBackend> Solver<B> {
    pub fn new(backend: B, problem: Problem, options: SolverOptions) -> Self {
        Solver {
            backend,
            problem,
            encoded: None,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// The frozen encoding, once `solve`/`find_another_solution`/
    /// `iter_solutions` has run at least once; `None` beforehand.
    pub fn encoded(&self) -> Option<&EncodedProblem> {
        self.encoded.as_ref()
    }

    /// A cooperative-cancellation flag: set it from another thread to ask an
    /// in-progress `solve` to return its current incumbent early (§5).
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn ensure_encoded(&mut self) -> Result<(), SolveError> {
        if self.encoded.is_none() {
            if let Some(logic) = self.options.logic {
                self.backend.set_logic(logic);
            }
            let encoded = self.problem.encode(&mut self.backend, self.options.debug)?;
            self.encoded = Some(encoded);
        }
        Ok(())
    }

    /// In debug mode, every assertion was reified behind a guard boolean
    /// (§4.9); those guards must be assumed true on every `check` or the
    /// model is free to set them false and trivially satisfy everything.
    fn base_assumptions(&self) -> Vec<Assumption> {
        if !self.options.debug {
            return Vec::new();
        }
        self.encoded
            .as_ref()
            .map(|e| e.guards.iter().map(|g| Assumption::is_true(g.var)).collect())
            .unwrap_or_default()
    }

    fn all_objectives_exact(&self) -> bool {
        self.encoded.as_ref().unwrap().objectives.iter().all(|o| matches!(o.kind(), ObjectiveKind::Exact(_)))
    }

    /// `Exact` objectives are targets, not optimization directions: asserted
    /// as hard equalities up front rather than folded into a weighted sum.
    fn assert_exact_objectives(&mut self) {
        let encoded = self.encoded.as_ref().unwrap();
        let asserts: Vec<_> = encoded
            .objectives
            .iter()
            .filter_map(|o| match o.kind() {
                ObjectiveKind::Exact(v) => {
                    let ivar = *encoded.indicators.get(o.indicator()).expect("objective indicator validated at encode time");
                    Some(eq(LinExpr::var(ivar), LinExpr::constant(v)))
                }
                _ => None,
            })
            .collect();
        for a in asserts {
            self.backend.assert(a);
        }
    }

    /// The weighted sum minimized by the incremental loop: `Maximize`
    /// objectives contribute their negation so one `lt` bound tightens both
    /// directions at once.
    fn combined_objective(&self) -> LinExpr {
        let encoded = self.encoded.as_ref().unwrap();
        let terms: Vec<LinExpr> = encoded
            .objectives
            .iter()
            .filter_map(|o| {
                let ivar = *encoded.indicators.get(o.indicator()).expect("objective indicator validated at encode time");
                match o.kind() {
                    ObjectiveKind::Minimize => Some(LinExpr::scaled(o.weight(), ivar)),
                    ObjectiveKind::Maximize => Some(LinExpr::scaled(o.weight(), ivar).neg()),
                    ObjectiveKind::Exact(_) => None,
                }
            })
            .collect();
        LinExpr::sum(terms)
    }

    /// Deletion-based unsat-core approximation: `SmtBackend` exposes no
    /// native core extraction, only `check` under assumptions, so each debug
    /// guard is dropped in turn and kept only if the remainder is still
    /// satisfiable without it. Linear in the guard count, not minimal.
    fn shrink_core(&mut self) -> SolveError {
        let mut core: Vec<DebugGuard> = self.encoded.as_ref().unwrap().guards.clone();
        let mut i = 0;
        while i < core.len() {
            let trial: Vec<Assumption> = core.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, g)| Assumption::is_true(g.var)).collect();
            match self.backend.check(&trial) {
                CheckOutcome::Unsat => {
                    core.remove(i);
                }
                CheckOutcome::Sat | CheckOutcome::Unknown => i += 1,
            }
        }
        let labels = core.into_iter().map(|g| g.label).collect();
        SolveError::Unsatisfiable { core: Some(labels) }
    }

    #[instrument(name = "solver.solve", skip_all)]
    pub fn solve(&mut self) -> Result<Solution, SolveError> {
        self.ensure_encoded()?;
        self.assert_exact_objectives();
        if self.all_objectives_exact() {
            return self.solve_feasibility();
        }
        match self.options.optimizer {
            OptimizerMode::Incremental => self.solve_incremental(),
            OptimizerMode::Optimize => self.solve_optimize(),
        }
    }

    fn solve_feasibility(&mut self) -> Result<Solution, SolveError> {
        let assumptions = self.base_assumptions();
        match self.backend.check(&assumptions) {
            CheckOutcome::Sat => {
                let model = self.backend.model().expect("model available after Sat check");
                Ok(Solution::extract(&self.problem, self.encoded.as_ref().unwrap(), &model, true))
            }
            CheckOutcome::Unsat => {
                if self.options.debug {
                    Err(self.shrink_core())
                } else {
                    Err(SolveError::Unsatisfiable { core: None })
                }
            }
            CheckOutcome::Unknown => Err(SolveError::Unknown),
        }
    }

    /// The incremental tightening loop (§4.9 steps 1-5): one `push`, repeated
    /// `check`s each asserting a strictly-better bound on the combined
    /// objective, one final `pop`. A deadline or cancellation mid-loop still
    /// returns the best incumbent found, marked `optimal = false`.
    fn solve_incremental(&mut self) -> Result<Solution, SolveError> {
        let objective = self.combined_objective();
        let assumptions = self.base_assumptions();
        let start = Instant::now();
        let deadline = start + Duration::from_secs_f64(self.options.max_time_s.max(0.0));

        self.backend.push();
        let (mut incumbent, mut incumbent_value) = match self.backend.check(&assumptions) {
            CheckOutcome::Sat => {
                let model = self.backend.model().expect("model available after Sat check");
                let value = model.eval_lin(&objective);
                (Solution::extract(&self.problem, self.encoded.as_ref().unwrap(), &model, false), value)
            }
            CheckOutcome::Unsat => {
                self.backend.pop();
                return if self.options.debug {
                    Err(self.shrink_core())
                } else {
                    Err(SolveError::Unsatisfiable { core: None })
                };
            }
            CheckOutcome::Unknown => {
                self.backend.pop();
                return Err(SolveError::Unknown);
            }
        };

        let mut optimal = false;
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                warn!("solve interrupted, returning incumbent with optimal=false");
                break;
            }
            if Instant::now() >= deadline {
                warn!(elapsed_s = start.elapsed().as_secs_f64(), "solve timed out, returning incumbent with optimal=false");
                break;
            }
            self.backend.assert(lt(objective.clone(), LinExpr::constant(incumbent_value)));
            match self.backend.check(&assumptions) {
                CheckOutcome::Sat => {
                    let model = self.backend.model().expect("model available after Sat check");
                    incumbent_value = model.eval_lin(&objective);
                    incumbent = Solution::extract(&self.problem, self.encoded.as_ref().unwrap(), &model, false);
                }
                CheckOutcome::Unsat => {
                    optimal = true;
                    break;
                }
                CheckOutcome::Unknown => break,
            }
        }
        self.backend.pop();
        incumbent.optimal = optimal;
        Ok(incumbent)
    }

    /// Hands objectives to the backend's native search via a single `check`
    /// (§4.9's alternative path). Registration order is by descending weight
    /// as a documented proxy for lexicographic priority.
    fn solve_optimize(&mut self) -> Result<Solution, SolveError> {
        {
            let encoded = self.encoded.as_ref().unwrap();
            let mut objs: Vec<_> = encoded.objectives.iter().collect();
            objs.sort_by_key(|o| std::cmp::Reverse(o.weight()));
            for o in objs {
                let ivar = *encoded.indicators.get(o.indicator()).expect("objective indicator validated at encode time");
                match o.kind() {
                    ObjectiveKind::Minimize => self.backend.minimize(LinExpr::scaled(o.weight(), ivar)),
                    ObjectiveKind::Maximize => self.backend.maximize(LinExpr::scaled(o.weight(), ivar)),
                    ObjectiveKind::Exact(_) => {}
                }
            }
        }
        self.backend.set_priority(self.options.optimize_priority);

        let assumptions = self.base_assumptions();
        match self.backend.check(&assumptions) {
            CheckOutcome::Sat => {
                let model = self.backend.model().expect("model available after Sat check");
                Ok(Solution::extract(&self.problem, self.encoded.as_ref().unwrap(), &model, true))
            }
            CheckOutcome::Unsat => {
                if self.options.debug {
                    Err(self.shrink_core())
                } else {
                    Err(SolveError::Unsatisfiable { core: None })
                }
            }
            CheckOutcome::Unknown => Err(SolveError::Unknown),
        }
    }

    /// Excludes `variable`'s current value and re-checks under a scoped
    /// `push`/`pop`, so repeated calls never leak assertions into the base
    /// model. The "current" value is re-derived from a fresh `check` taken
    /// inside the same scope rather than read off the backend's leftover
    /// model, since `solve`'s incremental path pops its own bookkeeping
    /// assertions (and with them the model) before returning.
    pub fn find_another_solution(&mut self, variable: VarId) -> Result<Option<Solution>, SolveError> {
        self.ensure_encoded()?;
        let assumptions = self.base_assumptions();
        self.backend.push();
        let current = match self.backend.check(&assumptions) {
            CheckOutcome::Sat => {
                let model = self.backend.model().expect("model available after Sat check");
                model.int_value(variable)
            }
            CheckOutcome::Unsat => {
                self.backend.pop();
                return Ok(None);
            }
            CheckOutcome::Unknown => {
                self.backend.pop();
                return Err(SolveError::Unknown);
            }
        };
        self.backend.assert(ne(LinExpr::var(variable), LinExpr::constant(current)));
        let result = match self.backend.check(&assumptions) {
            CheckOutcome::Sat => {
                let model = self.backend.model().expect("model available after Sat check");
                Ok(Some(Solution::extract(&self.problem, self.encoded.as_ref().unwrap(), &model, false)))
            }
            CheckOutcome::Unsat => Ok(None),
            CheckOutcome::Unknown => Err(SolveError::Unknown),
        };
        self.backend.pop();
        result
    }

    /// Enumerates distinct values of `variable` across successive solutions,
    /// one scoped `push`/`pop` per step.
    pub fn iter_solutions(&mut self, variable: VarId) -> SolutionIter<'_, B> {
        SolutionIter {
            solver: self,
            variable,
            excluded: Vec::new(),
            done: false,
        }
    }
}

pub struct SolutionIter<'s, B: SmtBackend> {
    solver: &'s mut Solver<B>,
    variable: VarId,
    excluded: Vec<smt_backend::IntCst>,
    done: bool,
}

impl<'s, B: SmtBackend> Iterator for SolutionIter<'s, B> {
    type Item = Result<Solution, SolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.solver.ensure_encoded() {
            self.done = true;
            return Some(Err(e));
        }
        let assumptions = self.solver.base_assumptions();
        self.solver.backend.push();
        for v in &self.excluded {
            self.solver.backend.assert(ne(LinExpr::var(self.variable), LinExpr::constant(*v)));
        }
        let outcome = self.solver.backend.check(&assumptions);
        let result = match outcome {
            CheckOutcome::Sat => {
                let model = self.solver.backend.model().expect("model available after Sat check");
                let value = model.int_value(self.variable);
                let sol = Solution::extract(&self.solver.problem, self.solver.encoded.as_ref().unwrap(), &model, false);
                self.excluded.push(value);
                Some(Ok(sol))
            }
            CheckOutcome::Unsat => {
                self.done = true;
                None
            }
            CheckOutcome::Unknown => {
                self.done = true;
                Some(Err(SolveError::Unknown))
            }
        };
        self.solver.backend.pop();
        result
    }
}
