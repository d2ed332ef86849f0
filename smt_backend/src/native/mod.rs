mod domain;
mod propagate;
mod search;

use crate::backend::{Assumption, BackendModel, CheckOutcome, ObjectiveSense, OptimizePriority, SmtBackend};
use crate::term::{eq, gt, BoolExpr, IntCst, LinExpr, VarId};
use domain::Domains;
use search::SearchResult;
use std::collections::HashMap;

/// Reference in-process backend implementing the black-box contract of
/// [`SmtBackend`] with a small backtracking search over bounded integer
/// (and 0/1-boolean) domains. See `smt_backend::native` module docs in
/// SPEC_FULL.md for the rationale: it stands in for a process-external SMT
/// solver so the workspace is runnable end to end without one.
pub struct NativeBackend {
    domains: Domains,
    /// Permanently asserted terms, alongside the length each push scope
    /// should truncate back to on pop.
    assertions: Vec<BoolExpr>,
    assertion_marks: Vec<usize>,
    objectives: Vec<(ObjectiveSense, LinExpr)>,
    priority: OptimizePriority,
    pareto_found: Vec<Vec<IntCst>>,
    last_model: Option<Vec<IntCst>>,
    logic: Option<String>,
    params: HashMap<String, String>,
    node_budget: u64,
}

impl NativeBackend {
    pub fn new() -> Self {
        NativeBackend {
            domains: Domains::new(),
            assertions: Vec::new(),
            assertion_marks: Vec::new(),
            objectives: Vec::new(),
            priority: OptimizePriority::Box,
            pareto_found: Vec::new(),
            last_model: None,
            logic: None,
            params: HashMap::new(),
            node_budget: search::DEFAULT_NODE_BUDGET,
        }
    }

    pub fn set_node_budget(&mut self, budget: u64) {
        self.node_budget = budget;
    }

    fn active_terms(&self, extra: &[BoolExpr]) -> Vec<BoolExpr> {
        let mut v = self.assertions.clone();
        v.extend_from_slice(extra);
        v
    }

    fn assumptions_as_terms(&self, assumptions: &[Assumption]) -> Vec<BoolExpr> {
        assumptions
            .iter()
            .map(|a| eq(LinExpr::var(a.var), LinExpr::constant(a.expected)))
            .collect()
    }

    fn check_plain(&mut self, extra: &[BoolExpr]) -> CheckOutcome {
        let terms = self.active_terms(extra);
        match search::solve(&mut self.domains, &terms, self.node_budget) {
            SearchResult::Sat(model) => {
                self.last_model = Some(model);
                CheckOutcome::Sat
            }
            SearchResult::Unsat => {
                self.last_model = None;
                CheckOutcome::Unsat
            }
            SearchResult::Unknown => {
                self.last_model = None;
                CheckOutcome::Unknown
            }
        }
    }

    fn check_lex(&mut self, extra: &[BoolExpr]) -> CheckOutcome {
        let mut fixed_bounds: Vec<BoolExpr> = Vec::new();
        let mut last_model: Option<Vec<IntCst>> = None;
        for (sense, objective) in self.objectives.clone() {
            let mut terms = self.active_terms(extra);
            terms.extend(fixed_bounds.clone());
            let maximize = matches!(sense, ObjectiveSense::Maximize);
            match search::optimize(&mut self.domains, &terms, &objective, maximize, self.node_budget) {
                SearchResult::Sat(model) => {
                    let value = objective.constant + objective.terms.iter().map(|(c, v)| c * model[v.index()]).sum::<IntCst>();
                    fixed_bounds.push(eq(objective.clone(), LinExpr::constant(value)));
                    last_model = Some(model);
                }
                SearchResult::Unsat => {
                    self.last_model = None;
                    return CheckOutcome::Unsat;
                }
                SearchResult::Unknown => {
                    self.last_model = None;
                    return CheckOutcome::Unknown;
                }
            }
        }
        self.last_model = last_model;
        CheckOutcome::Sat
    }

    fn check_pareto(&mut self, extra: &[BoolExpr]) -> CheckOutcome {
        let mut blocking = Vec::new();
        for point in &self.pareto_found {
            let mut better_somewhere = Vec::new();
            for (i, (sense, objective)) in self.objectives.iter().enumerate() {
                let prior_value = point[i];
                better_somewhere.push(match sense {
                    ObjectiveSense::Minimize => crate::term::lt(objective.clone(), LinExpr::constant(prior_value)),
                    ObjectiveSense::Maximize => gt(objective.clone(), LinExpr::constant(prior_value)),
                });
            }
            blocking.push(crate::term::or(better_somewhere));
        }
        let mut terms = extra.to_vec();
        terms.extend(blocking);
        let outcome = self.check_plain(&terms);
        if outcome == CheckOutcome::Sat {
            if let Some(model) = &self.last_model {
                let point: Vec<IntCst> = self
                    .objectives
                    .iter()
                    .map(|(_, o)| o.constant + o.terms.iter().map(|(c, v)| c * model[v.index()]).sum::<IntCst>())
                    .collect();
                self.pareto_found.push(point);
            }
        }
        outcome
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NativeModel<'a> {
    values: &'a [IntCst],
}

impl<'a> BackendModel for NativeModel<'a> {
    fn int_value(&self, var: VarId) -> IntCst {
        self.values[var.index()]
    }
}

impl SmtBackend for NativeBackend {
    type Model<'a> = NativeModel<'a>;

    fn declare_int(&mut self, name: &str, lb: IntCst, ub: IntCst) -> VarId {
        self.domains.declare(name, lb, ub)
    }

    fn assert(&mut self, term: BoolExpr) {
        self.assertions.push(term);
        self.last_model = None;
    }

    fn push(&mut self) {
        self.domains.save_state();
        self.assertion_marks.push(self.assertions.len());
    }

    fn pop(&mut self) {
        let mark = self.assertion_marks.pop().expect("pop without matching push");
        self.assertions.truncate(mark);
        // The domain trail has one save_state per push, in the same order.
        let depth = self.assertion_marks.len() as u32;
        self.domains.restore(depth);
        self.last_model = None;
    }

    fn depth(&self) -> u32 {
        self.assertion_marks.len() as u32
    }

    fn check(&mut self, assumptions: &[Assumption]) -> CheckOutcome {
        let extra = self.assumptions_as_terms(assumptions);
        if self.objectives.is_empty() {
            self.check_plain(&extra)
        } else {
            match self.priority {
                OptimizePriority::Lex | OptimizePriority::Box => self.check_lex(&extra),
                OptimizePriority::Pareto => self.check_pareto(&extra),
            }
        }
    }

    fn model(&self) -> Option<Self::Model<'_>> {
        self.last_model.as_deref().map(|values| NativeModel { values })
    }

    fn set_logic(&mut self, logic: &str) {
        self.logic = Some(logic.to_string());
    }

    fn set_param(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }

    fn minimize(&mut self, objective: LinExpr) {
        self.objectives.push((ObjectiveSense::Minimize, objective));
    }

    fn maximize(&mut self, objective: LinExpr) {
        self.objectives.push((ObjectiveSense::Maximize, objective));
    }

    fn clear_objectives(&mut self) {
        self.objectives.clear();
        self.pareto_found.clear();
    }

    fn set_priority(&mut self, priority: OptimizePriority) {
        self.priority = priority;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Assumption;
    use crate::term::*;

    #[test]
    fn sat_and_unsat() {
        let mut be = NativeBackend::new();
        let a = be.declare_bool("a");
        let b = be.declare_bool("b");
        be.assert(bvar(a));
        assert_eq!(be.check(&[]), CheckOutcome::Sat);
        assert!(be.model().unwrap().bool_value(a));
        assert!(!be.model().unwrap().bool_value(b));

        be.assert(implies(bvar(a), bvar(b)));
        assert_eq!(be.check(&[]), CheckOutcome::Sat);
        assert!(be.model().unwrap().bool_value(b));

        be.assert(not(bvar(b)));
        assert_eq!(be.check(&[]), CheckOutcome::Unsat);
    }

    #[test]
    fn push_pop_scopes_assertions() {
        let mut be = NativeBackend::new();
        let x = be.declare_int("x", 0, 10);
        be.assert(ge(LinExpr::var(x), LinExpr::constant(3)));
        assert_eq!(be.check(&[]), CheckOutcome::Sat);
        be.push();
        be.assert(le(LinExpr::var(x), LinExpr::constant(1)));
        assert_eq!(be.check(&[]), CheckOutcome::Unsat);
        be.pop();
        assert_eq!(be.check(&[]), CheckOutcome::Sat);
        assert!(be.model().unwrap().int_value(x) >= 3);
    }

    #[test]
    fn minimize_finds_optimum() {
        let mut be = NativeBackend::new();
        let a = be.declare_int("a", 0, 10);
        let b = be.declare_int("b", 0, 10);
        let c = be.declare_int("c", 0, 10);
        be.assert(lt(LinExpr::var(a), LinExpr::var(b)));
        be.assert(lt(LinExpr::var(b), LinExpr::var(c)));
        be.assert(or([ge(LinExpr::var(b), LinExpr::constant(6)), ge(LinExpr::var(b), LinExpr::constant(8))]));
        be.minimize(LinExpr::var(c));
        assert_eq!(be.check(&[]), CheckOutcome::Sat);
        assert_eq!(be.model().unwrap().int_value(c), 7);
    }

    #[test]
    fn assumptions_are_scoped_to_one_check() {
        let mut be = NativeBackend::new();
        let a = be.declare_bool("a");
        be.assert(bvar(a));
        assert_eq!(be.check(&[Assumption::is_false(a)]), CheckOutcome::Unsat);
        // The assumption must not leak: without it, the base assertion
        // (a == true) is still satisfiable on the very next check.
        assert_eq!(be.check(&[]), CheckOutcome::Sat);
    }
}
