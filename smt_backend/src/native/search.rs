//! Chronological backtracking search with propagation at every node,
//! plus branch-and-bound optimization built on top of it (the same
//! assert-a-tighter-bound-and-recheck loop the solver driver itself uses
//! for incremental optimization, just run inside the backend).

use crate::native::domain::Domains;
use crate::native::propagate::{eval_complete, propagate_fixpoint};
use crate::term::{gt, lt, BoolExpr, IntCst, LinExpr, VarId};
use std::collections::BTreeSet;

pub enum SearchResult {
    Sat(Vec<IntCst>),
    Unsat,
    Unknown,
}

/// Safety cap on the number of search-tree nodes explored by a single
/// `check`, so a pathological instance reports `Unknown` instead of
/// hanging forever. Generous for the problem sizes this backend targets.
pub const DEFAULT_NODE_BUDGET: u64 = 2_000_000;

fn referenced_vars(terms: &[BoolExpr], out: &mut BTreeSet<VarId>) {
    fn walk(t: &BoolExpr, out: &mut BTreeSet<VarId>) {
        match t {
            BoolExpr::Const(_) => {}
            BoolExpr::Var(v) => {
                out.insert(*v);
            }
            BoolExpr::Not(inner) => walk(inner, out),
            BoolExpr::And(cs) | BoolExpr::Or(cs) => cs.iter().for_each(|c| walk(c, out)),
            BoolExpr::Le(lin) | BoolExpr::Eq(lin) => {
                for &(_, v) in &lin.terms {
                    out.insert(v);
                }
            }
        }
    }
    for t in terms {
        walk(t, out);
    }
}

fn pick_branch_var(domains: &Domains, scope: &BTreeSet<VarId>) -> Option<VarId> {
    scope
        .iter()
        .copied()
        .filter(|v| !domains.is_resolved(*v))
        .min_by_key(|v| {
            let (lo, hi) = domains.bounds(*v);
            hi - lo
        })
}

fn search_rec(domains: &mut Domains, terms: &[BoolExpr], scope: &BTreeSet<VarId>, budget: &mut u64) -> SearchResult {
    if *budget == 0 {
        return SearchResult::Unknown;
    }
    *budget -= 1;

    if propagate_fixpoint(terms, domains).is_err() {
        return SearchResult::Unsat;
    }

    match pick_branch_var(domains, scope) {
        Some(var) => {
            let (lo, hi) = domains.bounds(var);
            let mut saw_unknown = false;
            for value in lo..=hi {
                let mark = domains.save_state();
                let fixed = domains.fix(var, value).is_ok();
                let outcome = if fixed {
                    search_rec(domains, terms, scope, budget)
                } else {
                    SearchResult::Unsat
                };
                match outcome {
                    SearchResult::Sat(model) => return SearchResult::Sat(model),
                    SearchResult::Unknown => saw_unknown = true,
                    SearchResult::Unsat => {}
                }
                domains.restore(mark);
                if *budget == 0 {
                    return SearchResult::Unknown;
                }
            }
            if saw_unknown {
                SearchResult::Unknown
            } else {
                SearchResult::Unsat
            }
        }
        None => {
            if terms.iter().all(|t| eval_complete(t, domains)) {
                SearchResult::Sat(domains.all_values())
            } else {
                SearchResult::Unsat
            }
        }
    }
}

/// Finds a satisfying assignment for `terms`, or reports `Unsat`/`Unknown`.
/// Leaves `domains` exactly as it found it (all tightenings are undone).
pub fn solve(domains: &mut Domains, terms: &[BoolExpr], node_budget: u64) -> SearchResult {
    let mut scope = BTreeSet::new();
    referenced_vars(terms, &mut scope);
    let mark = domains.save_state();
    let mut budget = node_budget;
    let result = search_rec(domains, terms, &scope, &mut budget);
    domains.restore(mark);
    result
}

/// Branch-and-bound optimization of `objective` (minimize or maximize)
/// subject to `terms`, implemented as the same assert-a-tighter-bound loop
/// the driver runs for incremental multi-objective optimization: find a
/// solution, add a strict-improvement constraint, repeat until unsat.
pub fn optimize(
    domains: &mut Domains,
    terms: &[BoolExpr],
    objective: &LinExpr,
    maximize: bool,
    node_budget: u64,
) -> SearchResult {
    let mut best: Option<Vec<IntCst>> = None;
    let mut bound: Option<BoolExpr> = None;
    let mut remaining = node_budget;
    loop {
        let mut active = terms.to_vec();
        if let Some(b) = &bound {
            active.push(b.clone());
        }
        match solve(domains, &active, remaining) {
            SearchResult::Sat(model) => {
                let value = eval_model_lin(objective, &model);
                bound = Some(if maximize {
                    gt(objective_as_lin(objective), LinExpr::constant(value))
                } else {
                    lt(objective_as_lin(objective), LinExpr::constant(value))
                });
                best = Some(model);
            }
            SearchResult::Unsat => break,
            SearchResult::Unknown => {
                return match best {
                    Some(_) => SearchResult::Unknown,
                    None => SearchResult::Unknown,
                }
            }
        }
        if remaining > 0 {
            // Budget is re-granted per iteration: each iteration is an
            // independent `check`-like call in the spec's incremental loop.
            remaining = node_budget;
        }
    }
    match best {
        Some(model) => SearchResult::Sat(model),
        None => SearchResult::Unsat,
    }
}

fn objective_as_lin(lin: &LinExpr) -> LinExpr {
    lin.clone()
}

fn eval_model_lin(lin: &LinExpr, model: &[IntCst]) -> IntCst {
    lin.constant + lin.terms.iter().map(|(c, v)| c * model[v.index()]).sum::<IntCst>()
}
