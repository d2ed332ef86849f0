//! The solution model (component 7, §6): a read-only snapshot of one
//! `check()` outcome, plus the `ScheduleExport` façade that mirrors it for
//! JSON round-tripping.

use rcpsp_model::{Accumulator, EncodedProblem, Horizon, IndicatorKind, Label, Problem, Resolved, ResourceRequirement, Task};
use serde::{Deserialize, Serialize};
use smt_backend::{BackendModel, BoolExpr, IntCst};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub start: IntCst,
    pub end: IntCst,
    pub duration: IntCst,
    pub scheduled: bool,
    pub assigned: Vec<Label>,
}

/// One immutable snapshot of a satisfying assignment (§5: "Solutions are
/// immutable snapshots; the driver produces a fresh solution per
/// successful `check()`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub horizon: IntCst,
    pub tasks: HashMap<Label, TaskRecord>,
    pub buffers: HashMap<Label, Vec<(IntCst, IntCst)>>,
    pub indicators: HashMap<Label, IntCst>,
    /// `false` when returned early by a timeout/interrupt or an
    /// `Optimize`-backend box relaxation; `true` when the driver proved it.
    pub optimal: bool,
}

fn eval_bool<M: BackendModel>(model: &M, e: &BoolExpr) -> bool {
    match e {
        BoolExpr::Const(b) => *b,
        BoolExpr::Var(v) => model.bool_value(*v),
        BoolExpr::Not(inner) => !eval_bool(model, inner),
        BoolExpr::And(es) => es.iter().all(|e| eval_bool(model, e)),
        BoolExpr::Or(es) => es.iter().any(|e| eval_bool(model, e)),
        BoolExpr::Le(lin) => model.eval_lin(lin) <= 0,
        BoolExpr::Eq(lin) => model.eval_lin(lin) == 0,
    }
}

fn assigned_resources<M: BackendModel>(task: &Task, resolved: &Resolved, model: &M) -> Vec<Label> {
    let mut out = Vec::new();
    for req in task.required() {
        match req {
            ResourceRequirement::Single(r) => {
                if let Some(usages) = resolved.resource_usage.get(r) {
                    if usages.iter().any(|u| &u.task == task.label() && eval_bool(model, &u.guard)) {
                        out.push(r.clone());
                    }
                }
            }
            ResourceRequirement::All(list) => {
                for r in list {
                    if let Some(usages) = resolved.resource_usage.get(r) {
                        if usages.iter().any(|u| &u.task == task.label() && eval_bool(model, &u.guard)) {
                            out.push(r.clone());
                        }
                    }
                }
            }
            ResourceRequirement::Select(select_label) => {
                if let Some(picked) = resolved.select.get(select_label) {
                    for (candidate, var) in picked {
                        if model.bool_value(*var) {
                            out.push(candidate.clone());
                        }
                    }
                }
            }
        }
    }
    out
}

/// Cost integrals over an as-yet-undetermined busy window are nonlinear in
/// the decision variables (see `rcpsp_model::indicator`'s module docs), so
/// `ResourceCost` is computed here from the concrete solution rather than
/// read back from an SMT variable.
fn resource_cost<M: BackendModel>(resources: &[Label], problem: &Problem, resolved: &Resolved, model: &M) -> IntCst {
    let mut acc = Accumulator::new();
    for r_label in resources {
        let Some(resource) = problem.resources().iter().find(|r| r.label() == r_label) else {
            continue;
        };
        let Some(cost_fn) = resource.cost() else { continue };
        let Some(usages) = resolved.resource_usage.get(r_label) else { continue };
        for u in usages.iter() {
            if !eval_bool(model, &u.guard) {
                continue;
            }
            let t = resolved.task(&u.task).expect("resource usage references an already-encoded task");
            let start = if u.dynamic {
                model.int_value(resolved.join_vars[&(u.task.clone(), r_label.clone())])
            } else {
                model.int_value(t.start)
            };
            let end = model.int_value(t.end);
            acc.add(cost_fn.integral(start, end));
        }
    }
    acc.finish()
}

impl Solution {
    pub(crate) fn extract<M: BackendModel>(problem: &Problem, encoded: &EncodedProblem, model: &M, optimal: bool) -> Solution {
        let horizon = match encoded.resolved.horizon() {
            Horizon::Fixed(h) => *h,
            Horizon::Variable { var, .. } => model.int_value(*var),
        };

        let mut tasks = HashMap::new();
        for task in problem.tasks() {
            let tv = encoded.resolved.task(task.label()).expect("task just encoded above");
            let scheduled = tv.scheduled.map(|v| model.bool_value(v)).unwrap_or(true);
            tasks.insert(
                task.label().clone(),
                TaskRecord {
                    start: model.int_value(tv.start),
                    end: model.int_value(tv.end),
                    duration: model.int_value(tv.duration),
                    scheduled,
                    assigned: assigned_resources(task, &encoded.resolved, model),
                },
            );
        }

        let mut buffers = HashMap::new();
        for buffer in problem.buffers() {
            if let Some(bvars) = encoded.resolved.buffers.get(buffer.label()) {
                let mut timeline = vec![(0, model.int_value(bvars.initial))];
                for bp in &bvars.breakpoints {
                    timeline.push((model.int_value(bp.time), model.int_value(bp.level)));
                }
                timeline.sort_by_key(|(t, _)| *t);
                buffers.insert(buffer.label().clone(), timeline);
            }
        }

        let mut indicators = HashMap::new();
        for indicator in problem.indicators() {
            let value = match indicator.kind() {
                IndicatorKind::ResourceCost { resources } => resource_cost(resources, problem, &encoded.resolved, model),
                _ => encoded
                    .indicators
                    .get(indicator.label())
                    .map(|v| model.int_value(*v))
                    .unwrap_or(0),
            };
            indicators.insert(indicator.label().clone(), value);
        }

        Solution {
            horizon,
            tasks,
            buffers,
            indicators,
            optimal,
        }
    }

    pub fn to_export(&self) -> ScheduleExport {
        ScheduleExport {
            horizon: self.horizon,
            tasks: self.tasks.clone(),
            buffers: self.buffers.clone(),
            indicators: self.indicators.clone(),
            optimal: self.optimal,
        }
    }
}

/// A plain serde mirror of [`Solution`] (§6's "persisted state layout").
/// Carries no logic; its only purpose is JSON round-tripping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleExport {
    pub horizon: IntCst,
    pub tasks: HashMap<Label, TaskRecord>,
    pub buffers: HashMap<Label, Vec<(IntCst, IntCst)>>,
    pub indicators: HashMap<Label, IntCst>,
    pub optimal: bool,
}

impl ScheduleExport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<ScheduleExport> {
        serde_json::from_str(s)
    }
}
