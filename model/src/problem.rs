//! Problem / encoder (component 5, §3.6, §4.1–§4.3): the container that
//! owns every entity and walks them in dependency order to emit the SMT
//! problem, per the design notes' "name-indexed arena inside Problem"
//! translation strategy for the model's cross-references.

use crate::arith::guarded;
use crate::buffer::Buffer;
use crate::constraint::Constraint;
use crate::ctx::{DebugGuard, EncoderCtx, Horizon};
use crate::error::{EncodingError, ModelError, RcpspError};
use crate::ids::Label;
use crate::indicator::Indicator;
use crate::objective::Objective;
use crate::registry::{EntityKind, Registry};
use crate::resolved::{Resolved, ResourceUsage, UsageList};
use crate::resource::{Resource, SelectWorkers};
use crate::task::{ResourceRequirement, Task, TaskVars};
use itertools::Itertools;
use smt_backend::{and, bvar, ge, implies, le, lt, or, reify, BoolExpr, IntCst, LinExpr, SmtBackend, VarId};
use std::collections::HashMap;
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
pub enum HorizonSpec {
    Fixed(IntCst),
    /// Itself a decision variable, bounded above by `ceiling`.
    Variable { ceiling: IntCst },
}

pub struct Problem {
    registry: Registry,
    horizon: HorizonSpec,
    tasks: Vec<Task>,
    resources: Vec<Resource>,
    selects: Vec<SelectWorkers>,
    buffers: Vec<Buffer>,
    constraints: Vec<Constraint>,
    indicators: Vec<Indicator>,
    objectives: Vec<Objective>,
    frozen: bool,
}

/// Everything the solver driver needs after a successful `encode`: the
/// resolved variable bag, the registered indicators' variables, the
/// objectives (unconsumed — the driver decides how to combine them), and
/// the debug-mode guards when debug mode was requested.
pub struct EncodedProblem {
    pub resolved: Resolved,
    pub indicators: HashMap<Label, VarId>,
    pub objectives: Vec<Objective>,
    pub guards: Vec<DebugGuard>,
    pub horizon_var: Option<VarId>,
}

impl Problem {
    pub fn new(horizon: HorizonSpec) -> Self {
        Problem {
            registry: Registry::new(),
            horizon,
            tasks: Vec::new(),
            resources: Vec::new(),
            selects: Vec::new(),
            buffers: Vec::new(),
            constraints: Vec::new(),
            indicators: Vec::new(),
            objectives: Vec::new(),
            frozen: false,
        }
    }

    fn guard_frozen(&self) -> Result<(), ModelError> {
        if self.frozen {
            Err(ModelError::ProblemFrozen)
        } else {
            Ok(())
        }
    }

    pub fn add_task(&mut self, task: Task) -> Result<&mut Self, ModelError> {
        self.guard_frozen()?;
        self.registry.register(EntityKind::Task, task.label())?;
        self.tasks.push(task);
        Ok(self)
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<&mut Self, ModelError> {
        self.guard_frozen()?;
        self.registry.register(EntityKind::Resource, resource.label())?;
        self.resources.push(resource);
        Ok(self)
    }

    pub fn add_select_workers(&mut self, select: SelectWorkers) -> Result<&mut Self, ModelError> {
        self.guard_frozen()?;
        self.registry.register(EntityKind::Resource, select.label())?;
        self.selects.push(select);
        Ok(self)
    }

    pub fn add_buffer(&mut self, buffer: Buffer) -> Result<&mut Self, ModelError> {
        self.guard_frozen()?;
        self.registry.register(EntityKind::Buffer, buffer.label())?;
        self.buffers.push(buffer);
        Ok(self)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<&mut Self, ModelError> {
        self.guard_frozen()?;
        self.registry.register(EntityKind::Constraint, constraint.label())?;
        self.constraints.push(constraint);
        Ok(self)
    }

    pub fn add_indicator(&mut self, indicator: Indicator) -> Result<&mut Self, ModelError> {
        self.guard_frozen()?;
        self.registry.register(EntityKind::Indicator, indicator.label())?;
        self.indicators.push(indicator);
        Ok(self)
    }

    pub fn add_objective(&mut self, objective: Objective) -> Result<&mut Self, ModelError> {
        self.guard_frozen()?;
        self.registry.register(EntityKind::Objective, objective.label())?;
        self.objectives.push(objective);
        Ok(self)
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    /// Translates the whole model into SMT assertions against `backend`.
    /// Freezes the problem first, per the registry's "read-only once
    /// `solve()` begins" contract.
    #[instrument(name = "problem.encode", skip_all)]
    pub fn encode<B: SmtBackend>(&mut self, backend: &mut B, debug: bool) -> Result<EncodedProblem, RcpspError> {
        self.frozen = true;
        for objective in &self.objectives {
            if !self.indicators.iter().any(|i| i.label() == objective.indicator()) {
                return Err(EncodingError::UnknownIndicator {
                    objective: objective.label().clone(),
                    indicator: objective.indicator().clone(),
                }
                .into());
            }
        }

        let horizon_var = match self.horizon {
            HorizonSpec::Fixed(_) => None,
            HorizonSpec::Variable { ceiling } => Some(backend.declare_int("Horizon", 0, ceiling)),
        };
        let horizon = match (self.horizon, horizon_var) {
            (HorizonSpec::Fixed(h), _) => Horizon::Fixed(h),
            (HorizonSpec::Variable { ceiling }, Some(v)) => Horizon::Variable { var: v, ceiling },
            _ => unreachable!(),
        };
        let mut ctx = EncoderCtx::new(backend, horizon, debug);
        let mut resolved = Resolved::new();
        resolved.horizon = Some(*ctx.horizon());

        for task in &self.tasks {
            let vars = task.encode(&mut ctx);
            resolved.tasks.insert(task.label().clone(), vars);
            if let Some(due) = task.due_date() {
                resolved.due_dates.insert(task.label().clone(), due);
            }
        }

        for select in &self.selects {
            let picked = select.encode(&mut ctx);
            resolved.select.insert(select.label().clone(), picked);
        }

        self.validate_dynamic()?;
        self.encode_dynamic_joins(&mut ctx, &mut resolved);
        resolved.resource_usage = self.build_resource_usage(&resolved);

        let resources_by_label: HashMap<Label, &Resource> = self.resources.iter().map(|r| (r.label().clone(), r)).collect();
        for resource in &self.resources {
            if let Some(usages) = resolved.resource_usage.get(resource.label()).cloned() {
                encode_resource_capacity(&mut ctx, resource, &usages, &resolved);
            }
        }
        for task in &self.tasks {
            let tv = resolved.task(task.label()).expect("task just encoded above");
            encode_work_amount(&mut ctx, task, tv, &resources_by_label, &resolved);
        }

        for buffer in &self.buffers {
            let bvars = buffer.encode(&mut ctx, &resolved.tasks);
            resolved.buffers.insert(buffer.label().clone(), bvars);
        }

        for constraint in &self.constraints {
            constraint.assert(&mut ctx, &resolved)?;
        }

        let mut indicator_vars = HashMap::new();
        for indicator in &self.indicators {
            let v = indicator.encode(&mut ctx, &resolved)?;
            indicator_vars.insert(indicator.label().clone(), v);
        }

        Ok(EncodedProblem {
            resolved,
            indicators: indicator_vars,
            objectives: self.objectives.clone(),
            guards: ctx.guards().to_vec(),
            horizon_var,
        })
    }

    fn validate_dynamic(&self) -> Result<(), RcpspError> {
        for task in &self.tasks {
            if task.is_optional() {
                continue;
            }
            for req in task.required() {
                let labels: Vec<&Label> = match req {
                    ResourceRequirement::Single(r) => vec![r],
                    ResourceRequirement::All(rs) => rs.iter().collect(),
                    ResourceRequirement::Select(_) => continue,
                };
                for r in labels {
                    if task.is_dynamic(r) {
                        return Err(EncodingError::DynamicWorkerMissingScheduledGuard {
                            task: task.label().clone(),
                            worker: r.clone(),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    fn encode_dynamic_joins<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, resolved: &mut Resolved) {
        for task in &self.tasks {
            let tv = *resolved.task(task.label()).expect("task just encoded above");
            let direct: Vec<&Label> = task
                .required()
                .iter()
                .flat_map(|req| match req {
                    ResourceRequirement::Single(r) => vec![r],
                    ResourceRequirement::All(rs) => rs.iter().collect(),
                    ResourceRequirement::Select(_) => vec![],
                })
                .collect();
            for r in direct {
                if task.is_dynamic(r) {
                    let join = ctx.fresh_int(&format!("{}_{}_join", task.label(), r), 0, ctx.horizon().ceiling());
                    ctx.assert_named(format!("{}_{}_join_in_range", task.label(), r), ge(LinExpr::var(join), LinExpr::var(tv.start)));
                    ctx.assert_named(format!("{}_{}_join_before_end", task.label(), r), le(LinExpr::var(join), LinExpr::var(tv.end)));
                    resolved.join_vars.insert((task.label().clone(), r.clone()), join);
                }
            }
        }
    }

    fn build_resource_usage(&self, resolved: &Resolved) -> HashMap<Label, UsageList> {
        let mut usage: HashMap<Label, UsageList> = HashMap::new();
        for task in &self.tasks {
            let tv = resolved.task(task.label()).expect("task just encoded above");
            for req in task.required() {
                match req {
                    ResourceRequirement::Single(r) => {
                        usage.entry(r.clone()).or_default().push(ResourceUsage {
                            task: task.label().clone(),
                            guard: tv.guard(),
                            dynamic: task.is_dynamic(r),
                        });
                    }
                    ResourceRequirement::All(list) => {
                        for r in list {
                            usage.entry(r.clone()).or_default().push(ResourceUsage {
                                task: task.label().clone(),
                                guard: tv.guard(),
                                dynamic: task.is_dynamic(r),
                            });
                        }
                    }
                    ResourceRequirement::Select(select_label) => {
                        if let Some(picked) = resolved.select.get(select_label) {
                            for (candidate, pvar) in picked {
                                usage.entry(candidate.clone()).or_default().push(ResourceUsage {
                                    task: task.label().clone(),
                                    guard: and([tv.guard(), bvar(*pvar)]),
                                    dynamic: task.is_dynamic(candidate),
                                });
                            }
                        }
                    }
                }
            }
        }
        usage
    }
}

fn effective_interval(resolved: &Resolved, resource: &Label, usage: &ResourceUsage) -> (LinExpr, LinExpr) {
    let t = resolved.task(&usage.task).expect("resource usage references an already-encoded task");
    let start = if usage.dynamic {
        LinExpr::var(resolved.join_vars[&(usage.task.clone(), resource.clone())])
    } else {
        LinExpr::var(t.start)
    };
    (start, LinExpr::var(t.end))
}

/// §4.3: non-overlap for `capacity == 1`, per-instant counting otherwise.
fn encode_resource_capacity<B: SmtBackend>(ctx: &mut EncoderCtx<B>, resource: &Resource, usages: &[ResourceUsage], resolved: &Resolved) {
    let capacity = resource.capacity();
    if capacity <= 1 {
        for ((i, ui), (j, uj)) in usages.iter().enumerate().tuple_combinations() {
            let (start_i, end_i) = effective_interval(resolved, resource.label(), ui);
            let (start_j, end_j) = effective_interval(resolved, resource.label(), uj);
            let guard = and([ui.guard.clone(), uj.guard.clone()]);
            ctx.assert_named(
                format!("{}_nonoverlap_{i}_{j}", resource.label()),
                implies(guard, or([le(end_i, start_j), le(end_j, start_i)])),
            );
        }
        return;
    }

    let mut instants: Vec<VarId> = Vec::new();
    for u in usages {
        let t = resolved.task(&u.task).expect("resource usage references an already-encoded task");
        instants.push(t.start);
        instants.push(t.end);
    }
    instants.sort_by_key(|v| v.index());
    instants.dedup();

    for (idx, instant) in instants.iter().enumerate() {
        let mut parts = Vec::new();
        for (k, u) in usages.iter().enumerate() {
            let (start, end) = effective_interval(resolved, resource.label(), u);
            let overlaps_instant = and([le(start, LinExpr::var(*instant)), lt(LinExpr::var(*instant), end)]);
            let flag = ctx.fresh_bool(&format!("{}_cumulative_{idx}_{k}", resource.label()));
            ctx.assert_named(
                format!("{}_cumulative_{idx}_{k}_def", resource.label()),
                reify(flag, and([u.guard.clone(), overlaps_instant])),
            );
            parts.push(LinExpr::var(flag));
        }
        ctx.assert_named(
            format!("{}_capacity_{idx}", resource.label()),
            le(LinExpr::sum(parts), LinExpr::constant(capacity)),
        );
    }
}

/// §4.3 work-amount clause: `Σ productivity_w * duration_contribution_w(T) >= W`.
fn encode_work_amount<B: SmtBackend>(
    ctx: &mut EncoderCtx<B>,
    task: &Task,
    tv: &TaskVars,
    resources: &HashMap<Label, &Resource>,
    resolved: &Resolved,
) {
    let w = task.work_amount();
    if w <= 0 {
        return;
    }
    let mut contributions = Vec::new();
    let mut any_productive = false;

    let mut collect = |ctx: &mut EncoderCtx<B>, r_label: &Label, guard: BoolExpr| {
        let Some(resource) = resources.get(r_label) else { return };
        if resource.productivity() <= 0 {
            return;
        }
        any_productive = true;
        let duration_term = if task.is_dynamic(r_label) {
            let join = resolved.join_vars[&(task.label().clone(), r_label.clone())];
            LinExpr::var(tv.end).sub(LinExpr::var(join))
        } else {
            LinExpr::var(tv.duration)
        };
        let contrib = guarded(
            ctx,
            &format!("{}_{}_work", task.label(), r_label),
            guard,
            duration_term.scale(resource.productivity()),
        );
        contributions.push(contrib);
    };

    for req in task.required() {
        match req {
            ResourceRequirement::Single(r) => collect(ctx, r, tv.guard()),
            ResourceRequirement::All(list) => {
                for r in list {
                    collect(ctx, r, tv.guard());
                }
            }
            ResourceRequirement::Select(select_label) => {
                if let Some(picked) = resolved.select.get(select_label).cloned() {
                    for (candidate, pvar) in picked {
                        collect(ctx, &candidate, and([tv.guard(), bvar(pvar)]));
                    }
                }
            }
        }
    }

    if any_productive {
        ctx.assert_named(format!("{}_work_amount", task.label()), ge(LinExpr::sum(contributions), LinExpr::constant(w)));
    } else {
        ctx.assert_named(format!("{}_work_amount_unreachable", task.label()), implies(tv.guard(), BoolExpr::Const(false)));
    }
}
