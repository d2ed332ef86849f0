//! Task entity (§3.1, §4.2): a time interval plus variant-specific duration
//! policy and optional resource/date attributes.

use crate::ctx::EncoderCtx;
use crate::error::ModelError;
use crate::ids::{Label, TaskId};
use smt_backend::{eq, ge, implies, le, BoolExpr, IntCst, LinExpr, SmtBackend, VarId};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationPolicy {
    Zero,
    Fixed(IntCst),
    Bounded { min: IntCst, max: IntCst },
    Allowed(Vec<IntCst>),
}

/// How a resource participates in a task's required list: a single
/// resource, a bundle of resources all simultaneously required, or a
/// `SelectWorkers` choice node (kept by name; resolved against the
/// problem's registered [`crate::resource::SelectWorkers`] at encode time).
#[derive(Debug, Clone)]
pub enum ResourceRequirement {
    Single(Label),
    All(Vec<Label>),
    Select(Label),
}

#[derive(Debug, Clone)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) label: Label,
    pub(crate) duration: DurationPolicy,
    pub(crate) optional: bool,
    pub(crate) release_date: Option<IntCst>,
    pub(crate) due_date: Option<IntCst>,
    pub(crate) due_date_is_deadline: bool,
    pub(crate) priority: IntCst,
    pub(crate) work_amount: IntCst,
    pub(crate) required: Vec<ResourceRequirement>,
    pub(crate) dynamic: HashSet<Label>,
}

pub struct TaskBuilder {
    task: Task,
}

impl Task {
    fn new(label: impl Into<Label>, duration: DurationPolicy) -> TaskBuilder {
        TaskBuilder {
            task: Task {
                id: TaskId::next(),
                label: label.into(),
                duration,
                optional: false,
                release_date: None,
                due_date: None,
                due_date_is_deadline: false,
                priority: 0,
                work_amount: 0,
                required: Vec::new(),
                dynamic: HashSet::new(),
            },
        }
    }

    pub fn zero_duration(label: impl Into<Label>) -> TaskBuilder {
        Task::new(label, DurationPolicy::Zero)
    }

    pub fn fixed_duration(label: impl Into<Label>, duration: IntCst) -> TaskBuilder {
        Task::new(label, DurationPolicy::Fixed(duration))
    }

    pub fn variable_duration(label: impl Into<Label>, min: IntCst, max: IntCst) -> TaskBuilder {
        Task::new(label, DurationPolicy::Bounded { min, max })
    }

    pub fn variable_duration_allowed(label: impl Into<Label>, allowed: Vec<IntCst>) -> TaskBuilder {
        Task::new(label, DurationPolicy::Allowed(allowed))
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn required(&self) -> &[ResourceRequirement] {
        &self.required
    }

    pub fn is_dynamic(&self, resource: &str) -> bool {
        self.dynamic.contains(resource)
    }

    pub fn work_amount(&self) -> IntCst {
        self.work_amount
    }

    pub fn due_date(&self) -> Option<IntCst> {
        self.due_date
    }
}

impl TaskBuilder {
    pub fn optional(mut self) -> Self {
        self.task.optional = true;
        self
    }

    pub fn release_date(mut self, v: IntCst) -> Self {
        self.task.release_date = Some(v);
        self
    }

    pub fn due_date(mut self, v: IntCst, is_deadline: bool) -> Self {
        self.task.due_date = Some(v);
        self.task.due_date_is_deadline = is_deadline;
        self
    }

    pub fn priority(mut self, p: IntCst) -> Self {
        self.task.priority = p;
        self
    }

    pub fn work_amount(mut self, w: IntCst) -> Self {
        self.task.work_amount = w;
        self
    }

    pub fn require_resource(mut self, resource: impl Into<Label>) -> Self {
        self.task.required.push(ResourceRequirement::Single(resource.into()));
        self
    }

    pub fn require_resources(mut self, resources: Vec<Label>) -> Self {
        self.task.required.push(ResourceRequirement::All(resources));
        self
    }

    pub fn require_select(mut self, select: impl Into<Label>) -> Self {
        self.task.required.push(ResourceRequirement::Select(select.into()));
        self
    }

    /// Marks `resource` as a dynamic joiner: it may attach to this task any
    /// time within `[start, end]` rather than for the whole interval (§4.3).
    pub fn add_dynamic_resource(mut self, resource: impl Into<Label>) -> Self {
        self.task.dynamic.insert(resource.into());
        self
    }

    pub fn build(self) -> Result<Task, ModelError> {
        let t = self.task;
        if t.priority < 0 {
            return Err(ModelError::NegativeValue {
                entity: t.label.clone(),
                field: "priority",
                value: t.priority,
            });
        }
        if t.work_amount < 0 {
            return Err(ModelError::NegativeValue {
                entity: t.label.clone(),
                field: "work_amount",
                value: t.work_amount,
            });
        }
        if let DurationPolicy::Bounded { min, max } = t.duration {
            if min > max {
                return Err(ModelError::InconsistentDurationBounds {
                    task: t.label.clone(),
                    min,
                    max,
                });
            }
        }
        if let DurationPolicy::Allowed(ref allowed) = t.duration {
            if allowed.is_empty() {
                return Err(ModelError::EmptyAllowedDurations { task: t.label.clone() });
            }
        }
        for req in &t.required {
            if let ResourceRequirement::Single(r) = req {
                if r == &t.label {
                    return Err(ModelError::ResourceSelfAssignment {
                        task: t.label.clone(),
                        resource: r.clone(),
                    });
                }
            }
        }
        Ok(t)
    }
}

/// Decision variables introduced for one task, resolved once per `encode`.
#[derive(Debug, Clone, Copy)]
pub struct TaskVars {
    pub start: VarId,
    pub end: VarId,
    pub duration: VarId,
    /// `None` for mandatory tasks: treated as always-true without wasting a
    /// variable, matching §4.2's "add `scheduled = true` (or omit the
    /// variable)".
    pub scheduled: Option<VarId>,
}

impl TaskVars {
    /// The guard term for "this task's clauses are active": `scheduled`
    /// itself when present, else the constant `true`.
    pub fn guard(&self) -> BoolExpr {
        match self.scheduled {
            Some(v) => smt_backend::bvar(v),
            None => BoolExpr::Const(true),
        }
    }
}

impl Task {
    pub fn encode<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>) -> TaskVars {
        let uid = self.id.uid();
        let ceiling = ctx.horizon().ceiling();
        let start = ctx.new_int("Task", &self.label, uid, "start", 0, ceiling);
        let end = ctx.new_int("Task", &self.label, uid, "end", 0, ceiling);
        let duration = match &self.duration {
            DurationPolicy::Zero => ctx.new_int("Task", &self.label, uid, "duration", 0, 0),
            DurationPolicy::Fixed(d) => ctx.new_int("Task", &self.label, uid, "duration", *d, *d),
            DurationPolicy::Bounded { min, max } => ctx.new_int("Task", &self.label, uid, "duration", *min, *max),
            DurationPolicy::Allowed(allowed) => {
                let lo = *allowed.iter().min().unwrap();
                let hi = *allowed.iter().max().unwrap();
                ctx.new_int("Task", &self.label, uid, "duration", lo, hi)
            }
        };
        let scheduled = if self.optional {
            Some(ctx.new_bool("Task", &self.label, uid, "scheduled"))
        } else {
            None
        };
        let vars = TaskVars { start, end, duration, scheduled };
        let guard = vars.guard();

        ctx.assert_named(
            format!("{}_end_eq_start_plus_duration", self.label),
            implies(guard.clone(), eq(LinExpr::var(end), LinExpr::var(start).add(LinExpr::var(duration)))),
        );
        ctx.assert_named(
            format!("{}_start_nonneg", self.label),
            implies(guard.clone(), ge(LinExpr::var(start), LinExpr::constant(0))),
        );
        ctx.assert_named(
            format!("{}_end_within_horizon", self.label),
            implies(guard.clone(), le(LinExpr::var(end), ctx.horizon().as_lin())),
        );

        if let DurationPolicy::Allowed(allowed) = &self.duration {
            let choices: Vec<BoolExpr> = allowed
                .iter()
                .map(|d| eq(LinExpr::var(duration), LinExpr::constant(*d)))
                .collect();
            ctx.assert_named(format!("{}_duration_allowed", self.label), implies(guard.clone(), smt_backend::or(choices)));
        }

        if let Some(release) = self.release_date {
            ctx.assert_named(
                format!("{}_release_date", self.label),
                implies(guard.clone(), ge(LinExpr::var(start), LinExpr::constant(release))),
            );
        }
        if let Some(due) = self.due_date {
            if self.due_date_is_deadline {
                ctx.assert_named(
                    format!("{}_due_date_deadline", self.label),
                    implies(guard.clone(), le(LinExpr::var(end), LinExpr::constant(due))),
                );
            }
        }

        vars
    }
}
