//! Buffer entity (§3.3, §4.4 buffer linkage): a piecewise-constant integer
//! level driven by load/unload events attached to tasks.

use crate::ctx::EncoderCtx;
use crate::error::ModelError;
use crate::ids::{BufferId, Label};
use crate::task::TaskVars;
use smt_backend::{eq, implies, ite_bool, le, ne, BoolExpr, IntCst, LinExpr, SmtBackend, VarId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Fires at `task.start`, contributes `-quantity`.
    Unload,
    /// Fires at `task.end`, contributes `+quantity`.
    Load,
}

#[derive(Debug, Clone)]
pub struct BufferEvent {
    pub task: Label,
    pub kind: EventKind,
    pub quantity: IntCst,
}

#[derive(Debug, Clone)]
pub struct Buffer {
    pub(crate) id: BufferId,
    pub(crate) label: Label,
    pub(crate) initial_level: Option<IntCst>,
    pub(crate) final_level: Option<IntCst>,
    pub(crate) lower_bound: IntCst,
    pub(crate) upper_bound: IntCst,
    pub(crate) concurrent: bool,
    pub(crate) events: Vec<BufferEvent>,
}

pub struct BufferBuilder {
    buffer: Buffer,
}

impl Buffer {
    fn new(label: impl Into<Label>, concurrent: bool) -> BufferBuilder {
        BufferBuilder {
            buffer: Buffer {
                id: BufferId::next(),
                label: label.into(),
                initial_level: None,
                final_level: None,
                lower_bound: 0,
                upper_bound: IntCst::MAX,
                concurrent,
                events: Vec::new(),
            },
        }
    }

    pub fn non_concurrent(label: impl Into<Label>) -> BufferBuilder {
        Buffer::new(label, false)
    }

    pub fn concurrent(label: impl Into<Label>) -> BufferBuilder {
        Buffer::new(label, true)
    }

    pub fn label(&self) -> &Label {
        &self.label
    }
}

impl BufferBuilder {
    pub fn initial_level(mut self, v: IntCst) -> Self {
        self.buffer.initial_level = Some(v);
        self
    }

    pub fn final_level(mut self, v: IntCst) -> Self {
        self.buffer.final_level = Some(v);
        self
    }

    pub fn bounds(mut self, lower: IntCst, upper: IntCst) -> Self {
        self.buffer.lower_bound = lower;
        self.buffer.upper_bound = upper;
        self
    }

    pub fn load(mut self, task: impl Into<Label>, quantity: IntCst) -> Self {
        self.buffer.events.push(BufferEvent {
            task: task.into(),
            kind: EventKind::Load,
            quantity,
        });
        self
    }

    pub fn unload(mut self, task: impl Into<Label>, quantity: IntCst) -> Self {
        self.buffer.events.push(BufferEvent {
            task: task.into(),
            kind: EventKind::Unload,
            quantity,
        });
        self
    }

    pub fn build(self) -> Result<Buffer, ModelError> {
        let b = self.buffer;
        if b.lower_bound > b.upper_bound {
            return Err(ModelError::BufferBoundsCrossing {
                buffer: b.label.clone(),
                lower: b.lower_bound,
                upper: b.upper_bound,
            });
        }
        for e in &b.events {
            if e.quantity < 0 {
                return Err(ModelError::NegativeValue {
                    entity: b.label.clone(),
                    field: "quantity",
                    value: e.quantity,
                });
            }
        }
        Ok(b)
    }
}

/// One breakpoint of the level timeline: the event's own time variable and
/// the buffer level immediately after it.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub time: VarId,
    pub level: VarId,
    pub event_index: usize,
}

#[derive(Debug, Clone)]
pub struct BufferVars {
    pub initial: VarId,
    pub breakpoints: Vec<Breakpoint>,
}

impl Buffer {
    /// Builds the level timeline by, for each event `e_i`, asserting that
    /// the level right after it equals the initial level plus every
    /// event's signed quantity whose own time is `<= time(e_i)` — which
    /// naturally folds same-time events together for a `ConcurrentBuffer`
    /// and is additionally forbidden for a `NonConcurrentBuffer` below.
    pub fn encode<B: SmtBackend>(&self, ctx: &mut EncoderCtx<B>, tasks: &HashMap<Label, TaskVars>) -> BufferVars {
        let uid = self.id.uid();
        let initial_level = self.initial_level.unwrap_or(0);
        let initial = ctx.new_int("Buffer", &self.label, uid, "initial", initial_level, initial_level);

        let event_times: Vec<(VarId, BoolExpr, IntCst)> = self
            .events
            .iter()
            .map(|e| {
                let t = tasks.get(&e.task).expect("buffer event references an encoded task");
                let time = match e.kind {
                    EventKind::Unload => t.start,
                    EventKind::Load => t.end,
                };
                let signed_qty = match e.kind {
                    EventKind::Unload => -e.quantity,
                    EventKind::Load => e.quantity,
                };
                (time, t.guard(), signed_qty)
            })
            .collect();

        let mut breakpoints = Vec::with_capacity(self.events.len());
        for (i, (time_i, guard_i, _)) in event_times.iter().enumerate() {
            let level = ctx.new_int("Buffer", &self.label, uid, &format!("level_{i}"), self.lower_bound, self.upper_bound);
            let mut terms = vec![LinExpr::var(initial)];
            for (j, (time_j, guard_j, qty_j)) in event_times.iter().enumerate() {
                // Reify "event j happened on or before event i" as a fresh
                // boolean, then gate its contribution by that boolean AND
                // both events' scheduled guards.
                let happened_before = ctx.fresh_bool(&format!("{}_ord_{j}_le_{i}", self.label));
                ctx.assert_named(
                    format!("{}_ord_{j}_le_{i}_def", self.label),
                    smt_backend::reify(happened_before, le(LinExpr::var(*time_j), LinExpr::var(*time_i))),
                );
                let contributes = smt_backend::and([guard_j.clone(), smt_backend::bvar(happened_before)]);
                let contrib_var = ctx.fresh_int(&format!("{}_contrib_{j}_{i}", self.label), (*qty_j).min(0), (*qty_j).max(0));
                ctx.assert_named(
                    format!("{}_contrib_{j}_{i}_def", self.label),
                    ite_bool(
                        contributes,
                        eq(LinExpr::var(contrib_var), LinExpr::constant(*qty_j)),
                        eq(LinExpr::var(contrib_var), LinExpr::constant(0)),
                    ),
                );
                terms.push(LinExpr::var(contrib_var));
            }
            let sum = LinExpr::sum(terms);
            ctx.assert_named(
                format!("{}_level_{i}_def", self.label),
                implies(guard_i.clone(), eq(LinExpr::var(level), sum)),
            );
            breakpoints.push(Breakpoint {
                time: *time_i,
                level,
                event_index: i,
            });
        }

        if !self.concurrent {
            for i in 0..event_times.len() {
                for j in (i + 1)..event_times.len() {
                    if self.events[i].task == self.events[j].task {
                        continue;
                    }
                    let (ti, gi, _) = &event_times[i];
                    let (tj, gj, _) = &event_times[j];
                    ctx.assert_named(
                        format!("{}_events_{i}_{j}_exclusive", self.label),
                        implies(smt_backend::and([gi.clone(), gj.clone()]), ne(LinExpr::var(*ti), LinExpr::var(*tj))),
                    );
                }
            }
        }

        if let Some(final_level) = self.final_level {
            // By the horizon every event's own time has passed, so the only
            // thing still gating a contribution is whether it happened at
            // all — the owning task's `guard`, same as each breakpoint above.
            let mut terms = vec![LinExpr::var(initial)];
            for (j, (_, guard_j, qty_j)) in event_times.iter().enumerate() {
                let contrib_var = ctx.fresh_int(&format!("{}_final_contrib_{j}", self.label), (*qty_j).min(0), (*qty_j).max(0));
                ctx.assert_named(
                    format!("{}_final_contrib_{j}_def", self.label),
                    ite_bool(
                        guard_j.clone(),
                        eq(LinExpr::var(contrib_var), LinExpr::constant(*qty_j)),
                        eq(LinExpr::var(contrib_var), LinExpr::constant(0)),
                    ),
                );
                terms.push(LinExpr::var(contrib_var));
            }
            let total = LinExpr::sum(terms);
            ctx.assert_named(format!("{}_final_level", self.label), eq(total, LinExpr::constant(final_level)));
        }

        BufferVars { initial, breakpoints }
    }
}
