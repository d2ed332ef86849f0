//! The encoder context threaded through every entity's `contribute`
//! hook: variable declaration, horizon access, and the debug-mode
//! assertion-reification hook of §4.9.

use crate::ids::{var_name, Label};
use smt_backend::{BoolExpr, IntCst, LinExpr, SmtBackend, VarId};

/// The timeline upper bound: either fixed at construction, or itself a
/// decision variable bounded by a large ceiling.
#[derive(Debug, Clone, Copy)]
pub enum Horizon {
    Fixed(IntCst),
    Variable { var: VarId, ceiling: IntCst },
}

impl Horizon {
    pub fn as_lin(&self) -> LinExpr {
        match self {
            Horizon::Fixed(h) => LinExpr::constant(*h),
            Horizon::Variable { var, .. } => LinExpr::var(*var),
        }
    }

    pub fn ceiling(&self) -> IntCst {
        match self {
            Horizon::Fixed(h) => *h,
            Horizon::Variable { ceiling, .. } => *ceiling,
        }
    }
}

/// One named boolean guard introduced by debug mode, alongside the label of
/// the assertion it reifies (used to map an unsat core back to constraint
/// identities).
#[derive(Debug, Clone)]
pub struct DebugGuard {
    pub var: VarId,
    pub label: Label,
}

pub struct EncoderCtx<'b, B: SmtBackend> {
    backend: &'b mut B,
    horizon: Horizon,
    debug: bool,
    guards: Vec<DebugGuard>,
    next_aux: u32,
}

impl<'b, B: SmtBackend> EncoderCtx<'b, B> {
    pub fn new(backend: &'b mut B, horizon: Horizon, debug: bool) -> Self {
        EncoderCtx {
            backend,
            horizon,
            debug,
            guards: Vec::new(),
            next_aux: 0,
        }
    }

    pub fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    pub fn new_int(&mut self, kind: &str, label: &Label, uid: u32, attr: &str, lb: IntCst, ub: IntCst) -> VarId {
        self.backend.declare_int(&var_name(kind, label, uid, attr), lb, ub)
    }

    pub fn new_bool(&mut self, kind: &str, label: &Label, uid: u32, attr: &str) -> VarId {
        self.backend.declare_bool(&var_name(kind, label, uid, attr))
    }

    /// A fresh auxiliary variable not tied to any one entity, used for
    /// reification (`max`, `ite`, cumulative-capacity counters, ...).
    pub fn fresh_int(&mut self, purpose: &str, lb: IntCst, ub: IntCst) -> VarId {
        self.next_aux += 1;
        self.backend.declare_int(&format!("aux_{purpose}_{}", self.next_aux), lb, ub)
    }

    pub fn fresh_bool(&mut self, purpose: &str) -> VarId {
        self.next_aux += 1;
        self.backend.declare_bool(&format!("aux_{purpose}_{}", self.next_aux))
    }

    /// Asserts `term`, optionally reifying it behind a fresh guard boolean
    /// when debug mode is active, per §4.9's "replace every emitted
    /// assertion `A` by `(p_A -> A)`" rule.
    pub fn assert_named(&mut self, label: impl Into<Label>, term: BoolExpr) {
        if self.debug {
            let label = label.into();
            let guard = self.fresh_bool("debug_guard");
            self.backend.assert(smt_backend::implies(smt_backend::bvar(guard), term));
            self.guards.push(DebugGuard { var: guard, label });
        } else {
            self.backend.assert(term);
        }
    }

    pub fn assert(&mut self, term: BoolExpr) {
        self.backend.assert(term);
    }

    pub fn guards(&self) -> &[DebugGuard] {
        &self.guards
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.backend
    }
}
