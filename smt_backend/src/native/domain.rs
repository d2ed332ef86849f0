//! Bounded integer domains with trail-based save/restore, reusing the
//! workspace's own [`backtrack::Trail`] rather than hand-rolling a second
//! undo log.

use crate::term::{IntCst, VarId};
use backtrack::Trail;

#[derive(Debug, Clone, Copy)]
struct TightenEvent {
    var: VarId,
    old_lo: IntCst,
    old_hi: IntCst,
}

/// The current bounds of every declared variable, plus the trail needed to
/// undo tightenings on `pop`.
pub struct Domains {
    bounds: Vec<(IntCst, IntCst)>,
    names: Vec<String>,
    trail: Trail<TightenEvent>,
}

/// Signals that a variable's domain became empty.
#[derive(Debug, Clone, Copy)]
pub struct Conflict;

impl Domains {
    pub fn new() -> Self {
        Domains {
            bounds: Vec::new(),
            names: Vec::new(),
            trail: Trail::new(),
        }
    }

    pub fn declare(&mut self, name: &str, lb: IntCst, ub: IntCst) -> VarId {
        let id = VarId(self.bounds.len() as u32);
        self.bounds.push((lb, ub));
        self.names.push(name.to_string());
        id
    }

    pub fn name(&self, v: VarId) -> &str {
        &self.names[v.index()]
    }

    pub fn bounds(&self, v: VarId) -> (IntCst, IntCst) {
        self.bounds[v.index()]
    }

    pub fn is_resolved(&self, v: VarId) -> bool {
        let (lo, hi) = self.bounds(v);
        lo == hi
    }

    pub fn value(&self, v: VarId) -> IntCst {
        self.bounds(v).0
    }

    pub fn all_values(&self) -> Vec<IntCst> {
        self.bounds.iter().map(|(lo, _)| *lo).collect()
    }

    pub fn num_vars(&self) -> usize {
        self.bounds.len()
    }

    /// Tightens the lower bound of `v` to `max(current_lo, lb)`.
    pub fn tighten_lb(&mut self, v: VarId, lb: IntCst) -> Result<(), Conflict> {
        let (old_lo, old_hi) = self.bounds[v.index()];
        if lb <= old_lo {
            return Ok(());
        }
        self.trail.push(TightenEvent {
            var: v,
            old_lo,
            old_hi,
        });
        self.bounds[v.index()].0 = lb;
        if lb > old_hi {
            Err(Conflict)
        } else {
            Ok(())
        }
    }

    /// Tightens the upper bound of `v` to `min(current_hi, ub)`.
    pub fn tighten_ub(&mut self, v: VarId, ub: IntCst) -> Result<(), Conflict> {
        let (old_lo, old_hi) = self.bounds[v.index()];
        if ub >= old_hi {
            return Ok(());
        }
        self.trail.push(TightenEvent {
            var: v,
            old_lo,
            old_hi,
        });
        self.bounds[v.index()].1 = ub;
        if old_lo > ub {
            Err(Conflict)
        } else {
            Ok(())
        }
    }

    pub fn fix(&mut self, v: VarId, value: IntCst) -> Result<(), Conflict> {
        self.tighten_lb(v, value)?;
        self.tighten_ub(v, value)
    }

    pub fn save_state(&mut self) -> u32 {
        self.trail.save_state()
    }

    pub fn restore(&mut self, mark: u32) {
        let bounds = &mut self.bounds;
        self.trail.restore(mark, |ev| {
            bounds[ev.var.index()] = (ev.old_lo, ev.old_hi);
        });
    }
}

impl Default for Domains {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tighten_and_restore_round_trips() {
        let mut d = Domains::new();
        let v = d.declare("x", 0, 10);
        let mark = d.save_state();
        d.tighten_lb(v, 3).unwrap();
        d.tighten_ub(v, 7).unwrap();
        assert_eq!(d.bounds(v), (3, 7));
        d.restore(mark);
        assert_eq!(d.bounds(v), (0, 10));
    }

    #[test]
    fn tighten_past_bound_is_conflict() {
        let mut d = Domains::new();
        let v = d.declare("x", 0, 10);
        d.tighten_ub(v, 5).unwrap();
        assert!(d.tighten_lb(v, 6).is_err());
    }
}
