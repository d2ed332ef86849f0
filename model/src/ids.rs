//! Opaque identifiers and diagnostic labels shared by every entity kind.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// A cheap, cloneable diagnostic name. Entities are addressed programmatically
/// by [`Label`] (their registered name) and internally by an opaque uid; the
/// two are combined into SMT variable names as `Kind_name_uid_attr`.
pub type Label = String;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn next() -> Self {
                static COUNTER: AtomicU32 = AtomicU32::new(1);
                $name(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            pub fn uid(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(TaskId);
entity_id!(ResourceId);
entity_id!(BufferId);
entity_id!(IndicatorId);
entity_id!(ObjectiveId);
entity_id!(ConstraintId);

/// Builds the `Kind_name_uid_attr` SMT variable name convention used
/// throughout the encoder.
pub fn var_name(kind: &str, label: &Label, uid: u32, attr: &str) -> String {
    format!("{kind}_{label}_{uid}_{attr}")
}
