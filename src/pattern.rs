//! Control patterns for supervision under partial observation.

use std::collections::BTreeSet;
use std::fmt;

use crate::idset::EventSet;
use crate::types::EventId;

/// Control action requested for one observation class.
///
/// A pattern asks the supervisor to disable every event in `disable_all` and,
/// for each set in `enable_one`, to keep at least one of its events enabled.
/// Patterns form a join-semilattice under [`merge`](ControlPattern::merge).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlPattern {
    pub disable_all: EventSet,
    pub enable_one: BTreeSet<EventSet>,
}

impl ControlPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `ev` to be disabled.
    pub fn disable(&mut self, ev: EventId) {
        self.disable_all.insert(ev);
    }

    /// Requires at least one event of `events` to stay enabled.
    pub fn require_one_of(&mut self, events: EventSet) {
        self.enable_one.insert(events);
    }

    /// Joins `other` into this pattern.
    pub fn merge(&mut self, other: &ControlPattern) {
        self.disable_all.union_with(&other.disable_all);
        self.enable_one.extend(other.enable_one.iter().cloned());
    }

    /// Returns true if some enable requirement is fully disabled.
    pub fn is_conflicting(&self) -> bool {
        self.enable_one.iter().any(|set| set.is_subset(&self.disable_all))
    }
}

impl fmt::Display for ControlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "disable {} enable-one-of [", self.disable_all)?;
        for (i, set) in self.enable_one.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", set)?;
        }
        write!(f, "]")
    }
}
