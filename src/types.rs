//! Type-safe identifiers for automaton states and events.
//!
//! Both identifiers are 1-indexed; 0 is reserved as "no such state/event".
//! The newtypes keep states and events from being mixed up in set arithmetic
//! and transition lookups.
use std::fmt;

/// Common interface of identifiers stored in an [`IdSet`][crate::idset::IdSet].
pub trait Id: Copy + Ord + fmt::Debug {
    /// Creates an identifier from its raw bit position.
    fn from_index(index: usize) -> Self;

    /// Returns the raw bit position of this identifier.
    fn index(self) -> usize;
}

/// A state identifier (1-indexed).
///
/// # Invariants
///
/// - State IDs must be >= 1 (0 is reserved)
/// - IDs of deleted states are never reallocated by the same automaton
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(u32);

impl StateId {
    /// Creates a new state identifier.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. States must be 1-indexed.
    pub const fn new(id: u32) -> Self {
        assert!(id != 0, "State IDs must be >= 1");
        StateId(id)
    }

    /// Returns the raw state ID as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Sentinel used as the lower bound of transition ranges.
    pub(crate) const fn none() -> Self {
        StateId(0)
    }

    /// Largest state identifier.
    pub const MAX: StateId = StateId(u32::MAX);
}

impl Id for StateId {
    fn from_index(index: usize) -> Self {
        StateId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StateId> for u32 {
    fn from(state: StateId) -> Self {
        state.0
    }
}

/// An event identifier (1-indexed).
///
/// Events are shared between automata by identifier: two automata agree on an
/// event iff they use the same `EventId`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EventId(u32);

impl EventId {
    /// Creates a new event identifier.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Events must be 1-indexed.
    pub const fn new(id: u32) -> Self {
        assert!(id != 0, "Event IDs must be >= 1");
        EventId(id)
    }

    /// Returns the raw event ID as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    pub(crate) const fn none() -> Self {
        EventId(0)
    }

    /// Largest event identifier.
    pub const MAX: EventId = EventId(u32::MAX);
}

impl Id for EventId {
    fn from_index(index: usize) -> Self {
        EventId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl From<EventId> for u32 {
    fn from(event: EventId) -> Self {
        event.0
    }
}

/// A transition `x1 --ev--> x2`.
///
/// The derived order is (source, event, target), which is the order in which
/// an automaton stores and iterates its transition relation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Transition {
    pub x1: StateId,
    pub ev: EventId,
    pub x2: StateId,
}

impl Transition {
    pub fn new(x1: StateId, ev: EventId, x2: StateId) -> Self {
        Transition { x1, ev, x2 }
    }

    /// Smallest transition with the given source state.
    pub(crate) fn lower_bound(x1: StateId) -> Self {
        Transition {
            x1,
            ev: EventId::none(),
            x2: StateId::none(),
        }
    }

    /// Largest transition with the given source state.
    pub(crate) fn upper_bound(x1: StateId) -> Self {
        Transition {
            x1,
            ev: EventId::MAX,
            x2: StateId::MAX,
        }
    }

    /// Smallest transition with the given source state and event.
    pub(crate) fn lower_bound_ev(x1: StateId, ev: EventId) -> Self {
        Transition {
            x1,
            ev,
            x2: StateId::none(),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -{}-> {})", self.x1, self.ev, self.x2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_creation() {
        let s1 = StateId::new(1);
        let s2 = StateId::new(2);
        assert_eq!(s1.id(), 1);
        assert_eq!(s2.index(), 2);
        assert!(s1 < s2);
    }

    #[test]
    #[should_panic(expected = "State IDs must be >= 1")]
    fn test_state_zero_panics() {
        StateId::new(0);
    }

    #[test]
    #[should_panic(expected = "Event IDs must be >= 1")]
    fn test_event_zero_panics() {
        EventId::new(0);
    }

    #[test]
    fn test_transition_order() {
        let (s1, s2) = (StateId::new(1), StateId::new(2));
        let (a, b) = (EventId::new(1), EventId::new(2));
        let mut ts = vec![
            Transition::new(s2, a, s1),
            Transition::new(s1, b, s1),
            Transition::new(s1, a, s2),
        ];
        ts.sort();
        assert_eq!(ts[0], Transition::new(s1, a, s2));
        assert_eq!(ts[1], Transition::new(s1, b, s1));
        assert_eq!(ts[2], Transition::new(s2, a, s1));
        assert!(Transition::lower_bound(s2) < ts[2]);
        assert!(Transition::lower_bound(s2) > ts[1]);
        assert!(Transition::upper_bound(s1) > ts[1]);
        assert!(Transition::upper_bound(s1) < ts[2]);
    }

    #[test]
    fn test_max_ids() {
        assert_eq!(StateId::MAX.id(), u32::MAX);
        assert_eq!(EventId::MAX.to_string(), format!("e{}", u32::MAX));
        let top = Transition::new(StateId::MAX, EventId::MAX, StateId::MAX);
        assert_eq!(Transition::upper_bound(StateId::MAX), top);
    }

    #[test]
    fn test_display() {
        let t = Transition::new(StateId::new(3), EventId::new(7), StateId::new(4));
        assert_eq!(t.to_string(), "(3 -e7-> 4)");
    }
}
