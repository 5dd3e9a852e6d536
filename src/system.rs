//! Plants that carry their own event partition.
//!
//! A [`System`] bundles an automaton with the events a supervisor may disable
//! and the events it cannot see. The `*_system` methods of
//! [`Synthesizer`][crate::Synthesizer] read both sets from the plant and hand
//! the partition on to their result.

use crate::automaton::Automaton;
use crate::idset::EventSet;
use crate::types::EventId;

/// An automaton together with its controllable and unobservable events.
///
/// By default no event is controllable and every event is observable.
///
/// ```
/// use buechi_syn::system::System;
/// use buechi_syn::{Automaton, EventId, StateId};
///
/// let (start, finish) = (EventId::new(1), EventId::new(2));
/// let mut g = Automaton::new("machine");
/// g.set_init_state(StateId::new(1));
/// g.set_transition(StateId::new(1), start, StateId::new(2));
/// g.set_transition(StateId::new(2), finish, StateId::new(1));
///
/// let mut plant = System::new(g);
/// plant.set_controllable(start);
/// plant.set_unobservable(finish);
/// assert!(plant.controllable_events().contains(start));
/// assert!(!plant.observable_events().contains(finish));
/// ```
#[derive(Debug, Clone, Default)]
pub struct System {
    automaton: Automaton,
    controllable: EventSet,
    unobservable: EventSet,
}

impl System {
    pub fn new(automaton: Automaton) -> Self {
        Self {
            automaton,
            controllable: EventSet::empty(),
            unobservable: EventSet::empty(),
        }
    }

    /// Wraps `automaton` with the event partition of `other`, restricted to the
    /// alphabet of `automaton`.
    pub fn with_partition_of(automaton: Automaton, other: &System) -> Self {
        let controllable = &other.controllable & automaton.alphabet();
        let unobservable = &other.unobservable & automaton.alphabet();
        Self {
            automaton,
            controllable,
            unobservable,
        }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn automaton_mut(&mut self) -> &mut Automaton {
        &mut self.automaton
    }

    pub fn into_automaton(self) -> Automaton {
        self.automaton
    }

    pub fn name(&self) -> &str {
        self.automaton.name()
    }

    /// Controllable events of the alphabet.
    pub fn controllable_events(&self) -> EventSet {
        &self.controllable & self.automaton.alphabet()
    }

    /// Observable events of the alphabet.
    pub fn observable_events(&self) -> EventSet {
        self.automaton.alphabet() - &self.unobservable
    }

    /// Marks `ev` controllable; events outside the alphabet are ignored.
    pub fn set_controllable(&mut self, ev: EventId) {
        if self.automaton.alphabet().contains(ev) {
            self.controllable.insert(ev);
        }
    }

    pub fn clr_controllable(&mut self, ev: EventId) {
        self.controllable.remove(ev);
    }

    /// Replaces the controllable events; events outside the alphabet are ignored.
    pub fn set_controllable_events(&mut self, events: &EventSet) {
        self.controllable = events & self.automaton.alphabet();
    }

    pub fn is_controllable(&self, ev: EventId) -> bool {
        self.controllable.contains(ev) && self.automaton.alphabet().contains(ev)
    }

    pub fn set_unobservable(&mut self, ev: EventId) {
        if self.automaton.alphabet().contains(ev) {
            self.unobservable.insert(ev);
        }
    }

    pub fn set_observable(&mut self, ev: EventId) {
        self.unobservable.remove(ev);
    }

    pub fn is_observable(&self, ev: EventId) -> bool {
        self.automaton.alphabet().contains(ev) && !self.unobservable.contains(ev)
    }
}

impl From<Automaton> for System {
    fn from(automaton: Automaton) -> Self {
        System::new(automaton)
    }
}
