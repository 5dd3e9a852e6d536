//! Finite automata over shared event identifiers.
//!
//! An [`Automaton`] stores its transition relation as an ordered set of
//! [`Transition`]s sorted by (source, event, target). All iteration is
//! deterministic: states, events and transitions come out in ascending order.
//!
//! Automata are *generators* in the discrete-event sense: the marking is read
//! as a Büchi acceptance condition by the synthesis functions of this crate.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Debug;
use std::ops::Bound;

use log::debug;

use crate::idset::{EventSet, StateSet};
use crate::types::{EventId, StateId, Transition};

#[derive(Clone)]
pub struct Automaton {
    name: String,
    alphabet: EventSet,
    states: StateSet,
    init: StateSet,
    marked: StateSet,
    transitions: BTreeSet<Transition>,
    /// Next fresh state id; deleted ids are never handed out again.
    /// Exceeds `u32::MAX` once the id space is used up.
    next_state: u64,
    event_names: BTreeMap<EventId, String>,
    state_names: BTreeMap<StateId, String>,
    state_names_enabled: bool,
}

impl Automaton {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alphabet: EventSet::empty(),
            states: StateSet::empty(),
            init: StateSet::empty(),
            marked: StateSet::empty(),
            transitions: BTreeSet::new(),
            next_state: 1,
            event_names: BTreeMap::new(),
            state_names: BTreeMap::new(),
            state_names_enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Default for Automaton {
    fn default() -> Self {
        Automaton::new("")
    }
}

impl Debug for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Automaton")
            .field("name", &self.name)
            .field("alphabet", &self.alphabet)
            .field("states", &self.states)
            .field("init", &self.init)
            .field("marked", &self.marked)
            .field("transitions", &self.transitions.len())
            .finish()
    }
}

// Alphabet
impl Automaton {
    pub fn alphabet(&self) -> &EventSet {
        &self.alphabet
    }

    pub fn insert_event(&mut self, ev: EventId) -> bool {
        self.alphabet.insert(ev)
    }

    pub fn insert_events(&mut self, events: &EventSet) {
        self.alphabet.union_with(events);
    }

    /// Inserts the event and records a human-readable name for it.
    pub fn insert_named_event(&mut self, ev: EventId, name: impl Into<String>) {
        self.alphabet.insert(ev);
        self.event_names.insert(ev, name.into());
    }

    /// Names an event of the alphabet; events outside the alphabet are ignored.
    pub fn set_event_name(&mut self, ev: EventId, name: impl Into<String>) {
        if self.alphabet.contains(ev) {
            self.event_names.insert(ev, name.into());
        }
    }

    pub fn event_name(&self, ev: EventId) -> Option<&str> {
        self.event_names.get(&ev).map(String::as_str)
    }

    /// Copies the event names of `other` for all events of this alphabet.
    pub fn copy_event_names(&mut self, other: &Automaton) {
        for ev in self.alphabet.iter() {
            if let Some(name) = other.event_name(ev) {
                self.event_names.insert(ev, name.to_string());
            }
        }
    }
}

// States
impl Automaton {
    pub fn states(&self) -> &StateSet {
        &self.states
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Returns true if the automaton has no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn exists_state(&self, x: StateId) -> bool {
        self.states.contains(x)
    }

    /// Inserts a fresh state.
    ///
    /// Once `StateId::MAX` has been handed out, the smallest unused id is taken
    /// instead, so ids of deleted states may come back from then on.
    pub fn insert_state(&mut self) -> StateId {
        let x = match u32::try_from(self.next_state) {
            Ok(id) => {
                self.next_state += 1;
                StateId::new(id)
            }
            Err(_) => self.smallest_free_state(),
        };
        self.states.insert(x);
        x
    }

    fn smallest_free_state(&self) -> StateId {
        let mut id: u32 = 1;
        for x in self.states.iter() {
            if x.id() != id {
                break;
            }
            id = id.saturating_add(1);
        }
        StateId::new(id)
    }

    /// Inserts a state with a caller-chosen id.
    pub fn insert_state_with_id(&mut self, x: StateId) -> bool {
        self.next_state = self.next_state.max(u64::from(x.id()) + 1);
        self.states.insert(x)
    }

    pub fn insert_init_state(&mut self) -> StateId {
        let x = self.insert_state();
        self.init.insert(x);
        x
    }

    pub fn insert_marked_state(&mut self) -> StateId {
        let x = self.insert_state();
        self.marked.insert(x);
        x
    }

    pub fn del_state(&mut self, x: StateId) {
        let mut set = StateSet::empty();
        set.insert(x);
        self.del_states(&set);
    }

    /// Deletes the given states together with their incident transitions.
    pub fn del_states(&mut self, dead: &StateSet) {
        if dead.is_disjoint(&self.states) {
            return;
        }
        debug!("del_states({}): #{}", self.name, dead.len());
        self.states.difference_with(dead);
        self.init.difference_with(dead);
        self.marked.difference_with(dead);
        self.transitions
            .retain(|t| !dead.contains(t.x1) && !dead.contains(t.x2));
        self.state_names.retain(|x, _| !dead.contains(*x));
    }

    /// Deletes every state not in `keep`.
    pub fn restrict_states(&mut self, keep: &StateSet) {
        let dead = &self.states - keep;
        self.del_states(&dead);
    }

    /// Removes all states and transitions; keeps the alphabet.
    pub fn clear_states(&mut self) {
        let all = self.states.clone();
        self.del_states(&all);
    }
}

// Initial and marked states
impl Automaton {
    pub fn init_states(&self) -> &StateSet {
        &self.init
    }

    /// Returns the smallest initial state.
    pub fn init_state(&self) -> Option<StateId> {
        self.init.first()
    }

    pub fn set_init_state(&mut self, x: StateId) {
        self.insert_state_with_id(x);
        self.init.insert(x);
    }

    pub fn clr_init_state(&mut self, x: StateId) {
        self.init.remove(x);
    }

    pub fn is_init_state(&self, x: StateId) -> bool {
        self.init.contains(x)
    }

    pub fn marked_states(&self) -> &StateSet {
        &self.marked
    }

    pub fn set_marked_state(&mut self, x: StateId) {
        self.insert_state_with_id(x);
        self.marked.insert(x);
    }

    pub fn clr_marked_state(&mut self, x: StateId) {
        self.marked.remove(x);
    }

    pub fn is_marked_state(&self, x: StateId) -> bool {
        self.marked.contains(x)
    }

    /// Replaces the marking; states outside the state set are ignored.
    pub fn inject_marked_states(&mut self, marked: &StateSet) {
        self.marked = marked & &self.states;
    }

    pub fn mark_all_states(&mut self) {
        self.marked = self.states.clone();
    }
}

// Transitions
impl Automaton {
    /// Inserts the transition `x1 --ev--> x2`, adding states and event as needed.
    pub fn set_transition(&mut self, x1: StateId, ev: EventId, x2: StateId) -> bool {
        self.insert_state_with_id(x1);
        self.insert_state_with_id(x2);
        self.alphabet.insert(ev);
        self.transitions.insert(Transition::new(x1, ev, x2))
    }

    pub fn clr_transition(&mut self, t: &Transition) -> bool {
        self.transitions.remove(t)
    }

    pub fn exists_transition(&self, t: &Transition) -> bool {
        self.transitions.contains(t)
    }

    /// All transitions, ordered by (source, event, target).
    pub fn transitions(&self) -> impl Iterator<Item = Transition> + '_ {
        self.transitions.iter().copied()
    }

    /// Outgoing transitions of `x`, in ascending event order.
    pub fn transitions_from(&self, x: StateId) -> impl Iterator<Item = Transition> + '_ {
        let lo = Transition::lower_bound(x);
        let hi = Transition::upper_bound(x);
        self.transitions.range(lo..=hi).copied()
    }

    /// Outgoing transitions of `x` labelled `ev`.
    pub fn transitions_from_ev(&self, x: StateId, ev: EventId) -> impl Iterator<Item = Transition> + '_ {
        self.transitions
            .range((Bound::Included(Transition::lower_bound_ev(x, ev)), Bound::Unbounded))
            .take_while(move |t| t.x1 == x && t.ev == ev)
            .copied()
    }

    /// The (first) successor of `x` under `ev`.
    pub fn successor(&self, x: StateId, ev: EventId) -> Option<StateId> {
        self.transitions_from_ev(x, ev).next().map(|t| t.x2)
    }

    /// Events enabled at `x`.
    pub fn active_events(&self, x: StateId) -> EventSet {
        self.transitions_from(x).map(|t| t.ev).collect()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Removes every transition for which the predicate fails.
    pub fn retain_transitions(&mut self, keep: impl FnMut(&Transition) -> bool) {
        self.transitions.retain(keep);
    }

    /// Predecessor lists indexed by target state.
    pub fn reverse_transitions(&self) -> BTreeMap<StateId, Vec<Transition>> {
        let mut rev: BTreeMap<StateId, Vec<Transition>> = BTreeMap::new();
        for t in self.transitions() {
            rev.entry(t.x2).or_default().push(t);
        }
        rev
    }

    /// States without outgoing transitions.
    pub fn terminal_states(&self) -> StateSet {
        self.states
            .iter()
            .filter(|&x| self.transitions_from(x).next().is_none())
            .collect()
    }
}

// State names
impl Automaton {
    pub fn state_names_enabled(&self) -> bool {
        self.state_names_enabled
    }

    /// Enables or disables state names; disabling discards existing names.
    pub fn set_state_names_enabled(&mut self, enabled: bool) {
        self.state_names_enabled = enabled;
        if !enabled {
            self.state_names.clear();
        }
    }

    pub fn set_state_name(&mut self, x: StateId, name: impl Into<String>) {
        if self.state_names_enabled {
            self.state_names.insert(x, name.into());
        }
    }

    pub fn state_name(&self, x: StateId) -> Option<&str> {
        self.state_names.get(&x).map(String::as_str)
    }

    /// Returns `name`, or a variant with a numeric suffix if it is taken.
    pub fn unique_state_name(&self, name: &str) -> String {
        let taken: HashSet<&str> = self.state_names.values().map(String::as_str).collect();
        if !taken.contains(name) {
            return name.to_string();
        }
        (1..)
            .map(|i| format!("{}_{}", name, i))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| name.to_string())
    }
}

// Queries
impl Automaton {
    /// At most one initial state and at most one successor per (state, event).
    pub fn is_deterministic(&self) -> bool {
        if self.init.len() > 1 {
            debug!("is_deterministic({}): more than one initial state", self.name);
            return false;
        }
        let mut prev: Option<Transition> = None;
        for t in self.transitions() {
            if let Some(p) = prev {
                if p.x1 == t.x1 && p.ev == t.ev {
                    debug!("is_deterministic({}): ambiguous transition {}", self.name, t);
                    return false;
                }
            }
            prev = Some(t);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn s(i: u32) -> StateId {
        StateId::new(i)
    }

    fn e(i: u32) -> EventId {
        EventId::new(i)
    }

    #[test]
    fn test_insert_states() {
        let mut g = Automaton::new("g");
        let x1 = g.insert_init_state();
        let x2 = g.insert_marked_state();
        assert_eq!(x1, s(1));
        assert_eq!(x2, s(2));
        assert!(g.is_init_state(x1));
        assert!(g.is_marked_state(x2));
        assert_eq!(g.size(), 2);

        g.insert_state_with_id(s(10));
        assert_eq!(g.insert_state(), s(11));
    }

    #[test]
    fn test_transitions_sorted_per_state() {
        let mut g = Automaton::new("g");
        g.set_transition(s(1), e(3), s(2));
        g.set_transition(s(1), e(1), s(1));
        g.set_transition(s(2), e(2), s(1));
        g.set_transition(s(1), e(2), s(2));

        let evs: Vec<u32> = g.transitions_from(s(1)).map(|t| t.ev.id()).collect();
        assert_eq!(evs, vec![1, 2, 3]);
        assert_eq!(g.transitions_from(s(2)).count(), 1);
        assert_eq!(g.transitions_from(s(3)).count(), 0);
        assert_eq!(g.successor(s(1), e(3)), Some(s(2)));
        assert_eq!(g.successor(s(2), e(3)), None);
        assert_eq!(g.active_events(s(1)).len(), 3);
        assert_eq!(g.alphabet().len(), 3);
    }

    #[test]
    fn test_del_states() {
        let mut g = Automaton::new("g");
        g.set_init_state(s(1));
        g.set_marked_state(s(2));
        g.set_transition(s(1), e(1), s(2));
        g.set_transition(s(2), e(1), s(3));
        g.set_transition(s(3), e(1), s(1));
        g.set_state_name(s(2), "two");

        g.del_state(s(2));
        assert_eq!(g.size(), 2);
        assert!(g.marked_states().is_empty());
        assert_eq!(g.transition_count(), 1);
        assert_eq!(g.state_name(s(2)), None);

        // deleted ids are not reused
        assert_eq!(g.insert_state(), s(4));
    }

    #[test]
    fn test_is_deterministic() {
        let mut g = Automaton::new("g");
        g.set_init_state(s(1));
        g.set_transition(s(1), e(1), s(2));
        g.set_transition(s(1), e(2), s(2));
        assert!(g.is_deterministic());
        g.set_transition(s(1), e(1), s(1));
        assert!(!g.is_deterministic());

        let mut h = Automaton::new("h");
        h.set_init_state(s(1));
        h.set_init_state(s(2));
        assert!(!h.is_deterministic());
        assert!(Automaton::new("empty").is_deterministic());
    }

    #[test]
    fn test_unique_state_name() {
        let mut g = Automaton::new("g");
        let x = g.insert_state();
        g.set_state_name(x, "a");
        assert_eq!(g.unique_state_name("b"), "b");
        assert_eq!(g.unique_state_name("a"), "a_1");
    }

    #[test]
    fn test_largest_state_id() {
        let x = StateId::MAX;
        let mut g = Automaton::new("g");
        g.set_init_state(x);
        g.set_transition(x, e(1), x);
        g.set_transition(x, EventId::MAX, s(1));
        assert_eq!(g.transitions_from(x).count(), 2);
        assert_eq!(g.successor(x, EventId::MAX), Some(s(1)));
        assert_eq!(g.active_events(x).len(), 2);
        assert!(g.is_deterministic());

        // the id space is used up: fresh states fill the gaps
        assert_eq!(g.insert_state(), s(2));
        assert_eq!(g.insert_state(), s(3));
        g.del_state(s(2));
        assert_eq!(g.insert_state(), s(2));
        assert_eq!(g.size(), 4);
    }

    #[test]
    fn test_terminal_states() {
        let mut g = Automaton::new("g");
        g.set_transition(s(1), e(1), s(2));
        g.insert_state_with_id(s(3));
        let term: Vec<StateId> = g.terminal_states().iter().collect();
        assert_eq!(term, vec![s(2), s(3)]);
    }
}
