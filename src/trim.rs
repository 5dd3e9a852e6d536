//! Reachability-based state pruning.
//!
//! - *accessible*: reachable from an initial state,
//! - *co-accessible*: some marked state is reachable,
//! - *complete*: some infinite path starts in the state (no dead ends).

use std::collections::VecDeque;

use log::debug;

use crate::automaton::Automaton;
use crate::idset::StateSet;

impl Automaton {
    /// States reachable from the initial states.
    pub fn accessible_set(&self) -> StateSet {
        let mut seen = StateSet::empty();
        let mut queue: VecDeque<_> = self.init_states().iter().collect();
        for x in self.init_states() {
            seen.insert(x);
        }
        while let Some(x) = queue.pop_front() {
            for t in self.transitions_from(x) {
                if seen.insert(t.x2) {
                    queue.push_back(t.x2);
                }
            }
        }
        seen
    }

    /// States from which a marked state is reachable.
    pub fn coaccessible_set(&self) -> StateSet {
        let rev = self.reverse_transitions();
        let mut seen = StateSet::empty();
        let mut queue: VecDeque<_> = self.marked_states().iter().collect();
        for x in self.marked_states() {
            seen.insert(x);
        }
        while let Some(x) = queue.pop_front() {
            for t in rev.get(&x).into_iter().flatten() {
                if seen.insert(t.x1) {
                    queue.push_back(t.x1);
                }
            }
        }
        seen
    }

    /// States from which every path eventually dead-ends.
    pub fn blocking_set(&self) -> StateSet {
        let mut term = self.terminal_states();
        loop {
            let mut done = true;
            for x in self.states() {
                if term.contains(x) {
                    continue;
                }
                if self.transitions_from(x).all(|t| term.contains(t.x2)) {
                    term.insert(x);
                    done = false;
                }
            }
            if done {
                break;
            }
        }
        term
    }

    /// Restricts to accessible states. Returns true if an initial state remains.
    pub fn accessible(&mut self) -> bool {
        let keep = self.accessible_set();
        debug!("accessible({}): #{} -> #{}", self.name(), self.size(), keep.len());
        self.restrict_states(&keep);
        !self.init_states().is_empty()
    }

    /// Restricts to co-accessible states. Returns true if an initial state remains.
    pub fn coaccessible(&mut self) -> bool {
        let keep = self.coaccessible_set();
        debug!("coaccessible({}): #{} -> #{}", self.name(), self.size(), keep.len());
        self.restrict_states(&keep);
        !self.init_states().is_empty()
    }

    /// Restricts to accessible and co-accessible states.
    pub fn trim(&mut self) -> bool {
        self.accessible();
        self.coaccessible()
    }

    /// Removes all states from which every path dead-ends.
    /// Returns true if an initial state remains.
    pub fn complete(&mut self) -> bool {
        let dead = self.blocking_set();
        debug!("complete({}): removing #{}", self.name(), dead.len());
        self.del_states(&dead);
        !self.init_states().is_empty()
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible_set().len() == self.size()
    }

    pub fn is_coaccessible(&self) -> bool {
        self.coaccessible_set().len() == self.size()
    }

    pub fn is_complete(&self) -> bool {
        self.blocking_set().is_empty()
    }

    pub fn is_trim(&self) -> bool {
        self.is_accessible() && self.is_coaccessible()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::{EventId, StateId};

    fn s(i: u32) -> StateId {
        StateId::new(i)
    }

    fn e(i: u32) -> EventId {
        EventId::new(i)
    }

    /// 1 -a-> 2 -a-> 3 (dead end), 2 -b-> 4 -b-> 4 (marked loop), 5 unreachable
    fn sample() -> Automaton {
        let mut g = Automaton::new("sample");
        g.set_init_state(s(1));
        g.set_transition(s(1), e(1), s(2));
        g.set_transition(s(2), e(1), s(3));
        g.set_transition(s(2), e(2), s(4));
        g.set_transition(s(4), e(2), s(4));
        g.set_marked_state(s(4));
        g.set_transition(s(5), e(1), s(4));
        g
    }

    #[test]
    fn test_accessible() {
        let mut g = sample();
        assert!(!g.is_accessible());
        assert!(g.accessible());
        assert!(!g.exists_state(s(5)));
        assert!(g.is_accessible());
    }

    #[test]
    fn test_coaccessible() {
        let mut g = sample();
        assert!(!g.is_coaccessible());
        assert!(g.coaccessible());
        assert!(!g.exists_state(s(3)));
        assert!(g.exists_state(s(5)));
    }

    #[test]
    fn test_complete() {
        let mut g = sample();
        assert!(!g.is_complete());
        g.complete();
        assert!(!g.exists_state(s(3)));
        assert!(g.is_complete());

        // a chain into a dead end is removed entirely
        let mut h = Automaton::new("chain");
        h.set_init_state(s(1));
        h.set_transition(s(1), e(1), s(2));
        h.set_transition(s(2), e(1), s(3));
        assert!(!h.complete());
        assert!(h.is_empty());
    }

    #[test]
    fn test_trim() {
        let mut g = sample();
        assert!(g.trim());
        assert_eq!(g.size(), 3);
        assert!(g.is_trim());
    }
}
