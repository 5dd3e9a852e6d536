//! Büchi acceptance helpers.
//!
//! Under Büchi acceptance, an automaton accepts the infinite words that visit a
//! marked state infinitely often. An automaton is *omega-trim* if every state is
//! reachable, can reach a marked state, and lies on some infinite path, so each
//! finite run extends to an accepted infinite run.

use log::debug;

use crate::automaton::Automaton;
use crate::error::{Result, Role, SynthesisError};
use crate::idset::StateSet;
use crate::product::{is_closed_subset, product};
use crate::scc::{strongly_connected_components, SccFilter};

impl Automaton {
    /// Restricts to the omega-trim part.
    ///
    /// Returns true if an initial and a marked state survive.
    pub fn buechi_trim(&mut self) -> bool {
        self.accessible();
        loop {
            let size = self.size();
            self.coaccessible();
            self.complete();
            if self.size() == size {
                break;
            }
        }
        debug!("buechi_trim({}): #{}", self.name(), self.size());
        !self.init_states().is_empty() && !self.marked_states().is_empty()
    }

    pub fn is_buechi_trim(&self) -> bool {
        self.is_accessible() && self.is_coaccessible() && self.is_complete()
    }
}

/// Returns true if the Büchi behaviour of `cand` is relatively closed w.r.t.
/// the Büchi behaviour of `plant`.
///
/// Both arguments must share one alphabet, be omega-trim and deterministic.
pub fn is_buechi_relatively_closed(plant: &Automaton, cand: &Automaton) -> Result<bool> {
    if plant.alphabet() != cand.alphabet() {
        return Err(SynthesisError::AlphabetMismatch {
            only_in_plant: plant.alphabet() - cand.alphabet(),
            only_in_spec: cand.alphabet() - plant.alphabet(),
        });
    }
    for g in [cand, plant] {
        if !g.is_buechi_trim() {
            return Err(SynthesisError::NotOmegaTrim(g.name().to_string()));
        }
    }
    if cand.is_empty() {
        return Ok(true);
    }
    if plant.is_empty() {
        return Ok(false);
    }
    match (plant.is_deterministic(), cand.is_deterministic()) {
        (true, true) => {}
        (false, true) => return Err(SynthesisError::NotDeterministic(Role::Plant)),
        (true, false) => return Err(SynthesisError::NotDeterministic(Role::Specification)),
        (false, false) => return Err(SynthesisError::NotDeterministic(Role::Both)),
    }
    Ok(is_buechi_relatively_closed_unchecked(plant, cand))
}

/// Relative closedness without argument validation.
///
/// The closed behaviour of `cand` must be contained in the one of `plant`, and
/// on the product no cycle may visit the marking of one argument infinitely
/// often while avoiding the marking of the other.
pub fn is_buechi_relatively_closed_unchecked(plant: &Automaton, cand: &Automaton) -> bool {
    if !is_closed_subset(cand, plant) {
        debug!("is_buechi_relatively_closed: prefix inclusion fails");
        return false;
    }

    let (prod, cmap) = product(cand, plant);
    let mut cand_marked = StateSet::empty();
    let mut plant_marked = StateSet::empty();
    for (&(x1, x2), &x) in &cmap {
        if cand.is_marked_state(x1) {
            cand_marked.insert(x);
        }
        if plant.is_marked_state(x2) {
            plant_marked.insert(x);
        }
    }

    let plant_only = SccFilter::new().ignore_trivial().avoid(&cand_marked).require(&plant_marked);
    if let Some(scc) = strongly_connected_components(&prod, &plant_only).first() {
        debug!("is_buechi_relatively_closed: plant-marked cycle without candidate marking: {}", scc);
        return false;
    }
    let cand_only = SccFilter::new().ignore_trivial().avoid(&plant_marked).require(&cand_marked);
    if let Some(scc) = strongly_connected_components(&prod, &cand_only).first() {
        debug!("is_buechi_relatively_closed: candidate-marked cycle without plant marking: {}", scc);
        return false;
    }
    true
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

    /// 1 -a-> 2 -b-> 1, 2 -c-> 3 -c-> 3, marked 1
    fn plant() -> Automaton {
        let mut g = Automaton::new("plant");
        g.set_init_state(s(1));
        g.set_transition(s(1), e(1), s(2));
        g.set_transition(s(2), e(2), s(1));
        g.set_transition(s(2), e(3), s(3));
        g.set_transition(s(3), e(3), s(3));
        g.set_marked_state(s(1));
        g.set_marked_state(s(3));
        g
    }

    #[test]
    fn test_buechi_trim() {
        let mut g = plant();
        assert!(g.is_buechi_trim());

        // unmarked loop reachable only from 3
        g.set_transition(s(3), e(1), s(4));
        g.set_transition(s(4), e(1), s(4));
        assert!(!g.is_buechi_trim());
        assert!(g.buechi_trim());
        assert!(!g.exists_state(s(4)));
        assert!(g.is_buechi_trim());

        let mut h = Automaton::new("h");
        h.set_init_state(s(1));
        h.set_transition(s(1), e(1), s(1));
        assert!(!h.buechi_trim());
    }

    #[test]
    fn test_relatively_closed() {
        let g = plant();
        assert!(is_buechi_relatively_closed(&g, &g).unwrap());

        // dropping the c-branch keeps relative closedness
        let mut k = g.clone();
        k.del_state(s(3));
        assert!(is_buechi_relatively_closed(&g, &k).unwrap());

        let mut empty = Automaton::new("empty");
        empty.insert_events(g.alphabet());
        assert!(is_buechi_relatively_closed(&g, &empty).unwrap());
        assert!(!is_buechi_relatively_closed(&empty, &g).unwrap());
    }

    #[test]
    fn test_relatively_closed_fails_on_plant_marked_cycle() {
        // candidate generates the a-b cycle but marks only the c-loop
        let g = plant();
        let mut k = g.clone();
        k.clr_marked_state(s(1));
        assert!(!is_buechi_relatively_closed_unchecked(&g, &k));
    }

    #[test]
    fn test_relatively_closed_fails_on_prefix() {
        let g = plant();
        let mut k = g.clone();
        k.set_transition(s(1), e(3), s(3));
        assert!(!is_buechi_relatively_closed_unchecked(&g, &k));
    }

    #[test]
    fn test_relatively_closed_errors() {
        let g = plant();
        let mut k = g.clone();
        k.insert_event(e(9));
        assert!(matches!(
            is_buechi_relatively_closed(&g, &k),
            Err(SynthesisError::AlphabetMismatch { .. })
        ));

        let mut k = g.clone();
        k.set_transition(s(3), e(1), s(5));
        assert!(matches!(
            is_buechi_relatively_closed(&g, &k),
            Err(SynthesisError::NotOmegaTrim(_))
        ));
    }
}
