//! Controllability-aware synchronous product for Büchi synthesis.
//!
//! Product states carry a flag recording whose marking is owed next. Starting
//! with the plant's, the flag toggles whenever the owed marking is visited, and
//! a product state is marked when the specification's marking was owed and
//! is just being delivered. A run of the product is thus accepted iff it visits
//! the markings of both plant and specification infinitely often.
//!
//! Product states that would have to disable an uncontrollable plant event are
//! *critical* and are never expanded.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};

use crate::automaton::Automaton;
use crate::idset::{EventSet, StateSet};
use crate::merge::{merge_join, Merged};
use crate::progress::{Cancelled, Progress, Stage};
use crate::types::StateId;

/// A state of the Büchi product.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProductState {
    /// Plant state.
    pub q1: StateId,
    /// Specification state.
    pub q2: StateId,
    /// True while the plant's marking is owed, false while the specification's is.
    pub m1required: bool,
}

impl ProductState {
    pub fn new(q1: StateId, q2: StateId, m1required: bool) -> Self {
        ProductState { q1, q2, m1required }
    }

    /// The flag of a successor of this state.
    fn next_flag(&self, plant: &Automaton, spec: &Automaton) -> bool {
        if self.m1required && plant.is_marked_state(self.q1) {
            false
        } else if !self.m1required && spec.is_marked_state(self.q2) {
            true
        } else {
            self.m1required
        }
    }
}

impl Ord for ProductState {
    /// Orders by plant state, then specification state; an owed plant marking
    /// sorts first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.q1
            .cmp(&other.q1)
            .then(self.q2.cmp(&other.q2))
            .then(other.m1required.cmp(&self.m1required))
    }
}

impl PartialOrd for ProductState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProductState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.q1, self.q2, if self.m1required { "r1m" } else { "r2m" })
    }
}

/// Result of [`buechi_con_product`].
#[derive(Debug, Clone)]
pub struct OmegaProduct {
    pub automaton: Automaton,
    /// Product states that survived, with the result state representing them.
    pub composition: BTreeMap<ProductState, StateId>,
    /// Result states whose plant component is marked in the plant.
    pub plant_marking: StateSet,
}

/// Builds the controllability-aware Büchi product of `plant` and `spec`.
///
/// The result has the plant alphabet. It is empty if either argument has no
/// initial state. Only the first initial state of each argument is used.
pub fn buechi_con_product<P: Progress>(
    plant: &Automaton,
    controllable: &EventSet,
    spec: &Automaton,
    progress: &mut P,
) -> Result<OmegaProduct, Cancelled> {
    debug!("buechi_con_product({}, {})", plant.name(), spec.name());

    let mut res = Automaton::new(format!("BuechiConProduct({},{})", plant.name(), spec.name()));
    res.insert_events(plant.alphabet());
    res.copy_event_names(plant);
    let mut composition: BTreeMap<ProductState, StateId> = BTreeMap::new();

    let (Some(p0), Some(s0)) = (plant.init_state(), spec.init_state()) else {
        debug!("buechi_con_product: no initial state, product is empty");
        return Ok(OmegaProduct {
            automaton: res,
            composition,
            plant_marking: StateSet::empty(),
        });
    };

    let init = ProductState::new(p0, s0, true);
    let x0 = res.insert_init_state();
    composition.insert(init, x0);
    let mut todo: Vec<ProductState> = vec![init];
    let mut critical = StateSet::empty();
    let mut disable = EventSet::empty();
    let mut expanded = 0;

    while let Some(current) = todo.pop() {
        expanded += 1;
        progress.checkpoint(Stage::Product, expanded, composition.len())?;
        let x = composition[&current];
        if critical.contains(x) {
            continue;
        }

        // pass 1: does the current state become critical?
        disable.clear();
        let flag = current.next_flag(plant, spec);
        for m in merge_join(plant.transitions_from(current.q1), spec.transitions_from(current.q2)) {
            match m {
                Merged::Both(tp, ts) => {
                    let next = ProductState::new(tp.x2, ts.x2, flag);
                    let known_critical = composition.get(&next).is_some_and(|&y| critical.contains(y));
                    if known_critical {
                        if !controllable.contains(tp.ev) {
                            trace!("buechi_con_product: {} forced into critical state", current);
                            critical.insert(x);
                            break;
                        }
                        disable.insert(tp.ev);
                    }
                }
                Merged::Left(tp) => {
                    if !controllable.contains(tp.ev) {
                        trace!("buechi_con_product: {} disables {}", current, tp.ev);
                        critical.insert(x);
                        break;
                    }
                }
                Merged::Right(_) => {}
            }
        }
        if critical.contains(x) {
            continue;
        }

        // pass 2: execute shared events
        for m in merge_join(plant.transitions_from(current.q1), spec.transitions_from(current.q2)) {
            let Merged::Both(tp, ts) = m else {
                continue;
            };
            if disable.contains(tp.ev) {
                continue;
            }
            let next = ProductState::new(tp.x2, ts.x2, flag);
            let y = match composition.get(&next) {
                Some(&y) => y,
                None => {
                    let y = res.insert_state();
                    composition.insert(next, y);
                    if !next.m1required && spec.is_marked_state(next.q2) {
                        res.set_marked_state(y);
                    }
                    todo.push(next);
                    y
                }
            };
            res.set_transition(x, tp.ev, y);
        }
    }

    debug!("buechi_con_product: deleting #{} critical states", critical.len());
    res.del_states(&critical);
    composition.retain(|_, x| res.exists_state(*x));

    let plant_marking: StateSet = composition
        .iter()
        .filter(|(ps, _)| plant.is_marked_state(ps.q1))
        .map(|(_, &x)| x)
        .collect();

    debug!(
        "buechi_con_product: #{} states, #{} transitions, #{} plant-marked",
        res.size(),
        res.transition_count(),
        plant_marking.len()
    );
    Ok(OmegaProduct {
        automaton: res,
        composition,
        plant_marking,
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::progress::{NoProgress, ProgressFn};
    use crate::types::EventId;

    fn s(i: u32) -> StateId {
        StateId::new(i)
    }

    fn e(i: u32) -> EventId {
        EventId::new(i)
    }

    #[test]
    fn test_flag_order() {
        let a = ProductState::new(s(1), s(1), true);
        let b = ProductState::new(s(1), s(1), false);
        assert!(a < b);
        assert!(b < ProductState::new(s(1), s(2), true));
        assert_eq!(b.to_string(), "1|1|r2m");
    }

    #[test]
    fn test_flag_alternates() {
        // plant: 1 -a-> 2 -a-> 1, marked 1; spec: 1 -a-> 1, marked 1
        let a = e(1);
        let mut plant = Automaton::new("plant");
        plant.set_init_state(s(1));
        plant.set_transition(s(1), a, s(2));
        plant.set_transition(s(2), a, s(1));
        plant.set_marked_state(s(1));
        let mut spec = Automaton::new("spec");
        spec.set_init_state(s(1));
        spec.set_transition(s(1), a, s(1));
        spec.set_marked_state(s(1));

        let calph = EventSet::empty();
        let prod = buechi_con_product(&plant, &calph, &spec, &mut NoProgress).unwrap();
        // (1,1,r1m) -> (2,1,r2m) -> (1,1,r1m)
        assert_eq!(prod.automaton.size(), 2);
        let x0 = prod.composition[&ProductState::new(s(1), s(1), true)];
        let x1 = prod.composition[&ProductState::new(s(2), s(1), false)];
        assert!(prod.automaton.is_init_state(x0));
        assert!(prod.automaton.is_marked_state(x1));
        assert!(!prod.automaton.is_marked_state(x0));
        assert_eq!(prod.automaton.successor(x1, a), Some(x0));
        assert_eq!(prod.plant_marking, [x0].into_iter().collect::<StateSet>());
    }

    #[test]
    fn test_critical_state_removed() {
        // plant: 1 -c-> 2, 2 -u-> 3, 1 -u-> 1; spec forbids u at 2
        let (c, u) = (e(1), e(2));
        let mut plant = Automaton::new("plant");
        plant.set_init_state(s(1));
        plant.set_transition(s(1), c, s(2));
        plant.set_transition(s(2), u, s(3));
        plant.set_transition(s(1), u, s(1));
        let mut spec = Automaton::new("spec");
        spec.set_init_state(s(1));
        spec.set_transition(s(1), c, s(2));
        spec.set_transition(s(1), u, s(1));
        spec.insert_state_with_id(s(2));

        let calph: EventSet = [c].into_iter().collect();
        let prod = buechi_con_product(&plant, &calph, &spec, &mut NoProgress).unwrap();
        assert_eq!(prod.automaton.size(), 1);
        assert_eq!(prod.automaton.transition_count(), 1);
        assert!(prod.composition.keys().all(|ps| ps.q1 == s(1)));
    }

    #[test]
    fn test_known_critical_successor_is_disabled() {
        // plant: 1 -a-> 3, 1 -c-> 2, 2 -u-> 4, 3 -c-> 2, 3 -a-> 3; spec blocks u at 2
        let (u, a, c) = (e(1), e(2), e(3));
        let mut plant = Automaton::new("plant");
        plant.set_init_state(s(1));
        plant.set_transition(s(1), a, s(3));
        plant.set_transition(s(1), c, s(2));
        plant.set_transition(s(2), u, s(4));
        plant.set_transition(s(3), c, s(2));
        plant.set_transition(s(3), a, s(3));
        let mut spec = plant.clone();
        spec.del_state(s(4));

        let calph: EventSet = [a, c].into_iter().collect();
        let prod = buechi_con_product(&plant, &calph, &spec, &mut NoProgress).unwrap();
        assert_eq!(prod.automaton.size(), 2);
        assert!(prod.composition.keys().all(|ps| ps.q1 != s(2)));
        let x3 = prod.composition[&ProductState::new(s(3), s(3), true)];
        assert_eq!(prod.automaton.successor(x3, c), None);
        assert_eq!(prod.automaton.successor(x3, a), Some(x3));
    }

    #[test]
    fn test_empty_inputs() {
        let mut plant = Automaton::new("plant");
        plant.set_transition(s(1), e(1), s(1));
        let spec = plant.clone();
        let prod = buechi_con_product(&plant, &EventSet::empty(), &spec, &mut NoProgress).unwrap();
        assert!(prod.automaton.is_empty());
        assert_eq!(prod.automaton.alphabet(), plant.alphabet());
    }

    #[test]
    fn test_cancelled() {
        let mut plant = Automaton::new("plant");
        plant.set_init_state(s(1));
        plant.set_transition(s(1), e(1), s(1));
        let spec = plant.clone();
        let mut stop = ProgressFn(|_: Stage, _: usize, _: usize| -> Result<(), Cancelled> { Err(Cancelled) });
        let res = buechi_con_product(&plant, &EventSet::empty(), &spec, &mut stop);
        assert_eq!(res.unwrap_err(), Cancelled);
    }

    #[test]
    fn test_progress_counts_expanded_states() {
        // plant: 1 -a-> 2 -a-> 1, marked 1; spec: 1 -a-> 1, marked 1
        let a = e(1);
        let mut plant = Automaton::new("plant");
        plant.set_init_state(s(1));
        plant.set_transition(s(1), a, s(2));
        plant.set_transition(s(2), a, s(1));
        plant.set_marked_state(s(1));
        let mut spec = Automaton::new("spec");
        spec.set_init_state(s(1));
        spec.set_transition(s(1), a, s(1));
        spec.set_marked_state(s(1));

        let mut seen = Vec::new();
        let mut record = ProgressFn(|stage: Stage, current: usize, total: usize| -> Result<(), Cancelled> {
            assert_eq!(stage, Stage::Product);
            seen.push((current, total));
            Ok(())
        });
        buechi_con_product(&plant, &EventSet::empty(), &spec, &mut record).unwrap();
        assert_eq!(seen, vec![(1, 1), (2, 2)]);
    }
}
