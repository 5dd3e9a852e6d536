//! Prefix controllability and normality.
//!
//! These operate on the *closed* behaviour of plant and candidate: marking is
//! ignored. The candidate is expected to be a sub-automaton of the plant in the
//! sense that each candidate state corresponds to exactly one plant state, which
//! holds for any product of plant and specification.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use crate::automaton::Automaton;
use crate::error::{Result, Role, SynthesisError};
use crate::idset::{EventSet, StateSet};
use crate::merge::{merge_join, Merged};
use crate::product::{inv_project, is_closed_subset, product, project};
use crate::types::{StateId, Transition};

/// Marks `start` critical and propagates backwards along uncontrollable
/// transitions of the reverse relation built so far.
fn traverse_uncontrollable_backwards(
    controllable: &EventSet,
    rev: &BTreeMap<StateId, Vec<Transition>>,
    critical: &mut StateSet,
    start: StateId,
) {
    critical.insert(start);
    let mut stack = vec![start];
    while let Some(x) = stack.pop() {
        for t in rev.get(&x).into_iter().flatten() {
            if !controllable.contains(t.ev) && critical.insert(t.x1) {
                stack.push(t.x1);
            }
        }
    }
}

/// Restricts `cand` to its largest prefix-controllable part.
///
/// A candidate state is removed if it disables an uncontrollable event the
/// corresponding plant state enables, if it reaches such a state by an
/// uncontrollable event, or if it is not reached at all.
pub fn sup_con_closed(plant: &Automaton, controllable: &EventSet, cand: &mut Automaton) {
    let (Some(g0), Some(h0)) = (plant.init_state(), cand.init_state()) else {
        return;
    };
    debug!("sup_con_closed({}, {}): #{}", plant.name(), cand.name(), cand.size());

    let mut todo: Vec<(StateId, StateId)> = vec![(g0, h0)];
    let mut processed = StateSet::empty();
    let mut critical = StateSet::empty();
    let mut rev: BTreeMap<StateId, Vec<Transition>> = BTreeMap::new();

    while let Some((g, h)) = todo.pop() {
        if processed.contains(h) {
            continue;
        }
        for m in merge_join(plant.transitions_from(g), cand.transitions_from(h)) {
            match m {
                Merged::Both(tg, th) => {
                    if !processed.contains(th.x2) {
                        todo.push((tg.x2, th.x2));
                    }
                    if !critical.contains(th.x2) {
                        rev.entry(th.x2).or_default().push(th);
                    } else if !controllable.contains(tg.ev) {
                        trace!("sup_con_closed: {} leads into critical state", th);
                        traverse_uncontrollable_backwards(controllable, &rev, &mut critical, h);
                        break;
                    }
                }
                Merged::Left(tg) => {
                    if !controllable.contains(tg.ev) {
                        trace!("sup_con_closed: state {} disables {}", h, tg.ev);
                        traverse_uncontrollable_backwards(controllable, &rev, &mut critical, h);
                        break;
                    }
                }
                Merged::Right(_) => {}
            }
        }
        processed.insert(h);
    }

    let keep = &processed - &critical;
    debug!("sup_con_closed: keeping #{} of #{}", keep.len(), cand.size());
    cand.restrict_states(&keep);
}

/// Candidate states that disable an uncontrollable event enabled by the plant.
pub fn controllability_violations(plant: &Automaton, controllable: &EventSet, cand: &Automaton) -> StateSet {
    let mut critical = StateSet::empty();
    let (Some(g0), Some(h0)) = (plant.init_state(), cand.init_state()) else {
        return critical;
    };
    let mut todo = vec![(g0, h0)];
    let mut processed: BTreeSet<(StateId, StateId)> = BTreeSet::new();
    while let Some((g, h)) = todo.pop() {
        if !processed.insert((g, h)) {
            continue;
        }
        for m in merge_join(plant.transitions_from(g), cand.transitions_from(h)) {
            match m {
                Merged::Both(tg, th) => {
                    if !processed.contains(&(tg.x2, th.x2)) {
                        todo.push((tg.x2, th.x2));
                    }
                }
                Merged::Left(tg) if !controllable.contains(tg.ev) => {
                    critical.insert(h);
                    break;
                }
                Merged::Left(_) | Merged::Right(_) => {}
            }
        }
    }
    critical
}

/// Returns true if no reachable candidate state disables an uncontrollable
/// plant event.
pub fn is_controllable(plant: &Automaton, controllable: &EventSet, cand: &Automaton) -> bool {
    let critical = controllability_violations(plant, controllable, cand);
    debug!(
        "is_controllable({}, {}): #{} critical states",
        plant.name(),
        cand.name(),
        critical.len()
    );
    critical.is_empty()
}

/// Restricts `cand` and the observer `obs` until the candidate is prefix
/// controllable and prefix normal.
///
/// `obs` must generate the inverse projection of the observable behaviour of
/// `cand`; events are passed as `controllable` and a candidate state that
/// disables any other plant event is removed. Whenever a candidate state
/// disables an event, the corresponding observer state loses that event too,
/// and every candidate state attached to that observer state follows.
pub fn sup_con_norm_closed(plant: &Automaton, controllable: &EventSet, obs: &mut Automaton, cand: &mut Automaton) {
    let Some(q0) = plant.init_state() else {
        return;
    };
    debug!("sup_con_norm_closed({}, {}): #{}", plant.name(), cand.name(), cand.size());

    loop {
        let cand_count = cand.transition_count();
        let obs_count = obs.transition_count();
        let (Some(x0), Some(z0)) = (cand.init_state(), obs.init_state()) else {
            break;
        };

        let mut todo: Vec<(StateId, StateId, StateId)> = vec![(q0, x0, z0)];
        let mut processed = StateSet::empty();
        let mut critical = StateSet::empty();

        while let Some((q, x, z)) = todo.pop() {
            if processed.contains(x) || critical.contains(x) {
                continue;
            }
            processed.insert(x);

            let disabled = &plant.active_events(q) - &cand.active_events(x);
            if !disabled.is_subset(controllable) {
                trace!("sup_con_norm_closed: state {} disables {}", x, disabled);
                critical.insert(x);
                continue;
            }
            let hidden: Vec<Transition> = obs.transitions_from(z).filter(|t| disabled.contains(t.ev)).collect();
            for t in &hidden {
                obs.clr_transition(t);
            }

            let tg: Vec<Transition> = plant.transitions_from(q).collect();
            let th: Vec<Transition> = cand.transitions_from(x).collect();
            let to: Vec<Transition> = obs.transitions_from(z).collect();
            let (mut ig, mut ih, mut io) = (0, 0, 0);
            let mut drop: Vec<Transition> = Vec::new();
            while ig < tg.len() && ih < th.len() && io < to.len() {
                let (g, h, o) = (tg[ig], th[ih], to[io]);
                if g.ev == h.ev && h.ev == o.ev {
                    if !processed.contains(h.x2) {
                        todo.push((g.x2, h.x2, o.x2));
                    }
                    ig += 1;
                    ih += 1;
                    io += 1;
                } else if h.ev < o.ev {
                    // disabled by the observer
                    drop.push(h);
                    ih += 1;
                } else if o.ev < h.ev {
                    io += 1;
                } else if g.ev < h.ev {
                    ig += 1;
                } else {
                    io += 1;
                }
            }
            drop.extend_from_slice(&th[ih..]);
            for t in &drop {
                cand.clr_transition(t);
            }
        }

        cand.del_states(&critical);

        if cand.transition_count() == cand_count && obs.transition_count() == obs_count {
            break;
        }
    }

    cand.accessible();
}

/// Returns true if the closed behaviour of `cand` is normal w.r.t. the closed
/// behaviour of `plant` and the observable events.
///
/// Both arguments are read as prefix-closed languages; `cand` must be a
/// sub-behaviour of `plant`. Both must be deterministic.
pub fn is_normal(plant: &Automaton, observable: &EventSet, cand: &Automaton) -> bool {
    if cand.init_states().is_empty() {
        return true;
    }
    let mut obs = project(cand, observable);
    inv_project(&mut obs, plant.alphabet());
    let (test, _) = product(&obs, plant);
    let res = is_closed_subset(&test, cand);
    debug!("is_normal({}, {}): {}", plant.name(), cand.name(), res);
    res
}

/// Validates a control problem: equal alphabets, controllable events within
/// the alphabet, deterministic inputs.
pub fn control_problem_consistency_check(plant: &Automaton, controllable: &EventSet, spec: &Automaton) -> Result<()> {
    if plant.alphabet() != spec.alphabet() {
        return Err(SynthesisError::AlphabetMismatch {
            only_in_plant: plant.alphabet() - spec.alphabet(),
            only_in_spec: spec.alphabet() - plant.alphabet(),
        });
    }
    if !controllable.is_subset(plant.alphabet()) {
        return Err(SynthesisError::EventsNotInAlphabet {
            role: "controllable",
            events: controllable - plant.alphabet(),
        });
    }
    match (plant.is_deterministic(), spec.is_deterministic()) {
        (true, true) => Ok(()),
        (false, true) => Err(SynthesisError::NotDeterministic(Role::Plant)),
        (true, false) => Err(SynthesisError::NotDeterministic(Role::Specification)),
        (false, false) => Err(SynthesisError::NotDeterministic(Role::Both)),
    }
}

/// As [`control_problem_consistency_check`], additionally requiring the
/// observable events to lie within the alphabet.
pub fn control_problem_consistency_check_observable(
    plant: &Automaton,
    controllable: &EventSet,
    observable: &EventSet,
    spec: &Automaton,
) -> Result<()> {
    control_problem_consistency_check(plant, controllable, spec)?;
    if !observable.is_subset(plant.alphabet()) {
        return Err(SynthesisError::EventsNotInAlphabet {
            role: "observable",
            events: observable - plant.alphabet(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::EventId;

    fn s(i: u32) -> StateId {
        StateId::new(i)
    }

    fn e(i: u32) -> EventId {
        EventId::new(i)
    }

    fn events(ids: &[u32]) -> EventSet {
        ids.iter().map(|&i| e(i)).collect()
    }

    /// Plant: 1 -c-> 2 -u-> 3 -c-> 1, 3 -u-> 4. Candidate without 4.
    fn plant_and_cand() -> (Automaton, Automaton) {
        let (c, u) = (e(1), e(2));
        let mut g = Automaton::new("plant");
        g.set_init_state(s(1));
        g.set_transition(s(1), c, s(2));
        g.set_transition(s(2), u, s(3));
        g.set_transition(s(3), c, s(1));
        g.set_transition(s(3), u, s(4));

        let mut h = Automaton::new("cand");
        h.set_init_state(s(1));
        h.set_transition(s(1), c, s(2));
        h.set_transition(s(2), u, s(3));
        h.set_transition(s(3), c, s(1));
        (g, h)
    }

    #[test]
    fn test_is_controllable() {
        let (g, h) = plant_and_cand();
        let calph = events(&[1]);
        let expected: StateSet = [s(3)].into_iter().collect();
        assert_eq!(controllability_violations(&g, &calph, &h), expected);
        assert!(!is_controllable(&g, &calph, &h));
        assert!(is_controllable(&g, &events(&[1, 2]), &h));
        assert!(is_controllable(&g, &calph, &g));
    }

    #[test]
    fn test_sup_con_closed_propagates_backwards() {
        let (g, mut h) = plant_and_cand();
        sup_con_closed(&g, &events(&[1]), &mut h);
        // 3 is critical, 2 reaches it by an uncontrollable event; 1 survives
        assert_eq!(h.states(), &[s(1)].into_iter().collect::<StateSet>());
        assert!(is_controllable(&g, &events(&[1]), &h));
    }

    #[test]
    fn test_sup_con_closed_keeps_controllable() {
        let (g, mut h) = plant_and_cand();
        let before = h.clone();
        sup_con_closed(&g, &events(&[1, 2]), &mut h);
        assert_eq!(h.states(), before.states());
        assert_eq!(h.transition_count(), before.transition_count());
    }

    #[test]
    fn test_is_normal() {
        // plant: 1 -u-> 2, 1 -a-> 3, 2 -a-> 4 with u unobservable
        let (u, a) = (e(1), e(2));
        let mut g = Automaton::new("plant");
        g.set_init_state(s(1));
        g.set_transition(s(1), u, s(2));
        g.set_transition(s(1), a, s(3));
        g.set_transition(s(2), a, s(4));
        let obs = events(&[2]);

        // allowing `a` only after `u` is not normal
        let mut k = Automaton::new("k");
        k.set_init_state(s(1));
        k.set_transition(s(1), u, s(2));
        k.set_transition(s(2), a, s(4));
        assert!(!is_normal(&g, &obs, &k));

        // allowing `a` everywhere is
        assert!(is_normal(&g, &obs, &g));
        assert!(is_normal(&g, &obs, &Automaton::new("empty")));
    }

    #[test]
    fn test_sup_con_norm_closed() {
        // plant: 1 -u-> 2, 1 -a-> 3, 2 -a-> 4; u unobservable, all controllable
        let (u, a) = (e(1), e(2));
        let mut g = Automaton::new("plant");
        g.set_init_state(s(1));
        g.set_transition(s(1), u, s(2));
        g.set_transition(s(1), a, s(3));
        g.set_transition(s(2), a, s(4));
        let oalph = events(&[2]);

        // candidate disables `a` after `u` only
        let mut k = g.clone();
        k.del_state(s(4));
        let mut obs = k.clone();
        obs.mark_all_states();
        let mut obs = project(&obs, &oalph);
        inv_project(&mut obs, g.alphabet());

        sup_con_norm_closed(&g, &oalph, &mut obs, &mut k);
        // `a` must be disabled at 1 as well
        assert_eq!(k.successor(s(1), a), None);
        assert!(is_normal(&g, &oalph, &k));
    }

    #[test]
    fn test_consistency_check() {
        let (g, h) = plant_and_cand();
        assert!(control_problem_consistency_check(&g, &events(&[1]), &h).is_ok());

        let mut h2 = h.clone();
        h2.insert_event(e(3));
        match control_problem_consistency_check(&g, &events(&[1]), &h2) {
            Err(SynthesisError::AlphabetMismatch { only_in_plant, only_in_spec }) => {
                assert!(only_in_plant.is_empty());
                assert_eq!(only_in_spec, events(&[3]));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            control_problem_consistency_check(&g, &events(&[1, 7]), &h),
            Err(SynthesisError::EventsNotInAlphabet { role: "controllable", .. })
        ));
        assert!(matches!(
            control_problem_consistency_check_observable(&g, &events(&[1]), &events(&[9]), &h),
            Err(SynthesisError::EventsNotInAlphabet { role: "observable", .. })
        ));

        let mut nd = g.clone();
        nd.set_transition(s(1), e(1), s(3));
        assert!(matches!(
            control_problem_consistency_check(&nd, &events(&[1]), &h),
            Err(SynthesisError::NotDeterministic(Role::Plant))
        ));
        assert!(matches!(
            control_problem_consistency_check(&nd, &events(&[1]), &nd),
            Err(SynthesisError::NotDeterministic(Role::Both))
        ));
    }
}
