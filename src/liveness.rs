//! Controlled Büchi liveness: the controllable prefix.
//!
//! Given a candidate automaton, the marking of the candidate and the states
//! where the plant is marked, this computes the largest set of states from
//! which a supervisor can force the candidate marking to be visited
//! infinitely often, under the assumption that the plant marking is visited
//! infinitely often, without ever being forced out by an uncontrollable event.
//!
//! The computation is the nested fixpoint
//!
//! ```text
//! μ resolved. ν initialK. μ initialL. ν domainL. μ target1.
//!     θ( (initialK ∩ marked) ∪ resolved ∪ initialL ∪ (target1 \ plant_marking),
//!        domainL \ plant_marking )
//! ```
//!
//! where `θ(T, D)` holds the states that can reach `T` in one step and can be
//! controlled not to leave `T ∪ D`. Each loop is unwound literally and stops
//! when its iterate is stable or hits the trivial bound.
//!
//! Three variants share this skeleton and differ in how `θ` is evaluated and
//! which control actions they record:
//!
//! - [`controlled_buechi_liveness`] restricts the candidate only,
//! - [`controlled_buechi_liveness_feedback`] also returns a feedback map,
//! - [`controlled_buechi_liveness_observed`] requires the control action to
//!   depend on the observation class of a state only.

use std::collections::BTreeMap;

use log::{debug, trace, warn};

use crate::automaton::Automaton;
use crate::idset::{EventSet, StateSet};
use crate::pattern::ControlPattern;
use crate::progress::{Cancelled, Progress, Stage};
use crate::types::StateId;

/// Events a supervisor enables, per state.
pub type FeedbackMap = BTreeMap<StateId, EventSet>;

/// Maps candidate states to the observer state tracking what has been observed.
pub type ObserverStateMap = BTreeMap<StateId, StateId>;

/// Observation class of a candidate state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ObsClass {
    /// States sharing an observer state.
    Observed(StateId),
    /// A state missing from the observer map forms a class on its own.
    Singleton(StateId),
}

impl ObsClass {
    pub fn of(map: &ObserverStateMap, x: StateId) -> Self {
        match map.get(&x) {
            Some(&z) => ObsClass::Observed(z),
            None => ObsClass::Singleton(x),
        }
    }
}

/// Evaluation of `θ` plus bookkeeping of the control actions it implies.
///
/// The hooks bracket the loops of the fixpoint: a *round* is one iteration of
/// the ν(domainL) loop, a *level* one iteration of the ν(initialK) loop.
trait Theta {
    fn theta(&mut self, gen: &Automaton, controllable: &EventSet, target: &StateSet, domain: &StateSet) -> StateSet;

    fn begin_round(&mut self) {}

    /// Called after a ν(domainL) loop has converged.
    fn end_round(&mut self) {}

    fn begin_level(&mut self) {}

    /// Called after a ν(initialK) loop has converged.
    fn end_level(&mut self) {}
}

/// One-step test of a state: returns the controllable events that must be
/// disabled if the state can be driven into `target` without leaving
/// `target ∪ domain`.
fn accept_state(
    gen: &Automaton,
    controllable: &EventSet,
    target: &StateSet,
    domain: &StateSet,
    x: StateId,
) -> Option<EventSet> {
    let mut pass = false;
    let mut disable = EventSet::empty();
    for t in gen.transitions_from(x) {
        if target.contains(t.x2) {
            pass = true;
        } else if domain.contains(t.x2) {
            continue;
        } else if !controllable.contains(t.ev) {
            return None;
        } else {
            disable.insert(t.ev);
        }
    }
    pass.then_some(disable)
}

struct Restrict;

impl Theta for Restrict {
    fn theta(&mut self, gen: &Automaton, controllable: &EventSet, target: &StateSet, domain: &StateSet) -> StateSet {
        gen.states()
            .iter()
            .filter(|&x| accept_state(gen, controllable, target, domain, x).is_some())
            .collect()
    }
}

/// Records disabled events per state. The first record of a state wins on
/// every level of the fixpoint.
#[derive(Default)]
struct Feedback {
    round: BTreeMap<StateId, EventSet>,
    level: BTreeMap<StateId, EventSet>,
    total: BTreeMap<StateId, EventSet>,
}

fn merge_first_wins(into: &mut BTreeMap<StateId, EventSet>, from: &BTreeMap<StateId, EventSet>) {
    for (&x, events) in from {
        into.entry(x).or_insert_with(|| events.clone());
    }
}

impl Theta for Feedback {
    fn theta(&mut self, gen: &Automaton, controllable: &EventSet, target: &StateSet, domain: &StateSet) -> StateSet {
        let mut theta = StateSet::empty();
        for x in gen.states() {
            if let Some(disable) = accept_state(gen, controllable, target, domain, x) {
                theta.insert(x);
                self.round.entry(x).or_insert(disable);
            }
        }
        theta
    }

    fn begin_round(&mut self) {
        self.round.clear();
    }

    fn end_round(&mut self) {
        merge_first_wins(&mut self.level, &self.round);
    }

    fn begin_level(&mut self) {
        self.level.clear();
    }

    fn end_level(&mut self) {
        merge_first_wins(&mut self.total, &self.level);
    }
}

/// Records one control pattern per observation class; patterns accumulate by
/// merging.
struct Observed<'a> {
    classes: &'a ObserverStateMap,
    round: BTreeMap<ObsClass, ControlPattern>,
    level: BTreeMap<ObsClass, ControlPattern>,
    total: BTreeMap<ObsClass, ControlPattern>,
}

fn merge_patterns(into: &mut BTreeMap<ObsClass, ControlPattern>, from: &BTreeMap<ObsClass, ControlPattern>) {
    for (&cx, pattern) in from {
        into.entry(cx).or_default().merge(pattern);
    }
}

impl Observed<'_> {
    /// Control patterns the states of each class ask for to enter `target`.
    fn candidate_patterns(
        &self,
        gen: &Automaton,
        controllable: &EventSet,
        target: &StateSet,
        domain: &StateSet,
    ) -> BTreeMap<ObsClass, ControlPattern> {
        let mut candidates: BTreeMap<ObsClass, ControlPattern> = BTreeMap::new();
        for x in gen.states() {
            let mut pass = false;
            let mut fail = false;
            let mut disable = EventSet::empty();
            let mut enable = EventSet::empty();
            for t in gen.transitions_from(x) {
                if disable.contains(t.ev) {
                    continue;
                }
                if target.contains(t.x2) {
                    enable.insert(t.ev);
                    pass = true;
                } else if domain.contains(t.x2) {
                    continue;
                } else if !controllable.contains(t.ev) {
                    fail = true;
                    break;
                } else {
                    disable.insert(t.ev);
                }
            }
            if !pass || fail {
                continue;
            }

            let cx = ObsClass::of(self.classes, x);
            let pattern = candidates.entry(cx).or_insert_with(|| {
                let mut committed = ControlPattern::new();
                for known in [&self.round, &self.level, &self.total] {
                    if let Some(p) = known.get(&cx) {
                        committed.merge(p);
                    }
                }
                committed
            });
            pattern.disable_all.union_with(&disable);
            pattern.require_one_of(enable);
        }
        candidates
    }
}

impl Theta for Observed<'_> {
    fn theta(&mut self, gen: &Automaton, controllable: &EventSet, target: &StateSet, domain: &StateSet) -> StateSet {
        let candidates = self.candidate_patterns(gen, controllable, target, domain);
        for (cx, pattern) in candidates {
            if pattern.is_conflicting() {
                trace!("controlled_buechi_liveness: rejecting pattern for {:?}: {}", cx, pattern);
                continue;
            }
            self.round.entry(cx).or_default().merge(&pattern);
        }

        let mut theta = StateSet::empty();
        for x in gen.states() {
            let Some(pattern) = self.round.get(&ObsClass::of(self.classes, x)) else {
                continue;
            };
            let mut pass = false;
            let mut fail = false;
            for t in gen.transitions_from(x) {
                if pattern.disable_all.contains(t.ev) {
                    continue;
                }
                if target.contains(t.x2) {
                    pass = true;
                } else if !domain.contains(t.x2) {
                    fail = true;
                }
            }
            if pass && !fail {
                theta.insert(x);
            }
        }
        theta
    }

    fn begin_round(&mut self) {
        self.round.clear();
    }

    fn end_round(&mut self) {
        merge_patterns(&mut self.level, &self.round);
    }

    fn begin_level(&mut self) {
        self.level.clear();
    }

    fn end_level(&mut self) {
        merge_patterns(&mut self.total, &self.level);
    }
}

/// Evaluates the nested fixpoint and returns the resolved states.
fn controllable_prefix<T: Theta, P: Progress>(
    gen: &Automaton,
    controllable: &EventSet,
    plant_marking: &StateSet,
    rule: &mut T,
    progress: &mut P,
) -> Result<StateSet, Cancelled> {
    let full = gen.states();
    let fsz = full.len();

    let mut resolved = StateSet::empty();
    loop {
        let rsz = resolved.len();
        let mut initial_k = full.clone();
        loop {
            let iksz = initial_k.len();
            let target_lstar = &(&initial_k & gen.marked_states()) | &resolved;
            debug!(
                "controllable_prefix: resolved #{}, target #{}",
                resolved.len(),
                target_lstar.len()
            );
            rule.begin_level();

            let mut initial_l = StateSet::empty();
            loop {
                let ilsz = initial_l.len();
                let target_l = &target_lstar | &initial_l;

                let mut domain_l = full.clone();
                loop {
                    progress.checkpoint(Stage::Fixpoint, resolved.len(), fsz)?;
                    let dlsz = domain_l.len();
                    let domain = &domain_l - plant_marking;
                    rule.begin_round();

                    let mut target1 = StateSet::empty();
                    loop {
                        let t1sz = target1.len();
                        let target = &target_l | &(&target1 - plant_marking);
                        let theta = rule.theta(gen, controllable, &target, &domain);
                        target1.union_with(&theta);
                        if target1.len() == t1sz || target1.len() == fsz {
                            break;
                        }
                    }

                    domain_l.intersect_with(&target1);
                    if domain_l.len() == dlsz || domain_l.is_empty() {
                        break;
                    }
                }
                rule.end_round();

                initial_l.union_with(&domain_l);
                if initial_l.len() == ilsz || initial_l.len() == fsz {
                    break;
                }
            }

            initial_k.intersect_with(&initial_l);
            if initial_k.len() == iksz || initial_k.is_empty() {
                break;
            }
        }
        rule.end_level();

        resolved.union_with(&initial_k);
        if resolved.len() == rsz || resolved.len() == fsz {
            break;
        }
    }
    Ok(resolved)
}

/// Restricts `gen` to its controllable prefix.
pub fn controlled_buechi_liveness<P: Progress>(
    gen: &mut Automaton,
    controllable: &EventSet,
    plant_marking: &StateSet,
    progress: &mut P,
) -> Result<(), Cancelled> {
    debug!("controlled_buechi_liveness({}): #{}", gen.name(), gen.size());
    let resolved = controllable_prefix(gen, controllable, plant_marking, &mut Restrict, progress)?;
    gen.restrict_states(&resolved);
    debug!("controlled_buechi_liveness: #{} resolved", resolved.len());
    Ok(())
}

/// Restricts `gen` to its controllable prefix and returns a feedback map that
/// keeps the closed loop within it.
///
/// The pattern of a state contains its enabled events and all uncontrollable
/// events, minus the controllable events the fixpoint had to disable.
pub fn controlled_buechi_liveness_feedback<P: Progress>(
    gen: &mut Automaton,
    controllable: &EventSet,
    plant_marking: &StateSet,
    progress: &mut P,
) -> Result<FeedbackMap, Cancelled> {
    debug!("controlled_buechi_liveness_feedback({}): #{}", gen.name(), gen.size());
    let mut rule = Feedback::default();
    let resolved = controllable_prefix(gen, controllable, plant_marking, &mut rule, progress)?;
    gen.restrict_states(&resolved);

    let uncontrollable = gen.alphabet() - controllable;
    let feedback: FeedbackMap = resolved
        .iter()
        .map(|x| {
            let mut pattern = &gen.active_events(x) | &uncontrollable;
            if let Some(disabled) = rule.total.get(&x) {
                pattern.difference_with(disabled);
            }
            (x, pattern)
        })
        .collect();
    Ok(feedback)
}

/// Partial-observation variant of [`controlled_buechi_liveness_feedback`].
///
/// States in one observation class must share one control action. The result
/// is a controllable prefix under that constraint, though not necessarily the
/// largest one.
pub fn controlled_buechi_liveness_observed<P: Progress>(
    gen: &mut Automaton,
    controllable: &EventSet,
    plant_marking: &StateSet,
    classes: &ObserverStateMap,
    progress: &mut P,
) -> Result<FeedbackMap, Cancelled> {
    warn!(
        "controlled_buechi_liveness_observed({}): partial observation is experimental, #{} states",
        gen.name(),
        gen.size()
    );
    let mut rule = Observed {
        classes,
        round: BTreeMap::new(),
        level: BTreeMap::new(),
        total: BTreeMap::new(),
    };
    let resolved = controllable_prefix(gen, controllable, plant_marking, &mut rule, progress)?;
    gen.restrict_states(&resolved);

    let feedback: FeedbackMap = resolved
        .iter()
        .map(|x| {
            let pattern = match rule.total.get(&ObsClass::of(classes, x)) {
                Some(p) => gen.alphabet() - &p.disable_all,
                None => gen.alphabet().clone(),
            };
            (x, pattern)
        })
        .collect();
    Ok(feedback)
}

/// Removes every transition whose event is not in the pattern of its source
/// state. States without a pattern lose all outgoing transitions.
pub fn apply_feedback(gen: &mut Automaton, feedback: &FeedbackMap) {
    let before = gen.transition_count();
    gen.retain_transitions(|t| feedback.get(&t.x1).is_some_and(|pattern| pattern.contains(t.ev)));
    debug!(
        "apply_feedback({}): #{} -> #{} transitions",
        gen.name(),
        before,
        gen.transition_count()
    );
}
