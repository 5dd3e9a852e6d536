//! Supervisor synthesis under Büchi acceptance.
//!
//! The checked entry points validate their inputs and name their result after
//! the control problem. The `*_unchecked` methods of [`Synthesizer`] skip the
//! validation; on inconsistent inputs they return an unspecified automaton.

use std::collections::BTreeMap;

use log::debug;

use crate::automaton::Automaton;
use crate::buechi::is_buechi_relatively_closed_unchecked;
use crate::error::{Result, Role, SynthesisError};
use crate::idset::{EventSet, StateSet};
use crate::liveness::{
    apply_feedback, controlled_buechi_liveness, controlled_buechi_liveness_feedback,
    controlled_buechi_liveness_observed, ObserverStateMap,
};
use crate::omega_product::{buechi_con_product, ProductState};
use crate::product::{inv_project, product, project};
use crate::progress::{Cancelled, NoProgress, Progress, Stage};
use crate::supcon::{
    control_problem_consistency_check, control_problem_consistency_check_observable, is_controllable, is_normal,
    sup_con_closed, sup_con_norm_closed,
};
use crate::system::System;
use crate::types::StateId;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SynthesisConfig {
    /// Name result states after the product states they stem from.
    pub state_names: bool,
    /// Re-check controllability, relative closedness and (where applicable)
    /// normality of supervised results.
    pub verify: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            state_names: true,
            verify: false,
        }
    }
}

/// Intermediate result of the synthesis loop.
struct Candidate {
    automaton: Automaton,
    plant_marking: StateSet,
    observer_map: ObserverStateMap,
}

/// Runs synthesis with a fixed configuration, reporting to a [`Progress`]
/// observer.
///
/// ```
/// use buechi_syn::{Automaton, EventId, StateId, Synthesizer};
///
/// let a = EventId::new(1);
/// let mut plant = Automaton::new("plant");
/// plant.set_init_state(StateId::new(1));
/// plant.set_transition(StateId::new(1), a, StateId::new(1));
/// plant.set_marked_state(StateId::new(1));
///
/// let mut syn = Synthesizer::new();
/// let sup = syn.sup_buechi_con(&plant, plant.alphabet(), &plant).unwrap();
/// assert_eq!(sup.size(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Synthesizer<P: Progress = NoProgress> {
    config: SynthesisConfig,
    progress: P,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: Progress> Synthesizer<P> {
    pub fn with_config(mut self, config: SynthesisConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the progress observer.
    pub fn with_progress<Q: Progress>(self, progress: Q) -> Synthesizer<Q> {
        Synthesizer {
            config: self.config,
            progress,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn progress(&mut self) -> &mut P {
        &mut self.progress
    }

    /// Supremal controllable sub-behaviour of `spec` w.r.t. `plant`, without
    /// input validation.
    pub fn sup_buechi_con_unchecked(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        spec: &Automaton,
    ) -> Result<Automaton, Cancelled> {
        let cand = self.sup_buechi_con_candidate(plant, controllable, spec)?;
        Ok(cand.automaton)
    }

    fn sup_buechi_con_candidate(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        spec: &Automaton,
    ) -> Result<Candidate, Cancelled> {
        debug!("sup_buechi_con({}, {})", plant.name(), spec.name());
        let prod = buechi_con_product(plant, controllable, spec, &mut self.progress)?;
        let mut res = prod.automaton;
        let plant_marking = prod.plant_marking;
        let initial = res.size();

        loop {
            self.progress.checkpoint(Stage::Driver, initial.saturating_sub(res.size()), initial)?;
            if res.is_empty() {
                break;
            }
            loop {
                let count = res.size();
                sup_con_closed(plant, controllable, &mut res);
                res.coaccessible();
                res.accessible();
                res.complete();
                debug!("sup_buechi_con: prefix iteration #{} -> #{}", count, res.size());
                if res.size() == count || res.is_empty() {
                    break;
                }
            }
            let count = res.size();
            controlled_buechi_liveness(&mut res, controllable, &plant_marking, &mut self.progress)?;
            debug!("sup_buechi_con: liveness #{} -> #{}", count, res.size());
            if res.size() == count {
                break;
            }
        }

        let named = self.config.state_names
            && plant.state_names_enabled()
            && spec.state_names_enabled()
            && res.state_names_enabled();
        if named {
            set_product_state_names(&mut res, &prod.composition, plant, spec);
        } else {
            res.set_state_names_enabled(false);
        }

        debug!("sup_buechi_con({}, {}): #{} states", plant.name(), spec.name(), res.size());
        Ok(Candidate {
            automaton: res,
            plant_marking,
            observer_map: ObserverStateMap::new(),
        })
    }

    /// Supremal controllable and normal sub-behaviour of `spec` w.r.t. `plant`
    /// and the observable events, without input validation.
    pub fn sup_buechi_con_norm_unchecked(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        observable: &EventSet,
        spec: &Automaton,
    ) -> Result<Automaton, Cancelled> {
        let cand = self.sup_buechi_con_norm_candidate(plant, controllable, observable, spec)?;
        Ok(cand.automaton)
    }

    fn sup_buechi_con_norm_candidate(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        observable: &EventSet,
        spec: &Automaton,
    ) -> Result<Candidate, Cancelled> {
        debug!("sup_buechi_con_norm({}, {})", plant.name(), spec.name());
        debug!(
            "sup_buechi_con_norm: controllable {}, unobservable {}",
            controllable,
            plant.alphabet() - observable
        );
        let prod = buechi_con_product(plant, controllable, spec, &mut self.progress)?;
        let mut res = prod.automaton;
        res.buechi_trim();
        res.set_state_names_enabled(false);

        // attach the observer state to every candidate state
        let mut obs = res.clone();
        obs.mark_all_states();
        let mut obs = project(&obs, observable);
        inv_project(&mut obs, res.alphabet());
        let (mut attached, omap) = product(&res, &obs);
        attached.set_name(res.name());
        attached.set_state_names_enabled(false);
        let mut plant_marking = StateSet::empty();
        let mut observer_map = ObserverStateMap::new();
        for (&(x, z), &y) in &omap {
            if prod.plant_marking.contains(x) {
                plant_marking.insert(y);
            }
            observer_map.insert(y, z);
        }
        let mut res = attached;
        debug!("sup_buechi_con_norm: cand #{}, obs #{}", res.size(), obs.size());
        let initial = res.size();

        loop {
            self.progress.checkpoint(Stage::Driver, initial.saturating_sub(res.size()), initial)?;
            if res.is_empty() {
                break;
            }
            loop {
                let count = res.size();
                sup_con_closed(plant, controllable, &mut res);
                res.accessible();
                res.coaccessible();
                sup_con_norm_closed(plant, observable, &mut obs, &mut res);
                res.coaccessible();
                res.accessible();
                res.complete();
                debug!("sup_buechi_con_norm: prefix iteration #{} -> #{}", count, res.size());
                if res.size() == count || res.is_empty() {
                    break;
                }
            }
            let count = res.size();
            observer_map.retain(|&x, _| res.exists_state(x));
            controlled_buechi_liveness_observed(
                &mut res,
                controllable,
                &plant_marking,
                &observer_map,
                &mut self.progress,
            )?;
            debug!("sup_buechi_con_norm: liveness #{} -> #{}", count, res.size());
            if res.size() == count {
                break;
            }
        }
        observer_map.retain(|&x, _| res.exists_state(x));

        debug!("sup_buechi_con_norm({}, {}): #{} states", plant.name(), spec.name(), res.size());
        Ok(Candidate {
            automaton: res,
            plant_marking,
            observer_map,
        })
    }

    /// Tests whether `cand` is a Büchi-controllable sub-behaviour of `plant`.
    ///
    /// Both arguments must share one alphabet, be omega-trim and deterministic.
    pub fn is_buechi_controllable(
        &self,
        plant: &Automaton,
        controllable: &EventSet,
        cand: &Automaton,
    ) -> Result<bool> {
        debug!("is_buechi_controllable({}, {})", plant.name(), cand.name());
        if plant.alphabet() != cand.alphabet() {
            return Err(SynthesisError::AlphabetMismatch {
                only_in_plant: plant.alphabet() - cand.alphabet(),
                only_in_spec: cand.alphabet() - plant.alphabet(),
            });
        }
        for g in [plant, cand] {
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
        Ok(is_controllable(plant, controllable, cand) && is_buechi_relatively_closed_unchecked(plant, cand))
    }

    /// Supremal controllable sub-behaviour of `spec` w.r.t. `plant`.
    pub fn sup_buechi_con(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        spec: &Automaton,
    ) -> Result<Automaton> {
        control_problem_consistency_check(plant, controllable, spec)?;
        let mut res = self.sup_buechi_con_unchecked(plant, controllable, spec)?;
        res.set_name(format!("SupBuechiCon(({}),({}))", plant.name(), spec.name()));
        Ok(res)
    }

    /// Closed loop of `plant` under a supervisor enforcing `spec`.
    ///
    /// Computes [`sup_buechi_con`](Self::sup_buechi_con), then removes the
    /// transitions a feedback supervisor disables and trims.
    pub fn buechi_con(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        spec: &Automaton,
    ) -> Result<Automaton> {
        control_problem_consistency_check(plant, controllable, spec)?;
        let Candidate {
            automaton: mut res,
            plant_marking,
            ..
        } = self.sup_buechi_con_candidate(plant, controllable, spec)?;

        let feedback =
            controlled_buechi_liveness_feedback(&mut res, controllable, &plant_marking, &mut self.progress)?;
        apply_feedback(&mut res, &feedback);
        res.trim();

        if self.config.verify {
            if !is_controllable(plant, controllable, &res) {
                return Err(SynthesisError::VerificationFailed("controllability"));
            }
            if !is_buechi_relatively_closed_unchecked(plant, &res) {
                return Err(SynthesisError::VerificationFailed("relative closedness"));
            }
        }

        res.set_name(format!("BuechiCon(({}),({}))", plant.name(), spec.name()));
        Ok(res)
    }

    /// Supremal controllable and normal sub-behaviour of `spec` w.r.t. `plant`.
    pub fn sup_buechi_con_norm(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        observable: &EventSet,
        spec: &Automaton,
    ) -> Result<Automaton> {
        control_problem_consistency_check_observable(plant, controllable, observable, spec)?;
        let mut res = self.sup_buechi_con_norm_unchecked(plant, controllable, observable, spec)?;
        res.set_name(format!("SupBuechiConNorm(({}),({}))", plant.name(), spec.name()));
        Ok(res)
    }

    /// Closed loop of `plant` under a supervisor that enforces `spec` and only
    /// sees the observable events.
    ///
    /// The supervisor is sound but not necessarily maximally permissive.
    pub fn buechi_con_norm(
        &mut self,
        plant: &Automaton,
        controllable: &EventSet,
        observable: &EventSet,
        spec: &Automaton,
    ) -> Result<Automaton> {
        control_problem_consistency_check_observable(plant, controllable, observable, spec)?;
        let Candidate {
            automaton: mut res,
            plant_marking,
            observer_map,
        } = self.sup_buechi_con_norm_candidate(plant, controllable, observable, spec)?;

        let feedback = controlled_buechi_liveness_observed(
            &mut res,
            controllable,
            &plant_marking,
            &observer_map,
            &mut self.progress,
        )?;
        apply_feedback(&mut res, &feedback);
        res.buechi_trim();

        if self.config.verify {
            if !is_controllable(plant, controllable, &res) {
                return Err(SynthesisError::VerificationFailed("controllability"));
            }
            if !is_buechi_relatively_closed_unchecked(plant, &res) {
                return Err(SynthesisError::VerificationFailed("relative closedness"));
            }
            let mut closed_plant = plant.clone();
            closed_plant.trim();
            closed_plant.mark_all_states();
            let mut closed_res = res.clone();
            closed_res.mark_all_states();
            if !is_normal(&closed_plant, observable, &closed_res) {
                return Err(SynthesisError::VerificationFailed("prefix normality"));
            }
        }

        res.set_name(format!("BuechiConNorm(({}),({}))", plant.name(), spec.name()));
        Ok(res)
    }

    /// [`sup_buechi_con`](Self::sup_buechi_con) with the controllable events of
    /// `plant`. The result carries the plant's event partition.
    pub fn sup_buechi_con_system(&mut self, plant: &System, spec: &Automaton) -> Result<System> {
        let res = self.sup_buechi_con(plant.automaton(), &plant.controllable_events(), spec)?;
        Ok(System::with_partition_of(res, plant))
    }

    /// [`buechi_con`](Self::buechi_con) with the controllable events of `plant`.
    pub fn buechi_con_system(&mut self, plant: &System, spec: &Automaton) -> Result<System> {
        let res = self.buechi_con(plant.automaton(), &plant.controllable_events(), spec)?;
        Ok(System::with_partition_of(res, plant))
    }

    /// [`sup_buechi_con_norm`](Self::sup_buechi_con_norm) with the controllable
    /// and observable events of `plant`.
    pub fn sup_buechi_con_norm_system(&mut self, plant: &System, spec: &Automaton) -> Result<System> {
        let (controllable, observable) = (plant.controllable_events(), plant.observable_events());
        let res = self.sup_buechi_con_norm(plant.automaton(), &controllable, &observable, spec)?;
        Ok(System::with_partition_of(res, plant))
    }

    /// [`buechi_con_norm`](Self::buechi_con_norm) with the controllable and
    /// observable events of `plant`.
    pub fn buechi_con_norm_system(&mut self, plant: &System, spec: &Automaton) -> Result<System> {
        let (controllable, observable) = (plant.controllable_events(), plant.observable_events());
        let res = self.buechi_con_norm(plant.automaton(), &controllable, &observable, spec)?;
        Ok(System::with_partition_of(res, plant))
    }
}

/// Names each state `<plant>|<spec>|r1m` or `<plant>|<spec>|r2m`, falling back
/// to numeric ids for unnamed input states.
fn set_product_state_names(
    res: &mut Automaton,
    composition: &BTreeMap<ProductState, StateId>,
    plant: &Automaton,
    spec: &Automaton,
) {
    for (ps, &x) in composition {
        if !res.exists_state(x) {
            continue;
        }
        let n1 = plant.state_name(ps.q1).map_or_else(|| ps.q1.to_string(), str::to_string);
        let n2 = spec.state_name(ps.q2).map_or_else(|| ps.q2.to_string(), str::to_string);
        let flag = if ps.m1required { "r1m" } else { "r2m" };
        let name = res.unique_state_name(&format!("{}|{}|{}", n1, n2, flag));
        res.set_state_name(x, name);
    }
}

/// See [`Synthesizer::is_buechi_controllable`].
pub fn is_buechi_controllable(plant: &Automaton, controllable: &EventSet, cand: &Automaton) -> Result<bool> {
    Synthesizer::new().is_buechi_controllable(plant, controllable, cand)
}

/// See [`Synthesizer::sup_buechi_con`].
pub fn sup_buechi_con(plant: &Automaton, controllable: &EventSet, spec: &Automaton) -> Result<Automaton> {
    Synthesizer::new().sup_buechi_con(plant, controllable, spec)
}

/// See [`Synthesizer::buechi_con`].
pub fn buechi_con(plant: &Automaton, controllable: &EventSet, spec: &Automaton) -> Result<Automaton> {
    Synthesizer::new().buechi_con(plant, controllable, spec)
}

/// See [`Synthesizer::sup_buechi_con_norm`].
pub fn sup_buechi_con_norm(
    plant: &Automaton,
    controllable: &EventSet,
    observable: &EventSet,
    spec: &Automaton,
) -> Result<Automaton> {
    Synthesizer::new().sup_buechi_con_norm(plant, controllable, observable, spec)
}

/// See [`Synthesizer::buechi_con_norm`].
pub fn buechi_con_norm(
    plant: &Automaton,
    controllable: &EventSet,
    observable: &EventSet,
    spec: &Automaton,
) -> Result<Automaton> {
    Synthesizer::new().buechi_con_norm(plant, controllable, observable, spec)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::progress::ProgressFn;
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

    /// 1 -a-> 2 -b-> 1, both marked, both events controllable
    fn cycle() -> Automaton {
        let mut g = Automaton::new("cycle");
        g.set_init_state(s(1));
        g.set_transition(s(1), e(1), s(2));
        g.set_transition(s(2), e(2), s(1));
        g.set_marked_state(s(1));
        g.set_marked_state(s(2));
        g
    }

    #[test]
    fn test_config_default() {
        let config = SynthesisConfig::default();
        assert!(config.state_names);
        assert!(!config.verify);
    }

    #[test]
    fn test_sup_buechi_con_names() {
        let mut plant = cycle();
        plant.set_state_name(s(1), "idle");
        plant.set_state_name(s(2), "busy");
        let spec = cycle();

        let res = sup_buechi_con(&plant, &events(&[1, 2]), &spec).unwrap();
        assert_eq!(res.name(), "SupBuechiCon((cycle),(cycle))");
        let names: Vec<&str> = res.states().iter().filter_map(|x| res.state_name(x)).collect();
        assert!(names.contains(&"idle|1|r1m"));
        assert!(names.contains(&"busy|2|r2m"));
    }

    #[test]
    fn test_sup_buechi_con_names_disabled() {
        let plant = cycle();
        let mut syn = Synthesizer::new().with_config(SynthesisConfig {
            state_names: false,
            ..Default::default()
        });
        let res = syn.sup_buechi_con(&plant, &events(&[1, 2]), &plant).unwrap();
        assert!(!res.state_names_enabled());
        assert!(!res.is_empty());
    }

    #[test]
    fn test_buechi_con_keeps_cycle() {
        let plant = cycle();
        let mut syn = Synthesizer::new().with_config(SynthesisConfig {
            verify: true,
            ..Default::default()
        });
        let res = syn.buechi_con(&plant, &events(&[1, 2]), &plant).unwrap();
        assert_eq!(res.name(), "BuechiCon((cycle),(cycle))");
        assert_eq!(res.transition_count(), 2);
        assert!(is_buechi_controllable(&plant, &events(&[1, 2]), &res).unwrap());
    }

    #[test]
    fn test_checked_entry_points_validate() {
        let plant = cycle();
        let mut spec = cycle();
        spec.insert_event(e(3));
        assert!(matches!(
            sup_buechi_con(&plant, &events(&[1]), &spec),
            Err(SynthesisError::AlphabetMismatch { .. })
        ));
        assert!(matches!(
            buechi_con(&plant, &events(&[7]), &plant),
            Err(SynthesisError::EventsNotInAlphabet { .. })
        ));
        assert!(matches!(
            sup_buechi_con_norm(&plant, &events(&[1]), &events(&[8]), &plant),
            Err(SynthesisError::EventsNotInAlphabet { .. })
        ));

        let mut nondet = cycle();
        nondet.set_transition(s(1), e(1), s(1));
        assert!(matches!(
            sup_buechi_con(&plant, &events(&[1]), &nondet),
            Err(SynthesisError::NotDeterministic(Role::Specification))
        ));
    }

    #[test]
    fn test_is_buechi_controllable_requires_omega_trim() {
        let plant = cycle();
        let mut cand = cycle();
        cand.clr_transition(&crate::types::Transition::new(s(2), e(2), s(1)));
        assert!(matches!(
            is_buechi_controllable(&plant, &events(&[1, 2]), &cand),
            Err(SynthesisError::NotOmegaTrim(_))
        ));
    }

    #[test]
    fn test_norm_with_full_observation() {
        let plant = cycle();
        let calph = events(&[1, 2]);
        let res = sup_buechi_con_norm(&plant, &calph, plant.alphabet(), &plant).unwrap();
        assert_eq!(res.size(), 2);
        assert!(!res.state_names_enabled());

        let mut syn = Synthesizer::new().with_config(SynthesisConfig {
            verify: true,
            ..Default::default()
        });
        let res = syn.buechi_con_norm(&plant, &calph, plant.alphabet(), &plant).unwrap();
        assert_eq!(res.transition_count(), 2);
    }

    #[test]
    fn test_cancel_from_driver() {
        let plant = cycle();
        let mut syn = Synthesizer::new().with_progress(ProgressFn(
            |stage: Stage, _: usize, _: usize| -> Result<(), Cancelled> {
                match stage {
                    Stage::Driver => Err(Cancelled),
                    _ => Ok(()),
                }
            },
        ));
        let res = syn.sup_buechi_con(&plant, &events(&[1, 2]), &plant);
        assert!(matches!(res, Err(SynthesisError::Cancelled(Cancelled))));
    }
}
