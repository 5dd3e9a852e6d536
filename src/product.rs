//! Synchronous product and natural projection.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;

use crate::automaton::Automaton;
use crate::idset::{EventSet, StateSet};
use crate::merge::{merge_join, Merged};
use crate::types::StateId;

/// Maps pairs of argument states to the product state representing them.
pub type CompositionMap = BTreeMap<(StateId, StateId), StateId>;

/// Synchronous product of `g1` and `g2` over their shared alphabet.
///
/// Only shared events are executed, and only when both arguments enable them.
/// A product state is marked iff both components are marked.
pub fn product(g1: &Automaton, g2: &Automaton) -> (Automaton, CompositionMap) {
    debug!("product({}, {}): #{} x #{}", g1.name(), g2.name(), g1.size(), g2.size());

    let mut res = Automaton::new(format!("Product({},{})", g1.name(), g2.name()));
    let shared = g1.alphabet() & g2.alphabet();
    res.insert_events(&shared);
    res.copy_event_names(g1);
    let names = g1.state_names_enabled() && g2.state_names_enabled();
    res.set_state_names_enabled(names);

    let mut cmap = CompositionMap::new();
    let mut todo: Vec<(StateId, StateId)> = Vec::new();
    for x1 in g1.init_states() {
        for x2 in g2.init_states() {
            let x = res.insert_init_state();
            cmap.insert((x1, x2), x);
            todo.push((x1, x2));
        }
    }

    while let Some((x1, x2)) = todo.pop() {
        let x = cmap[&(x1, x2)];
        // successors of a non-deterministic argument come out grouped by event
        for t1 in g1.transitions_from(x1) {
            for t2 in g2.transitions_from_ev(x2, t1.ev) {
                let next = (t1.x2, t2.x2);
                let y = match cmap.get(&next) {
                    Some(&y) => y,
                    None => {
                        let y = res.insert_state();
                        cmap.insert(next, y);
                        todo.push(next);
                        y
                    }
                };
                res.set_transition(x, t1.ev, y);
            }
        }
    }

    for (&(x1, x2), &x) in &cmap {
        if g1.is_marked_state(x1) && g2.is_marked_state(x2) {
            res.set_marked_state(x);
        }
        if names {
            if let (Some(n1), Some(n2)) = (g1.state_name(x1), g2.state_name(x2)) {
                let name = res.unique_state_name(&format!("{}|{}", n1, n2));
                res.set_state_name(x, name);
            }
        }
    }

    debug!("product: #{} states, #{} transitions", res.size(), res.transition_count());
    (res, cmap)
}

/// States reachable from `set` via events outside `alphabet`.
fn unobservable_closure(g: &Automaton, set: &StateSet, alphabet: &EventSet) -> StateSet {
    let mut closure = set.clone();
    let mut stack: Vec<StateId> = set.iter().collect();
    while let Some(x) = stack.pop() {
        for t in g.transitions_from(x) {
            if !alphabet.contains(t.ev) && closure.insert(t.x2) {
                stack.push(t.x2);
            }
        }
    }
    closure
}

/// Natural projection onto `alphabet`, made deterministic.
///
/// Events outside `alphabet` are treated as silent. The result is built by
/// subset construction: each state stands for a set of argument states, and it
/// is marked iff that set contains a marked state. Returns the result together
/// with the state set each result state represents.
pub fn project_with_map(g: &Automaton, alphabet: &EventSet) -> (Automaton, BTreeMap<StateId, StateSet>) {
    debug!("project({}): #{} states onto {}", g.name(), g.size(), alphabet);

    let mut res = Automaton::new(format!("Project({})", g.name()));
    let palph = g.alphabet() & alphabet;
    res.insert_events(&palph);
    res.copy_event_names(g);
    res.set_state_names_enabled(false);

    let mut entry: BTreeMap<StateId, StateSet> = BTreeMap::new();
    if g.init_states().is_empty() {
        return (res, entry);
    }

    let mut index: BTreeMap<StateSet, StateId> = BTreeMap::new();
    let init = unobservable_closure(g, g.init_states(), &palph);
    let x0 = res.insert_init_state();
    index.insert(init.clone(), x0);
    let mut queue = VecDeque::from([(init, x0)]);

    while let Some((set, x)) = queue.pop_front() {
        if !set.is_disjoint(g.marked_states()) {
            res.set_marked_state(x);
        }
        for ev in palph.iter() {
            let step: StateSet = set
                .iter()
                .flat_map(|q| g.transitions_from_ev(q, ev))
                .map(|t| t.x2)
                .collect();
            if step.is_empty() {
                continue;
            }
            let next = unobservable_closure(g, &step, &palph);
            let y = match index.get(&next) {
                Some(&y) => y,
                None => {
                    let y = res.insert_state();
                    index.insert(next.clone(), y);
                    queue.push_back((next, y));
                    y
                }
            };
            res.set_transition(x, ev, y);
        }
        entry.insert(x, set);
    }

    debug!("project: #{} states", res.size());
    (res, entry)
}

/// Natural projection onto `alphabet`, made deterministic.
pub fn project(g: &Automaton, alphabet: &EventSet) -> Automaton {
    project_with_map(g, alphabet).0
}

/// Inverse projection: extends the alphabet to `alphabet` and self-loops every
/// new event at every state.
pub fn inv_project(g: &mut Automaton, alphabet: &EventSet) {
    let new_events = alphabet - g.alphabet();
    debug!("inv_project({}): adding {}", g.name(), new_events);
    g.insert_events(&new_events);
    let states: Vec<StateId> = g.states().iter().collect();
    for x in states {
        for ev in new_events.iter() {
            g.set_transition(x, ev, x);
        }
    }
}

/// Returns true if every finite word generated by `g1` is also generated by
/// `g2`. Marking is ignored.
///
/// Both arguments must be deterministic.
pub fn is_closed_subset(g1: &Automaton, g2: &Automaton) -> bool {
    let Some(x2) = g2.init_state() else {
        return g1.init_states().is_empty();
    };
    let mut seen: BTreeSet<(StateId, StateId)> = BTreeSet::new();
    let mut stack: Vec<(StateId, StateId)> = g1.init_states().iter().map(|x1| (x1, x2)).collect();
    while let Some((x1, x2)) = stack.pop() {
        if !seen.insert((x1, x2)) {
            continue;
        }
        for m in merge_join(g1.transitions_from(x1), g2.transitions_from(x2)) {
            match m {
                Merged::Both(t1, t2) => stack.push((t1.x2, t2.x2)),
                Merged::Left(t1) => {
                    debug!("is_closed_subset: {} not enabled in {}", t1, g2.name());
                    return false;
                }
                Merged::Right(_) => {}
            }
        }
    }
    true
}
