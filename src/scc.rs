//! Strongly connected components of an automaton's transition graph.

use std::collections::HashMap;

use crate::automaton::Automaton;
use crate::idset::StateSet;
use crate::types::StateId;

/// Selects which components [`strongly_connected_components`] reports.
#[derive(Debug, Clone, Default)]
pub struct SccFilter {
    /// Skip single-state components without a self-loop.
    pub ignore_trivial: bool,
    /// Compute components of the subgraph that avoids these states.
    pub avoid: StateSet,
    /// Report only components that contain at least one of these states.
    pub require: Option<StateSet>,
}

impl SccFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_trivial(mut self) -> Self {
        self.ignore_trivial = true;
        self
    }

    pub fn avoid(mut self, states: &StateSet) -> Self {
        self.avoid = states.clone();
        self
    }

    pub fn require(mut self, states: &StateSet) -> Self {
        self.require = Some(states.clone());
        self
    }
}

struct Tarjan<'a> {
    gen: &'a Automaton,
    avoid: &'a StateSet,
    index: HashMap<StateId, usize>,
    lowlink: HashMap<StateId, usize>,
    stack: Vec<StateId>,
    on_stack: StateSet,
    next_index: usize,
    components: Vec<StateSet>,
}

impl Tarjan<'_> {
    fn successors(&self, x: StateId) -> Vec<StateId> {
        self.gen
            .transitions_from(x)
            .map(|t| t.x2)
            .filter(|&y| !self.avoid.contains(y))
            .collect()
    }

    fn visit(&mut self, root: StateId) {
        // (state, successors, position of the next successor to explore)
        let mut work: Vec<(StateId, Vec<StateId>, usize)> = Vec::new();
        self.open(root);
        work.push((root, self.successors(root), 0));

        while let Some((x, succs, pos)) = work.last_mut() {
            let x = *x;
            if *pos < succs.len() {
                let y = succs[*pos];
                *pos += 1;
                if !self.index.contains_key(&y) {
                    self.open(y);
                    let ys = self.successors(y);
                    work.push((y, ys, 0));
                } else if self.on_stack.contains(y) {
                    let low = self.lowlink[&x].min(self.index[&y]);
                    self.lowlink.insert(x, low);
                }
                continue;
            }
            work.pop();
            if let Some((parent, _, _)) = work.last() {
                let low = self.lowlink[parent].min(self.lowlink[&x]);
                self.lowlink.insert(*parent, low);
            }
            if self.lowlink[&x] == self.index[&x] {
                let mut component = StateSet::empty();
                while let Some(y) = self.stack.pop() {
                    self.on_stack.remove(y);
                    component.insert(y);
                    if y == x {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    fn open(&mut self, x: StateId) {
        self.index.insert(x, self.next_index);
        self.lowlink.insert(x, self.next_index);
        self.next_index += 1;
        self.stack.push(x);
        self.on_stack.insert(x);
    }
}

/// Computes the strongly connected components selected by `filter`.
///
/// Components are returned in the order Tarjan's algorithm closes them.
pub fn strongly_connected_components(gen: &Automaton, filter: &SccFilter) -> Vec<StateSet> {
    let mut tarjan = Tarjan {
        gen,
        avoid: &filter.avoid,
        index: HashMap::new(),
        lowlink: HashMap::new(),
        stack: Vec::new(),
        on_stack: StateSet::empty(),
        next_index: 0,
        components: Vec::new(),
    };
    for x in gen.states() {
        if filter.avoid.contains(x) || tarjan.index.contains_key(&x) {
            continue;
        }
        tarjan.visit(x);
    }

    tarjan
        .components
        .into_iter()
        .filter(|c| {
            if !filter.ignore_trivial || c.len() > 1 {
                return true;
            }
            // single state: non-trivial iff it carries a self-loop
            c.first()
                .is_some_and(|x| gen.transitions_from(x).any(|t| t.x2 == x))
        })
        .filter(|c| match &filter.require {
            Some(req) => !c.is_disjoint(req),
            None => true,
        })
        .collect()
}
