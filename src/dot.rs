//! Automaton to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **States** are circles labelled by their name (or numeric id)
//! - **Marked states** are double circles
//! - **Initial states** receive an arrow from an invisible entry node
//! - **Transitions** between the same pair of states share one edge, labelled
//!   with all their event names
//!
//! # Examples
//!
//! ```
//! use buechi_syn::{Automaton, EventId, StateId};
//!
//! let mut g = Automaton::new("g");
//! g.insert_named_event(EventId::new(1), "start");
//! g.set_init_state(StateId::new(1));
//! g.set_transition(StateId::new(1), EventId::new(1), StateId::new(1));
//!
//! let dot = g.to_dot().unwrap();
//! assert!(dot.contains("label=\"start\""));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;

use crate::automaton::Automaton;
use crate::types::{EventId, StateId};

/// Configuration options for DOT output generation.
///
/// ```
/// use buechi_syn::dot::DotConfig;
///
/// let config = DotConfig {
///     rankdir: "TB",
///     ..DotConfig::default()
/// };
/// assert_eq!(config.marked_shape, "doublecircle");
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for unmarked states (default: "circle")
    pub state_shape: &'static str,
    /// Shape for marked states (default: "doublecircle")
    pub marked_shape: &'static str,
    /// Layout direction (default: "LR")
    pub rankdir: &'static str,
    /// Label states by name where one is set (default: true)
    pub use_state_names: bool,
    /// Label edges by event name where one is set (default: true)
    pub use_event_names: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "circle",
            marked_shape: "doublecircle",
            rankdir: "LR",
            use_state_names: true,
            use_event_names: true,
        }
    }
}

impl Automaton {
    /// Converts the automaton to DOT (Graphviz) format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the automaton to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph \"{}\" {{", escape(self.name()))?;
        writeln!(dot, "rankdir={};", config.rankdir)?;
        writeln!(dot, "node [shape={}];", config.state_shape)?;

        for x in self.states() {
            let shape = if self.is_marked_state(x) {
                config.marked_shape
            } else {
                config.state_shape
            };
            writeln!(dot, "{} [shape={}, label=\"{}\"];", x, shape, escape(&self.state_label(x, config)))?;
        }

        // Entry arrows
        for x in self.init_states() {
            writeln!(dot, "init{} [shape=point, style=invis];", x)?;
            writeln!(dot, "init{} -> {};", x, x)?;
        }

        // Group parallel transitions into one edge
        let mut edges = BTreeMap::<(StateId, StateId), Vec<EventId>>::new();
        for t in self.transitions() {
            edges.entry((t.x1, t.x2)).or_default().push(t.ev);
        }
        for ((x1, x2), events) in &edges {
            let labels: Vec<String> = events.iter().map(|&ev| self.event_label(ev, config)).collect();
            writeln!(dot, "{} -> {} [label=\"{}\"];", x1, x2, escape(&labels.join(", ")))?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    fn state_label(&self, x: StateId, config: &DotConfig) -> String {
        match self.state_name(x) {
            Some(name) if config.use_state_names => name.to_string(),
            _ => x.to_string(),
        }
    }

    fn event_label(&self, ev: EventId, config: &DotConfig) -> String {
        match self.event_name(ev) {
            Some(name) if config.use_event_names => name.to_string(),
            _ => ev.to_string(),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
