//! # buechi-syn: Supervisory control under Büchi acceptance
//!
//! **`buechi-syn`** synthesises supervisors for discrete-event systems whose
//! specifications are given as Büchi automata.
//!
//! ## The control problem
//!
//! A *plant* is a finite automaton generating the possible event sequences of a
//! system. Some events are *controllable*: a supervisor may disable them. Under
//! Büchi acceptance, plant and specification accept the infinite event sequences
//! that visit one of their marked states infinitely often.
//!
//! The supervisor must never disable an uncontrollable event, and the closed
//! loop must keep its promise: whenever the plant visits its marking
//! infinitely often, so does the specification. The supremal solution is
//! computed in three stages:
//!
//! 1. a controllability-aware product of plant and specification
//!    ([`omega_product`]),
//! 2. a nested μ/ν fixpoint computing the controllable prefix ([`liveness`]),
//! 3. a driver alternating prefix pruning and the fixpoint until nothing
//!    changes ([`synthesis`]).
//!
//! ## Basic Usage
//!
//! ```rust
//! use buechi_syn::{buechi_con, Automaton, EventId, EventSet, StateId};
//!
//! let (a, b) = (EventId::new(1), EventId::new(2));
//! let (x1, x2) = (StateId::new(1), StateId::new(2));
//!
//! // Plant: 1 -a-> 2 -b-> 1, both states marked
//! let mut plant = Automaton::new("plant");
//! plant.set_init_state(x1);
//! plant.set_transition(x1, a, x2);
//! plant.set_transition(x2, b, x1);
//! plant.set_marked_state(x1);
//! plant.set_marked_state(x2);
//!
//! let controllable: EventSet = [a, b].into_iter().collect();
//! let closed_loop = buechi_con(&plant, &controllable, &plant).unwrap();
//! assert_eq!(closed_loop.size(), 2);
//! assert_eq!(closed_loop.transition_count(), 2);
//! ```
//!
//! ## Core Components
//!
//! - **[`automaton`]**: The [`Automaton`] store with ordered states, events and transitions.
//! - **[`synthesis`]**: The public synthesis functions and the configurable [`Synthesizer`].
//! - **[`system`]**: Plants carrying their controllable and unobservable events.
//! - **[`progress`]**: Cooperative cancellation for long-running calls.
//! - **[`dot`]**: Utilities for visualizing automata using Graphviz.

pub mod automaton;
pub mod buechi;
pub mod dot;
pub mod error;
pub mod idset;
pub mod liveness;
pub mod merge;
pub mod omega_product;
pub mod pattern;
pub mod product;
pub mod progress;
pub mod scc;
pub mod supcon;
pub mod synthesis;
pub mod system;
pub mod trim;
pub mod types;

pub use automaton::Automaton;
pub use error::{Result, SynthesisError};
pub use idset::{EventSet, StateSet};
pub use progress::{Cancelled, NoProgress, Progress, ProgressFn, Stage};
pub use synthesis::{
    buechi_con, buechi_con_norm, is_buechi_controllable, sup_buechi_con, sup_buechi_con_norm, SynthesisConfig,
    Synthesizer,
};
pub use system::System;
pub use types::{EventId, StateId, Transition};
