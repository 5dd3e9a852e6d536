use thiserror::Error;

use crate::idset::EventSet;
use crate::progress::Cancelled;

/// Which input of a control problem an error refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Plant,
    Specification,
    Both,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Plant => write!(f, "plant"),
            Role::Specification => write!(f, "specification"),
            Role::Both => write!(f, "plant and specification"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(
        "alphabets of plant and specification do not match \
         (only in plant: {only_in_plant}, only in specification: {only_in_spec})"
    )]
    AlphabetMismatch {
        only_in_plant: EventSet,
        only_in_spec: EventSet,
    },
    #[error("not all {role} events are contained in the plant alphabet: {events}")]
    EventsNotInAlphabet { role: &'static str, events: EventSet },
    #[error("{0} must be deterministic")]
    NotDeterministic(Role),
    #[error("generator '{0}' must be omega-trim")]
    NotOmegaTrim(String),
    #[error("synthesis was cancelled")]
    Cancelled(#[from] Cancelled),
    #[error("result failed verification: {0}")]
    VerificationFailed(&'static str),
}

pub type Result<T, E = SynthesisError> = std::result::Result<T, E>;
