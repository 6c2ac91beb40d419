//! Error handling for mode loading, configuration parsing and engagement transitions

use std::io;
use thiserror::Error;

use crate::dispatch::OwnerTag;
use crate::engagement::{EngagementState, Transition};

/// Unified error reported while loading control modes and reading their configuration.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Activation policy string is not known (or not supported) by the owner being loaded.
    #[error("Control mode \"{policy}\" does not exist for {owner}")]
    UnknownPolicy { policy: String, owner: OwnerTag },

    /// Transition requested from a state it does not leave. Callers must check the state
    /// first, so this indicates a logic error.
    #[error("Transition {transition:?} is not allowed from state {from:?}")]
    InvalidTransition {
        transition: Transition,
        from: EngagementState,
    },

    /// Numeric configuration value out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),

    #[error("Parse Error: {0}")]
    ParseError(String),
}
