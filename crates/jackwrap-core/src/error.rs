//! Error types for jackwrap-core.

use thiserror::Error;

/// Startup configuration errors.
///
/// Nothing on the audio thread returns these; per-cycle overflow is a silent
/// drop reported through `bool` return values instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Plugin declares no ports")]
    NoPorts,

    #[error("Plugin declares {count} event input ports, at most one is supported")]
    TooManyEventInputs { count: usize },

    #[error("Plugin declares {count} event output ports, at most one is supported")]
    TooManyEventOutputs { count: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
