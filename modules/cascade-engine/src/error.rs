//! Typed errors for dispatch operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler table has no method for the action's derived name.
    #[error("handler {handler:?} has no method {method:?} for action {action_type:?}")]
    MissingMethod {
        handler: String,
        method: String,
        action_type: String,
    },

    /// `handle` processed the configured maximum number of actions.
    #[error("drain limit of {limit} actions reached with {pending} still pending")]
    DrainLimitExceeded { limit: usize, pending: usize },

    /// A resolver failed.
    #[error(transparent)]
    Resolver(#[from] anyhow::Error),
}

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
