//! Error types for command dispatch.
//!
//! The display text of each variant is the message returned to the client.

use thiserror::Error;

/// Failures reported by [`CommandRegistry::dispatch`](super::CommandRegistry::dispatch).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered under the requested name.
    #[error("Command '{name}' not found")]
    UnknownCommand {
        /// Requested command name.
        name: String,
    },
    /// The arguments did not decode or were rejected by the handler.
    #[error("{message}")]
    InvalidArguments {
        /// Client-facing description.
        message: String,
    },
    /// The handler reported a failure or panicked.
    #[error("{message}")]
    Execution {
        /// Client-facing description.
        message: String,
    },
    /// A non-string result could not be serialised.
    #[error("Failed to encode result")]
    Encoding {
        /// Serialiser error.
        #[source]
        source: serde_json::Error,
    },
}
