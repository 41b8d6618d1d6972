//! The handler contract implemented by every command.

use std::net::SocketAddr;

use thiserror::Error;
use tickrate_wire::WireMessage;

use crate::transport::SlotIndex;

/// Value produced by a successful command.
///
/// Strings are sent to the client as-is; any other value is serialised to
/// JSON text first.
pub type CommandOutput = serde_json::Value;

/// The connection a command was received on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Registry slot held by the connection.
    pub slot: SlotIndex,
    /// Remote address.
    pub peer: SocketAddr,
}

/// Failure reported by a [`CommandHandler`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFailure {
    /// The arguments were missing or malformed.
    #[error("{0}")]
    InvalidArguments(String),
    /// The command ran and failed.
    #[error("{0}")]
    Execution(String),
}

/// A named operation clients can invoke.
pub trait CommandHandler: Send + Sync {
    /// Runs the command for request `request_id` on `connection`.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandFailure`] whose text is sent back to the client.
    fn invoke(
        &self,
        args: &WireMessage,
        connection: &ConnectionInfo,
        request_id: &str,
    ) -> Result<CommandOutput, CommandFailure>;
}
