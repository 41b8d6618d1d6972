//! Request frame validation and routing.

use tickrate_wire::envelope::{self, Envelope, EnvelopeError};
use tickrate_wire::encode;
use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::command::ConnectionInfo;
use super::registry::CommandRegistry;

/// Turns request frames into reply frames.
#[derive(Debug)]
pub struct CommandProcessor {
    commands: CommandRegistry,
}

impl CommandProcessor {
    /// Routes commands through `commands`.
    #[must_use]
    pub fn new(commands: CommandRegistry) -> Self {
        Self { commands }
    }

    /// Registered commands.
    #[must_use]
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Processes one frame and returns the reply to send, if any.
    ///
    /// Malformed envelopes and failed commands produce an error envelope.
    /// Envelopes whose `type` is not `command` produce no reply.
    #[must_use]
    pub fn process(&self, raw: &str, connection: &ConnectionInfo) -> Option<String> {
        let request = match Envelope::parse(raw) {
            Ok(request) => request,
            Err(error) => return Some(reject(None, &error, connection)),
        };
        if !request.is_command() {
            debug!(
                target: DISPATCH_TARGET,
                peer = %connection.peer,
                kind = request.kind(),
                "ignoring non-command message"
            );
            return None;
        }
        let call = match request.command() {
            Ok(call) => call,
            Err(error) => return Some(reject(Some(request.id()), &error, connection)),
        };

        debug!(
            target: DISPATCH_TARGET,
            peer = %connection.peer,
            id = request.id(),
            command = %call.name,
            "dispatching command"
        );
        let args = encode(&call.args);
        match self
            .commands
            .dispatch(&call.name, &args, connection, request.id())
        {
            Ok(reply) => Some(reply),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    peer = %connection.peer,
                    id = request.id(),
                    command = %call.name,
                    %error,
                    "command failed"
                );
                Some(envelope::error(Some(request.id()), &error.to_string()))
            }
        }
    }
}

fn reject(id: Option<&str>, error: &EnvelopeError, connection: &ConnectionInfo) -> String {
    warn!(
        target: DISPATCH_TARGET,
        peer = %connection.peer,
        id,
        %error,
        "rejecting malformed request"
    );
    envelope::error(id, &error.to_string())
}
