//! Name-indexed command table.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tickrate_wire::decode;
use tracing::{debug, warn};

use crate::tick::panic_message;

use super::DISPATCH_TARGET;
use super::command::{CommandFailure, CommandHandler, ConnectionInfo};
use super::errors::DispatchError;

const INVALID_ARGS: &str = "Invalid args format";

/// Maps command names to their handlers.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, returning any handler it replaces.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.insert(name.into(), handler)
    }

    /// Returns `true` when `name` has a handler.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the command `name` with the serialised `args_text`.
    ///
    /// String outputs are returned unchanged; other values are serialised to
    /// JSON text. A panicking handler is reported as an execution failure.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] whose display text is the client-facing
    /// message.
    pub fn dispatch(
        &self,
        name: &str,
        args_text: &str,
        connection: &ConnectionInfo,
        request_id: &str,
    ) -> Result<String, DispatchError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| DispatchError::UnknownCommand {
                name: name.to_owned(),
            })?;
        let args = decode(args_text).map_err(|error| {
            debug!(
                target: DISPATCH_TARGET,
                command = name,
                %error,
                "argument decode failed"
            );
            DispatchError::InvalidArguments {
                message: String::from(INVALID_ARGS),
            }
        })?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.invoke(&args, connection, request_id)
        }))
        .map_err(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(
                target: DISPATCH_TARGET,
                command = name,
                panic = %message,
                "command handler panicked"
            );
            DispatchError::Execution { message }
        })?;

        match outcome {
            Ok(serde_json::Value::String(text)) => Ok(text),
            Ok(value) => {
                serde_json::to_string(&value).map_err(|source| DispatchError::Encoding { source })
            }
            Err(CommandFailure::InvalidArguments(message)) => {
                Err(DispatchError::InvalidArguments { message })
            }
            Err(CommandFailure::Execution(message)) => Err(DispatchError::Execution { message }),
        }
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

    use mockall::mock;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use tickrate_wire::WireMessage;

    use super::*;
    use crate::dispatch::CommandOutput;
    use crate::transport::ConnectionRegistry;

    mock! {
        Handler {}
        impl CommandHandler for Handler {
            fn invoke(
                &self,
                args: &WireMessage,
                connection: &ConnectionInfo,
                request_id: &str,
            ) -> Result<CommandOutput, CommandFailure>;
        }
    }

    #[fixture]
    fn connection() -> ConnectionInfo {
        let peer = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 50000));
        let slots = ConnectionRegistry::new(1);
        let slot = slots.allocate(peer).expect("slot");
        ConnectionInfo {
            slot: slot.index(),
            peer,
        }
    }

    fn registry_with(name: &str, handler: MockHandler) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(name, Arc::new(handler));
        registry
    }

    #[rstest]
    fn unknown_command_names_the_command(connection: ConnectionInfo) {
        let error = CommandRegistry::new()
            .dispatch("ping", "{}", &connection, "1")
            .expect_err("not registered");
        assert_eq!(error.to_string(), "Command 'ping' not found");
    }

    #[rstest]
    fn handler_receives_decoded_args_and_request_id(connection: ConnectionInfo) {
        let mut handler = MockHandler::new();
        handler
            .expect_invoke()
            .withf(|args, _connection, request_id| {
                args.text("who") == Some("world") && request_id == "42"
            })
            .once()
            .returning(|_, _, _| Ok(CommandOutput::String(String::from("hello"))));
        let registry = registry_with("greet", handler);

        let reply = registry
            .dispatch("greet", r#"{"who":"world"}"#, &connection, "42")
            .expect("dispatch");
        assert_eq!(reply, "hello");
    }

    #[rstest]
    fn non_string_output_is_serialised(connection: ConnectionInfo) {
        let mut handler = MockHandler::new();
        handler
            .expect_invoke()
            .returning(|_, _, _| Ok(json!({"ok": true})));
        let registry = registry_with("status", handler);

        let reply = registry
            .dispatch("status", "{}", &connection, "1")
            .expect("dispatch");
        assert_eq!(reply, r#"{"ok":true}"#);
    }

    #[rstest]
    fn undecodable_args_skip_the_handler(connection: ConnectionInfo) {
        let mut handler = MockHandler::new();
        handler.expect_invoke().never();
        let registry = registry_with("greet", handler);

        let error = registry
            .dispatch("greet", "not json", &connection, "1")
            .expect_err("bad args");
        assert_eq!(error.to_string(), "Invalid args format");
    }

    #[rstest]
    #[case(CommandFailure::InvalidArguments(String::from("Missing 'name'")), "Missing 'name'")]
    #[case(CommandFailure::Execution(String::from("boom")), "boom")]
    fn handler_failures_carry_their_message(
        connection: ConnectionInfo,
        #[case] failure: CommandFailure,
        #[case] expected: &str,
    ) {
        let mut handler = MockHandler::new();
        handler
            .expect_invoke()
            .return_once(move |_, _, _| Err(failure));
        let registry = registry_with("fail", handler);

        let error = registry
            .dispatch("fail", "{}", &connection, "1")
            .expect_err("handler failure");
        assert_eq!(error.to_string(), expected);
    }

    struct Exploding;

    impl CommandHandler for Exploding {
        fn invoke(
            &self,
            _args: &WireMessage,
            _connection: &ConnectionInfo,
            _request_id: &str,
        ) -> Result<CommandOutput, CommandFailure> {
            panic!("handler exploded");
        }
    }

    #[rstest]
    fn panicking_handler_becomes_execution_error(connection: ConnectionInfo) {
        let mut registry = CommandRegistry::new();
        registry.register("explode", Arc::new(Exploding));

        let error = registry
            .dispatch("explode", "{}", &connection, "1")
            .expect_err("panic");
        assert!(matches!(error, DispatchError::Execution { .. }));
        assert!(error.to_string().contains("handler exploded"));
    }

    #[rstest]
    fn registering_twice_replaces_the_handler(connection: ConnectionInfo) {
        let mut first = MockHandler::new();
        first.expect_invoke().never();
        let mut second = MockHandler::new();
        second
            .expect_invoke()
            .returning(|_, _, _| Ok(CommandOutput::String(String::from("second"))));

        let mut registry = CommandRegistry::new();
        assert!(registry.register("cmd", Arc::new(first)).is_none());
        assert!(registry.register("cmd", Arc::new(second)).is_some());
        assert_eq!(registry.names(), vec!["cmd"]);
        assert_eq!(
            registry
                .dispatch("cmd", "{}", &connection, "1")
                .expect("dispatch"),
            "second"
        );
    }
}
