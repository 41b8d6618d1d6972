//! Request and reply envelopes.
//!
//! Clients send `{"id":..., "type":"command", "data":...}` where `data` holds
//! the serialised text of `{"data":{"name":..., "args":{...}}}`. The daemon
//! answers with either the command's own text or an error envelope, and probes
//! liveness with heartbeat messages.

use thiserror::Error;

use crate::codec::{DecodeError, WireMessage, decode, encode};

/// `type` of request envelopes that invoke a command.
pub const COMMAND_TYPE: &str = "command";
/// `type` of server heartbeats.
pub const HEARTBEAT_TYPE: &str = "heartbeat";
/// `type` clients use to acknowledge a heartbeat.
pub const HEARTBEAT_ACK_TYPE: &str = "heartbeat_response";
/// `type` of error replies.
pub const ERROR_TYPE: &str = "error";
/// `id` carried by server heartbeats.
pub const SERVER_HEARTBEAT_ID: &str = "server-hb";

const HEARTBEAT_ACK_MARKER: &str = "\"type\":\"heartbeat_response\"";

/// Client-facing validation failures.
///
/// The display text of each variant is exactly the message placed in the
/// error envelope returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The outer message did not decode.
    #[error("Invalid JSON message")]
    InvalidJson(#[source] DecodeError),
    /// `type` or `id` is absent or not a string.
    #[error("Missing 'type' or 'id'")]
    MissingTypeOrId,
    /// A command envelope has no `data` field.
    #[error("Missing 'data'")]
    MissingData,
    /// The `data` text did not decode.
    #[error("Invalid inner JSON")]
    InvalidInnerJson(#[source] DecodeError),
    /// The inner envelope has no nested `data` object.
    #[error("Missing 'data' object")]
    MissingDataObject,
    /// The command has no string `name`.
    #[error("Missing 'name'")]
    MissingName,
    /// The command has no `args` object.
    #[error("Missing 'args'")]
    MissingArgs,
}

/// A decoded request envelope with its required fields validated.
#[derive(Debug, Clone)]
pub struct Envelope {
    id: String,
    kind: String,
    message: WireMessage,
}

/// A command invocation extracted from a `command` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCall {
    /// Registered command name.
    pub name: String,
    /// Decoded argument object.
    pub args: WireMessage,
}

impl Envelope {
    /// Decodes `raw` and checks that `type` and `id` are present.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidJson`] when `raw` does not decode and
    /// [`EnvelopeError::MissingTypeOrId`] when either field is missing.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let message = decode(raw).map_err(EnvelopeError::InvalidJson)?;
        let (Some(kind), Some(id)) = (message.text("type"), message.text("id")) else {
            return Err(EnvelopeError::MissingTypeOrId);
        };
        Ok(Self {
            id: id.to_owned(),
            kind: kind.to_owned(),
            message,
        })
    }

    /// Request identifier echoed in replies.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Envelope `type`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns `true` for `command` envelopes.
    #[must_use]
    pub fn is_command(&self) -> bool {
        self.kind == COMMAND_TYPE
    }

    /// Extracts the command name and arguments from the `data` field.
    ///
    /// # Errors
    ///
    /// Returns the [`EnvelopeError`] matching the first missing or malformed
    /// field.
    pub fn command(&self) -> Result<CommandCall, EnvelopeError> {
        let data = self
            .message
            .get("data")
            .and_then(|value| value.as_source())
            .ok_or(EnvelopeError::MissingData)?;
        let inner = decode(data).map_err(EnvelopeError::InvalidInnerJson)?;
        let body = inner
            .object("data")
            .ok_or(EnvelopeError::MissingDataObject)?;
        let name = body.text("name").ok_or(EnvelopeError::MissingName)?;
        let args = body.object("args").ok_or(EnvelopeError::MissingArgs)?;
        Ok(CommandCall {
            name: name.to_owned(),
            args,
        })
    }
}

/// Returns `true` when `raw` acknowledges a heartbeat.
///
/// Any message containing `"type":"heartbeat_response"` counts, whether or
/// not it is otherwise well formed.
#[must_use]
pub fn is_heartbeat_ack(raw: &str) -> bool {
    raw.contains(HEARTBEAT_ACK_MARKER)
}

/// Returns `true` when `raw` is nothing but a heartbeat acknowledgement.
///
/// A frame that mentions the acknowledgement marker yet decodes to some other
/// top-level `type`, such as a command whose inline arguments happen to carry
/// it, still needs processing. Frames that do not decode count as bare
/// acknowledgements so they never provoke an error reply.
#[must_use]
pub fn is_bare_heartbeat_ack(raw: &str) -> bool {
    is_heartbeat_ack(raw)
        && decode(raw).map_or(true, |message| {
            message.text("type") == Some(HEARTBEAT_ACK_TYPE)
        })
}

/// Builds the server heartbeat `{"type":"heartbeat","id":"server-hb"}`.
#[must_use]
pub fn heartbeat() -> String {
    encode(
        &WireMessage::new()
            .with_text("type", HEARTBEAT_TYPE)
            .with_text("id", SERVER_HEARTBEAT_ID),
    )
}

/// Builds `{"id":..,"type":"error","data":{"message":..}}`.
///
/// The `id` field is omitted when the request id is unknown.
#[must_use]
pub fn error(id: Option<&str>, message: &str) -> String {
    let mut envelope = WireMessage::new();
    if let Some(id) = id {
        envelope = envelope.with_text("id", id);
    }
    let data = WireMessage::new().with_text("message", message);
    encode(&envelope.with_text("type", ERROR_TYPE).with_object("data", &data))
}

/// Builds the serialised request envelope a client sends to run `name`.
#[must_use]
pub fn command_request(id: &str, name: &str, args: &WireMessage) -> String {
    let body = WireMessage::new()
        .with_text("name", name)
        .with_object("args", args);
    let inner = WireMessage::new().with_object("data", &body);
    encode(
        &WireMessage::new()
            .with_text("id", id)
            .with_text("type", COMMAND_TYPE)
            .with_text("data", encode(&inner)),
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const PING: &str = r#"{"id":"1","type":"command","data":"{\"data\":{\"name\":\"ping\",\"args\":{}}}"}"#;

    #[rstest]
    fn parses_command_envelope() {
        let envelope = Envelope::parse(PING).expect("parse");
        assert_eq!(envelope.id(), "1");
        assert!(envelope.is_command());
        let call = envelope.command().expect("command");
        assert_eq!(call.name, "ping");
        assert!(call.args.is_empty());
    }

    #[rstest]
    fn accepts_inline_data_object() {
        let raw = r#"{"id":"2","type":"command","data":{"data":{"name":"status","args":{"v":"1"}}}}"#;
        let call = Envelope::parse(raw)
            .and_then(|envelope| envelope.command())
            .expect("command");
        assert_eq!(call.name, "status");
        assert_eq!(call.args.text("v"), Some("1"));
    }

    #[rstest]
    fn command_request_builds_what_parse_accepts() {
        let args = WireMessage::new().with_text("message", "hi \"there\"");
        let raw = command_request("9", "add_task", &args);
        let call = Envelope::parse(&raw)
            .and_then(|envelope| envelope.command())
            .expect("command");
        assert_eq!(call.name, "add_task");
        assert_eq!(call.args.text("message"), Some("hi \"there\""));
    }

    #[rstest]
    #[case("not json", "Invalid JSON message")]
    #[case(r#"{"type":"command"}"#, "Missing 'type' or 'id'")]
    #[case(r#"{"id":"1"}"#, "Missing 'type' or 'id'")]
    #[case(r#"{"id":null,"type":"command"}"#, "Missing 'type' or 'id'")]
    fn parse_failures_carry_client_messages(#[case] raw: &str, #[case] expected: &str) {
        let error = Envelope::parse(raw).expect_err("parse should fail");
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case(r#"{"id":"1","type":"command"}"#, EnvelopeError::MissingData)]
    #[case(r#"{"id":"1","type":"command","data":"{\"data\":{\"args\":{}}}"}"#, EnvelopeError::MissingName)]
    #[case(r#"{"id":"1","type":"command","data":"{\"data\":{\"name\":\"x\"}}"}"#, EnvelopeError::MissingArgs)]
    #[case(r#"{"id":"1","type":"command","data":"{\"other\":{}}"}"#, EnvelopeError::MissingDataObject)]
    #[case(r#"{"id":"1","type":"command","data":"{\"data\":{\"name\":\"x\",\"args\":\"text\"}}"}"#, EnvelopeError::MissingArgs)]
    fn command_failures_identify_missing_field(#[case] raw: &str, #[case] expected: EnvelopeError) {
        let envelope = Envelope::parse(raw).expect("parse");
        assert_eq!(envelope.command(), Err(expected));
    }

    #[rstest]
    fn undecodable_inner_data_is_reported() {
        let envelope =
            Envelope::parse(r#"{"id":"1","type":"command","data":"oops"}"#).expect("parse");
        assert!(matches!(
            envelope.command(),
            Err(EnvelopeError::InvalidInnerJson(DecodeError::NotAnObject))
        ));
    }

    #[rstest]
    fn heartbeat_matches_wire_format() {
        assert_eq!(heartbeat(), r#"{"type":"heartbeat","id":"server-hb"}"#);
    }

    #[rstest]
    #[case(r#"{"type":"heartbeat_response"}"#, true)]
    #[case(r#"{"id":"x","type":"heartbeat_response","data":"{}"}"#, true)]
    #[case(r#"{"type":"heartbeat"}"#, false)]
    fn detects_heartbeat_acknowledgements(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(is_heartbeat_ack(raw), expected);
    }

    #[rstest]
    #[case(r#"{"type":"heartbeat_response"}"#, true)]
    #[case(r#"{"type":"heartbeat_response""#, true)]
    #[case(
        r#"{"id":"1","type":"command","data":{"data":{"name":"ping","args":{"type":"heartbeat_response"}}}}"#,
        false
    )]
    #[case(r#"{"id":"1","type":"command"}"#, false)]
    fn bare_acknowledgements_exclude_commands_quoting_the_marker(
        #[case] raw: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_bare_heartbeat_ack(raw), expected);
    }

    #[rstest]
    fn error_envelope_includes_known_id() {
        assert_eq!(
            error(Some("1"), "Command 'ping' not found"),
            r#"{"id":"1","type":"error","data":{"message":"Command 'ping' not found"}}"#
        );
    }

    #[rstest]
    fn error_envelope_omits_unknown_id() {
        assert_eq!(
            error(None, "Invalid JSON message"),
            r#"{"type":"error","data":{"message":"Invalid JSON message"}}"#
        );
    }
}
