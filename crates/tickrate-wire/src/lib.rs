//! Wire-level building blocks shared by the tickrate daemon and its clients.
//!
//! Every message exchanged with the daemon is UTF-8 text terminated by a
//! single [`DELIMITER`] byte. The text itself is a flat JSON object whose
//! values are strings, `null`, or nested objects carried as opaque source
//! text. This crate provides:
//!
//! - [`WireMessage`], together with [`decode`] and [`encode`], a minimal codec
//!   for that object subset with no dependency on a general JSON library;
//! - [`FrameReader`], which accumulates socket reads in a [`MessageBuffer`]
//!   and splits them into complete frames;
//! - the [`envelope`] helpers that validate `{id, type, data}` request
//!   envelopes and build heartbeat and error replies.

mod codec;
pub mod envelope;
mod frame;

pub use self::codec::{DecodeError, WireMessage, WireValue, decode, encode};
pub use self::envelope::{CommandCall, Envelope, EnvelopeError};
pub use self::frame::{DELIMITER, FrameReader, MessageBuffer, frame};
