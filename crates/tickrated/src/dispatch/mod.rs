//! Command processing for decoded request frames.
//!
//! A request frame is validated by [`CommandProcessor`], which extracts the
//! command name and arguments and hands them to the [`CommandRegistry`]. The
//! registry looks the name up, runs the matching [`CommandHandler`], and turns
//! its output into the reply text. Every failure along the way becomes an error
//! envelope sent back on the same connection, which stays open.
//!
//! ## Protocol
//!
//! ```json
//! {"id":"1","type":"command","data":"{\"data\":{\"name\":\"ping\",\"args\":{}}}"}
//! ```
//!
//! Successful commands reply with the handler's text verbatim. Failures reply
//! with:
//!
//! ```json
//! {"id":"1","type":"error","data":{"message":"Command 'ping' not found"}}
//! ```

mod builtin;
mod command;
mod errors;
mod processor;
mod registry;

pub use self::builtin::{AddTask, GetServerStatus, Ping, StopServer, register_builtins};
pub use self::command::{CommandFailure, CommandHandler, CommandOutput, ConnectionInfo};
pub use self::errors::DispatchError;
pub use self::processor::CommandProcessor;
pub use self::registry::CommandRegistry;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
