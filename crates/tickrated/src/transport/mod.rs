//! TCP transport: accepting connections, tracking their slots, and serving
//! them on a fixed pool of workers.

mod errors;
mod handler;
mod listener;
mod pool;
mod registry;
#[cfg(test)]
mod test_utils;
mod writer;

pub use self::errors::{ListenerError, PoolError, RegistryError};
pub use self::handler::{Connection, ConnectionHandler, Disconnect, HeartbeatPolicy};
pub use self::listener::{ConnectionSink, Listener, ListenerHandle, StreamOptions};
pub use self::pool::DispatchQueue;
pub use self::registry::{ConnectionRegistry, SlotHandle, SlotIndex, SlotRecord};
pub(crate) use self::writer::FrameWriter;

#[cfg(test)]
pub(crate) use self::test_utils::CountingSink;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
