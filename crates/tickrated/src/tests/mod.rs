//! Test suites for the tick server.

mod heartbeat_behaviour;
mod support;
