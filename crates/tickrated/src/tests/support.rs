//! Shared helpers for the behavioural suites.

mod client;
mod loaders;
mod reporter;
mod server_world;

pub(crate) use self::client::TestClient;
pub(crate) use self::loaders::{FailingConfigLoader, test_config};
pub(crate) use self::reporter::{HealthEvent, RecordingHealthReporter};
pub(crate) use self::server_world::ServerWorld;
