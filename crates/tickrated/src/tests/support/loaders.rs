//! Configuration fixtures for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;
use tickrate_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loopback configuration with an ephemeral port and a fast poll.
pub(crate) fn test_config() -> Config {
    Config {
        listen_host: String::from("127.0.0.1"),
        listen_port: 0,
        tick_rate_hz: 100.0,
        poll_interval_ms: 50,
        ..Config::default()
    }
}

/// Loader that intentionally fails by passing an invalid flag value.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("tickrated"),
            OsString::from("--listen-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
