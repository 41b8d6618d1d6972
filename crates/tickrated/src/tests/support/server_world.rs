//! Scenario world owning a running server and its clients.

use std::thread;
use std::time::{Duration, Instant};

use tickrate_config::Config;

use crate::server::{RunningServer, Server};

use super::client::TestClient;
use super::loaders::test_config;

/// Server plus the clients a scenario has opened.
pub(crate) struct ServerWorld {
    config: Config,
    server: Option<RunningServer>,
    clients: Vec<TestClient>,
}

impl ServerWorld {
    pub(crate) fn new() -> Self {
        Self {
            config: test_config(),
            server: None,
            clients: Vec::new(),
        }
    }

    pub(crate) fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub(crate) fn start(&mut self) {
        self.config.validate().expect("scenario configuration is valid");
        let server = Server::new(self.config.clone()).expect("build server");
        self.server = Some(server.start().expect("start server"));
    }

    pub(crate) fn server(&self) -> &RunningServer {
        self.server.as_ref().expect("server should be running")
    }

    pub(crate) fn connect(&mut self) {
        let client = TestClient::connect(self.server().local_addr());
        self.clients.push(client);
    }

    /// The most recently opened client.
    pub(crate) fn last_client(&mut self) -> &mut TestClient {
        self.clients.last_mut().expect("a client should be connected")
    }

    pub(crate) fn disconnect_last(&mut self) {
        drop(self.clients.pop());
    }

    /// Waits up to two seconds for the live slot count to reach `expected`.
    pub(crate) fn wait_for_live(&self, expected: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let live = self.server().connections().live();
            if live == expected || Instant::now() >= deadline {
                return live;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for ServerWorld {
    fn drop(&mut self) {
        self.clients.clear();
        if let Some(server) = self.server.take() {
            let _ = server.shutdown();
        }
    }
}
