//! Commands every server registers at construction.

use std::sync::Arc;

use serde::Serialize;
use tickrate_wire::{WireMessage, encode};
use tracing::info;

use crate::latch::Latch;
use crate::tick::{Task, TaskScheduler, TickHandle};
use crate::transport::ConnectionRegistry;

use super::DISPATCH_TARGET;
use super::command::{CommandFailure, CommandHandler, CommandOutput, ConnectionInfo};
use super::registry::CommandRegistry;

/// Replies `{"id":..,"type":"pong","data":{"tick":"<n>"}}`.
#[derive(Debug, Clone)]
pub struct Ping {
    tick: TickHandle,
}

impl Ping {
    /// Reports the tick count read from `tick`.
    #[must_use]
    pub fn new(tick: TickHandle) -> Self {
        Self { tick }
    }
}

impl CommandHandler for Ping {
    fn invoke(
        &self,
        _args: &WireMessage,
        _connection: &ConnectionInfo,
        request_id: &str,
    ) -> Result<CommandOutput, CommandFailure> {
        let data = WireMessage::new().with_text("tick", self.tick.snapshot().tick_count.to_string());
        let reply = WireMessage::new()
            .with_text("id", request_id)
            .with_text("type", "pong")
            .with_object("data", &data);
        Ok(CommandOutput::String(encode(&reply)))
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    target_rate: f64,
    current_rate: f64,
    average_rate: f64,
    tick_count: u64,
    pending: usize,
    scheduled: usize,
    active: usize,
    total_processed: u64,
    total_failed: u64,
    connections: usize,
    max_clients: usize,
}

/// Reports tick metrics, queue depths, and connection counts.
#[derive(Debug, Clone)]
pub struct GetServerStatus {
    tick: TickHandle,
    scheduler: Arc<TaskScheduler>,
    connections: ConnectionRegistry,
}

impl GetServerStatus {
    /// Reads from the given engine, scheduler, and slot registry.
    #[must_use]
    pub fn new(
        tick: TickHandle,
        scheduler: Arc<TaskScheduler>,
        connections: ConnectionRegistry,
    ) -> Self {
        Self {
            tick,
            scheduler,
            connections,
        }
    }
}

impl CommandHandler for GetServerStatus {
    fn invoke(
        &self,
        _args: &WireMessage,
        _connection: &ConnectionInfo,
        _request_id: &str,
    ) -> Result<CommandOutput, CommandFailure> {
        let snapshot = self.tick.snapshot();
        let stats = self.scheduler.stats();
        let report = StatusReport {
            target_rate: snapshot.target_rate,
            current_rate: snapshot.current_rate,
            average_rate: snapshot.average_rate,
            tick_count: snapshot.tick_count,
            pending: stats.pending,
            scheduled: stats.scheduled,
            active: stats.active,
            total_processed: stats.total_processed,
            total_failed: stats.total_failed,
            connections: self.connections.live(),
            max_clients: self.connections.capacity(),
        };
        serde_json::to_value(report).map_err(|error| CommandFailure::Execution(error.to_string()))
    }
}

/// Queues a task that logs a message on the tick thread.
///
/// Arguments: `name`, optional `message`, and optional `delay_ticks` as a
/// decimal string.
#[derive(Debug, Clone)]
pub struct AddTask {
    scheduler: Arc<TaskScheduler>,
}

impl AddTask {
    /// Admits tasks into `scheduler`.
    #[must_use]
    pub fn new(scheduler: Arc<TaskScheduler>) -> Self {
        Self { scheduler }
    }
}

impl CommandHandler for AddTask {
    fn invoke(
        &self,
        args: &WireMessage,
        connection: &ConnectionInfo,
        _request_id: &str,
    ) -> Result<CommandOutput, CommandFailure> {
        let name = args
            .text("name")
            .ok_or_else(|| CommandFailure::InvalidArguments(String::from("Missing 'name'")))?
            .to_owned();
        let message = args.text("message").unwrap_or_default().to_owned();
        let delay_ticks = match args.text("delay_ticks") {
            Some(text) => text.parse::<u64>().map_err(|_| {
                CommandFailure::InvalidArguments(format!("Invalid 'delay_ticks': {text}"))
            })?,
            None => 0,
        };

        let peer = connection.peer;
        let task_name = name.clone();
        let task = Task::new(name, move || {
            info!(
                target: DISPATCH_TARGET,
                task = %task_name,
                %peer,
                message = %message,
                "client task ran"
            );
        });
        let task_id = self.scheduler.schedule(task, delay_ticks);
        Ok(serde_json::json!({ "status": "queued", "task_id": task_id }))
    }
}

/// Requests a coordinated shutdown.
#[derive(Debug, Clone)]
pub struct StopServer {
    stop: Latch,
}

impl StopServer {
    /// Sets `stop` when invoked.
    #[must_use]
    pub fn new(stop: Latch) -> Self {
        Self { stop }
    }
}

impl CommandHandler for StopServer {
    fn invoke(
        &self,
        _args: &WireMessage,
        connection: &ConnectionInfo,
        request_id: &str,
    ) -> Result<CommandOutput, CommandFailure> {
        info!(
            target: DISPATCH_TARGET,
            peer = %connection.peer,
            id = request_id,
            "shutdown requested by client"
        );
        self.stop.set();
        Ok(serde_json::json!({ "status": "stopping" }))
    }
}

/// Registers `ping`, `get_server_status`, `add_task`, and `stop_server`.
pub fn register_builtins(
    registry: &mut CommandRegistry,
    tick: &TickHandle,
    scheduler: &Arc<TaskScheduler>,
    connections: &ConnectionRegistry,
    stop: &Latch,
) {
    registry.register("ping", Arc::new(Ping::new(tick.clone())));
    registry.register(
        "get_server_status",
        Arc::new(GetServerStatus::new(
            tick.clone(),
            Arc::clone(scheduler),
            connections.clone(),
        )),
    );
    registry.register("add_task", Arc::new(AddTask::new(Arc::clone(scheduler))));
    registry.register("stop_server", Arc::new(StopServer::new(stop.clone())));
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use super::*;
    use crate::tick::TickEngine;

    struct Fixture {
        engine: TickEngine,
        scheduler: Arc<TaskScheduler>,
        connections: ConnectionRegistry,
        stop: Latch,
        registry: CommandRegistry,
        connection: ConnectionInfo,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let scheduler = Arc::new(TaskScheduler::new());
        let engine = TickEngine::new(200.0, Arc::clone(&scheduler)).expect("engine");
        let connections = ConnectionRegistry::new(4);
        let stop = Latch::new();
        let mut registry = CommandRegistry::new();
        register_builtins(
            &mut registry,
            &engine.handle(),
            &scheduler,
            &connections,
            &stop,
        );
        let peer = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 50002));
        let slot = connections.allocate(peer).expect("slot");
        let connection = ConnectionInfo {
            slot: slot.index(),
            peer,
        };
        drop(slot);
        Fixture {
            engine,
            scheduler,
            connections,
            stop,
            registry,
            connection,
        }
    }

    fn dispatch(fixture: &Fixture, name: &str, args: &str) -> String {
        fixture
            .registry
            .dispatch(name, args, &fixture.connection, "r1")
            .expect("dispatch")
    }

    #[rstest]
    fn registers_all_builtins(fixture: Fixture) {
        assert_eq!(
            fixture.registry.names(),
            vec!["add_task", "get_server_status", "ping", "stop_server"]
        );
    }

    #[rstest]
    fn ping_reports_current_tick(mut fixture: Fixture) {
        assert_eq!(
            dispatch(&fixture, "ping", "{}"),
            r#"{"id":"r1","type":"pong","data":{"tick":"0"}}"#
        );
        fixture.engine.tick();
        fixture.engine.tick();
        assert_eq!(
            dispatch(&fixture, "ping", "{}"),
            r#"{"id":"r1","type":"pong","data":{"tick":"2"}}"#
        );
    }

    #[rstest]
    fn add_task_admits_and_reports_the_id(mut fixture: Fixture) {
        let reply: Value =
            serde_json::from_str(&dispatch(&fixture, "add_task", r#"{"name":"greet"}"#))
                .expect("json reply");
        assert_eq!(reply["status"], "queued");
        assert!(reply["task_id"].is_u64());
        assert_eq!(fixture.scheduler.stats().pending, 1);

        fixture.engine.tick();
        assert_eq!(fixture.scheduler.stats().total_processed, 1);
    }

    #[rstest]
    fn add_task_with_delay_waits_in_scheduled(fixture: Fixture) {
        dispatch(
            &fixture,
            "add_task",
            r#"{"name":"later","message":"hi","delay_ticks":"5"}"#,
        );
        let stats = fixture.scheduler.stats();
        assert_eq!((stats.pending, stats.scheduled), (0, 1));
    }

    #[rstest]
    #[case(r#"{}"#, "Missing 'name'")]
    #[case(r#"{"name":"x","delay_ticks":"soon"}"#, "Invalid 'delay_ticks': soon")]
    fn add_task_rejects_bad_arguments(
        fixture: Fixture,
        #[case] args: &str,
        #[case] expected: &str,
    ) {
        let error = fixture
            .registry
            .dispatch("add_task", args, &fixture.connection, "r1")
            .expect_err("invalid args");
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn status_reports_queues_and_connections(fixture: Fixture) {
        let _held = fixture
            .connections
            .allocate(fixture.connection.peer)
            .expect("slot");
        fixture.scheduler.admit(Task::new("queued", || {}));

        let reply: Value = serde_json::from_str(&dispatch(&fixture, "get_server_status", "{}"))
            .expect("json reply");
        assert_eq!(reply["target_rate"], json!(200.0));
        assert_eq!(reply["pending"], json!(1));
        assert_eq!(reply["connections"], json!(1));
        assert_eq!(reply["max_clients"], json!(4));
    }

    #[rstest]
    fn stop_server_sets_the_stop_latch(fixture: Fixture) {
        assert!(!fixture.stop.is_set());
        assert_eq!(
            dispatch(&fixture, "stop_server", "{}"),
            r#"{"status":"stopping"}"#
        );
        assert!(fixture.stop.is_set());
    }
}
