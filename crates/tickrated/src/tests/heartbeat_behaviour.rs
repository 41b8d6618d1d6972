//! Behavioural tests for heartbeat delivery and liveness timeouts.

use std::cell::RefCell;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::ServerWorld;

#[fixture]
fn world() -> RefCell<ServerWorld> {
    RefCell::new(ServerWorld::new())
}

#[given("a running server with a {interval} second heartbeat and a {timeout} second timeout")]
fn given_server_with_heartbeat(world: &RefCell<ServerWorld>, interval: u64, timeout: u64) {
    let mut world = world.borrow_mut();
    let config = world.config_mut();
    config.heartbeat_interval_secs = interval;
    config.heartbeat_timeout_secs = timeout;
    world.start();
}

#[when("the client acknowledges heartbeats for {seconds} seconds")]
fn when_client_acknowledges(world: &RefCell<ServerWorld>, seconds: u64) {
    world
        .borrow_mut()
        .last_client()
        .keep_alive_for(Duration::from_secs(seconds));
}

#[then("the client receives a heartbeat within {seconds} seconds")]
fn then_client_receives_heartbeat(world: &RefCell<ServerWorld>, seconds: u64) {
    assert!(
        world
            .borrow_mut()
            .last_client()
            .await_heartbeat(Duration::from_secs(seconds)),
        "no heartbeat arrived"
    );
}

#[then("the connection is closed within {seconds} seconds")]
fn then_connection_closed(world: &RefCell<ServerWorld>, seconds: u64) {
    assert!(
        world
            .borrow_mut()
            .last_client()
            .wait_closed(Duration::from_secs(seconds)),
        "server kept a silent client"
    );
}

#[then("the connection is still open")]
fn then_connection_open(world: &RefCell<ServerWorld>) {
    let mut world = world.borrow_mut();
    let client = world.last_client();
    assert!(!client.is_closed(), "server dropped an acknowledging client");
    client.send_command("alive", "ping");
    let reply = client
        .next_reply(Duration::from_secs(2))
        .expect("ping reply after keep-alive");
    assert!(reply.contains("pong"), "unexpected reply: {reply}");
}

#[scenario(
    path = "tests/features/heartbeat.feature",
    name = "Server sends heartbeats to idle clients"
)]
fn idle_clients_receive_heartbeats(world: RefCell<ServerWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/heartbeat.feature",
    name = "Silent clients are disconnected"
)]
fn silent_clients_disconnected(world: RefCell<ServerWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/heartbeat.feature",
    name = "Acknowledging clients stay connected"
)]
fn acknowledging_clients_stay(world: RefCell<ServerWorld>) {
    drop(world);
}
