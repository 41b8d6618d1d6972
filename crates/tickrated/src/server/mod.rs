//! Server context tying the tick engine, worker pool, and listener together.
//!
//! [`Server::new`] builds every component from a validated [`Config`] and
//! registers the built-in commands. [`Server::start`] brings the threads up
//! in order: the listening socket is bound first so a port conflict fails
//! before any thread exists, the tick thread is started and confirmed through
//! a readiness latch, and only then do the workers and the accept loop begin.

mod admission;
mod errors;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tickrate_config::Config;
use tracing::info;

use crate::dispatch::{CommandHandler, CommandProcessor, CommandRegistry, register_builtins};
use crate::latch::Latch;
use crate::tick::{TaskScheduler, TickEngine, TickError, TickHandle, TickThread};
use crate::transport::{
    Connection, ConnectionHandler, ConnectionRegistry, DispatchQueue, HeartbeatPolicy, Listener,
    ListenerHandle, StreamOptions, TRANSPORT_TARGET,
};

use self::admission::Admission;
pub use self::errors::ServerError;

const TICK_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// A configured server that has not started any threads.
#[derive(Debug)]
pub struct Server {
    config: Config,
    scheduler: Arc<TaskScheduler>,
    engine: TickEngine,
    connections: ConnectionRegistry,
    commands: CommandRegistry,
    stop: Latch,
}

impl Server {
    /// Builds the server components described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Tick`] when the tick rate is unusable.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let scheduler = Arc::new(TaskScheduler::new());
        let engine = TickEngine::new(config.tick_rate_hz, Arc::clone(&scheduler))?
            .with_monitor_interval(config.monitor_interval_ticks);
        let connections = ConnectionRegistry::new(config.limits().max_clients);
        let stop = Latch::new();
        let mut commands = CommandRegistry::new();
        register_builtins(
            &mut commands,
            &engine.handle(),
            &scheduler,
            &connections,
            &stop,
        );
        Ok(Self {
            config,
            scheduler,
            engine,
            connections,
            commands,
            stop,
        })
    }

    /// Registers an extra command, replacing any handler with the same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Option<Arc<dyn CommandHandler>> {
        self.commands.register(name, handler)
    }

    /// Task queue drained by the tick thread.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// Latch set when a client asks the server to stop.
    #[must_use]
    pub fn stop_latch(&self) -> Latch {
        self.stop.clone()
    }

    /// Starts the tick thread, workers, and accept loop.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] when binding, spawning, or the tick thread's
    /// readiness confirmation fails. Threads already started are stopped
    /// before returning.
    pub fn start(self) -> Result<RunningServer, ServerError> {
        let Self {
            config,
            scheduler,
            engine,
            connections,
            commands,
            stop,
        } = self;
        let limits = config.limits();
        let (host, port) = config.listen_addr();
        let listener = Listener::bind(host, port, config.backlog)?;
        let addr = listener.local_addr();

        let ready = Latch::new();
        let tick = engine.start(ready.clone())?;
        if !ready.wait_timeout(TICK_READY_TIMEOUT) {
            stop_tick(tick);
            return Err(TickError::NotReady {
                timeout_ms: TICK_READY_TIMEOUT.as_millis(),
            }
            .into());
        }

        let running = Arc::new(AtomicBool::new(true));
        let handler = ConnectionHandler::new(
            Arc::new(CommandProcessor::new(commands)),
            Arc::clone(&running),
            HeartbeatPolicy {
                interval: config.heartbeat_interval(),
                timeout: config.heartbeat_timeout(),
            },
        );
        let pool = match DispatchQueue::start(
            limits.worker_count,
            limits.queue_capacity,
            move |connection: Connection| {
                handler.serve(connection);
            },
        ) {
            Ok(pool) => Arc::new(pool),
            Err(error) => {
                stop_tick(tick);
                return Err(error.into());
            }
        };

        let options = StreamOptions {
            read_timeout: config.poll_interval(),
            write_timeout: config.poll_interval(),
        };
        let sink = Arc::new(Admission::new(connections.clone(), Arc::clone(&pool)));
        let listener = match listener.start(options, sink) {
            Ok(listener) => listener,
            Err(error) => {
                running.store(false, Ordering::SeqCst);
                drop(pool.shutdown());
                stop_tick(tick);
                return Err(error.into());
            }
        };

        info!(
            target: TRANSPORT_TARGET,
            %addr,
            max_clients = limits.max_clients,
            workers = limits.worker_count,
            queue_capacity = limits.queue_capacity,
            "server started"
        );
        Ok(RunningServer {
            addr,
            tick,
            listener,
            pool,
            running,
            stop,
            scheduler,
            connections,
        })
    }
}

fn stop_tick(tick: TickThread) {
    tick.stop();
    drop(tick.join());
}

/// Handles to the threads of a started server.
#[derive(Debug)]
pub struct RunningServer {
    addr: SocketAddr,
    tick: TickThread,
    listener: ListenerHandle,
    pool: Arc<DispatchQueue<Connection>>,
    running: Arc<AtomicBool>,
    stop: Latch,
    scheduler: Arc<TaskScheduler>,
    connections: ConnectionRegistry,
}

impl RunningServer {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Latch set when a client asks the server to stop.
    #[must_use]
    pub fn stop_latch(&self) -> &Latch {
        &self.stop
    }

    /// Live view of the tick engine.
    #[must_use]
    pub fn tick(&self) -> &TickHandle {
        self.tick.handle()
    }

    /// Task queue drained by the tick thread.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// Slot registry tracking live connections.
    #[must_use]
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Stops every thread and waits for them to exit.
    ///
    /// Connections being served finish their current iteration, observe the
    /// stop, and release their slots before the workers are joined.
    ///
    /// # Errors
    ///
    /// Returns the first join failure; every thread is still asked to stop.
    pub fn shutdown(self) -> Result<(), ServerError> {
        let Self {
            tick,
            listener,
            pool,
            running,
            ..
        } = self;
        info!(target: TRANSPORT_TARGET, "server stopping");
        running.store(false, Ordering::SeqCst);
        tick.stop();
        listener.shutdown();

        let listener = listener.join();
        let pool = pool.shutdown();
        let tick = tick.join();
        listener?;
        pool?;
        tick?;
        info!(target: TRANSPORT_TARGET, "server stopped");
        Ok(())
    }
}
