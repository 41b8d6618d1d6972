//! TCP listener and accept loop.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tracing::{debug, error, info, warn};

use super::{ListenerError, TRANSPORT_TARGET};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);

/// Receives connections accepted by a [`Listener`].
pub trait ConnectionSink: Send + Sync + 'static {
    /// Takes ownership of an accepted, configured stream.
    ///
    /// Runs on the accept thread, so implementations must hand the stream off
    /// rather than serve it inline.
    fn accept(&self, stream: TcpStream, peer: SocketAddr);
}

/// Socket options applied to every accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Longest single wait for readability.
    pub read_timeout: Duration,
    /// Longest single blocking write.
    pub write_timeout: Duration,
}

impl StreamOptions {
    /// Enables keep-alive and `TCP_NODELAY` and installs the timeouts.
    ///
    /// # Errors
    ///
    /// Returns the first socket option that could not be applied.
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        SockRef::from(stream).set_keepalive(true)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.write_timeout))?;
        Ok(())
    }
}

/// Bound TCP listener that has not started accepting yet.
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Listener {
    /// Resolves `host:port`, binds it, and starts listening with `backlog`.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] naming the step that failed.
    pub fn bind(host: &str, port: u16, backlog: u32) -> Result<Self, ListenerError> {
        let addr = resolve(host, port)?;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| ListenerError::Socket { addr, source })?;
        socket
            .set_reuse_address(true)
            .map_err(|source| ListenerError::Socket { addr, source })?;
        socket
            .bind(&addr.into())
            .map_err(|source| ListenerError::Bind { addr, source })?;
        socket
            .listen(i32::try_from(backlog).unwrap_or(i32::MAX))
            .map_err(|source| ListenerError::Listen { addr, source })?;
        let listener = TcpListener::from(socket);
        let addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Socket { addr, source })?;
        Ok(Self { listener, addr })
    }

    /// Address actually bound, with the kernel-assigned port when `0` was
    /// requested.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Spawns the accept loop, configuring each connection with `options`
    /// before handing it to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::NonBlocking`] or [`ListenerError::Spawn`].
    pub fn start(
        self,
        options: StreamOptions,
        sink: Arc<dyn ConnectionSink>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(String::from("listener"))
            .spawn(move || run_accept_loop(&self, options, &shutdown_flag, sink.as_ref()))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop; the socket closes when the thread exits.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept thread to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => Ok(()),
                Err(_) => Err(ListenerError::ThreadPanic),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &Listener,
    options: StreamOptions,
    shutdown: &AtomicBool,
    sink: &dyn ConnectionSink,
) {
    info!(
        target: TRANSPORT_TARGET,
        addr = %listener.addr,
        "listener active"
    );
    while !shutdown.load(Ordering::SeqCst) {
        match listener.listener.accept() {
            Ok((stream, peer)) => {
                if let Err(error) = options.apply(&stream) {
                    warn!(
                        target: TRANSPORT_TARGET,
                        %peer,
                        %error,
                        "failed to configure connection; closing"
                    );
                    continue;
                }
                debug!(target: TRANSPORT_TARGET, %peer, "connection accepted");
                sink.accept(stream, peer);
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                error!(
                    target: TRANSPORT_TARGET,
                    %error,
                    "accept failed; listener stopping"
                );
                break;
            }
        }
    }
    info!(target: TRANSPORT_TARGET, "listener stopped");
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })
}
