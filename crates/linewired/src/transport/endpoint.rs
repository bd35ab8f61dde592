//! TCP connection endpoint with an explicit connection-state machine.
//!
//! An [`Endpoint`] owns at most one listening socket and at most one peer
//! socket. Both are non-blocking; reads poll with short sleeps so that no
//! call blocks for longer than the timeout it was given. The peer stream is
//! held behind an `Arc` and cloned out of its lock before any I/O, which lets
//! the transport thread read while the dispatch thread writes.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info};

use super::errors::{AcceptError, ConnectError, ReadError, WriteError};
use super::state::AtomicState;
use super::{ConnectionState, TRANSPORT_TARGET};

const POLL_INTERVAL: Duration = Duration::from_micros(250);
const LISTEN_BACKLOG: i32 = 128;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Whether the endpoint listens for a client or connects to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Connect to a remote server.
    Client,
    /// Listen for a single client.
    Server,
}

/// Outcome of a successful [`Endpoint::read_line`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// Bytes read up to, but excluding, the terminator.
    Line {
        /// Line content.
        bytes: Vec<u8>,
        /// What ended the read.
        end: LineEnd,
    },
    /// Nothing arrived within the timeout.
    TimedOut,
}

impl LineRead {
    /// A line ended by `\n`.
    #[must_use]
    pub fn newline(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Line {
            bytes: bytes.into(),
            end: LineEnd::Newline,
        }
    }
}

/// What ended a [`LineRead::Line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    /// A `\n` byte.
    Newline,
    /// A `\r` byte.
    CarriageReturn,
    /// `max_len` bytes arrived first; the line continues in the next read.
    Capped,
}

impl LineEnd {
    /// The terminator byte that was consumed, if any.
    #[must_use]
    pub const fn terminator(self) -> Option<u8> {
        match self {
            Self::Newline => Some(b'\n'),
            Self::CarriageReturn => Some(b'\r'),
            Self::Capped => None,
        }
    }
}

/// Destination for serialized responses.
pub trait ResponseSink: Send + Sync {
    /// Writes `bytes` to the connected peer.
    fn send(&self, bytes: &[u8]) -> Result<(), WriteError>;
}

/// A TCP socket plus its connection state.
#[derive(Debug)]
pub struct Endpoint {
    name: String,
    mode: ConnectionMode,
    host: String,
    port: AtomicU16,
    connect_timeout: Duration,
    state: AtomicState,
    listener: Mutex<Option<TcpListener>>,
    peer: Mutex<Option<Arc<TcpStream>>>,
    peer_addr: Mutex<Option<SocketAddr>>,
}

impl Endpoint {
    /// Creates an endpoint without touching the network.
    pub fn new(mode: ConnectionMode, host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let name = match mode {
            ConnectionMode::Client => format!("client {host}:{port}"),
            ConnectionMode::Server => format!("server {host}:{port}"),
        };
        Self {
            name,
            mode,
            host,
            port: AtomicU16::new(port),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: AtomicState::new(ConnectionState::NoConnection),
            listener: Mutex::new(None),
            peer: Mutex::new(None),
            peer_addr: Mutex::new(None),
        }
    }

    /// Shorthand for a server-mode endpoint.
    pub fn server(host: impl Into<String>, port: u16) -> Self {
        Self::new(ConnectionMode::Server, host, port)
    }

    /// Shorthand for a client-mode endpoint.
    pub fn client(host: impl Into<String>, port: u16) -> Self {
        Self::new(ConnectionMode::Client, host, port)
    }

    /// Overrides the label used in log output.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bounds client connect attempts.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Label used in log output.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client or server.
    #[must_use]
    pub const fn mode(&self) -> ConnectionMode {
        self.mode
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Address of the last accepted or connected peer.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        *lock(&self.peer_addr)
    }

    /// Locally bound address: the listener in server mode, the peer socket's
    /// local side in client mode.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        if let Some(listener) = lock(&self.listener).as_ref() {
            return listener.local_addr().ok();
        }
        self.peer_stream().and_then(|stream| stream.local_addr().ok())
    }

    /// Establishes the socket for the configured mode.
    ///
    /// Server mode binds and listens, leaving the endpoint in
    /// [`ConnectionState::ServerPortSetup`]. Client mode connects, leaving it
    /// [`ConnectionState::Connected`]. On failure the state stays
    /// [`ConnectionState::NoConnection`].
    pub fn open(&self) -> Result<(), ConnectError> {
        match self.mode {
            ConnectionMode::Server => self.open_server(),
            ConnectionMode::Client => self.connect_client(),
        }
    }

    /// Accepts a waiting client.
    ///
    /// Only valid in [`ConnectionState::ServerPortSetup`]. The state is left
    /// unchanged on every failure, including the transient
    /// [`AcceptError::Pending`].
    pub fn accept_client(&self) -> Result<SocketAddr, AcceptError> {
        let state = self.state();
        if state != ConnectionState::ServerPortSetup {
            return Err(AcceptError::NotListening { state });
        }
        let accepted = {
            let guard = lock(&self.listener);
            let Some(listener) = guard.as_ref() else {
                return Err(AcceptError::Closed);
            };
            listener.accept()
        };
        match accepted {
            Ok((stream, peer)) => {
                stream
                    .set_nonblocking(true)
                    .map_err(|source| AcceptError::Configure { peer, source })?;
                *lock(&self.peer) = Some(Arc::new(stream));
                *lock(&self.peer_addr) = Some(peer);
                self.state.store(ConnectionState::Connected);
                Ok(peer)
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Err(AcceptError::Pending)
            }
            Err(source) => Err(AcceptError::Accept { source }),
        }
    }

    /// Reads one line, a byte at a time.
    ///
    /// `\n` and `\r` both terminate the line; the terminator is stripped and
    /// reported as the [`LineEnd`]. When `max_len` bytes arrive without a
    /// terminator they are returned as-is with [`LineEnd::Capped`]. The timeout
    /// window restarts when the first byte of the line arrives. A timeout
    /// with nothing read is [`LineRead::TimedOut`]; a timeout part-way through
    /// a line is [`ReadError::PartialLine`].
    ///
    /// When the peer hangs up the endpoint drops to
    /// [`ConnectionState::NoConnection`]. With `stop_on_disconnect` the read
    /// fails with [`ReadError::Disconnected`]; otherwise the hang-up is
    /// polled like an idle socket until the timeout elapses.
    pub fn read_line(
        &self,
        max_len: usize,
        timeout: Duration,
        stop_on_disconnect: bool,
    ) -> Result<LineRead, ReadError> {
        let stream = self.peer_stream().ok_or(ReadError::NotConnected)?;
        let mut line = Vec::new();
        let mut deadline = Instant::now() + timeout;
        let mut byte = [0_u8; 1];
        loop {
            if line.len() >= max_len {
                return Ok(LineRead::Line {
                    bytes: line,
                    end: LineEnd::Capped,
                });
            }
            match (&*stream).read(&mut byte) {
                Ok(0) => {
                    self.mark_disconnected();
                    if stop_on_disconnect {
                        return Err(ReadError::Disconnected);
                    }
                }
                Ok(_) => {
                    if line.is_empty() {
                        deadline = Instant::now() + timeout;
                    }
                    let end = match byte {
                        [b'\n'] => LineEnd::Newline,
                        [b'\r'] => LineEnd::CarriageReturn,
                        [value] => {
                            line.push(value);
                            continue;
                        }
                    };
                    return Ok(LineRead::Line { bytes: line, end });
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {}
                Err(source) => return Err(ReadError::Io { source }),
            }
            if Instant::now() >= deadline {
                return if line.is_empty() {
                    Ok(LineRead::TimedOut)
                } else {
                    Err(ReadError::PartialLine {
                        received: line.len(),
                    })
                };
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Reads whatever the socket has buffered, up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` when nothing is available. A hang-up drops the
    /// endpoint to [`ConnectionState::NoConnection`] and fails with
    /// [`ReadError::Disconnected`].
    pub fn read_block(&self, buf: &mut [u8]) -> Result<usize, ReadError> {
        let stream = self.peer_stream().ok_or(ReadError::NotConnected)?;
        match (&*stream).read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.mark_disconnected();
                Err(ReadError::Disconnected)
            }
            Ok(read) => Ok(read),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(source) => Err(ReadError::Io { source }),
        }
    }

    /// Sends `bytes` with a single non-blocking write.
    pub fn write(&self, bytes: &[u8]) -> Result<(), WriteError> {
        let stream = self.peer_stream().ok_or(WriteError::NotConnected)?;
        match (&*stream).write(bytes) {
            Ok(written) if written == bytes.len() => Ok(()),
            Ok(written) => Err(WriteError::ShortWrite {
                written,
                expected: bytes.len(),
            }),
            Err(source) => Err(WriteError::Io { source }),
        }
    }

    /// Re-establishes the endpoint after a failure.
    ///
    /// Client mode reconnects from scratch. Server mode discards the peer,
    /// re-binds the listener if it was released, and waits for a new client.
    pub fn reset_connection(&self) -> Result<(), ConnectError> {
        match self.mode {
            ConnectionMode::Client => self.connect_client(),
            ConnectionMode::Server => {
                self.drop_peer();
                let listening = lock(&self.listener).is_some();
                if listening {
                    self.state.store(ConnectionState::ServerPortSetup);
                    Ok(())
                } else {
                    self.open_server()
                }
            }
        }
    }

    /// Releases every socket. Safe to call repeatedly.
    pub fn close(&self) {
        self.drop_peer();
        if lock(&self.listener).take().is_some() {
            debug!(target: TRANSPORT_TARGET, endpoint = %self.name, "listener closed");
        }
        self.state.store(ConnectionState::NoConnection);
    }

    fn open_server(&self) -> Result<(), ConnectError> {
        let addr = self.resolve()?;
        let socket = new_socket(addr)?;
        socket
            .set_reuse_address(true)
            .map_err(|source| socket_option("SO_REUSEADDR", addr, source))?;
        socket
            .set_nonblocking(true)
            .map_err(|source| socket_option("O_NONBLOCK", addr, source))?;
        socket
            .bind(&SockAddr::from(addr))
            .map_err(|source| ConnectError::Bind { addr, source })?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|source| ConnectError::Listen { addr, source })?;
        let listener = TcpListener::from(socket);
        let bound = listener.local_addr().unwrap_or(addr);
        // Keep an ephemeral port stable across re-binds.
        self.port.store(bound.port(), Ordering::SeqCst);
        *lock(&self.listener) = Some(listener);
        self.state.store(ConnectionState::ServerPortSetup);
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %self.name,
            addr = %bound,
            "listening for client"
        );
        Ok(())
    }

    fn connect_client(&self) -> Result<(), ConnectError> {
        self.drop_peer();
        self.state.store(ConnectionState::NoConnection);
        let addr = self.resolve()?;
        let socket = new_socket(addr)?;
        socket
            .set_reuse_address(true)
            .map_err(|source| socket_option("SO_REUSEADDR", addr, source))?;
        socket
            .set_linger(Some(Duration::ZERO))
            .map_err(|source| socket_option("SO_LINGER", addr, source))?;
        socket
            .connect_timeout(&SockAddr::from(addr), self.connect_timeout)
            .map_err(|source| ConnectError::Connect { addr, source })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| socket_option("O_NONBLOCK", addr, source))?;
        *lock(&self.peer) = Some(Arc::new(TcpStream::from(socket)));
        *lock(&self.peer_addr) = Some(addr);
        self.state.store(ConnectionState::Connected);
        debug!(
            target: TRANSPORT_TARGET,
            endpoint = %self.name,
            addr = %addr,
            "connected to server"
        );
        Ok(())
    }

    fn resolve(&self) -> Result<SocketAddr, ConnectError> {
        let port = self.port.load(Ordering::SeqCst);
        let mut addrs = (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|source| ConnectError::Resolve {
                host: self.host.clone(),
                port,
                source,
            })?;
        addrs.next().ok_or_else(|| ConnectError::ResolveEmpty {
            host: self.host.clone(),
            port,
        })
    }

    fn peer_stream(&self) -> Option<Arc<TcpStream>> {
        lock(&self.peer).clone()
    }

    fn drop_peer(&self) {
        let Some(stream) = lock(&self.peer).take() else {
            return;
        };
        if let Err(error) = stream.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(
                target: TRANSPORT_TARGET,
                endpoint = %self.name,
                error = %error,
                "peer shutdown failed"
            );
        }
    }

    fn mark_disconnected(&self) {
        self.state.store(ConnectionState::NoConnection);
    }
}

impl ResponseSink for Endpoint {
    fn send(&self, bytes: &[u8]) -> Result<(), WriteError> {
        self.write(bytes)
    }
}

fn new_socket(addr: SocketAddr) -> Result<Socket, ConnectError> {
    Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| ConnectError::Socket { addr, source })
}

fn socket_option(option: &'static str, addr: SocketAddr, source: io::Error) -> ConnectError {
    ConnectError::SocketOption {
        option,
        addr,
        source,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
