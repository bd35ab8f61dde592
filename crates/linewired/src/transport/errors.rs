//! Error types for endpoint and driver operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use super::ConnectionState;

/// Errors raised while opening or re-opening an endpoint socket.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Address resolution failed.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no addresses.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Creating the socket failed.
    #[error("failed to create socket for {addr}: {source}")]
    Socket {
        /// Target address.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Applying a socket option failed.
    #[error("failed to set {option} on socket for {addr}: {source}")]
    SocketOption {
        /// Option being applied.
        option: &'static str,
        /// Target address.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Binding the listening socket failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    Bind {
        /// Address being bound.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Marking the socket as listening failed.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// Bound address.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The client could not reach the server.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Server address.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while accepting a client.
#[derive(Debug, Error)]
pub enum AcceptError {
    /// The endpoint is not waiting for a client.
    #[error("endpoint is not accepting clients (state: {state})")]
    NotListening {
        /// State observed when the accept was attempted.
        state: ConnectionState,
    },
    /// No client is waiting. Transient; callers retry on the next tick.
    #[error("no pending client")]
    Pending,
    /// The listening socket has been released.
    #[error("listening socket is closed")]
    Closed,
    /// The OS rejected the accept call.
    #[error("failed to accept client: {source}")]
    Accept {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The accepted socket could not be configured.
    #[error("failed to configure accepted socket from {peer}: {source}")]
    Configure {
        /// Peer that connected.
        peer: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while reading from the peer.
#[derive(Debug, Error)]
pub enum ReadError {
    /// There is no connected peer.
    #[error("endpoint is not connected")]
    NotConnected,
    /// The peer closed the connection.
    #[error("peer closed the connection")]
    Disconnected,
    /// The timeout elapsed part-way through a line.
    #[error("timed out after receiving {received} bytes of an unterminated line")]
    PartialLine {
        /// Bytes received before the timeout.
        received: usize,
    },
    /// The socket reported an error.
    #[error("socket read failed: {source}")]
    Io {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    /// Whether the failure was caused by the remote side hanging up.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

/// Errors raised while writing to the peer.
#[derive(Debug, Error)]
pub enum WriteError {
    /// There is no connected peer.
    #[error("endpoint is not connected")]
    NotConnected,
    /// The socket accepted fewer bytes than requested.
    #[error("short write: {written} of {expected} bytes sent")]
    ShortWrite {
        /// Bytes accepted by the socket.
        written: usize,
        /// Bytes requested.
        expected: usize,
    },
    /// The socket reported an error.
    #[error("socket write failed: {source}")]
    Io {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the transport driver.
#[derive(Debug, Error)]
pub enum TransportError {
    /// `start` was called before an endpoint was supplied.
    #[error("transport driver has no endpoint")]
    NoEndpoint,
    /// The read loop thread could not be spawned.
    #[error("failed to spawn transport thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The read loop thread panicked.
    #[error("transport thread panicked")]
    ThreadPanic,
}
