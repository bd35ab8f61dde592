use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a connection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable socket; the driver will attempt a reset.
    NoConnection,
    /// Listening socket bound and waiting for a client.
    ServerPortSetup,
    /// Reserved; never entered by the endpoint.
    ServerListening,
    /// A peer socket is ready for reads and writes.
    Connected,
}

impl ConnectionState {
    const fn to_raw(self) -> u8 {
        match self {
            Self::NoConnection => 0,
            Self::ServerPortSetup => 1,
            Self::ServerListening => 2,
            Self::Connected => 3,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::ServerPortSetup,
            2 => Self::ServerListening,
            3 => Self::Connected,
            _ => Self::NoConnection,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoConnection => "no_connection",
            Self::ServerPortSetup => "server_port_setup",
            Self::ServerListening => "server_listening",
            Self::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Connection state shared between the driver and dispatch threads.
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state.to_raw()))
    }

    pub(crate) fn load(&self) -> ConnectionState {
        ConnectionState::from_raw(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, state: ConnectionState) {
        self.0.store(state.to_raw(), Ordering::SeqCst);
    }
}
