//! TCP transport: the connection endpoint, newline framing, and the
//! background driver that feeds frames to a registered handler.
//!
//! The driver thread polls the endpoint's connection state on every tick,
//! re-establishing the socket when it is lost, accepting a client when the
//! server is waiting, and otherwise reading and splitting the byte stream
//! into [`Frame`]s.

mod driver;
mod endpoint;
mod errors;
mod framing;
mod state;
#[cfg(test)]
pub(crate) mod test_utils;

pub use self::driver::{DriverOptions, TickOutcome, TransportDriver};
pub use self::endpoint::{ConnectionMode, Endpoint, LineEnd, LineRead, ResponseSink};
pub use self::errors::{AcceptError, ConnectError, ReadError, TransportError, WriteError};
pub use self::framing::{Frame, FrameBuffer};
pub use self::state::ConnectionState;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
