//! Background read/reconnect loop over a single endpoint.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use linewire_config::{ReadMode, TransportSettings};

use super::endpoint::{Endpoint, LineRead};
use super::errors::{AcceptError, ReadError, TransportError, WriteError};
use super::framing::{Frame, FrameBuffer};
use super::{ConnectionState, TRANSPORT_TARGET};
use crate::callback::{FrameHandler, HandlerSlot, InvocationId};

const TICK_INTERVAL: Duration = Duration::from_millis(1);
const RESET_BACKOFF: Duration = Duration::from_millis(500);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const PAUSE_SLICE: Duration = Duration::from_millis(10);
const THREAD_NAME: &str = "linewire-transport";

/// Read behaviour of a [`TransportDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Line or block reads.
    pub read_mode: ReadMode,
    /// Idle window for one receive.
    pub receive_timeout: Duration,
    /// Scratch size for block reads and line length cap.
    pub read_block_size: usize,
    /// Whether a hang-up ends a line read immediately.
    pub stop_on_disconnect: bool,
    /// Pending partial-line size that triggers a warning.
    pub buffer_warn_threshold: usize,
}

impl From<&TransportSettings> for DriverOptions {
    fn from(settings: &TransportSettings) -> Self {
        Self {
            read_mode: settings.read_mode,
            receive_timeout: settings.receive_timeout(),
            read_block_size: settings.read_block_size.max(1),
            stop_on_disconnect: settings.stop_on_disconnect,
            buffer_warn_threshold: settings.buffer_warn_threshold,
        }
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::from(&TransportSettings::default())
    }
}

/// What a single loop tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do this tick.
    Idle,
    /// A client connected.
    Accepted(SocketAddr),
    /// This many frames were handed to the handler.
    Delivered(usize),
    /// The endpoint was re-established.
    Reset,
    /// The loop should wait this long before the next tick.
    Backoff(Duration),
}

/// Owns the transport thread and the endpoint it services.
pub struct TransportDriver {
    inner: Arc<DriverInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct DriverInner {
    endpoint: RwLock<Option<Arc<Endpoint>>>,
    handler: HandlerSlot,
    options: DriverOptions,
    receive: Mutex<ReceiveState>,
    invocations: AtomicU64,
    done: AtomicBool,
}

struct ReceiveState {
    buffer: FrameBuffer,
    scratch: Vec<u8>,
    buffer_warned: bool,
    last_failure: Option<String>,
}

impl TransportDriver {
    /// Creates an idle driver with no endpoint.
    #[must_use]
    pub fn new(options: DriverOptions) -> Self {
        let scratch = vec![0_u8; options.read_block_size.max(1)];
        Self {
            inner: Arc::new(DriverInner {
                endpoint: RwLock::new(None),
                handler: HandlerSlot::default(),
                options,
                receive: Mutex::new(ReceiveState {
                    buffer: FrameBuffer::default(),
                    scratch,
                    buffer_warned: false,
                    last_failure: None,
                }),
                invocations: AtomicU64::new(0),
                done: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Binds the driver to `endpoint`, replacing any earlier one.
    pub fn use_endpoint(&self, endpoint: Arc<Endpoint>) {
        *self
            .inner
            .endpoint
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(endpoint);
    }

    /// The endpoint currently serviced.
    #[must_use]
    pub fn endpoint(&self) -> Option<Arc<Endpoint>> {
        self.inner.endpoint()
    }

    /// Registers the consumer of extracted frames, replacing any earlier one.
    pub fn register_frame_handler(&self, handler: Arc<dyn FrameHandler>) {
        if self.inner.handler.replace(handler) {
            debug!(target: TRANSPORT_TARGET, "frame handler replaced");
        }
    }

    /// Number of handler invocations so far.
    #[must_use]
    pub fn invocations(&self) -> InvocationId {
        self.inner.invocations.load(Ordering::SeqCst)
    }

    /// Whether the background thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some() && !self.inner.done.load(Ordering::SeqCst)
    }

    /// Spawns the background read loop. Calling it again while running is a
    /// no-op.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return Ok(());
        }
        if self.inner.endpoint().is_none() {
            return Err(TransportError::NoEndpoint);
        }
        self.inner.done.store(false, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || inner.run())
            .map_err(|source| TransportError::Spawn { source })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stops the read loop and releases the endpoint's sockets.
    ///
    /// An endpoint still waiting for a client is closed before joining so the
    /// loop cannot pick up a late connection.
    pub fn stop(&self) -> Result<(), TransportError> {
        self.inner.done.store(true, Ordering::SeqCst);
        let endpoint = self.inner.endpoint();
        if let Some(endpoint) = endpoint.as_ref()
            && endpoint.state() == ConnectionState::ServerPortSetup
        {
            endpoint.close();
        }
        let worker = lock(&self.worker).take();
        let joined = match worker {
            Some(handle) => handle.join().map_err(|_| TransportError::ThreadPanic),
            None => Ok(()),
        };
        if let Some(endpoint) = endpoint {
            endpoint.close();
        }
        lock(&self.inner.receive).reset();
        joined
    }

    /// Runs one loop tick on the calling thread.
    pub fn do_work(&self) -> TickOutcome {
        self.inner.tick()
    }

    /// Writes `bytes` to the connected peer.
    pub fn transmit(&self, bytes: &[u8]) -> Result<(), WriteError> {
        self.inner
            .endpoint()
            .ok_or(WriteError::NotConnected)?
            .write(bytes)
    }
}

impl Drop for TransportDriver {
    fn drop(&mut self) {
        self.inner.done.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for TransportDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportDriver")
            .field("options", &self.inner.options)
            .field("running", &self.is_running())
            .field("invocations", &self.invocations())
            .finish_non_exhaustive()
    }
}

impl DriverInner {
    fn endpoint(&self) -> Option<Arc<Endpoint>> {
        self.endpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn run(&self) {
        info!(target: TRANSPORT_TARGET, "transport driver active");
        while !self.done.load(Ordering::SeqCst) {
            match self.tick() {
                TickOutcome::Backoff(delay) => self.pause(delay),
                _ => self.pause(TICK_INTERVAL),
            }
        }
        info!(target: TRANSPORT_TARGET, "transport driver stopped");
    }

    fn pause(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            if self.done.load(Ordering::SeqCst) {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            thread::sleep(remaining.min(PAUSE_SLICE));
        }
    }

    fn tick(&self) -> TickOutcome {
        let Some(endpoint) = self.endpoint() else {
            return TickOutcome::Backoff(RESET_BACKOFF);
        };
        match endpoint.state() {
            ConnectionState::NoConnection => self.reset(&endpoint),
            ConnectionState::ServerPortSetup => self.accept(&endpoint),
            ConnectionState::Connected => self.receive(&endpoint),
            state @ ConnectionState::ServerListening => {
                debug!(
                    target: TRANSPORT_TARGET,
                    endpoint = endpoint.name(),
                    state = %state,
                    "unexpected connection state"
                );
                TickOutcome::Backoff(RESET_BACKOFF)
            }
        }
    }

    fn reset(&self, endpoint: &Endpoint) -> TickOutcome {
        match endpoint.reset_connection() {
            Ok(()) => {
                self.note_recovered();
                debug!(
                    target: TRANSPORT_TARGET,
                    endpoint = endpoint.name(),
                    state = %endpoint.state(),
                    "connection reset"
                );
                TickOutcome::Reset
            }
            Err(error) => {
                self.note_failure(endpoint, "connection reset failed", &error.to_string());
                TickOutcome::Backoff(RESET_BACKOFF)
            }
        }
    }

    fn accept(&self, endpoint: &Endpoint) -> TickOutcome {
        match endpoint.accept_client() {
            Ok(peer) => {
                self.note_recovered();
                info!(
                    target: TRANSPORT_TARGET,
                    endpoint = endpoint.name(),
                    peer = %peer,
                    "client connected"
                );
                TickOutcome::Accepted(peer)
            }
            Err(AcceptError::Pending) => TickOutcome::Idle,
            Err(error) => {
                self.note_failure(endpoint, "client accept failed", &error.to_string());
                TickOutcome::Backoff(ERROR_BACKOFF)
            }
        }
    }

    fn receive(&self, endpoint: &Endpoint) -> TickOutcome {
        let mut receive = lock(&self.receive);
        let ReceiveState {
            buffer,
            scratch,
            buffer_warned,
            ..
        } = &mut *receive;
        let read = match self.options.read_mode {
            ReadMode::Line => self.read_line(endpoint, buffer),
            ReadMode::Block => endpoint.read_block(scratch).map(|read| {
                buffer.extend(scratch.get(..read).unwrap_or_default());
                read
            }),
        };
        match read {
            Ok(0) => TickOutcome::Idle,
            Ok(_) => {
                let frames = buffer.drain_frames();
                self.check_buffer(endpoint, buffer.len(), buffer_warned);
                drop(receive);
                self.deliver(frames)
            }
            Err(error) => {
                receive.reset();
                drop(receive);
                self.recover(endpoint, &error)
            }
        }
    }

    fn read_line(&self, endpoint: &Endpoint, buffer: &mut FrameBuffer) -> Result<usize, ReadError> {
        let line = endpoint.read_line(
            self.options.read_block_size,
            self.options.receive_timeout,
            self.options.stop_on_disconnect,
        )?;
        match line {
            LineRead::Line { mut bytes, end } => {
                // Put back the consumed terminator so the buffer sees the same
                // bytes a block read would. A capped chunk carries none and
                // keeps building the current line.
                bytes.extend(end.terminator());
                buffer.extend(&bytes);
                Ok(bytes.len())
            }
            LineRead::TimedOut => Ok(0),
        }
    }

    fn recover(&self, endpoint: &Endpoint, error: &ReadError) -> TickOutcome {
        if error.is_disconnect() {
            warn!(
                target: TRANSPORT_TARGET,
                endpoint = endpoint.name(),
                "client disconnected"
            );
        } else {
            warn!(
                target: TRANSPORT_TARGET,
                endpoint = endpoint.name(),
                error = %error,
                "receive failed; resetting connection"
            );
        }
        self.reset(endpoint)
    }

    fn deliver(&self, frames: Vec<Frame>) -> TickOutcome {
        let count = frames.len();
        for frame in frames {
            let invocation = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
            let bytes = frame.len();
            match self.handler.invoke(invocation, frame) {
                Some(true) => {}
                Some(false) => debug!(
                    target: TRANSPORT_TARGET,
                    invocation,
                    bytes,
                    "frame handler rejected frame"
                ),
                None => debug!(
                    target: TRANSPORT_TARGET,
                    invocation,
                    bytes,
                    "frame received with no handler registered"
                ),
            }
        }
        TickOutcome::Delivered(count)
    }

    fn check_buffer(&self, endpoint: &Endpoint, pending: usize, warned: &mut bool) {
        if pending <= self.options.buffer_warn_threshold {
            *warned = false;
            return;
        }
        if !*warned {
            warn!(
                target: TRANSPORT_TARGET,
                endpoint = endpoint.name(),
                pending,
                threshold = self.options.buffer_warn_threshold,
                "unterminated input exceeds buffer threshold"
            );
            *warned = true;
        }
    }

    fn note_failure(&self, endpoint: &Endpoint, message: &'static str, detail: &str) {
        let mut receive = lock(&self.receive);
        if receive.last_failure.as_deref() != Some(detail) {
            warn!(
                target: TRANSPORT_TARGET,
                endpoint = endpoint.name(),
                error = detail,
                "{message}"
            );
            receive.last_failure = Some(detail.to_owned());
        }
    }

    fn note_recovered(&self) {
        lock(&self.receive).last_failure = None;
    }
}

impl ReceiveState {
    fn reset(&mut self) {
        self.buffer.clear();
        self.buffer_warned = false;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
