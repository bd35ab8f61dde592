//! Command engine lifecycle: wiring the endpoint, driver and dispatch loop.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use linewire_config::{EngineConfig, EngineSettings};

use super::DISPATCH_TARGET;
use super::builtins::{
    BUILD_STATS_METHOD, BuildStats, BuildStatsHandler, QUERY_METHOD, QUIT_METHOD, QueryHandler,
    QuitHandler, STATUS_METHOD, StatusHandler,
};
use super::dispatcher::Dispatcher;
use super::errors::EngineError;
use super::handler::MethodHandler;
use super::queue::CommandQueue;
use super::snapshot::ResultPublisher;
use crate::callback::InvocationId;
use crate::transport::{DriverOptions, Endpoint, Frame, ResponseSink, TransportDriver};

const ENDPOINT_NAME: &str = "command server";
const THREAD_NAME: &str = "linewire-dispatch";
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// JSON command server bound to one TCP port.
///
/// `init` opens the port and installs the built-in methods, `start` launches
/// the transport and dispatch threads, and `stop` tears both down. A `quit`
/// request clears the running flag; the owner is expected to notice through
/// [`CommandEngine::is_running`] and call `stop`.
pub struct CommandEngine {
    settings: EngineSettings,
    endpoint: Arc<Endpoint>,
    driver: TransportDriver,
    dispatcher: Arc<Dispatcher>,
    queue: Arc<CommandQueue>,
    running: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    build_stats: BuildStats,
    results: ResultPublisher,
}

impl CommandEngine {
    /// Validates `config`, opens the server port and registers the built-in
    /// methods. The engine is not running until [`CommandEngine::start`].
    pub fn init(config: &EngineConfig) -> Result<Self, EngineError> {
        let settings = config.validate()?;
        let endpoint = Arc::new(
            Endpoint::server(settings.address.clone(), settings.port).with_name(ENDPOINT_NAME),
        );
        endpoint
            .open()
            .map_err(|source| EngineError::Connect { source })?;

        let transport = &settings.transport;
        let queue = Arc::new(CommandQueue::new(
            transport.queue_capacity,
            transport.queue_warn_threshold,
        ));
        let driver = TransportDriver::new(DriverOptions::from(transport));
        driver.use_endpoint(Arc::clone(&endpoint));
        let producer = Arc::clone(&queue);
        driver.register_frame_handler(Arc::new(move |invocation: InvocationId, frame: Frame| {
            match producer.push(frame) {
                Ok(()) => true,
                Err(error) => {
                    warn!(
                        target: DISPATCH_TARGET,
                        invocation,
                        error = %error,
                        "dropping frame"
                    );
                    false
                }
            }
        }));

        let running = Arc::new(AtomicBool::new(false));
        let sink: Arc<dyn ResponseSink> = Arc::clone(&endpoint) as Arc<dyn ResponseSink>;
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queue),
            sink,
            Arc::clone(&running),
        ));

        let build_stats = BuildStats::default();
        let results = ResultPublisher::default();
        dispatcher.register(
            QUIT_METHOD,
            Arc::new(QuitHandler::new(Arc::clone(&running), settings.exit_on_quit)),
        );
        dispatcher.register(STATUS_METHOD, Arc::new(StatusHandler::new()));
        dispatcher.register(
            BUILD_STATS_METHOD,
            Arc::new(BuildStatsHandler::new(build_stats.clone())),
        );
        dispatcher.register(QUERY_METHOD, Arc::new(QueryHandler::new(results.clone())));

        info!(
            target: DISPATCH_TARGET,
            address = %settings.address,
            port = settings.port,
            local = ?endpoint.local_addr(),
            exit_on_quit = settings.exit_on_quit,
            read_mode = %settings.transport.read_mode,
            "command engine initialised"
        );

        Ok(Self {
            settings,
            endpoint,
            driver,
            dispatcher,
            queue,
            running,
            done: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            build_stats,
            results,
        })
    }

    /// Starts the transport driver and the dispatch loop.
    ///
    /// Calling `start` on a started engine only re-arms the running flag.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            self.running.store(true, Ordering::SeqCst);
            return Ok(());
        }
        self.driver
            .start()
            .map_err(|source| EngineError::Transport { source })?;
        self.running.store(true, Ordering::SeqCst);
        self.done.store(false, Ordering::SeqCst);

        let dispatcher = Arc::clone(&self.dispatcher);
        let done = Arc::clone(&self.done);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    if !dispatcher.do_work() {
                        thread::sleep(IDLE_SLEEP);
                    }
                }
            });
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!(
                    target: DISPATCH_TARGET,
                    local = ?self.endpoint.local_addr(),
                    "command engine started"
                );
                Ok(())
            }
            Err(source) => {
                self.running.store(false, Ordering::SeqCst);
                if let Err(error) = self.driver.stop() {
                    warn!(
                        target: DISPATCH_TARGET,
                        error = %error,
                        "failed to stop transport after spawn failure"
                    );
                }
                Err(EngineError::Spawn { source })
            }
        }
    }

    /// Stops the dispatch loop and the transport, releasing the port.
    ///
    /// Frames still queued are discarded without a response.
    pub fn stop(&self) -> Result<(), EngineError> {
        self.running.store(false, Ordering::SeqCst);
        self.done.store(true, Ordering::SeqCst);
        let worker = lock(&self.worker).take();
        let joined = match worker {
            Some(handle) => handle.join().map_err(|_| EngineError::ThreadPanic),
            None => Ok(()),
        };
        let stopped = self
            .driver
            .stop()
            .map_err(|source| EngineError::Transport { source });
        let mut discarded = 0_usize;
        while self.queue.pop().is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(
                target: DISPATCH_TARGET,
                discarded,
                "discarded queued frames on stop"
            );
        }
        info!(target: DISPATCH_TARGET, "command engine stopped");
        joined.and(stopped)
    }

    /// Processes at most one queued frame on the calling thread.
    pub fn do_work(&self) -> bool {
        self.dispatcher.do_work()
    }

    /// Whether requests are being processed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Registers a method handler. Earlier registrations take precedence
    /// when several names occur in a requested method.
    pub fn register_method(&self, name: impl Into<String>, handler: impl MethodHandler) {
        self.dispatcher.register(name, Arc::new(handler));
    }

    /// Replaces the text reported by `getBuildStats`.
    pub fn set_build_stats(&self, text: &str) {
        self.build_stats.set(text);
    }

    /// Publishes a result object for `query`.
    pub fn publish_result(&self, result: Map<String, Value>) {
        self.results.publish(result);
    }

    /// Handle for publishing results from other threads.
    #[must_use]
    pub fn result_publisher(&self) -> ResultPublisher {
        self.results.clone()
    }

    /// Address the server is bound to, while the port is open.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.endpoint.local_addr()
    }

    /// The server endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// Frames waiting to be dispatched.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Validated settings the engine was built from.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl Drop for CommandEngine {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(
                target: DISPATCH_TARGET,
                error = %error,
                "command engine did not stop cleanly"
            );
        }
    }
}

impl std::fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEngine")
            .field("settings", &self.settings)
            .field("endpoint", &self.endpoint.name())
            .field("state", &self.endpoint.state())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linewire_config::EngineConfigError;
    use serde_json::json;

    fn loopback() -> EngineConfig {
        EngineConfig::new("127.0.0.1", 0)
    }

    #[test]
    fn init_rejects_a_missing_port() {
        let config = EngineConfig::from_json(&json!({"ipAddress": "127.0.0.1"}))
            .expect("parse config");
        let error = CommandEngine::init(&config).expect_err("missing port");
        assert!(matches!(
            error,
            EngineError::Config {
                source: EngineConfigError::MissingPort
            }
        ));
    }

    #[test]
    fn init_binds_but_does_not_run() {
        let engine = CommandEngine::init(&loopback()).expect("init engine");
        assert!(!engine.is_running());
        assert!(engine.local_addr().is_some_and(|addr| addr.port() != 0));
        assert!(!engine.do_work());
    }

    #[test]
    fn start_and_stop_toggle_running() {
        let engine = CommandEngine::init(&loopback()).expect("init engine");
        engine.start().expect("start engine");
        engine.start().expect("second start is a no-op");
        assert!(engine.is_running());
        engine.stop().expect("stop engine");
        assert!(!engine.is_running());
        engine.stop().expect("second stop is a no-op");
    }
}
