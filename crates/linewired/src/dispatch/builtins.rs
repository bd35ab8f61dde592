//! Methods every engine serves: `quit`, `status`, `getBuildStats`, `query`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tracing::info;

use super::DISPATCH_TARGET;
use super::handler::{HandlerResult, LogSink, MethodHandler};
use super::request::Request;
use super::response::Response;
use super::snapshot::ResultPublisher;

pub(crate) const QUIT_METHOD: &str = "quit";
pub(crate) const STATUS_METHOD: &str = "status";
pub(crate) const BUILD_STATS_METHOD: &str = "getBuildStats";
pub(crate) const QUERY_METHOD: &str = "query";

/// Acknowledges `quit` and clears the running flag when allowed to.
pub(crate) struct QuitHandler {
    running: Arc<AtomicBool>,
    exit_on_quit: bool,
}

impl QuitHandler {
    pub(crate) const fn new(running: Arc<AtomicBool>, exit_on_quit: bool) -> Self {
        Self {
            running,
            exit_on_quit,
        }
    }
}

impl MethodHandler for QuitHandler {
    fn handle(&self, request: &Request, log: &mut LogSink) -> HandlerResult {
        if self.exit_on_quit {
            self.running.store(false, Ordering::SeqCst);
            info!(target: DISPATCH_TARGET, id = request.id(), "quit requested; stopping");
            log.push("quit requested; engine stopping");
        } else {
            log.push("quit ignored; exit_on_quit is disabled");
        }
        Ok(Some(Response::success(request.id())))
    }
}

/// Liveness probe.
pub(crate) struct StatusHandler {
    started: Instant,
}

impl StatusHandler {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl MethodHandler for StatusHandler {
    fn handle(&self, request: &Request, _log: &mut LogSink) -> HandlerResult {
        let uptime_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(Some(
            Response::success(request.id())
                .with_result("status", "ok")
                .with_result("uptime_ms", uptime_ms),
        ))
    }
}

/// Shared, replaceable build description.
#[derive(Debug, Clone, Default)]
pub(crate) struct BuildStats {
    lines: Arc<RwLock<Vec<String>>>,
}

impl BuildStats {
    pub(crate) fn set(&self, text: &str) {
        let lines = text.lines().map(str::to_owned).collect();
        *self.lines.write().unwrap_or_else(PoisonError::into_inner) = lines;
    }

    fn lines(&self) -> Vec<String> {
        self.lines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Reports the build description one line per array element.
pub(crate) struct BuildStatsHandler {
    stats: BuildStats,
}

impl BuildStatsHandler {
    pub(crate) const fn new(stats: BuildStats) -> Self {
        Self { stats }
    }
}

impl MethodHandler for BuildStatsHandler {
    fn handle(&self, request: &Request, _log: &mut LogSink) -> HandlerResult {
        Ok(Some(
            Response::success(request.id()).with_result("build_stats", self.stats.lines()),
        ))
    }
}

/// Returns the latest published result.
pub(crate) struct QueryHandler {
    results: ResultPublisher,
}

impl QueryHandler {
    pub(crate) const fn new(results: ResultPublisher) -> Self {
        Self { results }
    }
}

impl MethodHandler for QueryHandler {
    fn handle(&self, request: &Request, log: &mut LogSink) -> HandlerResult {
        let Some(latest) = self.results.latest() else {
            log.push("no result has been published yet");
            return Ok(Some(
                Response::success(request.id()).with_result("success", false),
            ));
        };
        let mut response = Response::success(request.id());
        for (key, value) in latest.iter() {
            response.insert(key.clone(), value.clone());
        }
        response.insert("success", true);
        Ok(Some(response))
    }
}
