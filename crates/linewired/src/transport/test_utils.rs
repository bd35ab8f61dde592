//! Test helpers for the transport module.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::Frame;
use crate::callback::{FrameHandler, InvocationId};

/// Records every delivered frame with its invocation id.
#[derive(Default)]
pub(crate) struct RecordingHandler {
    frames: Mutex<Vec<(InvocationId, Frame)>>,
}

impl RecordingHandler {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.lock().expect("frames lock").len()
    }

    pub(crate) fn ids(&self) -> Vec<InvocationId> {
        self.frames
            .lock()
            .expect("frames lock")
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.frames
            .lock()
            .expect("frames lock")
            .iter()
            .map(|(_, frame)| String::from_utf8_lossy(frame.as_bytes()).into_owned())
            .collect()
    }
}

impl FrameHandler for RecordingHandler {
    fn on_frame(&self, invocation: InvocationId, frame: Frame) -> bool {
        self.frames
            .lock()
            .expect("frames lock")
            .push((invocation, frame));
        true
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}
