//! Newline framing over the raw receive stream.

use std::fmt;
use std::mem;

const DELIMITER: u8 = b'\n';

/// One newline-delimited message, without its delimiter.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Borrows the frame payload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the frame, returning its payload.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame carries no bytes (an empty line).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame")
            .field(&String::from_utf8_lossy(&self.0))
            .finish()
    }
}

/// Receive buffer holding complete lines followed by at most one partial line.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
}

impl FrameBuffer {
    /// Appends freshly received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Removes every complete line, returning them in arrival order.
    ///
    /// Bytes after the last delimiter stay buffered, so calling this again
    /// without new input yields nothing.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        let Some(last) = self.bytes.iter().rposition(|byte| *byte == DELIMITER) else {
            return Vec::new();
        };
        let remainder = self.bytes.split_off(last + 1);
        let complete = mem::replace(&mut self.bytes, remainder);
        let body = complete.strip_suffix(&[DELIMITER]).unwrap_or(&complete);
        body.split(|byte| *byte == DELIMITER).map(Frame::from).collect()
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Discards buffered bytes, typically after the connection is lost.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
