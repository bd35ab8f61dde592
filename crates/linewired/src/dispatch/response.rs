//! Response construction and serialization for the dispatch loop.
//!
//! Every frame produces exactly one response line:
//!
//! ```json
//! {"id":1,"result":{"success":true,"status":"ok"},"log_msgs":[]}
//! ```
//!
//! Failures carry `"success": false` plus an `error_code`; a frame that could
//! not be decoded reports its id as `"unknown"`.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::errors::ErrorCode;

/// Id echoed in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseId {
    /// The request's correlation id.
    Number(i64),
    /// The request could not be decoded.
    Unknown,
}

impl Serialize for ResponseId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Number(id) => serializer.serialize_i64(*id),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Response to a single request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    id: ResponseId,
    result: Map<String, Value>,
    log_msgs: Vec<String>,
}

impl Response {
    /// Creates a response with an empty result object.
    #[must_use]
    pub fn new(id: ResponseId) -> Self {
        Self {
            id,
            result: Map::new(),
            log_msgs: Vec::new(),
        }
    }

    /// Creates a response whose result is `{"success": true}`.
    #[must_use]
    pub fn success(id: i64) -> Self {
        Self::new(ResponseId::Number(id)).with_result("success", true)
    }

    /// Creates an error response: `{"success": false, "error_code": n}`.
    #[must_use]
    pub fn failure(id: ResponseId, code: ErrorCode) -> Self {
        Self::new(id)
            .with_result("success", false)
            .with_result("error_code", code.code())
    }

    /// Adds a result field.
    #[must_use]
    pub fn with_result(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a log line.
    #[must_use]
    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.log_msgs.push(line.into());
        self
    }

    /// Sets a result field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.result.insert(key.into(), value.into());
    }

    /// Appends log lines.
    pub fn extend_log(&mut self, lines: impl IntoIterator<Item = String>) {
        self.log_msgs.extend(lines);
    }

    /// Overrides the echoed id.
    pub fn set_id(&mut self, id: ResponseId) {
        self.id = id;
    }

    /// Echoed id.
    #[must_use]
    pub const fn id(&self) -> ResponseId {
        self.id
    }

    /// Result object.
    #[must_use]
    pub const fn result(&self) -> &Map<String, Value> {
        &self.result
    }

    /// Log lines attached to the response.
    #[must_use]
    pub fn log_msgs(&self) -> &[String] {
        &self.log_msgs
    }

    /// Error code carried in the result, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.result.get("error_code").and_then(Value::as_i64)
    }

    /// Serializes the response as one newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}
