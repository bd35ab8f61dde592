//! Request decoding for the dispatch loop.
//!
//! A request is a JSON object with an optional string `method`, an optional
//! integer `id` and an optional `params` object. Decoding is lenient about
//! everything except the outer shape: a missing id becomes [`MISSING_ID`], a
//! fractional id is truncated, and a non-object `params` is replaced by an
//! empty map with a note for the response log.

use serde_json::{Map, Value};

use super::errors::DispatchError;

/// Id reported when the request carries none.
pub const MISSING_ID: i64 = -9999;

/// Decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: i64,
    method: Option<String>,
    params: Params,
    notes: Vec<String>,
}

impl Request {
    /// Builds a request directly, mainly for tests and embedders.
    pub fn new(id: i64, method: impl Into<String>) -> Self {
        Self {
            id,
            method: Some(method.into()),
            params: Params::default(),
            notes: Vec::new(),
        }
    }

    /// Replaces the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Params(params);
        self
    }

    /// Decodes one frame.
    ///
    /// Surrounding ASCII whitespace is trimmed before parsing.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Malformed`] when the frame is empty, is not
    /// valid JSON, or is not a JSON object.
    pub fn decode(frame: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = frame.trim_ascii();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }
        let value: Value = serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)?;
        let Value::Object(mut object) = value else {
            return Err(DispatchError::malformed("request is not a JSON object"));
        };

        let id = object.get("id").and_then(integer_id).unwrap_or(MISSING_ID);
        let method = object
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let mut notes = Vec::new();
        let params = match object.remove("params") {
            Some(Value::Object(params)) => Params(params),
            None | Some(Value::Null) => Params::default(),
            Some(other) => {
                notes.push(format!(
                    "ignored params: expected an object, found {}",
                    json_kind(&other)
                ));
                Params::default()
            }
        };
        Ok(Self {
            id,
            method,
            params,
            notes,
        })
    }

    /// Correlation id, or [`MISSING_ID`].
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Method name, when present.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Request parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Notes raised while decoding, reported in the response log.
    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

/// Request parameters keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Integer value for `key`; fractional numbers are truncated.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(integer_id)
    }

    /// Floating-point value for `key`.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Boolean value for `key`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying JSON map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// Fractional numbers truncate towards zero; out-of-range values saturate.
#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` truncates towards zero and saturates, which is the wanted id rule"
)]
fn integer_id(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|float| float as i64))
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn decodes_a_full_request() {
        let request = Request::decode(
            br#"{"method":"status","id":7,"params":{"name":"x","n":2,"r":0.5,"on":true}}"#,
        )
        .expect("decode request");
        assert_eq!(request.id(), 7);
        assert_eq!(request.method(), Some("status"));
        assert_eq!(request.params().get_str("name"), Some("x"));
        assert_eq!(request.params().get_i64("n"), Some(2));
        assert_eq!(request.params().get_f64("r"), Some(0.5));
        assert_eq!(request.params().get_bool("on"), Some(true));
        assert!(request.notes().is_empty());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let request = Request::decode(b"  {\"method\":\"quit\",\"id\":1}\r\n").expect("decode");
        assert_eq!(request.method(), Some("quit"));
    }

    #[rstest]
    #[case(br#"{"method":"status"}"#.as_slice(), MISSING_ID)]
    #[case(br#"{"method":"status","id":"3"}"#.as_slice(), MISSING_ID)]
    #[case(br#"{"method":"status","id":4.9}"#.as_slice(), 4)]
    #[case(br#"{"method":"status","id":-2}"#.as_slice(), -2)]
    fn resolves_ids(#[case] frame: &[u8], #[case] expected: i64) {
        assert_eq!(Request::decode(frame).expect("decode").id(), expected);
    }

    #[rstest]
    #[case(br#"{"id":1}"#.as_slice())]
    #[case(br#"{"id":1,"method":5}"#.as_slice())]
    fn method_is_absent_unless_a_string(#[case] frame: &[u8]) {
        assert_eq!(Request::decode(frame).expect("decode").method(), None);
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"   ".as_slice())]
    #[case(b"not json".as_slice())]
    #[case(b"[1,2,3]".as_slice())]
    #[case(b"42".as_slice())]
    fn rejects_non_object_frames(#[case] frame: &[u8]) {
        let error = Request::decode(frame).expect_err("frame should be rejected");
        assert!(matches!(error, DispatchError::Malformed { .. }));
    }

    #[test]
    fn non_object_params_are_replaced_with_a_note() {
        let request =
            Request::decode(br#"{"method":"m","id":1,"params":[1]}"#).expect("decode request");
        assert!(request.params().is_empty());
        assert_eq!(request.notes().len(), 1);
    }
}
