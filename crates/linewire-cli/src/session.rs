//! One client connection: write a request line, read a response line.

use std::time::Duration;

use serde_json::{Map, Value, json};

use linewired::transport::{Endpoint, LineEnd, LineRead};

use crate::errors::AppError;

const MAX_RESPONSE_LEN: usize = 1 << 20;

pub(crate) struct Session {
    endpoint: Endpoint,
    timeout: Duration,
}

impl Session {
    pub(crate) fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, AppError> {
        let endpoint = Endpoint::client(host, port)
            .with_name("linewire client")
            .with_connect_timeout(timeout);
        endpoint.open().map_err(AppError::Connect)?;
        Ok(Self { endpoint, timeout })
    }

    /// Sends one request and waits for its response.
    pub(crate) fn call(
        &self,
        id: i64,
        method: &str,
        params: &[(String, Value)],
    ) -> Result<Value, AppError> {
        let line = request_line(id, method, params)?;
        self.endpoint.write(&line).map_err(AppError::SendRequest)?;
        match self.endpoint.read_line(MAX_RESPONSE_LEN, self.timeout, true) {
            Ok(LineRead::Line {
                end: LineEnd::Capped,
                ..
            }) => Err(AppError::ResponseTooLong {
                limit: MAX_RESPONSE_LEN,
            }),
            Ok(LineRead::Line { bytes, .. }) => {
                serde_json::from_slice(&bytes).map_err(AppError::ParseResponse)
            }
            Ok(LineRead::TimedOut) => Err(AppError::NoResponse {
                timeout_ms: self.timeout.as_millis(),
            }),
            Err(source) => Err(AppError::ReadResponse(source)),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.endpoint.close();
    }
}

pub(crate) fn request_line(
    id: i64,
    method: &str,
    params: &[(String, Value)],
) -> Result<Vec<u8>, AppError> {
    let params: Map<String, Value> = params.iter().cloned().collect();
    let request = json!({"id": id, "method": method, "params": params});
    let mut line = serde_json::to_vec(&request).map_err(AppError::SerialiseRequest)?;
    line.push(b'\n');
    Ok(line)
}
