//! Client Trait
//!
//! This module defines the `ContainerApi` trait, the seam between the driver and
//! the remote container API. Implementors only provide [`ContainerApi::request`];
//! the verbs and the blocking wait are built on top of it.

use log::debug;
use serde_json::Value;
use std::time::Duration;

use super::types::{
    Method, Operation, Response, ResponseKind, STATUS_CREATED, STATUS_RUNNING, STATUS_SUCCESS,
};
use crate::error_handling::types::ContainerError;

pub trait ContainerApi: Send + Sync {
    /// Sends one request to `path` (relative to the API root, e.g.
    /// `containers/one-4/state`) and decodes the answer. Error envelopes are
    /// returned as `Err`.
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ContainerError>;

    fn get(&self, path: &str) -> Result<Response, ContainerError> {
        self.request(Method::Get, path, None)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Response, ContainerError> {
        self.request(Method::Post, path, Some(body))
    }

    fn put(&self, path: &str, body: &Value) -> Result<Response, ContainerError> {
        self.request(Method::Put, path, Some(body))
    }

    fn delete(&self, path: &str) -> Result<Response, ContainerError> {
        self.request(Method::Delete, path, None)
    }

    /// Blocks until the background operation behind `response` resolves or
    /// `timeout` elapses. Synchronous responses return immediately. A timeout only
    /// stops the local wait; the remote operation keeps running.
    fn wait(&self, response: &Response, timeout: Option<Duration>) -> Result<(), ContainerError> {
        if response.kind != ResponseKind::Async || response.operation.is_empty() {
            return Ok(());
        }

        let operation = response
            .operation
            .trim_start_matches('/')
            .trim_start_matches("1.0/");
        let secs = timeout.map_or(-1, wait_seconds);
        debug!("Waiting for {} (timeout {})", operation, secs);

        let waited = self.get(&format!("{}/wait?timeout={}", operation, secs))?;
        let op: Operation = waited.metadata_as()?;

        match op.status_code {
            STATUS_SUCCESS => Ok(()),
            STATUS_CREATED | STATUS_RUNNING => Err(ContainerError::Timeout(format!(
                "{} still {} after {}s",
                operation,
                op.status.to_lowercase(),
                secs
            ))),
            code => Err(ContainerError::RemoteOperation {
                code,
                message: op.err,
            }),
        }
    }
}

/// Whole seconds for the remote wait parameter, rounded up and never below one.
fn wait_seconds(timeout: Duration) -> i64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    i64::try_from(secs.max(1)).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_seconds_round_up() {
        assert_eq!(wait_seconds(Duration::from_secs(30)), 30);
        assert_eq!(wait_seconds(Duration::from_millis(1200)), 2);
        assert_eq!(wait_seconds(Duration::from_millis(1)), 1);
        assert_eq!(wait_seconds(Duration::ZERO), 1);
    }
}
