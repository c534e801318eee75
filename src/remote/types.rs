use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error_handling::types::ContainerError;

/// Operation status codes reported by the remote API.
pub const STATUS_CREATED: i64 = 100;
pub const STATUS_RUNNING: i64 = 103;
pub const STATUS_SUCCESS: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Sync,
    Async,
    Error,
}

/// Response envelope. Attributes of the addressed resource live under `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub metadata: Value,
}

impl Response {
    pub fn sync(metadata: Value) -> Self {
        Self {
            kind: ResponseKind::Sync,
            status: String::from("Success"),
            status_code: STATUS_SUCCESS,
            error_code: 0,
            error: String::new(),
            operation: String::new(),
            metadata,
        }
    }

    pub fn asynchronous(operation: &str) -> Self {
        Self {
            kind: ResponseKind::Async,
            status: String::from("Operation created"),
            status_code: STATUS_CREATED,
            error_code: 0,
            error: String::new(),
            operation: operation.to_string(),
            metadata: Value::Null,
        }
    }

    pub fn error(code: i64, message: &str) -> Self {
        Self {
            kind: ResponseKind::Error,
            status: String::new(),
            status_code: 0,
            error_code: code,
            error: message.to_string(),
            operation: String::new(),
            metadata: Value::Null,
        }
    }

    /// Turns an error envelope into the matching [`ContainerError`].
    pub fn into_result(self, path: &str) -> Result<Self, ContainerError> {
        match (self.kind, self.error_code) {
            (ResponseKind::Error, 404) => Err(ContainerError::NotFound(path.to_string())),
            (ResponseKind::Error, code) => Err(ContainerError::RemoteOperation {
                code,
                message: self.error,
            }),
            _ => Ok(self),
        }
    }

    pub fn metadata_as<T: DeserializeOwned>(&self) -> Result<T, ContainerError> {
        Ok(serde_json::from_value(self.metadata.clone())?)
    }
}

/// Background operation as returned by `operations/<id>/wait`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub err: String,
}
