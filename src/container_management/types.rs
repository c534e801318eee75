//! Core types used by the container management subsystem.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Key/value configuration of one device.
pub type DeviceConfig = BTreeMap<String, String>;

/// Device map keyed by device name (`disk<ID>`, `eth<ID>`, `context`, ...).
pub type Devices = BTreeMap<String, DeviceConfig>;

/// Device key of the contextualization volume.
pub const CONTEXT_DEVICE: &str = "context";

/// Mirror of the remote container attributes.
///
/// The nine attributes the driver works with are typed fields; everything else the
/// remote returns is kept in `extra` and sent back untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerAttributes {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub devices: Devices,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(default, rename = "profiles")]
    pub profile: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expanded_config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expanded_devices: Devices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Actions accepted by the `state` sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
    Freeze,
    Unfreeze,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
            LifecycleAction::Freeze => "freeze",
            LifecycleAction::Unfreeze => "unfreeze",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blocking behaviour of a remote call.
///
/// With `wait == false` the call returns as soon as the remote accepted the
/// request, without confirming completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub wait: bool,
    /// Falls back to the configured operation timeout when `None`.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            wait: true,
            timeout: None,
        }
    }
}

impl WaitOptions {
    pub fn no_wait() -> Self {
        Self {
            wait: false,
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            wait: true,
            timeout: Some(timeout),
        }
    }
}

/// Options of a state change (start, stop, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateOptions {
    pub force: bool,
    pub stateful: bool,
    pub wait: WaitOptions,
}

/// Body of a `PUT containers/<name>/state` request.
#[derive(Debug, Clone, Serialize)]
pub struct StateChange {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    pub force: bool,
    pub stateful: bool,
}

impl StateChange {
    pub fn new(action: LifecycleAction, options: &StateOptions) -> Self {
        Self {
            action: action.as_str(),
            timeout: options.wait.timeout.map(|t| t.as_secs()),
            force: options.force,
            stateful: options.stateful,
        }
    }
}

/// Runtime state as reported by `containers/<name>/state`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContainerState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub pid: i64,
    #[serde(default)]
    pub processes: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
