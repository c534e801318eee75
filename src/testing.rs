//! Recording fakes shared by the unit tests.
//!
//! `FakeExecutor` and `FakeApi` append to the same [`Journal`] so that tests can
//! assert on the relative order of remote pushes and host commands.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::error_handling::types::ContainerError;
use crate::process::{CommandResult, Executor, LockGuard, NamedLock, ShellCommand};
use crate::remote::{ContainerApi, Method, Response};
use crate::vm::VmTemplate;

pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Executor answering from substring rules; unmatched commands succeed silently.
pub(crate) struct FakeExecutor {
    journal: Journal,
    rules: Mutex<Vec<(String, CommandResult)>>,
    commands: Mutex<Vec<String>>,
    started: Mutex<Vec<String>>,
    lock_dir: TempDir,
}

impl FakeExecutor {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            rules: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            lock_dir: TempDir::new().unwrap(),
        }
    }

    /// First registered rule whose pattern occurs in the command line wins.
    pub(crate) fn on(&self, pattern: &str, result: CommandResult) {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), result));
    }

    pub(crate) fn on_stdout(&self, pattern: &str, stdout: &str) {
        self.on(
            pattern,
            CommandResult {
                stdout: stdout.to_string(),
                ..Default::default()
            },
        );
    }

    pub(crate) fn on_failure(&self, pattern: &str) {
        self.on(
            pattern,
            CommandResult {
                exit_code: 1,
                stderr: format!("{}: failed", pattern),
                ..Default::default()
            },
        );
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub(crate) fn ran(&self, pattern: &str) -> bool {
        self.commands().iter().any(|c| c.contains(pattern))
    }
}

impl Executor for FakeExecutor {
    fn execute(&self, command: &ShellCommand) -> Result<CommandResult, ContainerError> {
        let line = command.to_string();
        self.journal.lock().unwrap().push(format!("exec {}", line));
        self.commands.lock().unwrap().push(line.clone());

        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }

    fn execute_once(&self, command: &ShellCommand) -> Result<(), ContainerError> {
        let line = command.to_string();
        self.journal.lock().unwrap().push(format!("once {}", line));
        let mut started = self.started.lock().unwrap();
        if !started.contains(&line) {
            started.push(line);
        }
        Ok(())
    }

    fn lock(&self, name: &str) -> Result<LockGuard, ContainerError> {
        NamedLock::acquire(self.lock_dir.path(), name)
    }
}

/// In-memory container API.
///
/// State changes and writes answer with background operations whose final status is
/// `operation_status` (200 unless changed).
pub(crate) struct FakeApi {
    journal: Journal,
    containers: Mutex<BTreeMap<String, Value>>,
    failures: Mutex<Vec<(String, i64)>>,
    operation_status: Mutex<i64>,
    pushes: AtomicUsize,
    operations: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            containers: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(Vec::new()),
            operation_status: Mutex::new(200),
            pushes: AtomicUsize::new(0),
            operations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn insert(&self, name: &str, attributes: Value) {
        let mut attributes = attributes;
        attributes["name"] = json!(name);
        self.containers
            .lock()
            .unwrap()
            .insert(name.to_string(), attributes);
    }

    pub(crate) fn container(&self, name: &str) -> Option<Value> {
        self.containers.lock().unwrap().get(name).cloned()
    }

    /// Answers every request whose path contains `pattern` with error `code`.
    pub(crate) fn fail_on(&self, pattern: &str, code: i64) {
        self.failures
            .lock()
            .unwrap()
            .push((pattern.to_string(), code));
    }

    pub(crate) fn set_operation_status(&self, code: i64) {
        *self.operation_status.lock().unwrap() = code;
    }

    /// Number of full record updates received.
    pub(crate) fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        entries(&self.journal)
            .into_iter()
            .filter(|e| e.starts_with("api "))
            .collect()
    }

    fn operation(&self) -> Response {
        let id = self.operations.fetch_add(1, Ordering::SeqCst);
        Response::asynchronous(&format!("/1.0/operations/op-{}", id))
    }

    fn missing(path: &str) -> Result<Response, ContainerError> {
        Response::error(404, "not found").into_result(path)
    }
}

impl ContainerApi for FakeApi {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ContainerError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("api {} {}", method, path));

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| path.contains(pattern.as_str()))
            .map(|(_, code)| *code);
        if let Some(code) = failure {
            return Response::error(code, "injected failure").into_result(path);
        }

        let segments: Vec<&str> = path.split('?').next().unwrap_or("").split('/').collect();
        let mut containers = self.containers.lock().unwrap();

        match (method, segments.as_slice()) {
            (Method::Get, ["containers"]) => Ok(Response::sync(json!(containers
                .keys()
                .map(|n| format!("/1.0/containers/{}", n))
                .collect::<Vec<_>>()))),
            (Method::Get, ["containers", name]) => match containers.get(*name) {
                Some(c) => Ok(Response::sync(c.clone())),
                None => Self::missing(path),
            },
            (Method::Get, ["containers", name, "state"]) => match containers.get(*name) {
                Some(c) => Ok(Response::sync(json!({
                    "status": c["status"],
                    "status_code": c["status_code"],
                    "pid": 0,
                    "processes": 0,
                }))),
                None => Self::missing(path),
            },
            (Method::Post, ["containers"]) => {
                let mut record = body.cloned().unwrap_or_else(|| json!({}));
                record["status"] = json!("Stopped");
                record["status_code"] = json!(102);
                let name = record["name"].as_str().unwrap_or_default().to_string();
                containers.insert(name, record);
                Ok(self.operation())
            }
            (Method::Put, ["containers", name]) => {
                let previous = containers.get(*name).cloned().unwrap_or_else(|| json!({}));
                let mut record = body.cloned().unwrap_or_else(|| json!({}));
                record["status"] = previous["status"].clone();
                record["status_code"] = previous["status_code"].clone();
                containers.insert(name.to_string(), record);
                self.pushes.fetch_add(1, Ordering::SeqCst);
                Ok(self.operation())
            }
            (Method::Put, ["containers", name, "state"]) => {
                let Some(record) = containers.get_mut(*name) else {
                    return Self::missing(path);
                };
                let action = body.and_then(|b| b["action"].as_str()).unwrap_or_default();
                let (status, code) = match action {
                    "stop" => ("Stopped", 102),
                    "freeze" => ("Frozen", 110),
                    _ => ("Running", 103),
                };
                record["status"] = json!(status);
                record["status_code"] = json!(code);
                Ok(self.operation())
            }
            (Method::Delete, ["containers", name]) => match containers.remove(*name) {
                Some(_) => Ok(self.operation()),
                None => Self::missing(path),
            },
            (Method::Get, ["operations", id, "wait"]) => {
                let code = *self.operation_status.lock().unwrap();
                let (status, err) = match code {
                    200 => ("Success", ""),
                    103 => ("Running", ""),
                    _ => ("Failure", "operation failed"),
                };
                Ok(Response::sync(json!({
                    "id": id,
                    "status": status,
                    "status_code": code,
                    "err": err,
                })))
            }
            _ => Self::missing(path),
        }
    }
}

/// VM 7 on datastore `/ds/0`: root disk 0, file disk 1, RBD disk 2, one NIC,
/// context disk 3 and a VNC console.
pub(crate) fn vm_fixture() -> VmTemplate {
    VmTemplate::from_json(
        r#"{
            "vm_id": 7,
            "sysds_id": 0,
            "ds_path": "/ds",
            "rootfs_id": 0,
            "memory_mb": 256,
            "vcpu": 1,
            "disks": [
                {"id": 0, "type": "FILE"},
                {"id": 1, "type": "FILE"},
                {"id": 2, "type": "RBD", "source": "one/one-9"}
            ],
            "nics": [{"id": 0, "mac": "02:00:c0:a8:00:07", "bridge": "br0"}],
            "context": {"id": 3, "type": "FILE"},
            "graphics": {"type": "VNC", "port": 5907, "passwd": "pw"}
        }"#,
    )
    .unwrap()
}
