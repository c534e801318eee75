use log::{debug, error, info};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::lock::{LockGuard, NamedLock};
use super::types::{CommandResult, ShellCommand};
use crate::configuration::Config;
use crate::error_handling::types::ContainerError;

/// Runs external commands on behalf of the driver.
///
/// Every call blocks until the command exits. An `Err` means the command could not
/// be run at all; a non-zero exit status is reported through [`CommandResult`].
pub trait Executor: Send + Sync {
    /// Runs `command` with stdin closed and captures its output.
    fn execute(&self, command: &ShellCommand) -> Result<CommandResult, ContainerError>;

    /// Starts `command` detached unless a process with the same command line is
    /// already running.
    fn execute_once(&self, command: &ShellCommand) -> Result<(), ContainerError>;

    /// Acquires the named lock shared by every driver process on the host.
    fn lock(&self, name: &str) -> Result<LockGuard, ContainerError>;
}

pub struct SystemExecutor {
    lock_dir: PathBuf,
    pgrep: String,
}

impl SystemExecutor {
    pub fn new(config: &Config) -> Self {
        Self {
            lock_dir: config.lock_path.clone(),
            pgrep: config.commands.pgrep.clone(),
        }
    }
}

impl Executor for SystemExecutor {
    fn execute(&self, command: &ShellCommand) -> Result<CommandResult, ContainerError> {
        debug!("Running: {}", command);

        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                error!("Failed to spawn {}: {}", command.program, e);
                ContainerError::IoError(e)
            })?;

        let result = CommandResult::from(output);
        debug!("{} exited with {}", command.program, result.exit_code);
        Ok(result)
    }

    fn execute_once(&self, command: &ShellCommand) -> Result<(), ContainerError> {
        let check = ShellCommand::from_line(&self.pgrep).arg(command.to_string());
        if self.execute(&check)?.success() {
            debug!("{} already running", command);
            return Ok(());
        }

        Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                error!("Failed to start {}: {}", command, e);
                ContainerError::IoError(e)
            })?;

        info!("Started {}", command);
        Ok(())
    }

    fn lock(&self, name: &str) -> Result<LockGuard, ContainerError> {
        NamedLock::acquire(&self.lock_dir, name)
    }
}
