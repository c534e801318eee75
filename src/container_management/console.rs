//! Console Bridge
//!
//! Console commands are written to the input pipe of a long-lived relay
//! (`svncterm_server`). The relay is started on first use, and writes are
//! serialized across driver processes by a named lock held only around the
//! write.

use log::{debug, error, info};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use super::container::Container;
use crate::configuration::ConsoleSettings;
use crate::error_handling::types::ContainerError;
use crate::process::{Executor, ShellCommand};

/// Name of the lock guarding the relay pipe.
pub const CONSOLE_LOCK: &str = "lxd-driver-console";

pub struct ConsoleBridge {
    executor: Arc<dyn Executor>,
    settings: ConsoleSettings,
}

impl ConsoleBridge {
    pub fn new(executor: Arc<dyn Executor>, settings: ConsoleSettings) -> Self {
        Self { executor, settings }
    }

    pub fn relay_command(&self) -> ShellCommand {
        ShellCommand::from_line(&self.settings.server_bin).args([
            "-w".to_string(),
            self.settings.width.to_string(),
            "-h".to_string(),
            self.settings.height.to_string(),
            "-t".to_string(),
            self.settings.timeout_secs.to_string(),
        ])
    }

    /// Ensures the relay runs and appends `command` to its pipe.
    pub fn deliver(&self, command: &str) -> Result<(), ContainerError> {
        self.executor.execute_once(&self.relay_command())?;

        let _guard = self.executor.lock(CONSOLE_LOCK)?;
        let mut pipe = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.settings.pipe_path)
            .map_err(|e| {
                error!(
                    "Failed to open console pipe {}: {}",
                    self.settings.pipe_path.display(),
                    e
                );
                ContainerError::IoError(e)
            })?;
        pipe.write_all(command.as_bytes())?;
        debug!("Delivered console command: {}", command.trim_end());
        Ok(())
    }
}

impl Container {
    /// Sends the console command matching `signal`. Returns false when the VM has
    /// no such command.
    pub fn vnc(&self, signal: &str) -> Result<bool, ContainerError> {
        let Some(command) = self.vm.as_ref().and_then(|vm| vm.console_command(signal)) else {
            debug!("No console command for {} on {}", signal, self.name());
            return Ok(false);
        };

        ConsoleBridge::new(self.ctx.executor.clone(), self.ctx.config.console.clone())
            .deliver(&command)?;
        info!("Console {} sent for {}", signal, self.name());
        Ok(true)
    }
}
