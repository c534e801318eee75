//! Host mount helpers shared by the mappers.

use log::{debug, error, warn};
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::configuration::CommandSettings;
use crate::error_handling::types::ContainerError;
use crate::process::{CommandResult, Executor, ShellCommand};

/// Whole device behind a partition node, e.g. `/dev/nbd0p1` -> `/dev/nbd0`.
pub fn parent_device(device: &str) -> String {
    static PARTITION: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PARTITION.get_or_init(|| Regex::new(r"^(/dev/(?:loop|nbd)\d+)p\d+$").ok());

    pattern
        .as_ref()
        .and_then(|re| re.captures(device))
        .and_then(|caps| caps.get(1))
        .map_or_else(|| device.to_string(), |m| m.as_str().to_string())
}

#[derive(Clone)]
pub struct MountTool {
    executor: Arc<dyn Executor>,
    commands: CommandSettings,
}

impl MountTool {
    pub fn new(executor: Arc<dyn Executor>, commands: CommandSettings) -> Self {
        Self { executor, commands }
    }

    pub fn commands(&self) -> &CommandSettings {
        &self.commands
    }

    /// Runs `command` and logs a non-zero exit.
    pub fn run(&self, command: &ShellCommand) -> Result<CommandResult, ContainerError> {
        let result = self.executor.execute(command)?;
        if !result.success() {
            error!(
                "{} failed ({}): {}",
                command,
                result.exit_code,
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    pub fn succeeds(&self, command: &ShellCommand) -> Result<bool, ContainerError> {
        Ok(self.run(command)?.success())
    }

    /// First non-empty line printed by a successful `command`.
    pub fn output_line(&self, command: &ShellCommand) -> Result<Option<String>, ContainerError> {
        let result = self.run(command)?;
        if !result.success() {
            return Ok(None);
        }
        Ok(result
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from))
    }

    pub fn mount(&self, device: &str, target: &str) -> Result<bool, ContainerError> {
        let mkdir = ShellCommand::from_line(&self.commands.su_mkdir).arg(target);
        if !self.succeeds(&mkdir)? {
            return Ok(false);
        }

        debug!("Mounting {} on {}", device, target);
        self.succeeds(&ShellCommand::from_line(&self.commands.mount).args([device, target]))
    }

    pub fn umount(&self, target: &str) -> Result<bool, ContainerError> {
        debug!("Unmounting {}", target);
        self.succeeds(&ShellCommand::from_line(&self.commands.umount).arg(target))
    }

    /// Device currently mounted at `target`.
    pub fn mounted_device(&self, target: &str) -> Result<Option<String>, ContainerError> {
        self.output_line(&ShellCommand::from_line(&self.commands.findmnt).arg(target))
    }

    /// First node of `device` (the device itself or one of its partitions) that
    /// carries a filesystem.
    pub fn filesystem_partition(&self, device: &str) -> Result<Option<String>, ContainerError> {
        let result = self.run(&ShellCommand::from_line(&self.commands.lsblk).arg(device))?;
        if !result.success() {
            return Ok(None);
        }

        Ok(result.stdout.lines().find_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(name), Some(_fstype)) => Some(name.to_string()),
                _ => None,
            }
        }))
    }

    /// Attaches `image` to the first free loop device and returns it.
    pub fn losetup_attach(
        &self,
        image: &str,
        partscan: bool,
    ) -> Result<Option<String>, ContainerError> {
        let mut command = ShellCommand::from_line(&self.commands.losetup).args(["--find", "--show"]);
        if partscan {
            command = command.arg("--partscan");
        }
        self.output_line(&command.arg(image))
    }

    pub fn losetup_detach(&self, device: &str) -> Result<bool, ContainerError> {
        self.succeeds(&ShellCommand::from_line(&self.commands.losetup).args(["-d", device]))
    }

    /// Mounts the filesystem found on `device` at `target`. When the mount fails
    /// `release` is called with `device` and the result is `false`.
    pub fn mount_or_release<F>(
        &self,
        device: &str,
        target: &str,
        release: F,
    ) -> Result<bool, ContainerError>
    where
        F: FnOnce(&str) -> Result<bool, ContainerError>,
    {
        let source = self
            .filesystem_partition(device)?
            .unwrap_or_else(|| device.to_string());

        if self.mount(&source, target)? {
            return Ok(true);
        }

        warn!("Releasing {} after failed mount on {}", device, target);
        release(device)?;
        Ok(false)
    }

    /// Unmounts `target` and hands the whole backing device to `release`.
    /// A target with nothing mounted counts as released.
    pub fn unmount_and_release<F>(&self, target: &str, release: F) -> Result<bool, ContainerError>
    where
        F: FnOnce(&str) -> Result<bool, ContainerError>,
    {
        let Some(device) = self.mounted_device(target)? else {
            warn!("Nothing mounted on {}", target);
            return Ok(true);
        };

        if !self.umount(target)? {
            return Ok(false);
        }
        release(&parent_device(&device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeExecutor, Journal};

    fn tool(executor: &Arc<FakeExecutor>) -> MountTool {
        MountTool::new(executor.clone(), CommandSettings::default())
    }

    #[test]
    fn test_parent_device() {
        assert_eq!(parent_device("/dev/nbd3p2"), "/dev/nbd3");
        assert_eq!(parent_device("/dev/loop0p1"), "/dev/loop0");
        assert_eq!(parent_device("/dev/loop4"), "/dev/loop4");
        assert_eq!(parent_device("/dev/rbd0"), "/dev/rbd0");
    }

    #[test]
    fn test_filesystem_partition_skips_bare_devices() {
        let executor = Arc::new(FakeExecutor::new(Journal::default()));
        executor.on_stdout(
            "lsblk",
            "/dev/loop2\n/dev/loop2p1 vfat\n/dev/loop2p2 ext4\n",
        );
        assert_eq!(
            tool(&executor).filesystem_partition("/dev/loop2").unwrap(),
            Some("/dev/loop2p1".to_string())
        );
    }

    #[test]
    fn test_failed_mount_releases_device() {
        let executor = Arc::new(FakeExecutor::new(Journal::default()));
        executor.on_failure("mount /dev/loop1");
        let mut released = None;

        let mapped = tool(&executor)
            .mount_or_release("/dev/loop1", "/mnt/disk.1", |dev| {
                released = Some(dev.to_string());
                Ok(true)
            })
            .unwrap();

        assert!(!mapped);
        assert_eq!(released.as_deref(), Some("/dev/loop1"));
    }

    #[test]
    fn test_unmount_of_empty_target_is_noop() {
        let executor = Arc::new(FakeExecutor::new(Journal::default()));
        executor.on_stdout("findmnt", "");

        let done = tool(&executor)
            .unmount_and_release("/mnt/disk.1", |_| panic!("nothing to release"))
            .unwrap();
        assert!(done);
        assert!(!executor.ran("umount"));
    }
}
