use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};

use super::mapper_trait::Mapper;
use super::mount::MountTool;
use crate::error_handling::types::ContainerError;
use crate::process::ShellCommand;
use crate::vm::{Disk, VmDescriptor};

const SYS_BLOCK: &str = "/sys/block";

/// qcow2 image exported through the network block device driver.
#[derive(Clone)]
pub struct Qcow2Mapper {
    tool: MountTool,
    sys_block: PathBuf,
}

impl Qcow2Mapper {
    pub fn new(tool: MountTool) -> Self {
        Self::with_sys_block(tool, SYS_BLOCK)
    }

    /// Uses `root` instead of `/sys/block` to look for free nbd devices.
    pub fn with_sys_block<P: AsRef<Path>>(tool: MountTool, root: P) -> Self {
        Self {
            tool,
            sys_block: root.as_ref().to_path_buf(),
        }
    }

    /// Lowest numbered `/dev/nbdN` with no image connected (size 0).
    pub fn free_device(&self) -> Option<String> {
        let entries = fs::read_dir(&self.sys_block).ok()?;
        let mut free: Vec<u32> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let index = name.strip_prefix("nbd")?.parse::<u32>().ok()?;
                let size = fs::read_to_string(entry.path().join("size")).ok()?;
                (size.trim() == "0").then_some(index)
            })
            .collect();
        free.sort_unstable();

        free.first().map(|n| format!("/dev/nbd{}", n))
    }

    fn disconnect(&self, device: &str) -> Result<bool, ContainerError> {
        debug!("Disconnecting {}", device);
        self.tool
            .succeeds(&ShellCommand::from_line(&self.tool.commands().qemu_nbd).args(["-d", device]))
    }
}

impl Mapper for Qcow2Mapper {
    fn map(&self, vm: &dyn VmDescriptor, disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        let image = vm.disk_image_path(disk);
        let Some(device) = self.free_device() else {
            error!("No free nbd device to map {}", image);
            return Ok(false);
        };

        let connect = ShellCommand::from_line(&self.tool.commands().qemu_nbd).args([
            "--fork",
            "-c",
            device.as_str(),
            image.as_str(),
        ]);
        if !self.tool.succeeds(&connect)? {
            return Ok(false);
        }

        info!("Mapping {} ({}) on {}", image, device, target);
        self.tool
            .mount_or_release(&device, target, |dev| self.disconnect(dev))
    }

    fn unmap(&self, _vm: &dyn VmDescriptor, _disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        info!("Unmapping {}", target);
        self.tool
            .unmount_and_release(target, |dev| self.disconnect(dev))
    }
}
