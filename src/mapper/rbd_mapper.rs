use log::{debug, error, info};

use super::mapper_trait::Mapper;
use super::mount::MountTool;
use crate::error_handling::types::ContainerError;
use crate::process::ShellCommand;
use crate::vm::{Disk, VmDescriptor};

/// Ceph RBD image exported through `rbd-nbd`.
#[derive(Clone)]
pub struct RbdMapper {
    tool: MountTool,
    ceph_user: Option<String>,
}

impl RbdMapper {
    /// Builds the mapper from the disk description; no probing is involved.
    pub fn new(tool: MountTool, disk: &Disk) -> Self {
        Self {
            tool,
            ceph_user: disk.ceph_user.clone(),
        }
    }

    /// `pool/image` to map, suffixed with the VM and disk ids for cloned images.
    pub fn image_name(vm: &dyn VmDescriptor, disk: &Disk) -> Result<String, ContainerError> {
        let source = disk.source.as_deref().ok_or_else(|| {
            ContainerError::MissingPrecondition(format!("disk {} has no RBD source", disk.id))
        })?;

        if disk.clone {
            Ok(format!("{}-{}-{}", source, vm.vm_id(), disk.id))
        } else {
            Ok(source.to_string())
        }
    }

    fn command(&self, action: &str) -> ShellCommand {
        let mut command = ShellCommand::from_line(&self.tool.commands().rbd_nbd).arg(action);
        if let Some(user) = &self.ceph_user {
            command = command.args(["--id", user.as_str()]);
        }
        command
    }

    fn release(&self, device: &str) -> Result<bool, ContainerError> {
        debug!("Unmapping rbd device {}", device);
        self.tool.succeeds(&self.command("unmap").arg(device))
    }
}

impl Mapper for RbdMapper {
    fn map(&self, vm: &dyn VmDescriptor, disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        let image = Self::image_name(vm, disk)?;
        let Some(device) = self.tool.output_line(&self.command("map").arg(image.as_str()))? else {
            error!("rbd-nbd did not map {}", image);
            return Ok(false);
        };

        info!("Mapping {} ({}) on {}", image, device, target);
        self.tool
            .mount_or_release(&device, target, |dev| self.release(dev))
    }

    fn unmap(&self, _vm: &dyn VmDescriptor, _disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        info!("Unmapping {}", target);
        self.tool
            .unmount_and_release(target, |dev| self.release(dev))
    }
}
