use log::{error, info};

use super::mapper_trait::Mapper;
use super::mount::MountTool;
use crate::error_handling::types::ContainerError;
use crate::vm::{Disk, VmDescriptor};

/// Image holding a bare filesystem, attached through a loop device.
#[derive(Clone)]
pub struct FsRawMapper {
    tool: MountTool,
}

impl FsRawMapper {
    pub fn new(tool: MountTool) -> Self {
        Self { tool }
    }
}

impl Mapper for FsRawMapper {
    fn map(&self, vm: &dyn VmDescriptor, disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        let image = vm.disk_image_path(disk);
        let Some(device) = self.tool.losetup_attach(&image, false)? else {
            error!("No loop device attached for {}", image);
            return Ok(false);
        };

        info!("Mapping {} ({}) on {}", image, device, target);
        self.tool
            .mount_or_release(&device, target, |dev| self.tool.losetup_detach(dev))
    }

    fn unmap(&self, _vm: &dyn VmDescriptor, _disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        info!("Unmapping {}", target);
        self.tool
            .unmount_and_release(target, |dev| self.tool.losetup_detach(dev))
    }
}

/// Partitioned disk image; the first partition carrying a filesystem is mounted.
#[derive(Clone)]
pub struct DiskRawMapper {
    tool: MountTool,
}

impl DiskRawMapper {
    pub fn new(tool: MountTool) -> Self {
        Self { tool }
    }
}

impl Mapper for DiskRawMapper {
    fn map(&self, vm: &dyn VmDescriptor, disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        let image = vm.disk_image_path(disk);
        let Some(device) = self.tool.losetup_attach(&image, true)? else {
            error!("No loop device attached for {}", image);
            return Ok(false);
        };

        info!("Mapping partitions of {} ({}) on {}", image, device, target);
        self.tool
            .mount_or_release(&device, target, |dev| self.tool.losetup_detach(dev))
    }

    fn unmap(&self, _vm: &dyn VmDescriptor, _disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        info!("Unmapping {}", target);
        self.tool
            .unmount_and_release(target, |dev| self.tool.losetup_detach(dev))
    }
}
