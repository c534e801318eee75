//! Storage Attachment Manager
//!
//! Batch mapping of every VM disk, the context volume and single-disk hotplug.
//! A mapper step that fails ends the operation with `Ok(false)` and leaves the
//! record as it was at that point; nothing is rolled back.

use log::{debug, error, info, warn};

use super::container::{require_vm, Container};
use crate::container_management::types::{WaitOptions, CONTEXT_DEVICE};
use crate::error_handling::types::ContainerError;
use crate::mapper::{MapOperation, Mapper};
use crate::process::ShellCommand;
use crate::vm::{Disk, VmDescriptor};

/// Device key of a VM disk.
pub fn disk_device_name(disk: &Disk) -> String {
    format!("disk{}", disk.id)
}

/// Routes a datastore path through the mapper directory:
/// `<dir>/disk.N` becomes `<dir>/mapper/disk.N`.
pub fn mapper_source(source: &str) -> String {
    match source.find("/disk.") {
        Some(at) => format!("{}/mapper{}", &source[..at], &source[at..]),
        None => {
            warn!("No disk component in {}, using it as is", source);
            source.to_string()
        }
    }
}

impl Container {
    /// Maps or unmaps every disk in declared order, then the context volume.
    /// Stops at the first disk that fails.
    pub fn setup_storage(&self, operation: MapOperation) -> Result<bool, ContainerError> {
        let Some(vm) = self.vm.as_deref() else {
            debug!("No VM description for {}, skipping storage setup", self.name());
            return Ok(false);
        };

        for disk in vm.disks() {
            if !self.setup_disk(disk, operation)? {
                error!(
                    "Failed to {} disk {} of {}, stopping",
                    operation,
                    disk.id,
                    self.name()
                );
                return Ok(false);
            }
        }

        let Some(context) = vm.context_disk() else {
            return Ok(true);
        };

        let source = self.context_source(vm, context);
        let context_path = self.ctx.config.context_path(self.name());
        let mkdir = ShellCommand::from_line(&self.ctx.config.commands.su_mkdir)
            .arg(context_path.display().to_string());
        let result = self.ctx.executor.execute(&mkdir)?;
        if !result.success() {
            error!("setup_storage: {}", result.stderr.trim());
            return Ok(false);
        }

        self.ctx
            .dispatcher()
            .raw_filesystem()
            .apply(operation, vm, context, &source)
    }

    /// Adds the context device and maps the context volume. The record is pushed
    /// only when the mapping succeeded.
    pub fn attach_context(&mut self) -> Result<bool, ContainerError> {
        let vm = require_vm(&self.vm, "attach_context")?;
        let Some(context) = vm.context_disk() else {
            return Err(ContainerError::MissingPrecondition(format!(
                "VM {} has no context disk",
                vm.vm_id()
            )));
        };

        vm.context_device(&mut self.attributes.devices);
        let source = self.context_source(vm, context);

        if !self.ctx.dispatcher().raw_filesystem().map(vm, context, &source)? {
            error!("Failed to map context of {}", self.name());
            return Ok(false);
        }

        self.update(WaitOptions::default())?;
        info!("Context attached to {}", self.name());
        Ok(true)
    }

    /// Removes the context device, pushes the record, then unmaps the volume.
    pub fn detach_context(&mut self) -> Result<bool, ContainerError> {
        let vm = require_vm(&self.vm, "detach_context")?;
        let Some(context) = vm.context_disk() else {
            return Ok(false);
        };

        let Some(entry) = self.attributes.devices.remove(CONTEXT_DEVICE) else {
            debug!("{} has no context device", self.name());
            return Ok(false);
        };
        let source = entry
            .get("source")
            .cloned()
            .unwrap_or_else(|| vm.disk_mountpoint(context.id));

        self.update(WaitOptions::default())?;

        self.ctx
            .dispatcher()
            .raw_filesystem()
            .unmap(vm, context, &source)
    }

    /// First disk flagged for hotplug.
    pub fn hotplug_disk(&self) -> Option<&Disk> {
        self.vm.as_ref()?.disks().iter().find(|disk| disk.attach)
    }

    /// Maps the hotplug disk and adds its device. `source` is the datastore path of
    /// the disk image; the device is mounted from its mapper location.
    pub fn attach_disk(&mut self, source: Option<&str>) -> Result<bool, ContainerError> {
        let vm = require_vm(&self.vm, "attach_disk")?;
        let disk = self
            .hotplug_disk()
            .cloned()
            .ok_or_else(|| ContainerError::MissingPrecondition("missing hotplug disk".into()))?;

        if !self.setup_disk(&disk, MapOperation::Map)? {
            return Ok(false);
        }

        let mapped = source.map(mapper_source);
        let device = vm.disk_device(&disk, mapped.as_deref());
        self.attributes.devices.extend(device);

        self.update(WaitOptions::default())?;
        info!("Disk {} attached to {}", disk.id, self.name());
        Ok(true)
    }

    /// Removes the hotplug disk device, pushes the record, then unmaps the disk.
    /// Without a hotplug disk nothing happens.
    pub fn detach_disk(&mut self) -> Result<bool, ContainerError> {
        let Some(disk) = self.hotplug_disk().cloned() else {
            debug!("No hotplug disk on {}", self.name());
            return Ok(false);
        };
        let vm = require_vm(&self.vm, "detach_disk")?;

        let key = disk_device_name(&disk);
        let Some(entry) = self.attributes.devices.remove(&key) else {
            return Err(ContainerError::MissingPrecondition(format!(
                "{} has no device {}",
                self.name(),
                key
            )));
        };
        let source = entry
            .get("source")
            .cloned()
            .unwrap_or_else(|| vm.disk_mountpoint(disk.id));

        self.update(WaitOptions::default())?;

        self.ctx.dispatcher().select(vm, &disk)?.unmap(vm, &disk, &source)
    }

    /// Maps or unmaps one disk. The root disk goes to the container rootfs, other
    /// disks to their mount point.
    pub fn setup_disk(&self, disk: &Disk, operation: MapOperation) -> Result<bool, ContainerError> {
        let Some(vm) = self.vm.as_deref() else {
            return Ok(false);
        };

        let target = if disk.id == vm.rootfs_id() {
            self.ctx.config.rootfs_path(self.name()).display().to_string()
        } else {
            vm.disk_mountpoint(disk.id)
        };

        self.ctx
            .dispatcher()
            .select(vm, disk)?
            .apply(operation, vm, disk, &target)
    }

    fn context_source(&self, vm: &dyn VmDescriptor, context: &Disk) -> String {
        self.attributes
            .devices
            .get(CONTEXT_DEVICE)
            .and_then(|entry| entry.get("source"))
            .cloned()
            .unwrap_or_else(|| vm.disk_mountpoint(context.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapper_source_rewrite() {
        assert_eq!(
            mapper_source("/var/lib/one/datastores/0/7/disk.2"),
            "/var/lib/one/datastores/0/7/mapper/disk.2"
        );
        assert_eq!(mapper_source("/srv/volume"), "/srv/volume");
    }
}
