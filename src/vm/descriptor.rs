//! Descriptor Trait
//!
//! `VmDescriptor` is the view the driver has of the virtual machine a container
//! was derived from: its disks and NICs, the context volume, the datastore
//! layout and the translation into container attributes.

use super::types::{Disk, Nic};
use crate::container_management::types::{ContainerAttributes, Devices};

pub trait VmDescriptor: Send + Sync {
    fn vm_id(&self) -> u32;

    /// System datastore holding the VM directory.
    fn sysds_id(&self) -> u32;

    /// Base path of all datastores.
    fn ds_path(&self) -> &str;

    /// Id of the disk backing the container root filesystem.
    fn rootfs_id(&self) -> u32;

    /// Disks in their declared order.
    fn disks(&self) -> &[Disk];

    fn nic_by_mac(&self, mac: &str) -> Option<&Nic>;

    /// Device map entry for `nic`.
    fn nic_device(&self, nic: &Nic) -> Devices;

    /// Device map entry for `disk`, mounted from `source` when given.
    fn disk_device(&self, disk: &Disk, source: Option<&str>) -> Devices;

    fn has_context(&self) -> bool;

    fn context_disk(&self) -> Option<&Disk>;

    /// Inserts the `context` entry into `devices`.
    fn context_device(&self, devices: &mut Devices);

    /// Host path where disk `disk_id` is mapped.
    fn disk_mountpoint(&self, disk_id: u32) -> String;

    /// Command for the console relay matching `signal`, if any.
    fn console_command(&self, signal: &str) -> Option<String>;

    /// True for VMs imported from an existing container.
    fn is_wild(&self) -> bool;

    /// Attributes of the container to create for this VM.
    fn to_container(&self) -> ContainerAttributes;

    fn vm_dir(&self) -> String {
        format!("{}/{}/{}", self.ds_path(), self.sysds_id(), self.vm_id())
    }

    /// Backing image of `disk` inside the VM directory.
    fn disk_image_path(&self, disk: &Disk) -> String {
        format!("{}/disk.{}", self.vm_dir(), disk.id)
    }
}
