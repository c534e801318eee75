//! Network Attachment Manager
//!
//! NIC devices are keyed by the VM NIC index (`eth<N>`) and matched by hardware
//! address, compared without regard to letter case.

use log::{debug, info};

use super::container::{require_vm, Container};
use crate::container_management::types::WaitOptions;
use crate::error_handling::types::ContainerError;

impl Container {
    /// Adds the device of the VM NIC with hardware address `mac` and pushes it.
    pub fn attach_nic(&mut self, mac: &str) -> Result<(), ContainerError> {
        let vm = require_vm(&self.vm, "attach_nic")?;
        let nic = vm.nic_by_mac(mac).ok_or_else(|| {
            ContainerError::MissingPrecondition(format!("no NIC with address {}", mac))
        })?;

        self.attributes.devices.extend(vm.nic_device(nic));
        self.update(WaitOptions::default())?;
        info!("NIC {} attached to {}", mac, self.name());
        Ok(())
    }

    /// Drops every ethernet device with hardware address `mac` and pushes the
    /// record. Returns how many devices were removed.
    pub fn detach_nic(&mut self, mac: &str) -> Result<usize, ContainerError> {
        let before = self.attributes.devices.len();
        self.attributes.devices.retain(|name, config| {
            let same_address = config
                .get("hwaddr")
                .is_some_and(|hwaddr| hwaddr.eq_ignore_ascii_case(mac));
            !(name.contains("eth") && same_address)
        });
        let removed = before - self.attributes.devices.len();
        debug!("Removed {} devices with address {} from {}", removed, mac, self.name());

        self.update(WaitOptions::default())?;
        Ok(removed)
    }
}
