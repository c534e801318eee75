use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::descriptor::VmDescriptor;
use super::types::{Disk, Graphics, Nic};
use crate::container_management::types::{ContainerAttributes, DeviceConfig, Devices, CONTEXT_DEVICE};
use crate::error_handling::types::ContainerError;

fn default_ds_path() -> String {
    String::from("/var/lib/one/datastores")
}

/// VM description read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmTemplate {
    pub vm_id: u32,
    /// Container name, `one-<vm_id>` when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub sysds_id: u32,
    #[serde(default = "default_ds_path")]
    pub ds_path: String,
    #[serde(default)]
    pub rootfs_id: u32,
    #[serde(default)]
    pub memory_mb: Option<u64>,
    #[serde(default)]
    pub vcpu: Option<u32>,
    #[serde(default)]
    pub disks: Vec<Disk>,
    #[serde(default)]
    pub nics: Vec<Nic>,
    #[serde(default)]
    pub context: Option<Disk>,
    #[serde(default)]
    pub graphics: Option<Graphics>,
    #[serde(default)]
    pub wild: bool,
}

impl VmTemplate {
    pub fn from_json(content: &str) -> Result<Self, ContainerError> {
        serde_json::from_str(content).map_err(|e| ContainerError::InvalidTemplate(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ContainerError> {
        debug!("Reading VM description from {}", path.display());
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn container_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("one-{}", self.vm_id))
    }
}

fn entry(pairs: &[(&str, &str)]) -> DeviceConfig {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl VmDescriptor for VmTemplate {
    fn vm_id(&self) -> u32 {
        self.vm_id
    }

    fn sysds_id(&self) -> u32 {
        self.sysds_id
    }

    fn ds_path(&self) -> &str {
        &self.ds_path
    }

    fn rootfs_id(&self) -> u32 {
        self.rootfs_id
    }

    fn disks(&self) -> &[Disk] {
        &self.disks
    }

    fn nic_by_mac(&self, mac: &str) -> Option<&Nic> {
        self.nics.iter().find(|nic| nic.mac.eq_ignore_ascii_case(mac))
    }

    fn nic_device(&self, nic: &Nic) -> Devices {
        let name = format!("eth{}", nic.id);
        let mut config = entry(&[
            ("name", name.as_str()),
            ("type", "nic"),
            ("nictype", "bridged"),
            ("parent", nic.bridge.as_str()),
            ("hwaddr", nic.mac.as_str()),
        ]);
        if let Some(target) = &nic.target {
            config.insert("host_name".into(), target.clone());
        }
        Devices::from([(name, config)])
    }

    fn disk_device(&self, disk: &Disk, source: Option<&str>) -> Devices {
        let path = disk
            .target
            .clone()
            .unwrap_or_else(|| format!("/media/one-disk.{}", disk.id));
        let source = source
            .map(String::from)
            .unwrap_or_else(|| self.disk_mountpoint(disk.id));

        let mut config = entry(&[
            ("type", "disk"),
            ("path", path.as_str()),
            ("source", source.as_str()),
        ]);
        if disk.readonly {
            config.insert("readonly".into(), "true".into());
        }
        Devices::from([(format!("disk{}", disk.id), config)])
    }

    fn has_context(&self) -> bool {
        self.context.is_some()
    }

    fn context_disk(&self) -> Option<&Disk> {
        self.context.as_ref()
    }

    fn context_device(&self, devices: &mut Devices) {
        if let Some(context) = &self.context {
            let source = self.disk_mountpoint(context.id);
            devices.insert(
                CONTEXT_DEVICE.to_string(),
                entry(&[
                    ("type", "disk"),
                    ("source", source.as_str()),
                    ("path", "/context"),
                ]),
            );
        }
    }

    fn disk_mountpoint(&self, disk_id: u32) -> String {
        format!("{}/mapper/disk.{}", self.vm_dir(), disk_id)
    }

    fn console_command(&self, signal: &str) -> Option<String> {
        let graphics = self.graphics.as_ref()?;
        if !graphics.kind.eq_ignore_ascii_case("vnc") {
            return None;
        }

        match signal {
            "start" => Some(format!(
                "start {} {} lxc exec {} login\n",
                graphics.port,
                graphics.passwd.as_deref().unwrap_or("-"),
                self.container_name()
            )),
            "stop" => Some(format!("stop {}\n", graphics.port)),
            _ => None,
        }
    }

    fn is_wild(&self) -> bool {
        self.wild
    }

    fn to_container(&self) -> ContainerAttributes {
        let mut config = BTreeMap::new();
        if let Some(memory) = self.memory_mb {
            config.insert("limits.memory".to_string(), format!("{}MB", memory));
        }
        if let Some(vcpu) = self.vcpu {
            config.insert("limits.cpu".to_string(), vcpu.to_string());
        }

        let mut devices = Devices::new();
        for nic in &self.nics {
            devices.extend(self.nic_device(nic));
        }
        for disk in self.disks.iter().filter(|d| d.id != self.rootfs_id) {
            devices.extend(self.disk_device(disk, None));
        }
        self.context_device(&mut devices);

        ContainerAttributes {
            name: self.container_name(),
            devices,
            config,
            profile: vec![String::from("default")],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::types::DiskType;

    const TEMPLATE: &str = r#"{
        "vm_id": 42,
        "sysds_id": 0,
        "ds_path": "/var/lib/one/datastores",
        "memory_mb": 512,
        "vcpu": 2,
        "disks": [
            {"id": 0, "type": "FILE"},
            {"id": 1, "type": "rbd", "source": "one/one-5", "clone": true, "target": "/data"}
        ],
        "nics": [{"id": 0, "mac": "02:00:0a:00:00:05", "bridge": "br0"}],
        "context": {"id": 2, "type": "FILE"},
        "graphics": {"type": "VNC", "port": 5942, "passwd": "s3cr3t"}
    }"#;

    #[test]
    fn test_translation_to_container() {
        let vm = VmTemplate::from_json(TEMPLATE).unwrap();
        assert_eq!(vm.disks[1].disk_type, DiskType::Rbd);

        let attrs = vm.to_container();
        assert_eq!(attrs.name, "one-42");
        assert_eq!(attrs.config["limits.memory"], "512MB");
        assert_eq!(attrs.config["limits.cpu"], "2");
        assert_eq!(attrs.devices["eth0"]["hwaddr"], "02:00:0a:00:00:05");
        assert_eq!(attrs.devices["disk1"]["path"], "/data");
        assert_eq!(
            attrs.devices["disk1"]["source"],
            "/var/lib/one/datastores/0/42/mapper/disk.1"
        );
        assert_eq!(
            attrs.devices["context"]["source"],
            "/var/lib/one/datastores/0/42/mapper/disk.2"
        );
        assert!(!attrs.devices.contains_key("disk0"));
    }

    #[test]
    fn test_nic_lookup_ignores_case() {
        let vm = VmTemplate::from_json(TEMPLATE).unwrap();
        assert_eq!(vm.nic_by_mac("02:00:0A:00:00:05").map(|n| n.id), Some(0));
        assert!(vm.nic_by_mac("02:00:0a:00:00:99").is_none());
    }

    #[test]
    fn test_malformed_description_is_a_template_error() {
        let err = VmTemplate::from_json(r#"{"vm_id": "seven"}"#).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidTemplate(_)));
        assert!(err.to_string().starts_with("Invalid VM description"));
    }

    #[test]
    fn test_console_commands() {
        let vm = VmTemplate::from_json(TEMPLATE).unwrap();
        assert_eq!(
            vm.console_command("start").as_deref(),
            Some("start 5942 s3cr3t lxc exec one-42 login\n")
        );
        assert_eq!(vm.console_command("stop").as_deref(), Some("stop 5942\n"));
        assert_eq!(vm.console_command("reboot"), None);
    }

    #[test]
    fn test_image_paths() {
        let vm = VmTemplate::from_json(TEMPLATE).unwrap();
        assert_eq!(
            vm.disk_image_path(&vm.disks[0]),
            "/var/lib/one/datastores/0/42/disk.0"
        );
    }
}
