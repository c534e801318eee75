use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared storage type of a disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DiskType {
    File,
    Rbd,
    Other(String),
}

impl From<String> for DiskType {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "FILE" => DiskType::File,
            "RBD" => DiskType::Rbd,
            _ => DiskType::Other(value),
        }
    }
}

impl From<DiskType> for String {
    fn from(value: DiskType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskType::File => f.write_str("FILE"),
            DiskType::Rbd => f.write_str("RBD"),
            DiskType::Other(other) => f.write_str(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub id: u32,
    #[serde(rename = "type")]
    pub disk_type: DiskType,
    /// Pending hotplug attach/detach.
    #[serde(default)]
    pub attach: bool,
    /// Backend image reference (`pool/image` for RBD).
    #[serde(default)]
    pub source: Option<String>,
    /// Mount path inside the container.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub clone: bool,
    #[serde(default)]
    pub ceph_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nic {
    pub id: u32,
    pub mac: String,
    pub bridge: String,
    /// Host side interface name.
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graphics {
    #[serde(rename = "type")]
    pub kind: String,
    pub port: u16,
    #[serde(default)]
    pub passwd: Option<String>,
}
