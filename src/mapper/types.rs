use std::fmt;
use std::str::FromStr;

/// Direction of a storage setup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOperation {
    Map,
    Unmap,
}

impl MapOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapOperation::Map => "map",
            MapOperation::Unmap => "unmap",
        }
    }
}

impl fmt::Display for MapOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "map" => Ok(MapOperation::Map),
            "unmap" => Ok(MapOperation::Unmap),
            other => Err(format!("unknown storage operation '{}'", other)),
        }
    }
}

/// Storage backend strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperKind {
    RawFilesystem,
    RawDisk,
    ImageFormat,
    ObjectStorage,
}

impl fmt::Display for MapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MapperKind::RawFilesystem => "raw filesystem",
            MapperKind::RawDisk => "raw disk",
            MapperKind::ImageFormat => "qcow2",
            MapperKind::ObjectStorage => "rbd",
        };
        f.write_str(name)
    }
}
