//! Mapper selection.
//!
//! `FILE` disks are probed with `file(1)` rather than trusting the declared type;
//! the probe output is classified into a [`ProbeVerdict`]. `RBD` disks always get
//! the object-storage mapper.

use log::{info, warn};
use std::sync::Arc;

use super::mapper_trait::Mapper;
use super::mount::MountTool;
use super::qcow2_mapper::Qcow2Mapper;
use super::raw_mapper::{DiskRawMapper, FsRawMapper};
use super::rbd_mapper::RbdMapper;
use super::types::{MapOperation, MapperKind};
use crate::configuration::Config;
use crate::error_handling::types::ContainerError;
use crate::process::{Executor, ShellCommand};
use crate::vm::{Disk, DiskType, VmDescriptor};

/// Classification of a content probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    ImageFormat,
    Filesystem,
    BootSector,
    Unknown,
}

impl ProbeVerdict {
    /// Mapper used for this verdict. `Unknown` falls back to the raw filesystem mapper.
    pub fn mapper_kind(&self) -> MapperKind {
        match self {
            ProbeVerdict::ImageFormat => MapperKind::ImageFormat,
            ProbeVerdict::Filesystem | ProbeVerdict::Unknown => MapperKind::RawFilesystem,
            ProbeVerdict::BootSector => MapperKind::RawDisk,
        }
    }
}

/// `file(1)` fragments in match order.
const SIGNATURES: [(&str, ProbeVerdict); 3] = [
    ("QEMU QCOW", ProbeVerdict::ImageFormat),
    ("filesystem", ProbeVerdict::Filesystem),
    ("boot sector", ProbeVerdict::BootSector),
];

/// Classifies `file(1)` output. Signatures are checked in order, first match wins.
pub fn classify(probe_output: &str) -> ProbeVerdict {
    SIGNATURES
        .iter()
        .find(|(fragment, _)| probe_output.contains(*fragment))
        .map_or(ProbeVerdict::Unknown, |(_, verdict)| *verdict)
}

/// A selected storage backend.
#[derive(Clone)]
pub enum DiskMapper {
    RawFilesystem(FsRawMapper),
    RawDisk(DiskRawMapper),
    ImageFormat(Qcow2Mapper),
    ObjectStorage(RbdMapper),
}

impl DiskMapper {
    pub fn kind(&self) -> MapperKind {
        match self {
            DiskMapper::RawFilesystem(_) => MapperKind::RawFilesystem,
            DiskMapper::RawDisk(_) => MapperKind::RawDisk,
            DiskMapper::ImageFormat(_) => MapperKind::ImageFormat,
            DiskMapper::ObjectStorage(_) => MapperKind::ObjectStorage,
        }
    }

    fn inner(&self) -> &dyn Mapper {
        match self {
            DiskMapper::RawFilesystem(m) => m,
            DiskMapper::RawDisk(m) => m,
            DiskMapper::ImageFormat(m) => m,
            DiskMapper::ObjectStorage(m) => m,
        }
    }
}

impl Mapper for DiskMapper {
    fn map(&self, vm: &dyn VmDescriptor, disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        self.inner().map(vm, disk, target)
    }

    fn unmap(&self, vm: &dyn VmDescriptor, disk: &Disk, target: &str) -> Result<bool, ContainerError> {
        self.inner().unmap(vm, disk, target)
    }

    fn apply(
        &self,
        operation: MapOperation,
        vm: &dyn VmDescriptor,
        disk: &Disk,
        target: &str,
    ) -> Result<bool, ContainerError> {
        info!("{} {} with the {} mapper", operation, target, self.kind());
        self.inner().apply(operation, vm, disk, target)
    }
}

/// Picks the mapper for a disk.
#[derive(Clone)]
pub struct MapperDispatcher {
    tool: MountTool,
    file_command: String,
}

impl MapperDispatcher {
    pub fn new(executor: Arc<dyn Executor>, config: &Config) -> Self {
        Self {
            tool: MountTool::new(executor, config.commands.clone()),
            file_command: config.commands.file.clone(),
        }
    }

    /// Mapper used for the context volume.
    pub fn raw_filesystem(&self) -> DiskMapper {
        DiskMapper::RawFilesystem(FsRawMapper::new(self.tool.clone()))
    }

    pub fn for_kind(&self, kind: MapperKind, disk: &Disk) -> DiskMapper {
        match kind {
            MapperKind::RawFilesystem => self.raw_filesystem(),
            MapperKind::RawDisk => DiskMapper::RawDisk(DiskRawMapper::new(self.tool.clone())),
            MapperKind::ImageFormat => DiskMapper::ImageFormat(Qcow2Mapper::new(self.tool.clone())),
            MapperKind::ObjectStorage => {
                DiskMapper::ObjectStorage(RbdMapper::new(self.tool.clone(), disk))
            }
        }
    }

    /// Runs the content probe on the backing image of `disk`.
    pub fn probe(&self, vm: &dyn VmDescriptor, disk: &Disk) -> Result<ProbeVerdict, ContainerError> {
        let image = vm.disk_image_path(disk);
        let result = self
            .tool
            .run(&ShellCommand::from_line(&self.file_command).arg(image.as_str()))?;

        let verdict = classify(&result.stdout);
        if verdict == ProbeVerdict::Unknown {
            warn!(
                "Unknown image format for {} ({}), trying raw filesystem mapper",
                image,
                result.stdout.trim()
            );
        }
        Ok(verdict)
    }

    pub fn select(&self, vm: &dyn VmDescriptor, disk: &Disk) -> Result<DiskMapper, ContainerError> {
        match &disk.disk_type {
            DiskType::File => {
                let verdict = self.probe(vm, disk)?;
                Ok(self.for_kind(verdict.mapper_kind(), disk))
            }
            DiskType::Rbd => Ok(self.for_kind(MapperKind::ObjectStorage, disk)),
            DiskType::Other(other) => Err(ContainerError::UnsupportedDiskType(format!(
                "disk {} has type {}",
                disk.id, other
            ))),
        }
    }
}
