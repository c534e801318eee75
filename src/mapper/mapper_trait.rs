//! Mapper Trait
//!
//! The two-operation contract every storage backend implements. Callers treat all
//! variants uniformly.

use super::types::MapOperation;
use crate::error_handling::types::ContainerError;
use crate::vm::{Disk, VmDescriptor};

pub trait Mapper {
    /// Makes `disk` of `vm` available at `target`.
    fn map(&self, vm: &dyn VmDescriptor, disk: &Disk, target: &str)
        -> Result<bool, ContainerError>;

    /// Releases whatever is mapped at `target`.
    fn unmap(
        &self,
        vm: &dyn VmDescriptor,
        disk: &Disk,
        target: &str,
    ) -> Result<bool, ContainerError>;

    fn apply(
        &self,
        operation: MapOperation,
        vm: &dyn VmDescriptor,
        disk: &Disk,
        target: &str,
    ) -> Result<bool, ContainerError> {
        match operation {
            MapOperation::Map => self.map(vm, disk, target),
            MapOperation::Unmap => self.unmap(vm, disk, target),
        }
    }
}
