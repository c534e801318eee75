//! Storage mappers.
//!
//! A mapper makes a VM disk available at a host path (`map`) and removes it again
//! (`unmap`). Four variants exist, selected per disk by [`MapperDispatcher`]:
//!
//! - raw filesystem image, attached through a loop device;
//! - raw partitioned disk image, attached through a loop device with partition scan;
//! - qcow2 image, attached through `qemu-nbd`;
//! - Ceph RBD image, attached through `rbd-nbd`.
//!
//! A mapper reports a failing step as `Ok(false)`; `Err` is reserved for commands
//! that could not be run at all and for malformed disk descriptions.

pub mod dispatcher;
pub mod mapper_trait;
pub mod mount;
pub mod qcow2_mapper;
pub mod raw_mapper;
pub mod rbd_mapper;
pub mod types;

pub use dispatcher::{classify, DiskMapper, MapperDispatcher, ProbeVerdict};
pub use mapper_trait::Mapper;
pub use mount::MountTool;
pub use qcow2_mapper::Qcow2Mapper;
pub use raw_mapper::{DiskRawMapper, FsRawMapper};
pub use rbd_mapper::RbdMapper;
pub use types::{MapOperation, MapperKind};
