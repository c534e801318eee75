//! Description of the virtual machine a container is derived from.
//!
//! Components:
//! - `descriptor`: the `VmDescriptor` trait the driver consumes.
//! - `template`: `VmTemplate`, a JSON backed implementation.
//! - `types`: disks, NICs and graphics settings.

pub mod descriptor;
pub mod template;
pub mod types;

pub use descriptor::VmDescriptor;
pub use template::VmTemplate;
pub use types::{Disk, DiskType, Graphics, Nic};
