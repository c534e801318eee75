//! Container driver for virtual machines backed by system containers.
//!
//! The crate mirrors remote containers, translates VM descriptions into container
//! records, maps VM disks on the host through interchangeable storage mappers and
//! relays console commands. Everything runs synchronously.

pub mod configuration;
pub mod container_management;
pub mod error_handling;
pub mod mapper;
pub mod process;
pub mod remote;
pub mod vm;

#[cfg(test)]
pub(crate) mod testing;
