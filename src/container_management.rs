//! Container management subsystem.
//!
//! This module drives one container at a time against the remote container API:
//! lifecycle and state changes, storage and NIC attachment, and console command
//! delivery. All calls are blocking.
//!
//! Re-exports:
//! - [`Container`]: the record mirroring one remote container, with every operation.
//! - [`DriverContext`]: the API client, executor and configuration shared by records.
//! - [`ConsoleBridge`]: delivery of console commands to the relay.
//!
//! Example (non-running):
//! ```ignore
//! use lxd_driver::configuration::Config;
//! use lxd_driver::container_management::{Container, DriverContext, StateOptions};
//!
//! let ctx = DriverContext::new(Config::default())?;
//! let mut container = Container::get("one-42", None, ctx)?;
//! let status = container.stop(StateOptions::default())?;
//! println!("one-42 is {:?}", status);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod console;
pub mod container;
pub mod lifecycle;
pub mod network;
pub mod storage;
pub mod types;

pub use console::ConsoleBridge;
pub use container::{Container, DriverContext};
pub use types::{
    ContainerAttributes, ContainerState, LifecycleAction, StateOptions, WaitOptions,
};
