//! Error types shared by every subsystem of the driver.

pub mod types;

pub use types::{ConfigError, ContainerError};
