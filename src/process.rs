//! Process execution subsystem.
//!
//! - [`Executor`]: blocking command execution, single-instance background
//!   processes and the host-wide named lock.
//! - [`SystemExecutor`]: implementation on top of `std::process`.
//! - [`NamedLock`] / [`LockGuard`]: `flock(2)` based scoped locking.

pub mod executor;
pub mod lock;
pub mod types;

pub use executor::{Executor, SystemExecutor};
pub use lock::{LockGuard, NamedLock};
pub use types::{CommandResult, ShellCommand};
