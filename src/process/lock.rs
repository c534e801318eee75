//! Named advisory locks backed by `flock(2)` on `<dir>/<name>.lock`.
//!
//! The lock is held for as long as the returned [`LockGuard`] lives, so every
//! exit path of the guarded scope (including `?` and panics) releases it.

use log::{debug, error};
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error_handling::types::ContainerError;

pub struct LockGuard {
    name: String,
    _lock: Flock<File>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        debug!("Releasing lock {}", self.name);
    }
}

pub struct NamedLock;

impl NamedLock {
    /// Blocks until the exclusive lock `name` under `dir` is acquired.
    pub fn acquire(dir: &Path, name: &str) -> Result<LockGuard, ContainerError> {
        let path = dir.join(format!("{}.lock", name));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                error!("Failed to open lock file {}: {}", path.display(), e);
                ContainerError::IoError(e)
            })?;

        let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            error!("Failed to lock {}: {}", path.display(), errno);
            ContainerError::IoError(errno.into())
        })?;

        debug!("Acquired lock {}", name);
        Ok(LockGuard {
            name: name.to_string(),
            _lock: lock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_lock_excludes_until_guard_dropped() {
        let dir = TempDir::new().unwrap();
        let guard = NamedLock::acquire(dir.path(), "console").unwrap();

        let (tx, rx) = mpsc::channel();
        let lock_dir = dir.path().to_path_buf();
        let waiter = thread::spawn(move || {
            let _guard = NamedLock::acquire(&lock_dir, "console").unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(guard);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        waiter.join().unwrap();
    }

    #[test]
    fn test_distinct_names_do_not_contend() {
        let dir = TempDir::new().unwrap();
        let _a = NamedLock::acquire(dir.path(), "a").unwrap();
        let _b = NamedLock::acquire(dir.path(), "b").unwrap();
        assert!(dir.path().join("a.lock").exists());
        assert!(dir.path().join("b.lock").exists());
    }
}
