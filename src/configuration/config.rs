use super::types::*;
use crate::error_handling::types::ConfigError;
use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted by [`Config::load`] when no explicit path is given.
pub const CONFIG_ENV: &str = "LXD_DRIVER_CONFIG";

/// Driver configuration structure that defines all runtime parameters.
///
/// This structure holds the host layout the driver relies on, the remote API
/// endpoint, the console relay settings and the external command lines used by the
/// storage mappers. It is read from a TOML file; every key is optional and falls
/// back to the defaults below.
///
/// # Examples
///
/// ```
/// use lxd_driver::configuration::Config;
///
/// let config = Config::from_toml_str("containers_path = \"/srv/lxd/containers\"").unwrap();
/// assert_eq!(config.console.width, 800);
/// ```
///
/// # Fields Overview
///
/// - `containers_path`: base directory holding `<name>/rootfs` for every container
/// - `socket_path`: unix socket of the remote container API
/// - `lock_path`: directory holding the named lock files
/// - `operation_timeout_secs`: default wait bound for remote operations
/// - `console`: console relay settings
/// - `commands`: external command lines
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory of the container root filesystems.
    ///
    /// The root disk of a VM is mapped on `<containers_path>/<name>/rootfs` and the
    /// context volume is materialized under `<containers_path>/<name>/rootfs/context`.
    pub containers_path: PathBuf,

    /// Unix socket the remote container API listens on.
    pub socket_path: PathBuf,

    /// Directory where named lock files are created.
    pub lock_path: PathBuf,

    /// Default bound, in seconds, for blocking waits on remote operations.
    ///
    /// Setting this to '0' means waits are unbounded
    pub operation_timeout_secs: u64,

    /// Console relay configuration
    pub console: ConsoleSettings,

    /// External command lines
    pub commands: CommandSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            containers_path: PathBuf::from("/var/lib/lxd/containers"),
            socket_path: PathBuf::from("/var/lib/lxd/unix.socket"),
            lock_path: PathBuf::from("/tmp"),
            operation_timeout_secs: 0,
            console: ConsoleSettings::default(),
            commands: CommandSettings::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolves the configuration: explicit `path` first, then the file named by
    /// `LXD_DRIVER_CONFIG`, then the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            info!("Using configuration from {}: {}", CONFIG_ENV, env_path);
            return Self::from_file(Path::new(&env_path));
        }

        info!("No configuration file given, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, path) in [
            ("containers_path", &self.containers_path),
            ("socket_path", &self.socket_path),
            ("lock_path", &self.lock_path),
            ("console.pipe_path", &self.console.pipe_path),
        ] {
            if !path.is_absolute() {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be an absolute path, got {}",
                    key,
                    path.display()
                )));
            }
        }

        if self.console.width == 0 || self.console.height == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "console geometry must be non-zero",
            )));
        }

        Ok(())
    }

    /// Default wait bound, `None` when waits are unbounded.
    pub fn operation_timeout(&self) -> Option<Duration> {
        match self.operation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Root filesystem directory of the container `name`.
    pub fn rootfs_path(&self, name: &str) -> PathBuf {
        self.containers_path.join(name).join("rootfs")
    }

    /// In-rootfs directory receiving the context volume of container `name`.
    pub fn context_path(&self, name: &str) -> PathBuf {
        self.rootfs_path(name).join("context")
    }
}
