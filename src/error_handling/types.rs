use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Errors raised while driving a container against the remote API.
///
/// Mapper failures are not represented here: a map/unmap step that fails is
/// reported as `Ok(false)` by the storage operations.
#[derive(Debug)]
pub enum ContainerError {
    /// The remote answered with error code 404.
    NotFound(String),
    /// Any other non-success remote answer.
    RemoteOperation { code: i64, message: String },
    /// A blocking wait gave up before the remote operation resolved.
    Timeout(String),
    /// A local invariant does not hold (missing NIC, no hotplug disk, ...).
    MissingPrecondition(String),
    UnsupportedDiskType(String),
    /// The transport itself failed before a remote answer was decoded.
    Transport(String),
    InvalidResponse(String),
    /// The VM description could not be decoded.
    InvalidTemplate(String),
    IoError(std::io::Error),
}

impl ContainerError {
    /// Machine readable remote code, when the error came from the remote API.
    pub fn code(&self) -> Option<i64> {
        match self {
            ContainerError::NotFound(_) => Some(404),
            ContainerError::RemoteOperation { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::NotFound(_))
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::NotFound(e) => write!(f, "Not found: {}", e),
            ContainerError::RemoteOperation { code, message } => {
                write!(f, "Remote operation failed ({}): {}", code, message)
            }
            ContainerError::Timeout(e) => write!(f, "Operation timed out: {}", e),
            ContainerError::MissingPrecondition(e) => write!(f, "Missing precondition: {}", e),
            ContainerError::UnsupportedDiskType(e) => write!(f, "Unsupported disk type: {}", e),
            ContainerError::Transport(e) => write!(f, "Transport error: {}", e),
            ContainerError::InvalidResponse(e) => write!(f, "Invalid remote response: {}", e),
            ContainerError::InvalidTemplate(e) => write!(f, "Invalid VM description: {}", e),
            ContainerError::IoError(e) => write!(f, "Container IO error: {}", e),
        }
    }
}

impl std::error::Error for ContainerError {}

impl From<std::io::Error> for ContainerError {
    fn from(err: std::io::Error) -> Self {
        ContainerError::IoError(err)
    }
}

impl From<serde_json::Error> for ContainerError {
    fn from(err: serde_json::Error) -> Self {
        ContainerError::InvalidResponse(err.to_string())
    }
}
