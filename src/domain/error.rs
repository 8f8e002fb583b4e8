use thiserror::Error;

/// Common error types for the session orchestration engine
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// Workshop or session definition missing/invalid
    #[error("{0}")]
    Definition(String),

    /// Configuration related errors
    #[error("{0}")]
    Configuration(String),

    /// Snapshot persistence errors
    #[error("{0}")]
    Snapshot(String),

    /// Worker spawn errors
    #[error("{0}")]
    Spawn(String),

    /// Dispatch/messaging errors (lost reply, dead worker)
    #[error("{0}")]
    Dispatch(String),

    /// Caller-side dispatch timeout
    #[error("{0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("{0}")]
    Serialization(String),

    /// File system related errors
    #[error("{0}")]
    FileSystem(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String)
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        SessionError::Generic(err.to_string())
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::FileSystem(err.to_string())
    }
}

/// Convert from serde_yaml::Error
impl From<serde_yaml::Error> for SessionError {
    fn from(err: serde_yaml::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

/// Convert from serde_json::Error
impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

/// Convert from ractor::SpawnErr
impl From<ractor::SpawnErr> for SessionError {
    fn from(err: ractor::SpawnErr) -> Self {
        SessionError::Spawn(err.to_string())
    }
}
