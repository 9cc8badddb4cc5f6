use std::fmt;
use std::path::PathBuf;

use super::panic::WipeStep;

// === PersonaError ===

/// Errors related to persona record storage.
#[derive(Debug)]
pub enum PersonaError {
    /// Reading, writing or deleting a persona file failed.
    IoError(String),
    /// Failed to serialize or deserialize a persona record.
    SerializationError(String),
    /// The persona record violates a field constraint.
    ValidationError(String),
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::IoError(msg) => write!(f, "Persona I/O error: {}", msg),
            PersonaError::SerializationError(msg) => {
                write!(f, "Persona serialization error: {}", msg)
            }
            PersonaError::ValidationError(msg) => write!(f, "Invalid persona: {}", msg),
        }
    }
}

impl std::error::Error for PersonaError {}

// === SessionError ===

/// Errors related to session store operations.
#[derive(Debug)]
pub enum SessionError {
    /// Database operation failed.
    DatabaseError(String),
    /// A stored column could not be decoded (history JSON, timestamps, metadata).
    SerializationError(String),
    /// The session graph handed to the store is inconsistent.
    InvalidSession(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DatabaseError(msg) => write!(f, "Session database error: {}", msg),
            SessionError::SerializationError(msg) => {
                write!(f, "Session serialization error: {}", msg)
            }
            SessionError::InvalidSession(msg) => write!(f, "Invalid session: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<rusqlite::Error> for SessionError {
    fn from(e: rusqlite::Error) -> Self {
        SessionError::DatabaseError(e.to_string())
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

// === NetworkError ===

/// Failures of the Tor data plane, control channel or process launch.
///
/// These never escape the controller as `Err`; they travel inside
/// [`NetworkEvent::Error`](super::network::NetworkEvent::Error).
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The Tor executable could not be found on the search path.
    ExecutableNotFound(String),
    /// The Tor process could not be spawned for any other reason.
    LaunchFailed(String),
    /// The proxied reachability probe failed.
    ProbeFailed(String),
    /// The control port could not be reached or the exchange broke off.
    ControlChannel(String),
    /// The control port answered, but without the success acknowledgment.
    IdentityRejected(String),
    /// The operation requires an established connection.
    NotConnected,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ExecutableNotFound(exe) => {
                write!(f, "Tor executable not found: {}. Please install Tor.", exe)
            }
            NetworkError::LaunchFailed(msg) => write!(f, "Failed to start Tor: {}", msg),
            NetworkError::ProbeFailed(msg) => write!(f, "Tor connection check failed: {}", msg),
            NetworkError::ControlChannel(msg) => {
                write!(f, "Error requesting new identity: {}", msg)
            }
            NetworkError::IdentityRejected(reply) => {
                write!(f, "Failed to get new identity: {}", reply)
            }
            NetworkError::NotConnected => write!(f, "Tor is not connected"),
        }
    }
}

impl std::error::Error for NetworkError {}

// === WipeError ===

/// A single path that a panic wipe step failed to remove.
#[derive(Debug, Clone, PartialEq)]
pub struct WipeError {
    pub step: WipeStep,
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for WipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Panic wipe step '{}' failed for {}: {}",
            self.step,
            self.path.display(),
            self.message
        )
    }
}

impl std::error::Error for WipeError {}
