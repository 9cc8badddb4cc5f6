use std::path::PathBuf;

use darkelf_shell::types::errors::*;
use darkelf_shell::types::panic::WipeStep;

// === PersonaError Tests ===

#[test]
fn persona_error_display_variants() {
    assert_eq!(
        PersonaError::IoError("disk full".to_string()).to_string(),
        "Persona I/O error: disk full"
    );
    assert_eq!(
        PersonaError::SerializationError("missing field `name`".to_string()).to_string(),
        "Persona serialization error: missing field `name`"
    );
    assert_eq!(
        PersonaError::ValidationError("name cannot be empty".to_string()).to_string(),
        "Invalid persona: name cannot be empty"
    );
}

#[test]
fn persona_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(PersonaError::IoError("x".to_string()));
    assert!(err.source().is_none());
}

// === SessionError Tests ===

#[test]
fn session_error_display_variants() {
    assert_eq!(
        SessionError::DatabaseError("locked".to_string()).to_string(),
        "Session database error: locked"
    );
    assert_eq!(
        SessionError::SerializationError("bad history".to_string()).to_string(),
        "Session serialization error: bad history"
    );
    assert_eq!(
        SessionError::InvalidSession("duplicate tab id t1".to_string()).to_string(),
        "Invalid session: duplicate tab id t1"
    );
}

#[test]
fn session_error_from_rusqlite() {
    let err: SessionError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, SessionError::DatabaseError(_)));
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("permission denied".to_string()).to_string(),
        "Settings I/O error: permission denied"
    );
    assert_eq!(
        SettingsError::SerializationError("trailing comma".to_string()).to_string(),
        "Settings serialization error: trailing comma"
    );
    assert_eq!(
        SettingsError::InvalidValue("port 0".to_string()).to_string(),
        "Invalid settings value: port 0"
    );
}

// === NetworkError Tests ===

#[test]
fn network_error_display_variants() {
    assert_eq!(
        NetworkError::ExecutableNotFound("tor".to_string()).to_string(),
        "Tor executable not found: tor. Please install Tor."
    );
    assert_eq!(
        NetworkError::LaunchFailed("permission denied".to_string()).to_string(),
        "Failed to start Tor: permission denied"
    );
    assert_eq!(
        NetworkError::ControlChannel("connection refused".to_string()).to_string(),
        "Error requesting new identity: connection refused"
    );
    assert_eq!(
        NetworkError::IdentityRejected("515 Authentication failed".to_string()).to_string(),
        "Failed to get new identity: 515 Authentication failed"
    );
    assert_eq!(NetworkError::NotConnected.to_string(), "Tor is not connected");
}

#[test]
fn network_errors_are_distinguishable() {
    let missing = NetworkError::ExecutableNotFound("tor".to_string());
    let other = NetworkError::LaunchFailed("tor".to_string());
    assert_ne!(missing, other);
}

// === WipeError Tests ===

#[test]
fn wipe_error_display() {
    let err = WipeError {
        step: WipeStep::SessionStore,
        path: PathBuf::from("/srv/shell/sessions/sessions.db"),
        message: "read-only file system".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Panic wipe step 'session_store' failed for /srv/shell/sessions/sessions.db: read-only file system"
    );
}
