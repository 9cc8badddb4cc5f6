// Darkelf Shell state managers
// Managers own durable records: personas on disk, sessions in SQLite.

pub mod persona_manager;
pub mod session_store;
