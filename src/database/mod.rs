//! Session store database layer.
//!
//! Provides SQLite connection management, explicit transactions and schema
//! migrations.
//!
//! # Usage
//!
//! ```no_run
//! use darkelf_shell::database::Database;
//!
//! let db = Database::open("sessions.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
