// Darkelf Shell shared type definitions
// Each submodule defines types used across the application.

pub mod errors;
pub mod network;
pub mod panic;
pub mod persona;
pub mod session;
pub mod settings;
