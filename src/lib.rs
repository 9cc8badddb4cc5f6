//! Darkelf Shell: persona-configurable, Tor-routed browsing shell core.
//!
//! This library crate exposes the persona registry, the session store, the
//! Tor controller and the panic wipe for the binaries and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;

/// Installs the stderr `tracing` subscriber used by every binary.
///
/// Honors `RUST_LOG`, defaulting to `info`. Stdout stays free for JSON-RPC.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
