//! Standalone panic wipe.
//!
//! Wipes the data root given as the first argument (or the default root)
//! without constructing any registry or controller, then exits. Exit code 0
//! when every step succeeded, 1 when at least one path could not be removed.

use darkelf_shell::platform::{default_root, ShellPaths};
use darkelf_shell::services::panic_handler::panic_shutdown;

fn main() {
    darkelf_shell::init_tracing();

    let root = std::env::args_os()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_root);

    let report = panic_shutdown(&ShellPaths::new(root));
    std::process::exit(if report.is_clean() { 0 } else { 1 });
}
