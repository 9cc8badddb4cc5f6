// Darkelf Shell filesystem layout
// Every component receives its paths from a `ShellPaths` built from an explicit
// root. Only the binaries call `default_root()`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default data root.
pub const ROOT_ENV_VAR: &str = "DARKELF_SHELL_HOME";

/// Directory layout under one data root.
///
/// ```text
/// <root>/config.json
/// <root>/personas/<id>.json
/// <root>/sessions/sessions.db
/// <root>/cache/            rendering/content cache
/// <root>/data/             engine local storage
/// <root>/temp/             scratch files
/// <root>/tor/              Tor DataDirectory
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellPaths {
    root: PathBuf,
}

impl ShellPaths {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn personas_dir(&self) -> PathBuf {
        self.root.join("personas")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn sessions_db(&self) -> PathBuf {
        self.sessions_dir().join("sessions.db")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn tor_data_dir(&self) -> PathBuf {
        self.root.join("tor")
    }

    /// Creates the root plus the personas and sessions directories.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(self.personas_dir())?;
        fs::create_dir_all(self.sessions_dir())?;
        Ok(())
    }
}

/// Resolves the data root for a binary entry point.
///
/// - `$DARKELF_SHELL_HOME` when set
/// - **Linux/macOS**: `~/.darkelf_shell`
/// - **Windows**: `%APPDATA%/DarkelfShell`
pub fn default_root() -> PathBuf {
    if let Ok(dir) = env::var(ROOT_ENV_VAR) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA")
            .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
        PathBuf::from(appdata).join("DarkelfShell")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
        PathBuf::from(home).join(".darkelf_shell")
    }
}
