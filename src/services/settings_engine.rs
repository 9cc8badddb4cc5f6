// Darkelf Shell Settings Engine
// Manages shell settings: loading, saving, validated targeted updates and reset.
// Settings are stored as a JSON file at the path handed in by the caller.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::errors::SettingsError;
use crate::types::settings::ShellSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ShellSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ShellSettings;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &Path;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: PathBuf,
    settings: ShellSettings,
}

impl SettingsEngine {
    pub fn new<P: Into<PathBuf>>(config_path: P) -> Self {
        Self {
            config_path: config_path.into(),
            settings: ShellSettings::default(),
        }
    }

    /// Applies `change` to a copy of the settings, validates the copy, then
    /// swaps it in and saves. The live settings are untouched on failure.
    fn update<F>(&mut self, change: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut ShellSettings),
    {
        let mut next = self.settings.clone();
        change(&mut next);
        validate(&next)?;
        self.settings = next;
        self.save()
    }

    pub fn set_tor_enabled(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.update(|s| s.tor.enabled = enabled)
    }

    pub fn set_socks_port(&mut self, port: u16) -> Result<(), SettingsError> {
        self.update(|s| s.tor.socks_port = port)
    }

    pub fn set_control_port(&mut self, port: u16) -> Result<(), SettingsError> {
        self.update(|s| s.tor.control_port = port)
    }

    pub fn set_auto_start(&mut self, auto_start: bool) -> Result<(), SettingsError> {
        self.update(|s| s.tor.auto_start = auto_start)
    }

    pub fn set_panic_key(&mut self, key: &str) -> Result<(), SettingsError> {
        self.update(|s| s.security.panic_key = key.trim().to_string())
    }

    pub fn set_default_persona(&mut self, persona_id: &str) -> Result<(), SettingsError> {
        self.update(|s| s.default_persona = persona_id.trim().to_string())
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<(), SettingsError> {
        self.update(|s| s.ui.theme = theme.trim().to_string())
    }
}

/// Cross-field checks that serde alone cannot express.
pub fn validate(settings: &ShellSettings) -> Result<(), SettingsError> {
    let tor = &settings.tor;
    if tor.socks_port == 0 || tor.control_port == 0 {
        return Err(SettingsError::InvalidValue("Tor ports must be non-zero".to_string()));
    }
    if tor.socks_port == tor.control_port {
        return Err(SettingsError::InvalidValue(format!(
            "SOCKS and control port cannot both be {}",
            tor.socks_port
        )));
    }
    if tor.executable.trim().is_empty() {
        return Err(SettingsError::InvalidValue("Tor executable cannot be empty".to_string()));
    }
    if settings.security.panic_key.is_empty() {
        return Err(SettingsError::InvalidValue("Panic key cannot be empty".to_string()));
    }
    if settings.default_persona.is_empty() {
        return Err(SettingsError::InvalidValue("Default persona cannot be empty".to_string()));
    }
    if settings.ui.theme.is_empty() {
        return Err(SettingsError::InvalidValue("Theme cannot be empty".to_string()));
    }
    Ok(())
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// A missing file yields defaults. A file that cannot be parsed or fails
    /// validation also yields defaults, with a warning; only an unreadable
    /// file is an error.
    fn load(&mut self) -> Result<ShellSettings, SettingsError> {
        let path = self.config_path.as_path();

        if !path.exists() {
            self.settings = ShellSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        self.settings = match serde_json::from_str::<ShellSettings>(&content) {
            Ok(settings) => match validate(&settings) {
                Ok(()) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    ShellSettings::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                ShellSettings::default()
            }
        };
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = self.config_path.as_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// Resets all settings to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ShellSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}
