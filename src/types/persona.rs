use serde::{Deserialize, Serialize};

use super::errors::PersonaError;

/// Colour depths a persona may advertise.
pub const ALLOWED_COLOR_DEPTHS: &[u32] = &[8, 16, 24, 32];

/// A named identity profile applied to browsing.
///
/// The flags and declared attributes are consumed by the rendering layer;
/// this type carries no mitigation logic itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub user_agent: String,
    pub accept_language: String,
    pub timezone: String,
    pub screen_resolution: String,
    pub color_depth: u32,
    pub javascript_enabled: bool,
    pub plugins_enabled: bool,
    pub webgl_enabled: bool,
    pub canvas_fingerprinting_protection: bool,
    pub audio_fingerprinting_protection: bool,
    #[serde(default)]
    pub description: String,
}

impl Persona {
    /// Checks the field constraints a persisted record must satisfy.
    ///
    /// The id doubles as the record's file stem, so it is restricted to
    /// ASCII alphanumerics, `-` and `_`.
    pub fn validate(&self) -> Result<(), PersonaError> {
        if self.id.is_empty() {
            return Err(PersonaError::ValidationError("id cannot be empty".to_string()));
        }
        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PersonaError::ValidationError(format!(
                "id '{}' contains characters outside [A-Za-z0-9_-]",
                self.id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(PersonaError::ValidationError("name cannot be empty".to_string()));
        }
        if parse_resolution(&self.screen_resolution).is_none() {
            return Err(PersonaError::ValidationError(format!(
                "screen resolution '{}' is not WIDTHxHEIGHT",
                self.screen_resolution
            )));
        }
        if !ALLOWED_COLOR_DEPTHS.contains(&self.color_depth) {
            return Err(PersonaError::ValidationError(format!(
                "unsupported colour depth {}",
                self.color_depth
            )));
        }
        Ok(())
    }

    /// Returns the advertised screen size as `(width, height)`.
    pub fn screen_size(&self) -> Option<(u32, u32)> {
        parse_resolution(&self.screen_resolution)
    }
}

fn parse_resolution(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

/// Field overrides applied on top of the default attribute set by
/// `PersonaManager::create`. `None` keeps the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersonaOverrides {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub timezone: Option<String>,
    pub screen_resolution: Option<String>,
    pub color_depth: Option<u32>,
    pub javascript_enabled: Option<bool>,
    pub plugins_enabled: Option<bool>,
    pub webgl_enabled: Option<bool>,
    pub canvas_fingerprinting_protection: Option<bool>,
    pub audio_fingerprinting_protection: Option<bool>,
    pub description: Option<String>,
}

impl PersonaOverrides {
    /// Builds a persona with the given id and name: default attributes first,
    /// then every `Some` override.
    pub fn apply(self, id: String, name: String) -> Persona {
        Persona {
            id,
            name,
            user_agent: self.user_agent.unwrap_or_else(|| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
            }),
            accept_language: self
                .accept_language
                .unwrap_or_else(|| "en-US,en;q=0.9".to_string()),
            timezone: self.timezone.unwrap_or_else(|| "UTC".to_string()),
            screen_resolution: self
                .screen_resolution
                .unwrap_or_else(|| "1920x1080".to_string()),
            color_depth: self.color_depth.unwrap_or(24),
            javascript_enabled: self.javascript_enabled.unwrap_or(true),
            plugins_enabled: self.plugins_enabled.unwrap_or(false),
            webgl_enabled: self.webgl_enabled.unwrap_or(false),
            canvas_fingerprinting_protection: self
                .canvas_fingerprinting_protection
                .unwrap_or(true),
            audio_fingerprinting_protection: self.audio_fingerprinting_protection.unwrap_or(true),
            description: self.description.unwrap_or_default(),
        }
    }
}

/// The three personas a fresh registry is seeded with.
pub fn default_personas() -> Vec<Persona> {
    vec![
        Persona {
            id: "anonymous".to_string(),
            name: "Anonymous".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timezone: "UTC".to_string(),
            screen_resolution: "1920x1080".to_string(),
            color_depth: 24,
            javascript_enabled: true,
            plugins_enabled: false,
            webgl_enabled: false,
            canvas_fingerprinting_protection: true,
            audio_fingerprinting_protection: true,
            description: "Basic anonymous browsing persona".to_string(),
        },
        Persona {
            id: "researcher".to_string(),
            name: "Security Researcher".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timezone: "UTC".to_string(),
            screen_resolution: "1366x768".to_string(),
            color_depth: 24,
            javascript_enabled: true,
            plugins_enabled: false,
            webgl_enabled: false,
            canvas_fingerprinting_protection: true,
            audio_fingerprinting_protection: true,
            description: "Research-focused persona with enhanced privacy".to_string(),
        },
        Persona {
            id: "stealth".to_string(),
            name: "Maximum Stealth".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 6.1; Win64; x64; rv:78.0) Gecko/20100101 Firefox/78.0".to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            timezone: "UTC".to_string(),
            screen_resolution: "1024x768".to_string(),
            color_depth: 16,
            javascript_enabled: false,
            plugins_enabled: false,
            webgl_enabled: false,
            canvas_fingerprinting_protection: true,
            audio_fingerprinting_protection: true,
            description: "Maximum privacy and anonymity settings".to_string(),
        },
    ]
}
