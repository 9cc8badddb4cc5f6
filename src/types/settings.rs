use serde::{Deserialize, Serialize};

/// Top-level shell settings container, persisted as `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellSettings {
    pub tor: TorSettings,
    pub security: SecuritySettings,
    pub ui: UiSettings,
    pub default_persona: String,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            tor: TorSettings::default(),
            security: SecuritySettings::default(),
            ui: UiSettings::default(),
            default_persona: "anonymous".to_string(),
        }
    }
}

/// Tor process, proxy and probe settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TorSettings {
    pub enabled: bool,
    pub socks_port: u16,
    pub control_port: u16,
    pub auto_start: bool,
    /// Program name or path of the Tor binary.
    pub executable: String,
    /// Exit-region allowlist passed as `--ExitNodes`.
    pub exit_nodes: Vec<String>,
    pub strict_nodes: bool,
    /// Fixed wait between launching Tor and the single readiness check.
    pub settle_delay_secs: u64,
    pub probe_timeout_secs: u64,
    pub control_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub probe_host: String,
    pub probe_port: u16,
}

impl Default for TorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            socks_port: 9050,
            control_port: 9051,
            auto_start: false,
            executable: "tor".to_string(),
            exit_nodes: ["us", "ca", "gb", "de", "fr"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            strict_nodes: true,
            settle_delay_secs: 5,
            probe_timeout_secs: 10,
            control_timeout_secs: 10,
            poll_interval_secs: 30,
            probe_host: "check.torproject.org".to_string(),
            probe_port: 80,
        }
    }
}

impl TorSettings {
    /// Renders the exit allowlist in torrc form: `{us},{ca},...`.
    pub fn exit_nodes_arg(&self) -> String {
        self.exit_nodes
            .iter()
            .map(|c| format!("{{{}}}", c))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Panic key and content-restriction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecuritySettings {
    pub panic_key: String,
    pub clear_history_on_exit: bool,
    pub disable_javascript: bool,
    pub disable_plugins: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            panic_key: "Ctrl+Shift+P".to_string(),
            clear_history_on_exit: true,
            disable_javascript: false,
            disable_plugins: true,
        }
    }
}

/// Window chrome settings, read by the UI host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiSettings {
    pub theme: String,
    pub show_status_bar: bool,
    pub tab_position: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            show_status_bar: true,
            tab_position: "top".to_string(),
        }
    }
}
