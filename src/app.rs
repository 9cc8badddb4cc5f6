//! Shell Core for Darkelf Shell.
//!
//! Central struct holding the registries, the session store and the Tor
//! controller, all rooted at one explicit [`ShellPaths`].

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::database::connection::Database;
use crate::managers::persona_manager::{PersonaManager, PersonaManagerTrait};
use crate::managers::session_store::SessionStore;
use crate::platform::ShellPaths;
use crate::services::panic_handler::PanicHandler;
use crate::services::proxy::ProcessProxy;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::tor_controller::{TorController, TorControllerTrait};
use crate::types::network::NetworkEvent;
use crate::types::panic::PanicReport;
use crate::types::persona::Persona;

/// Central application struct holding all managers and services.
pub struct Shell {
    pub paths: ShellPaths,
    pub settings_engine: SettingsEngine,
    pub persona_manager: PersonaManager,
    pub session_store: SessionStore,
    pub tor_controller: TorController,
    pub proxy: Arc<ProcessProxy>,
    network_events: UnboundedReceiver<NetworkEvent>,
}

impl Shell {
    /// Creates the directory layout under `paths` and initializes every component.
    pub fn new(paths: ShellPaths) -> Result<Self, Box<dyn std::error::Error>> {
        paths.ensure_dirs()?;

        let mut settings_engine = SettingsEngine::new(paths.config_file());
        settings_engine.load()?;

        let persona_manager = PersonaManager::new(paths.personas_dir())?;
        let session_store = SessionStore::new(Database::open(paths.sessions_db())?);

        let proxy = Arc::new(ProcessProxy::new());
        let (tor_controller, network_events) = TorController::new(
            settings_engine.get_settings().tor.clone(),
            paths.tor_data_dir(),
            proxy.clone(),
        );

        tracing::info!(root = %paths.root().display(), "Shell initialized");

        Ok(Self {
            paths,
            settings_engine,
            persona_manager,
            session_store,
            tor_controller,
            proxy,
            network_events,
        })
    }

    /// Applies every queued network event to the controller and returns them
    /// for rendering.
    pub fn drain_network_events(&mut self) -> Vec<NetworkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.network_events.try_recv() {
            self.tor_controller.apply(&event);
            events.push(event);
        }
        events
    }

    /// Waits for the next network event; `None` once every sender is gone.
    pub async fn next_network_event(&mut self) -> Option<NetworkEvent> {
        let event = self.network_events.recv().await?;
        self.tor_controller.apply(&event);
        Some(event)
    }

    /// Builds a panic coordinator for this shell's data root.
    pub fn panic_handler(&self) -> PanicHandler {
        PanicHandler::new(self.paths.clone())
    }

    /// The configured default persona, if it is still registered.
    pub fn default_persona(&self) -> Option<Persona> {
        let id = &self.settings_engine.get_settings().default_persona;
        self.persona_manager.get(id).cloned()
    }

    /// Pushes the current Tor settings into the controller after a change.
    pub fn sync_tor_settings(&mut self) {
        let tor = self.settings_engine.get_settings().tor.clone();
        self.tor_controller.update_settings(tor);
    }

    /// Startup connection policy: launch Tor when `auto_start` is set,
    /// otherwise just probe an externally managed instance. No-op when Tor
    /// is disabled.
    pub fn connect_tor(&mut self) -> bool {
        let tor = &self.settings_engine.get_settings().tor;
        if !tor.enabled {
            return false;
        }
        if tor.auto_start {
            self.tor_controller.start()
        } else {
            self.tor_controller.check_connection()
        }
    }

    /// Shutdown sequence: unbind the proxy and stop an owned Tor process.
    pub fn shutdown(&mut self) {
        if self.tor_controller.owns_process() {
            self.tor_controller.stop();
        } else {
            self.tor_controller.clear_proxy();
        }
        tracing::info!("Shell shut down");
    }

    /// Runs the panic wipe for this shell's data root.
    pub fn panic(&self) -> PanicReport {
        self.panic_handler().trigger()
    }
}
