//! RPC method handler for the Darkelf Shell JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches calls from the UI host to the managers and
//! services held by the [`Shell`].

use std::sync::Mutex;

use serde_json::{json, Value};

use crate::app::Shell;
use crate::managers::persona_manager::PersonaManagerTrait;
use crate::managers::session_store::SessionStoreTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::services::tor_controller::TorControllerTrait;
use crate::types::network::NetworkEvent;
use crate::types::persona::{Persona, PersonaOverrides};
use crate::types::session::BrowsingSession;

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn port_param(params: &Value) -> Result<u16, String> {
    let port = params.get("port").and_then(|v| v.as_u64()).ok_or("missing port")?;
    u16::try_from(port).map_err(|_| format!("invalid port: {}", port))
}

fn event_json(event: &NetworkEvent) -> Value {
    match event {
        NetworkEvent::StatusChanged(state) => {
            json!({"type": "status", "connected": state.is_connected()})
        }
        NetworkEvent::Error(e) => json!({"type": "error", "message": e.to_string()}),
        NetworkEvent::IdentityRenewed => json!({"type": "identity_renewed"}),
    }
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(shell: &Mutex<Shell>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Personas ───
        "persona.list" => {
            let s = shell.lock().map_err(|e| e.to_string())?;
            let personas = s.persona_manager.list();
            serde_json::to_value(personas).map_err(|e| e.to_string())
        }
        "persona.get" => {
            let id = str_param(params, "id")?;
            let s = shell.lock().map_err(|e| e.to_string())?;
            match s.persona_manager.get(id) {
                Some(p) => serde_json::to_value(p).map_err(|e| e.to_string()),
                None => Ok(Value::Null),
            }
        }
        "persona.create" => {
            let name = str_param(params, "name")?;
            let overrides: PersonaOverrides = match params.get("overrides") {
                Some(v) => serde_json::from_value(v.clone()).map_err(|e| format!("invalid overrides: {}", e))?,
                None => PersonaOverrides::default(),
            };
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            let persona = s.persona_manager.create(name, overrides).map_err(|e| e.to_string())?;
            serde_json::to_value(persona).map_err(|e| e.to_string())
        }
        "persona.save" => {
            let persona: Persona = serde_json::from_value(params.clone())
                .map_err(|e| format!("invalid persona: {}", e))?;
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            s.persona_manager.save(persona).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "persona.delete" => {
            let id = str_param(params, "id")?;
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            let deleted = s.persona_manager.delete(id).map_err(|e| e.to_string())?;
            Ok(json!({"deleted": deleted}))
        }

        // ─── Sessions ───
        "session.save" => {
            let session: BrowsingSession = serde_json::from_value(params.clone())
                .map_err(|e| format!("invalid session: {}", e))?;
            let s = shell.lock().map_err(|e| e.to_string())?;
            s.session_store.save(&session).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "id": session.id}))
        }
        "session.load" => {
            let id = str_param(params, "id")?;
            let s = shell.lock().map_err(|e| e.to_string())?;
            match s.session_store.load(id).map_err(|e| e.to_string())? {
                Some(session) => serde_json::to_value(session).map_err(|e| e.to_string()),
                None => Ok(Value::Null),
            }
        }
        "session.list" => {
            let s = shell.lock().map_err(|e| e.to_string())?;
            let sessions = s.session_store.list().map_err(|e| e.to_string())?;
            serde_json::to_value(sessions).map_err(|e| e.to_string())
        }
        "session.delete" => {
            let id = str_param(params, "id")?;
            let s = shell.lock().map_err(|e| e.to_string())?;
            let deleted = s.session_store.delete(id).map_err(|e| e.to_string())?;
            Ok(json!({"deleted": deleted}))
        }
        "session.cleanup" => {
            let days = params.get("days").and_then(|v| v.as_u64()).unwrap_or(30);
            let days = u32::try_from(days).map_err(|_| format!("invalid days: {}", days))?;
            let s = shell.lock().map_err(|e| e.to_string())?;
            let removed = s.session_store.cleanup_older_than(days).map_err(|e| e.to_string())?;
            Ok(json!({"removed": removed}))
        }

        // ─── Tor ───
        "tor.status" => {
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            let events: Vec<Value> = s.drain_network_events().iter().map(event_json).collect();
            Ok(json!({
                "connected": s.tor_controller.is_connected(),
                "proxy": s.proxy.proxy_url(),
                "events": events,
            }))
        }
        "tor.check" => {
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            let connected = s.tor_controller.check_connection();
            s.drain_network_events();
            Ok(json!({"connected": connected}))
        }
        "tor.start" => {
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            let connected = s.tor_controller.start();
            if connected {
                s.tor_controller.setup_proxy();
            }
            let events: Vec<Value> = s.drain_network_events().iter().map(event_json).collect();
            Ok(json!({"connected": connected, "events": events}))
        }
        "tor.stop" => {
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            s.tor_controller.stop();
            s.drain_network_events();
            Ok(json!({"ok": true}))
        }
        "tor.new_identity" => {
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            let renewed = s.tor_controller.new_identity();
            let events: Vec<Value> = s.drain_network_events().iter().map(event_json).collect();
            Ok(json!({"renewed": renewed, "events": events}))
        }

        // ─── Settings ───
        "settings.get" => {
            let s = shell.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(s.settings_engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set_socks_port" => {
            let port = port_param(params)?;
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            s.settings_engine.set_socks_port(port).map_err(|e| e.to_string())?;
            s.sync_tor_settings();
            Ok(json!({"ok": true}))
        }
        "settings.set_control_port" => {
            let port = port_param(params)?;
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            s.settings_engine.set_control_port(port).map_err(|e| e.to_string())?;
            s.sync_tor_settings();
            Ok(json!({"ok": true}))
        }
        "settings.set_auto_start" => {
            let enabled = params.get("value").and_then(|v| v.as_bool()).ok_or("missing value")?;
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            s.settings_engine.set_auto_start(enabled).map_err(|e| e.to_string())?;
            s.sync_tor_settings();
            Ok(json!({"ok": true}))
        }
        "settings.set_default_persona" => {
            let id = str_param(params, "id")?;
            let mut s = shell.lock().map_err(|e| e.to_string())?;
            if s.persona_manager.get(id).is_none() {
                return Err(format!("unknown persona: {}", id));
            }
            s.settings_engine.set_default_persona(id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Panic ───
        "panic.trigger" => {
            let s = shell.lock().map_err(|e| e.to_string())?;
            let report = s.panic();
            let failures: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
            Ok(json!({"removed": report.removed_count(), "failures": failures}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
