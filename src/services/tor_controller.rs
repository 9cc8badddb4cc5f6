//! Tor Controller for Darkelf Shell.
//!
//! Supervises the data-plane connection through the local Tor SOCKS port,
//! launches and stops an owned Tor process, requests circuit rotation over
//! the control port, and binds the proxy into the process-wide network stack.
//!
//! No operation returns an error: failures become a `false`/no-op result plus
//! a [`NetworkEvent`] on the controller's channel.

use std::fs;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::services::periodic_task::PeriodicTask;
use crate::services::proxy::ProxyBinding;
use crate::types::errors::NetworkError;
use crate::types::network::{ConnectionState, NetworkEvent};
use crate::types::settings::TorSettings;

/// Reply token the control port sends on success.
const CONTROL_OK: &str = "250 OK";

/// How long an owned Tor process gets to exit after SIGTERM before it is killed.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Trait defining network identity operations.
pub trait TorControllerTrait {
    fn check_connection(&mut self) -> bool;
    fn start(&mut self) -> bool;
    fn stop(&mut self);
    fn new_identity(&self) -> bool;
    fn setup_proxy(&self) -> bool;
    fn clear_proxy(&self);
    fn is_connected(&self) -> bool;
}

/// One proxied connection to the reachability target.
///
/// Immutable and cheap to clone, so the background poller can own a copy
/// without sharing any state with the controller.
#[derive(Debug, Clone)]
pub struct ReachabilityProbe {
    proxy_url: String,
    target_url: String,
    timeout: Duration,
}

impl ReachabilityProbe {
    pub fn new(settings: &TorSettings) -> Self {
        Self {
            proxy_url: format!("socks5h://{}:{}", Ipv4Addr::LOCALHOST, settings.socks_port),
            target_url: format!("http://{}:{}/", settings.probe_host, settings.probe_port),
            timeout: Duration::from_secs(settings.probe_timeout_secs),
        }
    }

    /// Opens a connection to the target through the SOCKS proxy. Any HTTP
    /// response counts as reachable; the hostname is resolved by Tor.
    pub fn run(&self) -> Result<(), NetworkError> {
        let proxy = reqwest::Proxy::all(&self.proxy_url)
            .map_err(|e| NetworkError::ProbeFailed(e.to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .proxy(proxy)
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|e| NetworkError::ProbeFailed(e.to_string()))?;
        client
            .head(&self.target_url)
            .send()
            .map_err(|e| NetworkError::ProbeFailed(e.to_string()))?;
        Ok(())
    }
}

/// Tor connection supervisor.
pub struct TorController {
    settings: TorSettings,
    data_dir: PathBuf,
    process: Option<Child>,
    state: ConnectionState,
    events: UnboundedSender<NetworkEvent>,
    proxy: Arc<dyn ProxyBinding>,
}

impl TorController {
    /// Creates a disconnected controller and the receiver for its events.
    ///
    /// `data_dir` becomes Tor's `--DataDirectory` when the controller
    /// launches its own process.
    pub fn new(
        settings: TorSettings,
        data_dir: PathBuf,
        proxy: Arc<dyn ProxyBinding>,
    ) -> (Self, UnboundedReceiver<NetworkEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            settings,
            data_dir,
            process: None,
            state: ConnectionState::Disconnected,
            events,
            proxy,
        };
        (controller, receiver)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn settings(&self) -> &TorSettings {
        &self.settings
    }

    /// Replaces the settings used by later probes, launches and control
    /// requests. A running poller keeps the probe it was started with.
    pub fn update_settings(&mut self, settings: TorSettings) {
        self.settings = settings;
    }

    pub fn owns_process(&self) -> bool {
        self.process.is_some()
    }

    pub fn socks_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.settings.socks_port))
    }

    pub fn control_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.settings.control_port))
    }

    pub fn probe(&self) -> ReachabilityProbe {
        ReachabilityProbe::new(&self.settings)
    }

    /// Folds an event received from the channel back into the controller.
    /// Only status events change state.
    pub fn apply(&mut self, event: &NetworkEvent) {
        if let NetworkEvent::StatusChanged(state) = event {
            self.set_state(*state);
        }
    }

    /// Starts the background status poller.
    ///
    /// Every `poll_interval_secs` the poller runs its own copy of the probe
    /// and publishes `StatusChanged` on this controller's channel. Call
    /// [`PeriodicTask::stop`] to cancel it and wait for it to exit.
    pub fn start_poller(&self) -> io::Result<PeriodicTask> {
        let probe = self.probe();
        let events = self.events.clone();
        let interval = Duration::from_secs(self.settings.poll_interval_secs.max(1));
        PeriodicTask::spawn("tor-status-poller", interval, move || {
            let state = ConnectionState::from_reachable(probe.run().is_ok());
            let _ = events.send(NetworkEvent::StatusChanged(state));
        })
    }

    fn emit(&self, event: NetworkEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }

    fn emit_error(&self, error: NetworkError) {
        tracing::warn!(error = %error, "Tor error");
        self.emit(NetworkEvent::Error(error));
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::info!(from = ?self.state, to = ?state, "Tor connection state changed");
        }
        self.state = state;
    }

    fn launch(&mut self) -> Result<(), NetworkError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            NetworkError::LaunchFailed(format!(
                "cannot create data directory {}: {}",
                self.data_dir.display(),
                e
            ))
        })?;

        let strict = if self.settings.strict_nodes { "1" } else { "0" };
        let child = Command::new(&self.settings.executable)
            .arg("--SocksPort")
            .arg(self.settings.socks_port.to_string())
            .arg("--ControlPort")
            .arg(self.settings.control_port.to_string())
            .arg("--DataDirectory")
            .arg(&self.data_dir)
            .arg("--ExitNodes")
            .arg(self.settings.exit_nodes_arg())
            .arg("--StrictNodes")
            .arg(strict)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    NetworkError::ExecutableNotFound(self.settings.executable.clone())
                }
                _ => NetworkError::LaunchFailed(e.to_string()),
            })?;

        tracing::info!(pid = child.id(), "Launched Tor process");
        self.process = Some(child);
        Ok(())
    }

    fn request_new_identity(&self) -> Result<(), NetworkError> {
        let timeout = Duration::from_secs(self.settings.control_timeout_secs.max(1));
        let channel = |e: io::Error| NetworkError::ControlChannel(e.to_string());

        let mut stream = TcpStream::connect_timeout(&self.control_address(), timeout).map_err(channel)?;
        stream.set_read_timeout(Some(timeout)).map_err(channel)?;
        stream.set_write_timeout(Some(timeout)).map_err(channel)?;

        send_command(&mut stream, "AUTHENTICATE").map_err(channel)?;
        read_reply(&mut stream).map_err(channel)?;

        send_command(&mut stream, "SIGNAL NEWNYM").map_err(channel)?;
        let reply = read_reply(&mut stream).map_err(channel)?;

        if reply.contains(CONTROL_OK) {
            Ok(())
        } else {
            Err(NetworkError::IdentityRejected(reply.trim().to_string()))
        }
    }
}

fn send_command(stream: &mut TcpStream, command: &str) -> io::Result<()> {
    stream.write_all(format!("{}\r\n", command).as_bytes())?;
    stream.flush()
}

/// Sends SIGTERM and waits up to `grace` for the process to exit, then kills it.
fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        use std::time::Instant;

        if let Err(e) = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
            tracing::warn!(error = %e, "Failed to send SIGTERM to Tor process");
        }
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!(%status, "Tor process exited");
                    return;
                }
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to poll Tor process");
                    break;
                }
            }
        }
        tracing::warn!("Tor process did not exit after SIGTERM, killing it");
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill() {
        tracing::warn!(error = %e, "Failed to kill Tor process");
    }
    match child.wait() {
        Ok(status) => tracing::info!(%status, "Tor process exited"),
        Err(e) => tracing::warn!(error = %e, "Failed to reap Tor process"),
    }
}

fn read_reply(stream: &mut TcpStream) -> io::Result<String> {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
}

impl TorControllerTrait for TorController {
    /// Probes the reachability target through the SOCKS port and publishes
    /// the result. Never fails; any error means `Disconnected`.
    fn check_connection(&mut self) -> bool {
        let result = self.probe().run();
        if let Err(e) = &result {
            tracing::debug!(error = %e, "Tor reachability probe failed");
        }
        let state = ConnectionState::from_reachable(result.is_ok());
        self.set_state(state);
        self.emit(NetworkEvent::StatusChanged(state));
        state.is_connected()
    }

    /// Launches Tor unless it is already reachable, waits the fixed settle
    /// delay and checks the connection once.
    ///
    /// An instance someone else started is probed first and reused, never
    /// launched over. The single re-check is not a readiness guarantee: a
    /// slow bootstrap reports `false` here and is picked up later by the poller.
    fn start(&mut self) -> bool {
        if self.state.is_connected() || self.check_connection() {
            return true;
        }

        let running = match self.process.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        };
        if !running {
            self.process = None;
            if let Err(e) = self.launch() {
                tracing::error!(error = %e, "Tor launch failed");
                self.emit(NetworkEvent::Error(e));
                return false;
            }
        }

        thread::sleep(Duration::from_secs(self.settings.settle_delay_secs));
        self.check_connection()
    }

    /// Terminates the owned Tor process, if any, and drops to `Disconnected`.
    fn stop(&mut self) {
        if let Some(mut child) = self.process.take() {
            terminate(&mut child, STOP_GRACE);
        }
        self.set_state(ConnectionState::Disconnected);
        self.emit(NetworkEvent::StatusChanged(ConnectionState::Disconnected));
        self.clear_proxy();
    }

    /// Asks Tor for fresh circuits over the control port. `true` only when
    /// the reply carries the `250 OK` acknowledgment.
    fn new_identity(&self) -> bool {
        match self.request_new_identity() {
            Ok(()) => {
                tracing::info!("Tor identity renewed");
                self.emit(NetworkEvent::IdentityRenewed);
                true
            }
            Err(e) => {
                self.emit_error(e);
                false
            }
        }
    }

    /// Binds the SOCKS endpoint into the network stack. Requires `Connected`.
    fn setup_proxy(&self) -> bool {
        if !self.state.is_connected() {
            self.emit_error(NetworkError::NotConnected);
            return false;
        }
        self.proxy.bind(self.socks_address());
        true
    }

    fn clear_proxy(&self) {
        self.proxy.clear();
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}

impl Drop for TorController {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
