//! Unit tests for TorController against local stand-ins for Tor's SOCKS and
//! control ports. No real Tor instance is needed.

use darkelf_shell::services::proxy::{ProcessProxy, ProxyBinding};
use darkelf_shell::services::tor_controller::{TorController, TorControllerTrait};
use darkelf_shell::types::errors::NetworkError;
use darkelf_shell::types::network::{ConnectionState, NetworkEvent};
use darkelf_shell::types::settings::TorSettings;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

/// A port that nothing listens on.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn test_settings() -> TorSettings {
    TorSettings {
        socks_port: closed_port(),
        control_port: closed_port(),
        settle_delay_secs: 0,
        probe_timeout_secs: 2,
        control_timeout_secs: 2,
        poll_interval_secs: 1,
        ..TorSettings::default()
    }
}

fn controller(
    settings: TorSettings,
    dir: &TempDir,
) -> (TorController, UnboundedReceiver<NetworkEvent>, Arc<ProcessProxy>) {
    let proxy = Arc::new(ProcessProxy::new());
    let (controller, events) = TorController::new(settings, dir.path().join("tor"), proxy.clone());
    (controller, events, proxy)
}

fn drain(events: &mut UnboundedReceiver<NetworkEvent>) -> Vec<NetworkEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Minimal SOCKS5 server that accepts one CONNECT and answers the tunnelled
/// HTTP request with `200 OK`.
fn fake_socks_server() -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        // Greeting: VER, NMETHODS, METHODS...
        let mut head = [0u8; 2];
        stream.read_exact(&mut head).unwrap();
        let mut methods = vec![0u8; head[1] as usize];
        stream.read_exact(&mut methods).unwrap();
        stream.write_all(&[5, 0]).unwrap();

        // Request: VER, CMD, RSV, ATYP, then the address and port.
        let mut request = [0u8; 4];
        stream.read_exact(&mut request).unwrap();
        let addr_len = match request[3] {
            1 => 4,
            4 => 16,
            _ => {
                let mut len = [0u8; 1];
                stream.read_exact(&mut len).unwrap();
                len[0] as usize
            }
        };
        let mut rest = vec![0u8; addr_len + 2];
        stream.read_exact(&mut rest).unwrap();
        stream.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).unwrap();

        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .unwrap();
    });
    (port, handle)
}

/// Control-port stand-in: acknowledges AUTHENTICATE, then answers
/// SIGNAL NEWNYM with `newnym_reply`.
fn fake_control_port(newnym_reply: &'static str) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut commands = Vec::new();

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        commands.push(line.trim_end().to_string());
        stream.write_all(b"250 OK\r\n").unwrap();

        line.clear();
        reader.read_line(&mut line).unwrap();
        commands.push(line.trim_end().to_string());
        stream.write_all(newnym_reply.as_bytes()).unwrap();
        commands
    });
    (port, handle)
}

#[test]
fn test_new_controller_is_disconnected() {
    let dir = TempDir::new().unwrap();
    let (tor, mut events, proxy) = controller(test_settings(), &dir);

    assert_eq!(tor.state(), ConnectionState::Disconnected);
    assert!(!tor.is_connected());
    assert!(!tor.owns_process());
    assert!(proxy.current().is_none());
    assert!(drain(&mut events).is_empty());
}

#[test]
fn test_check_connection_fails_without_tor() {
    let dir = TempDir::new().unwrap();
    let (mut tor, mut events, _proxy) = controller(test_settings(), &dir);

    assert!(!tor.check_connection());
    assert!(!tor.is_connected());
    assert_eq!(
        drain(&mut events),
        vec![NetworkEvent::StatusChanged(ConnectionState::Disconnected)]
    );
}

#[test]
fn test_check_connection_through_socks_proxy() {
    let dir = TempDir::new().unwrap();
    let (port, server) = fake_socks_server();
    let settings = TorSettings {
        socks_port: port,
        ..test_settings()
    };
    let (mut tor, mut events, proxy) = controller(settings, &dir);

    assert!(tor.check_connection());
    server.join().unwrap();
    assert!(tor.is_connected());
    assert_eq!(
        drain(&mut events),
        vec![NetworkEvent::StatusChanged(ConnectionState::Connected)]
    );

    // Already connected: start() does not launch anything.
    assert!(tor.start());
    assert!(!tor.owns_process());

    assert!(tor.setup_proxy());
    assert_eq!(proxy.current(), Some(tor.socks_address()));
    assert_eq!(proxy.proxy_url(), Some(format!("socks5h://127.0.0.1:{}", port)));
}

#[test]
fn test_setup_proxy_refused_while_disconnected() {
    let dir = TempDir::new().unwrap();
    let (tor, mut events, proxy) = controller(test_settings(), &dir);

    assert!(!tor.setup_proxy());
    assert!(proxy.current().is_none());
    assert_eq!(drain(&mut events), vec![NetworkEvent::Error(NetworkError::NotConnected)]);
}

#[test]
fn test_start_reports_missing_executable() {
    let dir = TempDir::new().unwrap();
    let settings = TorSettings {
        executable: "definitely-not-a-real-tor-binary".to_string(),
        ..test_settings()
    };
    let (mut tor, mut events, _proxy) = controller(settings, &dir);

    assert!(!tor.start());
    assert!(!tor.owns_process());
    assert_eq!(
        drain(&mut events),
        vec![
            NetworkEvent::StatusChanged(ConnectionState::Disconnected),
            NetworkEvent::Error(NetworkError::ExecutableNotFound(
                "definitely-not-a-real-tor-binary".to_string()
            )),
        ]
    );
}

/// A file that exists but cannot be executed is a launch failure, not a
/// missing executable.
#[cfg(unix)]
#[test]
fn test_start_reports_launch_failure() {
    let dir = TempDir::new().unwrap();
    let not_executable = dir.path().join("tor");
    std::fs::write(&not_executable, "plain text, no exec bit").unwrap();
    let settings = TorSettings {
        executable: not_executable.to_string_lossy().into_owned(),
        ..test_settings()
    };
    let (mut tor, mut events) = TorController::new(
        settings,
        dir.path().join("tor-data"),
        Arc::new(ProcessProxy::new()),
    );

    assert!(!tor.start());
    assert!(!tor.owns_process());
    assert!(matches!(
        drain(&mut events).as_slice(),
        [
            NetworkEvent::StatusChanged(ConnectionState::Disconnected),
            NetworkEvent::Error(NetworkError::LaunchFailed(_)),
        ]
    ));
}

/// A Tor instance that is already reachable is reused instead of launching
/// a second process.
#[test]
fn test_start_reuses_reachable_instance() {
    let dir = TempDir::new().unwrap();
    let (port, server) = fake_socks_server();
    let settings = TorSettings {
        socks_port: port,
        executable: "definitely-not-a-real-tor-binary".to_string(),
        ..test_settings()
    };
    let (mut tor, mut events, _proxy) = controller(settings, &dir);

    assert!(tor.start());
    server.join().unwrap();
    assert!(!tor.owns_process());
    assert_eq!(
        drain(&mut events),
        vec![NetworkEvent::StatusChanged(ConnectionState::Connected)]
    );
}

/// `stop()` asks an owned process to exit with SIGTERM before killing it.
#[cfg(unix)]
#[test]
fn test_stop_terminates_owned_process_gracefully() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("terminated");
    let script = dir.path().join("fake-tor.sh");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\ntrap 'echo term > \"{}\"; exit 0' TERM\nsleep 30 &\nwait $!\n",
            marker.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let settings = TorSettings {
        executable: script.to_string_lossy().into_owned(),
        settle_delay_secs: 1,
        ..test_settings()
    };
    let (mut tor, _events, _proxy) = controller(settings, &dir);

    assert!(!tor.start(), "Nothing listens on the SOCKS port");
    assert!(tor.owns_process());

    let started = std::time::Instant::now();
    tor.stop();
    assert!(!tor.owns_process());
    assert!(marker.exists(), "The process must see SIGTERM");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_stop_without_process_clears_proxy() {
    let dir = TempDir::new().unwrap();
    let (mut tor, mut events, proxy) = controller(test_settings(), &dir);
    tor.apply(&NetworkEvent::StatusChanged(ConnectionState::Connected));
    assert!(tor.setup_proxy());

    tor.stop();
    assert!(!tor.is_connected());
    assert!(proxy.current().is_none());
    assert_eq!(
        drain(&mut events),
        vec![NetworkEvent::StatusChanged(ConnectionState::Disconnected)]
    );
}

#[test]
fn test_apply_only_status_changes_state() {
    let dir = TempDir::new().unwrap();
    let (mut tor, _events, _proxy) = controller(test_settings(), &dir);

    tor.apply(&NetworkEvent::IdentityRenewed);
    assert!(!tor.is_connected());
    tor.apply(&NetworkEvent::StatusChanged(ConnectionState::Connected));
    assert!(tor.is_connected());
    tor.apply(&NetworkEvent::Error(NetworkError::NotConnected));
    assert!(tor.is_connected());
}

#[test]
fn test_new_identity_acknowledged() {
    let dir = TempDir::new().unwrap();
    let (port, server) = fake_control_port("250 OK\r\n");
    let settings = TorSettings {
        control_port: port,
        ..test_settings()
    };
    let (tor, mut events, _proxy) = controller(settings, &dir);

    assert!(tor.new_identity());
    let commands = server.join().unwrap();
    assert_eq!(commands, vec!["AUTHENTICATE", "SIGNAL NEWNYM"]);
    assert_eq!(drain(&mut events), vec![NetworkEvent::IdentityRenewed]);
}

#[test]
fn test_new_identity_rejected() {
    let dir = TempDir::new().unwrap();
    let (port, server) = fake_control_port("552 Unrecognized signal\r\n");
    let settings = TorSettings {
        control_port: port,
        ..test_settings()
    };
    let (tor, mut events, _proxy) = controller(settings, &dir);

    assert!(!tor.new_identity());
    server.join().unwrap();
    match drain(&mut events).as_slice() {
        [NetworkEvent::Error(NetworkError::IdentityRejected(reply))] => {
            assert!(reply.contains("552"));
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn test_new_identity_without_control_port() {
    let dir = TempDir::new().unwrap();
    let (tor, mut events, _proxy) = controller(test_settings(), &dir);

    assert!(!tor.new_identity());
    assert!(matches!(
        drain(&mut events).as_slice(),
        [NetworkEvent::Error(NetworkError::ControlChannel(_))]
    ));
}

#[test]
fn test_poller_publishes_status() {
    let dir = TempDir::new().unwrap();
    let (tor, mut events, _proxy) = controller(test_settings(), &dir);

    let mut poller = tor.start_poller().unwrap();
    assert!(poller.is_running());
    let event = events.blocking_recv();
    poller.stop();

    assert_eq!(event, Some(NetworkEvent::StatusChanged(ConnectionState::Disconnected)));
    assert!(!poller.is_running());
}

#[test]
fn test_update_settings_changes_endpoints() {
    let dir = TempDir::new().unwrap();
    let (mut tor, _events, _proxy) = controller(test_settings(), &dir);

    let settings = TorSettings {
        socks_port: 9150,
        control_port: 9151,
        ..TorSettings::default()
    };
    tor.update_settings(settings);
    assert_eq!(tor.socks_address().to_string(), "127.0.0.1:9150");
    assert_eq!(tor.control_address().to_string(), "127.0.0.1:9151");
    assert_eq!(tor.settings().socks_port, 9150);
}
