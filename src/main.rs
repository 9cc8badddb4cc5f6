//! Darkelf Shell host process.
//!
//! Wires the shell under the data root, connects Tor according to the
//! settings, starts the status poller and keeps the proxy binding in step with
//! the poller's events. SIGINT or SIGTERM runs the panic wipe and exits.

use std::io;

use darkelf_shell::app::Shell;
use darkelf_shell::platform::{default_root, ShellPaths};
use darkelf_shell::services::panic_handler::panic_shutdown;
use darkelf_shell::services::tor_controller::TorControllerTrait;
use darkelf_shell::types::network::NetworkEvent;

#[cfg(unix)]
async fn terminate() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> io::Result<()> {
    std::future::pending().await
}

/// Follows network events until a termination signal arrives.
async fn run_until_signal(shell: &mut Shell) -> io::Result<()> {
    let shutdown = async {
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            res = terminate() => res,
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => return res,
            event = shell.next_network_event() => match event {
                Some(NetworkEvent::StatusChanged(state)) => {
                    if state.is_connected() {
                        shell.tor_controller.setup_proxy();
                    } else {
                        shell.tor_controller.clear_proxy();
                    }
                }
                Some(NetworkEvent::Error(e)) => tracing::warn!(error = %e, "Tor error"),
                Some(NetworkEvent::IdentityRenewed) => tracing::info!("New Tor identity in use"),
                None => return (&mut shutdown).await,
            },
        }
    }
}

fn main() {
    darkelf_shell::init_tracing();

    let paths = ShellPaths::new(default_root());
    let mut shell = match Shell::new(paths.clone()) {
        Ok(shell) => shell,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Darkelf Shell");
            std::process::exit(1);
        }
    };

    match shell.default_persona() {
        Some(persona) => tracing::info!(persona_id = %persona.id, name = %persona.name, "Active persona"),
        None => tracing::warn!("Configured default persona is not registered"),
    }

    if shell.connect_tor() {
        shell.tor_controller.setup_proxy();
    }

    let mut poller = match shell.tor_controller.start_poller() {
        Ok(poller) => Some(poller),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start Tor status poller");
            None
        }
    };

    let signalled = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .and_then(|runtime| runtime.block_on(run_until_signal(&mut shell)));

    if let Some(poller) = poller.as_mut() {
        poller.stop();
    }

    match signalled {
        Ok(()) => {
            tracing::warn!("Signal received, initiating panic procedure");
            shell.shutdown();
            drop(shell);
            panic_shutdown(&paths);
        }
        Err(e) => {
            tracing::error!(error = %e, "Signal handling failed");
            shell.shutdown();
            std::process::exit(1);
        }
    }
}
