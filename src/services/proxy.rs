//! Process-wide proxy binding.
//!
//! The rendering engine reads the active SOCKS5 endpoint from a
//! [`ProxyBinding`]; the Tor controller is the only writer.

use std::net::SocketAddr;
use std::sync::Mutex;

/// The network-stack collaborator the controller binds its proxy into.
pub trait ProxyBinding: Send + Sync {
    fn bind(&self, endpoint: SocketAddr);
    fn clear(&self);
    fn current(&self) -> Option<SocketAddr>;
}

/// In-process binding that records the active SOCKS5 endpoint.
#[derive(Debug, Default)]
pub struct ProcessProxy {
    active: Mutex<Option<SocketAddr>>,
}

impl ProcessProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Proxy URL for HTTP clients, e.g. `socks5h://127.0.0.1:9050`.
    pub fn proxy_url(&self) -> Option<String> {
        self.current().map(|addr| format!("socks5h://{}", addr))
    }
}

impl ProxyBinding for ProcessProxy {
    fn bind(&self, endpoint: SocketAddr) {
        if let Ok(mut active) = self.active.lock() {
            *active = Some(endpoint);
        }
        tracing::info!(%endpoint, "Bound SOCKS5 proxy");
    }

    fn clear(&self) {
        if let Ok(mut active) = self.active.lock() {
            if active.take().is_some() {
                tracing::info!("Cleared SOCKS5 proxy");
            }
        }
    }

    fn current(&self) -> Option<SocketAddr> {
        self.active.lock().ok().and_then(|active| *active)
    }
}
