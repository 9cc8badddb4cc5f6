//! Darkelf Shell RPC Server: JSON-RPC over stdin/stdout for the UI host.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"persona.get", "params":{"id":"stealth"}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}

use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::time::Instant;

use darkelf_shell::app::Shell;
use darkelf_shell::platform::{default_root, ShellPaths};
use darkelf_shell::rpc_handler::handle_method;

use serde_json::{json, Value};

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn respond(out: &mut impl Write, value: &Value) -> io::Result<()> {
    writeln!(out, "{}", value)?;
    out.flush()
}

fn main() {
    darkelf_shell::init_tracing();

    let paths = ShellPaths::new(default_root());
    let shell = match Shell::new(paths) {
        Ok(shell) => Mutex::new(shell),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Darkelf Shell");
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if respond(&mut out, &json!({"event":"ready","version":env!("CARGO_PKG_VERSION")})).is_err() {
        return;
    }

    let mut rate_limiter = RateLimiter::new(200);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Err(e) => json!({"id": null, "error": format!("parse error: {}", e)}),
            Ok(req) => {
                let id = req.get("id").cloned().unwrap_or(Value::Null);
                if !rate_limiter.check() {
                    json!({"id": id, "error": "rate limit exceeded"})
                } else {
                    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    match handle_method(&shell, method, &params) {
                        Ok(val) => json!({"id": id, "result": val}),
                        Err(err) => json!({"id": id, "error": err}),
                    }
                }
            }
        };

        if respond(&mut out, &response).is_err() {
            break;
        }
    }

    let mut shell = shell.into_inner().unwrap_or_else(|e| e.into_inner());
    shell.shutdown();
}
