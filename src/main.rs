mod calc;
mod categories;
mod config;
mod diagnostics;
mod ipc;
mod model;

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    // stdout carries responses; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let (settings, settings_error) = config::settings_from_env();
    init_logging(&settings.log_level);
    if let Some(e) = settings_error {
        tracing::warn!(error = %e, "ignoring settings file; using defaults");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        overall_policy = ?settings.overall_policy,
        "gradebookd ready"
    );

    let mut state = ipc::AppState { settings };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                tracing::warn!(error = %e, "bad request line");
                let resp = ipc::err("", "bad_json", e.to_string(), None);
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
