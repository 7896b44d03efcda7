// src/logging.rs

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global fmt subscriber. Directives come from `RUST_LOG` when
/// set, otherwise from `default_directives` (e.g. `"info,runset=debug"`).
///
/// The readers only emit events; nothing in this crate calls this itself.
pub fn init(default_directives: &str) -> Result<()> {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {}", e))
}
