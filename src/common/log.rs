//! Logging setup and the structured event helper used by every service.
//!
//! Events carry the same fields regardless of output format: `module`,
//! `event`, `code` and `dur_ms`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::common::config::LogFormat;
use crate::common::error::ErrorCode;

const DEFAULT_FILTER: &str = "propval=info,tower_http=info";

/// Severity for [`log_event`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .try_init()
        .ok();
}

/// Emit one structured event.
pub fn log_event(level: Level, module: &str, event: &str, code: ErrorCode, dur_ms: u128) {
    let code = code as u32;
    match level {
        Level::Info => tracing::info!(module, event, code, dur_ms, "{module}.{event}"),
        Level::Warn => tracing::warn!(module, event, code, dur_ms, "{module}.{event}"),
        Level::Error => tracing::error!(module, event, code, dur_ms, "{module}.{event}"),
    }
}
