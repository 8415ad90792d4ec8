//! Subscriber setup for the `es3-harmony` binary.
//!
//! Filtering comes from `ES3_HARMONY_LOG`, falling back to `RUST_LOG`, with
//! the usual `EnvFilter` directive syntax:
//!
//! ```bash
//! ES3_HARMONY_LOG=debug es3-harmony rewrite dist/
//! ES3_HARMONY_LOG=es3_harmony::compose=trace ES3_HARMONY_LOG_FORMAT=json es3-harmony rewrite dist/
//! ```
//!
//! Nothing is installed when neither variable is set. Output goes to stderr.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

pub const LOG_ENV: &str = "ES3_HARMONY_LOG";
pub const LOG_FORMAT_ENV: &str = "ES3_HARMONY_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Newline-delimited JSON objects
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var(LOG_FORMAT_ENV).unwrap_or_default())
    }
}

fn build_filter() -> Option<EnvFilter> {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        return Some(EnvFilter::builder().parse_lossy(directives));
    }
    std::env::var("RUST_LOG")
        .is_ok()
        .then(EnvFilter::from_default_env)
}

/// Install the global subscriber if logging was requested.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let Some(filter) = build_filter() else {
        return;
    };

    let installed = match LogFormat::from_env() {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
