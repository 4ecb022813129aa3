//! Tracing subscriber setup for hosts and the demo binary.

use clap::ValueEnum;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding a filter directive. Takes precedence over
/// `RUST_LOG`.
pub const LOG_ENV: &str = "BREADCRUMB_LOG";

/// Output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable lines.
    Pretty,
}

/// Picks the filter directive: `BREADCRUMB_LOG`, then `RUST_LOG`, then
/// `default_directive`. An unparseable directive falls through to the next
/// source.
#[must_use]
pub fn resolve_filter(
    custom: Option<&str>,
    rust_log: Option<&str>,
    default_directive: &str,
) -> EnvFilter {
    [custom, rust_log]
        .into_iter()
        .flatten()
        .find_map(|directive| match EnvFilter::try_new(directive) {
            Ok(filter) => Some(filter),
            Err(err) => {
                eprintln!("invalid log directive {directive:?} ({err}); ignoring");
                None
            }
        })
        .unwrap_or_else(|| EnvFilter::new(default_directive))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(format: LogFormat, default_directive: &str) -> anyhow::Result<()> {
    let custom = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(custom.as_deref(), rust_log.as_deref(), default_directive);

    let fmt_layer = match format {
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
