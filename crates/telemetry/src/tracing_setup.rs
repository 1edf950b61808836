//! Tracing setup for structured logging.
//!
//! `RUST_LOG` wins over the configured filter. `INSIGHTS_LOG_FORMAT=json`
//! switches to one JSON object per line for log shippers.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "INSIGHTS_LOG_FORMAT";

/// Filter used when neither `RUST_LOG` nor a caller filter is usable.
pub const DEFAULT_FILTER: &str =
    "info,insights_engine=info,insights_analytics=info,event_store=info,worker=info,tower_http=warn";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Installs the global subscriber.
///
/// Returns false if one was already installed (tests install it repeatedly).
pub fn init_tracing(filter: &str, format: LogFormat) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .is_ok(),
        LogFormat::Pretty => registry.with(fmt::layer().compact()).try_init().is_ok(),
    };

    if installed {
        tracing::info!(filter, format = ?format, "Tracing initialized");
    }
    installed
}

/// Installs the subscriber from `RUST_LOG` and `INSIGHTS_LOG_FORMAT`.
pub fn init_tracing_from_env() -> bool {
    let format = std::env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    init_tracing(DEFAULT_FILTER, format)
}
