//! Logging and trace export for scout binaries.
//!
//! [`init_tracing`] installs the process-wide `tracing` subscriber: an
//! `EnvFilter`, a console formatter in the requested [`LogFormat`], and,
//! when a collector is configured, an OpenTelemetry layer that ships spans
//! over OTLP/HTTP.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Filter directives; `info` when unset or invalid. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Collector URL, e.g. `http://localhost:4318`. Blank means no export. |
//!
//! ```rust,no_run
//! use scout_runtime::telemetry::{init_tracing, LogFormat};
//!
//! let _tracing = init_tracing("scout", LogFormat::Json);
//! // ... run the mission; spans are flushed when `_tracing` drops.
//! ```

use std::fmt;
use std::str::FromStr;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Console log layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event, for people watching a mission.
    #[default]
    Compact,
    /// Newline-delimited JSON, for log shippers.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?} (expected compact or json)")),
        }
    }
}

/// Install the global subscriber.  Call once, before the first log line.
///
/// Keep the returned guard alive until the process exits; spans recorded
/// after it drops are not exported.
pub fn init_tracing(service_name: &str, format: LogFormat) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let provider = otlp_endpoint(std::env::var(ENDPOINT_VAR).ok())
        .and_then(|endpoint| otlp_provider(&endpoint, service_name));
    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("scout")));

    let subscriber = tracing_subscriber::registry().with(filter).with(otel);
    match format {
        LogFormat::Json => subscriber.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Compact => subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .init(),
    }

    TracerProviderGuard { provider }
}

/// Flushes and shuts down the OTLP pipeline on drop.
pub struct TracerProviderGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracerProviderGuard {
    /// Whether spans are being exported.
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        if let Err(e) = provider.shutdown() {
            eprintln!("[scout] trace export shutdown failed: {e}");
        }
    }
}

/// A usable collector URL, ignoring blank values.
fn otlp_endpoint(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Errors go to stderr: the subscriber that would log them is not up yet.
fn otlp_provider(endpoint: &str, service_name: &str) -> Option<SdkTracerProvider> {
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("[scout] OTLP exporter for {endpoint} unavailable: {e}");
            return None;
        }
    };

    // Simple (synchronous) export: the sequential mission loop runs without
    // a tokio runtime.
    Some(
        SdkTracerProvider::builder()
            .with_resource(
                Resource::builder()
                    .with_service_name(service_name.to_string())
                    .build(),
            )
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_endpoint_disables_export() {
        assert_eq!(otlp_endpoint(None), None);
        assert_eq!(otlp_endpoint(Some("   ".to_string())), None);
        assert_eq!(
            otlp_endpoint(Some(" http://collector:4318 ".to_string())),
            Some("http://collector:4318".to_string())
        );
    }

    #[test]
    fn idle_guard_reports_no_export_and_drops_cleanly() {
        let guard = TracerProviderGuard { provider: None };
        assert!(!guard.exporting());
        drop(guard);
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" compact ".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("pretty".parse::<LogFormat>().is_err());
    }

    #[test]
    fn log_format_reads_from_toml() {
        #[derive(Deserialize)]
        struct Logging {
            format: LogFormat,
        }
        let parsed: Logging = toml::from_str(r#"format = "json""#).unwrap();
        assert_eq!(parsed.format, LogFormat::Json);
        assert_eq!(LogFormat::default().to_string(), "compact");
    }
}
