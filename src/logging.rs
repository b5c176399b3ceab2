//! Structured logging for artifact-transform
//!
//! All logs use structured fields for easy parsing and analysis.
//!
//! # Log Format Conventions
//!
//! - `operation`: The operation being performed ("execute", "fingerprint")
//! - `status`: The result status ("success", "error")
//! - `implementation`: Transform implementation id (e.g., "copy")
//! - `primary_input`: Path of the artifact being transformed
//! - `output_count`: Number of outputs a transform produced
//! - `duration_ms`: Wall-clock duration of an execution
//!
//! # Examples
//!
//! ```rust,ignore
//! use tracing::info;
//!
//! info!(
//!     operation = "execute",
//!     status = "success",
//!     implementation = "copy",
//!     output_count = 1,
//!     "transform completed"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Compact formatter tagging every line with "transform" instead of the
/// module path
struct TransformFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for TransformFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f%:z")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m", // Red
                tracing::Level::WARN => "\x1b[33m",  // Yellow
                tracing::Level::INFO => "\x1b[32m",  // Green
                tracing::Level::DEBUG => "\x1b[34m", // Blue
                tracing::Level::TRACE => "\x1b[35m", // Magenta
            };
            write!(writer, "{}{:5}(transform)\x1b[0m: ", level_style, meta.level())?;
        } else {
            write!(writer, "{:5}(transform): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors (default for development)
    Pretty,
    /// Same layout without colors (for CI)
    Compact,
    /// JSON format (for log aggregation systems)
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// Parse from `ARTIFACT_TRANSFORM_LOG_FORMAT`, falling back to
    /// `configured`, then to compact in CI and pretty elsewhere.
    pub fn resolve(configured: Option<&str>) -> Self {
        std::env::var("ARTIFACT_TRANSFORM_LOG_FORMAT")
            .ok()
            .as_deref()
            .and_then(Self::parse)
            .or_else(|| configured.and_then(Self::parse))
            .unwrap_or_else(|| {
                if std::env::var("CI").is_ok() {
                    Self::Compact
                } else {
                    Self::Pretty
                }
            })
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level, overrides `level` (e.g., "debug", "warn")
/// - `ARTIFACT_TRANSFORM_LOG_FORMAT`: Set format ("pretty", "compact", "json"), overrides `format`
/// - `CI`: If set, defaults to compact format
///
/// Does nothing if a subscriber is already installed.
pub fn init_with(level: Option<&str>, format: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match LogFormat::resolve(format) {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(TransformFormatter { with_ansi: true })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(TransformFormatter { with_ansi: false })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .with_writer(io::stderr)
                    .json(),
            )
            .try_init(),
    };

    // Already initialized (e.g. by a test harness)
    let _ = result;
}

/// Operation names for consistent logging
pub mod operations {
    pub const EXECUTE: &str = "execute";
    pub const FINGERPRINT: &str = "fingerprint";
    pub const IDENTIFY: &str = "identify";
}

/// Status values for consistent logging
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
}
