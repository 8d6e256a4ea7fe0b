//! Structured logging infrastructure.
//!
//! Provides component-based log targets for filtering, optional rolling
//! file output via tracing-appender, and a configurable stdout format.
//!
//! # Component Targets
//!
//! | Target | Description |
//! |--------|-------------|
//! | `fedscan::index` | Entity index build, cache reuse, row skips |
//! | `fedscan::detect` | Detector evaluation |
//! | `fedscan::scan` | Batch scanner lifecycle, paging, dispatch |
//! | `fedscan::forward` | Investigation handoff delivery |
//!
//! ```bash
//! # Warn for all, debug for the scanner
//! RUST_LOG=warn,fedscan::scan=debug
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format (default for development)
    #[default]
    Pretty,
    /// JSON format (best for log aggregation)
    Json,
    /// Compact single-line format
    Compact,
}

/// Logging configuration for scan runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for rolling log files when file output is enabled.
    pub log_dir: PathBuf,
    /// Enable daily-rolling JSON file output.
    pub enable_file: bool,
    /// Enable stdout logging.
    pub enable_stdout: bool,
    /// Format for stdout logging.
    pub stdout_format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            enable_file: false,
            enable_stdout: true,
            stdout_format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    /// Config for development (pretty stdout, no files).
    pub fn development() -> Self {
        Self::default()
    }

    /// Config for production (JSON stdout plus rolling files).
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            enable_file: true,
            stdout_format: LogFormat::Json,
            ..Default::default()
        }
    }
}

/// Initialize logging based on configuration.
///
/// Returns `WorkerGuard`s that must be kept alive for the duration of the
/// program so buffered file output is flushed.
pub fn init_logging(
    config: &LogConfig,
    env_filter_override: Option<&str>,
) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();

    let base_filter = if let Some(filter) = env_filter_override {
        EnvFilter::new(filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info")
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap())
        })
    };

    if config.enable_file {
        std::fs::create_dir_all(&config.log_dir)?;

        let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "fedscan.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::new("info"));

        if config.enable_stdout {
            match config.stdout_format {
                LogFormat::Json => {
                    tracing_subscriber::registry()
                        .with(file_layer)
                        .with(fmt::layer().json().with_filter(base_filter))
                        .init();
                }
                LogFormat::Compact => {
                    tracing_subscriber::registry()
                        .with(file_layer)
                        .with(fmt::layer().compact().with_filter(base_filter))
                        .init();
                }
                LogFormat::Pretty => {
                    tracing_subscriber::registry()
                        .with(file_layer)
                        .with(fmt::layer().with_target(false).with_filter(base_filter))
                        .init();
                }
            }
        } else {
            tracing_subscriber::registry().with(file_layer).init();
        }
    } else {
        match config.stdout_format {
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .with_env_filter(base_filter)
                    .json()
                    .init();
            }
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .with_env_filter(base_filter)
                    .compact()
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_env_filter(base_filter)
                    .with_target(false)
                    .init();
            }
        }
    }

    Ok(guards)
}

/// Log target constants for component-specific logging.
///
/// Use these with the `target:` field in tracing macros:
/// ```ignore
/// tracing::info!(target: targets::SCAN, page = page, "page fetched");
/// ```
pub mod targets {
    /// Entity index build and cache lifecycle
    pub const INDEX: &str = "fedscan::index";
    /// Detector evaluation
    pub const DETECT: &str = "fedscan::detect";
    /// Batch scanner lifecycle
    pub const SCAN: &str = "fedscan::scan";
    /// Investigation handoff delivery
    pub const FORWARD: &str = "fedscan::forward";
}
