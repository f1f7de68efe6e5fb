//! Tracing bootstrap for the Sampled connector binaries.
//!
//! Builds a `tracing-subscriber` pipeline from a small, serde-friendly
//! config: log level (overridable with `RUST_LOG`), plain or JSON output,
//! stdout or file destination.

use std::fs::File;

use anyhow::Result;
use serde::Deserialize;
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{self, writer::BoxMakeWriter},
    prelude::*,
    Registry,
};

/// Output format for log lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogOutput {
    #[default]
    Stdout,
    File,
}

/// Logging configuration, typically a section of the application config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogConfig {
    /// Default level directive, e.g. "info" or "sampled_connector=debug".
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub output: LogOutput,
    /// Required when `output` is "file".
    pub file_path: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
            output: LogOutput::Stdout,
            file_path: None,
        }
    }
}

/// Installs the global tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over the configured level when set, so a
/// deployed binary can be turned up to `debug` without editing its config.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let writer = match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::File => {
            let path = config.file_path.as_deref().ok_or_else(|| {
                anyhow::anyhow!("log output is 'file' but 'file-path' is not specified")
            })?;
            BoxMakeWriter::new(File::create(path)?)
        }
    };

    let subscriber = Registry::default().with(filter);
    match config.format {
        LogFormat::Json => subscriber
            .with(fmt::layer().with_writer(writer).json())
            .init(),
        LogFormat::Plain => subscriber.with(fmt::layer().with_writer(writer)).init(),
    }

    Ok(())
}
