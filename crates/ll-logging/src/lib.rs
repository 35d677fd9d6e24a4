// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Diagnostic logging setup for Living Log binaries
//!
//! These are the program's own diagnostics (`tracing` events). They never go
//! to the activity log itself.

use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Re-export clap for convenience when using CliLoggingArgs
pub use clap;

pub use tracing::Level;

/// Output format for log messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable plaintext format
    #[default]
    Plaintext,
    /// Structured JSON format
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Plaintext => write!(f, "plaintext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log level as accepted on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliLogLevel::Error => write!(f, "error"),
            CliLogLevel::Warn => write!(f, "warn"),
            CliLogLevel::Info => write!(f, "info"),
            CliLogLevel::Debug => write!(f, "debug"),
            CliLogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Logging flags shared by every binary; use with `#[command(flatten)]`.
///
/// Interactive sessions always log to a file so diagnostics do not mix with
/// the console prompt. One-shot commands log to stderr unless `--log-file`
/// or `--log-dir` is given.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct CliLoggingArgs {
    #[arg(long, value_enum, global = true, help = "Log verbosity level (default: info)")]
    pub log_level: Option<CliLogLevel>,

    #[arg(long, value_enum, global = true, help = "Log output format (default: plaintext)")]
    pub log_format: Option<LogFormat>,

    #[arg(long, global = true, help = "Directory for log files (default: platform specific)")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Log filename")]
    pub log_file: Option<PathBuf>,
}

impl CliLoggingArgs {
    pub fn init(self, component: &str, interactive: bool) -> anyhow::Result<()> {
        self.init_with_default_level(component, interactive, CliLogLevel::Info)
    }

    pub fn init_with_default_level(
        self,
        component: &str,
        interactive: bool,
        default_level: CliLogLevel,
    ) -> anyhow::Result<()> {
        let level = self.log_level.unwrap_or(default_level).into();
        let format = self.log_format.unwrap_or_default();

        if self.logs_to_file(interactive) {
            let log_path = self.resolve_log_path(component);
            init_to_file(component, level, format, &log_path)
        } else {
            init(component, level, format)
        }
    }

    pub fn logs_to_file(&self, interactive: bool) -> bool {
        interactive || self.log_file.is_some() || self.log_dir.is_some()
    }

    /// An absolute `--log-file` wins; a relative one is placed under
    /// `--log-dir` when given. Without `--log-file` the file is
    /// `<component>.log` in `--log-dir` or the platform log directory.
    pub fn resolve_log_path(&self, component: &str) -> PathBuf {
        match (&self.log_file, &self.log_dir) {
            (Some(file), _) if file.is_absolute() => file.clone(),
            (Some(file), Some(dir)) => dir.join(file),
            (Some(file), None) => file.clone(),
            (None, Some(dir)) => dir.join(format!("{}.log", component)),
            (None, None) => standard_log_path(component),
        }
    }
}

/// Platform log directory for this application
///
/// - Windows: %APPDATA%\living-log
/// - macOS: ~/Library/Logs/living-log
/// - Linux: ~/.local/share/living-log
pub fn standard_log_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    let mut path = {
        let mut path = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        path.push("Library");
        path.push("Logs");
        path
    };

    #[cfg(not(target_os = "macos"))]
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir);

    path.push("living-log");
    path
}

pub fn standard_log_path(component: &str) -> PathBuf {
    standard_log_dir().join(format!("{}.log", component))
}

/// Log to stderr. `RUST_LOG` overrides `default_level` when set.
pub fn init(component: &str, default_level: Level, format: LogFormat) -> anyhow::Result<()> {
    init_with_writer(component, default_level, format, io::stderr)
}

/// Append to `log_path`, creating it and its parent directories as needed
pub fn init_to_file(
    component: &str,
    default_level: Level,
    format: LogFormat,
    log_path: &Path,
) -> anyhow::Result<()> {
    use std::fs;

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = fs::OpenOptions::new().create(true).append(true).open(log_path)?;

    init_with_writer(component, default_level, format, log_file)
}

pub fn init_with_writer<W>(
    component: &str,
    default_level: Level,
    format: LogFormat,
    writer: W,
) -> anyhow::Result<()>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(component, default_level)));

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).json();
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Plaintext => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }

    Ok(())
}

// Crate targets use underscores, so `ll-cli` logs under `ll_cli`.
fn default_filter(component: &str, level: Level) -> String {
    format!("{},{}={}", level, component.replace('-', "_"), level)
}
