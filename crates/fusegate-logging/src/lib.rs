// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging initialization for fusegate binaries
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` (so
//! `RUST_LOG` always wins) and a plaintext or JSON formatting layer. The
//! gateway logs to the console unless `--log-file` or `--log-dir` is given.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing::Level;

const APP_DIR: &str = "fusegate";

/// Output format for log records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plaintext,
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

/// Verbosity accepted on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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
        let name = match self {
            CliLogLevel::Error => "error",
            CliLogLevel::Warn => "warn",
            CliLogLevel::Info => "info",
            CliLogLevel::Debug => "debug",
            CliLogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Logging flags, meant to be `#[command(flatten)]`ed into a binary's CLI.
#[derive(Clone, Debug, Default, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliLoggingArgs {
    /// Log verbosity level (default: info)
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<CliLogLevel>,

    /// Log output format (default: plaintext)
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,

    /// Directory for log files
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log filename, absolute or relative to --log-dir
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl CliLoggingArgs {
    /// Install the global subscriber for `component`.
    pub fn init(self, component: &str) -> anyhow::Result<()> {
        let level = self.log_level.unwrap_or_default().into();
        let format = self.log_format.unwrap_or_default();

        if self.logs_to_file() {
            let path = self.resolve_log_path(component);
            init_to_file(component, level, format, &path)
        } else {
            init(component, level, format)
        }
    }

    pub fn logs_to_file(&self) -> bool {
        self.log_file.is_some() || self.log_dir.is_some()
    }

    /// Absolute `--log-file` wins; otherwise it is joined onto `--log-dir`,
    /// and without either the platform log directory is used.
    pub fn resolve_log_path(&self, component: &str) -> PathBuf {
        match (&self.log_file, &self.log_dir) {
            (Some(file), _) if Path::new(file).is_absolute() => PathBuf::from(file),
            (Some(file), Some(dir)) => Path::new(dir).join(file),
            (Some(file), None) => PathBuf::from(file),
            (None, Some(dir)) => Path::new(dir).join(format!("{}.log", component)),
            (None, None) => standard_log_path(component),
        }
    }
}

/// Platform log location for `component`:
/// `~/.local/share/fusegate/<component>.log` on Linux,
/// `~/Library/Logs/fusegate/<component>.log` on macOS.
pub fn standard_log_path(component: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    let mut path = {
        let mut base = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        base.push("Library");
        base.push("Logs");
        base
    };

    #[cfg(not(target_os = "macos"))]
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir);

    path.push(APP_DIR);
    path.push(format!("{}.log", component));
    path
}

/// Log to stdout.
pub fn init(component: &str, default_level: Level, format: LogFormat) -> anyhow::Result<()> {
    init_with_writer(component, default_level, format, io::stdout)
}

/// Log to `log_path`, appending; parent directories are created.
pub fn init_to_file(
    component: &str,
    default_level: Level,
    format: LogFormat,
    log_path: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    init_with_writer(component, default_level, format, std::sync::Mutex::new(file))
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
        .unwrap_or_else(|_| EnvFilter::new(default_directives(component, default_level)));

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).json();
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Plaintext => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer);
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }
    Ok(())
}

/// Filter used when `RUST_LOG` is unset: the default level globally and for
/// every fusegate crate (crate targets use underscores).
fn default_directives(component: &str, level: Level) -> String {
    format!(
        "{level},{}={level},fusegate_proto={level},fusegate_client={level},fusegate_host={level}",
        component.replace('-', "_")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_maps_to_tracing_level() {
        assert_eq!(Level::from(CliLogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(CliLogLevel::Trace), Level::TRACE);
        assert_eq!(CliLogLevel::default(), CliLogLevel::Info);
        assert_eq!(CliLogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn console_unless_file_flags_given() {
        assert!(!CliLoggingArgs::default().logs_to_file());
        let args = CliLoggingArgs {
            log_dir: Some("/tmp/logs".into()),
            ..Default::default()
        };
        assert!(args.logs_to_file());
    }

    #[test]
    fn resolves_log_path_from_flags() {
        let dir_only = CliLoggingArgs {
            log_dir: Some("/var/log/gate".into()),
            ..Default::default()
        };
        assert_eq!(
            dir_only.resolve_log_path("fusegate"),
            PathBuf::from("/var/log/gate/fusegate.log")
        );

        let both = CliLoggingArgs {
            log_dir: Some("/var/log/gate".into()),
            log_file: Some("custom.log".into()),
            ..Default::default()
        };
        assert_eq!(
            both.resolve_log_path("fusegate"),
            PathBuf::from("/var/log/gate/custom.log")
        );

        let absolute = CliLoggingArgs {
            log_dir: Some("/ignored".into()),
            log_file: Some("/abs/gate.log".into()),
            ..Default::default()
        };
        assert_eq!(
            absolute.resolve_log_path("fusegate"),
            PathBuf::from("/abs/gate.log")
        );
    }

    #[test]
    fn standard_path_is_per_component() {
        let path = standard_log_path("fusegate");
        assert!(path.ends_with("fusegate/fusegate.log"));
    }

    #[test]
    fn default_filter_names_component_target() {
        let directives = default_directives("fusegate-host", Level::DEBUG);
        assert!(directives.starts_with("DEBUG,fusegate_host=DEBUG"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn file_logging_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gate.log");
        // A global subscriber may already be installed by another test; the
        // file is still created before installation is attempted.
        let _ = init_to_file("fusegate", Level::INFO, LogFormat::Json, &path);
        assert!(path.exists());
    }
}
