//! Shared logging configuration and initialization.

use std::env;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::output::OutputSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

const LEVEL_VAR: &str = "GRIDSTATS_LOG_LEVEL";
const FORMAT_VAR: &str = "GRIDSTATS_LOG_FORMAT";
const TARGET_VAR: &str = "GRIDSTATS_LOG_TARGET";

impl LoggingConfig {
    /// Builds a config from `GRIDSTATS_LOG_*` values supplied by `lookup`. Blank or
    /// unparseable values keep the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LEVEL_VAR) {
            let trimmed = level.trim();
            if !trimmed.is_empty() {
                config.level = trimmed.to_string();
            }
        }
        if let Some(format) = lookup(FORMAT_VAR).as_deref().and_then(parse_log_format) {
            config.format = format;
        }
        if let Some(include_target) = lookup(TARGET_VAR).as_deref().and_then(parse_bool) {
            config.include_target = include_target;
        }

        config
    }
}

pub fn logging_config_from_env() -> LoggingConfig {
    LoggingConfig::from_lookup(|key| env::var(key).ok())
}

/// Installs the subscriber described by the `GRIDSTATS_LOG_*` variables and records
/// `app.start`. Call once from the process embedding the crate.
///
/// ```no_run
/// let config = gridstats::init_logging_from_env()?;
/// assert!(!config.level.is_empty());
/// # Ok::<(), gridstats::LoggingInitError>(())
/// ```
pub fn init_logging_from_env() -> Result<LoggingConfig, LoggingInitError> {
    let config = logging_config_from_env();
    init_logging(&config)?;
    log_app_start(&config);
    Ok(config)
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(config.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(matches!(config.format, LogFormat::Pretty));

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = "gridstats",
        event = "app.start",
        version = crate::OUTPUT_VERSION,
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

/// Summary event for a set handed to the publication layer.
pub fn log_output_set(set: &OutputSet, destination: &str) {
    let points: usize = set.data.iter().map(|series| series.history.data.len()).sum();
    info!(
        component = "gridstats",
        event = "output.publish",
        destination,
        data_type = %set.data_type,
        network = set.network.as_deref().unwrap_or("-"),
        region = set.region.as_deref().unwrap_or("-"),
        series = set.data.len(),
        points
    );
}

fn parse_log_format(raw: &str) -> Option<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
