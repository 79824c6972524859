//! Log subscriber setup for import runs.
//!
//! Every crate in the workspace logs through `tracing`; this module builds
//! the subscriber a host installs before running imports. Interactive use
//! gets a compact single-line format without timestamps, unattended import
//! runners get JSON lines. `RUST_LOG` overrides the built-in filter.
//!
//! Hosts that own the whole process call [`init_tracing`] once at startup.
//! Hosts embedding the importer next to their own logging (or tests that
//! want a scoped subscriber) use [`build_subscriber`] with
//! `tracing::subscriber::set_default` instead.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors from subscriber construction or installation.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for import logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Compact single-line format for interactive use (default).
    #[default]
    Compact,
    /// Multi-line format for debugging a run by hand.
    Pretty,
    /// JSON lines for unattended import runners.
    Json,
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// The default log level when neither `RUST_LOG` nor `env_filter` is set.
    pub default_level: Level,
    /// Output format for log lines.
    pub output_format: TracingOutputFormat,
    /// Custom env filter directive (overrides `default_level` when set).
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Config for a person watching the import: compact lines, no timestamps.
    #[must_use]
    pub fn interactive() -> Self {
        Self::default()
    }

    /// Config for an unattended runner: JSON lines with source locations,
    /// ready for log collection.
    #[must_use]
    pub fn import_runner() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            ..Self::default()
        }
    }

    /// Set the default log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Builds a subscriber for the given configuration without installing it.
///
/// # Errors
///
/// Returns an error if the env filter directive is invalid.
pub fn build_subscriber(
    config: &TracingConfig,
) -> Result<impl tracing::Subscriber + Send + Sync, TracingError> {
    let env_filter = match &config.env_filter {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("calimport={}", config.default_level))),
    };

    let format_layer = match config.output_format {
        TracingOutputFormat::Compact => fmt::layer().compact().without_time().boxed(),
        TracingOutputFormat::Pretty => fmt::layer().pretty().boxed(),
        TracingOutputFormat::Json => fmt::layer()
            .json()
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    };

    Ok(tracing_subscriber::registry()
        .with(env_filter)
        .with(format_layer))
}

/// Builds and installs the global subscriber; call once at startup.
///
/// # Errors
///
/// Returns an error if the env filter directive is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    tracing::subscriber::set_global_default(build_subscriber(&config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn import_runner_config() {
        let config = TracingConfig::import_runner();
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
    }

    #[test]
    fn builder_methods() {
        let config = TracingConfig::interactive()
            .with_level(Level::WARN)
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("calimport=trace");

        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.env_filter, Some("calimport=trace".to_string()));
    }

    #[test]
    fn invalid_env_filter_is_rejected() {
        let config = TracingConfig::interactive().with_env_filter("[unclosed");
        assert!(matches!(
            build_subscriber(&config),
            Err(TracingError::EnvFilter(_))
        ));
    }

    #[test]
    fn subscriber_accepts_events() {
        let subscriber = build_subscriber(
            &TracingConfig::interactive().with_env_filter("calimport_core=debug"),
        )
        .unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("subscriber is wired");
        });
    }
}
