//! Global configuration parsing and validation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::models::callback::{CallbackOffset, MAX_OFFSET_DAYS};
use crate::{AppError, Result};

/// Live queue refresh and highlight settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Interval between snapshot pulls from the store.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// How long a newly arrived lead stays highlighted.
    #[serde(default = "default_highlight_window_ms")]
    pub highlight_window_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: default_refresh_interval(),
            highlight_window_ms: default_highlight_window_ms(),
        }
    }
}

impl QueueConfig {
    /// Refresh interval as a [`Duration`].
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    /// Highlight window as a [`Duration`].
    #[must_use]
    pub fn highlight_window(&self) -> Duration {
        Duration::from_millis(self.highlight_window_ms)
    }
}

/// Callback readmission polling settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Interval between due-callback sweeps.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl SchedulerConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

fn default_max_call_attempts() -> u32 {
    3
}

fn default_refresh_interval() -> u64 {
    10
}

fn default_highlight_window_ms() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    60
}

/// Longest retention configuration accepts: one hundred years.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

fn default_retention_days() -> u32 {
    90
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// `SQLite` database file.
    pub database_path: PathBuf,
    /// Attempt ceiling used for the exhausted badge.
    #[serde(default = "default_max_call_attempts")]
    pub max_call_attempts: u32,
    /// Offsets offered for "callback later". An explicit empty list disables it.
    #[serde(default = "CallbackOffset::defaults")]
    pub callback_offsets: Vec<CallbackOffset>,
    /// Live queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Callback readmission settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Days after closure before a lead is purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Offsets an operator may currently choose, in configuration order.
    #[must_use]
    pub fn enabled_offsets(&self) -> Vec<CallbackOffset> {
        self.callback_offsets
            .iter()
            .filter(|o| o.enabled)
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.max_call_attempts == 0 {
            return Err(AppError::Config(
                "max_call_attempts must be greater than zero".into(),
            ));
        }

        if self.queue.refresh_interval_seconds == 0 {
            return Err(AppError::Config(
                "queue.refresh_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.scheduler.poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "scheduler.poll_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(AppError::Config(format!(
                "retention_days must be at most {MAX_RETENTION_DAYS}"
            )));
        }

        let mut labels = HashSet::new();
        for offset in &self.callback_offsets {
            if offset.label.trim().is_empty() {
                return Err(AppError::Config(
                    "callback offset label must not be empty".into(),
                ));
            }
            if offset.days == 0 {
                return Err(AppError::Config(format!(
                    "callback offset '{}' must be at least one day",
                    offset.label
                )));
            }
            if offset.days > MAX_OFFSET_DAYS {
                return Err(AppError::Config(format!(
                    "callback offset '{}' must be at most {MAX_OFFSET_DAYS} days",
                    offset.label
                )));
            }
            if !labels.insert(offset.label.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate callback offset label '{}'",
                    offset.label
                )));
            }
        }

        if !self.callback_offsets.iter().any(|o| o.enabled) {
            warn!("no callback offsets enabled; callback_later is disabled");
        }

        Ok(())
    }
}
