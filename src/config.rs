use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Batch sizes and polling cadence for the outbox workers.
///
/// Deserializes with per-field defaults, so a partial config file is enough:
///
/// ```ignore
/// let config: OutboxConfig = serde_json::from_str(r#"{ "processor_batch_size": 50 }"#)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    pub processor_batch_size: usize,
    pub janitor_batch_size: usize,
    pub processor_interval_ms: u64,
    pub janitor_interval_ms: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        OutboxConfig {
            processor_batch_size: 20,
            janitor_batch_size: 5,
            processor_interval_ms: 5_000,
            janitor_interval_ms: 60_000,
        }
    }
}

impl OutboxConfig {
    pub const PROCESSOR_BATCH_SIZE: &'static str = "OUTBOX_PROCESSOR_BATCH_SIZE";
    pub const JANITOR_BATCH_SIZE: &'static str = "OUTBOX_JANITOR_BATCH_SIZE";
    pub const PROCESSOR_INTERVAL_MS: &'static str = "OUTBOX_PROCESSOR_INTERVAL_MS";
    pub const JANITOR_INTERVAL_MS: &'static str = "OUTBOX_JANITOR_INTERVAL_MS";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processor_batch_size(mut self, size: usize) -> Self {
        self.processor_batch_size = size;
        self
    }

    pub fn with_janitor_batch_size(mut self, size: usize) -> Self {
        self.janitor_batch_size = size;
        self
    }

    pub fn with_processor_interval(mut self, interval: Duration) -> Self {
        self.processor_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_janitor_interval(mut self, interval: Duration) -> Self {
        self.janitor_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn processor_interval(&self) -> Duration {
        Duration::from_millis(self.processor_interval_ms)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_millis(self.janitor_interval_ms)
    }

    /// Defaults overridden by `OUTBOX_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `OUTBOX_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        override_with(&lookup, Self::PROCESSOR_BATCH_SIZE, &mut config.processor_batch_size)?;
        override_with(&lookup, Self::JANITOR_BATCH_SIZE, &mut config.janitor_batch_size)?;
        override_with(&lookup, Self::PROCESSOR_INTERVAL_MS, &mut config.processor_interval_ms)?;
        override_with(&lookup, Self::JANITOR_INTERVAL_MS, &mut config.janitor_interval_ms)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processor_batch_size == 0 {
            return Err(ConfigError::Zero("processor_batch_size"));
        }
        if self.janitor_batch_size == 0 {
            return Err(ConfigError::Zero("janitor_batch_size"));
        }
        if self.processor_interval_ms == 0 {
            return Err(ConfigError::Zero("processor_interval_ms"));
        }
        if self.janitor_interval_ms == 0 {
            return Err(ConfigError::Zero("janitor_interval_ms"));
        }
        Ok(())
    }
}

fn override_with<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    *target = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })?;
    Ok(())
}
