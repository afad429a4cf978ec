//! Lock peripheral configuration
//!
//! Loaded from JSON, then optionally overridden from `SMARTLOCK_*`
//! environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SMARTLOCK_MAX_CHUNK_SIZE` | `max_chunk_size` |
//! | `SMARTLOCK_AUTHENTICATION_TIMEOUT_SECS` | `authentication_timeout_secs` (`off` disables) |
//! | `SMARTLOCK_UTC_OFFSET_SECS` | `utc_offset_secs` |

use crate::error::LockError;
use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use smartlock_protocol::{UnlockAction, UnlockActions, CHUNK_HEADER_LENGTH};
use std::path::Path;
use std::str::FromStr;

/// Default notification size: the ATT payload of the minimum 23-byte MTU, minus headroom
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 20;

pub const DEFAULT_AUTHENTICATION_TIMEOUT_SECS: u64 = 300;

const SECONDS_PER_DAY: i32 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LockConfig {
    /// Largest notification frame, chunk header included
    pub max_chunk_size: usize,
    /// Maximum clock skew accepted on an authentication date; `None` disables
    /// the freshness and nonce-replay checks
    pub authentication_timeout_secs: Option<u64>,
    /// Offset from UTC used to evaluate schedules
    pub utc_offset_secs: i32,
    /// Unlock actions the hardware supports
    pub unlock_actions: Vec<UnlockAction>,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            authentication_timeout_secs: Some(DEFAULT_AUTHENTICATION_TIMEOUT_SECS),
            utc_offset_secs: 0,
            unlock_actions: vec![UnlockAction::Default],
        }
    }
}

impl LockConfig {
    pub fn from_json(json: &str) -> Result<Self, LockError> {
        let config: LockConfig =
            serde_json::from_str(json).map_err(|e| LockError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LockError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Apply `SMARTLOCK_*` environment variables
    pub fn with_env_overrides(self) -> Result<Self, LockError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, LockError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SMARTLOCK_MAX_CHUNK_SIZE") {
            self.max_chunk_size = parse_var("SMARTLOCK_MAX_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = lookup("SMARTLOCK_AUTHENTICATION_TIMEOUT_SECS") {
            self.authentication_timeout_secs = match value.trim() {
                "off" | "none" => None,
                other => Some(parse_var("SMARTLOCK_AUTHENTICATION_TIMEOUT_SECS", other)?),
            };
        }
        if let Some(value) = lookup("SMARTLOCK_UTC_OFFSET_SECS") {
            self.utc_offset_secs = parse_var("SMARTLOCK_UTC_OFFSET_SECS", &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), LockError> {
        if self.max_chunk_size <= CHUNK_HEADER_LENGTH {
            return Err(LockError::Config(format!(
                "maxChunkSize must exceed the {} byte chunk header, got {}",
                CHUNK_HEADER_LENGTH, self.max_chunk_size
            )));
        }
        if self.authentication_timeout_secs == Some(0) {
            return Err(LockError::Config(
                "authenticationTimeoutSecs must be positive".to_string(),
            ));
        }
        if self.utc_offset_secs.abs() >= SECONDS_PER_DAY {
            return Err(LockError::Config(format!(
                "utcOffsetSecs must be within one day, got {}",
                self.utc_offset_secs
            )));
        }
        if self.unlock_actions.is_empty() {
            return Err(LockError::Config(
                "at least one unlock action is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn authentication_timeout(&self) -> Option<Duration> {
        self.authentication_timeout_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(Duration::seconds)
    }

    pub fn time_zone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    pub fn supported_actions(&self) -> UnlockActions {
        self.unlock_actions.iter().copied().collect()
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, LockError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| LockError::Config(format!("{}={:?}: {}", name, value, e)))
}
