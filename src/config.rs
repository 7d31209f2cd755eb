//! Configuration
//!
//! Loaded from a TOML file (`~/.config/stayline/config.toml` by default,
//! `STAYLINE_CONFIG` overrides the path). Every section and field is
//! optional; missing values fall back to the defaults below.
//!
//! ```toml
//! [server]
//! api_host = "0.0.0.0"
//! api_port = 8080
//!
//! [hotel]
//! timezone = "Asia/Ho_Chi_Minh"
//! check_in_hour = 14
//! check_out_hour = 12
//! no_show_cutoff_hour = 21
//!
//! [scheduler]
//! interval_secs = 900
//! unpaid_timeout_minutes = 120
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::SchedulerConfig;
use crate::domain::status::default_status_codes;
use crate::domain::{HotelCalendar, StatusCodeTable, StayPolicy};
use crate::infrastructure::DatabaseConfig;
use crate::shared::RetryConfig;

pub const CONFIG_ENV: &str = "STAYLINE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Path of the config file: `$STAYLINE_CONFIG` if set, otherwise
/// `<config dir>/stayline/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stayline")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub hotel: HotelSection,
    pub scheduler: SchedulerSection,
    pub locking: LockingSection,
    pub notifications: NotificationsSection,
    /// Status name to legacy integer code
    pub status_codes: StatusCodes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub api_host: String,
    pub api_port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Full connection URL. Takes precedence over `path`.
    pub url: Option<String>,
    /// SQLite file, created if missing
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            path: "./stayline.db".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseSection {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!("sqlite://{}?mode=rwc", self.path),
        }
    }

    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.connection_url(),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive, e.g. `info` or `stayline=debug,sea_orm=warn`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelSection {
    /// IANA zone name
    pub timezone: String,
    pub check_in_hour: u32,
    pub check_out_hour: u32,
    pub no_show_cutoff_hour: u32,
}

impl Default for HotelSection {
    fn default() -> Self {
        Self {
            timezone: "Asia/Ho_Chi_Minh".to_string(),
            check_in_hour: 14,
            check_out_hour: 14,
            no_show_cutoff_hour: 21,
        }
    }
}

impl HotelSection {
    pub fn calendar(&self) -> Result<HotelCalendar, ConfigError> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown time zone '{}'", self.timezone)))?;
        Ok(HotelCalendar {
            timezone,
            check_in_time: hour("check_in_hour", self.check_in_hour)?,
            check_out_time: hour("check_out_hour", self.check_out_hour)?,
            no_show_cutoff: hour("no_show_cutoff_hour", self.no_show_cutoff_hour)?,
        })
    }
}

fn hour(field: &str, value: u32) -> Result<NaiveTime, ConfigError> {
    NaiveTime::from_hms_opt(value, 0, 0)
        .ok_or_else(|| ConfigError::Invalid(format!("hotel.{field} must be 0-23, got {value}")))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub enabled: bool,
    pub interval_secs: u64,
    pub unpaid_timeout_minutes: i64,
    pub checkout_grace_hours: i64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 15 * 60,
            unpaid_timeout_minutes: 120,
            checkout_grace_hours: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingSection {
    pub wait_timeout_ms: u64,
}

impl Default for LockingSection {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsSection {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    /// Event bus capacity; slow subscribers past this lag and drop events
    pub queue_size: usize,
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            queue_size: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCodes(pub BTreeMap<String, i32>);

impl Default for StatusCodes {
    fn default() -> Self {
        Self(default_status_codes())
    }
}

impl AppConfig {
    /// Reads and validates `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hotel.calendar()?;
        self.status_table()?;

        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.interval_secs must be positive".into(),
            ));
        }
        if self.scheduler.unpaid_timeout_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "scheduler.unpaid_timeout_minutes must be positive".into(),
            ));
        }
        if self.scheduler.checkout_grace_hours < 0 {
            return Err(ConfigError::Invalid(
                "scheduler.checkout_grace_hours must not be negative".into(),
            ));
        }
        if self.locking.wait_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "locking.wait_timeout_ms must be positive".into(),
            ));
        }
        if self.notifications.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "notifications.max_attempts must be at least 1".into(),
            ));
        }
        if self.notifications.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "notifications.backoff_multiplier must be >= 1.0".into(),
            ));
        }
        if self.notifications.queue_size == 0 {
            return Err(ConfigError::Invalid(
                "notifications.queue_size must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn stay_policy(&self) -> Result<StayPolicy, ConfigError> {
        Ok(StayPolicy {
            calendar: self.hotel.calendar()?,
            unpaid_timeout: chrono::Duration::minutes(self.scheduler.unpaid_timeout_minutes),
            checkout_grace: chrono::Duration::hours(self.scheduler.checkout_grace_hours),
        })
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            enabled: self.scheduler.enabled,
            interval: Duration::from_secs(self.scheduler.interval_secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        let n = &self.notifications;
        RetryConfig {
            max_attempts: n.max_attempts,
            initial_delay: Duration::from_millis(n.initial_delay_ms),
            backoff_multiplier: n.backoff_multiplier,
            max_delay: Duration::from_millis(n.max_delay_ms),
        }
    }

    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.locking.wait_timeout_ms)
    }

    pub fn status_table(&self) -> Result<StatusCodeTable, ConfigError> {
        StatusCodeTable::from_map(&self.status_codes.0).map_err(ConfigError::Invalid)
    }
}
