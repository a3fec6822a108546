//! TOML-based application configuration.
//!
//! Holds everything that used to be baked into the page:
//! - Backend origin and development API URL
//! - Agent step labels and their pacing
//! - Working hours sent to the optimizer
//! - Calendar events already on the day (seed data)
//!
//! Configuration is stored at `~/.config/chronos/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::api::resolve_base_url;
use crate::error::ConfigError;
use crate::planner::PlannerSettings;
use crate::progress::{StepPacing, DEFAULT_STEPS};
use crate::timeline::TimelineEvent;

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Where the client is served from. A loopback origin switches to
    /// `dev_api_url`.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_dev_api_url")]
    pub dev_api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// A calendar entry that is already on the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedEvent {
    pub id: String,
    pub title: String,
    pub start_hour: f64,
    pub duration_hours: f64,
}

/// Planning session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_steps")]
    pub steps: Vec<String>,
    #[serde(default = "default_step_delay_min_ms")]
    pub step_delay_min_ms: u64,
    #[serde(default = "default_step_delay_max_ms")]
    pub step_delay_max_ms: u64,
    /// With `workday_end_hour`, limits the optimizer to one window per day.
    #[serde(default)]
    pub workday_start_hour: Option<u32>,
    #[serde(default)]
    pub workday_end_hour: Option<u32>,
    #[serde(default)]
    pub existing_events: Vec<SeedEvent>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/chronos/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

// Default functions
fn default_origin() -> String {
    "http://localhost:5173".into()
}
fn default_dev_api_url() -> String {
    "http://localhost:8000".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_steps() -> Vec<String> {
    DEFAULT_STEPS.iter().map(|s| s.to_string()).collect()
}
fn default_step_delay_min_ms() -> u64 {
    600
}
fn default_step_delay_max_ms() -> u64 {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            dev_api_url: default_dev_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            step_delay_min_ms: default_step_delay_min_ms(),
            step_delay_max_ms: default_step_delay_max_ms(),
            workday_start_hour: None,
            workday_end_hour: None,
            existing_events: Vec::new(),
        }
    }
}

/// Returns `~/.config/chronos[-dev]/` based on CHRONOS_ENV.
///
/// Set CHRONOS_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CHRONOS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("chronos-dev")
    } else {
        base_dir.join("chronos")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            // "none" clears an optional; non-optional fields reject the null
            // when the updated config is deserialized.
            _ if value.eq_ignore_ascii_case("none") => serde_json::Value::Null,
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => parse_number(value).ok_or_else(|| {
                invalid(format!("cannot parse '{value}' as number"))
            })?,
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            // Unset optionals: numbers stay numbers.
            serde_json::Value::Null => {
                parse_number(value).unwrap_or_else(|| serde_json::Value::String(value.into()))
            }
            serde_json::Value::String(_) => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed, or
    /// the resulting configuration is invalid. On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        self.origin_url()?;
        self.dev_api_url()?;

        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be greater than 0".into()));
        }

        let p = &self.planner;
        if p.step_delay_min_ms > p.step_delay_max_ms {
            return Err(invalid(
                "planner.step_delay_min_ms",
                format!(
                    "{} is greater than planner.step_delay_max_ms ({})",
                    p.step_delay_min_ms, p.step_delay_max_ms
                ),
            ));
        }

        if let (Some(start), Some(end)) = (p.workday_start_hour, p.workday_end_hour) {
            if start >= end || end > 24 {
                return Err(invalid(
                    "planner.workday_start_hour",
                    format!("workday {start}..{end} is not a valid range within 0..24"),
                ));
            }
        }

        for event in &p.existing_events {
            if !(0.0..24.0).contains(&event.start_hour) || event.duration_hours <= 0.0 {
                return Err(invalid(
                    "planner.existing_events",
                    format!("event '{}' is outside the day or has no duration", event.id),
                ));
            }
        }

        Ok(())
    }

    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        parse_url("api.origin", &self.api.origin)
    }

    pub fn dev_api_url(&self) -> Result<Url, ConfigError> {
        parse_url("api.dev_api_url", &self.api.dev_api_url)
    }

    /// Base URL the backend paths are resolved against.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Ok(resolve_base_url(&self.origin_url()?, &self.dev_api_url()?))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn pacing(&self) -> Result<StepPacing, ConfigError> {
        StepPacing::new(self.planner.step_delay_min_ms, self.planner.step_delay_max_ms).map_err(
            |e| ConfigError::InvalidValue {
                key: "planner.step_delay_min_ms".into(),
                message: e.to_string(),
            },
        )
    }

    pub fn existing_events(&self) -> Vec<TimelineEvent> {
        self.planner
            .existing_events
            .iter()
            .map(|e| TimelineEvent::existing(&e.id, &e.title, e.start_hour, e.duration_hours))
            .collect()
    }

    /// Settings a [`Planner`](crate::planner::Planner) is built from.
    pub fn planner_settings(&self) -> Result<PlannerSettings, ConfigError> {
        Ok(PlannerSettings {
            steps: self.planner.steps.clone(),
            pacing: self.pacing()?,
            existing_events: self.existing_events(),
            workday_hours: self.workday_hours(),
        })
    }

    /// Working hours offered to the optimizer; both ends must be set.
    pub fn workday_hours(&self) -> Option<(u32, u32)> {
        Some((self.planner.workday_start_hour?, self.planner.workday_end_hour?))
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}
