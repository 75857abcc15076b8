use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_SUMMARY_PREFIX: &str = "Study";

const API_URL_KEYS: &[&str] = &["BRAINBUDDY_API_URL"];
const TIMEZONE_KEYS: &[&str] = &["BRAINBUDDY_TIMEZONE"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub app_name: String,
    pub api_base_url: String,
    pub timezone: String,
    #[serde(default = "default_calendar_mirroring")]
    pub calendar_mirroring: bool,
    #[serde(default = "default_summary_prefix")]
    pub session_summary_prefix: String,
}

fn default_calendar_mirroring() -> bool {
    true
}

fn default_summary_prefix() -> String {
    DEFAULT_SUMMARY_PREFIX.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            app_name: "BrainBuddy".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            calendar_mirroring: default_calendar_mirroring(),
            session_summary_prefix: default_summary_prefix(),
        }
    }
}

impl AppConfig {
    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        parse_time_zone(&self.timezone)
    }

    /// Base URL with a trailing slash so relative endpoints join under it.
    pub fn api_base_url(&self) -> Result<Url, InfraError> {
        let raw = self.api_base_url.trim();
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        let url = Url::parse(&normalized).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid apiBaseUrl '{raw}': {error}"))
        })?;
        if url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "apiBaseUrl '{raw}' cannot be a base"
            )));
        }
        Ok(url)
    }

    /// Applies environment overrides through an injectable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_url) = optional_lookup_value(&lookup, API_URL_KEYS) {
            self.api_base_url = api_url;
        }
        if let Some(timezone) = optional_lookup_value(&lookup, TIMEZONE_KEYS) {
            self.timezone = timezone;
        }
        self
    }
}

pub fn parse_time_zone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("unknown timezone '{name}': {error}")))
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config_from_lookup<F>(config_dir: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = config_dir.join(APP_JSON);
    let value = read_config(&path)?;
    let config: AppConfig = serde_json::from_value(value).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid {}: {error}", path.display()))
    })?;
    let config = config.with_overrides(lookup);
    config.time_zone()?;
    config.api_base_url()?;
    Ok(config)
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
