//! Application configuration with persistence.

use serde::{Deserialize, Serialize};
use specta::Type;
use tauri::{AppHandle, Runtime};
use tauri_plugin_store::StoreExt;
use thiserror::Error;

const SETTINGS_STORE_FILE: &str = "settings.json";
const CONFIG_KEY: &str = "config";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid configuration: {0}")]
  Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  /// Override for the installation media root (None = `<resources>/media`).
  #[serde(default)]
  pub media_root: Option<String>,

  /// Media streams that may be open at the same time.
  #[serde(default = "default_max_concurrent_streams")]
  pub max_concurrent_streams: u32,

  /// How long a media request waits for a free stream slot.
  #[serde(default = "default_stream_queue_timeout_ms")]
  pub stream_queue_timeout_ms: u32,

  /// Largest body served by one media response.
  #[serde(default = "default_max_chunk_bytes")]
  pub max_chunk_bytes: u32,

  /// Only list (and probe) folders the user picked in the dialog.
  #[serde(default = "default_restrict_listing")]
  pub restrict_listing_to_selection: bool,

  /// Log level: error, warn, info, debug or trace.
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

fn default_max_concurrent_streams() -> u32 {
  8
}

fn default_stream_queue_timeout_ms() -> u32 {
  2000
}

fn default_max_chunk_bytes() -> u32 {
  1024 * 1024
}

fn default_restrict_listing() -> bool {
  true
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      media_root: None,
      max_concurrent_streams: default_max_concurrent_streams(),
      stream_queue_timeout_ms: default_stream_queue_timeout_ms(),
      max_chunk_bytes: default_max_chunk_bytes(),
      restrict_listing_to_selection: default_restrict_listing(),
      log_level: default_log_level(),
    }
  }
}

impl AppConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(1..=64).contains(&self.max_concurrent_streams) {
      return Err(ConfigError::Invalid(
        "Concurrent streams must be between 1 and 64".to_string(),
      ));
    }
    if self.stream_queue_timeout_ms > 30_000 {
      return Err(ConfigError::Invalid(
        "Stream queue timeout cannot exceed 30 seconds".to_string(),
      ));
    }
    if !(64 * 1024..=16 * 1024 * 1024).contains(&self.max_chunk_bytes) {
      return Err(ConfigError::Invalid(
        "Chunk size must be between 64 KiB and 16 MiB".to_string(),
      ));
    }
    if self.media_root.as_ref().is_some_and(|root| root.trim().is_empty()) {
      return Err(ConfigError::Invalid("Media root cannot be empty".to_string()));
    }
    self.level_filter()?;
    Ok(())
  }

  pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
    self
      .log_level
      .parse()
      .map_err(|_| ConfigError::Invalid(format!("Unknown log level: {}", self.log_level)))
  }
}

/// Configuration as read at startup.
#[derive(Debug)]
pub struct LoadedConfig {
  pub config: AppConfig,
  /// Problems met while loading. Logged by the caller once logging is up.
  pub issues: Vec<String>,
}

/// Read the configuration from the store, falling back to defaults.
///
/// Defaults are written back when nothing usable was stored.
pub fn load_from_store<R: Runtime>(app: &AppHandle<R>) -> LoadedConfig {
  let mut issues = Vec::new();
  let store = match app.store(SETTINGS_STORE_FILE) {
    Ok(store) => store,
    Err(e) => {
      issues.push(format!("Failed to open settings store: {}", e));
      return LoadedConfig {
        config: AppConfig::default(),
        issues,
      };
    }
  };

  let (config, usable) = choose_config(store.get(CONFIG_KEY), &mut issues);
  if !usable {
    match serde_json::to_value(&config) {
      Ok(value) => {
        store.set(CONFIG_KEY, value);
        if let Err(e) = store.save() {
          issues.push(format!("Failed to save default config: {}", e));
        }
      }
      Err(e) => issues.push(format!("Failed to serialize default config: {}", e)),
    }
  }
  LoadedConfig { config, issues }
}

/// Pick the stored config if it is valid, else the defaults.
///
/// The flag is false when the defaults were used.
fn choose_config(stored: Option<serde_json::Value>, issues: &mut Vec<String>) -> (AppConfig, bool) {
  let Some(value) = stored else {
    return (AppConfig::default(), false);
  };
  match parse_stored(value) {
    Ok(config) => (config, true),
    Err(e) => {
      issues.push(format!("Ignoring stored config: {}", e));
      (AppConfig::default(), false)
    }
  }
}

fn parse_stored(value: serde_json::Value) -> Result<AppConfig, ConfigError> {
  let config: AppConfig =
    serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;
  config.validate()?;
  Ok(config)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_defaults_are_valid() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.level_filter().unwrap(), log::LevelFilter::Info);
  }

  #[test]
  fn test_missing_fields_take_defaults() {
    let config = parse_stored(json!({ "maxConcurrentStreams": 3 })).unwrap();
    assert_eq!(config.max_concurrent_streams, 3);
    assert_eq!(config.max_chunk_bytes, default_max_chunk_bytes());
    assert!(config.restrict_listing_to_selection);
  }

  #[test]
  fn test_rejects_out_of_range_values() {
    assert!(parse_stored(json!({ "maxConcurrentStreams": 0 })).is_err());
    assert!(parse_stored(json!({ "maxChunkBytes": 10 })).is_err());
    assert!(parse_stored(json!({ "streamQueueTimeoutMs": 60000 })).is_err());
    assert!(parse_stored(json!({ "mediaRoot": "  " })).is_err());
    assert!(parse_stored(json!({ "logLevel": "loud" })).is_err());
    assert!(parse_stored(json!("not an object")).is_err());
  }

  #[test]
  fn test_invalid_stored_config_falls_back_with_reason() {
    let mut issues = Vec::new();
    let (config, usable) = choose_config(Some(json!({ "maxChunkBytes": 10 })), &mut issues);
    assert_eq!(config, AppConfig::default());
    assert!(!usable);
    assert_eq!(issues.len(), 1);
    assert!(issues[0].starts_with("Ignoring stored config"));
  }

  #[test]
  fn test_missing_and_valid_stored_config() {
    let mut issues = Vec::new();
    let (config, usable) = choose_config(None, &mut issues);
    assert_eq!(config, AppConfig::default());
    assert!(!usable);
    assert!(issues.is_empty());

    let (config, usable) = choose_config(Some(json!({ "logLevel": "debug" })), &mut issues);
    assert_eq!(config.log_level, "debug");
    assert!(usable);
    assert!(issues.is_empty());
  }
}
