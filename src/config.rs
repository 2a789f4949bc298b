use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::api::url::{clean_endpoint, normalize_endpoint};
use crate::api::FallbackTable;

const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub polling: PollingConfig,
  #[serde(default)]
  pub offline: OfflineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// API root, e.g. `https://kennel.example.com/api`
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Request timeout; none by default
  pub timeout_secs: Option<u64>,
  /// Endpoints treated as missing from startup, relative to `base_url`
  #[serde(default, deserialize_with = "deserialize_endpoint_set")]
  pub known_missing: BTreeSet<String>,
  /// Extra optional endpoints and the payload served when they are absent
  #[serde(default)]
  pub fallbacks: BTreeMap<String, Value>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: None,
      known_missing: BTreeSet::new(),
      fallbacks: BTreeMap::new(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file for local storage (default: <data_dir>/kennel/storage.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
  #[serde(default = "default_poll_secs")]
  pub interval_secs: u64,
}

impl Default for PollingConfig {
  fn default() -> Self {
    Self {
      interval_secs: default_poll_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfflineConfig {
  /// Serve customers from local storage when the server is unreachable
  #[serde(default = "default_true")]
  pub enabled: bool,
  #[serde(default = "default_sync_secs")]
  pub sync_interval_secs: u64,
}

impl Default for OfflineConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      sync_interval_secs: default_sync_secs(),
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_poll_secs() -> u64 {
  30
}

fn default_sync_secs() -> u64 {
  60
}

fn default_true() -> bool {
  true
}

fn deserialize_endpoint_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v: Vec<String> = Vec::deserialize(deserializer)?;
  Ok(
    v.iter()
      .map(|s| normalize_endpoint(s))
      .filter(|s| !s.is_empty())
      .collect(),
  )
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./kennel.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/kennel/config.yaml
  ///
  /// Without a file the defaults apply (local API on port 5000).
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("kennel.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("kennel").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn validate(&self) -> Result<()> {
    let url = Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url {:?}: {}", self.api.base_url, e))?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!(
        "api.base_url must be http or https, got {}",
        url.scheme()
      ));
    }
    if self.polling.interval_secs == 0 {
      return Err(eyre!("polling.interval_secs must be greater than zero"));
    }
    if self.offline.sync_interval_secs == 0 {
      return Err(eyre!("offline.sync_interval_secs must be greater than zero"));
    }
    Ok(())
  }

  /// Base URL without a trailing slash.
  pub fn base_url(&self) -> &str {
    self.api.base_url.trim_end_matches('/')
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.api.timeout_secs.map(Duration::from_secs)
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.polling.interval_secs)
  }

  pub fn sync_interval(&self) -> Duration {
    Duration::from_secs(self.offline.sync_interval_secs)
  }

  /// Built-in fallbacks plus the configured ones.
  pub fn fallback_table(&self) -> FallbackTable {
    let mut table = FallbackTable::defaults();
    for (endpoint, payload) in &self.api.fallbacks {
      table.register(&clean_endpoint(self.base_url(), endpoint), payload.clone());
    }
    table
  }

  /// Get the API token from the environment.
  ///
  /// Checks KENNEL_API_TOKEN; an empty value counts as unset.
  pub fn get_api_token() -> Option<String> {
    std::env::var("KENNEL_API_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
