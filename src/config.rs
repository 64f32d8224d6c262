use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `service.url`
pub const SERVICE_URL_ENV: &str = "WO_SERVICE_URL";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
  #[serde(default)]
  pub service: ServiceConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
  /// Base URL of the work order service (e.g. "http://localhost:8080/api")
  pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
  /// Refetch cached lists older than this on the next read. Unset keeps data
  /// until a mutation invalidates it.
  pub stale_after_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
  /// Filter directive used when WO_LOG is not set
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for log files (defaults to the platform data dir)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./wo.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/wo/config.yaml
  ///
  /// Without a file the defaults apply. `WO_SERVICE_URL` overrides the
  /// service URL either way.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.apply_env(std::env::var(SERVICE_URL_ENV).ok());
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("wo.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("wo").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  fn apply_env(&mut self, service_url: Option<String>) {
    if let Some(url) = service_url.filter(|u| !u.trim().is_empty()) {
      self.service.url = Some(url);
    }
  }

  pub fn stale_after(&self) -> Option<chrono::Duration> {
    self
      .cache
      .stale_after_secs
      .and_then(|secs| i64::try_from(secs).ok())
      .map(chrono::Duration::seconds)
  }

  /// Log directory, falling back to <data_dir>/wo/logs
  pub fn log_dir(&self) -> PathBuf {
    self.log.dir.clone().unwrap_or_else(|| {
      dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wo")
        .join("logs")
    })
  }
}
