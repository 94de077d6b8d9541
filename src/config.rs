use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Controller configuration: which origin the controller owns, how its cache
/// generations are named, and what gets pre-cached at install time.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Logical cache name, e.g. "app-shell".
  pub cache_name: String,
  /// Version string of the running controller, e.g. "1.0.0".
  pub version: String,
  /// Application origin; requests matching it are routed cache-first.
  pub scope: Url,
  /// URLs cached at install time, absolute or relative to `scope`.
  #[serde(default)]
  pub precache: Vec<String>,
}

impl Config {
  /// Build a configuration programmatically, for hosts that don't load one
  /// from a file.
  pub fn new(cache_name: &str, version: &str, scope: Url, precache: Vec<String>) -> Self {
    Self {
      cache_name: cache_name.to_string(),
      version: version.to_string(),
      scope,
      precache,
    }
  }

  /// Name of the cache generation this configuration serves from.
  pub fn generation(&self) -> String {
    format!("{}-v{}", self.cache_name, self.version)
  }

  /// Resolve a precache manifest URL against the scope origin.
  pub fn resolve(&self, url: &str) -> Result<Url> {
    self
      .scope
      .join(url)
      .map_err(|e| eyre!("Invalid precache URL '{}': {}", url, e))
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shellcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shellcache/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/shellcache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("shellcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shellcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}
