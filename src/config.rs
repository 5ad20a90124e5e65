use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use url::Url;

use crate::manifest::ResourceManifest;

/// Deploy-time configuration: one immutable value per deployed version.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Origin the worker serves and fetches from, e.g. `https://app.example.com`.
  pub origin: String,
  /// Path to the cache database (default: $XDG_DATA_HOME/offcache/cache.db)
  pub cache_db: Option<PathBuf>,
  /// Resource path to content fingerprint, as produced by the build.
  pub manifest: BTreeMap<String, String>,
  /// Essential bootstrap resources, fetched eagerly on install.
  pub shell: Vec<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./offcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/offcache/config.yaml
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
        "No configuration file found. Create one at ~/.config/offcache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("offcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("offcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse and validate a YAML configuration document.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Invalid YAML: {}", e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    self.origin_url()?;

    if self.manifest.is_empty() {
      return Err(eyre!("Manifest must list at least one resource"));
    }
    for key in &self.shell {
      if !self.manifest.contains_key(key) {
        return Err(eyre!("Shell resource {} is not in the manifest", key));
      }
    }

    Ok(())
  }

  /// The serving origin as a parsed URL.
  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin {}: {}", self.origin, e))
  }

  /// The manifest as its runtime type.
  pub fn manifest(&self) -> ResourceManifest {
    ResourceManifest::new(self.manifest.clone())
  }

  /// Resolve the cache database path.
  pub fn db_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.cache_db {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("offcache").join("cache.db"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
origin: https://app.example.com
manifest:
  /: "8c3d9a1f"
  index.html: "8c3d9a1f"
  app.js: "0b2e4d6c"
  assets/logo.png: "77aa19e3"
shell:
  - index.html
  - app.js
"#;

  #[test]
  fn test_parses_sample_config() {
    let config = Config::from_yaml(SAMPLE).unwrap();
    assert_eq!(config.origin, "https://app.example.com");
    assert_eq!(config.manifest.len(), 4);
    assert_eq!(config.shell, vec!["index.html", "app.js"]);
    assert!(config.manifest().contains("/"));
  }

  #[test]
  fn test_rejects_shell_key_outside_manifest() {
    let contents = r#"
origin: https://app.example.com
manifest:
  index.html: "8c3d9a1f"
shell:
  - missing.js
"#;
    let err = Config::from_yaml(contents).unwrap_err();
    assert!(err.to_string().contains("missing.js"));
  }

  #[test]
  fn test_rejects_invalid_origin() {
    let contents = r#"
origin: "not a url"
manifest:
  index.html: "8c3d9a1f"
shell: []
"#;
    assert!(Config::from_yaml(contents).is_err());
  }

  #[test]
  fn test_rejects_empty_manifest() {
    let contents = r#"
origin: https://app.example.com
manifest: {}
shell: []
"#;
    assert!(Config::from_yaml(contents).is_err());
  }

  #[test]
  fn test_explicit_db_path_wins() {
    let mut config = Config::from_yaml(SAMPLE).unwrap();
    config.cache_db = Some(PathBuf::from("/tmp/custom.db"));
    assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/custom.db"));
  }
}
