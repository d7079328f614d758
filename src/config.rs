use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_NAME: &str = "vidscout";

/// Environment variables checked for the chat credential, in priority order.
const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_GENAI_API_KEY", "API_KEY"];

/// User preferences persisted in `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  /// Overrides the compiled-in video API base URL.
  pub api_base: Option<String>,
  pub chat_api_key: Option<String>,
  /// Install the key lockdown policy at startup.
  #[serde(default)]
  pub lock_keys: bool,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", APP_NAME)
}

/// Default location of the favorites file.
pub fn favorites_path() -> Option<PathBuf> {
  project_dirs().map(|d| d.data_dir().join("favorites.json"))
}

/// Directory the rolling log files are written to.
pub fn log_dir() -> PathBuf {
  project_dirs().map(|d| d.data_local_dir().join("logs")).unwrap_or_else(|| std::env::temp_dir().join(APP_NAME))
}

impl Config {
  pub fn load() -> Self {
    match project_dirs() {
      Some(dirs) => Self::load_from(&dirs.config_dir().join("prefs.toml")),
      None => Self::default(),
    }
  }

  pub fn load_from(path: &Path) -> Self {
    let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
    match toml::from_str(&content) {
      Ok(config) => config,
      Err(e) => {
        warn!(path = %path.display(), err = %e, "config: ignoring malformed prefs file");
        Self::default()
      }
    }
  }

  pub fn save(&self) {
    if let Some(dirs) = project_dirs() {
      self.save_to(&dirs.config_dir().join("prefs.toml"));
    }
  }

  pub fn save_to(&self, path: &Path) {
    if let Some(dir) = path.parent()
      && std::fs::create_dir_all(dir).is_err()
    {
      return;
    }
    match toml::to_string(self) {
      Ok(content) => {
        if let Err(e) = std::fs::write(path, content) {
          warn!(path = %path.display(), err = %e, "config: failed to save prefs");
        }
      }
      Err(e) => warn!(err = %e, "config: failed to serialize prefs"),
    }
  }

  /// Resolve the chat credential from the environment first, then the prefs file.
  pub fn resolve_api_key(&self) -> Option<String> {
    self.resolve_api_key_with(|name| std::env::var(name).ok())
  }

  pub fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
      .iter()
      .find_map(|name| lookup(name))
      .or_else(|| self.chat_api_key.clone())
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn api_key_env_priority() {
    let config = Config { chat_api_key: Some("from-file".into()), ..Default::default() };
    let key = config.resolve_api_key_with(|name| match name {
      "GOOGLE_GENAI_API_KEY" => Some("second".into()),
      "API_KEY" => Some("third".into()),
      _ => None,
    });
    assert_eq!(key.as_deref(), Some("second"));
  }

  #[test]
  fn api_key_falls_back_to_file() {
    let config = Config { chat_api_key: Some(" from-file ".into()), ..Default::default() };
    assert_eq!(config.resolve_api_key_with(|_| None).as_deref(), Some("from-file"));
  }

  #[test]
  fn api_key_blank_is_absent() {
    let config = Config { chat_api_key: Some("   ".into()), ..Default::default() };
    assert_eq!(config.resolve_api_key_with(|_| None), None);
  }

  #[test]
  fn save_and_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("prefs.toml");
    let config = Config { theme_name: Some("Dusk".into()), lock_keys: true, ..Default::default() };
    config.save_to(&path);
    assert_eq!(Config::load_from(&path), config);
  }

  #[test]
  fn malformed_prefs_use_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.toml");
    std::fs::write(&path, "theme_name = [").unwrap();
    assert_eq!(Config::load_from(&path), Config::default());
  }

  #[test]
  fn missing_prefs_use_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(Config::load_from(&dir.path().join("absent.toml")), Config::default());
  }
}
