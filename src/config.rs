use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

const APP_NAME: &str = "vidstream";

/// User preferences, stored as `prefs.toml` in the platform config directory.
///
/// Search state is deliberately absent: it never outlives the process.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub api_key: Option<String>,
  pub region_code: Option<String>,
  pub sort_order: Option<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(&config_file) {
        match toml::from_str(&content) {
          Ok(config) => return config,
          Err(e) => warn!(path = %config_file.display(), err = %e, "ignoring malformed prefs.toml"),
        }
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self)
          && let Err(e) = std::fs::write(&config_file, content)
        {
          warn!(path = %config_file.display(), err = %e, "failed to save prefs.toml");
        }
      }
    }
  }
}

/// Where the rolling log file lives. Falls back to the temp dir.
pub fn log_dir() -> PathBuf {
  ProjectDirs::from("", "", APP_NAME)
    .map(|p| p.data_local_dir().join("logs"))
    .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME))
}

/// Pick the API key: CLI flag, then `YOUTUBE_API_KEY`, then prefs.
pub fn resolve_api_key(cli: Option<String>, env: Option<String>, config: &Config) -> Option<String> {
  let present = |k: &String| !k.trim().is_empty();
  cli.filter(present).or_else(|| env.filter(present)).or_else(|| config.api_key.clone().filter(present))
}
