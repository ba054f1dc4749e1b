//! Layered settings: built-in defaults, then `cairn.toml`, then `CAIRN_*`
//! environment variables.
//!
//! Nested engine keys use a double underscore in the environment, e.g.
//! `CAIRN_ENGINE__DEDUP_THRESHOLD=0.9`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cairn_core::config::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store_path: PathBuf,
  pub engine:     EngineConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/cairn/cairn.db"),
      engine:     EngineConfig::default(),
    }
  }
}

impl Settings {
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix("CAIRN")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", file.display()))?;

    let settings: Settings = raw
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.engine.validate().context("invalid engine settings")?;
    Ok(settings)
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/cairn.toml")).unwrap();
    assert_eq!(settings.engine, EngineConfig::default());
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    let expanded = expand_tilde(Path::new("~/cairn.db"));
    assert_eq!(expanded, PathBuf::from(home).join("cairn.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }
}
