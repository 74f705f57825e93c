use crate::error::App;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_ASSETS_DIR: &str = "/usr/share/tritone/tracks";

#[derive(Deserialize, Default, Debug)]
pub struct Config {
    assets_dir: Option<PathBuf>,
}

impl Config {
    /// Loads the service configuration. A missing or empty file yields the
    /// defaults.
    pub async fn load(file_path: &str) -> Result<Self, App> {
        if !Path::new(file_path).exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(file_path).await?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(&content)?)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.assets_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR))
    }
}
