use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Default inference endpoint, a locally served Gradio predict API.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:7860/api/predict";

/// Name shown on the user's own messages when none is configured.
pub const DEFAULT_USERNAME: &str = "Anonymous";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub light_theme: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            username: None,
            light_theme: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Persists the theme choice without disturbing the other fields.
    pub fn save_light_theme(light: bool) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.light_theme = Some(light);
        config.save()
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Log file lives next to the config; the terminal belongs to the UI.
    pub fn get_log_path() -> Result<PathBuf> {
        Ok(Self::get_app_dir()?.join("charla.log"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_app_dir()?.join("config.json"))
    }

    fn get_app_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("charla"))
    }
}
