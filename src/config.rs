use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub backend_url: Option<String>,
    pub image_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend_url: None,
            image_dir: None,
        }
    }

    /// Load the config file, writing a default one on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let config = Self::new();
            config.save()?;
            return Ok(config);
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        Ok(())
    }

    pub fn backend_url(&self) -> &str {
        self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("atelier").join("config.json"))
    }
}

/// Data directory for the log file and exported designs.
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;

    Ok(dir.join("atelier"))
}
