use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Main configuration structure for the intake assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Process-wide fallback key; a key entered for the session wins
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Age prefilled into new profiles
    #[serde(default)]
    pub default_age: Option<u8>,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("Loaded .env from: {}", path.display()),
            Err(_) => tracing::debug!("No .env file found - continuing with env vars only"),
        }

        let config_path =
            env::var("WELLNESS_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::from_yaml_str(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = env::var("DEEPSEEK_API_KEY") {
            self.provider.api_key = api_key;
        }
        if let Ok(base_url) = env::var("DEEPSEEK_BASE_URL") {
            self.provider.base_url = base_url;
        }
        if let Ok(model) = env::var("DEEPSEEK_MODEL") {
            self.provider.model = model;
        }
        if let Ok(temperature) = env::var("DEEPSEEK_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.provider.temperature = value;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.provider.base_url.trim().is_empty() {
            return Err("provider.base_url cannot be empty".into());
        }
        if self.provider.model.trim().is_empty() {
            return Err("provider.model cannot be empty".into());
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err("provider.temperature must be between 0.0 and 2.0".into());
        }
        if self.provider.api_key.trim().is_empty() {
            return Err("DEEPSEEK_API_KEY not set; a key must be entered per session".into());
        }
        Ok(())
    }

    /// Session key first, then the configured key; empty when neither is set.
    pub fn resolve_api_key(&self, session_key: &str) -> String {
        let session_key = session_key.trim();
        if !session_key.is_empty() {
            return session_key.to_string();
        }
        self.provider.api_key.trim().to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                api_key: String::new(),
                base_url: "https://api.deepseek.com".to_string(),
                model: "deepseek-chat".to_string(),
                temperature: 0.3,
            },
            session: SessionConfig::default(),
        }
    }
}
