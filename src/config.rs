use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// A model the service knows how to route, and the provider it lands on.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub id: &'static str,
    pub provider: &'static str,
}

/// Models the hosted service currently routes. Configuration, not logic: the
/// gateway rejects unknown ids with a 400 regardless.
pub static KNOWN_MODELS: Lazy<Vec<ModelSpec>> = Lazy::new(|| {
    vec![
        ModelSpec { id: "gemini-2.0-flash", provider: "google" },
        ModelSpec { id: "gemini-1.5-pro", provider: "google" },
        ModelSpec { id: "open-codestral-mamba", provider: "mistral" },
        ModelSpec { id: "mistral-small-latest", provider: "mistral" },
        ModelSpec { id: "groq/compound", provider: "groq" },
        ModelSpec { id: "llama-3.1-8b-instant", provider: "groq" },
        ModelSpec { id: "openai/gpt-oss-120b", provider: "groq" },
        ModelSpec { id: "qwen/qwen3-32b", provider: "groq" },
    ]
});

pub fn is_known_model(id: &str) -> bool {
    KNOWN_MODELS.iter().any(|m| m.id == id)
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the chat service
    pub gateway_url: String,

    /// Opaque session token sent with every request
    pub auth_token: Option<String>,

    /// Default model to use
    pub default_model: String,

    /// Banter home directory
    pub banter_home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Config {
            gateway_url: "http://localhost:3000".to_string(),
            auth_token: None,
            default_model: "gemini-2.0-flash".to_string(),
            banter_home: home.join(".banter"),
        }
    }
}

impl Config {
    /// Load configuration from file, applying environment overrides.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let banter_home = home.join(".banter");
        let config_path = banter_home.join("config.toml");

        fs::create_dir_all(&banter_home).context("Failed to create .banter directory")?;

        let mut config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.banter_home = banter_home;

        if let Ok(url) = std::env::var("BANTER_GATEWAY_URL") {
            config.gateway_url = url;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.banter_home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Get session token from config or environment
    pub fn get_auth_token(&self) -> Option<String> {
        self.auth_token
            .clone()
            .or_else(|| std::env::var("BANTER_AUTH_TOKEN").ok())
    }

    /// Update session token
    #[allow(dead_code)]
    pub fn set_auth_token(&mut self, token: String) {
        self.auth_token = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_gateway() {
        let config = Config::default();
        assert_eq!(config.gateway_url, "http://localhost:3000");
        assert!(is_known_model(&config.default_model));
    }

    #[test]
    fn unknown_models_are_rejected() {
        assert!(is_known_model("mistral-small-latest"));
        assert!(!is_known_model("gpt-imaginary"));
    }
}
