use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

pub const DEFAULT_NEWS_CHANNEL_URL: &str = "https://t.me/caramba_news";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniAppConfig {
    pub api_base_url: String,
    #[serde(default = "default_news_channel_url")]
    pub news_channel_url: String,
}

fn default_news_channel_url() -> String {
    DEFAULT_NEWS_CHANNEL_URL.to_string()
}

impl MiniAppConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            news_channel_url: default_news_channel_url(),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&["/etc/caramba/miniapp.toml", "./miniapp.toml"])
    }

    fn load_from(config_paths: &[&str]) -> Result<Self> {
        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                // An unreadable file must not block the later sources.
                match toml::from_str(&contents) {
                    Ok(config) => {
                        tracing::info!("Loading config from {}", path);
                        return Ok(config);
                    }
                    Err(err) => tracing::warn!("Skipping config at {}: {}", path, err),
                }
            }
        }

        // Fallback to environment variables
        dotenvy::dotenv().ok();
        tracing::info!("Loading config from environment");
        Ok(Self {
            api_base_url: std::env::var("API_BASE_URL")?,
            news_channel_url: std::env::var("NEWS_CHANNEL_URL")
                .unwrap_or_else(|_| DEFAULT_NEWS_CHANNEL_URL.to_string()),
        })
    }
}
