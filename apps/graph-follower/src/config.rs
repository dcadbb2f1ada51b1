use anyhow::{Context, Result};
use config::{Config, Environment, File};
use follow_core::CampaignConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// On-disk configuration: connection details plus the campaign itself.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowerConfig {
    pub api_base_url: String,
    /// Account name shown in the login prompt
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(flatten)]
    pub campaign: CampaignConfig,
}

impl FollowerConfig {
    /// Load a JSON or TOML file (by extension); `FOLLOWER__*` environment
    /// variables override file values. Environment values are parsed into
    /// numbers and booleans where they look like one.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("FOLLOWER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config file {}", path))?;

        let config: FollowerConfig = settings
            .try_deserialize()
            .with_context(|| format!("Invalid config in {}", path))?;

        config
            .campaign
            .validate()
            .with_context(|| format!("Invalid campaign settings in {}", path))?;

        Ok(config)
    }
}
