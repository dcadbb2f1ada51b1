use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest accepted pause between follows, in seconds (one day).
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Campaign inputs, loaded once and immutable for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignConfig {
    #[serde(default, rename = "specific_accounts_to_follow")]
    pub specific_accounts: Vec<String>,
    #[serde(default)]
    pub target_accounts: Vec<String>,
    #[serde(default)]
    pub settings: CampaignSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignSettings {
    pub min_followers: u64,
    pub max_followers: u64,
    pub skip_private_accounts: bool,
    pub skip_business_accounts: bool,
    /// Per-source cap on successful follows
    pub max_followers_to_follow: usize,
    /// Seconds
    pub delay_between_follows_min: f64,
    /// Seconds
    pub delay_between_follows_max: f64,
    pub rate_limit_cooldown_secs: u64,
    /// Follower batch size as a multiple of the per-source cap
    pub follower_fetch_multiplier: usize,
    /// Also pace after rejected candidates, not only after follows
    pub pace_rejections: bool,
    pub cache_file: String,
    pub session_file: String,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            min_followers: 0,
            max_followers: u64::MAX,
            skip_private_accounts: false,
            skip_business_accounts: false,
            max_followers_to_follow: 50,
            delay_between_follows_min: 30.0,
            delay_between_follows_max: 60.0,
            rate_limit_cooldown_secs: 300,
            follower_fetch_multiplier: 3,
            pace_rejections: false,
            cache_file: "follow_cache.json".to_string(),
            session_file: "session.json".to_string(),
        }
    }
}

impl CampaignSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

impl CampaignConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.settings;

        if s.min_followers > s.max_followers {
            return Err(ConfigError::InvalidValue {
                field: "settings.min_followers".to_string(),
                reason: format!(
                    "{} is greater than max_followers ({})",
                    s.min_followers, s.max_followers
                ),
            });
        }

        for (field, value) in [
            ("settings.delay_between_follows_min", s.delay_between_follows_min),
            ("settings.delay_between_follows_max", s.delay_between_follows_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("{} is not a non-negative number of seconds", value),
                });
            }
            if value > MAX_DELAY_SECS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("{} exceeds the {} second limit", value, MAX_DELAY_SECS),
                });
            }
        }

        if s.delay_between_follows_min > s.delay_between_follows_max {
            return Err(ConfigError::InvalidValue {
                field: "settings.delay_between_follows_min".to_string(),
                reason: format!(
                    "{} is greater than delay_between_follows_max ({})",
                    s.delay_between_follows_min, s.delay_between_follows_max
                ),
            });
        }

        if s.follower_fetch_multiplier < 2 {
            return Err(ConfigError::InvalidValue {
                field: "settings.follower_fetch_multiplier".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }

        if s.cache_file.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "settings.cache_file".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CampaignConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settings.cooldown(), Duration::from_secs(300));
        assert_eq!(config.settings.follower_fetch_multiplier, 3);
    }

    #[test]
    fn test_parses_config_json_layout() {
        let raw = r#"{
            "specific_accounts_to_follow": ["alice", "bob"],
            "target_accounts": ["rustlang"],
            "settings": {
                "min_followers": 10,
                "max_followers": 5000,
                "skip_private_accounts": true,
                "max_followers_to_follow": 20,
                "delay_between_follows_min": 5,
                "delay_between_follows_max": 9.5
            }
        }"#;

        let config: CampaignConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.specific_accounts, vec!["alice", "bob"]);
        assert_eq!(config.target_accounts, vec!["rustlang"]);
        assert_eq!(config.settings.min_followers, 10);
        assert!(config.settings.skip_private_accounts);
        assert!(!config.settings.skip_business_accounts);
        assert_eq!(config.settings.delay_between_follows_max, 9.5);
        assert_eq!(config.settings.cache_file, "follow_cache.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_follower_bounds() {
        let mut config = CampaignConfig::default();
        config.settings.min_followers = 100;
        config.settings.max_followers = 10;

        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "settings.min_followers")
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_delays() {
        let mut config = CampaignConfig::default();
        config.settings.delay_between_follows_min = 10.0;
        config.settings.delay_between_follows_max = 1.0;
        assert!(config.validate().is_err());

        config.settings.delay_between_follows_min = -1.0;
        assert!(config.validate().is_err());

        config.settings.delay_between_follows_min = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_huge_delays() {
        let mut config = CampaignConfig::default();
        config.settings.delay_between_follows_min = 0.0;
        config.settings.delay_between_follows_max = 1e300;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "settings.delay_between_follows_max")
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }

        config.settings.delay_between_follows_max = MAX_DELAY_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_small_fetch_multiplier() {
        let mut config = CampaignConfig::default();
        config.settings.follower_fetch_multiplier = 1;
        assert!(config.validate().is_err());
    }
}
