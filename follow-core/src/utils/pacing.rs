use rand::Rng;
use std::time::Duration;

use crate::config::{CampaignSettings, MAX_DELAY_SECS};

/// Seconds to a `Duration`, clamped to `[0, MAX_DELAY_SECS]`. NaN is zero.
fn clamped_secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
}

/// Sleep schedule for the follow loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Pause after the service signals rate limiting
    pub cooldown: Duration,
    /// Pace rejected candidates too, not only successful follows
    pub pace_rejections: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::from(&CampaignSettings::default())
    }
}

impl From<&CampaignSettings> for PacingConfig {
    fn from(settings: &CampaignSettings) -> Self {
        let min_delay = clamped_secs(settings.delay_between_follows_min);
        let max_delay = clamped_secs(settings.delay_between_follows_max).max(min_delay);
        Self {
            min_delay,
            max_delay,
            cooldown: settings.cooldown(),
            pace_rejections: settings.pace_rejections,
        }
    }
}

impl PacingConfig {
    /// No waiting at all. Useful for dry runs.
    pub fn immediate() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            cooldown: Duration::ZERO,
            pace_rejections: false,
        }
    }

    /// Uniform draw from `[min_delay, max_delay]`.
    pub fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let secs = rand::thread_rng()
            .gen_range(self.min_delay.as_secs_f64()..=self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay_within_bounds() {
        let pacing = PacingConfig {
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
            cooldown: Duration::from_secs(300),
            pace_rejections: false,
        };
        for _ in 0..200 {
            let d = pacing.next_delay();
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(5));
        }
    }

    #[test]
    fn test_degenerate_range() {
        let pacing = PacingConfig {
            min_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(3),
            ..PacingConfig::immediate()
        };
        assert_eq!(pacing.next_delay(), Duration::from_secs(3));
        assert_eq!(PacingConfig::immediate().next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_from_settings() {
        let settings = CampaignSettings {
            delay_between_follows_min: 1.5,
            delay_between_follows_max: 4.0,
            rate_limit_cooldown_secs: 120,
            pace_rejections: true,
            ..Default::default()
        };
        let pacing = PacingConfig::from(&settings);
        assert_eq!(pacing.min_delay, Duration::from_millis(1500));
        assert_eq!(pacing.max_delay, Duration::from_secs(4));
        assert_eq!(pacing.cooldown, Duration::from_secs(120));
        assert!(pacing.pace_rejections);
    }

    #[test]
    fn test_out_of_range_delays_are_clamped() {
        let settings = CampaignSettings {
            delay_between_follows_min: -5.0,
            delay_between_follows_max: 1e300,
            ..Default::default()
        };
        let pacing = PacingConfig::from(&settings);
        assert_eq!(pacing.min_delay, Duration::ZERO);
        assert_eq!(pacing.max_delay, Duration::from_secs(86_400));
        assert!(pacing.next_delay() <= Duration::from_secs(86_400));

        let settings = CampaignSettings {
            delay_between_follows_min: f64::NAN,
            delay_between_follows_max: f64::INFINITY,
            ..Default::default()
        };
        let pacing = PacingConfig::from(&settings);
        assert_eq!(pacing.min_delay, Duration::ZERO);
        assert_eq!(pacing.max_delay, Duration::from_secs(86_400));
    }
}
