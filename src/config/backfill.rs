//! Backfill sweep configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::BackfillJobConfig;

use super::error::ValidationError;

/// Backfill sweep configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
    /// Seconds between sweeps
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// How far back (hours) the missed-slot expansion reaches
    #[serde(default = "default_lookback")]
    pub lookback_hours: i64,

    /// Slots younger than this (minutes) are left for live check-ins
    #[serde(default = "default_min_age")]
    pub min_age_minutes: i64,

    /// Grace (minutes) before a stale Scheduled row is forced to Missed
    #[serde(default = "default_grace")]
    pub grace_minutes: i64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            lookback_hours: default_lookback(),
            min_age_minutes: default_min_age(),
            grace_minutes: default_grace(),
        }
    }
}

impl BackfillConfig {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Convert into the job's runtime configuration
    pub fn to_job_config(&self) -> BackfillJobConfig {
        BackfillJobConfig {
            poll_interval: self.poll_interval(),
            lookback_hours: self.lookback_hours,
            min_age_minutes: self.min_age_minutes,
            grace_minutes: self.grace_minutes,
        }
    }

    /// Validate backfill configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_secs == 0 {
            return Err(ValidationError::InvalidBackfillInterval);
        }
        if self.lookback_hours <= 0 || self.lookback_hours * 60 <= self.min_age_minutes {
            return Err(ValidationError::InvalidBackfillWindow);
        }
        if self.min_age_minutes < 0 || self.grace_minutes <= 0 {
            return Err(ValidationError::InvalidGracePeriod);
        }
        Ok(())
    }
}

fn default_poll_interval() -> u64 {
    300
}

fn default_lookback() -> i64 {
    48
}

fn default_min_age() -> i64 {
    60
}

fn default_grace() -> i64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(BackfillConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_fails() {
        let config = BackfillConfig {
            poll_interval_secs: 0,
            ..BackfillConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBackfillInterval)
        ));
    }

    #[test]
    fn lookback_shorter_than_min_age_fails() {
        let config = BackfillConfig {
            lookback_hours: 1,
            min_age_minutes: 120,
            ..BackfillConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBackfillWindow)
        ));
    }

    #[test]
    fn job_config_conversion_preserves_values() {
        let config = BackfillConfig::default();
        let job = config.to_job_config();
        assert_eq!(job.poll_interval, Duration::from_secs(300));
        assert_eq!(job.lookback_hours, 48);
        assert_eq!(job.grace_minutes, 60);
    }
}
