//! Subscription terms and sweeper schedule

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::subscription::SubscriptionTerms;

/// Subscription configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Free trial length in days
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,

    /// Length of one paid period in days
    #[serde(default = "default_period_days")]
    pub period_days: u32,

    /// Days-left values that trigger a renewal reminder (comma-separated)
    #[serde(default = "default_reminder_days")]
    pub reminder_days: String,

    /// Seconds between expiry sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Lifetime of a single-use invite link in hours
    #[serde(default = "default_invite_ttl")]
    pub invite_ttl_hours: i64,
}

impl SubscriptionConfig {
    pub fn terms(&self) -> SubscriptionTerms {
        SubscriptionTerms::new(self.trial_days, self.period_days)
    }

    /// Get reminder thresholds as a vector
    pub fn reminder_days(&self) -> Result<Vec<u32>, ValidationError> {
        self.reminder_days
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| ValidationError::InvalidReminderDay(s.to_string()))
            })
            .collect()
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate subscription configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.period_days == 0 {
            return Err(ValidationError::InvalidPeriod);
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if !(1..=720).contains(&self.invite_ttl_hours) {
            return Err(ValidationError::InvalidInviteTtl);
        }
        self.reminder_days()?;
        Ok(())
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
            period_days: default_period_days(),
            reminder_days: default_reminder_days(),
            sweep_interval_secs: default_sweep_interval(),
            invite_ttl_hours: default_invite_ttl(),
        }
    }
}

fn default_trial_days() -> u32 {
    5
}

fn default_period_days() -> u32 {
    30
}

fn default_reminder_days() -> String {
    "3,1".to_string()
}

fn default_sweep_interval() -> u64 {
    24 * 60 * 60
}

fn default_invite_ttl() -> i64 {
    24
}
