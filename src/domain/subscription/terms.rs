//! Commercial terms shared by the engine, the mutator and the sweeper.

use serde::{Deserialize, Serialize};

/// Length of the free trial and of each purchased period, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTerms {
    pub trial_days: u32,
    pub period_days: u32,
}

impl SubscriptionTerms {
    pub fn new(trial_days: u32, period_days: u32) -> Self {
        Self {
            trial_days,
            period_days,
        }
    }
}

impl Default for SubscriptionTerms {
    fn default() -> Self {
        Self {
            trial_days: 5,
            period_days: 30,
        }
    }
}
