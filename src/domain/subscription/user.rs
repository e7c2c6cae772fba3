//! User entity: the stored facts entitlement is computed from.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// One registered end user.
///
/// `active` caches "currently entitled to be a channel member". It can go
/// stale between sweeps, so access decisions always recompute through
/// [`compute_state`](super::compute_state) instead of reading it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub join_date: Timestamp,
    pub trial_used: bool,
    pub subscription_end: Option<Timestamp>,
    pub active: bool,
}

impl User {
    /// A user on first contact: trial not consumed, no paid period, active.
    pub fn register(user_id: UserId, display_name: Option<String>, now: Timestamp) -> Self {
        Self {
            user_id,
            display_name,
            join_date: now,
            trial_used: false,
            subscription_end: None,
            active: true,
        }
    }

    /// Instant the free trial ends, whether or not it was consumed.
    pub fn trial_end(&self, trial_days: u32) -> Timestamp {
        self.join_date.plus_days(i64::from(trial_days))
    }

    /// Records a granted paid period.
    pub fn apply_extension(&mut self, new_end: Timestamp) {
        self.subscription_end = Some(new_end);
        self.active = true;
        self.trial_used = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    #[test]
    fn register_starts_active_with_unused_trial() {
        let user = User::register(UserId::new(7), Some("alice".into()), at(1_700_000_000));

        assert!(user.active);
        assert!(!user.trial_used);
        assert!(user.subscription_end.is_none());
        assert_eq!(user.join_date, at(1_700_000_000));
    }

    #[test]
    fn trial_end_adds_trial_days_to_join_date() {
        let user = User::register(UserId::new(7), None, at(1_700_000_000));
        assert_eq!(user.trial_end(5), at(1_700_000_000 + 5 * 86_400));
    }

    #[test]
    fn apply_extension_consumes_trial_and_activates() {
        let mut user = User::register(UserId::new(7), None, at(1_700_000_000));
        user.deactivate();

        user.apply_extension(at(1_800_000_000));

        assert!(user.active);
        assert!(user.trial_used);
        assert_eq!(user.subscription_end, Some(at(1_800_000_000)));
    }
}
