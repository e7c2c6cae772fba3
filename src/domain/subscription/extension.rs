//! Subscription extension rule.
//!
//! Decides where a newly purchased period ends, given the user's row as
//! read under lock inside the applying transaction.

use crate::domain::foundation::Timestamp;

use super::entitlement::ceil_days_until;
use super::{SubscriptionTerms, User};

/// Computes the new `subscription_end` for one successful payment.
///
/// - A running paid period is stacked: `end + period`.
/// - Otherwise an unused trial is folded in: `now + period + remaining trial days`.
/// - Otherwise the period starts now.
pub fn next_subscription_end(user: &User, now: Timestamp, terms: &SubscriptionTerms) -> Timestamp {
    let period = i64::from(terms.period_days);

    if let Some(end) = user.subscription_end {
        if end.is_after(&now) {
            return end.plus_days(period);
        }
    }

    if !user.trial_used {
        let remaining = ceil_days_until(now, user.trial_end(terms.trial_days)).max(0);
        return now.plus_days(period + remaining);
    }

    now.plus_days(period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::subscription::{compute_state, EntitlementKind};
    use proptest::prelude::*;

    const DAY: i64 = 86_400;
    const NOW: i64 = 1_750_000_000;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn terms() -> SubscriptionTerms {
        SubscriptionTerms::default()
    }

    #[test]
    fn stacks_onto_running_period() {
        let mut user = User::register(UserId::new(1), None, at(NOW - 60 * DAY));
        user.trial_used = true;
        user.subscription_end = Some(at(NOW + 10 * DAY));

        assert_eq!(next_subscription_end(&user, at(NOW), &terms()), at(NOW + 40 * DAY));
    }

    #[test]
    fn stacking_ignores_active_flag() {
        let mut user = User::register(UserId::new(1), None, at(NOW - 60 * DAY));
        user.trial_used = true;
        user.active = false;
        user.subscription_end = Some(at(NOW + 10 * DAY));

        assert_eq!(next_subscription_end(&user, at(NOW), &terms()), at(NOW + 40 * DAY));
    }

    #[test]
    fn folds_remaining_trial_days() {
        // joined 2 days ago with a 5 day trial: 3 days remain
        let user = User::register(UserId::new(1), None, at(NOW - 2 * DAY));
        assert_eq!(next_subscription_end(&user, at(NOW), &terms()), at(NOW + 33 * DAY));
    }

    #[test]
    fn partial_trial_day_counts_as_a_whole_day() {
        let user = User::register(UserId::new(1), None, at(NOW - 2 * DAY - 3600));
        assert_eq!(next_subscription_end(&user, at(NOW), &terms()), at(NOW + 33 * DAY));
    }

    #[test]
    fn elapsed_trial_folds_nothing() {
        let user = User::register(UserId::new(1), None, at(NOW - 20 * DAY));
        assert_eq!(next_subscription_end(&user, at(NOW), &terms()), at(NOW + 30 * DAY));
    }

    #[test]
    fn lapsed_paid_user_starts_fresh() {
        let mut user = User::register(UserId::new(1), None, at(NOW - 90 * DAY));
        user.trial_used = true;
        user.subscription_end = Some(at(NOW - 1));

        assert_eq!(next_subscription_end(&user, at(NOW), &terms()), at(NOW + 30 * DAY));
    }

    proptest! {
        #[test]
        fn applied_period_always_grants_paid_access(
            joined in -200 * DAY..0i64,
            end_offset in proptest::option::of(-200 * DAY..200 * DAY),
            trial_used in any::<bool>(),
            active in any::<bool>(),
        ) {
            let mut user = User::register(UserId::new(1), None, at(NOW + joined));
            user.trial_used = trial_used;
            user.active = active;
            user.subscription_end = end_offset.map(|o| at(NOW + o));

            let new_end = next_subscription_end(&user, at(NOW), &terms());
            prop_assert!(new_end.duration_since(&at(NOW)).num_days() >= 30);

            user.apply_extension(new_end);
            let state = compute_state(&user, at(NOW), terms().trial_days);
            prop_assert_eq!(state.kind, EntitlementKind::Paid);
            prop_assert!(state.days_left >= 30);
        }

        #[test]
        fn extension_never_shortens_a_running_period(remaining in 1i64..365 * DAY) {
            let mut user = User::register(UserId::new(1), None, at(NOW - 400 * DAY));
            user.trial_used = true;
            user.subscription_end = Some(at(NOW + remaining));

            let new_end = next_subscription_end(&user, at(NOW), &terms());
            prop_assert_eq!(new_end, at(NOW + remaining + 30 * DAY));
        }
    }
}
