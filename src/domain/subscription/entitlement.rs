//! Entitlement engine.
//!
//! Pure computation of a user's current access from stored facts and the
//! current time. Every access decision in the service goes through
//! [`compute_state`]; nothing else branches on trial versus paid.
//!
//! Day counts use millisecond precision with ceiling division, so a period
//! ending in 36 hours reports 2 days left.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::User;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Which kind of entitlement, if any, the user currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementKind {
    None,
    Trial,
    Paid,
}

/// Result of evaluating a user's entitlement at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementState {
    pub kind: EntitlementKind,
    pub days_left: u32,
    pub period_end: Option<Timestamp>,
}

impl EntitlementState {
    pub fn none() -> Self {
        Self {
            kind: EntitlementKind::None,
            days_left: 0,
            period_end: None,
        }
    }

    pub fn grants_access(&self) -> bool {
        !matches!(self.kind, EntitlementKind::None)
    }
}

/// Signed whole days from `now` until `until`, rounded up.
///
/// Negative when `until` is more than a full day in the past; zero for
/// any instant within the last day.
pub fn ceil_days_until(now: Timestamp, until: Timestamp) -> i64 {
    let millis = until.duration_since(&now).num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
        whole + 1
    } else {
        whole
    }
}

/// Computes the user's entitlement at `now`.
///
/// A running paid period wins over an unused trial for reporting but does
/// not consume it. A trial whose computed day count is 0 is still valid:
/// the fractional day after `trial_end` is inclusive.
pub fn compute_state(user: &User, now: Timestamp, trial_days: u32) -> EntitlementState {
    if let Some(end) = user.subscription_end {
        if user.active && end.is_after(&now) {
            return EntitlementState {
                kind: EntitlementKind::Paid,
                days_left: clamp_days(ceil_days_until(now, end)),
                period_end: Some(end),
            };
        }
    }

    if !user.trial_used {
        let trial_end = user.trial_end(trial_days);
        let days = ceil_days_until(now, trial_end);
        if days >= 0 {
            return EntitlementState {
                kind: EntitlementKind::Trial,
                days_left: clamp_days(days),
                period_end: Some(trial_end),
            };
        }
    }

    EntitlementState::none()
}

/// Whether the user's effective period has ended at `now`.
///
/// Stricter than `!grants_access()`: a trial in its last partial day still
/// reports access, but is lapsed once `trial_end` itself has passed.
pub fn is_lapsed(user: &User, now: Timestamp, trial_days: u32) -> bool {
    match compute_state(user, now, trial_days).period_end {
        Some(end) => end.is_before(&now),
        None => true,
    }
}

fn clamp_days(days: i64) -> u32 {
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}
