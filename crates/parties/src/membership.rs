//! Company membership state and the renewal extension rule.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed increment a paid renewal adds to a company's membership.
pub const MEMBERSHIP_EXTENSION_DAYS: i64 = 30;

/// A company's current membership plan and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipState {
    pub plan: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MembershipState {
    pub fn free() -> Self {
        Self {
            plan: "Free".to_string(),
            expires_at: None,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => expiry > now,
            None => false,
        }
    }

    /// Apply a paid renewal.
    ///
    /// The new expiry is the later of `now` and the current expiry, plus the
    /// fixed increment, so sequential renewals stack instead of resetting an
    /// overlap, and a lapsed membership restarts from `now` rather than from
    /// the stale expiry.
    pub fn renew(&mut self, plan: impl Into<String>, now: DateTime<Utc>) {
        let base = match self.expires_at {
            Some(expiry) if expiry > now => expiry,
            _ => now,
        };
        self.plan = plan.into();
        self.expires_at = Some(base + Duration::days(MEMBERSHIP_EXTENSION_DAYS));
    }
}
