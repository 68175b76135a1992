//! One-time recovery codes.

use chrono::{DateTime, Duration, Utc};
use sunleaf_core::{CodeId, Phone};

/// A persisted one-time code tied to a user's phone number.
///
/// At most one code exists per phone at any time; requesting a new code
/// replaces the previous one, and successful verification consumes the row.
#[derive(Debug, Clone)]
pub struct StoredCode {
    pub id: CodeId,
    pub phone: Phone,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl StoredCode {
    /// Minutes a code stays valid after it was created (or replaced).
    pub const VALIDITY_MINUTES: i64 = 5;

    /// Whether the code is past its validity window at `now`.
    ///
    /// Expired codes are treated exactly like missing ones during
    /// verification, so callers never need to distinguish the two.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::minutes(Self::VALIDITY_MINUTES)
    }
}
