//! Expiration policy for leased credentials

use chrono::{DateTime, TimeDelta, Utc};

/// Report whether a credential issued at `created` is expired at `now`.
///
/// The credential counts as expired once the time elapsed since `created`,
/// at full precision, exceeds `duration_secs - buffer_secs`. A buffer at
/// least as large as the duration therefore expires the credential as soon as
/// any time has passed, and zero or negative windows behave the same way.
/// Windows too large for a `TimeDelta` saturate.
#[must_use]
pub fn is_expired_at(
    created: DateTime<Utc>,
    duration_secs: i64,
    buffer_secs: i64,
    now: DateTime<Utc>,
) -> bool {
    let elapsed = now.signed_duration_since(created);
    let window = duration_secs.saturating_sub(buffer_secs);
    match TimeDelta::try_seconds(window) {
        Some(window) => elapsed > window,
        None => window < 0,
    }
}

/// Report whether a credential issued at `created` is expired right now.
#[must_use]
pub fn is_expired(created: DateTime<Utc>, duration_secs: i64, buffer_secs: i64) -> bool {
    is_expired_at(created, duration_secs, buffer_secs, Utc::now())
}
