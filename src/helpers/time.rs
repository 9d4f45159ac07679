use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a configured duration into a chrono offset. Saturates instead of
/// failing on absurd values.
pub fn to_chrono(duration: StdDuration) -> Duration {
    Duration::from_std(duration).unwrap_or(Duration::MAX)
}

/// `DateTime + Duration` that clamps at the representable maximum.
pub fn saturating_add(instant: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    instant.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
