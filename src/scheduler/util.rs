use chrono::{DateTime, Utc};

/// `[a_start, a_end)` et `[b_start, b_end)` se chevauchent-ils ?
pub(crate) fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}
