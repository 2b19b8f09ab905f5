//! Daily audit windows counting back from a reference instant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Windows for days `1..=days` before `reference`, most recent first.
/// Day `d` covers `[reference - d days, reference - (d-1) days + overlap)`,
/// so adjacent windows share `overlap` at each boundary.
///
/// The live content listing rejects ranges longer than 24 hours; an overlap
/// of zero keeps every window at exactly one day.
pub fn daily_windows(
    reference: DateTime<Utc>,
    days: u32,
    overlap_minutes: i64,
) -> Vec<TimeWindow> {
    let overlap = Duration::minutes(overlap_minutes);
    (1..=i64::from(days))
        .map(|d| TimeWindow {
            start: reference - Duration::days(d),
            end: reference - Duration::days(d - 1) + overlap,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
