//! Pure view data derived from a loaded page.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use shared::{domain::RequestId, protocol::RequestRecord};

/// How long after creation a request is still shown as new.
pub const RECENT_WINDOW_MINUTES: i64 = 60;

/// Title -> occurrence count, restricted to titles seen more than once.
pub type DuplicateSummary = BTreeMap<String, usize>;

/// Counts repeated titles within `records` only; duplicates spread over
/// other pages are not visible here.
pub fn duplicate_titles(records: &[RequestRecord]) -> DuplicateSummary {
    let mut counts = DuplicateSummary::new();
    for record in records {
        *counts.entry(record.title.clone()).or_insert(0) += 1;
    }
    counts.retain(|_, count| *count > 1);
    counts
}

/// Inclusive at exactly sixty minutes. Timestamps in the future count as recent.
pub fn is_recent(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(timestamp) <= Duration::minutes(RECENT_WINDOW_MINUTES)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRow {
    pub record: RequestRecord,
    pub recent: bool,
    pub image_url: Option<String>,
}

pub fn present_rows(
    records: &[RequestRecord],
    now: DateTime<Utc>,
    image_url: impl Fn(&RequestId) -> String,
) -> Vec<RequestRow> {
    records
        .iter()
        .map(|record| RequestRow {
            recent: is_recent(record.timestamp, now),
            image_url: record.has_image().then(|| image_url(&record.id)),
            record: record.clone(),
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/derived_tests.rs"]
mod tests;
