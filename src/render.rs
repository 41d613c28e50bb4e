use chrono::{DateTime, Utc};

use crate::backend::ReleaseRow;
use crate::platform::InlineItem;

/// Release time as shown to users. Always UTC so output is stable.
fn release_time(pre_at: i64) -> String {
    match DateTime::<Utc>::from_timestamp(pre_at, 0) {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => pre_at.to_string(),
    }
}

/// Single-line summary used for chat replies: `<name> <release time>`.
pub fn short(row: &ReleaseRow) -> String {
    format!("{} {}", row.name, release_time(row.pre_at))
}

/// Inline result for the row at `index` in a result list. The id is only
/// unique within one answer.
pub fn inline_item(index: usize, row: &ReleaseRow) -> InlineItem {
    InlineItem {
        id: index.to_string(),
        title: row.name.clone(),
        body: short(row),
    }
}
