//! Elapsed time between two slot labels on a single day.
//!
//! The result is not validated: an end at or before the start yields zero or a
//! negative value and callers decide what to do with it.

use chrono::NaiveDate;

use crate::error::TimeError;
use crate::models::TimeSlot;

/// Whole hours from `start` to `end` on `date`, truncated toward zero.
pub fn hours_between(date: NaiveDate, start: &TimeSlot, end: &TimeSlot) -> Result<i64, TimeError> {
    Ok(minutes_between(date, start, end)? / 60)
}

/// Minutes from `start` to `end` on `date`.
pub fn minutes_between(
    date: NaiveDate,
    start: &TimeSlot,
    end: &TimeSlot,
) -> Result<i64, TimeError> {
    let start_at = date.and_time(start.time()?);
    let end_at = date.and_time(end.time()?);
    Ok((end_at - start_at).num_minutes())
}
