use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::TimeError;
use crate::models::TimeSlot;

const MINUTES_PER_DAY: u32 = 24 * 60;

// ── Default catalog ──

/// Fixed grid of candidate slots used before live availability arrives.
///
/// Start slots run from `opens` to one step before `closes`; end slots run one
/// step later, so `end_slots()[i]` is always `start_slots()[i]` plus a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CatalogMinutes")]
pub struct SlotCatalog {
    opens: u32,
    closes: u32,
    step: u32,
}

/// Catalog bounds as minutes of the day, checked before use.
#[derive(Debug, Clone, Copy, Deserialize)]
struct CatalogMinutes {
    opens: u32,
    closes: u32,
    step: u32,
}

impl TryFrom<CatalogMinutes> for SlotCatalog {
    type Error = TimeError;

    fn try_from(raw: CatalogMinutes) -> Result<Self, Self::Error> {
        SlotCatalog::from_minutes(raw.opens, raw.closes, raw.step)
    }
}

impl SlotCatalog {
    pub fn new(opens: NaiveTime, closes: NaiveTime, step_minutes: u32) -> Result<Self, TimeError> {
        Self::from_minutes(minute_of_day(opens), minute_of_day(closes), step_minutes)
    }

    fn from_minutes(opens: u32, closes: u32, step: u32) -> Result<Self, TimeError> {
        if step == 0 || closes > MINUTES_PER_DAY || opens.saturating_add(step) > closes {
            return Err(TimeError::InvalidCatalog);
        }
        Ok(Self { opens, closes, step })
    }

    /// Catalog from whole hours, e.g. `preset(8, 20, 60)` for 08:00 AM to 08:00 PM.
    pub(crate) const fn preset(opens_hour: u32, closes_hour: u32, step_minutes: u32) -> Self {
        Self {
            opens: opens_hour * 60,
            closes: closes_hour * 60,
            step: step_minutes,
        }
    }

    pub fn step_minutes(&self) -> u32 {
        self.step
    }

    pub fn start_slots(&self) -> Vec<TimeSlot> {
        self.start_minutes().filter_map(slot_at).collect()
    }

    pub fn end_slots(&self) -> Vec<TimeSlot> {
        self.start_minutes()
            .map(|m| m + self.step)
            .filter_map(slot_at)
            .collect()
    }

    /// Valid end times once `start` is chosen.
    ///
    /// For a catalog start the end list is the end catalog sliced at the
    /// start's index. A start that is not in the catalog (a live slot on an
    /// off-grid minute) keeps every catalog end strictly after it, which is
    /// still a suffix of the end catalog.
    pub fn end_slots_for(&self, start: &TimeSlot) -> Result<Vec<TimeSlot>, TimeError> {
        let start_minute = minute_of_day(start.time()?);
        let ends = self.end_slots();

        if let Some(index) = self.start_minutes().position(|m| m == start_minute) {
            return Ok(ends[index..].to_vec());
        }

        tracing::debug!("start {} is off the catalog grid, filtering end slots", start);
        Ok(ends
            .into_iter()
            .filter(|end| {
                end.time()
                    .map(|t| minute_of_day(t) > start_minute)
                    .unwrap_or(false)
            })
            .collect())
    }

    fn start_minutes(&self) -> impl Iterator<Item = u32> {
        let closes = self.closes;
        let step = self.step;
        (self.opens..closes)
            .step_by(step as usize)
            .take_while(move |m| m + step <= closes)
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        SlotCatalog::preset(8, 20, 60)
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn slot_at(minute: u32) -> Option<TimeSlot> {
    if minute >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0).map(TimeSlot::from_time)
}

// ── Live availability ──

/// One interval reported by the slots API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub open: bool,
}

impl AvailableInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, open: bool) -> Self {
        Self { start, end, open }
    }
}

/// Live availability of one resource on one date. Interval order is the
/// order the API returned (chronological) and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub date: NaiveDate,
    pub intervals: Vec<AvailableInterval>,
}

impl AvailabilityWindow {
    pub fn new(date: NaiveDate, intervals: Vec<AvailableInterval>) -> Self {
        Self { date, intervals }
    }

    /// Display labels of every open interval start.
    pub fn start_slots(&self) -> Vec<TimeSlot> {
        self.intervals
            .iter()
            .filter(|i| i.open)
            .map(|i| TimeSlot::from_time(i.start.time()))
            .collect()
    }

    pub fn has_open_slots(&self) -> bool {
        self.intervals.iter().any(|i| i.open)
    }

    /// True if `[start, end)` is covered by back-to-back open intervals.
    pub fn covers(&self, start: NaiveTime, end: NaiveTime) -> bool {
        if end <= start {
            return false;
        }
        let first = match self
            .intervals
            .iter()
            .position(|i| i.open && i.start.time() == start)
        {
            Some(idx) => idx,
            None => return false,
        };

        for idx in first..self.intervals.len() {
            let interval = &self.intervals[idx];
            if !interval.open {
                return false;
            }
            if idx > first && self.intervals[idx - 1].end != interval.start {
                return false;
            }
            if interval.end.date() > self.date || interval.end.time() >= end {
                return true;
            }
        }
        false
    }
}

/// What the form currently knows about live availability for its selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Nothing requested for the current date and resource.
    NotQueried,
    /// A request is in flight.
    Pending,
    /// The API answered. The window may have no open slots.
    Loaded(AvailabilityWindow),
    /// The last request failed.
    Failed,
}

/// Bookable start times given the current date and live state.
///
/// A cleared date, or a selection with no live data yet, falls back to the
/// full catalog. A failed query yields nothing until the user retries.
pub fn start_options(
    catalog: &SlotCatalog,
    date: Option<NaiveDate>,
    availability: &Availability,
) -> Vec<TimeSlot> {
    if date.is_none() {
        return catalog.start_slots();
    }
    match availability {
        Availability::NotQueried | Availability::Pending => catalog.start_slots(),
        Availability::Loaded(window) => window.start_slots(),
        Availability::Failed => Vec::new(),
    }
}

// ── Tests ──
