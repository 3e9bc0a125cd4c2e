use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

use crate::error::{AmountError, TimeError};
use crate::verticals::Vertical;

/// Display format of slot labels, e.g. "09:00 AM".
pub const LABEL_FORMAT: &str = "%I:%M %p";

// ── Money ──

/// Monetary amount in minor units (cents). Arithmetic saturates at the
/// `i64` bounds instead of wrapping.
///
/// On the wire amounts travel as plain JSON numbers in major units, so serde
/// goes through `f64` and rounds half-up to the cent on the way in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_units(units: i64) -> Self {
        Money(units.saturating_mul(100))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_units(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Convert a major-unit amount, rounding half-up to the cent.
    pub fn from_units_f64(units: f64) -> Result<Self, AmountError> {
        if !units.is_finite() {
            return Err(AmountError::NotFinite(units));
        }
        Ok(Money(round_half_up(units * 100.0)))
    }
}

/// Round half-up (towards positive infinity on ties).
pub(crate) fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

impl TryFrom<f64> for Money {
    type Error = AmountError;

    fn try_from(units: f64) -> Result<Self, Self::Error> {
        Money::from_units_f64(units)
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> f64 {
        money.as_units()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0.saturating_mul(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// ── Discount ──

/// Percentage discount stored in basis points (1% = 100).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiscountRate(u32);

impl DiscountRate {
    pub const NONE: DiscountRate = DiscountRate(0);

    /// Build from a percent value as the API reports it, clamped to 0..=100.
    pub fn from_percent(percent: f64) -> Result<Self, AmountError> {
        if !percent.is_finite() {
            return Err(AmountError::NotFinite(percent));
        }
        let bp = round_half_up(percent * 100.0).clamp(0, 10_000);
        Ok(DiscountRate(bp as u32))
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    pub fn percent(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Discount owed on `subtotal`, rounded half-up to the cent.
    pub fn amount_of(self, subtotal: Money) -> Money {
        if self.0 == 0 {
            return Money::ZERO;
        }
        let scaled = subtotal.cents() as i128 * self.0 as i128;
        // floor((scaled + 5000) / 10000), correct for negative subtotals too
        let cents = (scaled + 5_000).div_euclid(10_000);
        Money::from_cents(cents as i64)
    }
}

// ── Time slots ──

/// A bookable start or end time-of-day, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSlot {
    label: String,
}

impl TimeSlot {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            label: time.format(LABEL_FORMAT).to_string(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn time(&self) -> Result<NaiveTime, TimeError> {
        parse_label(&self.label)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Parse "09:00 AM" style labels; plain "HH:MM" is accepted as well.
pub fn parse_label(label: &str) -> Result<NaiveTime, TimeError> {
    let trimmed = label.trim();
    NaiveTime::parse_from_str(trimmed, LABEL_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| TimeError::InvalidLabel(trimmed.to_string()))
}

// ── Resources, add-ons, flags ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Room,
    Doctor,
    Sitter,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Room => "room",
            ResourceKind::Doctor => "doctor",
            ResourceKind::Sitter => "sitter",
        }
    }
}

/// The bookable entity availability is queried against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceLocation {
    Facility,
    OwnersHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingFlag {
    Overnight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub id: String,
    pub name: String,
    pub price: Money,
}

impl AddOn {
    pub fn new(id: &str, name: &str, price: Money) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
        }
    }
}

/// Priced extras a draft refers to by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddOnCatalog {
    items: Vec<AddOn>,
}

impl AddOnCatalog {
    pub fn new(items: Vec<AddOn>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[AddOn] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&AddOn> {
        self.items.iter().find(|a| a.id == id)
    }

    /// Sum of catalog prices for the selected ids. Unknown ids count as zero.
    pub fn total_for(&self, ids: &BTreeSet<String>) -> Money {
        ids.iter()
            .map(|id| match self.get(id) {
                Some(addon) => addon.price,
                None => {
                    tracing::debug!("add-on '{}' not in catalog, ignoring", id);
                    Money::ZERO
                }
            })
            .sum()
    }
}

// ── Draft ──

/// In-progress booking state. Duration and total are derived, never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub date: Option<NaiveDate>,
    pub start_time: Option<TimeSlot>,
    pub end_time: Option<TimeSlot>,
    pub quantity: Option<u32>,
    pub add_on_ids: BTreeSet<String>,
    pub resource: Option<ResourceRef>,
    pub unit_price: Option<Money>,
    pub flags: BTreeSet<BookingFlag>,
    pub location: Option<ServiceLocation>,
    pub discount: DiscountRate,
}

impl BookingDraft {
    /// True when the user has not touched any field. The discount is
    /// fetched externally and does not count.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.quantity.is_none()
            && self.add_on_ids.is_empty()
            && self.resource.is_none()
            && self.unit_price.is_none()
            && self.flags.is_empty()
            && self.location.is_none()
    }

    /// Whole hours between start and end on the draft's date.
    pub fn duration_hours(&self) -> Option<i64> {
        let date = self.date?;
        let start = self.start_time.as_ref()?;
        let end = self.end_time.as_ref()?;
        crate::duration::hours_between(date, start, end).ok()
    }

    pub fn has_flag(&self, flag: BookingFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Date/time/guest choices shared between consecutive booking steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarriedSelection {
    pub date: Option<NaiveDate>,
    pub start_time: Option<TimeSlot>,
    pub end_time: Option<TimeSlot>,
    pub guests: Option<u32>,
}

// ── API request types ──

/// Serialized draft sent to the booking endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    #[serde(rename = "type")]
    pub vertical: Vertical,
    pub date: NaiveDate,
    pub start_time: TimeSlot,
    pub end_time: TimeSlot,
    pub duration: i64,
    pub quantity: u32,
    pub total_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_kind: Option<ResourceKind>,
    pub add_on_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ServiceLocation>,
    pub flags: Vec<BookingFlag>,
    pub discount_percent: f64,
}

/// Transient message for the user after a submission settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(m) | Notice::Error(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

// ── Tests ──
