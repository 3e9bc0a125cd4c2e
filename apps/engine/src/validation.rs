use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::duration;
use crate::models::{BookingDraft, Money, ResourceKind};

/// Largest unit price a booking may carry.
pub const MAX_UNIT_PRICE: Money = Money::from_units(1_000_000);

/// Draft fields that can carry an inline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Date,
    StartTime,
    EndTime,
    Quantity,
    Resource,
    UnitPrice,
    Location,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::StartTime => "startTime",
            Field::EndTime => "endTime",
            Field::Quantity => "quantity",
            Field::Resource => "resource",
            Field::UnitPrice => "unitPrice",
            Field::Location => "location",
        }
    }
}

/// `{ field: message }` map, one message per field (the first one found).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field.as_str(), message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

// ── Date bounds ──

/// Inclusive range of selectable dates, `[today, today + horizon]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    first: NaiveDate,
    last: NaiveDate,
}

impl DateWindow {
    pub fn starting(today: NaiveDate, horizon_days: u32) -> Self {
        let last = today
            .checked_add_days(Days::new(u64::from(horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        Self { first: today, last }
    }

    pub fn first(&self) -> NaiveDate {
        self.first
    }

    pub fn last(&self) -> NaiveDate {
        self.last
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last;
        self.first.iter_days().take_while(move |d| *d <= last)
    }
}

// ── Schema ──

/// Per-vertical requirements on top of the fields every booking needs
/// (date, start, end, quantity, price). Every booking lasts at least one
/// whole hour since the API takes the duration in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub resource_kind: Option<ResourceKind>,
    pub requires_location: bool,
    pub max_quantity: u32,
}

pub fn validate(draft: &BookingDraft, schema: &Schema, window: &DateWindow) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    match draft.date {
        None => errors.insert(Field::Date, "Please select a date"),
        Some(date) if !window.contains(date) => errors.insert(
            Field::Date,
            format!(
                "Date must be between {} and {}",
                window.first().format("%Y-%m-%d"),
                window.last().format("%Y-%m-%d")
            ),
        ),
        Some(_) => {}
    }

    let start = match &draft.start_time {
        None => {
            errors.insert(Field::StartTime, "Please select a start time");
            None
        }
        Some(slot) => match slot.time() {
            Ok(_) => Some(slot),
            Err(_) => {
                errors.insert(Field::StartTime, "Start time is not a valid time");
                None
            }
        },
    };

    let end = match &draft.end_time {
        None => {
            errors.insert(Field::EndTime, "Please select an end time");
            None
        }
        Some(slot) => match slot.time() {
            Ok(_) => Some(slot),
            Err(_) => {
                errors.insert(Field::EndTime, "End time is not a valid time");
                None
            }
        },
    };

    if let (Some(start), Some(end)) = (start, end) {
        // Same-day bookings only, so any anchor date works when none is set yet.
        let anchor = draft.date.unwrap_or(window.first());
        if let Ok(minutes) = duration::minutes_between(anchor, start, end) {
            if minutes <= 0 {
                errors.insert(Field::EndTime, "End time must be after start time");
            } else if minutes < 60 {
                errors.insert(Field::EndTime, "Booking must last at least one hour");
            }
        }
    }

    match draft.quantity {
        None => errors.insert(Field::Quantity, "Please enter a quantity"),
        Some(q) if q == 0 || q > schema.max_quantity => errors.insert(
            Field::Quantity,
            format!("Quantity must be between 1 and {}", schema.max_quantity),
        ),
        Some(_) => {}
    }

    if let Some(kind) = schema.resource_kind {
        match &draft.resource {
            None => errors.insert(Field::Resource, format!("Please select a {}", kind.as_str())),
            Some(r) if r.kind != kind => {
                errors.insert(Field::Resource, format!("Please select a {}", kind.as_str()))
            }
            Some(r) if r.id.trim().is_empty() => {
                errors.insert(Field::Resource, format!("Please select a {}", kind.as_str()))
            }
            Some(_) => {}
        }
    }

    match draft.unit_price {
        None => errors.insert(Field::UnitPrice, "Please select a service"),
        Some(p) if p.cents() < 0 => errors.insert(Field::UnitPrice, "Price cannot be negative"),
        Some(p) if p > MAX_UNIT_PRICE => errors.insert(Field::UnitPrice, "Price is too large"),
        Some(_) => {}
    }

    if schema.requires_location && draft.location.is_none() {
        errors.insert(Field::Location, "Please choose where the service takes place");
    }

    errors.into_result()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceRef, ServiceLocation, TimeSlot};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::starting(today(), 14)
    }

    fn room_schema() -> Schema {
        Schema {
            resource_kind: Some(ResourceKind::Room),
            requires_location: false,
            max_quantity: 8,
        }
    }

    fn complete_room_draft() -> BookingDraft {
        BookingDraft {
            date: Some(today()),
            start_time: Some(TimeSlot::new("10:00 AM")),
            end_time: Some(TimeSlot::new("12:00 PM")),
            quantity: Some(2),
            resource: Some(ResourceRef::new(ResourceKind::Room, "room-1")),
            unit_price: Some(Money::from_units(100)),
            ..Default::default()
        }
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let w = window();
        assert!(w.contains(today()));
        assert!(w.contains(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()));
        assert_eq!(w.dates().count(), 15);
    }

    #[test]
    fn test_complete_draft_is_valid() {
        assert_eq!(validate(&complete_room_draft(), &room_schema(), &window()), Ok(()));
    }

    #[test]
    fn test_empty_draft_reports_every_required_field() {
        let errors = validate(&BookingDraft::default(), &room_schema(), &window()).unwrap_err();
        for field in [
            Field::Date,
            Field::StartTime,
            Field::EndTime,
            Field::Quantity,
            Field::Resource,
            Field::UnitPrice,
        ] {
            assert!(errors.contains(field), "missing {:?}", field);
        }
        assert!(!errors.contains(Field::Location));
    }

    #[test]
    fn test_end_before_start() {
        let mut draft = complete_room_draft();
        draft.end_time = Some(TimeSlot::new("09:00 AM"));
        let errors = validate(&draft, &room_schema(), &window()).unwrap_err();
        assert_eq!(errors.get(Field::EndTime), Some("End time must be after start time"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_under_an_hour_rejected() {
        let mut draft = complete_room_draft();
        draft.end_time = Some(TimeSlot::new("10:30 AM"));
        let errors = validate(&draft, &room_schema(), &window()).unwrap_err();
        assert_eq!(errors.get(Field::EndTime), Some("Booking must last at least one hour"));

        let doctor_schema = Schema {
            resource_kind: Some(ResourceKind::Doctor),
            requires_location: false,
            max_quantity: 1,
        };
        draft.quantity = Some(1);
        draft.resource = Some(ResourceRef::new(ResourceKind::Doctor, "dr-1"));
        let errors = validate(&draft, &doctor_schema, &window()).unwrap_err();
        assert!(errors.contains(Field::EndTime));
    }

    #[test]
    fn test_unit_price_ceiling() {
        let mut draft = complete_room_draft();
        draft.unit_price = Some(MAX_UNIT_PRICE);
        assert!(validate(&draft, &room_schema(), &window()).is_ok());
        draft.unit_price = Some(Money::from_units_f64(1e17).unwrap());
        let errors = validate(&draft, &room_schema(), &window()).unwrap_err();
        assert_eq!(errors.get(Field::UnitPrice), Some("Price is too large"));
    }

    #[test]
    fn test_date_out_of_window() {
        let mut draft = complete_room_draft();
        draft.date = NaiveDate::from_ymd_opt(2026, 4, 1);
        let errors = validate(&draft, &room_schema(), &window()).unwrap_err();
        assert_eq!(
            errors.get(Field::Date),
            Some("Date must be between 2026-03-01 and 2026-03-15")
        );
    }

    #[test]
    fn test_quantity_bounds() {
        let mut draft = complete_room_draft();
        draft.quantity = Some(0);
        assert!(validate(&draft, &room_schema(), &window())
            .unwrap_err()
            .contains(Field::Quantity));
        draft.quantity = Some(9);
        assert!(validate(&draft, &room_schema(), &window())
            .unwrap_err()
            .contains(Field::Quantity));
        draft.quantity = Some(8);
        assert!(validate(&draft, &room_schema(), &window()).is_ok());
    }

    #[test]
    fn test_wrong_resource_kind() {
        let mut draft = complete_room_draft();
        draft.resource = Some(ResourceRef::new(ResourceKind::Doctor, "dr-1"));
        let errors = validate(&draft, &room_schema(), &window()).unwrap_err();
        assert_eq!(errors.get(Field::Resource), Some("Please select a room"));
    }

    #[test]
    fn test_location_required_when_schema_says_so() {
        let schema = Schema {
            resource_kind: None,
            requires_location: true,
            max_quantity: 3,
        };
        let mut draft = complete_room_draft();
        assert!(validate(&draft, &schema, &window())
            .unwrap_err()
            .contains(Field::Location));
        draft.location = Some(ServiceLocation::OwnersHome);
        assert!(validate(&draft, &schema, &window()).is_ok());
    }

    #[test]
    fn test_invalid_label_is_field_error() {
        let mut draft = complete_room_draft();
        draft.start_time = Some(TimeSlot::new("later"));
        let errors = validate(&draft, &room_schema(), &window()).unwrap_err();
        assert_eq!(errors.get(Field::StartTime), Some("Start time is not a valid time"));
    }

    #[test]
    fn test_first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.insert(Field::Date, "first");
        errors.insert(Field::Date, "second");
        assert_eq!(errors.get(Field::Date), Some("first"));
    }

    #[test]
    fn test_errors_serialize_as_map() {
        let mut errors = FieldErrors::new();
        errors.insert(Field::StartTime, "Please select a start time");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["startTime"], "Please select a start time");
        assert_eq!(errors.to_string(), "startTime: Please select a start time");
    }
}
