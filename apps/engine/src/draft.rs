//! Booking form state: one draft, its derived views and its submission lifecycle.
//!
//! ```text
//! Empty -> PartiallyFilled -> Valid -> Submitting -> Submitted
//!                               ^           |
//!                               +-- Failed -+
//! ```
//!
//! Empty, PartiallyFilled and Valid are derived from the draft on every read.
//! Submitting locks every edit; Failed keeps the draft intact and unlocks it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::duration;
use crate::error::DraftError;
use crate::models::{
    AddOnCatalog, BookingDraft, BookingFlag, BookingPayload, CarriedSelection, DiscountRate,
    Money, Notice, ResourceRef, ServiceLocation, TimeSlot,
};
use crate::pricing::{self, PriceBreakdown, PricingProfile};
use crate::slots::{self, Availability, AvailabilityWindow, SlotCatalog};
use crate::validation::{self, DateWindow, Field, FieldErrors, Schema};
use crate::verticals::Vertical;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Empty,
    PartiallyFilled,
    Valid,
    Submitting,
    Submitted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Editing,
    Submitting,
    Submitted,
    Failed(String),
}

/// A live-slots request the caller runs and reports back with
/// [`BookingForm::apply_availability`] or [`BookingForm::availability_failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    pub token: u64,
    pub resource: ResourceRef,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotUpdate {
    Applied,
    /// A newer selection was made after the request went out.
    Stale,
}

/// How the booking API answered a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(String),
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct BookingForm {
    vertical: Vertical,
    schema: Schema,
    profile: PricingProfile,
    add_ons: AddOnCatalog,
    slots: SlotCatalog,
    window: DateWindow,
    draft: BookingDraft,
    availability: Availability,
    latest_query: u64,
    phase: Phase,
}

impl BookingForm {
    /// Fresh form for `vertical`. `today` anchors the selectable date range.
    pub fn new(vertical: Vertical, today: NaiveDate) -> Self {
        Self {
            vertical,
            schema: vertical.schema(),
            profile: vertical.pricing_profile(),
            add_ons: vertical.add_on_catalog(),
            slots: vertical.slot_catalog(),
            window: DateWindow::starting(today, vertical.horizon_days()),
            draft: BookingDraft::default(),
            availability: Availability::NotQueried,
            latest_query: 0,
            phase: Phase::Editing,
        }
    }

    pub fn with_add_ons(mut self, add_ons: AddOnCatalog) -> Self {
        self.add_ons = add_ons;
        self
    }

    pub fn with_slot_catalog(mut self, slots: SlotCatalog) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_pricing(mut self, profile: PricingProfile) -> Self {
        self.profile = profile;
        self
    }

    // ── Read side ──

    pub fn vertical(&self) -> Vertical {
        self.vertical
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn add_ons(&self) -> &AddOnCatalog {
        &self.add_ons
    }

    pub fn date_window(&self) -> &DateWindow {
        &self.window
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    pub fn state(&self) -> DraftState {
        match self.phase {
            Phase::Submitting => DraftState::Submitting,
            Phase::Submitted => DraftState::Submitted,
            Phase::Failed(_) => DraftState::Failed,
            Phase::Editing if self.draft.is_empty() => DraftState::Empty,
            Phase::Editing if self.check().is_ok() => DraftState::Valid,
            Phase::Editing => DraftState::PartiallyFilled,
        }
    }

    /// True while edits are disabled.
    pub fn is_locked(&self) -> bool {
        matches!(self.phase, Phase::Submitting | Phase::Submitted)
    }

    /// Message of the last rejected submission, until the next edit.
    pub fn failure(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Inline errors for the current draft, empty when it is valid.
    pub fn errors(&self) -> FieldErrors {
        self.check().err().unwrap_or_default()
    }

    pub fn breakdown(&self) -> PriceBreakdown {
        pricing::price(&self.draft, &self.profile, &self.add_ons)
    }

    pub fn total_price(&self) -> Money {
        self.breakdown().total
    }

    pub fn duration_hours(&self) -> Option<i64> {
        self.draft.duration_hours()
    }

    pub fn bookable_dates(&self) -> Vec<NaiveDate> {
        self.window.dates().collect()
    }

    pub fn start_options(&self) -> Vec<TimeSlot> {
        slots::start_options(&self.slots, self.draft.date, &self.availability)
    }

    /// End times on offer for the chosen start, empty until a start is picked.
    pub fn end_options(&self) -> Vec<TimeSlot> {
        self.draft
            .start_time
            .as_ref()
            .and_then(|start| self.slots.end_slots_for(start).ok())
            .unwrap_or_default()
    }

    /// Date/time/guests to hand to the next booking step.
    pub fn carry(&self) -> CarriedSelection {
        CarriedSelection {
            date: self.draft.date,
            start_time: self.draft.start_time.clone(),
            end_time: self.draft.end_time.clone(),
            guests: self.draft.quantity,
        }
    }

    // ── Edits ──

    /// Pick or clear the date. Dates outside the window never reach the draft.
    /// A different date drops the chosen times, which belonged to the old one.
    pub fn set_date(&mut self, date: Option<NaiveDate>) -> Result<Option<SlotQuery>, DraftError> {
        self.ensure_editable()?;
        if let Some(d) = date {
            if !self.window.contains(d) {
                return Err(DraftError::DateOutOfRange {
                    date: d,
                    first: self.window.first(),
                    last: self.window.last(),
                });
            }
        }

        let draft = self.editable()?;
        if draft.date != date {
            draft.start_time = None;
            draft.end_time = None;
        }
        draft.date = date;
        Ok(self.query_availability())
    }

    pub fn set_resource(
        &mut self,
        resource: Option<ResourceRef>,
    ) -> Result<Option<SlotQuery>, DraftError> {
        let draft = self.editable()?;
        if draft.resource != resource {
            draft.start_time = None;
            draft.end_time = None;
        }
        draft.resource = resource;
        Ok(self.query_availability())
    }

    pub fn set_unit_price(&mut self, price: Option<Money>) -> Result<(), DraftError> {
        self.editable()?.unit_price = price;
        Ok(())
    }

    /// Pick the start time. An end time that is no longer on offer is cleared.
    pub fn set_start_time(&mut self, start: Option<TimeSlot>) -> Result<(), DraftError> {
        self.ensure_editable()?;
        let end_options = match &start {
            Some(slot) => Some(self.slots.end_slots_for(slot)?),
            None => None,
        };

        let draft = self.editable()?;
        if let (Some(options), Some(end)) = (&end_options, &draft.end_time) {
            let end_time = end.time().ok();
            if !options.iter().any(|o| o.time().ok() == end_time) {
                draft.end_time = None;
            }
        }
        draft.start_time = start;
        Ok(())
    }

    pub fn set_end_time(&mut self, end: Option<TimeSlot>) -> Result<(), DraftError> {
        self.ensure_editable()?;
        if let Some(slot) = &end {
            slot.time()?;
        }
        self.editable()?.end_time = end;
        Ok(())
    }

    /// Pick a whole live interval (clinic appointments).
    pub fn select_interval(&mut self, start: TimeSlot, end: TimeSlot) -> Result<(), DraftError> {
        self.set_start_time(Some(start))?;
        self.set_end_time(Some(end))
    }

    pub fn set_quantity(&mut self, quantity: Option<u32>) -> Result<(), DraftError> {
        self.editable()?.quantity = quantity;
        Ok(())
    }

    /// Returns false if the add-on was already selected.
    pub fn add_add_on(&mut self, id: &str) -> Result<bool, DraftError> {
        Ok(self.editable()?.add_on_ids.insert(id.to_string()))
    }

    pub fn remove_add_on(&mut self, id: &str) -> Result<bool, DraftError> {
        Ok(self.editable()?.add_on_ids.remove(id))
    }

    /// Flip an add-on, returning whether it is now selected.
    pub fn toggle_add_on(&mut self, id: &str) -> Result<bool, DraftError> {
        let draft = self.editable()?;
        if draft.add_on_ids.remove(id) {
            Ok(false)
        } else {
            draft.add_on_ids.insert(id.to_string());
            Ok(true)
        }
    }

    pub fn set_flag(&mut self, flag: BookingFlag, on: bool) -> Result<(), DraftError> {
        let draft = self.editable()?;
        if on {
            draft.flags.insert(flag);
        } else {
            draft.flags.remove(&flag);
        }
        Ok(())
    }

    pub fn set_location(&mut self, location: Option<ServiceLocation>) -> Result<(), DraftError> {
        self.editable()?.location = location;
        Ok(())
    }

    /// Apply the discount package. Not a user edit, so a failed
    /// submission keeps its message.
    pub fn set_discount(&mut self, discount: DiscountRate) -> Result<(), DraftError> {
        self.ensure_editable()?;
        self.draft.discount = discount;
        Ok(())
    }

    /// Fill date, times and guests carried over from a previous step.
    pub fn prefill(&mut self, carried: &CarriedSelection) -> Result<Option<SlotQuery>, DraftError> {
        let query = self.set_date(carried.date)?;
        if carried.start_time.is_some() {
            self.set_start_time(carried.start_time.clone())?;
        }
        if carried.end_time.is_some() {
            self.set_end_time(carried.end_time.clone())?;
        }
        if carried.guests.is_some() {
            self.set_quantity(carried.guests)?;
        }
        Ok(query)
    }

    /// Drop everything the user entered. A submitted form stays locked.
    pub fn reset(&mut self) -> Result<(), DraftError> {
        self.ensure_editable()?;
        let discount = self.draft.discount;
        self.draft = BookingDraft {
            discount,
            ..Default::default()
        };
        self.phase = Phase::Editing;
        self.query_availability();
        Ok(())
    }

    // ── Availability ──

    /// Start a new live-slots request for the current date and resource.
    ///
    /// Every call invalidates earlier tokens, so answers to superseded
    /// requests are rejected as stale. Returns `None` (and falls back to the
    /// catalog) when there is nothing to query.
    pub fn query_availability(&mut self) -> Option<SlotQuery> {
        self.latest_query += 1;
        match (self.draft.date, &self.draft.resource) {
            (Some(date), Some(resource)) => {
                self.availability = Availability::Pending;
                Some(SlotQuery {
                    token: self.latest_query,
                    resource: resource.clone(),
                    date,
                })
            }
            _ => {
                self.availability = Availability::NotQueried;
                None
            }
        }
    }

    pub fn apply_availability(&mut self, token: u64, window: AvailabilityWindow) -> SlotUpdate {
        if token != self.latest_query || self.draft.date != Some(window.date) {
            tracing::debug!(
                "discarding stale slots for {} (token {}, latest {})",
                window.date,
                token,
                self.latest_query
            );
            return SlotUpdate::Stale;
        }
        self.availability = Availability::Loaded(window);
        SlotUpdate::Applied
    }

    pub fn availability_failed(&mut self, token: u64) -> SlotUpdate {
        if token != self.latest_query {
            return SlotUpdate::Stale;
        }
        self.availability = Availability::Failed;
        SlotUpdate::Applied
    }

    // ── Submission ──

    /// Validate, lock the form and produce the API payload.
    pub fn begin_submit(&mut self) -> Result<BookingPayload, DraftError> {
        match self.phase {
            Phase::Submitting => return Err(DraftError::Submitting),
            Phase::Submitted => return Err(DraftError::Submitted),
            Phase::Editing | Phase::Failed(_) => {}
        }
        self.check().map_err(DraftError::Invalid)?;
        let payload = self.payload()?;
        self.phase = Phase::Submitting;
        tracing::info!(
            "submitting {} booking for {} at {}, total {}",
            self.vertical,
            payload.date,
            payload.start_time,
            payload.total_price
        );
        Ok(payload)
    }

    /// Settle the in-flight submission. A rejection keeps every field.
    pub fn finish_submit(&mut self, outcome: SubmitOutcome) -> Result<Notice, DraftError> {
        if self.phase != Phase::Submitting {
            return Err(DraftError::NotSubmitting);
        }
        match outcome {
            SubmitOutcome::Accepted(message) => {
                tracing::info!("{} booking accepted: {}", self.vertical, message);
                self.phase = Phase::Submitted;
                self.draft = BookingDraft::default();
                self.availability = Availability::NotQueried;
                Ok(Notice::Success(message))
            }
            SubmitOutcome::Rejected(message) => {
                tracing::warn!("{} booking rejected: {}", self.vertical, message);
                self.phase = Phase::Failed(message.clone());
                Ok(Notice::Error(message))
            }
        }
    }

    // ── Internals ──

    fn ensure_editable(&self) -> Result<(), DraftError> {
        match self.phase {
            Phase::Submitting => Err(DraftError::Submitting),
            Phase::Submitted => Err(DraftError::Submitted),
            Phase::Editing | Phase::Failed(_) => Ok(()),
        }
    }

    fn editable(&mut self) -> Result<&mut BookingDraft, DraftError> {
        self.ensure_editable()?;
        if matches!(self.phase, Phase::Failed(_)) {
            self.phase = Phase::Editing;
        }
        Ok(&mut self.draft)
    }

    fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = match validation::validate(&self.draft, &self.schema, &self.window) {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors,
        };
        if self.conflicts_with_availability() {
            errors.insert(Field::StartTime, "Selected time is no longer available");
        }
        errors.into_result()
    }

    fn conflicts_with_availability(&self) -> bool {
        let window = match &self.availability {
            Availability::Loaded(window) => window,
            _ => return false,
        };
        if self.draft.date != Some(window.date) {
            return false;
        }
        let times = self
            .draft
            .start_time
            .as_ref()
            .zip(self.draft.end_time.as_ref())
            .and_then(|(s, e)| s.time().ok().zip(e.time().ok()));
        match times {
            Some((start, end)) if end > start => !window.covers(start, end),
            _ => false,
        }
    }

    fn payload(&self) -> Result<BookingPayload, DraftError> {
        let missing = |field: Field, message: &str| {
            let mut errors = FieldErrors::new();
            errors.insert(field, message);
            DraftError::Invalid(errors)
        };
        let date = self
            .draft
            .date
            .ok_or_else(|| missing(Field::Date, "Please select a date"))?;
        let start = self
            .draft
            .start_time
            .clone()
            .ok_or_else(|| missing(Field::StartTime, "Please select a start time"))?;
        let end = self
            .draft
            .end_time
            .clone()
            .ok_or_else(|| missing(Field::EndTime, "Please select an end time"))?;
        let quantity = self
            .draft
            .quantity
            .ok_or_else(|| missing(Field::Quantity, "Please enter a quantity"))?;
        let duration = duration::hours_between(date, &start, &end)?;
        if duration <= 0 {
            return Err(missing(Field::EndTime, "Booking must last at least one hour"));
        }

        Ok(BookingPayload {
            vertical: self.vertical,
            date,
            start_time: start,
            end_time: end,
            duration,
            quantity,
            total_price: self.total_price(),
            resource_id: self.draft.resource.as_ref().map(|r| r.id.clone()),
            resource_kind: self.draft.resource.as_ref().map(|r| r.kind),
            add_on_ids: self.draft.add_on_ids.iter().cloned().collect(),
            location: self.draft.location,
            flags: self.draft.flags.iter().copied().collect(),
            discount_percent: self.draft.discount.percent(),
        })
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;
    use crate::slots::AvailableInterval;
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn slot(label: &str) -> TimeSlot {
        TimeSlot::new(label)
    }

    fn room() -> ResourceRef {
        ResourceRef::new(ResourceKind::Room, "room-7")
    }

    fn interval(date: NaiveDate, start_hour: u32, open: bool) -> AvailableInterval {
        let start = date.and_time(NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap());
        let end = date.and_time(NaiveTime::from_hms_opt(start_hour + 1, 0, 0).unwrap());
        AvailableInterval::new(start, end, open)
    }

    /// Cafe form with a room, 2 guests, 10 AM to 1 PM on March 2nd.
    fn filled_cafe_form() -> BookingForm {
        let mut form = BookingForm::new(Vertical::Cafe, today());
        form.set_date(Some(day(2))).unwrap();
        form.set_resource(Some(room())).unwrap();
        form.set_unit_price(Some(Money::from_units(100))).unwrap();
        form.set_quantity(Some(2)).unwrap();
        form.set_start_time(Some(slot("10:00 AM"))).unwrap();
        form.set_end_time(Some(slot("01:00 PM"))).unwrap();
        form
    }

    // ── State ──

    #[test]
    fn test_new_form_is_empty() {
        let form = BookingForm::new(Vertical::Grooming, today());
        assert_eq!(form.state(), DraftState::Empty);
        assert_eq!(form.total_price(), Money::ZERO);
    }

    #[test]
    fn test_any_field_makes_partial() {
        let mut form = BookingForm::new(Vertical::Grooming, today());
        form.set_quantity(Some(1)).unwrap();
        assert_eq!(form.state(), DraftState::PartiallyFilled);
        assert!(form.errors().contains(Field::Date));
    }

    #[test]
    fn test_filled_form_is_valid() {
        let form = filled_cafe_form();
        assert_eq!(form.state(), DraftState::Valid, "{}", form.errors());
        assert_eq!(form.duration_hours(), Some(3));
        assert_eq!(form.total_price(), Money::from_units(600));
    }

    // ── Dates ──

    #[test]
    fn test_date_outside_window_never_reaches_draft() {
        let mut form = BookingForm::new(Vertical::Cafe, today());
        let err = form.set_date(Some(day(20))).unwrap_err();
        assert!(matches!(err, DraftError::DateOutOfRange { .. }));
        assert_eq!(form.draft().date, None);

        let past = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert!(form.set_date(Some(past)).is_err());
        assert_eq!(form.state(), DraftState::Empty);
    }

    #[test]
    fn test_bookable_dates_follow_horizon() {
        let form = BookingForm::new(Vertical::Cafe, today());
        let dates = form.bookable_dates();
        assert_eq!(dates.len(), 15);
        assert_eq!(dates[0], today());
        assert_eq!(dates[14], day(15));
    }

    #[test]
    fn test_changing_date_clears_times() {
        let mut form = filled_cafe_form();
        form.set_date(Some(day(3))).unwrap();
        assert_eq!(form.draft().start_time, None);
        assert_eq!(form.draft().end_time, None);
        assert_eq!(form.draft().quantity, Some(2));
    }

    #[test]
    fn test_cleared_date_falls_back_to_catalog() {
        let mut form = filled_cafe_form();
        let query = form.set_date(None).unwrap();
        assert!(query.is_none());
        assert_eq!(form.availability(), &Availability::NotQueried);
        assert_eq!(form.start_options(), Vertical::Cafe.slot_catalog().start_slots());
    }

    // ── Times ──

    #[test]
    fn test_end_options_slice_from_start_index() {
        let mut form = BookingForm::new(Vertical::Sitting, today());
        form.set_start_time(Some(slot("10:00 AM"))).unwrap();
        let all = SlotCatalog::default().end_slots();
        assert_eq!(form.end_options(), all[2..].to_vec());
    }

    #[test]
    fn test_end_options_empty_without_start() {
        let form = BookingForm::new(Vertical::Sitting, today());
        assert!(form.end_options().is_empty());
    }

    #[test]
    fn test_later_start_drops_stale_end() {
        let mut form = filled_cafe_form();
        form.set_start_time(Some(slot("02:00 PM"))).unwrap();
        assert_eq!(form.draft().end_time, None);
    }

    #[test]
    fn test_earlier_start_keeps_end() {
        let mut form = filled_cafe_form();
        form.set_start_time(Some(slot("11:00 AM"))).unwrap();
        assert_eq!(form.draft().end_time, Some(slot("01:00 PM")));
        assert_eq!(form.duration_hours(), Some(2));
    }

    #[test]
    fn test_invalid_start_label_rejected() {
        let mut form = BookingForm::new(Vertical::Cafe, today());
        assert!(matches!(
            form.set_start_time(Some(slot("25:99"))),
            Err(DraftError::Time(_))
        ));
        assert_eq!(form.draft().start_time, None);
    }

    #[test]
    fn test_end_before_start_blocks_submit() {
        let mut form = filled_cafe_form();
        form.set_end_time(Some(slot("09:00 AM"))).unwrap();
        assert_eq!(form.state(), DraftState::PartiallyFilled);
        assert_eq!(form.total_price(), Money::ZERO);
        match form.begin_submit() {
            Err(DraftError::Invalid(errors)) => assert!(errors.contains(Field::EndTime)),
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    // ── Add-ons ──

    #[test]
    fn test_duplicate_add_on_not_double_charged() {
        let mut form = BookingForm::new(Vertical::Grooming, today());
        form.set_unit_price(Some(Money::from_units(50))).unwrap();
        assert!(form.add_add_on("nailTrim").unwrap());
        assert!(!form.add_add_on("nailTrim").unwrap());
        assert_eq!(form.breakdown().add_ons_total, Money::from_units(10));
        assert_eq!(form.total_price(), Money::from_units(60));
    }

    #[test]
    fn test_toggle_add_on() {
        let mut form = BookingForm::new(Vertical::Grooming, today());
        assert!(form.toggle_add_on("earCleaning").unwrap());
        assert!(!form.toggle_add_on("earCleaning").unwrap());
        assert!(form.draft().add_on_ids.is_empty());
    }

    #[test]
    fn test_sitting_overnight_total() {
        let mut form = BookingForm::new(Vertical::Sitting, today());
        form.set_date(Some(day(2))).unwrap();
        form.set_unit_price(Some(Money::from_units(25))).unwrap();
        form.set_start_time(Some(slot("08:00 AM"))).unwrap();
        form.set_end_time(Some(slot("12:00 PM"))).unwrap();
        form.set_flag(BookingFlag::Overnight, true).unwrap();
        form.set_location(Some(ServiceLocation::Facility)).unwrap();
        assert_eq!(form.total_price(), Money::from_units(150));

        form.set_location(Some(ServiceLocation::OwnersHome)).unwrap();
        assert_eq!(form.total_price(), Money::from_units(160));

        form.set_flag(BookingFlag::Overnight, false).unwrap();
        assert_eq!(form.total_price(), Money::from_units(110));
    }

    #[test]
    fn test_discount_recomputes_total() {
        let mut form = filled_cafe_form();
        form.set_discount(DiscountRate::from_percent(10.0).unwrap())
            .unwrap();
        let breakdown = form.breakdown();
        assert_eq!(breakdown.discount_amount, Money::from_units(60));
        assert_eq!(breakdown.total, Money::from_units(540));
    }

    // ── Availability ──

    #[test]
    fn test_date_and_resource_issue_query() {
        let mut form = BookingForm::new(Vertical::Cafe, today());
        assert!(form.set_date(Some(day(2))).unwrap().is_none());
        let query = form.set_resource(Some(room())).unwrap().unwrap();
        assert_eq!(query.date, day(2));
        assert_eq!(query.resource, room());
        assert_eq!(form.availability(), &Availability::Pending);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut form = BookingForm::new(Vertical::Cafe, today());
        form.set_resource(Some(room())).unwrap();
        let first = form.set_date(Some(day(2))).unwrap().unwrap();
        let second = form.set_date(Some(day(3))).unwrap().unwrap();

        // Answer to the newer request lands first
        let fresh = AvailabilityWindow::new(day(3), vec![interval(day(3), 12, true)]);
        assert_eq!(form.apply_availability(second.token, fresh), SlotUpdate::Applied);

        let old = AvailabilityWindow::new(day(2), vec![interval(day(2), 9, true)]);
        assert_eq!(form.apply_availability(first.token, old), SlotUpdate::Stale);
        assert_eq!(form.availability_failed(first.token), SlotUpdate::Stale);

        let labels: Vec<String> = form
            .start_options()
            .iter()
            .map(|s| s.label().to_string())
            .collect();
        assert_eq!(labels, vec!["12:00 PM"]);
    }

    #[test]
    fn test_failed_query_then_retry() {
        let mut form = BookingForm::new(Vertical::Cafe, today());
        form.set_resource(Some(room())).unwrap();
        let query = form.set_date(Some(day(2))).unwrap().unwrap();
        assert_eq!(form.availability_failed(query.token), SlotUpdate::Applied);
        assert!(form.start_options().is_empty());

        // Reselecting the same date retries
        let retry = form.set_date(Some(day(2))).unwrap().unwrap();
        assert!(retry.token > query.token);
        let window = AvailabilityWindow::new(day(2), vec![interval(day(2), 10, true)]);
        assert_eq!(form.apply_availability(retry.token, window), SlotUpdate::Applied);
        assert_eq!(form.start_options().len(), 1);
    }

    #[test]
    fn test_empty_window_distinct_from_not_queried() {
        let mut form = BookingForm::new(Vertical::Cafe, today());
        form.set_resource(Some(room())).unwrap();
        let query = form.set_date(Some(day(2))).unwrap().unwrap();
        form.apply_availability(query.token, AvailabilityWindow::new(day(2), vec![]));
        assert!(form.start_options().is_empty());
        assert!(matches!(form.availability(), Availability::Loaded(w) if !w.has_open_slots()));
    }

    #[test]
    fn test_booked_interval_inside_range_invalidates() {
        let mut form = filled_cafe_form();
        let query = form.query_availability().unwrap();
        let window = AvailabilityWindow::new(
            day(2),
            vec![
                interval(day(2), 10, true),
                interval(day(2), 11, false),
                interval(day(2), 12, true),
            ],
        );
        form.apply_availability(query.token, window);
        assert_eq!(
            form.errors().get(Field::StartTime),
            Some("Selected time is no longer available")
        );

        form.set_end_time(Some(slot("11:00 AM"))).unwrap();
        assert_eq!(form.state(), DraftState::Valid);
    }

    // ── Submission ──

    #[test]
    fn test_submit_locks_edits() {
        let mut form = filled_cafe_form();
        let payload = form.begin_submit().unwrap();
        assert_eq!(payload.total_price, Money::from_units(600));
        assert_eq!(form.state(), DraftState::Submitting);
        assert!(form.is_locked());

        assert_eq!(form.set_quantity(Some(3)), Err(DraftError::Submitting));
        assert_eq!(form.add_add_on("snackPlatter"), Err(DraftError::Submitting));
        assert_eq!(form.set_date(Some(day(4))), Err(DraftError::Submitting));
        assert_eq!(form.reset(), Err(DraftError::Submitting));
        assert_eq!(form.begin_submit(), Err(DraftError::Submitting));
        assert_eq!(form.draft().quantity, Some(2));
    }

    #[test]
    fn test_rejected_submission_preserves_draft() {
        let mut form = filled_cafe_form();
        let before = form.draft().clone();
        form.begin_submit().unwrap();

        let notice = form
            .finish_submit(SubmitOutcome::Rejected("Room already booked".into()))
            .unwrap();
        assert_eq!(notice, Notice::Error("Room already booked".into()));
        assert_eq!(form.state(), DraftState::Failed);
        assert_eq!(form.failure(), Some("Room already booked"));
        assert_eq!(form.draft(), &before);

        // Edits are allowed again and clear the failure
        form.set_quantity(Some(3)).unwrap();
        assert_eq!(form.failure(), None);
        assert_eq!(form.state(), DraftState::Valid);
    }

    #[test]
    fn test_retry_after_failure() {
        let mut form = filled_cafe_form();
        form.begin_submit().unwrap();
        form.finish_submit(SubmitOutcome::Rejected("timeout".into()))
            .unwrap();
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn test_accepted_submission_discards_draft() {
        let mut form = filled_cafe_form();
        form.begin_submit().unwrap();
        let notice = form
            .finish_submit(SubmitOutcome::Accepted("Booked!".into()))
            .unwrap();
        assert!(!notice.is_error());
        assert_eq!(form.state(), DraftState::Submitted);
        assert!(form.draft().is_empty());
        assert_eq!(form.set_quantity(Some(1)), Err(DraftError::Submitted));
        assert_eq!(form.begin_submit(), Err(DraftError::Submitted));
    }

    #[test]
    fn test_finish_without_begin() {
        let mut form = filled_cafe_form();
        assert_eq!(
            form.finish_submit(SubmitOutcome::Accepted("ok".into())),
            Err(DraftError::NotSubmitting)
        );
    }

    #[test]
    fn test_payload_shape() {
        let mut form = filled_cafe_form();
        form.add_add_on("petTreats").unwrap();
        let payload = form.begin_submit().unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "cafe");
        assert_eq!(json["date"], "2026-03-02");
        assert_eq!(json["startTime"], "10:00 AM");
        assert_eq!(json["endTime"], "01:00 PM");
        assert_eq!(json["duration"], 3);
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["totalPrice"], 605.0);
        assert_eq!(json["resourceId"], "room-7");
        assert_eq!(json["resourceKind"], "room");
        assert_eq!(json["addOnIds"], serde_json::json!(["petTreats"]));
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_clinic_payload_has_whole_hours() {
        let mut form = BookingForm::new(Vertical::Clinic, today());
        form.set_date(Some(day(2))).unwrap();
        form.set_resource(Some(ResourceRef::new(ResourceKind::Doctor, "dr-1")))
            .unwrap();
        form.set_unit_price(Some(Money::from_units(40))).unwrap();
        form.set_quantity(Some(1)).unwrap();
        form.set_start_time(Some(slot("09:00 AM"))).unwrap();
        let first_end = form.end_options()[0].clone();
        form.set_end_time(Some(first_end)).unwrap();

        assert_eq!(form.state(), DraftState::Valid, "{}", form.errors());
        let payload = form.begin_submit().unwrap();
        assert_eq!(payload.duration, 1);
        assert_eq!(payload.end_time, slot("10:00 AM"));
    }

    #[test]
    fn test_half_hour_clinic_visit_blocked() {
        let mut form = BookingForm::new(Vertical::Clinic, today());
        form.set_date(Some(day(2))).unwrap();
        form.set_resource(Some(ResourceRef::new(ResourceKind::Doctor, "dr-1")))
            .unwrap();
        form.set_unit_price(Some(Money::from_units(40))).unwrap();
        form.set_quantity(Some(1)).unwrap();
        form.select_interval(slot("09:00 AM"), slot("09:30 AM")).unwrap();

        match form.begin_submit() {
            Err(DraftError::Invalid(errors)) => assert_eq!(
                errors.get(Field::EndTime),
                Some("Booking must last at least one hour")
            ),
            other => panic!("expected invalid, got {:?}", other),
        }
        assert_eq!(form.state(), DraftState::PartiallyFilled);
    }

    #[test]
    fn test_huge_price_never_panics_or_goes_negative() {
        let mut form = BookingForm::new(Vertical::Sitting, today());
        form.set_date(Some(day(2))).unwrap();
        form.set_unit_price(Some(Money::from_units_f64(1e17).unwrap()))
            .unwrap();
        form.set_start_time(Some(slot("08:00 AM"))).unwrap();
        form.set_end_time(Some(slot("10:00 AM"))).unwrap();
        form.set_flag(BookingFlag::Overnight, true).unwrap();

        let total = form.total_price();
        assert!(total > Money::ZERO);
        assert!(form.errors().contains(Field::UnitPrice));
    }

    #[test]
    fn test_submitted_form_cannot_be_reset() {
        let mut form = filled_cafe_form();
        form.begin_submit().unwrap();
        form.finish_submit(SubmitOutcome::Accepted("Booked!".into()))
            .unwrap();
        assert_eq!(form.reset(), Err(DraftError::Submitted));
        assert_eq!(form.state(), DraftState::Submitted);
        assert!(form.is_locked());
    }

    #[test]
    fn test_discount_keeps_failure_message() {
        let mut form = filled_cafe_form();
        form.begin_submit().unwrap();
        form.finish_submit(SubmitOutcome::Rejected("Room already booked".into()))
            .unwrap();

        form.set_discount(DiscountRate::from_percent(10.0).unwrap())
            .unwrap();
        assert_eq!(form.state(), DraftState::Failed);
        assert_eq!(form.failure(), Some("Room already booked"));
        assert_eq!(form.total_price(), Money::from_units(540));
    }

    // ── Cross-step carry ──

    #[test]
    fn test_carry_and_prefill() {
        let details = filled_cafe_form();
        let carried = details.carry();

        let mut confirm = BookingForm::new(Vertical::Cafe, today());
        confirm.set_resource(Some(room())).unwrap();
        let query = confirm.prefill(&carried).unwrap();
        assert!(query.is_some());
        assert_eq!(confirm.draft().date, Some(day(2)));
        assert_eq!(confirm.draft().start_time, Some(slot("10:00 AM")));
        assert_eq!(confirm.draft().end_time, Some(slot("01:00 PM")));
        assert_eq!(confirm.draft().quantity, Some(2));
    }

    #[test]
    fn test_reset_keeps_discount() {
        let mut form = filled_cafe_form();
        let rate = DiscountRate::from_percent(5.0).unwrap();
        form.set_discount(rate).unwrap();
        form.reset().unwrap();
        assert_eq!(form.state(), DraftState::Empty);
        assert_eq!(form.draft().discount, rate);
    }
}
