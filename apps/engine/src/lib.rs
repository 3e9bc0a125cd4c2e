//! Booking computation for the pet-services forms: slot catalogs, live
//! availability filtering, durations, prices and the draft lifecycle.
//!
//! Nothing here does I/O. The `pawbook-client` crate drives a [`BookingForm`]
//! against the booking API.

pub mod draft;
pub mod duration;
pub mod error;
pub mod models;
pub mod pricing;
pub mod slots;
pub mod validation;
pub mod verticals;

pub use draft::{BookingForm, DraftState, SlotQuery, SlotUpdate, SubmitOutcome};
pub use error::{AmountError, DraftError, TimeError};
pub use models::{
    AddOn, AddOnCatalog, BookingDraft, BookingFlag, BookingPayload, CarriedSelection,
    DiscountRate, Money, Notice, ResourceKind, ResourceRef, ServiceLocation, TimeSlot,
};
pub use pricing::{price, FeeCondition, FeeRule, PriceBreakdown, PricingProfile, QuantityDimension};
pub use slots::{Availability, AvailabilityWindow, AvailableInterval, SlotCatalog};
pub use validation::{DateWindow, Field, FieldErrors, Schema};
pub use verticals::Vertical;
