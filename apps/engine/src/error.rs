use chrono::NaiveDate;

use crate::validation::FieldErrors;

/// Failures while interpreting time-of-day labels or building a slot catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("'{0}' is not a valid time of day")]
    InvalidLabel(String),
    #[error("slot catalog must open before it closes and use a positive step")]
    InvalidCatalog,
}

/// Failures converting wire numbers into money or discount rates.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum AmountError {
    #[error("amount {0} is not a finite number")]
    NotFinite(f64),
}

/// Everything that can stop an edit or a submission of a booking form.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DraftError {
    #[error("booking is being submitted, edits are disabled")]
    Submitting,
    #[error("booking has already been submitted")]
    Submitted,
    #[error("no submission is in flight")]
    NotSubmitting,
    #[error("date {date} is outside the bookable range {first} to {last}")]
    DateOutOfRange {
        date: NaiveDate,
        first: NaiveDate,
        last: NaiveDate,
    },
    #[error("booking is incomplete: {0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Time(#[from] TimeError),
}
