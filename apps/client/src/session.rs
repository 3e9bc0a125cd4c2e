//! One booking form wired to the booking API.
//!
//! The form lives behind a mutex that is only held between awaits, never
//! across one. Slot answers are matched to the request token that produced
//! them, so a slow answer for an old date cannot overwrite a newer one.

use chrono::NaiveDate;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pawbook_engine::{
    BookingForm, CarriedSelection, DiscountRate, DraftError, DraftState, FieldErrors, Money,
    Notice, PriceBreakdown, ResourceRef, SlotQuery, SlotUpdate, SubmitOutcome, TimeSlot, Vertical,
};

use crate::api::{ApiError, BookingApi, RestClient};
use crate::config::ClientConfig;

const ACCEPTED_FALLBACK: &str = "Booking confirmed";
const REJECTED_FALLBACK: &str = "Booking could not be completed";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct BookingSession {
    api: Arc<dyn BookingApi>,
    form: Mutex<BookingForm>,
    auth_token: Option<String>,
    timeout: Duration,
}

impl BookingSession {
    pub fn new(api: Arc<dyn BookingApi>, form: BookingForm) -> Self {
        Self {
            api,
            form: Mutex::new(form),
            auth_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Session over the REST API described by `config`.
    pub fn connect(
        config: &ClientConfig,
        vertical: Vertical,
        today: NaiveDate,
    ) -> Result<Self, ApiError> {
        let api = Arc::new(RestClient::new(config)?);
        Ok(Self::new(api, BookingForm::new(vertical, today))
            .with_auth_token(config.auth_token.clone())
            .with_timeout(config.request_timeout))
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, BookingForm> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn auth(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(self.timeout)),
        }
    }

    // ── Reads ──

    pub fn read<R>(&self, f: impl FnOnce(&BookingForm) -> R) -> R {
        f(&self.lock())
    }

    pub fn state(&self) -> DraftState {
        self.read(BookingForm::state)
    }

    pub fn start_options(&self) -> Vec<TimeSlot> {
        self.read(BookingForm::start_options)
    }

    pub fn end_options(&self) -> Vec<TimeSlot> {
        self.read(BookingForm::end_options)
    }

    pub fn breakdown(&self) -> PriceBreakdown {
        self.read(BookingForm::breakdown)
    }

    pub fn errors(&self) -> FieldErrors {
        self.read(BookingForm::errors)
    }

    pub fn carry(&self) -> CarriedSelection {
        self.read(BookingForm::carry)
    }

    // ── Edits ──

    /// Apply a synchronous edit (times, quantity, add-ons, flags...).
    pub fn edit<R>(
        &self,
        f: impl FnOnce(&mut BookingForm) -> Result<R, DraftError>,
    ) -> Result<R, DraftError> {
        f(&mut self.lock())
    }

    /// Pick a date and load live slots when a resource is chosen. Returns
    /// `None` when no live query was needed.
    pub async fn choose_date(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Option<SlotUpdate>, SessionError> {
        let query = self.lock().set_date(date)?;
        Ok(self.load_slots(query).await)
    }

    /// Pick the room, doctor or sitter along with its price.
    pub async fn choose_resource(
        &self,
        resource: ResourceRef,
        unit_price: Money,
    ) -> Result<Option<SlotUpdate>, SessionError> {
        let query = {
            let mut form = self.lock();
            form.set_unit_price(Some(unit_price))?;
            form.set_resource(Some(resource))?
        };
        Ok(self.load_slots(query).await)
    }

    /// Fill in the selection carried over from the previous step.
    pub async fn prefill(
        &self,
        carried: &CarriedSelection,
    ) -> Result<Option<SlotUpdate>, SessionError> {
        let query = self.lock().prefill(carried)?;
        Ok(self.load_slots(query).await)
    }

    /// Ask for live slots again, e.g. after a failed fetch.
    pub async fn reload_slots(&self) -> Option<SlotUpdate> {
        let query = self.lock().query_availability();
        self.load_slots(query).await
    }

    async fn load_slots(&self, query: Option<SlotQuery>) -> Option<SlotUpdate> {
        let query = query?;
        let result = self
            .call(self.api.fetch_slots(&query.resource, query.date, self.auth()))
            .await;

        let mut form = self.lock();
        let update = match result {
            Ok(window) => form.apply_availability(query.token, window),
            Err(e) => {
                tracing::error!(
                    "Failed to load slots for {} {} on {}: {}",
                    query.resource.kind.as_str(),
                    query.resource.id,
                    query.date,
                    e
                );
                form.availability_failed(query.token)
            }
        };
        Some(update)
    }

    /// Fetch the vertical's discount package and apply it to the draft.
    pub async fn refresh_discount(&self) -> Result<DiscountRate, SessionError> {
        let vertical = self.read(BookingForm::vertical);
        let rate = match self.call(self.api.fetch_discount(vertical, self.auth())).await {
            Ok(rate) => rate,
            Err(e) => {
                tracing::warn!("Discount package unavailable for {}: {}", vertical, e);
                return Err(e.into());
            }
        };
        self.lock().set_discount(rate)?;
        Ok(rate)
    }

    // ── Submission ──

    /// Submit the draft. Only one submission per session can be in flight.
    ///
    /// Invalid drafts and duplicate submissions are `Err`. Once the request
    /// goes out, every outcome (including transport failures and timeouts)
    /// comes back as a [`Notice`] and a rejected draft keeps its values.
    pub async fn submit(&self) -> Result<Notice, SessionError> {
        let payload = self.lock().begin_submit()?;

        let outcome = match self.call(self.api.submit_booking(&payload, self.auth())).await {
            Ok(response) if !response.error => SubmitOutcome::Accepted(or_fallback(
                response.message,
                ACCEPTED_FALLBACK,
            )),
            Ok(response) => SubmitOutcome::Rejected(or_fallback(response.message, REJECTED_FALLBACK)),
            Err(e) => {
                tracing::error!("Booking submission failed: {}", e);
                SubmitOutcome::Rejected(e.to_string())
            }
        };

        Ok(self.lock().finish_submit(outcome)?)
    }
}

fn or_fallback(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
