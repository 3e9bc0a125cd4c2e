//! Typed access to the booking REST API.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

use pawbook_engine::{
    AvailabilityWindow, AvailableInterval, BookingPayload, DiscountRate, ResourceRef, Vertical,
};

use crate::config::ClientConfig;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("booking API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("could not encode request: {0}")]
    Encode(String),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

// ── Wire types ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    /// `true` when the interval can still be booked.
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub slots: Vec<SlotDto>,
}

impl SlotsResponse {
    /// Live intervals for `date` in the order the API sent them. Times stay
    /// in the offset the API reported, which is the venue's local time.
    pub fn into_window(self, date: NaiveDate) -> AvailabilityWindow {
        let intervals = self
            .slots
            .into_iter()
            .map(|s| AvailableInterval::new(s.start_time.naive_local(), s.end_time.naive_local(), s.status))
            .collect();
        AvailabilityWindow::new(date, intervals)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPackage {
    pub discount_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountResponse {
    pub package: Option<DiscountPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
}

// ── Client trait ──

/// The three calls a booking form makes. `auth` is the bearer token of
/// whoever is booking, passed through untouched.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn fetch_slots(
        &self,
        resource: &ResourceRef,
        date: NaiveDate,
        auth: Option<&str>,
    ) -> Result<AvailabilityWindow, ApiError>;

    /// Discount for the vertical, [`DiscountRate::NONE`] when there is no package.
    async fn fetch_discount(
        &self,
        vertical: Vertical,
        auth: Option<&str>,
    ) -> Result<DiscountRate, ApiError>;

    async fn submit_booking(
        &self,
        payload: &BookingPayload,
        auth: Option<&str>,
    ) -> Result<SubmitResponse, ApiError>;
}

/// Hex SHA-256 of the serialized payload. Identical retries share a key.
pub fn idempotency_key(payload: &BookingPayload) -> Result<String, ApiError> {
    let body = serde_json::to_vec(payload).map_err(|e| ApiError::Encode(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&body)))
}

// ── reqwest implementation ──

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base: config.api_base_url.clone(),
            timeout: config.request_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    fn authorize(request: RequestBuilder, auth: Option<&str>) -> RequestBuilder {
        match auth {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn transport(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Http(err)
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), ApiError> {
        let resp = request.send().await.map_err(|e| self.transport(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport(e))?;
        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            tracing::error!("Booking API error: {} - {}", status, body);
            return Err(ApiError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BookingApi for RestClient {
    async fn fetch_slots(
        &self,
        resource: &ResourceRef,
        date: NaiveDate,
        auth: Option<&str>,
    ) -> Result<AvailabilityWindow, ApiError> {
        let mut url = self.endpoint("slots")?;
        url.query_pairs_mut()
            .append_pair("resourceId", &resource.id)
            .append_pair("resourceKind", resource.kind.as_str())
            .append_pair("date", &date.format("%Y-%m-%d").to_string());

        let request = Self::authorize(self.http.get(url), auth);
        let response: SlotsResponse = self.get_json(request).await?;
        tracing::debug!(
            "{} slots for {} {} on {}",
            response.slots.len(),
            resource.kind.as_str(),
            resource.id,
            date
        );
        Ok(response.into_window(date))
    }

    async fn fetch_discount(
        &self,
        vertical: Vertical,
        auth: Option<&str>,
    ) -> Result<DiscountRate, ApiError> {
        let mut url = self.endpoint("discount-package")?;
        url.query_pairs_mut().append_pair("type", vertical.as_str());

        let request = Self::authorize(self.http.get(url), auth);
        // The endpoint answers `null` when no package applies.
        let response: Option<DiscountResponse> = self.get_json(request).await?;
        match response.and_then(|r| r.package) {
            Some(package) => DiscountRate::from_percent(package.discount_percent)
                .map_err(|e| ApiError::Decode(e.to_string())),
            None => Ok(DiscountRate::NONE),
        }
    }

    async fn submit_booking(
        &self,
        payload: &BookingPayload,
        auth: Option<&str>,
    ) -> Result<SubmitResponse, ApiError> {
        let url = self.endpoint("bookings")?;
        let key = idempotency_key(payload)?;
        let request = Self::authorize(self.http.post(url), auth)
            .header("Idempotency-Key", &key)
            .json(payload);

        let (status, body) = self.send(request).await?;
        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()));
        }

        // Rejections usually still carry `{ error, message }`.
        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(mut response) if !response.message.is_empty() => {
                response.error = true;
                Ok(response)
            }
            _ => {
                tracing::error!("Booking submission failed: {} - {}", status, body);
                Err(ApiError::Status { status, body })
            }
        }
    }
}
