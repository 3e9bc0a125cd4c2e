//! Async side of the booking forms: REST client, configuration, logging
//! setup and [`BookingSession`], which drives a form against the API.

pub mod api;
pub mod config;
pub mod session;
pub mod telemetry;

pub use api::{ApiError, BookingApi, RestClient, SubmitResponse};
pub use config::ClientConfig;
pub use session::{BookingSession, SessionError};
