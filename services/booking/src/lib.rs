//! Booking - appointment booking client for the hospital REST API
//!
//! Walks a patient through specialty, doctor, date and time selection, holding
//! the chosen slot on the server while the booking is confirmed within a fixed
//! time budget.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod flow;
pub mod io;
pub mod model;
pub mod ticker;
pub mod timer;

pub use config::{load_config, Config};
pub use controller::{BookingSnapshot, BookingStep, SlotReservationController, SlotToggle};
pub use error::{BookingError, Result};
pub use events::{BookingEvent, EventHub, Subscription};

use std::sync::Arc;

use crate::api::{AppointmentApi, RestAppointmentApi};
use crate::config::{ApiConfig, BookingConfig};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::timer::SystemClock;

/// Build the REST-backed appointment API from configuration
pub fn build_api(config: &ApiConfig) -> Result<Arc<dyn AppointmentApi>> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(
        config.request_timeout(),
        config.auth_token.clone(),
    )?);
    Ok(Arc::new(RestAppointmentApi::new(config, http)))
}

/// Build a controller for one booking flow using the system clock
pub fn build_controller(
    api: Arc<dyn AppointmentApi>,
    config: &BookingConfig,
) -> SlotReservationController {
    SlotReservationController::new(
        api,
        Arc::new(SystemClock),
        EventHub::new(config.event_capacity),
        config.process_budget_seconds,
    )
}
