//! Appointment REST API client

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::io::{HttpClient, HttpResponse};
use crate::model::{
    Appointment, AppointmentRequest, Doctor, ReservationRequest, Slot, Specialty,
    TemporaryReservation,
};
use crate::BookingError;

/// Operations the booking flow needs from the appointment service
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AppointmentApi: Send + Sync {
    async fn list_specialties(&self) -> crate::Result<Vec<Specialty>>;

    async fn list_doctors(&self, specialty_id: u64) -> crate::Result<Vec<Doctor>>;

    async fn list_available_slots(&self, doctor_id: u64, date: NaiveDate)
        -> crate::Result<Vec<Slot>>;

    /// Place a hold on a slot. Fails with [`BookingError::Conflict`] when the slot is taken.
    async fn create_temporary_reservation(
        &self,
        request: &ReservationRequest,
    ) -> crate::Result<TemporaryReservation>;

    async fn cancel_temporary_reservation(&self, reservation_id: u64) -> crate::Result<()>;

    async fn create_appointment(&self, request: &AppointmentRequest) -> crate::Result<Appointment>;
}

/// [`AppointmentApi`] backed by the hospital REST service
pub struct RestAppointmentApi {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for RestAppointmentApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestAppointmentApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RestAppointmentApi {
    pub fn new(config: &ApiConfig, http: Arc<dyn HttpClient>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created RestAppointmentApi at {}", base_url);
        Self { base_url, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl AppointmentApi for RestAppointmentApi {
    async fn list_specialties(&self) -> crate::Result<Vec<Specialty>> {
        let response = self.http.get(&self.url("specialties")).await?;
        parse_json(response)
    }

    async fn list_doctors(&self, specialty_id: u64) -> crate::Result<Vec<Doctor>> {
        let url = self.url(&format!("doctors?specialty={}", specialty_id));
        let response = self.http.get(&url).await?;
        parse_json(response)
    }

    async fn list_available_slots(
        &self,
        doctor_id: u64,
        date: NaiveDate,
    ) -> crate::Result<Vec<Slot>> {
        let url = self.url(&format!(
            "appointments/available-slots?doctor={}&date={}",
            doctor_id,
            date.format("%Y-%m-%d")
        ));
        let response = self.http.get(&url).await?;
        parse_json(response)
    }

    async fn create_temporary_reservation(
        &self,
        request: &ReservationRequest,
    ) -> crate::Result<TemporaryReservation> {
        let body = serde_json::to_value(request)?;
        let response = self
            .http
            .post_json(&self.url("temporary-reservations"), &body)
            .await?;
        parse_json(response)
    }

    async fn cancel_temporary_reservation(&self, reservation_id: u64) -> crate::Result<()> {
        let url = self.url(&format!("temporary-reservations/{}", reservation_id));
        let response = self.http.delete(&url).await?;
        check_status(&response)
    }

    async fn create_appointment(&self, request: &AppointmentRequest) -> crate::Result<Appointment> {
        let body = serde_json::to_value(request)?;
        let response = self.http.post_json(&self.url("appointments"), &body).await?;
        parse_json(response)
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> crate::Result<T> {
    check_status(&response)?;
    Ok(serde_json::from_str(&response.body)?)
}

/// Map a non-2xx response to an error carrying the server's message
fn check_status(response: &HttpResponse) -> crate::Result<()> {
    if response.is_success() {
        return Ok(());
    }

    let message = server_message(&response.body).unwrap_or_else(|| {
        format!("Request failed with status {}", response.status)
    });
    tracing::debug!("API error {}: {}", response.status, message);

    if response.status == 409 {
        Err(BookingError::Conflict(message))
    } else {
        Err(BookingError::Api {
            status: response.status,
            message,
        })
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}
