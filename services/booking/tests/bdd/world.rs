//! BDD test world for the booking service

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use cucumber::World;
use tokio::sync::RwLock;

use booking::api::AppointmentApi;
use booking::model::{
    Appointment, AppointmentRequest, Doctor, ReservationRequest, Slot, Specialty,
    TemporaryReservation,
};
use booking::{BookingError, SlotReservationController, Subscription};

/// Calendar day the scenarios run on
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

/// Requests that change server-side state, in the order they were sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateHold(Slot),
    CancelHold(u64),
    CreateAppointment(Slot),
}

/// An in-memory appointment server that records every mutating request
#[derive(Debug)]
pub struct RecordingApi {
    calls: RwLock<Vec<ApiCall>>,
    taken_slots: RwLock<Vec<Slot>>,
    submit_failure: RwLock<Option<(u16, String)>>,
    next_hold_id: RwLock<u64>,
}

impl RecordingApi {
    pub fn new(first_hold_id: u64) -> Self {
        Self {
            calls: RwLock::new(Vec::new()),
            taken_slots: RwLock::new(Vec::new()),
            submit_failure: RwLock::new(None),
            next_hold_id: RwLock::new(first_hold_id),
        }
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.read().await.clone()
    }

    pub async fn mark_taken(&self, slot: Slot) {
        self.taken_slots.write().await.push(slot);
    }

    pub async fn fail_submissions(&self, status: u16, message: &str) {
        *self.submit_failure.write().await = Some((status, message.to_string()));
    }

    async fn record(&self, call: ApiCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl AppointmentApi for RecordingApi {
    async fn list_specialties(&self) -> booking::Result<Vec<Specialty>> {
        Ok(vec![
            Specialty {
                id: 1,
                name: "Odontología".to_string(),
            },
            Specialty {
                id: 2,
                name: "Cardiología".to_string(),
            },
        ])
    }

    async fn list_doctors(&self, specialty_id: u64) -> booking::Result<Vec<Doctor>> {
        let doctors = [
            (3, "Dr. Martinez", 1),
            (4, "Dra. Gómez", 1),
            (5, "Dra. Rojas", 2),
        ];
        Ok(doctors
            .into_iter()
            .filter(|(_, _, specialty)| *specialty == specialty_id)
            .map(|(id, name, specialty)| Doctor {
                id,
                name: name.to_string(),
                specialty_id: Some(specialty),
            })
            .collect())
    }

    async fn list_available_slots(
        &self,
        _doctor_id: u64,
        _date: NaiveDate,
    ) -> booking::Result<Vec<Slot>> {
        ["09:00", "09:30", "10:00", "11:00", "14:00"]
            .into_iter()
            .map(|time| time.parse::<Slot>())
            .collect()
    }

    async fn create_temporary_reservation(
        &self,
        request: &ReservationRequest,
    ) -> booking::Result<TemporaryReservation> {
        self.record(ApiCall::CreateHold(request.time.clone())).await;
        if self.taken_slots.read().await.contains(&request.time) {
            return Err(BookingError::Conflict(format!(
                "El horario {} ya no está disponible",
                request.time
            )));
        }
        let mut next_id = self.next_hold_id.write().await;
        let id = *next_id;
        *next_id += 1;
        Ok(TemporaryReservation {
            id,
            doctor: request.doctor,
            specialty: request.specialty,
            date: request.date,
            time: request.time.clone(),
        })
    }

    async fn cancel_temporary_reservation(&self, reservation_id: u64) -> booking::Result<()> {
        self.record(ApiCall::CancelHold(reservation_id)).await;
        Ok(())
    }

    async fn create_appointment(&self, request: &AppointmentRequest) -> booking::Result<Appointment> {
        self.record(ApiCall::CreateAppointment(request.time.clone()))
            .await;
        if let Some((status, message)) = self.submit_failure.read().await.clone() {
            return Err(if status == 409 {
                BookingError::Conflict(message)
            } else {
                BookingError::Api { status, message }
            });
        }
        Ok(Appointment {
            id: 900,
            doctor: request.doctor,
            date: request.date,
            time: request.time.clone(),
            reason: request.reason.clone(),
            status: Some("scheduled".to_string()),
        })
    }
}

#[derive(Debug, Default, World)]
pub struct BookingWorld {
    pub api: Option<Arc<RecordingApi>>,
    pub controller: Option<Arc<SlotReservationController>>,
    pub events: Option<Subscription>,
    pub notices: Vec<String>,
    pub last_error: Option<BookingError>,
    pub last_appointment: Option<Appointment>,
}

impl BookingWorld {
    pub fn controller(&self) -> Arc<SlotReservationController> {
        Arc::clone(self.controller.as_ref().expect("controller not set"))
    }

    pub fn api(&self) -> Arc<RecordingApi> {
        Arc::clone(self.api.as_ref().expect("api not set"))
    }

    /// Move every notice published since the last call into `notices`
    pub fn collect_notices(&mut self) {
        let events = self.events.as_mut().expect("not subscribed").drain();
        self.notices
            .extend(events.iter().filter_map(|e| e.notice()).map(|n| n.message));
    }
}
