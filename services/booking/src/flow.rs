//! Non-interactive booking flow driven from named selections

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::api::AppointmentApi;
use crate::controller::SlotReservationController;
use crate::events::BookingEvent;
use crate::model::{Appointment, Doctor, Slot, Specialty};
use crate::ticker::spawn_ticker;
use crate::BookingError;

/// What to book, using the names shown in the catalogue
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub specialty: String,
    pub doctor: String,
    pub date: NaiveDate,
    pub time: Slot,
    pub reason: Option<String>,
}

/// Find a catalogue entry by name, ignoring case and surrounding whitespace
pub fn find_named<'a, T>(items: &'a [T], name: &str, key: impl Fn(&T) -> &str) -> Option<&'a T> {
    let wanted = name.trim().to_lowercase();
    items
        .iter()
        .find(|item| key(item).trim().to_lowercase() == wanted)
}

pub async fn find_specialty(api: &dyn AppointmentApi, name: &str) -> crate::Result<Specialty> {
    let specialties = api.list_specialties().await?;
    find_named(&specialties, name, |s| s.name.as_str())
        .cloned()
        .ok_or_else(|| BookingError::Selection(format!("unknown specialty '{}'", name)))
}

pub async fn find_doctor(
    api: &dyn AppointmentApi,
    specialty: &Specialty,
    name: &str,
) -> crate::Result<Doctor> {
    let doctors = api.list_doctors(specialty.id).await?;
    find_named(&doctors, name, |d| d.name.as_str())
        .cloned()
        .ok_or_else(|| {
            BookingError::Selection(format!(
                "no doctor '{}' in specialty '{}'",
                name, specialty.name
            ))
        })
}

/// Book one appointment through the controller while a ticker enforces the time budget
///
/// Cancelling `cancel` resets the flow and releases any hold.
pub async fn run_booking(
    controller: Arc<SlotReservationController>,
    request: &BookingRequest,
    tick_interval: Duration,
    cancel: CancellationToken,
) -> crate::Result<Appointment> {
    let mut events = controller.subscribe();
    let ticker_cancel = cancel.child_token();
    let ticker = spawn_ticker(Arc::clone(&controller), tick_interval, ticker_cancel.clone());

    let outcome = {
        let drive = drive(&controller, request, &cancel);
        tokio::pin!(drive);
        tokio::select! {
            result = &mut drive => result,
            _ = cancel.cancelled() => {
                tracing::info!("Booking cancelled, releasing selections");
                controller.reset().await;
                drive.await.map_err(|_| BookingError::Cancelled)
            }
        }
    };

    ticker_cancel.cancel();
    if let Err(e) = ticker.await {
        tracing::warn!("Ticker task failed: {}", e);
    }

    match outcome {
        Err(_) if events.drain().contains(&BookingEvent::Expired) => Err(BookingError::Expired),
        other => other,
    }
}

fn ensure_active(cancel: &CancellationToken) -> crate::Result<()> {
    if cancel.is_cancelled() {
        Err(BookingError::Cancelled)
    } else {
        Ok(())
    }
}

async fn drive(
    controller: &SlotReservationController,
    request: &BookingRequest,
    cancel: &CancellationToken,
) -> crate::Result<Appointment> {
    ensure_active(cancel)?;
    let specialties = controller.load_specialties().await?;
    let specialty = find_named(&specialties, &request.specialty, |s| s.name.as_str())
        .cloned()
        .ok_or_else(|| {
            BookingError::Selection(format!("unknown specialty '{}'", request.specialty))
        })?;
    ensure_active(cancel)?;
    controller.select_specialty(specialty).await?;

    let doctors = controller.load_doctors().await?;
    let doctor = find_named(&doctors, &request.doctor, |d| d.name.as_str())
        .cloned()
        .ok_or_else(|| BookingError::Selection(format!("unknown doctor '{}'", request.doctor)))?;
    ensure_active(cancel)?;
    controller.select_doctor(doctor).await?;

    ensure_active(cancel)?;
    let slots = controller.select_date(request.date).await?;
    if !slots.contains(&request.time) {
        return Err(BookingError::Selection(format!(
            "{} is not available on {}",
            request.time, request.date
        )));
    }

    ensure_active(cancel)?;
    controller.toggle_slot(request.time.clone()).await?;
    ensure_active(cancel)?;
    controller.submit(request.reason.clone()).await
}
