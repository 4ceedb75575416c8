//! Slot reservation controller: drives one appointment booking flow
//!
//! The flow walks specialty → doctor → date → time slot. Picking a slot places a
//! temporary hold on the server; the whole process is bounded by a countdown
//! started on the first specialty selection. User actions are serialized by an
//! operation lock, while `tick` and `reset` act immediately. Every reset or
//! change of the slot context bumps an epoch so responses that arrive late are
//! discarded instead of resurrecting a cleared session.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::AppointmentApi;
use crate::events::{BookingEvent, EventHub, Subscription};
use crate::model::{
    Appointment, BookingSession, Doctor, ReservationRequest, Slot, Specialty, TemporaryReservation,
};
use crate::timer::{Clock, ProcessTimer, TickOutcome};
use crate::BookingError;

/// Default time budget for one booking process
pub const DEFAULT_BUDGET_SECONDS: u32 = 300;

/// Where the user is in the booking flow
/// Variants are ordered by how far the flow has progressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    #[default]
    SelectSpecialty,
    SelectDoctor,
    SelectDateTime,
    ReadyToConfirm,
    Finalizing,
}

/// Outcome of [`SlotReservationController::toggle_slot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotToggle {
    Held(TemporaryReservation),
    Released,
}

/// Read-only view of a booking flow
#[derive(Debug, Clone, Serialize)]
pub struct BookingSnapshot {
    pub step: BookingStep,
    pub session: BookingSession,
    pub reservation: Option<TemporaryReservation>,
    pub available_slots: Vec<Slot>,
    pub remaining_seconds: u32,
    pub timer_running: bool,
}

#[derive(Debug, Default)]
struct FlowState {
    step: BookingStep,
    session: BookingSession,
    reservation: Option<TemporaryReservation>,
    available_slots: Vec<Slot>,
    timer: ProcessTimer,
    epoch: u64,
}

impl FlowState {
    /// Drop everything that depends on the current slot context
    fn invalidate_slot(&mut self) -> Option<TemporaryReservation> {
        self.epoch += 1;
        self.session.time = None;
        self.reservation.take()
    }

    /// Return to an empty session, handing back any hold that must be released
    fn clear(&mut self) -> Option<TemporaryReservation> {
        let reservation = self.invalidate_slot();
        self.step = BookingStep::SelectSpecialty;
        self.session = BookingSession::default();
        self.available_slots.clear();
        self.timer.stop();
        reservation
    }
}

/// Owns the session, hold and countdown of one booking screen
pub struct SlotReservationController {
    api: Arc<dyn AppointmentApi>,
    clock: Arc<dyn Clock>,
    events: EventHub,
    budget_seconds: u32,
    state: Mutex<FlowState>,
    op_lock: Mutex<()>,
}

impl std::fmt::Debug for SlotReservationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotReservationController")
            .field("budget_seconds", &self.budget_seconds)
            .finish()
    }
}

impl SlotReservationController {
    pub fn new(
        api: Arc<dyn AppointmentApi>,
        clock: Arc<dyn Clock>,
        events: EventHub,
        budget_seconds: u32,
    ) -> Self {
        Self {
            api,
            clock,
            events,
            budget_seconds,
            state: Mutex::new(FlowState::default()),
            op_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> BookingSnapshot {
        let state = self.state.lock().await;
        BookingSnapshot {
            step: state.step,
            session: state.session.clone(),
            reservation: state.reservation.clone(),
            available_slots: state.available_slots.clone(),
            remaining_seconds: state.timer.remaining_seconds(),
            timer_running: state.timer.is_running(),
        }
    }

    pub async fn load_specialties(&self) -> crate::Result<Vec<Specialty>> {
        self.api
            .list_specialties()
            .await
            .inspect_err(|e| self.load_failed(e))
    }

    /// Doctors for the currently selected specialty
    pub async fn load_doctors(&self) -> crate::Result<Vec<Doctor>> {
        let specialty_id = {
            let state = self.state.lock().await;
            match &state.session.specialty {
                Some(specialty) => specialty.id,
                None => return Err(selection_error("no specialty selected")),
            }
        };
        self.api
            .list_doctors(specialty_id)
            .await
            .inspect_err(|e| self.load_failed(e))
    }

    /// Choose a specialty. The first call of a session starts the process timer.
    pub async fn select_specialty(&self, specialty: Specialty) -> crate::Result<()> {
        let _op = self.op_lock.lock().await;
        let released = {
            let mut state = self.state.lock().await;
            let mut released = None;
            if state.session.specialty.as_ref() != Some(&specialty) {
                if state.session.specialty.is_some() {
                    tracing::debug!("Specialty changed to '{}'", specialty.name);
                    released = state.invalidate_slot();
                    state.session.doctor = None;
                    state.session.date = None;
                    state.available_slots.clear();
                }
                state.session.specialty = Some(specialty);
                state.step = BookingStep::SelectDoctor;
            }
            if state.timer.start(self.budget_seconds) {
                tracing::info!(
                    "Booking process started with a {}s budget",
                    self.budget_seconds
                );
                self.events.publish(BookingEvent::TimerStarted {
                    budget_seconds: self.budget_seconds,
                });
            }
            // Re-selecting the current specialty never rewinds past a held slot
            state.step = state.step.max(BookingStep::SelectDoctor);
            released
        };

        if let Some(reservation) = released {
            self.release(reservation).await;
        }
        Ok(())
    }

    pub async fn select_doctor(&self, doctor: Doctor) -> crate::Result<()> {
        let _op = self.op_lock.lock().await;
        let released = {
            let mut state = self.state.lock().await;
            let Some(specialty) = &state.session.specialty else {
                return Err(selection_error("doctor selected before specialty"));
            };
            if doctor.specialty_id.is_some_and(|id| id != specialty.id) {
                return Err(selection_error("doctor does not practise the selected specialty"));
            }

            let mut released = None;
            if state.session.doctor.as_ref() != Some(&doctor) {
                if state.session.doctor.is_some() {
                    released = state.invalidate_slot();
                    state.session.date = None;
                    state.available_slots.clear();
                }
                state.session.doctor = Some(doctor);
                state.step = BookingStep::SelectDateTime;
            }
            state.step = state.step.max(BookingStep::SelectDateTime);
            released
        };

        if let Some(reservation) = released {
            self.release(reservation).await;
        }
        Ok(())
    }

    /// Choose a date and load its free slots. Dates before today are rejected.
    pub async fn select_date(&self, date: NaiveDate) -> crate::Result<Vec<Slot>> {
        let _op = self.op_lock.lock().await;
        let today = self.clock.today();
        if date < today {
            tracing::debug!("Rejected past date {} (today is {})", date, today);
            return Err(BookingError::PastDate(date));
        }

        let (doctor_id, epoch, released) = {
            let mut state = self.state.lock().await;
            let Some(doctor) = &state.session.doctor else {
                return Err(selection_error("date selected before doctor"));
            };
            let doctor_id = doctor.id;
            let mut released = None;
            if state.session.date != Some(date) {
                released = state.invalidate_slot();
                state.available_slots.clear();
                state.session.date = Some(date);
            }
            if state.reservation.is_none() {
                state.step = BookingStep::SelectDateTime;
            }
            (doctor_id, state.epoch, released)
        };

        if let Some(reservation) = released {
            self.release(reservation).await;
        }

        let result = self.api.list_available_slots(doctor_id, date).await;
        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            tracing::debug!("Discarding slots for {} loaded after the session changed", date);
            return Err(BookingError::Superseded);
        }
        match result {
            Ok(slots) => {
                tracing::debug!("Loaded {} slots for doctor {} on {}", slots.len(), doctor_id, date);
                state.available_slots = slots.clone();
                self.events.publish(BookingEvent::SlotsLoaded {
                    date,
                    slots: slots.clone(),
                });
                Ok(slots)
            }
            Err(e) => {
                drop(state);
                self.load_failed(&e);
                Err(e)
            }
        }
    }

    /// Hold `slot`, or release it if it is the slot already held
    ///
    /// Any other hold is released before the new one is requested, so at most
    /// one reservation is outstanding at a time.
    pub async fn toggle_slot(&self, slot: Slot) -> crate::Result<SlotToggle> {
        let _op = self.op_lock.lock().await;
        let (request, previous, epoch) = {
            let mut state = self.state.lock().await;
            if !matches!(
                state.step,
                BookingStep::SelectDateTime | BookingStep::ReadyToConfirm
            ) {
                return Err(selection_error("slot selected outside the date/time step"));
            }
            let (Some(specialty), Some(doctor), Some(date)) = (
                &state.session.specialty,
                &state.session.doctor,
                state.session.date,
            ) else {
                return Err(selection_error("slot selected before specialty, doctor and date"));
            };
            let request = ReservationRequest {
                doctor: doctor.id,
                specialty: specialty.id,
                date,
                time: slot.clone(),
            };

            let previous = state.reservation.take();
            state.session.time = None;
            state.step = BookingStep::SelectDateTime;

            match previous {
                Some(held) if held.time == slot => {
                    drop(state);
                    tracing::debug!("Slot {} deselected", slot);
                    self.release(held).await;
                    return Ok(SlotToggle::Released);
                }
                previous => (request, previous, state.epoch),
            }
        };

        if let Some(held) = previous {
            self.release(held).await;
            if self.state.lock().await.epoch != epoch {
                tracing::debug!("Session changed while releasing, not holding {}", slot);
                return Err(BookingError::Superseded);
            }
        }

        tracing::debug!("Requesting hold on {} {}", request.date, request.time);
        let result = self.api.create_temporary_reservation(&request).await;

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            drop(state);
            tracing::debug!("Hold response for {} arrived after the session changed", slot);
            if let Ok(stale) = result {
                self.release(stale).await;
            }
            return Err(BookingError::Superseded);
        }

        match result {
            Ok(reservation) => {
                tracing::info!(
                    "Holding slot {} {} (reservation {})",
                    reservation.date,
                    reservation.time,
                    reservation.id
                );
                state.session.time = Some(slot);
                state.reservation = Some(reservation.clone());
                state.step = BookingStep::ReadyToConfirm;
                self.events.publish(BookingEvent::SlotHeld {
                    reservation: reservation.clone(),
                });
                Ok(SlotToggle::Held(reservation))
            }
            Err(e) => {
                tracing::warn!("Hold on {} rejected: {}", slot, e);
                self.events.publish(BookingEvent::HoldRejected {
                    slot,
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// Confirm the held slot as an appointment
    pub async fn submit(&self, reason: Option<String>) -> crate::Result<Appointment> {
        let _op = self.op_lock.lock().await;
        let (request, epoch) = {
            let mut state = self.state.lock().await;
            let reason = reason.filter(|r| !r.trim().is_empty());
            let request = match state.session.appointment_request(reason.clone()) {
                Some(request) if state.reservation.is_some() => request,
                _ => {
                    tracing::debug!("Submit rejected: booking is incomplete");
                    return Err(BookingError::Incomplete);
                }
            };
            state.session.reason = reason;
            state.step = BookingStep::Finalizing;
            (request, state.epoch)
        };

        let result = self.api.create_appointment(&request).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(appointment) => {
                if state.epoch == epoch {
                    // The server turns the hold into the appointment
                    let _consumed = state.clear();
                } else {
                    tracing::warn!(
                        "Appointment {} confirmed after the booking session was reset",
                        appointment.id
                    );
                }
                drop(state);
                tracing::info!(
                    "Appointment {} booked for {} {}",
                    appointment.id,
                    appointment.date,
                    appointment.time
                );
                self.events.publish(BookingEvent::Completed {
                    appointment: appointment.clone(),
                });
                Ok(appointment)
            }
            Err(e) if state.epoch != epoch => {
                tracing::debug!("Ignoring submit failure for a reset session: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Appointment submission failed: {}", e);
                let released = if e.is_conflict() {
                    state.step = BookingStep::SelectDateTime;
                    state.invalidate_slot()
                } else {
                    state.step = BookingStep::ReadyToConfirm;
                    None
                };
                drop(state);
                self.events.publish(BookingEvent::SubmitFailed {
                    message: e.user_message(),
                });
                if let Some(reservation) = released {
                    self.release(reservation).await;
                }
                Err(e)
            }
        }
    }

    /// Go back one step, releasing the hold when leaving slot selection
    pub async fn back(&self) -> crate::Result<BookingStep> {
        let _op = self.op_lock.lock().await;
        let (step, released) = {
            let mut state = self.state.lock().await;
            let released = match state.step {
                BookingStep::SelectSpecialty => None,
                BookingStep::SelectDoctor => {
                    state.step = BookingStep::SelectSpecialty;
                    None
                }
                BookingStep::SelectDateTime => {
                    state.step = BookingStep::SelectDoctor;
                    state.invalidate_slot()
                }
                BookingStep::ReadyToConfirm => {
                    state.step = BookingStep::SelectDateTime;
                    state.invalidate_slot()
                }
                BookingStep::Finalizing => {
                    return Err(selection_error("cannot go back while submitting"));
                }
            };
            (state.step, released)
        };

        if let Some(reservation) = released {
            self.release(reservation).await;
        }
        Ok(step)
    }

    /// Advance the process timer by one second
    pub async fn tick(&self) -> TickOutcome {
        let released = {
            let mut state = self.state.lock().await;
            match state.timer.tick() {
                TickOutcome::Idle => return TickOutcome::Idle,
                outcome @ TickOutcome::Running { remaining_seconds } => {
                    self.events
                        .publish(BookingEvent::TimerTick { remaining_seconds });
                    return outcome;
                }
                TickOutcome::Expired => state.clear(),
            }
        };

        tracing::info!("Booking process timed out");
        if let Some(reservation) = released {
            self.release(reservation).await;
        }
        self.events.publish(BookingEvent::Expired);
        TickOutcome::Expired
    }

    /// Abandon the flow: clear the session, release any hold, stop the timer
    pub async fn reset(&self) {
        let released = self.state.lock().await.clear();
        tracing::debug!("Booking session reset");
        if let Some(reservation) = released {
            self.release(reservation).await;
        }
        self.events.publish(BookingEvent::Reset);
    }

    /// Best-effort cancellation of a hold; failures are logged, never returned
    async fn release(&self, reservation: TemporaryReservation) {
        tracing::debug!("Releasing reservation {}", reservation.id);
        match self.api.cancel_temporary_reservation(reservation.id).await {
            Ok(()) => self.events.publish(BookingEvent::SlotReleased {
                reservation_id: reservation.id,
            }),
            Err(e) => {
                tracing::warn!("Failed to release reservation {}: {}", reservation.id, e);
                self.events.publish(BookingEvent::ReleaseFailed {
                    reservation_id: reservation.id,
                    message: e.to_string(),
                });
            }
        }
    }

    fn load_failed(&self, error: &BookingError) {
        tracing::warn!("Loading booking data failed: {}", error);
        self.events.publish(BookingEvent::LoadFailed {
            message: error.user_message(),
        });
    }
}

fn selection_error(reason: &str) -> BookingError {
    tracing::debug!("Ignoring selection: {}", reason);
    BookingError::Selection(reason.to_string())
}
