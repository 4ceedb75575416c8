//! Typed booking events and the hub that fans them out to subscribers

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{Appointment, Slot, TemporaryReservation};

/// Message shown when the process timer runs out
pub const EXPIRED_MESSAGE: &str = "Time expired, please start the booking again";

/// Something that happened in a booking flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    TimerStarted { budget_seconds: u32 },
    TimerTick { remaining_seconds: u32 },
    SlotsLoaded { date: NaiveDate, slots: Vec<Slot> },
    SlotHeld { reservation: TemporaryReservation },
    SlotReleased { reservation_id: u64 },
    HoldRejected { slot: Slot, message: String },
    ReleaseFailed { reservation_id: u64, message: String },
    LoadFailed { message: String },
    SubmitFailed { message: String },
    Completed { appointment: Appointment },
    Expired,
    Reset,
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Text the UI should show for an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl BookingEvent {
    /// The notice to surface for this event, if any
    pub fn notice(&self) -> Option<Notice> {
        let (level, message) = match self {
            BookingEvent::HoldRejected { message, .. }
            | BookingEvent::LoadFailed { message }
            | BookingEvent::SubmitFailed { message } => (NoticeLevel::Error, message.clone()),
            BookingEvent::Completed { appointment } => (
                NoticeLevel::Info,
                format!(
                    "Appointment booked for {} at {}",
                    appointment.date, appointment.time
                ),
            ),
            BookingEvent::Expired => (NoticeLevel::Warning, EXPIRED_MESSAGE.to_string()),
            _ => return None,
        };
        Some(Notice { level, message })
    }
}

/// Fan-out of [`BookingEvent`]s owned by one booking flow
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<BookingEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver an event to every current subscriber
    pub fn publish(&self, event: BookingEvent) {
        tracing::trace!("Publishing {:?}", event);
        // No subscribers is fine; events are fire-and-forget
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}

/// A live registration on an [`EventHub`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<BookingEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<BookingEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Booking event subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-published event, without waiting
    pub fn try_recv(&mut self) -> Option<BookingEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Booking event subscriber lagged, skipped {} events", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every event published so far
    pub fn drain(&mut self) -> Vec<BookingEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn unsubscribe(self) {}
}
