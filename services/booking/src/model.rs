//! Domain types exchanged with the appointment API

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::BookingError;

/// A medical specialty offered by the hospital
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: u64,
    pub name: String,
}

/// A doctor practising one specialty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: u64,
    pub name: String,
    #[serde(default, rename = "specialty")]
    pub specialty_id: Option<u64>,
}

/// A bookable start time, normalized to `HH:MM`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(String);

impl Slot {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Slot {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| BookingError::Selection(format!("invalid time slot '{}'", s)))?;
        Ok(Slot(time.format("%H:%M").to_string()))
    }
}

impl TryFrom<String> for Slot {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request body for a temporary hold on a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRequest {
    pub doctor: u64,
    pub specialty: u64,
    pub date: NaiveDate,
    pub time: Slot,
}

/// A server-side hold on one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryReservation {
    pub id: u64,
    pub doctor: u64,
    pub specialty: u64,
    pub date: NaiveDate,
    pub time: Slot,
}

/// Request body for the final appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentRequest {
    pub doctor: u64,
    pub date: NaiveDate,
    pub time: Slot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A confirmed appointment as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: u64,
    pub doctor: u64,
    pub date: NaiveDate,
    pub time: Slot,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// The in-progress selections of one booking flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingSession {
    pub specialty: Option<Specialty>,
    pub doctor: Option<Doctor>,
    pub date: Option<NaiveDate>,
    pub time: Option<Slot>,
    pub reason: Option<String>,
}

impl BookingSession {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when specialty, doctor, date and time are all chosen
    pub fn is_complete(&self) -> bool {
        self.specialty.is_some() && self.doctor.is_some() && self.date.is_some() && self.time.is_some()
    }

    /// The appointment to request for this session, or `None` until it is complete
    pub fn appointment_request(&self, reason: Option<String>) -> Option<AppointmentRequest> {
        if !self.is_complete() {
            return None;
        }
        Some(AppointmentRequest {
            doctor: self.doctor.as_ref()?.id,
            date: self.date?,
            time: self.time.clone()?,
            reason,
        })
    }
}
