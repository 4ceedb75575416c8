//! Error types for the booking client

use chrono::NaiveDate;

/// Errors that can occur while booking an appointment
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Slot conflict: {0}")]
    Conflict(String),

    #[error("Invalid selection: {0}")]
    Selection(String),

    #[error("Date {0} is in the past")]
    PastDate(NaiveDate),

    #[error("Booking is incomplete: specialty, doctor, date and time are required")]
    Incomplete,

    #[error("Booking session was reset while the request was in flight")]
    Superseded,

    #[error("Time expired, please start the booking again")]
    Expired,

    #[error("Booking cancelled")]
    Cancelled,
}

impl BookingError {
    /// Message suitable for showing to the user
    ///
    /// Server-provided messages are returned verbatim.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Api { message, .. } | BookingError::Conflict(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// True when the server rejected the request because the slot is no longer free
    pub fn is_conflict(&self) -> bool {
        matches!(self, BookingError::Conflict(_))
    }
}

/// Result type alias for booking operations
pub type Result<T> = std::result::Result<T, BookingError>;
