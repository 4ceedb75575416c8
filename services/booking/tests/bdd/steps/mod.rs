//! BDD step definitions for the booking service

pub mod confirmation_steps;
pub mod reservation_steps;
pub mod timer_steps;
