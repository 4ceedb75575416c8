//! Countdown for the booking process and the clock used to validate dates

use chrono::{Local, NaiveDate};
use serde::Serialize;

/// Result of advancing the process timer by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Timer is not running; nothing happened
    Idle,
    Running { remaining_seconds: u32 },
    /// This tick consumed the last second of the budget
    Expired,
}

/// Countdown bounding the whole booking process
///
/// Holds no wall-clock state: it only moves when [`ProcessTimer::tick`] is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessTimer {
    remaining_seconds: u32,
    running: bool,
}

impl ProcessTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Start counting down from `budget_seconds`. Returns false if already running.
    pub fn start(&mut self, budget_seconds: u32) -> bool {
        if self.running {
            return false;
        }
        self.remaining_seconds = budget_seconds;
        self.running = budget_seconds > 0;
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.remaining_seconds = 0;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.running = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Running {
                remaining_seconds: self.remaining_seconds,
            }
        }
    }
}

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local system date
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
