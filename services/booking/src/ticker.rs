//! Background task that drives the controller's process timer

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::controller::SlotReservationController;
use crate::timer::TickOutcome;

/// Calls [`SlotReservationController::tick`] once per interval until cancelled
pub fn spawn_ticker(
    controller: Arc<SlotReservationController>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the countdown starts one period later
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if controller.tick().await == TickOutcome::Expired {
                        tracing::debug!("Ticker observed process expiry");
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("Ticker cancelled");
                    break;
                }
            }
        }
    })
}
