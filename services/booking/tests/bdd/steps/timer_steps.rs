//! BDD step definitions for process timer feature

use cucumber::{then, when};

use booking::timer::TickOutcome;

use crate::world::BookingWorld;

#[when(expr = "{int} seconds elapse")]
async fn seconds_elapse(world: &mut BookingWorld, seconds: u32) {
    let controller = world.controller();
    for _ in 0..seconds {
        if controller.tick().await == TickOutcome::Idle {
            break;
        }
    }
}

#[then(expr = "the timer should show {int} seconds remaining")]
async fn timer_shows(world: &mut BookingWorld, seconds: u32) {
    let snapshot = world.controller().snapshot().await;
    assert!(snapshot.timer_running);
    assert_eq!(snapshot.remaining_seconds, seconds);
}

#[then("the timer should be stopped")]
async fn timer_stopped(world: &mut BookingWorld) {
    let snapshot = world.controller().snapshot().await;
    assert!(!snapshot.timer_running);
}
