//! BDD step definitions for slot reservation feature

use std::sync::Arc;

use chrono::Days;
use cucumber::{given, then, when};

use booking::controller::DEFAULT_BUDGET_SECONDS;
use booking::events::EventHub;
use booking::flow::find_named;
use booking::model::Slot;
use booking::timer::FixedClock;
use booking::SlotReservationController;

use crate::world::{today, ApiCall, BookingWorld, RecordingApi};

fn slot(time: &str) -> Slot {
    time.parse().expect("invalid slot")
}

#[given(expr = "a booking for {string} with {string} in {int} days")]
async fn booking_in_days(world: &mut BookingWorld, specialty: String, doctor: String, days: u64) {
    let api = Arc::new(RecordingApi::new(42));
    let controller = Arc::new(SlotReservationController::new(
        api.clone(),
        Arc::new(FixedClock(today())),
        EventHub::new(1024),
        DEFAULT_BUDGET_SECONDS,
    ));
    world.events = Some(controller.subscribe());

    let specialties = controller.load_specialties().await.unwrap();
    let specialty = find_named(&specialties, &specialty, |s| s.name.as_str())
        .cloned()
        .expect("unknown specialty");
    controller.select_specialty(specialty).await.unwrap();

    let doctors = controller.load_doctors().await.unwrap();
    let doctor = find_named(&doctors, &doctor, |d| d.name.as_str())
        .cloned()
        .expect("unknown doctor");
    controller.select_doctor(doctor).await.unwrap();
    controller
        .select_date(today() + Days::new(days))
        .await
        .unwrap();

    world.api = Some(api);
    world.controller = Some(controller);
}

#[given(expr = "slot {string} has just been taken by another patient")]
async fn slot_taken(world: &mut BookingWorld, time: String) {
    world.api().mark_taken(slot(&time)).await;
}

#[given(expr = "slot {string} is held")]
async fn slot_is_held(world: &mut BookingWorld, time: String) {
    world.controller().toggle_slot(slot(&time)).await.unwrap();
}

#[when(expr = "the patient selects slot {string}")]
async fn select_slot(world: &mut BookingWorld, time: String) {
    world.last_error = world.controller().toggle_slot(slot(&time)).await.err();
}

#[when("the patient goes back")]
async fn go_back(world: &mut BookingWorld) {
    world.last_error = world.controller().back().await.err();
}

#[when("the patient starts over")]
async fn start_over(world: &mut BookingWorld) {
    world.controller().reset().await;
}

#[then(expr = "slot {string} should be held")]
async fn slot_should_be_held(world: &mut BookingWorld, time: String) {
    let snapshot = world.controller().snapshot().await;
    assert_eq!(snapshot.session.time, Some(slot(&time)));
    let reservation = snapshot.reservation.expect("no hold");
    assert_eq!(reservation.time, slot(&time));
}

#[then("no slot should be selected")]
async fn no_slot_selected(world: &mut BookingWorld) {
    let snapshot = world.controller().snapshot().await;
    assert!(snapshot.session.time.is_none());
    assert!(snapshot.reservation.is_none());
}

#[then(expr = "hold {int} should have been released")]
async fn hold_released(world: &mut BookingWorld, id: u64) {
    let calls = world.api().calls().await;
    assert!(
        calls.contains(&ApiCall::CancelHold(id)),
        "hold {} was not released: {:?}",
        id,
        calls
    );
}

#[then("no hold should have been released")]
async fn nothing_released(world: &mut BookingWorld) {
    let calls = world.api().calls().await;
    assert!(
        !calls.iter().any(|c| matches!(c, ApiCall::CancelHold(_))),
        "unexpected release: {:?}",
        calls
    );
}

#[then(expr = "hold {int} should have been released before slot {string} was requested")]
async fn released_before_request(world: &mut BookingWorld, id: u64, time: String) {
    let calls = world.api().calls().await;
    let released = calls
        .iter()
        .position(|c| *c == ApiCall::CancelHold(id))
        .expect("hold never released");
    let requested = calls
        .iter()
        .position(|c| *c == ApiCall::CreateHold(slot(&time)))
        .expect("slot never requested");
    assert!(released < requested, "wrong order: {:?}", calls);
}

#[then(expr = "the patient should see {string}")]
fn patient_sees(world: &mut BookingWorld, message: String) {
    world.collect_notices();
    assert!(
        world.notices.contains(&message),
        "notice '{}' not shown: {:?}",
        message,
        world.notices
    );
}

#[then("the booking session should be empty")]
async fn session_empty(world: &mut BookingWorld) {
    let snapshot = world.controller().snapshot().await;
    assert!(snapshot.session.is_empty());
    assert!(snapshot.reservation.is_none());
}
