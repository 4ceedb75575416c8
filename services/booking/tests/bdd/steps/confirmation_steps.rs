//! BDD step definitions for appointment confirmation feature

use cucumber::{given, then, when};

use crate::world::{ApiCall, BookingWorld};

#[given(expr = "the server rejects appointments with status {int} and message {string}")]
async fn server_rejects(world: &mut BookingWorld, status: u16, message: String) {
    world.api().fail_submissions(status, &message).await;
}

#[when(expr = "the patient confirms the booking with reason {string}")]
async fn confirm_with_reason(world: &mut BookingWorld, reason: String) {
    let result = world.controller().submit(Some(reason)).await;
    match result {
        Ok(appointment) => world.last_appointment = Some(appointment),
        Err(e) => world.last_error = Some(e),
    }
}

#[when("the patient confirms the booking")]
async fn confirm(world: &mut BookingWorld) {
    let result = world.controller().submit(None).await;
    match result {
        Ok(appointment) => world.last_appointment = Some(appointment),
        Err(e) => world.last_error = Some(e),
    }
}

#[then(expr = "the appointment should be booked at {string}")]
fn appointment_booked(world: &mut BookingWorld, time: String) {
    let appointment = world.last_appointment.as_ref().expect("no appointment");
    assert_eq!(appointment.time.as_str(), time);
}

#[then("the confirmation should be refused as incomplete")]
fn refused_incomplete(world: &mut BookingWorld) {
    let error = world.last_error.as_ref().expect("no error");
    assert!(matches!(error, booking::BookingError::Incomplete));
}

#[then("no appointment request should have been sent")]
async fn no_appointment_request(world: &mut BookingWorld) {
    let calls = world.api().calls().await;
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, ApiCall::CreateAppointment(_))),
        "unexpected appointment request: {:?}",
        calls
    );
}

#[then(expr = "the booking should still be ready to confirm with hold {int}")]
async fn still_ready(world: &mut BookingWorld, id: u64) {
    let snapshot = world.controller().snapshot().await;
    assert_eq!(snapshot.step, booking::BookingStep::ReadyToConfirm);
    assert_eq!(snapshot.reservation.map(|r| r.id), Some(id));
}
