//! Enrollment sequences against the emulated module.
//!
//! Run with: cargo test --package fingerlink-engine --test enrollment_tests

mod common;

use common::{START_MILLIS, engine_config, positions, rig, rig_with};
use fingerlink_core::{ConfirmationCode, Position};
use fingerlink_engine::steps::EnrollmentStep;
use fingerlink_engine::{AllocationFallback, EnrollmentOutcome, EnrollmentRequest};
use fingerlink_hardware::mock::Finger;
use fingerlink_protocol::Instruction;
use fingerlink_storage::messages::DisplayMessages;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const FINGER: Finger = Finger(7);

#[tokio::test(start_paused = true)]
async fn test_enroll_stores_and_publishes() {
    let mut rig = rig();
    rig.module.touch(FINGER);
    rig.module.press(FINGER);

    let outcome = rig
        .station
        .enroll(&mut rig.sensor, &EnrollmentRequest::new().with_nombre("Lucia"))
        .await;

    let EnrollmentOutcome::Enrolled { position, identity } = outcome else {
        panic!("Expected enrollment, got {outcome:?}");
    };
    assert_eq!(position, Position::from(0));
    assert_eq!(identity.usuario_id, format!("user_0_{START_MILLIS}"));
    assert_eq!(rig.module.library().get(&position), Some(&FINGER));

    let stored = rig
        .store
        .document(&format!("usuarios/user_0_{START_MILLIS}"))
        .unwrap();
    assert_eq!(stored["nombre"], "Lucia");
    assert_eq!(stored["apellido"], "Pendiente");
    assert_eq!(stored["email"], "pendiente@email.com");
    assert_eq!(stored["activo"], true);
    assert_eq!(stored["registrado_por"], "fingerlink");

    assert_eq!(
        rig.store.document("indices_sensor/0"),
        Some(json!({
            "usuario_id": format!("user_0_{START_MILLIS}"),
            "nombre": "Lucia",
            "activo": true,
        }))
    );
    assert_eq!(
        rig.store.document("display/mensaje"),
        Some(json!(DisplayMessages::ENROLLED))
    );
}

#[tokio::test(start_paused = true)]
async fn test_enroll_uses_lowest_free_position() {
    let mut rig = rig();
    rig.module.enroll(Position::from(0), Finger(1));
    rig.module.enroll(Position::from(1), Finger(2));
    rig.module.enroll(Position::from(3), Finger(3));
    rig.module.touch(FINGER);
    rig.module.press(FINGER);

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    assert_eq!(outcome.stored_position(), Some(Position::from(2)));
    assert_eq!(rig.module.occupied(), positions(&[0, 1, 2, 3]));
}

#[tokio::test(start_paused = true)]
async fn test_mismatched_captures_leave_library_untouched() {
    let mut rig = rig();
    rig.module.touch(Finger(1));
    rig.module.press(Finger(2));

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    match outcome {
        EnrollmentOutcome::Failed { step, .. } => assert_eq!(step, EnrollmentStep::Merge),
        other => panic!("Expected merge failure, got {other:?}"),
    }
    assert!(rig.module.library().is_empty());
    assert_eq!(rig.module.count(Instruction::Store), 0);
    assert!(rig.store.document("usuarios").is_none());
    assert!(rig.store.document("indices_sensor").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_writes_no_records() {
    let mut rig = rig();
    rig.module.touch(FINGER);
    rig.module.press(FINGER);
    rig.module
        .fail_next(Instruction::Store, ConfirmationCode::FlashError);

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    match outcome {
        EnrollmentOutcome::Failed { step, .. } => assert_eq!(step, EnrollmentStep::Store),
        other => panic!("Expected store failure, got {other:?}"),
    }
    assert!(rig.module.library().is_empty());
    assert!(rig.store.document("usuarios").is_none());
    assert!(rig.store.document("indices_sensor").is_none());
    assert!(
        rig.store
            .writes()
            .iter()
            .all(|path| path.starts_with("display"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_press_timeout_aborts_before_capture() {
    let mut rig = rig();

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    assert_eq!(
        outcome,
        EnrollmentOutcome::TimedOut {
            step: EnrollmentStep::WaitPress1
        }
    );
    assert_eq!(rig.module.count(Instruction::GenerateChar), 0);
    assert_eq!(
        rig.store.document("display/mensaje"),
        Some(json!(DisplayMessages::PRESS_TIMEOUT))
    );
}

#[tokio::test(start_paused = true)]
async fn test_finger_never_lifted() {
    let mut rig = rig();
    for _ in 0..40 {
        rig.module.press(FINGER);
    }

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    assert_eq!(
        outcome,
        EnrollmentOutcome::TimedOut {
            step: EnrollmentStep::WaitRelease
        }
    );
    assert_eq!(outcome.message(), DisplayMessages::RELEASE_TIMEOUT);
    assert!(rig.module.library().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_identity_write_failure_leaves_template_unindexed() {
    let mut rig = rig();
    rig.store.fail_writes_under("indices_sensor");
    rig.module.touch(FINGER);
    rig.module.press(FINGER);

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    match &outcome {
        EnrollmentOutcome::StoredUnindexed { position, .. } => {
            assert_eq!(*position, Position::from(0))
        }
        other => panic!("Expected unindexed template, got {other:?}"),
    }
    assert_eq!(rig.module.occupied(), positions(&[0]));
    assert_eq!(outcome.message(), DisplayMessages::ENROLLED_UNINDEXED);

    // The next reconciliation removes it
    let report = rig.station.reconcile(&mut rig.sensor).await;
    assert!(report.is_successful());
    assert!(rig.module.library().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_full_library() {
    let mut rig = rig();
    for slot in 0..=255u8 {
        rig.module.enroll(Position::from(slot), Finger(slot as u32));
    }
    rig.module.touch(FINGER);
    rig.module.press(FINGER);

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    assert_eq!(outcome, EnrollmentOutcome::LibraryFull);
    assert_eq!(rig.module.count(Instruction::CaptureImage), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_occupancy_aborts_by_default() {
    let mut rig = rig();
    rig.module
        .fail_next(Instruction::ReadIndexTable, ConfirmationCode::PacketError);
    rig.module.touch(FINGER);
    rig.module.press(FINGER);

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    match outcome {
        EnrollmentOutcome::Failed { step, .. } => {
            assert_eq!(step, EnrollmentStep::AllocatePosition)
        }
        other => panic!("Expected allocation failure, got {other:?}"),
    }
    assert_eq!(rig.module.count(Instruction::CaptureImage), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_occupancy_with_fixed_fallback() {
    let mut rig = rig_with(
        engine_config().with_allocation_fallback(AllocationFallback::Fixed(Position::from(1))),
    );
    rig.module
        .fail_next(Instruction::ReadIndexTable, ConfirmationCode::PacketError);
    rig.module.touch(FINGER);
    rig.module.press(FINGER);

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    assert_eq!(outcome.stored_position(), Some(Position::from(1)));
    assert!(outcome.is_enrolled());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_enrollment() {
    let token = CancellationToken::new();
    let mut rig = rig();
    let station = rig.station.with_cancellation(token.clone());
    token.cancel();

    let outcome = station.enroll(&mut rig.sensor, &Default::default()).await;

    assert_eq!(
        outcome,
        EnrollmentOutcome::Cancelled {
            step: EnrollmentStep::WaitPress1
        }
    );
    assert_eq!(rig.module.count(Instruction::CaptureImage), 0);
}

#[tokio::test(start_paused = true)]
async fn test_status_lines_can_stay_local() {
    let mut rig = rig_with(engine_config().with_publish_status(false));
    rig.module.touch(FINGER);
    rig.module.press(FINGER);

    let outcome = rig.station.enroll(&mut rig.sensor, &Default::default()).await;

    assert!(outcome.is_enrolled());
    assert!(rig.store.document("display").is_none());
}
