//! Orphan removal between the sensor library and the remote index.
//!
//! Run with: cargo test --package fingerlink-engine --test reconciliation_tests

mod common;

use common::{PAUSE, claim, positions, rig};
use fingerlink_core::{ConfirmationCode, Position};
use fingerlink_engine::ReconciliationOutcome;
use fingerlink_hardware::mock::Finger;
use fingerlink_protocol::Instruction;
use fingerlink_storage::messages::DisplayMessages;
use serde_json::json;
use tokio::time::Instant;

fn occupy(rig: &common::Rig, slots: &[u8]) {
    for &slot in slots {
        rig.module.enroll(Position::from(slot), Finger(slot as u32));
    }
}

#[tokio::test(start_paused = true)]
async fn test_reconciliation_is_idempotent() {
    let mut rig = rig();
    occupy(&rig, &[1, 2, 5]);
    claim(&rig.store, 1, "user_1_1", "Ana", true);
    claim(&rig.store, 2, "user_2_1", "Luis", false);

    let first = rig.station.reconcile(&mut rig.sensor).await;
    let report = first.report().unwrap();
    assert_eq!(report.posiciones_sensor_inicial, 3);
    assert_eq!(report.posiciones_firebase, 2);
    assert_eq!(report.huellas_identificadas_eliminar, 1);
    assert_eq!(report.huellas_eliminadas_exitosamente, 1);
    assert_eq!(report.errores_eliminacion, 0);
    assert_eq!(report.posiciones_sensor_final, 2);
    assert!(report.huellas_huerfanas_restantes.is_empty());
    assert!(report.sincronizacion_exitosa);
    assert_eq!(rig.module.occupied(), positions(&[1, 2]));

    let second = rig.station.reconcile(&mut rig.sensor).await;
    let report = second.report().unwrap();
    assert_eq!(report.posiciones_sensor_inicial, 2);
    assert_eq!(report.huellas_identificadas_eliminar, 0);
    assert_eq!(report.posiciones_sensor_final, 2);
    assert!(report.sincronizacion_exitosa);
    assert_eq!(rig.module.count(Instruction::DeleteChar), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_deletion_is_reported() {
    let mut rig = rig();
    occupy(&rig, &[1, 2, 5]);
    claim(&rig.store, 1, "user_1_1", "Ana", true);
    claim(&rig.store, 2, "user_2_1", "Luis", true);
    rig.module.protect(Position::from(5));

    let outcome = rig.station.reconcile(&mut rig.sensor).await;

    let report = outcome.report().unwrap();
    assert_eq!(report.errores_eliminacion, 1);
    assert_eq!(report.huellas_eliminadas_exitosamente, 0);
    assert_eq!(report.posiciones_sensor_final, 3);
    assert_eq!(report.huellas_huerfanas_restantes, positions(&[5]));
    assert!(!report.sincronizacion_exitosa);
    assert_eq!(outcome.message(), DisplayMessages::SYNC_INCOMPLETE);
}

#[tokio::test(start_paused = true)]
async fn test_report_is_persisted() {
    let mut rig = rig();
    occupy(&rig, &[4]);

    rig.station.reconcile(&mut rig.sensor).await;

    let stored = rig.store.document("sincronizacion/ultimo_reporte").unwrap();
    assert_eq!(stored["huellas_identificadas_eliminar"], json!(1));
    assert_eq!(stored["huellas_huerfanas_restantes"], json!([]));
    assert_eq!(stored["sincronizacion_exitosa"], json!(true));
}

#[tokio::test(start_paused = true)]
async fn test_absent_index_clears_the_library() {
    let mut rig = rig();
    occupy(&rig, &[0, 10, 200]);

    let outcome = rig.station.reconcile(&mut rig.sensor).await;

    assert!(outcome.is_successful());
    assert!(rig.module.library().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_index_deletes_nothing() {
    let mut rig = rig();
    occupy(&rig, &[1, 2]);
    rig.store.fail_reads_under("indices_sensor");

    let outcome = rig.station.reconcile(&mut rig.sensor).await;

    assert!(matches!(
        outcome,
        ReconciliationOutcome::Aborted {
            stage: "read_index",
            ..
        }
    ));
    assert_eq!(rig.module.count(Instruction::DeleteChar), 0);
    assert!(rig.store.document("sincronizacion").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_occupancy_deletes_nothing() {
    let mut rig = rig();
    occupy(&rig, &[1]);
    rig.module
        .fail_next(Instruction::ReadIndexTable, ConfirmationCode::ReadError);

    let outcome = rig.station.reconcile(&mut rig.sensor).await;

    assert!(matches!(
        outcome,
        ReconciliationOutcome::Aborted {
            stage: "read_occupancy",
            ..
        }
    ));
    assert_eq!(rig.module.count(Instruction::DeleteChar), 0);
    assert_eq!(outcome.message(), DisplayMessages::SYNC_INCOMPLETE);
}

#[tokio::test(start_paused = true)]
async fn test_report_write_failure_still_returns_report() {
    let mut rig = rig();
    occupy(&rig, &[7]);
    rig.store.fail_writes_under("sincronizacion");

    let outcome = rig.station.reconcile(&mut rig.sensor).await;

    assert!(outcome.is_successful());
    assert!(rig.module.library().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pause_between_deletions() {
    let mut rig = rig();
    occupy(&rig, &[1, 2, 3]);
    let start = Instant::now();

    rig.station.reconcile(&mut rig.sensor).await;

    assert!(start.elapsed() >= PAUSE * 2);
    assert_eq!(rig.module.count(Instruction::DeleteChar), 3);
}

#[tokio::test(start_paused = true)]
async fn test_index_in_array_form() {
    let mut rig = rig();
    occupy(&rig, &[1, 2, 3]);
    rig.store.seed(
        "indices_sensor",
        json!([null, {"usuario_id": "a"}, null, {"usuario_id": "c"}]),
    );

    let outcome = rig.station.reconcile(&mut rig.sensor).await;

    assert!(outcome.is_successful());
    assert_eq!(rig.module.occupied(), positions(&[1, 3]));
}
