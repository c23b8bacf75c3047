//! Removes templates that no index entry claims.
//!
//! The sensor owns occupancy and the remote index owns claims. An occupied
//! slot without a claim is an orphan: usually an enrollment whose identity
//! write failed. Reconciliation deletes orphans and never writes identity
//! data. Running it twice in a row deletes nothing the second time.

use crate::Station;
use fingerlink_core::{Clock, Position};
use fingerlink_hardware::{Sensor, Transport};
use fingerlink_storage::RemoteStore;
use fingerlink_storage::messages::DisplayMessages;
use fingerlink_storage::models::SyncReport;
use std::collections::BTreeSet;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The run finished; the report says whether any orphan survived.
    Completed(SyncReport),

    /// The sensor or the index could not be read, so nothing was deleted.
    Aborted { stage: &'static str, message: String },
}

impl ReconciliationOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Aborted { .. } => None,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.report().is_some_and(|r| r.sincronizacion_exitosa)
    }

    pub fn message(&self) -> String {
        if self.is_successful() {
            DisplayMessages::SYNC_OK.to_string()
        } else {
            DisplayMessages::SYNC_INCOMPLETE.to_string()
        }
    }
}

impl<S: RemoteStore, C: Clock> Station<S, C> {
    /// Delete every occupied position missing from the remote index.
    pub async fn reconcile<T: Transport>(&self, sensor: &mut Sensor<T>) -> ReconciliationOutcome {
        self.notify(DisplayMessages::SYNCING).await;
        let outcome = self.run_reconciliation(sensor).await;
        if let ReconciliationOutcome::Aborted { stage, message } = &outcome {
            error!(stage, message = %message, "Reconciliation aborted");
        }
        self.notify(&outcome.message()).await;
        outcome
    }

    async fn run_reconciliation<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
    ) -> ReconciliationOutcome {
        let initial = match sensor.read_occupancy_bitmap().await {
            Ok(bitmap) => bitmap.occupied_set(),
            Err(e) => {
                return ReconciliationOutcome::Aborted {
                    stage: "read_occupancy",
                    message: e.to_string(),
                };
            }
        };

        let indexed = match self.directory.indexed_positions().await {
            Ok(indexed) => indexed,
            Err(e) => {
                return ReconciliationOutcome::Aborted {
                    stage: "read_index",
                    message: e.to_string(),
                };
            }
        };

        let orphans: BTreeSet<Position> = initial.difference(&indexed).copied().collect();
        info!(
            occupied = initial.len(),
            indexed = indexed.len(),
            orphans = orphans.len(),
            "Occupancy compared with index"
        );

        let mut deleted = BTreeSet::new();
        let mut failures = 0;
        for (i, &position) in orphans.iter().enumerate() {
            if i > 0 && !self.pause_between_deletions().await {
                warn!("Reconciliation cancelled before all orphans were deleted");
                break;
            }
            match sensor.delete_template(position).await {
                Ok(()) => {
                    info!(%position, "Orphan template deleted");
                    deleted.insert(position);
                }
                Err(e) => {
                    warn!(%position, error = %e, "Failed to delete orphan template");
                    failures += 1;
                }
            }
        }

        let (final_count, remaining, reread) = match sensor.read_occupancy_bitmap().await {
            Ok(bitmap) => {
                let occupied = bitmap.occupied_set();
                let remaining: Vec<Position> = occupied.difference(&indexed).copied().collect();
                (occupied.len(), remaining, true)
            }
            Err(e) => {
                warn!(error = %e, "Could not re-read occupancy after deletions");
                let remaining: Vec<Position> = orphans.difference(&deleted).copied().collect();
                (initial.len() - deleted.len(), remaining, false)
            }
        };

        let report = SyncReport {
            posiciones_sensor_inicial: initial.len(),
            posiciones_firebase: indexed.len(),
            huellas_identificadas_eliminar: orphans.len(),
            huellas_eliminadas_exitosamente: deleted.len(),
            errores_eliminacion: failures,
            posiciones_sensor_final: final_count,
            sincronizacion_exitosa: reread && remaining.is_empty(),
            huellas_huerfanas_restantes: remaining,
            timestamp: self.clock.now_millis(),
        };

        if let Err(e) = self.directory.save_sync_report(&report).await {
            warn!(error = %e, "Failed to persist reconciliation report");
        }
        ReconciliationOutcome::Completed(report)
    }

    /// Sleep for the deletion pause. Returns `false` if cancelled instead.
    async fn pause_between_deletions(&self) -> bool {
        let cancel = self.cancellation();
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.deletion_pause) => true,
        }
    }
}
