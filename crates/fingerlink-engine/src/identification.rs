//! One-shot identification against the whole library.
//!
//! A matched finger always produces an access record: authorized when the
//! index marks the person active, denied otherwise. A finger that matches
//! nothing, or matches a slot nobody claims, produces a failed attempt. A
//! press timeout or a capture failure records nothing.

use crate::steps::{IdentificationStep, StepLog};
use crate::{EngineResult, Station};
use fingerlink_core::{CharBuffer, Clock, Position};
use fingerlink_hardware::{Presence, Sensor, Transport};
use fingerlink_storage::RemoteStore;
use fingerlink_storage::messages::DisplayMessages;
use fingerlink_storage::models::{AccessEvent, AccessKind, FailedAttempt};
use tracing::{debug, info, warn};

/// Person resolved from a search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identified {
    pub position: Position,
    pub score: u16,
    pub usuario_id: Option<String>,
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentificationOutcome {
    /// Matched an active person.
    Granted(Identified),

    /// Matched a person whose index entry is inactive.
    Denied(Identified),

    /// Matched a slot without an index entry.
    Unindexed { position: Position, score: u16 },

    NoMatch,

    /// Nobody touched the sensor before the press timeout.
    NoFinger,

    Cancelled,

    Failed {
        step: IdentificationStep,
        message: String,
    },
}

impl IdentificationOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    pub fn message(&self) -> String {
        match self {
            Self::Granted(identified) => DisplayMessages::welcome(&identified.nombre),
            Self::Denied(_) => DisplayMessages::ACCESS_DENIED_INACTIVE.to_string(),
            Self::Unindexed { .. } => DisplayMessages::ACCESS_DENIED_UNREGISTERED.to_string(),
            Self::NoMatch => DisplayMessages::NO_MATCH.to_string(),
            Self::NoFinger => DisplayMessages::PRESS_TIMEOUT.to_string(),
            Self::Cancelled => DisplayMessages::CANCELLED.to_string(),
            Self::Failed { message, .. } => message.clone(),
        }
    }
}

impl<S: RemoteStore, C: Clock> Station<S, C> {
    /// Wait for a finger and identify it.
    pub async fn identify<T: Transport>(&self, sensor: &mut Sensor<T>) -> IdentificationOutcome {
        let mut log = StepLog::new();
        let outcome = match self.run_identification(sensor, &mut log).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let step = log.abort(IdentificationStep::Aborted);
                warn!(%step, error = %e, "Identification aborted");
                IdentificationOutcome::Failed {
                    step,
                    message: e.to_string(),
                }
            }
        };
        if matches!(
            outcome,
            IdentificationOutcome::NoFinger | IdentificationOutcome::Cancelled
        ) {
            log.abort(IdentificationStep::Aborted);
        }

        self.notify(&outcome.message()).await;
        outcome
    }

    async fn run_identification<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        log: &mut StepLog<IdentificationStep>,
    ) -> EngineResult<IdentificationOutcome> {
        log.transition_to(IdentificationStep::WaitPress)?;
        self.notify(DisplayMessages::WAITING_FOR_FINGER).await;
        match self
            .detector
            .wait_for_press(sensor, self.config.press_timeout)
            .await
        {
            Presence::Detected(_) => {}
            Presence::TimedOut => return Ok(IdentificationOutcome::NoFinger),
            Presence::Cancelled => return Ok(IdentificationOutcome::Cancelled),
        }

        log.transition_to(IdentificationStep::Capture)?;
        sensor.generate_character_file(CharBuffer::One).await?;

        log.transition_to(IdentificationStep::Search)?;
        let hit = match sensor.search_library().await {
            Ok(hit) => hit,
            Err(e) => {
                // The module rejected the search; nothing was identified
                warn!(error = %e, "Search failed, treating as no match");
                None
            }
        };

        let Some(hit) = hit else {
            log.transition_to(IdentificationStep::Done)?;
            let attempt = FailedAttempt::no_match(self.clock.now_millis());
            self.record_failed(&attempt).await;
            return Ok(IdentificationOutcome::NoMatch);
        };
        debug!(position = %hit.position, score = hit.score, "Template matched");

        log.transition_to(IdentificationStep::Resolve)?;
        let index = self.directory.find_index(hit.position).await?;
        let timestamp = self.clock.now_millis();
        let outcome = match index {
            Some(index) => {
                let event = AccessEvent {
                    usuario_id: index.usuario_id.clone(),
                    id_sensor: hit.position,
                    nombre: index.nombre.clone(),
                    timestamp,
                    score: hit.score,
                    autorizado: index.activo,
                    tipo_acceso: AccessKind::Entry,
                };
                if let Err(e) = self.directory.record_access(&event).await {
                    warn!(error = %e, "Failed to record access event");
                }

                let identified = Identified {
                    position: hit.position,
                    score: hit.score,
                    usuario_id: index.usuario_id,
                    nombre: index.nombre,
                };
                info!(
                    position = %identified.position,
                    nombre = %identified.nombre,
                    autorizado = index.activo,
                    "Finger identified"
                );
                if index.activo {
                    IdentificationOutcome::Granted(identified)
                } else {
                    IdentificationOutcome::Denied(identified)
                }
            }
            None => {
                warn!(position = %hit.position, "Matched template has no index entry");
                let attempt = FailedAttempt::unindexed(timestamp, hit.position, hit.score);
                self.record_failed(&attempt).await;
                IdentificationOutcome::Unindexed {
                    position: hit.position,
                    score: hit.score,
                }
            }
        };

        log.transition_to(IdentificationStep::Done)?;
        Ok(outcome)
    }

    async fn record_failed(&self, attempt: &FailedAttempt) {
        if let Err(e) = self.directory.record_failed_attempt(attempt).await {
            warn!(error = %e, "Failed to record failed attempt");
        }
    }
}
