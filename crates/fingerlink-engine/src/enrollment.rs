//! Two-capture enrollment into the lowest free library slot.
//!
//! The sensor is only written at [`EnrollmentStep::Store`]. Anything that
//! fails earlier leaves the library untouched. Once the template is stored
//! the identity and index records are written; if either write fails the
//! template stays on the sensor unindexed and the next reconciliation run
//! removes it.

use crate::steps::{EnrollmentStep, StepLog};
use crate::{AllocationFallback, EngineError, EngineResult, Station};
use fingerlink_core::{CharBuffer, Clock, Position};
use fingerlink_hardware::{HardwareError, Presence, Sensor, Transport};
use fingerlink_storage::messages::DisplayMessages;
use fingerlink_storage::models::{IdentityRecord, IndexRecord, Profile};
use fingerlink_storage::RemoteStore;
use std::time::Duration;
use tracing::{error, info, warn};

/// Who is being enrolled. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentRequest {
    pub profile: Profile,
}

impl EnrollmentRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nombre(mut self, nombre: impl Into<String>) -> Self {
        self.profile = self.profile.with_nombre(nombre);
        self
    }

    pub fn with_apellido(mut self, apellido: impl Into<String>) -> Self {
        self.profile = self.profile.with_apellido(apellido);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.profile = self.profile.with_email(email);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentOutcome {
    /// Template stored and both remote records written.
    Enrolled {
        position: Position,
        identity: IdentityRecord,
    },

    /// Template stored but the remote records could not be written.
    StoredUnindexed {
        position: Position,
        usuario_id: String,
        message: String,
    },

    /// Every slot is occupied.
    LibraryFull,

    /// No finger (or no release) within the configured window.
    TimedOut { step: EnrollmentStep },

    Cancelled { step: EnrollmentStep },

    /// The sequence stopped at `step`; the library was not written.
    Failed {
        step: EnrollmentStep,
        message: String,
    },
}

impl EnrollmentOutcome {
    pub fn is_enrolled(&self) -> bool {
        matches!(self, Self::Enrolled { .. })
    }

    /// Position holding a new template, if the library was written.
    pub fn stored_position(&self) -> Option<Position> {
        match self {
            Self::Enrolled { position, .. } | Self::StoredUnindexed { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Enrolled { .. } => DisplayMessages::ENROLLED.to_string(),
            Self::StoredUnindexed { .. } => DisplayMessages::ENROLLED_UNINDEXED.to_string(),
            Self::LibraryFull => DisplayMessages::LIBRARY_FULL.to_string(),
            Self::TimedOut {
                step: EnrollmentStep::WaitRelease,
            } => DisplayMessages::RELEASE_TIMEOUT.to_string(),
            Self::TimedOut { .. } => DisplayMessages::PRESS_TIMEOUT.to_string(),
            Self::Cancelled { .. } => DisplayMessages::CANCELLED.to_string(),
            Self::Failed { message, .. } => {
                format!("{}: {message}", DisplayMessages::ENROLL_FAILED)
            }
        }
    }
}

/// Early exits from the sequence that are not errors.
enum Interrupt {
    TimedOut,
    Cancelled,
    LibraryFull,
}

type Flow<T> = std::result::Result<T, Stop>;

enum Stop {
    Interrupt(Interrupt),
    Error(EngineError),
}

impl From<EngineError> for Stop {
    fn from(err: EngineError) -> Self {
        Self::Error(err)
    }
}

impl From<HardwareError> for Stop {
    fn from(err: HardwareError) -> Self {
        Self::Error(err.into())
    }
}

impl<S: RemoteStore, C: Clock> Station<S, C> {
    /// Enroll one finger.
    ///
    /// Captures the finger twice, merges the captures into a template, stores
    /// it and publishes the identity. Every outcome carries a status message;
    /// nothing here panics or returns an error.
    pub async fn enroll<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        request: &EnrollmentRequest,
    ) -> EnrollmentOutcome {
        let mut log = StepLog::new();
        let outcome = match self.store_template(sensor, &mut log).await {
            Ok(position) => self.publish_identity(&mut log, position, request).await,
            Err(Stop::Interrupt(interrupt)) => {
                let step = log.abort(EnrollmentStep::Aborted);
                match interrupt {
                    Interrupt::TimedOut => EnrollmentOutcome::TimedOut { step },
                    Interrupt::Cancelled => EnrollmentOutcome::Cancelled { step },
                    Interrupt::LibraryFull => EnrollmentOutcome::LibraryFull,
                }
            }
            Err(Stop::Error(e)) => {
                let step = log.abort(EnrollmentStep::Aborted);
                warn!(%step, error = %e, "Enrollment aborted");
                EnrollmentOutcome::Failed {
                    step,
                    message: e.to_string(),
                }
            }
        };

        self.notify(&outcome.message()).await;
        outcome
    }

    /// Everything up to and including the library write.
    async fn store_template<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        log: &mut StepLog<EnrollmentStep>,
    ) -> Flow<Position> {
        log.transition_to(EnrollmentStep::AllocatePosition)?;
        let position = self.allocate_position(sensor).await?;
        self.notify(&DisplayMessages::using_position(position)).await;

        log.transition_to(EnrollmentStep::WaitPress1)?;
        self.notify(DisplayMessages::PLACE_FINGER).await;
        self.await_presence(sensor, self.config.press_timeout, true)
            .await?;

        log.transition_to(EnrollmentStep::Capture1)?;
        sensor.generate_character_file(CharBuffer::One).await?;

        log.transition_to(EnrollmentStep::WaitRelease)?;
        self.notify(DisplayMessages::LIFT_FINGER).await;
        self.await_presence(sensor, self.config.release_timeout, false)
            .await?;

        log.transition_to(EnrollmentStep::WaitPress2)?;
        self.notify(DisplayMessages::PLACE_FINGER_AGAIN).await;
        self.await_presence(sensor, self.config.press_timeout, true)
            .await?;

        log.transition_to(EnrollmentStep::Capture2)?;
        sensor.generate_character_file(CharBuffer::Two).await?;

        log.transition_to(EnrollmentStep::Merge)?;
        sensor.merge_character_files().await?;

        log.transition_to(EnrollmentStep::Store)?;
        match sensor.store_template(position).await {
            Ok(()) => {
                info!(%position, "Template stored");
                Ok(position)
            }
            Err(e) if e.is_library_full() => Err(Stop::Interrupt(Interrupt::LibraryFull)),
            Err(e) => Err(e.into()),
        }
    }

    async fn allocate_position<T: Transport>(&self, sensor: &mut Sensor<T>) -> Flow<Position> {
        match sensor.next_free_position().await {
            Ok(Some(position)) => Ok(position),
            Ok(None) => Err(Stop::Interrupt(Interrupt::LibraryFull)),
            Err(e) => match self.config.allocation_fallback {
                AllocationFallback::Fixed(position) => {
                    warn!(error = %e, %position, "Occupancy unreadable, using fallback position");
                    Ok(position)
                }
                AllocationFallback::Abort => Err(e.into()),
            },
        }
    }

    async fn await_presence<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        timeout: Duration,
        press: bool,
    ) -> Flow<()> {
        let presence = if press {
            self.detector.wait_for_press(sensor, timeout).await
        } else {
            self.detector.wait_for_release(sensor, timeout).await
        };
        match presence {
            Presence::Detected(_) => Ok(()),
            Presence::TimedOut => Err(Stop::Interrupt(Interrupt::TimedOut)),
            Presence::Cancelled => Err(Stop::Interrupt(Interrupt::Cancelled)),
        }
    }

    async fn publish_identity(
        &self,
        log: &mut StepLog<EnrollmentStep>,
        position: Position,
        request: &EnrollmentRequest,
    ) -> EnrollmentOutcome {
        let timestamp = self.clock.now_millis();
        let identity = IdentityRecord::enrolled(
            position,
            timestamp,
            &request.profile,
            self.config.registered_by.as_str(),
        );

        let written = self.write_identity(log, position, &identity).await;
        match written {
            Ok(()) => {
                info!(%position, usuario_id = %identity.usuario_id, "Identity enrolled");
                EnrollmentOutcome::Enrolled { position, identity }
            }
            Err(e) => {
                log.abort(EnrollmentStep::Aborted);
                error!(
                    %position,
                    usuario_id = %identity.usuario_id,
                    error = %e,
                    "Template stored but identity could not be published"
                );
                EnrollmentOutcome::StoredUnindexed {
                    position,
                    usuario_id: identity.usuario_id,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn write_identity(
        &self,
        log: &mut StepLog<EnrollmentStep>,
        position: Position,
        identity: &IdentityRecord,
    ) -> EngineResult<()> {
        log.transition_to(EnrollmentStep::PublishIdentity)?;
        self.directory.save_identity(identity).await?;
        let index = IndexRecord::new(identity.usuario_id.clone(), identity.nombre.clone());
        self.directory.save_index(position, &index).await?;
        log.transition_to(EnrollmentStep::Done)?;
        Ok(())
    }
}
