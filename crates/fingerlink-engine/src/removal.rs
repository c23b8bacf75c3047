//! Deleting one template and retiring whoever owned it.
//!
//! Remote records are deactivated, never deleted, so access history keeps
//! pointing at a real person.

use crate::Station;
use fingerlink_core::{Clock, Position};
use fingerlink_hardware::{Sensor, Transport};
use fingerlink_storage::RemoteStore;
use fingerlink_storage::messages::DisplayMessages;
use fingerlink_storage::models::{IdentityRecord, IndexRecord};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// Template deleted.
    ///
    /// `usuario_id` names the deactivated person when the slot was claimed.
    /// `remote_updated` is false if the owner could not be read or a
    /// deactivation write failed.
    Removed {
        position: Position,
        usuario_id: Option<String>,
        remote_updated: bool,
    },

    /// The module refused the deletion; remote data was not touched.
    Failed { position: Position, message: String },
}

impl RemovalOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Removed { position, .. } => format!("{} {position}", DisplayMessages::DELETED),
            Self::Failed { message, .. } => message.clone(),
        }
    }
}

/// Remote records found for a slot before deleting it.
struct Owner {
    index: Option<IndexRecord>,
    identity: Option<IdentityRecord>,
    complete: bool,
}

impl<S: RemoteStore, C: Clock> Station<S, C> {
    /// Delete the template at `position` and deactivate its owner.
    pub async fn remove<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        position: Position,
    ) -> RemovalOutcome {
        let owner = self.lookup_owner(position).await;

        let outcome = match sensor.delete_template(position).await {
            Ok(()) => {
                info!(%position, "Template deleted");
                let usuario_id = owner.index.as_ref().and_then(|i| i.usuario_id.clone());
                let remote_updated = self.deactivate(position, owner).await;
                RemovalOutcome::Removed {
                    position,
                    usuario_id,
                    remote_updated,
                }
            }
            Err(e) => {
                warn!(%position, error = %e, "Module refused to delete template");
                RemovalOutcome::Failed {
                    position,
                    message: e.to_string(),
                }
            }
        };

        self.notify(&outcome.message()).await;
        outcome
    }

    /// Index and identity records for `position`.
    ///
    /// Unreadable records count as absent; `complete` records whether every read succeeded.
    async fn lookup_owner(&self, position: Position) -> Owner {
        let mut owner = Owner {
            index: None,
            identity: None,
            complete: true,
        };

        match self.directory.find_index(position).await {
            Ok(index) => owner.index = index,
            Err(e) => {
                warn!(%position, error = %e, "Could not read index entry");
                owner.complete = false;
                return owner;
            }
        }

        let Some(usuario_id) = owner.index.as_ref().and_then(|i| i.usuario_id.clone()) else {
            return owner;
        };

        match self.directory.find_identity(&usuario_id).await {
            Ok(identity) => owner.identity = identity,
            Err(e) => {
                warn!(%usuario_id, error = %e, "Could not read identity record");
                owner.complete = false;
            }
        }
        owner
    }

    /// Returns false unless every record the slot may have had was deactivated.
    async fn deactivate(&self, position: Position, owner: Owner) -> bool {
        let timestamp = self.clock.now_millis();
        let mut updated = owner.complete;

        if let Some(mut identity) = owner.identity {
            identity.deactivate(timestamp);
            if let Err(e) = self.directory.save_identity(&identity).await {
                warn!(usuario_id = %identity.usuario_id, error = %e, "Failed to deactivate identity");
                updated = false;
            }
        }

        if let Some(mut index) = owner.index {
            index.activo = false;
            if let Err(e) = self.directory.save_index(position, &index).await {
                warn!(%position, error = %e, "Failed to deactivate index entry");
                updated = false;
            }
        }

        updated
    }
}
