//! Listing what the sensor holds and who claims it.

use crate::{EngineResult, Station};
use fingerlink_core::{Clock, Position};
use fingerlink_hardware::{Sensor, Transport};
use fingerlink_storage::RemoteStore;
use fingerlink_storage::messages::DisplayMessages;
use fingerlink_storage::models::IndexRecord;
use tracing::{info, warn};

/// One occupied slot.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub position: Position,
    /// `None` when the slot has no readable index entry.
    pub index: Option<IndexRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub entries: Vec<InventoryEntry>,
}

impl Inventory {
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Occupied slots without an index entry.
    pub fn unclaimed(&self) -> impl Iterator<Item = Position> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.index.is_none())
            .map(|entry| entry.position)
    }
}

impl<S: RemoteStore, C: Clock> Station<S, C> {
    /// Ping the module.
    ///
    /// # Errors
    ///
    /// Returns the sensor error if the module does not acknowledge.
    pub async fn check_connection<T: Transport>(&self, sensor: &mut Sensor<T>) -> EngineResult<()> {
        match sensor.ping().await {
            Ok(()) => {
                info!("Sensor connected");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sensor did not answer ping");
                self.notify(DisplayMessages::SENSOR_UNREACHABLE).await;
                Err(e.into())
            }
        }
    }

    /// Occupied positions joined with their index entries.
    ///
    /// An index entry that cannot be read is listed as `None`.
    ///
    /// # Errors
    ///
    /// Fails if the occupancy bitmap cannot be read.
    pub async fn inventory<T: Transport>(&self, sensor: &mut Sensor<T>) -> EngineResult<Inventory> {
        let bitmap = sensor.read_occupancy_bitmap().await?;

        let mut entries = Vec::with_capacity(bitmap.count());
        for position in bitmap.occupied() {
            let index = match self.directory.find_index(position).await {
                Ok(index) => index,
                Err(e) => {
                    warn!(%position, error = %e, "Could not read index entry");
                    None
                }
            };
            entries.push(InventoryEntry { position, index });
        }

        info!(total = entries.len(), "Inventory read");
        Ok(Inventory { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclaimed() {
        let inventory = Inventory {
            entries: vec![
                InventoryEntry {
                    position: Position::from(1),
                    index: Some(IndexRecord::new("user_1_1", "Ana")),
                },
                InventoryEntry {
                    position: Position::from(7),
                    index: None,
                },
            ],
        };
        assert_eq!(inventory.total(), 2);
        assert_eq!(inventory.unclaimed().collect::<Vec<_>>(), vec![Position::from(7)]);
    }
}
