//! Typed access to the identity tree.
//!
//! | Path | Record |
//! |---|---|
//! | `usuarios/{usuario_id}` | [`IdentityRecord`] |
//! | `indices_sensor/{position}` | [`IndexRecord`] |
//! | `registros_acceso/acceso_{ts}` | [`AccessEvent`] |
//! | `intentos_fallidos/{ts}` | [`FailedAttempt`] |
//! | `sincronizacion/ultimo_reporte` | [`SyncReport`] |
//! | `display` | [`DisplayStatus`] |

use crate::models::{
    AccessEvent, DisplayStatus, FailedAttempt, IdentityRecord, IndexRecord, SyncReport,
};
use crate::{RemoteStore, StorageError, StorageResult};
use fingerlink_core::Position;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub const IDENTITIES: &str = "usuarios";
pub const INDEX: &str = "indices_sensor";
pub const DISPLAY: &str = "display";

/// Typed client over a [`RemoteStore`].
///
/// # Example
///
/// ```
/// use fingerlink_core::Position;
/// use fingerlink_storage::{Directory, MemoryStore, models::IndexRecord};
///
/// #[tokio::main]
/// async fn main() -> fingerlink_storage::StorageResult<()> {
///     let directory = Directory::new(MemoryStore::new());
///     directory
///         .save_index(Position::from(2), &IndexRecord::new("user_2_1", "Ana"))
///         .await?;
///
///     let positions = directory.indexed_positions().await?;
///     assert!(positions.contains(&Position::from(2)));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Directory<S> {
    store: S,
}

impl<S: RemoteStore> Directory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> StorageResult<Option<T>> {
        match self.store.get(path).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::invalid_document(path, e.to_string())),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, path: &str, record: &T) -> StorageResult<()> {
        let document = serde_json::to_value(record)?;
        self.store.put(path, &document).await
    }

    pub fn identity_path(usuario_id: &str) -> String {
        format!("{IDENTITIES}/{usuario_id}")
    }

    pub fn index_path(position: Position) -> String {
        format!("{INDEX}/{position}")
    }

    pub async fn save_identity(&self, record: &IdentityRecord) -> StorageResult<()> {
        debug!(usuario_id = %record.usuario_id, "Saving identity record");
        self.write(&Self::identity_path(&record.usuario_id), record)
            .await
    }

    pub async fn find_identity(&self, usuario_id: &str) -> StorageResult<Option<IdentityRecord>> {
        self.fetch(&Self::identity_path(usuario_id)).await
    }

    pub async fn save_index(&self, position: Position, record: &IndexRecord) -> StorageResult<()> {
        debug!(%position, "Saving index record");
        self.write(&Self::index_path(position), record).await
    }

    pub async fn find_index(&self, position: Position) -> StorageResult<Option<IndexRecord>> {
        self.fetch(&Self::index_path(position)).await
    }

    /// Every position that has an index record.
    ///
    /// An absent index is an empty set. Keys that are not decimal positions
    /// in the library range are ignored.
    ///
    /// # Errors
    ///
    /// Returns the store error if the index could not be read, and
    /// `StorageError::InvalidDocument` if it is neither an object nor an array.
    pub async fn indexed_positions(&self) -> StorageResult<BTreeSet<Position>> {
        let Some(document) = self.store.get(INDEX).await? else {
            return Ok(BTreeSet::new());
        };

        let positions = match document {
            Value::Object(map) => map
                .keys()
                .filter_map(|key| parse_index_key(key))
                .collect(),
            // Dense numeric keys come back as an array with nulls for gaps
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .filter_map(|(i, _)| u16::try_from(i).ok())
                .filter_map(|i| Position::new(i).ok())
                .collect(),
            other => {
                return Err(StorageError::invalid_document(
                    INDEX,
                    format!("expected an object, found {other}"),
                ));
            }
        };

        Ok(positions)
    }

    pub async fn record_access(&self, event: &AccessEvent) -> StorageResult<()> {
        self.write(&event.path(), event).await
    }

    pub async fn record_failed_attempt(&self, attempt: &FailedAttempt) -> StorageResult<()> {
        self.write(&attempt.path(), attempt).await
    }

    pub async fn save_sync_report(&self, report: &SyncReport) -> StorageResult<()> {
        self.write(SyncReport::PATH, report).await
    }

    /// Mirror a status line to the console.
    pub async fn publish_display(&self, mensaje: &str) -> StorageResult<()> {
        self.write(
            DISPLAY,
            &DisplayStatus {
                mensaje: mensaje.to_string(),
            },
        )
        .await
    }
}

fn parse_index_key(key: &str) -> Option<Position> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match key.parse::<u16>().ok().and_then(|n| Position::new(n).ok()) {
        Some(position) => Some(position),
        None => {
            warn!(key, "Ignoring index entry outside the sensor library");
            None
        }
    }
}
