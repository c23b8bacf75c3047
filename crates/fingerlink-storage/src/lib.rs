//! Remote identity store for the fingerprint station.
//!
//! The sensor only knows which library slots are occupied. Who owns a slot
//! lives in a remote JSON tree (a Firebase-style realtime database):
//!
//! - [`RemoteStore`] is the narrow get/put interface to that tree.
//! - [`FirebaseStore`] speaks its REST API over `reqwest`.
//! - [`MemoryStore`] keeps the tree in process for tests and offline runs.
//! - [`Directory`] reads and writes the typed [`models`].
//! - [`messages::DisplayMessages`] holds the status lines shown on the console.

pub mod config;
pub mod directory;
pub mod error;
pub mod firebase;
pub mod memory;
pub mod messages;
pub mod models;
pub mod store;

pub use config::StoreConfig;
pub use directory::Directory;
pub use error::{StorageError, StorageResult};
pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use store::RemoteStore;
