//! Station engines for an R307 fingerprint reader.
//!
//! A [`Station`] ties the sensor to the remote directory and runs the
//! operator-facing sequences:
//!
//! - [`Station::enroll`] captures a finger twice and stores a new template.
//! - [`Station::identify`] searches the library and records the access.
//! - [`Station::reconcile`] deletes templates nobody claims.
//! - [`Station::remove`] deletes one template and deactivates its owner.
//! - [`Station::inventory`] and [`Station::check_connection`] report state.
//!
//! Operations are strictly sequential: each one borrows the sensor mutably
//! for its whole duration.

pub mod config;
pub mod enrollment;
pub mod error;
pub mod identification;
pub mod inventory;
pub mod reconciliation;
pub mod removal;
pub mod station;
pub mod steps;

pub use config::{AllocationFallback, EngineConfig};
pub use enrollment::{EnrollmentOutcome, EnrollmentRequest};
pub use error::{EngineError, EngineResult};
pub use identification::{IdentificationOutcome, Identified};
pub use inventory::{Inventory, InventoryEntry};
pub use reconciliation::ReconciliationOutcome;
pub use removal::RemovalOutcome;
pub use station::Station;
