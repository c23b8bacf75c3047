pub mod access;
pub mod identity;
pub mod index;
pub mod sync_report;

pub use access::{AccessEvent, AccessKind, DisplayStatus, FailedAttempt, FailureReason};
pub use identity::{IdentityRecord, Profile};
pub use index::IndexRecord;
pub use sync_report::SyncReport;
