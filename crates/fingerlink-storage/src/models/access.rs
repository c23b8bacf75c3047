use fingerlink_core::Position;
use serde::{Deserialize, Serialize};

/// Value of `tipo_acceso` on access records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKind {
    #[serde(rename = "entrada")]
    Entry,
    #[serde(rename = "entrada_denegada")]
    EntryDenied,
}

/// Why an identification attempt was logged as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// A template matched but its position has no index record.
    #[serde(rename = "no_autorizado")]
    Unindexed,
    /// No stored template matched.
    #[serde(rename = "sin_coincidencia")]
    NoMatch,
}

/// Identified person at the sensor, stored at `registros_acceso/acceso_{timestamp}`.
///
/// `autorizado` mirrors the index record's `activo` flag: an inactive person
/// still produces an access event, just not an authorized one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub usuario_id: Option<String>,
    pub id_sensor: Position,
    pub nombre: String,
    pub timestamp: i64,
    pub score: u16,
    pub autorizado: bool,
    pub tipo_acceso: AccessKind,
}

impl AccessEvent {
    pub fn path(&self) -> String {
        format!("registros_acceso/acceso_{}", self.timestamp)
    }
}

/// Identification that could not be attributed, stored at `intentos_fallidos/{timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub timestamp: i64,
    pub resultado: FailureReason,
    pub tipo_acceso: AccessKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_sensor: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u16>,
}

impl FailedAttempt {
    /// No stored template matched the finger.
    pub fn no_match(timestamp: i64) -> Self {
        Self {
            timestamp,
            resultado: FailureReason::NoMatch,
            tipo_acceso: AccessKind::EntryDenied,
            id_sensor: None,
            score: None,
        }
    }

    /// A template matched at `position` but nobody claims it.
    pub fn unindexed(timestamp: i64, position: Position, score: u16) -> Self {
        Self {
            timestamp,
            resultado: FailureReason::Unindexed,
            tipo_acceso: AccessKind::EntryDenied,
            id_sensor: Some(position),
            score: Some(score),
        }
    }

    pub fn path(&self) -> String {
        format!("intentos_fallidos/{}", self.timestamp)
    }
}

/// Status line mirrored to the `display` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayStatus {
    pub mensaje: String,
}
