use crate::models::identity::default_true;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Position-keyed pointer to an identity, stored at `indices_sensor/{position}`.
///
/// A position is "indexed" when this record exists, whatever `activo` says.
/// A record written without `activo` reads as active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usuario_id: Option<String>,
    #[serde(default = "unknown_name")]
    pub nombre: String,
    #[serde(default = "default_true")]
    pub activo: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_name() -> String {
    IndexRecord::UNKNOWN_NAME.to_string()
}

impl IndexRecord {
    pub const UNKNOWN_NAME: &'static str = "Desconocido";

    pub fn new(usuario_id: impl Into<String>, nombre: impl Into<String>) -> Self {
        Self {
            usuario_id: Some(usuario_id.into()),
            nombre: nombre.into(),
            activo: true,
            extra: Map::new(),
        }
    }
}
