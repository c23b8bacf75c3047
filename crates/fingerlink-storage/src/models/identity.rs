use fingerlink_core::Position;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Descriptive fields a caller may supply when enrolling someone.
///
/// Anything left unset is filled with the placeholders the web console
/// expects to replace later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
}

impl Profile {
    pub const PLACEHOLDER_APELLIDO: &'static str = "Pendiente";
    pub const PLACEHOLDER_EMAIL: &'static str = "pendiente@email.com";

    pub fn with_nombre(mut self, nombre: impl Into<String>) -> Self {
        self.nombre = Some(nombre.into());
        self
    }

    pub fn with_apellido(mut self, apellido: impl Into<String>) -> Self {
        self.apellido = Some(apellido.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Person claiming a sensor position, stored at `usuarios/{usuario_id}`.
///
/// # Fields
///
/// * `id_sensor` - Library position holding this person's template
/// * `usuario_id` - `user_{position}_{timestamp}`
/// * `activo` - Whether the person is currently authorized
/// * `fecha_registro` - Enrollment time, milliseconds since the epoch
/// * `registrado_por` - Which device or tool enrolled them
/// * `fecha_eliminacion` - Set when the template is removed
///
/// Fields added by other tools are kept in `extra` and written back
/// untouched.
///
/// # Examples
///
/// ```
/// use fingerlink_core::Position;
/// use fingerlink_storage::models::{IdentityRecord, Profile};
///
/// let record = IdentityRecord::enrolled(
///     Position::from(3),
///     1_700_000_000_000,
///     &Profile::default(),
///     "fingerlink",
/// );
/// assert_eq!(record.usuario_id, "user_3_1700000000000");
/// assert_eq!(record.nombre, "Usuario_3");
/// assert!(record.activo);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id_sensor: Position,
    pub usuario_id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub activo: bool,
    pub fecha_registro: i64,
    #[serde(default)]
    pub registrado_por: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha_eliminacion: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub(crate) fn default_true() -> bool {
    true
}

impl IdentityRecord {
    /// Identifier derived from the position and enrollment time.
    pub fn identity_id(position: Position, timestamp: i64) -> String {
        format!("user_{position}_{timestamp}")
    }

    /// Placeholder display name for a position.
    pub fn default_name(position: Position) -> String {
        format!("Usuario_{position}")
    }

    /// Fresh, active record for a template just stored at `position`.
    pub fn enrolled(
        position: Position,
        timestamp: i64,
        profile: &Profile,
        registered_by: impl Into<String>,
    ) -> Self {
        Self {
            id_sensor: position,
            usuario_id: Self::identity_id(position, timestamp),
            nombre: profile
                .nombre
                .clone()
                .unwrap_or_else(|| Self::default_name(position)),
            apellido: profile
                .apellido
                .clone()
                .unwrap_or_else(|| Profile::PLACEHOLDER_APELLIDO.to_string()),
            email: profile
                .email
                .clone()
                .unwrap_or_else(|| Profile::PLACEHOLDER_EMAIL.to_string()),
            activo: true,
            fecha_registro: timestamp,
            registrado_por: registered_by.into(),
            fecha_eliminacion: None,
            extra: Map::new(),
        }
    }

    /// Mark the person as no longer authorized.
    pub fn deactivate(&mut self, timestamp: i64) {
        self.activo = false;
        self.fecha_eliminacion = Some(timestamp);
    }
}
