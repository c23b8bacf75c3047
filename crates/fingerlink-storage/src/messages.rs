//! Status lines mirrored to the `display` document.
//!
//! The web console shows whatever is in `display/mensaje` next to the
//! sensor. Messages are in Spanish to match the deployed console and are kept
//! ASCII-only so they render on the small status panel as well.
//!
//! # Usage
//!
//! ```
//! use fingerlink_storage::messages::DisplayMessages;
//! use fingerlink_core::Position;
//!
//! assert_eq!(DisplayMessages::PLACE_FINGER, "Coloque el dedo");
//! assert_eq!(DisplayMessages::using_position(Position::from(4)), "Usando posicion: 4");
//! ```

use fingerlink_core::Position;

/// Status messages (Spanish)
pub struct DisplayMessages;

impl DisplayMessages {
    /// First capture of an enrollment
    pub const PLACE_FINGER: &'static str = "Coloque el dedo";

    /// Second capture of an enrollment
    pub const PLACE_FINGER_AGAIN: &'static str = "Coloque el dedo nuevamente";

    /// Between the two enrollment captures
    pub const LIFT_FINGER: &'static str = "Retire el dedo";

    /// Identification waiting for a finger
    pub const WAITING_FOR_FINGER: &'static str = "Esperando huella";

    /// No finger arrived before the deadline
    pub const PRESS_TIMEOUT: &'static str = "Tiempo de espera agotado";

    /// Finger stayed on the window past the deadline
    pub const RELEASE_TIMEOUT: &'static str =
        "Tiempo de espera agotado. El dedo no fue levantado.";

    /// Template stored and published
    pub const ENROLLED: &'static str = "Huella registrada";

    /// Template stored but the remote records could not be written
    pub const ENROLLED_UNINDEXED: &'static str = "Huella guardada, error al registrar usuario";

    /// Enrollment aborted
    pub const ENROLL_FAILED: &'static str = "Error al registrar huella";

    /// Library has no free slot
    pub const LIBRARY_FULL: &'static str = "Sensor lleno";

    /// Active identity identified
    pub const ACCESS_GRANTED: &'static str = "Acceso autorizado";

    /// Identity exists but is inactive
    pub const ACCESS_DENIED_INACTIVE: &'static str = "Acceso denegado: usuario inactivo";

    /// Template matched but no one claims it
    pub const ACCESS_DENIED_UNREGISTERED: &'static str = "Acceso denegado: huella sin registro";

    /// No template matched
    pub const NO_MATCH: &'static str = "Huella no reconocida";

    /// Template removed from the sensor
    pub const DELETED: &'static str = "Huella eliminada";

    /// Reconciliation running
    pub const SYNCING: &'static str = "Sincronizando";

    /// Reconciliation left nothing behind
    pub const SYNC_OK: &'static str = "Sincronizacion exitosa";

    /// Reconciliation left orphans or could not run
    pub const SYNC_INCOMPLETE: &'static str = "Sincronizacion incompleta";

    /// Operator stopped the running operation
    pub const CANCELLED: &'static str = "Operacion cancelada";

    /// Module did not answer a connection test
    pub const SENSOR_UNREACHABLE: &'static str = "Sensor no responde";

    /// Announces the slot an enrollment will use.
    pub fn using_position(position: Position) -> String {
        format!("Usando posicion: {position}")
    }

    /// Greets an identified person.
    pub fn welcome(nombre: &str) -> String {
        format!("Bienvenido {nombre}")
    }
}
