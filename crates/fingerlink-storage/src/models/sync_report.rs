use fingerlink_core::Position;
use serde::{Deserialize, Serialize};

/// Outcome of one reconciliation run, stored at `sincronizacion/ultimo_reporte`.
///
/// Counts are taken from the sensor before and after deletions;
/// `huellas_huerfanas_restantes` lists the positions still occupied but
/// unindexed at the end. `sincronizacion_exitosa` is true only when that list
/// is empty and the final occupancy could be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub posiciones_sensor_inicial: usize,
    pub posiciones_firebase: usize,
    pub huellas_identificadas_eliminar: usize,
    pub huellas_eliminadas_exitosamente: usize,
    pub errores_eliminacion: usize,
    pub posiciones_sensor_final: usize,
    pub huellas_huerfanas_restantes: Vec<Position>,
    pub sincronizacion_exitosa: bool,
    pub timestamp: i64,
}

impl SyncReport {
    pub const PATH: &'static str = "sincronizacion/ultimo_reporte";
}
