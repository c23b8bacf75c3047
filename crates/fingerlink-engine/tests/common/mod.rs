#![allow(dead_code)]

use fingerlink_core::{ManualClock, Position};
use fingerlink_engine::{EngineConfig, Station};
use fingerlink_hardware::mock::{MockSensor, MockSensorHandle};
use fingerlink_hardware::{Sensor, SensorConfig};
use fingerlink_storage::{Directory, MemoryStore};
use serde_json::json;
use std::time::Duration;

pub const START_MILLIS: i64 = 1_700_000_000_000;
pub const SETTLE: Duration = Duration::from_millis(50);
pub const POLL: Duration = Duration::from_millis(100);
pub const PAUSE: Duration = Duration::from_millis(300);

pub struct Rig {
    pub sensor: Sensor<MockSensor>,
    pub module: MockSensorHandle,
    pub store: MemoryStore,
    pub station: Station<MemoryStore, ManualClock>,
}

pub fn engine_config() -> EngineConfig {
    EngineConfig::default()
        .with_press_timeout(Duration::from_secs(2))
        .with_release_timeout(Duration::from_secs(2))
        .with_poll_interval(POLL)
        .with_deletion_pause(PAUSE)
}

pub fn rig() -> Rig {
    rig_with(engine_config())
}

pub fn rig_with(config: EngineConfig) -> Rig {
    let (module, handle) = MockSensor::new();
    let sensor = Sensor::new(module, &SensorConfig::default().with_settle_delay(SETTLE));
    let store = MemoryStore::new();
    let station = Station::new(Directory::new(store.clone()), config)
        .with_clock(ManualClock::new(START_MILLIS));
    Rig {
        sensor,
        module: handle,
        store,
        station,
    }
}

/// Claim `position` in the remote index.
pub fn claim(store: &MemoryStore, position: u8, usuario_id: &str, nombre: &str, activo: bool) {
    store.seed(
        &format!("indices_sensor/{position}"),
        json!({"usuario_id": usuario_id, "nombre": nombre, "activo": activo}),
    );
}

pub fn positions(values: &[u8]) -> Vec<Position> {
    values.iter().copied().map(Position::from).collect()
}
