//! Simulated R307 module.
//!
//! The emulation keeps the state a real module has (image buffer, two
//! character buffers, a template library) and applies each received command
//! to it. Fingers are opaque ids: two captures of the same [`Finger`] merge
//! and match, different fingers do not.

use crate::{HardwareError, Result, traits::Transport};
use bytes::{Bytes, BytesMut};
use fingerlink_core::{
    CharBuffer, ConfirmationCode, OccupancyBitmap, Position, constants::LIBRARY_CAPACITY,
};
use fingerlink_protocol::{Command, Frame, Instruction, PacketKind, R307Codec};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Opaque identity of a simulated finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Finger(pub u32);

/// What the next image capture sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Finger(Finger),
    Empty,
}

/// Misbehaviour injected into the next command of a given instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer with this confirmation code without executing the command.
    Reject(ConfirmationCode),
    /// Execute nothing and send nothing back.
    Silence,
    /// Execute normally but damage the reply checksum.
    CorruptChecksum,
}

const NO_VALID_IMAGE: u8 = 0x15;

#[derive(Debug)]
struct ModuleState {
    touches: VecDeque<Touch>,
    image: Option<Finger>,
    buffers: [Option<Finger>; 2],
    library: BTreeMap<Position, Finger>,
    capacity: usize,
    match_score: u16,
    faults: HashMap<Instruction, VecDeque<Fault>>,
    protected: BTreeSet<Position>,
    history: Vec<Command>,
    outgoing: BytesMut,
    read_chunk: Option<usize>,
    connected: bool,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            touches: VecDeque::new(),
            image: None,
            buffers: [None, None],
            library: BTreeMap::new(),
            capacity: LIBRARY_CAPACITY,
            match_score: 100,
            faults: HashMap::new(),
            protected: BTreeSet::new(),
            history: Vec::new(),
            outgoing: BytesMut::new(),
            read_chunk: None,
            connected: true,
        }
    }
}

fn slot(buffer: CharBuffer) -> usize {
    match buffer {
        CharBuffer::One => 0,
        CharBuffer::Two => 1,
    }
}

impl ModuleState {
    /// Apply `command` and return the acknowledgement payload.
    fn apply(&mut self, command: Command) -> Vec<u8> {
        let ok = ConfirmationCode::Ok.as_u8();
        match command {
            Command::CaptureImage => match self.touches.pop_front().unwrap_or(Touch::Empty) {
                Touch::Finger(finger) => {
                    self.image = Some(finger);
                    vec![ok]
                }
                Touch::Empty => vec![ConfirmationCode::NoFinger.as_u8()],
            },
            Command::GenerateChar { buffer } => match self.image {
                Some(finger) => {
                    self.buffers[slot(buffer)] = Some(finger);
                    vec![ok]
                }
                None => vec![NO_VALID_IMAGE],
            },
            Command::RegisterModel => match self.buffers {
                [Some(first), Some(second)] if first == second => vec![ok],
                _ => vec![ConfirmationCode::MergeFailed.as_u8()],
            },
            Command::Store { buffer, position } => {
                if position.as_u16() as usize >= self.capacity {
                    return vec![ConfirmationCode::BeyondLibrary.as_u8()];
                }
                match self.buffers[slot(buffer)] {
                    Some(finger) => {
                        self.library.insert(position, finger);
                        vec![ok]
                    }
                    None => vec![ConfirmationCode::PacketError.as_u8()],
                }
            }
            Command::Search {
                buffer,
                start,
                count,
            } => {
                let Some(finger) = self.buffers[slot(buffer)] else {
                    return vec![ConfirmationCode::NotFound.as_u8()];
                };
                let end = start as u32 + count as u32;
                let hit = self.library.iter().find(|(position, stored)| {
                    let p = position.as_u16() as u32;
                    p >= start as u32 && p < end && **stored == finger
                });
                match hit {
                    Some((position, _)) => {
                        let mut payload = vec![ok];
                        payload.extend_from_slice(&position.to_be_bytes());
                        payload.extend_from_slice(&self.match_score.to_be_bytes());
                        payload
                    }
                    None => vec![ConfirmationCode::NotFound.as_u8()],
                }
            }
            Command::DeleteChar { position, count } => {
                let first = position.as_u16() as usize;
                let range = first..first + count as usize;
                let blocked = range.clone().any(|p| {
                    p >= self.capacity
                        || Position::new(p as u16).is_ok_and(|p| self.protected.contains(&p))
                });
                if blocked {
                    return vec![ConfirmationCode::DeleteFailed.as_u8()];
                }
                self.library
                    .retain(|stored, _| !range.contains(&(stored.as_u16() as usize)));
                vec![ok]
            }
            Command::Ping => vec![ok],
            Command::ReadIndexTable => {
                let bitmap: OccupancyBitmap = self.library.keys().copied().collect();
                let mut payload = vec![ok];
                payload.extend_from_slice(bitmap.as_bytes());
                payload
            }
        }
    }

    fn take_fault(&mut self, instruction: Instruction) -> Option<Fault> {
        self.faults.get_mut(&instruction)?.pop_front()
    }

    fn handle_frame(&mut self, frame: &Frame) -> Result<()> {
        let command = match Command::from_frame(frame) {
            Ok(command) => command,
            Err(e) => {
                trace!(error = %e, "Emulated sensor received unparseable command");
                return self.reply(vec![ConfirmationCode::PacketError.as_u8()], false);
            }
        };
        self.history.push(command);

        match self.take_fault(command.instruction()) {
            Some(Fault::Reject(code)) => self.reply(vec![code.as_u8()], false),
            Some(Fault::Silence) => Ok(()),
            Some(Fault::CorruptChecksum) => {
                let payload = self.apply(command);
                self.reply(payload, true)
            }
            None => {
                let payload = self.apply(command);
                self.reply(payload, false)
            }
        }
    }

    fn reply(&mut self, payload: Vec<u8>, corrupt: bool) -> Result<()> {
        let mut bytes = Frame::new(PacketKind::Ack, payload)?.to_bytes().to_vec();
        if corrupt && let Some(last) = bytes.last_mut() {
            *last ^= 0xFF;
        }
        self.outgoing.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Emulated fingerprint module.
///
/// # Examples
///
/// ```
/// use fingerlink_hardware::mock::{Finger, MockSensor};
/// use fingerlink_hardware::{Sensor, SensorConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> fingerlink_hardware::Result<()> {
///     let (module, handle) = MockSensor::new();
///     let config = SensorConfig::default().with_settle_delay(Duration::ZERO);
///     let mut sensor = Sensor::new(module, &config);
///
///     handle.enroll(fingerlink_core::Position::from(3), Finger(7));
///     let bitmap = sensor.read_occupancy_bitmap().await?;
///     assert_eq!(bitmap.count(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    state: Arc<Mutex<ModuleState>>,
}

impl MockSensor {
    /// Create an empty module and the handle that controls it.
    pub fn new() -> (Self, MockSensorHandle) {
        let state = Arc::new(Mutex::new(ModuleState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockSensorHandle { state },
        )
    }

    fn lock(&self) -> MutexGuard<'_, ModuleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new().0
    }
}

impl Transport for MockSensor {
    async fn clear_input(&mut self) -> Result<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(HardwareError::disconnected("emulated sensor"));
        }
        state.outgoing.clear();
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(HardwareError::disconnected("emulated sensor"));
        }

        let mut codec = R307Codec::new();
        let mut incoming = BytesMut::from(bytes);
        while let Some(frame) = codec.decode(&mut incoming)? {
            state.handle_frame(&frame)?;
        }
        Ok(())
    }

    async fn read(&mut self, max: usize) -> Result<Bytes> {
        let mut state = self.lock();
        if !state.connected {
            return Err(HardwareError::disconnected("emulated sensor"));
        }
        let limit = state.read_chunk.map_or(max, |chunk| chunk.min(max));
        let take = limit.min(state.outgoing.len());
        Ok(state.outgoing.split_to(take).freeze())
    }
}

/// Handle for scripting a [`MockSensor`].
///
/// Clones share the same module.
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    state: Arc<Mutex<ModuleState>>,
}

impl MockSensorHandle {
    fn lock(&self) -> MutexGuard<'_, ModuleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue what the next capture sees.
    pub fn queue(&self, touch: Touch) {
        self.lock().touches.push_back(touch);
    }

    /// Next capture sees `finger`.
    pub fn press(&self, finger: Finger) {
        self.queue(Touch::Finger(finger));
    }

    /// Next capture sees an empty window.
    pub fn lift(&self) {
        self.queue(Touch::Empty);
    }

    /// A press followed by a lift.
    pub fn touch(&self, finger: Finger) {
        self.press(finger);
        self.lift();
    }

    /// Captures still queued.
    pub fn pending_touches(&self) -> usize {
        self.lock().touches.len()
    }

    /// Put a template for `finger` directly into the library.
    pub fn enroll(&self, position: Position, finger: Finger) {
        self.lock().library.insert(position, finger);
    }

    /// Snapshot of the template library.
    pub fn library(&self) -> BTreeMap<Position, Finger> {
        self.lock().library.clone()
    }

    /// Occupied positions in ascending order.
    pub fn occupied(&self) -> Vec<Position> {
        self.lock().library.keys().copied().collect()
    }

    /// Shrink or grow the library; stores at or past `capacity` are rejected.
    pub fn set_capacity(&self, capacity: usize) {
        self.lock().capacity = capacity;
    }

    /// Score reported with every search hit.
    pub fn set_match_score(&self, score: u16) {
        self.lock().match_score = score;
    }

    /// Queue a fault for the next command of `instruction`.
    pub fn inject(&self, instruction: Instruction, fault: Fault) {
        self.lock()
            .faults
            .entry(instruction)
            .or_default()
            .push_back(fault);
    }

    /// Reject the next command of `instruction` with `code`.
    pub fn fail_next(&self, instruction: Instruction, code: ConfirmationCode) {
        self.inject(instruction, Fault::Reject(code));
    }

    /// Make deletion of `position` fail every time.
    pub fn protect(&self, position: Position) {
        self.lock().protected.insert(position);
    }

    /// Hand replies out at most `chunk` bytes per read.
    pub fn set_read_chunk(&self, chunk: usize) {
        self.lock().read_chunk = Some(chunk.max(1));
    }

    /// Drop the link; every transport call fails afterwards.
    pub fn disconnect(&self) {
        self.lock().connected = false;
    }

    /// Every command the module received, oldest first.
    pub fn commands(&self) -> Vec<Command> {
        self.lock().history.clone()
    }

    /// How many commands of `instruction` were received.
    pub fn count(&self, instruction: Instruction) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|command| command.instruction() == instruction)
            .count()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(state: &mut ModuleState, command: Command) -> Vec<u8> {
        state.apply(command)
    }

    #[test]
    fn test_capture_consumes_touches() {
        let mut state = ModuleState::default();
        state.touches.push_back(Touch::Finger(Finger(1)));

        assert_eq!(run(&mut state, Command::CaptureImage), vec![0x00]);
        assert_eq!(run(&mut state, Command::CaptureImage), vec![0x02]);
        assert_eq!(state.image, Some(Finger(1)));
    }

    #[test]
    fn test_merge_requires_same_finger() {
        let mut state = ModuleState::default();
        state.buffers = [Some(Finger(1)), Some(Finger(2))];
        assert_eq!(run(&mut state, Command::RegisterModel), vec![0x0A]);

        state.buffers = [Some(Finger(1)), Some(Finger(1))];
        assert_eq!(run(&mut state, Command::RegisterModel), vec![0x00]);
    }

    #[test]
    fn test_store_beyond_capacity() {
        let mut state = ModuleState {
            capacity: 10,
            buffers: [Some(Finger(1)), None],
            ..ModuleState::default()
        };
        let reply = run(
            &mut state,
            Command::Store {
                buffer: CharBuffer::One,
                position: Position::from(10),
            },
        );
        assert_eq!(reply, vec![0x0B]);
        assert!(state.library.is_empty());
    }

    #[test]
    fn test_search_respects_range() {
        let mut state = ModuleState::default();
        state.library.insert(Position::from(40), Finger(9));
        state.buffers = [Some(Finger(9)), None];

        let miss = run(
            &mut state,
            Command::Search {
                buffer: CharBuffer::One,
                start: 0,
                count: 40,
            },
        );
        assert_eq!(miss, vec![0x09]);

        let hit = run(
            &mut state,
            Command::Search {
                buffer: CharBuffer::One,
                start: 0,
                count: 256,
            },
        );
        assert_eq!(hit, vec![0x00, 0x00, 40, 0x00, 100]);
    }

    #[test]
    fn test_protected_position_refuses_deletion() {
        let mut state = ModuleState::default();
        state.library.insert(Position::from(5), Finger(1));
        state.protected.insert(Position::from(5));

        let reply = run(
            &mut state,
            Command::DeleteChar {
                position: Position::from(5),
                count: 1,
            },
        );
        assert_eq!(reply, vec![0x10]);
        assert!(state.library.contains_key(&Position::from(5)));
    }

    #[tokio::test]
    async fn test_silence_fault_sends_nothing() {
        let (mut module, handle) = MockSensor::new();
        handle.inject(Instruction::Ping, Fault::Silence);

        let frame = Command::Ping.to_frame(fingerlink_core::constants::DEFAULT_ADDRESS);
        module.write(&frame.to_bytes()).await.unwrap();
        assert!(module.read(64).await.unwrap().is_empty());
        assert_eq!(handle.count(Instruction::Ping), 1);
    }
}
