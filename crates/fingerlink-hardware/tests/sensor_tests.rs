//! Template commands driven end to end through the emulated module.

use fingerlink_core::{CharBuffer, ConfirmationCode, Position};
use fingerlink_hardware::mock::{Fault, Finger, MockSensor, MockSensorHandle};
use fingerlink_hardware::{HardwareError, Sensor, SensorConfig};
use fingerlink_protocol::{Command, Instruction};
use rstest::rstest;
use std::time::Duration;

fn sensor() -> (Sensor<MockSensor>, MockSensorHandle) {
    let (module, handle) = MockSensor::new();
    let config = SensorConfig::default().with_settle_delay(Duration::from_millis(500));
    (Sensor::new(module, &config), handle)
}

#[tokio::test(start_paused = true)]
async fn test_enroll_sequence_stores_template() {
    let (mut sensor, handle) = sensor();
    handle.press(Finger(4));
    handle.press(Finger(4));

    sensor.capture_image().await.unwrap();
    sensor.generate_character_file(CharBuffer::One).await.unwrap();
    sensor.capture_image().await.unwrap();
    sensor.generate_character_file(CharBuffer::Two).await.unwrap();
    sensor.merge_character_files().await.unwrap();
    sensor.store_template(Position::from(12)).await.unwrap();

    assert_eq!(handle.library().get(&Position::from(12)), Some(&Finger(4)));
}

#[tokio::test(start_paused = true)]
async fn test_merge_of_different_fingers_fails() {
    let (mut sensor, handle) = sensor();
    handle.press(Finger(1));
    handle.press(Finger(2));

    sensor.capture_image().await.unwrap();
    sensor.generate_character_file(CharBuffer::One).await.unwrap();
    sensor.capture_image().await.unwrap();
    sensor.generate_character_file(CharBuffer::Two).await.unwrap();

    let error = sensor.merge_character_files().await.unwrap_err();
    assert_eq!(error.device_code(), Some(ConfirmationCode::MergeFailed));
}

#[tokio::test(start_paused = true)]
async fn test_capture_without_finger_reports_code() {
    let (mut sensor, _handle) = sensor();
    let error = sensor.capture_image().await.unwrap_err();
    assert_eq!(error.device_code(), Some(ConfirmationCode::NoFinger));
}

#[tokio::test(start_paused = true)]
async fn test_search_hit_and_miss() {
    let (mut sensor, handle) = sensor();
    handle.enroll(Position::from(130), Finger(8));
    handle.set_match_score(87);

    handle.press(Finger(8));
    sensor.capture_image().await.unwrap();
    sensor.generate_character_file(CharBuffer::One).await.unwrap();
    let hit = sensor.search_library().await.unwrap().unwrap();
    assert_eq!(hit.position, Position::from(130));
    assert_eq!(hit.score, 87);

    handle.press(Finger(9));
    sensor.capture_image().await.unwrap();
    sensor.generate_character_file(CharBuffer::One).await.unwrap();
    assert_eq!(sensor.search_library().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_search_covers_full_library() {
    let (mut sensor, handle) = sensor();
    sensor.search_library().await.unwrap();

    assert_eq!(
        handle.commands(),
        vec![Command::Search {
            buffer: CharBuffer::One,
            start: 0,
            count: 256,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_occupancy_bitmap_and_next_free() {
    let (mut sensor, handle) = sensor();
    for position in [0, 1, 3] {
        handle.enroll(Position::from(position), Finger(position as u32));
    }

    let bitmap = sensor.read_occupancy_bitmap().await.unwrap();
    let occupied: Vec<u8> = bitmap.occupied().map(|p| p.as_u8()).collect();
    assert_eq!(occupied, vec![0, 1, 3]);
    assert_eq!(
        sensor.next_free_position().await.unwrap(),
        Some(Position::from(2))
    );
}

#[tokio::test(start_paused = true)]
async fn test_full_library_has_no_free_position() {
    let (mut sensor, handle) = sensor();
    for position in 0..=255u8 {
        handle.enroll(Position::from(position), Finger(1));
    }
    assert_eq!(sensor.next_free_position().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_delete_template() {
    let (mut sensor, handle) = sensor();
    handle.enroll(Position::from(5), Finger(1));

    sensor.delete_template(Position::from(5)).await.unwrap();
    assert!(handle.library().is_empty());

    handle.enroll(Position::from(6), Finger(2));
    handle.protect(Position::from(6));
    let error = sensor.delete_template(Position::from(6)).await.unwrap_err();
    assert_eq!(error.device_code(), Some(ConfirmationCode::DeleteFailed));
}

#[rstest]
#[case::busy(ConfirmationCode::Other(0x20))]
#[case::flash(ConfirmationCode::FlashError)]
#[tokio::test(start_paused = true)]
async fn test_rejection_is_not_retried(#[case] code: ConfirmationCode) {
    let (mut sensor, handle) = sensor();
    handle.fail_next(Instruction::Ping, code);

    let error = sensor.ping().await.unwrap_err();
    assert_eq!(error.device_code(), Some(code));
    assert_eq!(handle.count(Instruction::Ping), 1);
}

#[tokio::test(start_paused = true)]
async fn test_silent_module_times_out() {
    let (mut sensor, handle) = sensor();
    handle.inject(Instruction::Ping, Fault::Silence);

    let error = sensor.ping().await.unwrap_err();
    assert!(matches!(error, HardwareError::Timeout { operation: "ping", .. }));
}

#[tokio::test(start_paused = true)]
async fn test_corrupted_reply_rejected_when_verifying() {
    let (mut sensor, handle) = sensor();
    handle.inject(Instruction::Ping, Fault::CorruptChecksum);

    let error = sensor.ping().await.unwrap_err();
    assert!(matches!(
        error,
        HardwareError::Protocol(fingerlink_core::Error::ChecksumMismatch { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_corrupted_reply_accepted_without_verification() {
    let (module, handle) = MockSensor::new();
    let config = SensorConfig::default().with_verify_checksums(false);
    let mut sensor = Sensor::new(module, &config);
    handle.inject(Instruction::Ping, Fault::CorruptChecksum);

    sensor.ping().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reply_assembled_from_small_reads() {
    let (mut sensor, handle) = sensor();
    handle.set_read_chunk(3);
    handle.enroll(Position::from(200), Finger(1));

    let bitmap = sensor.read_occupancy_bitmap().await.unwrap();
    assert!(bitmap.is_occupied(Position::from(200)));
}

#[tokio::test(start_paused = true)]
async fn test_disconnected_module() {
    let (mut sensor, handle) = sensor();
    handle.disconnect();

    let error = sensor.ping().await.unwrap_err();
    assert!(matches!(error, HardwareError::Disconnected { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_settle_delay_applied_per_command() {
    let (mut sensor, _handle) = sensor();
    let start = tokio::time::Instant::now();

    sensor.ping().await.unwrap();
    sensor.ping().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_millis(1000));
}
