use crate::{HardwareError, Result};
use fingerlink_core::constants::{
    DEFAULT_ADDRESS, DEFAULT_BAUD_RATE, DEFAULT_MAX_RESPONSE_LEN, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_SETTLE_DELAY_MS, MIN_FRAME_LEN,
};
use std::time::Duration;

/// Configuration for the serial link and command exchange.
///
/// # Example
///
/// ```
/// use fingerlink_hardware::SensorConfig;
/// use std::time::Duration;
///
/// let config = SensorConfig::default()
///     .with_port("/dev/ttyS2")
///     .with_settle_delay(Duration::from_millis(300));
/// assert_eq!(config.baud_rate, 57_600);
/// ```
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Serial device path
    pub port: String,

    /// UART speed
    pub baud_rate: u32,

    /// Module address written into every frame
    pub address: u32,

    /// Pause between writing a command and reading its acknowledgement
    pub settle_delay: Duration,

    /// How long a single transport read waits for bytes
    pub read_timeout: Duration,

    /// Upper bound on bytes accepted for one acknowledgement
    pub max_response_len: usize,

    /// Reject acknowledgements whose checksum does not match
    pub verify_checksums: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_ADDRESS,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
            verify_checksums: true,
        }
    }
}

impl SensorConfig {
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_address(mut self, address: u32) -> Self {
        self.address = address;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Check the settings before a port is opened with them.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` for an empty port name, a
    /// zero baud rate or read timeout, or a response limit below one frame.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(HardwareError::configuration("serial port name is empty"));
        }
        if self.baud_rate == 0 {
            return Err(HardwareError::configuration("baud rate must be positive"));
        }
        if self.read_timeout.is_zero() {
            return Err(HardwareError::configuration("read timeout must be positive"));
        }
        if self.max_response_len < MIN_FRAME_LEN {
            return Err(HardwareError::configuration(format!(
                "max_response_len {} is below the {MIN_FRAME_LEN}-byte minimum frame",
                self.max_response_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_module_factory_settings() {
        let config = SensorConfig::default();
        assert_eq!(config.baud_rate, 57_600);
        assert_eq!(config.address, 0xFFFF_FFFF);
        assert_eq!(config.settle_delay, Duration::from_millis(500));
        assert!(config.verify_checksums);
    }

    #[test]
    fn test_builder_setters() {
        let config = SensorConfig::default()
            .with_port("COM3")
            .with_baud_rate(115_200)
            .with_verify_checksums(false);
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 115_200);
        assert!(!config.verify_checksums);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SensorConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case::empty_port(SensorConfig::default().with_port("  "))]
    #[case::zero_baud(SensorConfig::default().with_baud_rate(0))]
    #[case::zero_read_timeout(SensorConfig::default().with_read_timeout(Duration::ZERO))]
    #[case::tiny_response(SensorConfig { max_response_len: 4, ..SensorConfig::default() })]
    fn test_invalid_config_rejected(#[case] config: SensorConfig) {
        assert!(matches!(
            config.validate(),
            Err(HardwareError::ConfigurationError { .. })
        ));
    }
}
