//! Bus Configuration

use crate::defaults;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Bit-times per byte on the wire: eight data bits plus the ack bit
const BITS_PER_BYTE: u64 = 9;

/// Bit-times spent on start and stop conditions
const FRAMING_BITS: u64 = 2;

/// A frame must fit this many times into one send interval
const MIN_INTERVAL_HEADROOM: u64 = 10;

/// A 7-bit responder address outside the reserved blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BusAddress(u8);

impl BusAddress {
    /// Validate and wrap a raw address
    pub fn new(raw: u8) -> Result<Self, ConfigError> {
        if raw > 0x7F {
            return Err(ConfigError::AddressOutOfRange(raw));
        }
        if Self::is_reserved(raw) {
            return Err(ConfigError::ReservedAddress(raw));
        }
        Ok(Self(raw))
    }

    /// Addresses 0x00-0x07 and 0x78-0x7F are reserved by the bus standard
    pub fn is_reserved(raw: u8) -> bool {
        (raw & 0x78) == 0 || (raw & 0x78) == 0x78
    }

    /// Get the raw 7-bit value
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = ConfigError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<BusAddress> for u8 {
    fn from(addr: BusAddress) -> Self {
        addr.0
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04X}", self.0)
    }
}

/// Which end of the bus a set of pins belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusRole {
    /// Starts every transfer
    Initiator,
    /// Answers transfers addressed to it
    Responder,
}

/// Pin assignment for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPins {
    /// Data line (SDA)
    pub data: u8,
    /// Clock line (SCL)
    pub clock: u8,
    /// Enable internal pull-ups on both lines
    pub pull_ups: bool,
}

impl BusPins {
    /// Route both lines to the bus peripheral for `role`
    pub fn configure(&self, role: BusRole, clock_rate_hz: u32) {
        info!(
            "Configuring {:?} pins: data={} clock={} pull_ups={} rate={}Hz",
            role, self.data, self.clock, self.pull_ups, clock_rate_hz
        );
    }
}

/// Bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Responder data line pin
    pub data_pin: u8,
    /// Responder clock line pin
    pub clock_pin: u8,
    /// Initiator data line pin
    pub initiator_data_pin: u8,
    /// Initiator clock line pin
    pub initiator_clock_pin: u8,
    /// Enable pull-ups on the lines
    pub pull_ups: bool,
    /// Bus clock rate in Hz
    pub clock_rate_hz: u32,
    /// Address the responder listens on
    pub responder_address: BusAddress,
    /// Initiator send period in milliseconds
    pub send_interval_ms: u64,
    /// Capacity of the responder-to-reporter handoff ring
    pub handoff_capacity: usize,
    /// How long a blocking transfer waits for the responder
    pub transfer_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            data_pin: defaults::RESPONDER_DATA_PIN,
            clock_pin: defaults::RESPONDER_CLOCK_PIN,
            initiator_data_pin: defaults::INITIATOR_DATA_PIN,
            initiator_clock_pin: defaults::INITIATOR_CLOCK_PIN,
            pull_ups: true,
            clock_rate_hz: defaults::CLOCK_RATE_HZ,
            responder_address: BusAddress(defaults::RESPONDER_ADDRESS),
            send_interval_ms: defaults::SEND_INTERVAL_MS,
            handoff_capacity: defaults::HANDOFF_CAPACITY,
            transfer_timeout_ms: defaults::TRANSFER_TIMEOUT_MS,
        }
    }
}

impl BusConfig {
    /// Pins for one role
    pub fn pins(&self, role: BusRole) -> BusPins {
        match role {
            BusRole::Responder => BusPins {
                data: self.data_pin,
                clock: self.clock_pin,
                pull_ups: self.pull_ups,
            },
            BusRole::Initiator => BusPins {
                data: self.initiator_data_pin,
                clock: self.initiator_clock_pin,
                pull_ups: self.pull_ups,
            },
        }
    }

    /// Check the configuration is usable for a frame of `frame_len` bytes
    pub fn validate(&self, frame_len: usize) -> Result<(), ConfigError> {
        if self.clock_rate_hz == 0 {
            return Err(ConfigError::ZeroClockRate);
        }
        if self.send_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.handoff_capacity == 0 {
            return Err(ConfigError::ZeroHandoffCapacity);
        }

        let pins = [
            self.data_pin,
            self.clock_pin,
            self.initiator_data_pin,
            self.initiator_clock_pin,
        ];
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(ConfigError::PinConflict(*pin));
            }
        }

        let wire_us = frame_wire_time_us(frame_len, self.clock_rate_hz);
        let interval_us = self.send_interval_ms.saturating_mul(1000);
        if wire_us.saturating_mul(MIN_INTERVAL_HEADROOM) > interval_us {
            return Err(ConfigError::IntervalTooShort {
                wire_us,
                interval_us,
            });
        }

        Ok(())
    }
}

/// Time one write of `payload_len` bytes occupies the bus, rounded up
///
/// Counts the address byte, every payload byte with its ack bit, and the
/// start and stop conditions.
pub fn frame_wire_time_us(payload_len: usize, clock_rate_hz: u32) -> u64 {
    if clock_rate_hz == 0 {
        return u64::MAX;
    }
    let bits = (payload_len as u64 + 1) * BITS_PER_BYTE + FRAMING_BITS;
    (bits * 1_000_000).div_ceil(clock_rate_hz as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BusConfig::default();
        assert!(config.validate(23).is_ok());
        assert_eq!(config.responder_address.get(), 0x17);
    }

    #[test]
    fn test_reserved_addresses() {
        assert_eq!(BusAddress::new(0x00), Err(ConfigError::ReservedAddress(0x00)));
        assert_eq!(BusAddress::new(0x07), Err(ConfigError::ReservedAddress(0x07)));
        assert_eq!(BusAddress::new(0x78), Err(ConfigError::ReservedAddress(0x78)));
        assert_eq!(BusAddress::new(0x80), Err(ConfigError::AddressOutOfRange(0x80)));
        assert!(BusAddress::new(0x08).is_ok());
        assert!(BusAddress::new(0x77).is_ok());
    }

    #[test]
    fn test_pin_conflict() {
        let config = BusConfig {
            initiator_clock_pin: 4,
            ..Default::default()
        };
        assert_eq!(config.validate(23), Err(ConfigError::PinConflict(4)));
    }

    #[test]
    fn test_wire_time() {
        // (23 + 1) * 9 + 2 = 218 bits at 100 kHz = 2180 us
        assert_eq!(frame_wire_time_us(23, 100_000), 2180);
        // 218 bits at 1.5 MHz = 145.33 us, rounded up
        assert_eq!(frame_wire_time_us(23, 1_500_000), 146);
    }

    #[test]
    fn test_interval_too_short() {
        let config = BusConfig {
            clock_rate_hz: 100_000,
            send_interval_ms: 10,
            ..Default::default()
        };
        assert_eq!(
            config.validate(23),
            Err(ConfigError::IntervalTooShort {
                wire_us: 2180,
                interval_us: 10_000
            })
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = BusConfig {
            clock_rate_hz: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(23), Err(ConfigError::ZeroClockRate));

        let config = BusConfig {
            send_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(23), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn test_pins_per_role() {
        let config = BusConfig::default();
        assert_eq!(config.pins(BusRole::Responder).data, 4);
        assert_eq!(config.pins(BusRole::Initiator).clock, 7);
    }

    proptest! {
        #[test]
        fn prop_address_accepts_only_usable_range(raw in any::<u8>()) {
            let usable = (0x08..=0x77).contains(&raw);
            prop_assert_eq!(BusAddress::new(raw).is_ok(), usable);
        }

        #[test]
        fn prop_wire_time_grows_with_length(len in 0usize..512, rate in 1u32..5_000_000) {
            prop_assert!(frame_wire_time_us(len + 1, rate) >= frame_wire_time_us(len, rate));
        }
    }
}
