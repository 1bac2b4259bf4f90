//! Board-level slave descriptions
//!
//! A [`SlaveSettings`] is the raw, unvalidated description of one slave as
//! it appears in a board file: numbers only, the same encoding the wire
//! contract uses. [`KvSlave::from_settings`] validates it and registers the
//! slave.
//!
//! ```
//! # #[cfg(feature = "serde")] {
//! use i2c_kv::SlaveSettings;
//!
//! let json = r#"{ "address": 160, "address_bits": 7, "max_speed_hz": 400000,
//!                 "address_format": 2, "data_format": -2 }"#;
//! let eeprom: SlaveSettings = serde_json::from_str(json).unwrap();
//! assert_eq!(eeprom.address, 0xA0);
//! # }
//! ```

use crate::bus::{I2cBus, SPEED_STANDARD_HZ};
use crate::error::Error;
use crate::format::KvFormat;
use crate::slave::{register_kv_slave, KvSlave};

/// Raw description of one key/value slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveSettings {
    /// Bus-form device address (direction bit in bit 0).
    pub address: u16,
    /// Address width in bits: 7 or 10.
    #[cfg_attr(feature = "serde", serde(default = "default_address_bits"))]
    pub address_bits: u8,
    /// Maximum bus speed in Hz; one of the four nominal speed classes.
    #[cfg_attr(feature = "serde", serde(default = "default_speed_hz"))]
    pub max_speed_hz: u32,
    /// Signed format descriptor of register numbers.
    pub address_format: i8,
    /// Signed format descriptor of register contents.
    pub data_format: i8,
}

#[cfg(feature = "serde")]
const fn default_address_bits() -> u8 {
    7
}

#[cfg(feature = "serde")]
const fn default_speed_hz() -> u32 {
    SPEED_STANDARD_HZ
}

impl SlaveSettings {
    /// Settings for a 7-bit slave at standard speed.
    pub const fn new(address: u16, address_format: KvFormat, data_format: KvFormat) -> Self {
        Self {
            address,
            address_bits: 7,
            max_speed_hz: SPEED_STANDARD_HZ,
            address_format: address_format.raw(),
            data_format: data_format.raw(),
        }
    }
}

impl<'bus, B: I2cBus + ?Sized> KvSlave<'bus, B> {
    /// Validate `settings` and register the slave on `bus`.
    ///
    /// Format descriptors of zero or wider than eight bytes are rejected
    /// with [`Error::InvalidArgument`] before any other check.
    pub fn from_settings(bus: &'bus B, settings: &SlaveSettings) -> Result<Self, Error<B::Error>> {
        let address_format = KvFormat::from_raw(settings.address_format)?;
        let data_format = KvFormat::from_raw(settings.data_format)?;
        register_kv_slave(
            bus,
            settings.address,
            settings.address_bits,
            settings.max_speed_hz,
            address_format,
            data_format,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockBus;

    #[test]
    fn new_uses_standard_defaults() {
        let s = SlaveSettings::new(0xA0, KvFormat::FORWARD16, KvFormat::REVERSED32);
        assert_eq!(s.address_bits, 7);
        assert_eq!(s.max_speed_hz, SPEED_STANDARD_HZ);
        assert_eq!(s.address_format, 2);
        assert_eq!(s.data_format, -4);
    }

    #[test]
    fn from_settings_registers_slave() {
        let bus = MockBus::new();
        let s = SlaveSettings::new(0xA0, KvFormat::FORWARD16, KvFormat::REVERSED32);
        let dev = KvSlave::from_settings(&bus, &s).unwrap();
        assert_eq!(dev.address_format(), KvFormat::FORWARD16);
        assert_eq!(dev.data_format(), KvFormat::REVERSED32);
        assert_eq!(dev.config().address, 0xA0);
        assert_eq!(bus.init_calls().len(), 1);
    }

    #[test]
    fn zero_format_rejected_before_registration() {
        let bus = MockBus::new();
        let s = SlaveSettings {
            data_format: 0,
            ..SlaveSettings::new(0xA0, KvFormat::FORWARD8, KvFormat::FORWARD8)
        };
        assert_eq!(
            KvSlave::from_settings(&bus, &s).map(|_| ()),
            Err(Error::InvalidArgument)
        );
        assert!(bus.init_calls().is_empty());
    }
}
