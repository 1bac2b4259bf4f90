//! [`I2cBus`] adapter for blocking `embedded-hal` I²C controllers.
//!
//! `embedded_hal::i2c::I2c` transfers are all-or-nothing, so a successful
//! write or read always reports the full length.

use core::cell::RefCell;

use embedded_hal::i2c::{ErrorKind, I2c};

use crate::bus::{AddressSize, I2cBus, SlaveConfig};

/// Errors raised by [`HalBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HalBusError<E> {
    /// Error from the underlying I²C controller.
    #[error("i2c controller error: {0:?}")]
    Bus(E),
    /// 10-bit slaves need a controller implementing `I2c<TenBitAddress>`.
    #[error("10-bit addressing is not supported by this bus")]
    TenBitUnsupported,
    /// The controller is already borrowed (re-entrant use).
    #[error("i2c controller busy")]
    Busy,
}

impl<E: embedded_hal::i2c::Error> HalBusError<E> {
    /// embedded-hal classification of the error, when it came from the bus.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Bus(e) => Some(e.kind()),
            Self::TenBitUnsupported | Self::Busy => None,
        }
    }
}

/// Shares one `embedded-hal` I²C controller between any number of slaves.
pub struct HalBus<I> {
    i2c: RefCell<I>,
}

impl<I> HalBus<I> {
    /// Wrap a configured I²C controller.
    pub const fn new(i2c: I) -> Self {
        Self {
            i2c: RefCell::new(i2c),
        }
    }

    /// Give the controller back.
    pub fn into_inner(self) -> I {
        self.i2c.into_inner()
    }
}

#[allow(clippy::cast_possible_truncation)] // 7-bit addresses only, checked at init
fn seven_bit(slave: &SlaveConfig) -> u8 {
    (slave.device_address() & 0x7F) as u8
}

impl<I: I2c> I2cBus for HalBus<I> {
    type Error = HalBusError<I::Error>;

    fn init_slave(&self, slave: &SlaveConfig) -> Result<(), Self::Error> {
        match slave.address_size {
            AddressSize::SevenBit => {
                debug!("hal: slave {:#x} ready", slave.device_address());
                Ok(())
            }
            AddressSize::TenBit => Err(HalBusError::TenBitUnsupported),
        }
    }

    fn raw_write(&self, slave: &SlaveConfig, bytes: &[u8]) -> Result<usize, Self::Error> {
        let mut i2c = self.i2c.try_borrow_mut().map_err(|_| HalBusError::Busy)?;
        i2c.write(seven_bit(slave), bytes).map_err(HalBusError::Bus)?;
        Ok(bytes.len())
    }

    fn raw_read(&self, slave: &SlaveConfig, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let mut i2c = self.i2c.try_borrow_mut().map_err(|_| HalBusError::Busy)?;
        i2c.read(seven_bit(slave), buffer).map_err(HalBusError::Bus)?;
        Ok(buffer.len())
    }
}
