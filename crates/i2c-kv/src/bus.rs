//! Transport boundary.
//!
//! The key/value layer never touches bus hardware. Everything physical goes
//! through [`I2cBus`]: slave setup, a raw write and a raw read. Arbitration,
//! clocking and interrupts stay on the transport side.

/// Standard-mode bus speed (100 kHz).
pub const SPEED_STANDARD_HZ: u32 = 100_000;
/// Fast-mode bus speed (400 kHz).
pub const SPEED_FAST_HZ: u32 = 400_000;
/// Fast-mode-plus bus speed (1 MHz).
pub const SPEED_FAST_PLUS_HZ: u32 = 1_000_000;
/// High-speed-mode bus speed (3.4 MHz).
pub const SPEED_HIGH_SPEED_HZ: u32 = 3_400_000;

/// Maximum speed class a slave supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// 100 kHz
    Standard,
    /// 400 kHz
    Fast,
    /// 1 MHz
    FastPlus,
    /// 3.4 MHz
    HighSpeed,
}

impl Speed {
    /// Map a bus frequency onto its speed class.
    ///
    /// Only the four nominal frequencies are accepted.
    pub const fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            SPEED_STANDARD_HZ => Some(Self::Standard),
            SPEED_FAST_HZ => Some(Self::Fast),
            SPEED_FAST_PLUS_HZ => Some(Self::FastPlus),
            SPEED_HIGH_SPEED_HZ => Some(Self::HighSpeed),
            _ => None,
        }
    }

    /// Nominal bus frequency of this class.
    pub const fn hz(self) -> u32 {
        match self {
            Self::Standard => SPEED_STANDARD_HZ,
            Self::Fast => SPEED_FAST_HZ,
            Self::FastPlus => SPEED_FAST_PLUS_HZ,
            Self::HighSpeed => SPEED_HIGH_SPEED_HZ,
        }
    }
}

/// Device address width on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressSize {
    /// 7-bit addressing
    SevenBit,
    /// 10-bit addressing
    TenBit,
}

impl AddressSize {
    /// Map a bit count (7 or 10) onto an address size.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            7 => Some(Self::SevenBit),
            10 => Some(Self::TenBit),
            _ => None,
        }
    }

    /// Address width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            Self::SevenBit => 7,
            Self::TenBit => 10,
        }
    }
}

/// A validated slave as seen by the transport.
///
/// `address` keeps the bus form the caller registered, with the direction
/// bit in bit 0 (a 7-bit device `0x50` is registered as `0xA0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveConfig {
    /// Device address including the direction bit position.
    pub address: u16,
    /// Address width.
    pub address_size: AddressSize,
    /// Maximum speed class.
    pub speed: Speed,
    /// Transport-specific option bits, passed through untouched.
    pub options: u32,
}

impl SlaveConfig {
    /// Device address with the direction bit dropped.
    pub const fn device_address(&self) -> u16 {
        self.address >> 1
    }
}

/// Byte-level I²C transport.
///
/// Methods take `&self` so that any number of slaves can borrow one bus.
/// Execution is single-threaded and blocking; transports that need mutable
/// state use interior mutability.
///
/// A successful transfer reports how many bytes actually moved, which may be
/// fewer than requested. `Err` is reserved for transfers that failed outright.
pub trait I2cBus {
    /// Transport error type
    type Error;

    /// Whether [`init_slave`](Self::init_slave) is implemented.
    ///
    /// Registration treats `false` as a contract violation.
    fn supports_slave_init(&self) -> bool {
        true
    }

    /// Prepare the transport for traffic with `slave`.
    fn init_slave(&self, slave: &SlaveConfig) -> Result<(), Self::Error>;

    /// Write `bytes` to `slave`; returns the number of bytes accepted.
    fn raw_write(&self, slave: &SlaveConfig, bytes: &[u8]) -> Result<usize, Self::Error>;

    /// Read up to `buffer.len()` bytes from `slave`; returns the number read.
    fn raw_read(&self, slave: &SlaveConfig, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<B: I2cBus + ?Sized> I2cBus for &B {
    type Error = B::Error;

    fn supports_slave_init(&self) -> bool {
        (**self).supports_slave_init()
    }

    fn init_slave(&self, slave: &SlaveConfig) -> Result<(), Self::Error> {
        (**self).init_slave(slave)
    }

    fn raw_write(&self, slave: &SlaveConfig, bytes: &[u8]) -> Result<usize, Self::Error> {
        (**self).raw_write(slave, bytes)
    }

    fn raw_read(&self, slave: &SlaveConfig, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).raw_read(slave, buffer)
    }
}
