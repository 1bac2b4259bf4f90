//! Slave registration and key/value transfers.
//!
//! A [`KvSlave`] couples a validated [`SlaveConfig`] with an address format
//! and a data format. Transfers come in two layers:
//!
//! - [`KvSlave::read_chunk`] / [`KvSlave::write_chunk`] run at most one bus
//!   transaction through a [`SCRATCH_CAPACITY`]-byte scratch buffer,
//!   silently clamping the element count so the transaction fits.
//! - [`KvSlave::read`] / [`KvSlave::write`] repeat chunks until the request
//!   is satisfied or a chunk moves nothing.
//!
//! Short transfers are not errors. The element count returned is the only
//! success signal, so callers compare it against what they asked for.

use crate::bus::{AddressSize, I2cBus, SlaveConfig, Speed};
use crate::codec::{decode_array, encode_array, encode_scalar};
use crate::error::{Error, Misuse};
use crate::format::{KvFormat, SCRATCH_CAPACITY};

/// Lowest non-reserved 7-bit device address.
const SEVEN_BIT_FIRST: u16 = 0x08;
/// Highest non-reserved 7-bit device address.
const SEVEN_BIT_LAST: u16 = 0x77;
/// Highest 10-bit device address.
const TEN_BIT_LAST: u16 = 0x3FF;

/// Drop the direction bit from a bus-form address.
pub const fn extract_address(address: u16) -> u16 {
    address >> 1
}

/// Whether `device` (direction bit already dropped) is a legal device
/// address for `size`.
///
/// 7-bit devices live in `0x08..=0x77`; the blocks below and above are
/// reserved by the bus protocol.
pub const fn is_valid_address(device: u16, size: AddressSize) -> bool {
    match size {
        AddressSize::SevenBit => device >= SEVEN_BIT_FIRST && device <= SEVEN_BIT_LAST,
        AddressSize::TenBit => device <= TEN_BIT_LAST,
    }
}

/// Validate a slave and hand it to the transport.
///
/// `address` is the bus form with the direction bit in bit 0,
/// `address_bits` is 7 or 10, and `max_speed_hz` one of the four nominal
/// speed classes. `options` is passed to the transport untouched.
///
/// Nothing reaches the transport unless every check passes.
pub fn register_slave<B: I2cBus + ?Sized>(
    bus: &B,
    address: u16,
    address_bits: u8,
    max_speed_hz: u32,
    options: u32,
) -> Result<SlaveConfig, Error<B::Error>> {
    if !bus.supports_slave_init() {
        error!("transport cannot initialise slaves");
        return Err(Error::Fatal(Misuse::SlaveInitUnsupported));
    }

    let speed = Speed::from_hz(max_speed_hz).ok_or(Error::InvalidArgument)?;
    let address_size = AddressSize::from_bits(address_bits).ok_or(Error::InvalidArgument)?;

    if !is_valid_address(extract_address(address), address_size) {
        return Err(Error::InvalidAddress(address));
    }

    let config = SlaveConfig {
        address,
        address_size,
        speed,
        options,
    };
    bus.init_slave(&config).map_err(Error::Transport)?;
    Ok(config)
}

/// Register a key/value slave.
///
/// Validates speed and address size, then applies its own 7-bit check to
/// `(address >> 1) & 0x7F` and treats a failure there as a contract
/// violation. The masked check is looser than the one in
/// [`register_slave`], which runs afterwards with options `0` and may still
/// reject the address with [`Error::InvalidAddress`].
pub fn register_kv_slave<B: I2cBus + ?Sized>(
    bus: &B,
    address: u16,
    address_bits: u8,
    max_speed_hz: u32,
    address_format: KvFormat,
    data_format: KvFormat,
) -> Result<KvSlave<'_, B>, Error<B::Error>> {
    if Speed::from_hz(max_speed_hz).is_none() || AddressSize::from_bits(address_bits).is_none() {
        return Err(Error::InvalidArgument);
    }

    if !is_valid_address((address >> 1) & 0x7F, AddressSize::SevenBit) {
        error!("Invalid I2C address input {:#x}", address);
        return Err(Error::Fatal(Misuse::AddressOutOfRange(address)));
    }

    let config = register_slave(bus, address, address_bits, max_speed_hz, 0)?;
    Ok(KvSlave {
        bus,
        config,
        address_format,
        data_format,
    })
}

/// A registered register-oriented slave.
///
/// Borrows its bus; the bus outlives every slave built on it. Nothing here is
/// mutated after registration and there is no teardown.
#[derive(Debug)]
pub struct KvSlave<'bus, B: ?Sized> {
    bus: &'bus B,
    config: SlaveConfig,
    address_format: KvFormat,
    data_format: KvFormat,
}

impl<B: ?Sized> Clone for KvSlave<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for KvSlave<'_, B> {}

impl<'bus, B: I2cBus + ?Sized> KvSlave<'bus, B> {
    /// Bus this slave talks through.
    pub fn bus(&self) -> &'bus B {
        self.bus
    }

    /// Transport-side configuration.
    pub fn config(&self) -> &SlaveConfig {
        &self.config
    }

    /// Format of register numbers.
    pub fn address_format(&self) -> KvFormat {
        self.address_format
    }

    /// Format of register contents.
    pub fn data_format(&self) -> KvFormat {
        self.data_format
    }

    /// Read at most `count` registers starting at `register` in one
    /// transaction.
    ///
    /// `count` is clamped so the data fits the scratch buffer and `data`;
    /// when nothing is left the bus is not touched and `Ok(0)` is returned.
    /// Returns the number of whole elements decoded into `data`; a short
    /// read drops any trailing partial element.
    #[allow(clippy::arithmetic_side_effects)] // all operands bounded by SCRATCH_CAPACITY
    pub fn read_chunk(
        &self,
        register: u64,
        data: &mut [u8],
        count: usize,
    ) -> Result<usize, Error<B::Error>> {
        let abytes = self.address_format.width();
        let dbytes = self.data_format.width();
        let count = count
            .min(SCRATCH_CAPACITY / dbytes)
            .min(data.len() / dbytes);
        if count == 0 {
            return Ok(0);
        }

        let mut scratch = [0u8; SCRATCH_CAPACITY];

        debug!("Seek register {:#x}", register);
        let (seek, _) = scratch.split_at_mut(abytes);
        encode_scalar(register, self.address_format, seek);
        let written = self.bus.raw_write(&self.config, seek).map_err(|e| {
            debug!("Bus error");
            Error::Transport(e)
        })?;
        if written != abytes {
            debug!("Bus error ({}/{})", written, abytes);
            return Err(Error::AddressPhase {
                written,
                expected: abytes,
            });
        }

        let wanted = count * dbytes;
        debug!("Read register {}", wanted);
        let (reply, _) = scratch.split_at_mut(wanted);
        let got = self.bus.raw_read(&self.config, reply).map_err(|e| {
            debug!("read error");
            Error::Transport(e)
        })?;
        if got != wanted {
            debug!("short read {}/{}", got, wanted);
        }

        let elements = got.min(wanted) / dbytes;
        Ok(decode_array(reply, self.data_format, elements, data))
    }

    /// Write at most `count` registers starting at `register` in one
    /// transaction.
    ///
    /// Register number and data go out as one contiguous write. `count` is
    /// clamped so both fit the scratch buffer, and to the elements held by
    /// `data`; a clamp to zero returns `Ok(0)` without any bus traffic.
    /// Returns the number of whole elements the slave accepted.
    #[allow(clippy::arithmetic_side_effects)] // all operands bounded by SCRATCH_CAPACITY
    pub fn write_chunk(
        &self,
        register: u64,
        data: &[u8],
        count: usize,
    ) -> Result<usize, Error<B::Error>> {
        let abytes = self.address_format.width();
        let dbytes = self.data_format.width();
        let count = count
            .min((SCRATCH_CAPACITY - abytes) / dbytes)
            .min(data.len() / dbytes);
        if count == 0 {
            return Ok(0);
        }

        let mut scratch = [0u8; SCRATCH_CAPACITY];

        debug!("Seek register {:#x}", register);
        let (seek, payload) = scratch.split_at_mut(abytes);
        encode_scalar(register, self.address_format, seek);
        encode_array(data, self.data_format, count, payload);

        let (request, _) = scratch.split_at(abytes + count * dbytes);
        let written = self.bus.raw_write(&self.config, request).map_err(|e| {
            debug!("Bus error");
            Error::Transport(e)
        })?;
        if written < abytes {
            debug!("Bus error ({}/{})", written, abytes);
            return Err(Error::AddressPhase {
                written,
                expected: abytes,
            });
        }

        Ok((written.min(request.len()) - abytes) / dbytes)
    }

    /// Read `count` registers starting at `register` into `data`.
    ///
    /// Splits the request into as many chunks as needed and stops at the
    /// first chunk that fails or moves nothing; that chunk is not retried.
    /// After each chunk of `n` elements the register number advances by `n`.
    ///
    /// Returns the number of elements read, at most `count`.
    pub fn read(&self, register: u64, data: &mut [u8], count: usize) -> usize {
        let dbytes = self.data_format.width();
        let mut register = register;
        let mut offset = 0usize;
        let mut remain = count;

        while remain > 0 {
            let window = data.get_mut(offset..).unwrap_or_default();
            let n = match self.read_chunk(register, window, remain) {
                Ok(0) => {
                    debug!("read stopped at register {:#x}: nothing read", register);
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!("read stopped at register {:#x}: {}", register, e.as_str());
                    break;
                }
            };
            offset = offset.saturating_add(n.saturating_mul(dbytes));
            register = register.wrapping_add(n as u64);
            remain = remain.saturating_sub(n);
        }

        count.saturating_sub(remain)
    }

    /// Write `count` registers from `data` starting at `register`.
    ///
    /// Same chunking and stop rules as [`read`](Self::read), except that the
    /// register number advances by `n * data_width` after each chunk.
    ///
    /// Returns the number of elements written, at most `count`.
    pub fn write(&self, register: u64, data: &[u8], count: usize) -> usize {
        let dbytes = self.data_format.width();
        let mut register = register;
        let mut offset = 0usize;
        let mut remain = count;

        while remain > 0 {
            let window = data.get(offset..).unwrap_or_default();
            let n = match self.write_chunk(register, window, remain) {
                Ok(0) => {
                    debug!("write stopped at register {:#x}: nothing written", register);
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!("write stopped at register {:#x}: {}", register, e.as_str());
                    break;
                }
            };
            let advance = n.saturating_mul(dbytes);
            offset = offset.saturating_add(advance);
            register = register.wrapping_add(advance as u64);
            remain = remain.saturating_sub(n);
        }

        count.saturating_sub(remain)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::bus::SPEED_STANDARD_HZ;
    use crate::mocks::{MockBus, MockError, Reply, Transfer};

    fn slave(bus: &MockBus, afmt: KvFormat, dfmt: KvFormat) -> KvSlave<'_, MockBus> {
        register_kv_slave(bus, 0xA0, 7, SPEED_STANDARD_HZ, afmt, dfmt).unwrap()
    }

    // ---- Address validation ---------------------------------------------------

    #[test]
    fn seven_bit_reserved_blocks_are_invalid() {
        assert!(!is_valid_address(0x00, AddressSize::SevenBit));
        assert!(!is_valid_address(0x07, AddressSize::SevenBit));
        assert!(is_valid_address(0x08, AddressSize::SevenBit));
        assert!(is_valid_address(0x77, AddressSize::SevenBit));
        assert!(!is_valid_address(0x78, AddressSize::SevenBit));
    }

    #[test]
    fn ten_bit_space_is_whole_range() {
        assert!(is_valid_address(0x000, AddressSize::TenBit));
        assert!(is_valid_address(0x3FF, AddressSize::TenBit));
        assert!(!is_valid_address(0x400, AddressSize::TenBit));
    }

    // ---- Read chunk -------------------------------------------------------------

    #[test]
    fn read_chunk_seeks_then_reads() {
        let bus = MockBus::new();
        bus.queue_read_data(&[0x12, 0x34, 0x56, 0x78]);
        let dev = slave(&bus, KvFormat::FORWARD16, KvFormat::REVERSED16);

        let mut data = [0u8; 4];
        assert_eq!(dev.read_chunk(0x0102, &mut data, 2).unwrap(), 2);
        assert_eq!(data, [0x34, 0x12, 0x78, 0x56]);

        assert_eq!(
            bus.transfers(),
            std::vec![
                Transfer::Write {
                    address: 0xA0,
                    bytes: std::vec![0x01, 0x02]
                },
                Transfer::Read {
                    address: 0xA0,
                    len: 4
                },
            ]
        );
    }

    #[test]
    fn read_chunk_clamps_to_scratch() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD32);

        let mut data = [0u8; 400];
        assert_eq!(dev.read_chunk(0, &mut data, 100).unwrap(), 32);
        assert_eq!(bus.reads(), std::vec![128]);
    }

    #[test]
    fn read_chunk_clamps_to_caller_buffer() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD16);

        let mut data = [0u8; 5];
        assert_eq!(dev.read_chunk(0, &mut data, 10).unwrap(), 2);
        assert_eq!(bus.reads(), std::vec![4]);
    }

    #[test]
    fn short_read_discards_partial_element() {
        let bus = MockBus::new();
        bus.queue_read_data(&[1, 2, 3, 4, 5, 6, 7]);
        bus.script_read(Reply::Short(7));
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD32);

        let mut data = [0xEEu8; 8];
        assert_eq!(dev.read_chunk(0, &mut data, 2).unwrap(), 1);
        assert_eq!(data, [1, 2, 3, 4, 0xEE, 0xEE, 0xEE, 0xEE]);
    }

    #[test]
    fn read_address_phase_must_be_complete() {
        let bus = MockBus::new();
        bus.script_write(Reply::Short(1));
        let dev = slave(&bus, KvFormat::FORWARD16, KvFormat::FORWARD8);

        let mut data = [0u8; 4];
        assert_eq!(
            dev.read_chunk(0x10, &mut data, 4),
            Err(Error::AddressPhase {
                written: 1,
                expected: 2
            })
        );
        assert!(bus.reads().is_empty(), "no data phase after a failed seek");
    }

    #[test]
    fn read_transport_error_is_verbatim() {
        let bus = MockBus::new();
        bus.script_read(Reply::Fail(MockError::ArbitrationLost));
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD8);

        let mut data = [0u8; 4];
        assert_eq!(
            dev.read_chunk(0x10, &mut data, 4),
            Err(Error::Transport(MockError::ArbitrationLost))
        );
    }

    #[test]
    fn read_chunk_without_room_touches_nothing() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD32);

        let mut data = [0u8; 3];
        assert_eq!(dev.read_chunk(0x10, &mut data, 4), Ok(0));
        assert_eq!(dev.read_chunk(0x10, &mut [0u8; 8], 0), Ok(0));
        assert!(bus.transfers().is_empty());
    }

    // ---- Write chunk ------------------------------------------------------------

    #[test]
    fn write_chunk_sends_address_and_payload_together() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::REVERSED16, KvFormat::REVERSED16);

        assert_eq!(dev.write_chunk(0x1234, &[0xAA, 0xBB, 0xCC, 0xDD], 2).unwrap(), 2);
        assert_eq!(
            bus.writes(),
            std::vec![std::vec![0x34, 0x12, 0xBB, 0xAA, 0xDD, 0xCC]]
        );
        assert!(bus.reads().is_empty());
    }

    #[test]
    fn write_chunk_clamps_to_scratch_minus_address() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::FORWARD16, KvFormat::FORWARD32);

        let data = [0u8; 800];
        assert_eq!(dev.write_chunk(0, &data, 200).unwrap(), 31);
        assert_eq!(bus.writes()[0].len(), 2 + 31 * 4);
    }

    #[test]
    fn short_write_counts_whole_elements_only() {
        let bus = MockBus::new();
        bus.script_write(Reply::Short(9));
        let dev = slave(&bus, KvFormat::FORWARD16, KvFormat::FORWARD16);

        // 2 address bytes + 7 data bytes: three whole elements.
        assert_eq!(dev.write_chunk(0, &[0u8; 10], 5).unwrap(), 3);
    }

    #[test]
    fn write_address_phase_must_be_complete() {
        let bus = MockBus::new();
        bus.script_write(Reply::Short(0));
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD8);

        assert_eq!(
            dev.write_chunk(0, &[1, 2, 3], 3),
            Err(Error::AddressPhase {
                written: 0,
                expected: 1
            })
        );
    }

    #[test]
    fn write_chunk_without_room_touches_nothing() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD16);

        assert_eq!(dev.write_chunk(0x10, &[0xAA], 3), Ok(0));
        assert_eq!(dev.write_chunk(0x10, &[0xAA, 0xBB], 0), Ok(0));
        assert!(bus.transfers().is_empty(), "no bare address write");
    }

    // ---- Session driver ---------------------------------------------------------

    #[test]
    fn read_advances_register_by_elements() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD32);

        let mut data = [0u8; 4 * 40];
        assert_eq!(dev.read(0x10, &mut data, 40), 40);
        // 32 elements fit in one chunk; the second chunk starts 32 registers on.
        assert_eq!(bus.writes(), std::vec![std::vec![0x10], std::vec![0x30]]);
        assert_eq!(bus.reads(), std::vec![128, 32]);
    }

    #[test]
    fn write_advances_register_by_bytes() {
        let bus = MockBus::new();
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD32);

        let data = [0u8; 4 * 40];
        assert_eq!(dev.write(0x10, &data, 40), 40);
        let writes = bus.writes();
        assert_eq!(writes.len(), 2);
        // (128 - 1) / 4 = 31 elements in the first chunk, 31 * 4 = 124 bytes on.
        assert_eq!(writes[0][0], 0x10);
        assert_eq!(writes[1][0], 0x10 + 124);
        assert_eq!(writes[1].len(), 1 + 9 * 4);
    }

    #[test]
    fn session_stops_after_first_failure() {
        let bus = MockBus::new();
        bus.script_write(Reply::Full);
        bus.script_write(Reply::Fail(MockError::Nack));
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD8);

        let data = [0u8; 300];
        assert_eq!(dev.write(0, &data, 300), 127);
        assert_eq!(bus.writes().len(), 2, "failed chunk is not retried");
    }

    #[test]
    fn session_stops_on_zero_elements() {
        let bus = MockBus::new();
        bus.script_read(Reply::Short(0));
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD8);

        let mut data = [0u8; 16];
        assert_eq!(dev.read(0, &mut data, 16), 0);
        assert_eq!(bus.reads().len(), 1);
    }

    #[test]
    fn session_read_places_chunks_contiguously() {
        let bus = MockBus::new();
        let stream: std::vec::Vec<u8> = (0..=255u8).collect();
        bus.queue_read_data(&stream);
        bus.script_read(Reply::Short(3));
        let dev = slave(&bus, KvFormat::FORWARD8, KvFormat::FORWARD8);

        let mut data = [0u8; 6];
        assert_eq!(dev.read(0, &mut data, 6), 6);
        assert_eq!(data, [0, 1, 2, 3, 4, 5]);
        assert_eq!(bus.writes(), std::vec![std::vec![0x00], std::vec![0x03]]);
    }
}
