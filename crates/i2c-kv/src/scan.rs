//! Bus scanner.
//!
//! Walks the even (write-form) addresses of the 7-bit space and issues a
//! speculative read to each one. There is no Device-ID command here; a device
//! counts as present when it returns a full probe.

use crate::bus::{I2cBus, SPEED_STANDARD_HZ};
use crate::slave::register_slave;

/// Bytes requested from each probed address.
pub const SCAN_PROBE_LEN: usize = 10;

/// First address past the scanned space (bus form, direction bit included).
pub const SCAN_ADDRESS_LIMIT: u16 = 0x100;

/// Probe addresses from `start` upwards and record responders in `found`.
///
/// `start` is rounded down to an even address, then every even address below
/// [`SCAN_ADDRESS_LIMIT`] is tried in ascending order at standard speed until
/// `found` is full. An address that fails registration ends the scan (the
/// reserved blocks at either end of the 7-bit space do), keeping whatever was
/// found so far. A failed probe means no device; a probe of the wrong length
/// is logged and skipped.
///
/// Addresses `0x00..=0x0F` (devices `0x00..=0x07`) are reserved, so a scan
/// starting there finds nothing and stops at once. To scan the whole bus,
/// start at `0x10`; the scan then ends after `0xEE` (device `0x77`).
///
/// Returns the number of entries written to `found`.
pub fn scan_into<B: I2cBus + ?Sized>(bus: &B, start: u16, found: &mut [u16]) -> usize {
    let mut count = 0usize;
    let mut probe = [0u8; SCAN_PROBE_LEN];

    for address in ((start & !1)..SCAN_ADDRESS_LIMIT).step_by(2) {
        let Some(slot) = found.get_mut(count) else {
            break;
        };

        let slave = match register_slave(bus, address, 7, SPEED_STANDARD_HZ, 0) {
            Ok(slave) => slave,
            Err(e) => {
                warn!(
                    "Breaking out of scan early: failed to init slave {:#x} ({})",
                    address,
                    e.as_str()
                );
                break;
            }
        };

        match bus.raw_read(&slave, &mut probe) {
            Ok(SCAN_PROBE_LEN) => {
                trace!("scan: device at {:#x}", address);
                *slot = address;
                count = count.saturating_add(1);
            }
            Ok(n) => error!("Invalid response from {:#x} ({} bytes)", address, n),
            Err(_) => {}
        }
    }

    count
}

/// Probe addresses from `start` upwards, returning at most `N` responders.
///
/// See [`scan_into`] for the probing rules; a full-bus scan starts at `0x10`.
///
/// ```
/// # #[cfg(feature = "std")] {
/// use i2c_kv::{mocks::MockBus, scan};
///
/// let bus = MockBus::with_devices(&[0x20, 0xA0]);
/// assert!(scan::<_, 8>(&bus, 0x00).is_empty());
/// assert_eq!(scan::<_, 8>(&bus, 0x10).as_slice(), &[0x20, 0xA0]);
/// # }
/// ```
pub fn scan<B: I2cBus + ?Sized, const N: usize>(bus: &B, start: u16) -> heapless::Vec<u16, N> {
    let mut found = [0u16; N];
    let count = scan_into(bus, start, &mut found);
    let (hits, _) = found.split_at(count);
    heapless::Vec::from_slice(hits).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockBus, Reply};

    #[test]
    fn finds_present_devices_in_order() {
        let bus = MockBus::with_devices(&[0xA0, 0x20, 0xD0]);
        let found = scan::<_, 8>(&bus, 0x10);
        assert_eq!(found.as_slice(), &[0x20, 0xA0, 0xD0]);
    }

    #[test]
    fn odd_start_is_rounded_down() {
        let bus = MockBus::with_devices(&[0x20]);
        let found = scan::<_, 8>(&bus, 0x21);
        assert_eq!(found.as_slice(), &[0x20]);
        assert_eq!(bus.read_addresses().first(), Some(&0x20));
    }

    #[test]
    fn stops_when_result_space_is_full() {
        let bus = MockBus::new();
        let mut found = [0u16; 3];
        assert_eq!(scan_into(&bus, 0x10, &mut found), 3);
        assert_eq!(found, [0x10, 0x12, 0x14]);
        assert_eq!(bus.reads().len(), 3, "no probe once the results are full");
    }

    #[test]
    fn every_probe_is_ten_bytes() {
        let bus = MockBus::with_devices(&[0x30]);
        let _ = scan::<_, 4>(&bus, 0xE0);
        assert!(bus.reads().iter().all(|&len| len == SCAN_PROBE_LEN));
    }

    #[test]
    fn registration_failure_is_a_hard_stop() {
        let bus = MockBus::new();
        bus.fail_init_at(0x14);
        let found = scan::<_, 16>(&bus, 0x10);
        assert_eq!(found.as_slice(), &[0x10, 0x12]);
        assert_eq!(bus.read_addresses(), std::vec![0x10, 0x12]);
    }

    #[test]
    fn scan_from_zero_stops_in_reserved_block() {
        let bus = MockBus::new();
        let found = scan::<_, 16>(&bus, 0);
        assert!(found.is_empty());
        assert!(bus.init_calls().is_empty());
    }

    #[test]
    fn full_bus_scan_starts_at_first_legal_address() {
        let bus = MockBus::with_devices(&[0x10, 0xEE]);
        let found = scan::<_, 8>(&bus, 0x10);
        assert_eq!(found.as_slice(), &[0x10, 0xEE]);
        assert_eq!(bus.read_addresses().len(), 0x70, "every legal device probed");
    }

    #[test]
    fn scan_ends_at_upper_reserved_block() {
        let bus = MockBus::new();
        let found = scan::<_, 128>(&bus, 0xE8);
        // 0xEE is device 0x77, the last legal one; 0xF0 aborts the scan.
        assert_eq!(found.as_slice(), &[0xE8, 0xEA, 0xEC, 0xEE]);
    }

    #[test]
    fn wrong_length_probe_is_skipped() {
        let bus = MockBus::new();
        bus.script_read(Reply::Short(4));
        let found = scan::<_, 2>(&bus, 0x40);
        assert_eq!(found.as_slice(), &[0x42, 0x44]);
    }
}
