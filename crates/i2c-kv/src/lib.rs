//! Register (key/value) access layer for I²C slaves
//!
//! Many I²C peripherals expose a flat space of numbered registers: the host
//! writes a register number, then either keeps writing data or turns the bus
//! around and reads it back. Register numbers and register contents come in
//! device-specific widths and byte orders. This crate turns a narrow
//! byte-level transport into a register-oriented API.
//!
//! # Architecture Layers
//!
//! ```text
//! Caller (board / driver code)
//!         ↓
//! Session Driver      KvSlave::read / KvSlave::write
//!         ↓
//! Transaction Executor KvSlave::read_chunk / KvSlave::write_chunk
//!         ↓
//! Endianness Codec    codec::{encode_scalar, encode_array, decode_array}
//!         ↓
//! Transport           I2cBus (HalBus over embedded-hal, or your own)
//! ```
//!
//! [`register_slave`] validates a slave before any traffic and
//! [`scan`] enumerates devices with speculative reads.
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls and the [`mocks`] transport
//! - `defmt`: defmt logging and `defmt::Format` derives (hardware builds)
//! - `tracing`: host-side logging through `tracing`
//! - `serde`: serde derives for [`SlaveSettings`]
//!
//! # Example
//!
//! ```no_run
//! use i2c_kv::{register_kv_slave, HalBus, KvFormat, SPEED_FAST_HZ};
//!
//! fn dump<I: embedded_hal::i2c::I2c>(i2c: I) {
//!     let bus = HalBus::new(i2c);
//!     let Ok(eeprom) =
//!         register_kv_slave(&bus, 0xA0, 7, SPEED_FAST_HZ, KvFormat::FORWARD16, KvFormat::FORWARD8)
//!     else {
//!         return;
//!     };
//!     let mut page = [0u8; 256];
//!     let read = eeprom.read(0x0000, &mut page, 256);
//!     assert!(read <= 256);
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_code)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

// Must come first: the logging macros are textually scoped.
mod fmt;

pub mod bus;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod hal;
pub mod scan;
pub mod slave;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use bus::{AddressSize, I2cBus, SlaveConfig, Speed};
pub use config::SlaveSettings;
pub use error::{Error, Misuse};
pub use format::{ByteOrder, FormatError, KvFormat, SCRATCH_CAPACITY};
pub use hal::{HalBus, HalBusError};
pub use scan::{scan, scan_into, SCAN_ADDRESS_LIMIT, SCAN_PROBE_LEN};
pub use slave::{extract_address, is_valid_address, register_kv_slave, register_slave, KvSlave};

pub use bus::{SPEED_FAST_HZ, SPEED_FAST_PLUS_HZ, SPEED_HIGH_SPEED_HZ, SPEED_STANDARD_HZ};
