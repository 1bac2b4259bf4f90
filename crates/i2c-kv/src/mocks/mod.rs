//! Mock transport for testing
//!
//! [`MockBus`] records every transfer it sees and answers from a script.
//! Unscripted transfers succeed in full; reads are served from a byte stream
//! queued with [`MockBus::queue_read_data`] (zeros once it runs dry).

#![cfg(any(test, feature = "std"))]

use core::cell::RefCell;
use std::collections::VecDeque;
use std::vec::Vec;

use crate::bus::{I2cBus, SlaveConfig};

/// Errors produced by [`MockBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// No device acknowledged.
    Nack,
    /// Another master won arbitration.
    ArbitrationLost,
    /// `init_slave` was rejected.
    InitRejected,
}

/// Scripted outcome of one raw transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Move every byte.
    Full,
    /// Move at most this many bytes.
    Short(usize),
    /// Fail with this error.
    Fail(MockError),
}

/// A transfer observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    /// Raw write with the bytes offered.
    Write {
        /// Bus-form slave address.
        address: u16,
        /// Bytes offered by the caller.
        bytes: Vec<u8>,
    },
    /// Raw read of `len` bytes.
    Read {
        /// Bus-form slave address.
        address: u16,
        /// Bytes requested.
        len: usize,
    },
}

#[derive(Default)]
struct State {
    transfers: Vec<Transfer>,
    init_calls: Vec<SlaveConfig>,
    write_script: VecDeque<Reply>,
    read_script: VecDeque<Reply>,
    read_data: VecDeque<u8>,
    present: Option<Vec<u16>>,
    init_failures: Vec<u16>,
}

/// Scripted in-memory [`I2cBus`].
pub struct MockBus {
    state: RefCell<State>,
    slave_init: bool,
}

impl MockBus {
    /// Bus on which every address acknowledges.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
            slave_init: true,
        }
    }

    /// Bus on which only `addresses` (bus form) acknowledge unscripted
    /// transfers.
    pub fn with_devices(addresses: &[u16]) -> Self {
        let bus = Self::new();
        bus.state.borrow_mut().present = Some(addresses.to_vec());
        bus
    }

    /// Bus that reports no slave-initialisation capability.
    pub fn without_slave_init() -> Self {
        Self {
            slave_init: false,
            ..Self::new()
        }
    }

    /// Make `init_slave` fail for `address`.
    pub fn fail_init_at(&self, address: u16) {
        self.state.borrow_mut().init_failures.push(address);
    }

    /// Queue the outcome of a future write; scripts are consumed in order.
    pub fn script_write(&self, reply: Reply) {
        self.state.borrow_mut().write_script.push_back(reply);
    }

    /// Queue the outcome of a future read; scripts are consumed in order.
    pub fn script_read(&self, reply: Reply) {
        self.state.borrow_mut().read_script.push_back(reply);
    }

    /// Append bytes to the stream served by reads.
    pub fn queue_read_data(&self, bytes: &[u8]) {
        self.state.borrow_mut().read_data.extend(bytes.iter().copied());
    }

    /// Every transfer so far, in order.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.borrow().transfers.clone()
    }

    /// Bytes offered by each write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::Write { bytes, .. } => Some(bytes.clone()),
                Transfer::Read { .. } => None,
            })
            .collect()
    }

    /// Length requested by each read, in order.
    pub fn reads(&self) -> Vec<usize> {
        self.state
            .borrow()
            .transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::Read { len, .. } => Some(*len),
                Transfer::Write { .. } => None,
            })
            .collect()
    }

    /// Addresses of every read, in order.
    pub fn read_addresses(&self) -> Vec<u16> {
        self.state
            .borrow()
            .transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::Read { address, .. } => Some(*address),
                Transfer::Write { .. } => None,
            })
            .collect()
    }

    /// Slaves handed to `init_slave`, in order.
    pub fn init_calls(&self) -> Vec<SlaveConfig> {
        self.state.borrow().init_calls.clone()
    }

    fn outcome(
        state: &State,
        scripted: Option<Reply>,
        address: u16,
        len: usize,
    ) -> Result<usize, MockError> {
        let reply = match scripted {
            Some(reply) => reply,
            None => match &state.present {
                Some(present) if !present.contains(&address) => Reply::Fail(MockError::Nack),
                _ => Reply::Full,
            },
        };
        match reply {
            Reply::Full => Ok(len),
            Reply::Short(n) => Ok(n.min(len)),
            Reply::Fail(e) => Err(e),
        }
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cBus for MockBus {
    type Error = MockError;

    fn supports_slave_init(&self) -> bool {
        self.slave_init
    }

    fn init_slave(&self, slave: &SlaveConfig) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.init_calls.push(*slave);
        if state.init_failures.contains(&slave.address) {
            return Err(MockError::InitRejected);
        }
        Ok(())
    }

    fn raw_write(&self, slave: &SlaveConfig, bytes: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.transfers.push(Transfer::Write {
            address: slave.address,
            bytes: bytes.to_vec(),
        });
        let scripted = state.write_script.pop_front();
        Self::outcome(&state, scripted, slave.address, bytes.len())
    }

    fn raw_read(&self, slave: &SlaveConfig, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.transfers.push(Transfer::Read {
            address: slave.address,
            len: buffer.len(),
        });
        let scripted = state.read_script.pop_front();
        let n = Self::outcome(&state, scripted, slave.address, buffer.len())?;
        for slot in buffer.iter_mut().take(n) {
            *slot = state.read_data.pop_front().unwrap_or(0);
        }
        Ok(n)
    }
}
