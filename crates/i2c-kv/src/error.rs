//! Error types.

use crate::format::FormatError;

/// Contract violations.
///
/// These never come from the bus or the environment: they mean the calling
/// code is wrong. Callers must not retry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Misuse {
    /// The transport has no slave-initialisation capability.
    SlaveInitUnsupported,
    /// The key/value registration path was handed an address outside the
    /// 7-bit device space.
    AddressOutOfRange(u16),
}

impl core::fmt::Display for Misuse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SlaveInitUnsupported => write!(f, "transport cannot initialise slaves"),
            Self::AddressOutOfRange(address) => write!(f, "invalid I2C address input {address:#x}"),
        }
    }
}

/// Errors returned by registration, transactions and scans.
///
/// `E` is the transport's own error type, passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// Unsupported speed class, address size or format descriptor.
    #[error("invalid argument")]
    InvalidArgument,
    /// Device address outside the legal address space.
    #[error("invalid device address {0:#x}")]
    InvalidAddress(u16),
    /// The register number was not fully accepted by the slave.
    #[error("address phase failed: {written} of {expected} bytes written")]
    AddressPhase {
        /// Bytes the transport reported as written.
        written: usize,
        /// Width of the register number.
        expected: usize,
    },
    /// Error reported by the transport.
    #[error("transport error: {0:?}")]
    Transport(E),
    /// Contract violation; see [`Misuse`].
    #[error("contract violation: {0}")]
    Fatal(Misuse),
}

impl<E> Error<E> {
    /// `true` for contract violations that correct code never triggers.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Short static description, for logging without `Debug`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::InvalidAddress(_) => "invalid address",
            Self::AddressPhase { .. } => "address phase failed",
            Self::Transport(_) => "transport error",
            Self::Fatal(_) => "contract violation",
        }
    }

    /// Apply `f` to the transport error, leaving every other variant as is.
    pub fn map_transport<F, T>(self, f: T) -> Error<F>
    where
        T: FnOnce(E) -> F,
    {
        match self {
            Self::InvalidArgument => Error::InvalidArgument,
            Self::InvalidAddress(address) => Error::InvalidAddress(address),
            Self::AddressPhase { written, expected } => Error::AddressPhase { written, expected },
            Self::Transport(e) => Error::Transport(f(e)),
            Self::Fatal(misuse) => Error::Fatal(misuse),
        }
    }
}

impl<E> From<FormatError> for Error<E> {
    fn from(_: FormatError) -> Self {
        Self::InvalidArgument
    }
}
