//! Key/value format descriptors.
//!
//! A format descriptor says how wide a field is and in which order its bytes
//! travel on the wire. One descriptor covers the register number ("address
//! format"), another the register contents ("data format").
//!
//! On the configuration side a descriptor is a signed byte: the magnitude is
//! the width in bytes, the sign the direction.
//!
//! | raw  | width | order      |
//! |------|-------|------------|
//! | `+2` | 2     | `Forward`  |
//! | `-2` | 2     | `Reversed` |
//! | `0`  | -     | rejected   |

/// Capacity of the per-transaction scratch buffer in bytes.
///
/// Every single bus transaction (address bytes plus data bytes on the write
/// path, data bytes on the read path) must fit in this many bytes.
pub const SCRATCH_CAPACITY: usize = 128;

/// Widest supported field in bytes (a register number is held in a `u64`).
pub const MAX_WIDTH: u8 = 8;

/// Byte order of a field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteOrder {
    /// Bytes go out in natural index order (most significant first for
    /// scalars).
    Forward,
    /// Bytes go out in reversed index order.
    Reversed,
}

/// Rejected format descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormatError {
    /// Width of zero bytes.
    #[error("format width must be non-zero")]
    ZeroWidth,
    /// Width above [`MAX_WIDTH`].
    #[error("format width {0} exceeds 8 bytes")]
    TooWide(u8),
}

/// Width and byte order of one field.
///
/// Construction enforces `0 < width <= MAX_WIDTH`, which also keeps every
/// width below [`SCRATCH_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KvFormat {
    width: u8,
    order: ByteOrder,
}

// Scratch arithmetic relies on at least one widest element fitting after the
// widest address.
const _: () = assert!(2 * MAX_WIDTH as usize <= SCRATCH_CAPACITY);

impl KvFormat {
    /// 1 byte, forward.
    pub const FORWARD8: Self = Self::from_parts(1, ByteOrder::Forward);
    /// 2 bytes, forward.
    pub const FORWARD16: Self = Self::from_parts(2, ByteOrder::Forward);
    /// 4 bytes, forward.
    pub const FORWARD32: Self = Self::from_parts(4, ByteOrder::Forward);
    /// 8 bytes, forward.
    pub const FORWARD64: Self = Self::from_parts(8, ByteOrder::Forward);
    /// 1 byte, reversed.
    pub const REVERSED8: Self = Self::from_parts(1, ByteOrder::Reversed);
    /// 2 bytes, reversed.
    pub const REVERSED16: Self = Self::from_parts(2, ByteOrder::Reversed);
    /// 4 bytes, reversed.
    pub const REVERSED32: Self = Self::from_parts(4, ByteOrder::Reversed);
    /// 8 bytes, reversed.
    pub const REVERSED64: Self = Self::from_parts(8, ByteOrder::Reversed);

    const fn from_parts(width: u8, order: ByteOrder) -> Self {
        Self { width, order }
    }

    /// Create a descriptor, rejecting widths outside `1..=MAX_WIDTH`.
    pub const fn new(width: u8, order: ByteOrder) -> Result<Self, FormatError> {
        if width == 0 {
            Err(FormatError::ZeroWidth)
        } else if width > MAX_WIDTH {
            Err(FormatError::TooWide(width))
        } else {
            Ok(Self { width, order })
        }
    }

    /// Decode the signed configuration encoding.
    ///
    /// Positive values are [`ByteOrder::Forward`], negative values
    /// [`ByteOrder::Reversed`].
    pub const fn from_raw(raw: i8) -> Result<Self, FormatError> {
        let order = if raw < 0 {
            ByteOrder::Reversed
        } else {
            ByteOrder::Forward
        };
        Self::new(raw.unsigned_abs(), order)
    }

    /// Signed configuration encoding of this descriptor.
    #[allow(clippy::cast_possible_wrap, clippy::arithmetic_side_effects)] // width <= 8
    pub const fn raw(self) -> i8 {
        match self.order {
            ByteOrder::Forward => self.width as i8,
            ByteOrder::Reversed => -(self.width as i8),
        }
    }

    /// Width in bytes.
    pub const fn width(self) -> usize {
        self.width as usize
    }

    /// Byte order.
    pub const fn order(self) -> ByteOrder {
        self.order
    }

    /// Wire position of byte `index` of an element.
    ///
    /// `index` must be below [`width`](Self::width).
    #[inline]
    #[allow(clippy::arithmetic_side_effects)]
    pub(crate) const fn position(self, index: usize) -> usize {
        match self.order {
            ByteOrder::Forward => index,
            ByteOrder::Reversed => self.width as usize - 1 - index,
        }
    }
}

impl TryFrom<i8> for KvFormat {
    type Error = FormatError;

    fn try_from(raw: i8) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<KvFormat> for i8 {
    fn from(format: KvFormat) -> Self {
        format.raw()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn raw_sign_selects_order() {
        assert_eq!(KvFormat::from_raw(2), Ok(KvFormat::FORWARD16));
        assert_eq!(KvFormat::from_raw(-2), Ok(KvFormat::REVERSED16));
        assert_eq!(KvFormat::from_raw(-8).map(KvFormat::order), Ok(ByteOrder::Reversed));
    }

    #[test]
    fn zero_width_rejected() {
        assert_eq!(KvFormat::from_raw(0), Err(FormatError::ZeroWidth));
        assert_eq!(KvFormat::new(0, ByteOrder::Reversed), Err(FormatError::ZeroWidth));
    }

    #[test]
    fn widths_above_eight_rejected() {
        assert_eq!(KvFormat::from_raw(9), Err(FormatError::TooWide(9)));
        assert_eq!(KvFormat::from_raw(-128), Err(FormatError::TooWide(128)));
        assert_eq!(KvFormat::from_raw(i8::MAX), Err(FormatError::TooWide(127)));
    }

    #[test]
    fn raw_round_trips_for_every_valid_descriptor() {
        for raw in (-8i8..=-1).chain(1..=8) {
            let format = KvFormat::from_raw(raw).unwrap();
            assert_eq!(format.raw(), raw);
            assert_eq!(i8::from(format), raw);
            assert_eq!(format.width(), usize::from(raw.unsigned_abs()));
            assert!(format.width() < SCRATCH_CAPACITY);
        }
    }

    #[test]
    fn positions_mirror_for_reversed() {
        let fwd = KvFormat::FORWARD32;
        let rev = KvFormat::REVERSED32;
        let fwd_pos: [usize; 4] = core::array::from_fn(|i| fwd.position(i));
        let rev_pos: [usize; 4] = core::array::from_fn(|i| rev.position(i));
        assert_eq!(fwd_pos, [0, 1, 2, 3]);
        assert_eq!(rev_pos, [3, 2, 1, 0]);
    }
}
