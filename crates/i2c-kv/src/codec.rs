//! Endianness codec.
//!
//! Moves fixed-width fields between host buffers and wire order. Register
//! numbers go through [`encode_scalar`]; register contents through
//! [`encode_array`] / [`decode_array`], which apply the same per-element
//! reordering. Reordering a single element is its own inverse, so decoding is
//! the same transform run the other way.
//!
//! Nothing here allocates. Element counts are clamped to what both buffers
//! can hold; the return value tells the caller how much was converted.

use crate::format::KvFormat;

/// Write the low `format.width()` bytes of `value` into `out` in wire order.
///
/// Byte `i` of the value, counting from the most significant byte of the
/// `width`-byte field, lands at position `i` for a forward format and at
/// `width - 1 - i` for a reversed one. Bits above `width * 8` are dropped.
///
/// Returns the number of bytes written, which is less than the width only
/// when `out` is too short.
///
/// ```
/// use i2c_kv::{codec::encode_scalar, KvFormat};
///
/// let mut out = [0u8; 2];
/// encode_scalar(0x1234, KvFormat::FORWARD16, &mut out);
/// assert_eq!(out, [0x12, 0x34]);
/// encode_scalar(0x1234, KvFormat::REVERSED16, &mut out);
/// assert_eq!(out, [0x34, 0x12]);
/// ```
pub fn encode_scalar(value: u64, format: KvFormat, out: &mut [u8]) -> usize {
    let width = format.width();
    let be = value.to_be_bytes();
    // Value bytes of the `width`-byte field, most significant first.
    let field = be.get(be.len().saturating_sub(width)..).unwrap_or(&[]);

    field
        .iter()
        .enumerate()
        .filter_map(|(index, byte)| {
            let slot = out.get_mut(format.position(index))?;
            *slot = *byte;
            Some(())
        })
        .count()
}

/// Convert `count` host-order elements from `src` into wire order in `dst`.
///
/// Returns the number of elements converted.
pub fn encode_array(src: &[u8], format: KvFormat, count: usize, dst: &mut [u8]) -> usize {
    reorder(src, format, count, dst)
}

/// Convert `count` wire-order elements from `src` into host order in `dst`.
///
/// Returns the number of elements converted.
pub fn decode_array(src: &[u8], format: KvFormat, count: usize, dst: &mut [u8]) -> usize {
    reorder(src, format, count, dst)
}

fn reorder(src: &[u8], format: KvFormat, count: usize, dst: &mut [u8]) -> usize {
    let width = format.width();
    let mut converted = 0usize;
    for (from, to) in src
        .chunks_exact(width)
        .zip(dst.chunks_exact_mut(width))
        .take(count)
    {
        for (index, byte) in from.iter().enumerate() {
            if let Some(slot) = to.get_mut(format.position(index)) {
                *slot = *byte;
            }
        }
        converted = converted.saturating_add(1);
    }
    converted
}
