//! Low-level bit access and bit/byte order transforms for byte slices.
//!
//! Bits are addressed in MSB-first order: bit 0 is the high bit of the first byte.

use crate::errors::BitsError;

fn check_range(len_bytes: usize, bit_pos: usize, n: usize) -> Result<(), BitsError> {
    if n > 64 {
        return Err(BitsError::TooManyBits);
    }
    if bit_pos.checked_add(n).is_none_or(|end| end > len_bytes * 8) {
        return Err(BitsError::OutOfBounds);
    }
    Ok(())
}

/// Reads a single bit at `bit_pos` (0 = MSB of first byte). Returns 0 or 1.
pub fn read_bit_at(data: &[u8], bit_pos: usize) -> Result<u8, BitsError> {
    if bit_pos >= data.len() * 8 {
        return Err(BitsError::OutOfBounds);
    }

    Ok((data[bit_pos / 8] >> (7 - bit_pos % 8)) & 1)
}

/// Reads `n` bits starting at `bit_pos` as an unsigned value (max 64 bits). MSB-first.
pub fn read_bits_at(data: &[u8], bit_pos: usize, n: usize) -> Result<u64, BitsError> {
    check_range(data.len(), bit_pos, n)?;

    // whole bytes take the fast path
    if bit_pos % 8 == 0 && n % 8 == 0 {
        let start = bit_pos / 8;
        return Ok(data[start..start + n / 8]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)));
    }

    let mut value = 0u64;
    for pos in bit_pos..bit_pos + n {
        value = (value << 1) | u64::from(read_bit_at(data, pos)?);
    }

    Ok(value)
}

/// Writes the low `n` bits of `value` starting at `bit_pos`, MSB-first.
///
/// Only the targeted bits are modified.
pub fn write_bits_at(data: &mut [u8], bit_pos: usize, n: usize, value: u64) -> Result<(), BitsError> {
    check_range(data.len(), bit_pos, n)?;

    for i in 0..n {
        let bit = ((value >> (n - 1 - i)) & 1) as u8;
        let pos = bit_pos + i;
        let mask = 1u8 << (7 - pos % 8);
        if bit == 1 {
            data[pos / 8] |= mask;
        } else {
            data[pos / 8] &= !mask;
        }
    }

    Ok(())
}

/// Mask with the low `n` bits set.
pub fn low_mask(n: usize) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    if bits == 0 {
        return 0;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Reverses the low `n` bits of `x` (LSB becomes MSB of the result).
pub fn reverse_bits_n(x: u64, n: usize) -> u64 {
    if n == 0 {
        return 0;
    }
    x.reverse_bits() >> (64 - n)
}

/// Reverses the order of the 8-bit chunks of an `n`-bit value.
///
/// The value is split into chunks from its most significant end, so the last
/// chunk holds the `n % 8` remaining bits when `n` is not a multiple of 8.
/// That short chunk ends up first in the result.
pub fn swap_byte_chunks(x: u64, n: usize) -> u64 {
    if n <= 8 {
        return x;
    }
    let full = (n - 1) / 8;
    let tail = n - 8 * full;

    let mut out = x & low_mask(tail);
    for i in (0..full).rev() {
        let chunk = (x >> (n - 8 * (i + 1))) & 0xFF;
        out = (out << 8) | chunk;
    }
    out
}

/// Inverse of [swap_byte_chunks].
pub fn unswap_byte_chunks(x: u64, n: usize) -> u64 {
    if n <= 8 {
        return x;
    }
    let full = (n - 1) / 8;
    let tail = n - 8 * full;

    let mut out = 0u64;
    for i in 0..full {
        out = (out << 8) | ((x >> (8 * i)) & 0xFF);
    }
    (out << tail) | (x >> (8 * full))
}
