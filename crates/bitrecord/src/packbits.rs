//! Generic packing of fixed-width samples (1 to 8 bits each) into bytes.
//!
//! Samples are stored back to back, MSB-first, with no alignment between
//! them. Unpacking works on the smallest window of whole bytes that holds a
//! whole number of samples: `B / gcd(B, 8)` bytes, i.e. `8 / gcd(B, 8)`
//! samples.

use tracing::warn;

use crate::{
    bits::{low_mask, sign_extend},
    errors::{BitPackError, Warning},
};

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn check_width(bits: usize) -> Result<(), BitPackError> {
    if bits == 0 || bits > 8 {
        return Err(BitPackError::UnsupportedWidth(bits));
    }
    Ok(())
}

/// Bytes per chunk and samples per chunk for samples of `bits` bits.
pub fn chunk_layout(bits: usize) -> Result<(usize, usize), BitPackError> {
    check_width(bits)?;
    let chunk_bytes = bits / gcd(bits, 8);
    Ok((chunk_bytes, chunk_bytes * 8 / bits))
}

/// Unpacks all `bits`-wide unsigned samples contained in `data`.
///
/// `data.len()` must be a multiple of the chunk size (see [chunk_layout]).
///
/// ```
/// use bitrecord::packbits::unpack_bits;
///
/// let samples = unpack_bits(&[0b00000101, 0b00111001, 0b01110111], 3).unwrap();
/// assert_eq!(samples, vec![0, 1, 2, 3, 4, 5, 6, 7]);
/// ```
pub fn unpack_bits(data: &[u8], bits: usize) -> Result<Vec<u8>, BitPackError> {
    let (chunk_bytes, samples_per_chunk) = chunk_layout(bits)?;
    if bits == 8 {
        return Ok(data.to_vec());
    }
    if data.len() % chunk_bytes != 0 {
        return Err(BitPackError::IncompleteChunk {
            len: data.len(),
            chunk_bytes,
        });
    }

    let mask = low_mask(bits);
    let mut out = Vec::with_capacity(data.len() / chunk_bytes * samples_per_chunk);
    for chunk in data.chunks_exact(chunk_bytes) {
        let word = chunk
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        for k in 0..samples_per_chunk {
            let shift = bits * (samples_per_chunk - 1 - k);
            out.push(((word >> shift) & mask) as u8);
        }
    }

    Ok(out)
}

/// Like [unpack_bits], reading every sample as a two's complement value.
pub fn unpack_bits_signed(data: &[u8], bits: usize) -> Result<Vec<i8>, BitPackError> {
    Ok(unpack_bits(data, bits)?
        .into_iter()
        .map(|v| sign_extend(u64::from(v), bits) as i8)
        .collect())
}

/// Packs `values` as `bits`-wide samples.
///
/// A trailing partial byte is zero-padded and a [Warning::Padding] is logged.
/// Values that do not fit in `bits` bits are rejected.
pub fn pack_bits(values: &[u8], bits: usize) -> Result<Vec<u8>, BitPackError> {
    check_width(bits)?;

    let limit = 1u16 << bits;
    let mut out = Vec::with_capacity((values.len() * bits).div_ceil(8));
    let mut acc = 0u16;
    let mut filled = 0usize;

    for (index, &value) in values.iter().enumerate() {
        if u16::from(value) >= limit {
            return Err(BitPackError::ValueOverflow { index, value, bits });
        }
        acc = (acc << bits) | u16::from(value);
        filled += bits;
        if filled >= 8 {
            filled -= 8;
            out.push((acc >> filled) as u8);
            acc &= (1 << filled) - 1;
        }
    }

    if filled > 0 {
        let warning = Warning::Padding { bits: 8 - filled };
        warn!("{warning}");
        out.push((acc << (8 - filled)) as u8);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_layout() {
        assert_eq!(chunk_layout(1), Ok((1, 8)));
        assert_eq!(chunk_layout(3), Ok((3, 8)));
        assert_eq!(chunk_layout(4), Ok((1, 2)));
        assert_eq!(chunk_layout(6), Ok((3, 4)));
        assert_eq!(chunk_layout(8), Ok((1, 1)));
    }

    #[test]
    fn test_unsupported_width() {
        assert_eq!(unpack_bits(&[0], 9), Err(BitPackError::UnsupportedWidth(9)));
        assert_eq!(unpack_bits(&[0], 0), Err(BitPackError::UnsupportedWidth(0)));
        assert_eq!(pack_bits(&[0], 12), Err(BitPackError::UnsupportedWidth(12)));
    }

    #[test]
    fn test_unpack_pass_through() {
        assert_eq!(unpack_bits(&[1, 2, 255], 8).unwrap(), vec![1, 2, 255]);
    }

    #[test]
    fn test_unpack_two_bits() {
        assert_eq!(unpack_bits(&[0b00011011], 2).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_unpack_incomplete_chunk() {
        assert_eq!(
            unpack_bits(&[0, 0], 3),
            Err(BitPackError::IncompleteChunk {
                len: 2,
                chunk_bytes: 3
            })
        );
    }

    #[test]
    fn test_unpack_signed() {
        assert_eq!(
            unpack_bits_signed(&[0b0111_1000, 0b1111_0001], 4).unwrap(),
            vec![7, -8, -1, 1]
        );
    }

    #[test]
    fn test_pack_partial_byte_is_zero_padded() {
        assert_eq!(pack_bits(&[1], 3).unwrap(), vec![0b0010_0000]);
        assert_eq!(pack_bits(&[7, 7, 7], 3).unwrap(), vec![0xFF, 0b1000_0000]);
    }

    #[test]
    fn test_pack_overflow() {
        assert_eq!(
            pack_bits(&[1, 8], 3),
            Err(BitPackError::ValueOverflow {
                index: 1,
                value: 8,
                bits: 3
            })
        );
    }
}
