use crate::{
    bits::{
        read_bits_at, reverse_bits_n, swap_byte_chunks, unswap_byte_chunks, write_bits_at,
    },
    codec::{Backend, Codec, CodecCache},
    compiled::{CodecBinding, Primitive, Wire},
    errors::{BitsError, CompileError, DecodeError, EncodeError},
    order::{BaseUnits, Endian},
    value::Value,
};

use super::{complex_parts, decode_complex, decode_octets, decode_word, encode_octets, encode_word};

use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Backend for records measured in bits.
///
/// Fields start at arbitrary bit offsets. Numeric words are laid out
/// MSB-first; a little endian field stores its 8-bit chunks in reverse
/// order and an LSB-first record mirrors each field's bits. Bytes and text
/// are never byte-swapped. Integers without an explicit signedness are
/// unsigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitBackend;

fn read_word(data: &[u8], pos: usize, bits: usize, p: &Primitive) -> Result<u64, BitsError> {
    let mut raw = read_bits_at(data, pos, bits)?;
    if p.endian == Endian::Little {
        raw = unswap_byte_chunks(raw, bits);
    }
    if p.lsb_first {
        raw = reverse_bits_n(raw, bits);
    }
    Ok(raw)
}

fn write_word(
    buf: &mut [u8],
    pos: usize,
    bits: usize,
    p: &Primitive,
    word: u64,
) -> Result<(), BitsError> {
    let mut raw = word;
    if p.lsb_first {
        raw = reverse_bits_n(raw, bits);
    }
    if p.endian == Endian::Little {
        raw = swap_byte_chunks(raw, bits);
    }
    write_bits_at(buf, pos, bits, raw)
}

fn read_octets(data: &[u8], p: &Primitive) -> Result<Vec<u8>, BitsError> {
    let mut octets = (0..p.size / 8)
        .map(|i| read_bits_at(data, p.offset + 8 * i, 8).map(|b| b as u8))
        .collect::<Result<Vec<_>, _>>()?;
    if p.lsb_first {
        octets.reverse();
        octets.iter_mut().for_each(|b| *b = b.reverse_bits());
    }
    Ok(octets)
}

fn write_octets(buf: &mut [u8], p: &Primitive, mut octets: Vec<u8>) -> Result<(), BitsError> {
    if p.lsb_first {
        octets.reverse();
        octets.iter_mut().for_each(|b| *b = b.reverse_bits());
    }
    for (i, b) in octets.into_iter().enumerate() {
        write_bits_at(buf, p.offset + 8 * i, 8, u64::from(b))?;
    }
    Ok(())
}

impl Backend for BitBackend {
    const BASE_UNITS: BaseUnits = BaseUnits::Bits;
    const DEFAULT_SIGNED: bool = BaseUnits::Bits.default_signed();

    fn check(p: &Primitive) -> Result<(), CompileError> {
        let supported = match p.wire {
            Wire::Bool | Wire::Int { .. } => (1..=64).contains(&p.size),
            Wire::Float => matches!(p.size, 16 | 32 | 64),
            Wire::Complex => matches!(p.size, 32 | 64 | 128),
            Wire::Bytes | Wire::Text(_) => p.size % 8 == 0,
            Wire::Padding => true,
        };
        if supported {
            Ok(())
        } else {
            Err(CompileError::UnsupportedWidth {
                field: p.name.clone(),
                kind: p.wire.name(),
                size: p.size,
            })
        }
    }

    fn unpack(binding: &CodecBinding, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
        let mut values = Vec::with_capacity(binding.value_count());

        for p in binding.value_primitives() {
            let value = match p.wire {
                Wire::Bytes | Wire::Text(_) => decode_octets(p, read_octets(data, p)?)?,
                Wire::Complex => {
                    let half = p.size / 2;
                    let re = read_word(data, p.offset, half, p)?;
                    let im = read_word(data, p.offset + half, half, p)?;
                    decode_complex(half, re, im)
                }
                _ => decode_word(p, p.size, read_word(data, p.offset, p.size, p)?),
            };
            values.push(value);
        }

        Ok(values)
    }

    fn pack(binding: &CodecBinding, values: &[Value]) -> Result<Vec<u8>, EncodeError> {
        let mut buf = vec![0u8; binding.size_bytes()];

        for (p, value) in binding.value_primitives().zip(values) {
            match p.wire {
                Wire::Bytes | Wire::Text(_) => {
                    let octets = encode_octets(p, p.size / 8, value)?;
                    write_octets(&mut buf, p, octets)?;
                }
                Wire::Complex => {
                    let (re, im) = complex_parts(p, value)?;
                    let half = p.size / 2;
                    write_word(&mut buf, p.offset, half, p, encode_word(p, half, &re)?)?;
                    write_word(&mut buf, p.offset + half, half, p, encode_word(p, half, &im)?)?;
                }
                _ => {
                    let word = encode_word(p, p.size, value)?;
                    write_word(&mut buf, p.offset, p.size, p, word)?;
                }
            }
        }

        Ok(buf)
    }

    fn cache_slot(cache: &CodecCache) -> &OnceCell<Arc<Codec<Self>>> {
        &cache.bits
    }
}
