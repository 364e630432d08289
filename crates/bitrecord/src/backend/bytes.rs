use crate::{
    codec::{Backend, Codec, CodecCache},
    compiled::{CodecBinding, Primitive, Wire},
    errors::{CompileError, DecodeError, EncodeError},
    order::{BaseUnits, Endian},
    value::Value,
};

use super::{complex_parts, decode_complex, decode_octets, decode_word, encode_octets, encode_word};

use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Backend for records measured in bytes.
///
/// Integers take 1, 2, 4 or 8 bytes, floats 2, 4 or 8 (2 is IEEE half
/// precision), complex values 8 or 16 and booleans 1. Integers without an
/// explicit signedness are signed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteBackend;

fn read_word(bytes: &[u8], endian: Endian) -> u64 {
    let n = bytes.len();
    let mut buf = [0u8; 8];
    match endian {
        Endian::Big => {
            buf[8 - n..].copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        }
        Endian::Little => {
            buf[..n].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
    }
}

fn write_word(dst: &mut [u8], endian: Endian, word: u64) {
    let n = dst.len();
    match endian {
        Endian::Big => dst.copy_from_slice(&word.to_be_bytes()[8 - n..]),
        Endian::Little => dst.copy_from_slice(&word.to_le_bytes()[..n]),
    }
}

impl Backend for ByteBackend {
    const BASE_UNITS: BaseUnits = BaseUnits::Bytes;
    const DEFAULT_SIGNED: bool = BaseUnits::Bytes.default_signed();

    fn check(p: &Primitive) -> Result<(), CompileError> {
        let supported = match p.wire {
            Wire::Bool => p.size == 1,
            Wire::Int { .. } => matches!(p.size, 1 | 2 | 4 | 8),
            Wire::Float => matches!(p.size, 2 | 4 | 8),
            Wire::Complex => matches!(p.size, 8 | 16),
            Wire::Bytes | Wire::Text(_) | Wire::Padding => true,
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
            let bytes = data
                .get(p.offset..p.offset + p.size)
                .ok_or(DecodeError::InsufficientData {
                    expected: binding.size_bytes(),
                    actual: data.len(),
                })?;

            let value = match p.wire {
                Wire::Bytes | Wire::Text(_) => decode_octets(p, bytes.to_vec())?,
                Wire::Complex => {
                    let (re, im) = bytes.split_at(p.size / 2);
                    decode_complex(p.size * 4, read_word(re, p.endian), read_word(im, p.endian))
                }
                _ => decode_word(p, p.size * 8, read_word(bytes, p.endian)),
            };
            values.push(value);
        }

        Ok(values)
    }

    fn pack(binding: &CodecBinding, values: &[Value]) -> Result<Vec<u8>, EncodeError> {
        let mut buf = vec![0u8; binding.size_bytes()];

        for (p, value) in binding.value_primitives().zip(values) {
            let dst = &mut buf[p.offset..p.offset + p.size];
            match p.wire {
                Wire::Bytes | Wire::Text(_) => {
                    dst.copy_from_slice(&encode_octets(p, p.size, value)?);
                }
                Wire::Complex => {
                    let (re, im) = complex_parts(p, value)?;
                    let bits = p.size * 4;
                    let (re_dst, im_dst) = dst.split_at_mut(p.size / 2);
                    write_word(re_dst, p.endian, encode_word(p, bits, &re)?);
                    write_word(im_dst, p.endian, encode_word(p, bits, &im)?);
                }
                _ => write_word(dst, p.endian, encode_word(p, p.size * 8, value)?),
            }
        }

        Ok(buf)
    }

    fn cache_slot(cache: &CodecCache) -> &OnceCell<Arc<Codec<Self>>> {
        &cache.bytes
    }
}
