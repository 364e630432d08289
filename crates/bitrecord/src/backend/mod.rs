//! Backends realizing a [crate::compiled::CodecBinding].
//!
//! Both backends share the conversions between [Value]s and raw wire words
//! defined here, so range checks and text rules are identical for byte and
//! bit records. Integers that do not fit their width are rejected, never
//! truncated. Floats narrow to 32 or 16 bits with IEEE rounding, so values
//! beyond the target range become infinities.

mod bits;
mod bytes;

pub use bits::BitBackend;
pub use bytes::ByteBackend;

use half::f16;

use crate::{
    bits::{low_mask, sign_extend},
    compiled::{Primitive, Wire},
    errors::{DecodeError, EncodeError},
    field::Encoding,
    value::Value,
};

fn mismatch(p: &Primitive) -> EncodeError {
    EncodeError::TypeMismatch {
        field: p.name.clone(),
        expected: p.wire.name(),
    }
}

/// Raw `bits`-wide word for a bool, int or float primitive.
pub(crate) fn encode_word(p: &Primitive, bits: usize, value: &Value) -> Result<u64, EncodeError> {
    match (p.wire, value) {
        (Wire::Bool, Value::Bool(v)) => Ok(u64::from(*v)),
        (Wire::Int { signed }, Value::I64(_) | Value::U64(_)) => {
            let n = match value {
                Value::I64(v) => i128::from(*v),
                Value::U64(v) => i128::from(*v),
                _ => return Err(mismatch(p)),
            };
            let (min, max) = if signed {
                (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
            } else {
                (0, (1i128 << bits) - 1)
            };
            if n < min || n > max {
                return Err(EncodeError::ValueOutOfRange {
                    field: p.name.clone(),
                    bits,
                });
            }
            Ok((n as u64) & low_mask(bits))
        }
        (Wire::Float | Wire::Complex, Value::F64(v)) => {
            float_to_bits(*v, bits).ok_or_else(|| EncodeError::ValueOutOfRange {
                field: p.name.clone(),
                bits,
            })
        }
        _ => Err(mismatch(p)),
    }
}

/// Value of a raw `bits`-wide word. Complex primitives decode each half as a float.
pub(crate) fn decode_word(p: &Primitive, bits: usize, raw: u64) -> Value {
    match p.wire {
        Wire::Bool => Value::Bool(raw != 0),
        Wire::Int { signed: true } => Value::I64(sign_extend(raw, bits)),
        Wire::Int { signed: false } => Value::U64(raw),
        _ => Value::F64(float_from_bits(raw, bits)),
    }
}

fn float_to_bits(v: f64, bits: usize) -> Option<u64> {
    match bits {
        16 => Some(u64::from(f16::from_f64(v).to_bits())),
        32 => Some(u64::from((v as f32).to_bits())),
        64 => Some(v.to_bits()),
        _ => None,
    }
}

fn float_from_bits(raw: u64, bits: usize) -> f64 {
    match bits {
        16 => f16::from_bits(raw as u16).to_f64(),
        32 => f64::from(f32::from_bits(raw as u32)),
        _ => f64::from_bits(raw),
    }
}

/// Complex value from the raw `half`-wide words of its real and imaginary parts.
pub(crate) fn decode_complex(half: usize, re: u64, im: u64) -> Value {
    Value::Complex(float_from_bits(re, half), float_from_bits(im, half))
}

/// Real and imaginary parts of a complex value.
pub(crate) fn complex_parts(p: &Primitive, value: &Value) -> Result<(Value, Value), EncodeError> {
    match value {
        Value::Complex(re, im) => Ok((Value::F64(*re), Value::F64(*im))),
        _ => Err(mismatch(p)),
    }
}

/// Bytes of a bytes or text primitive, zero-padded to `len`.
pub(crate) fn encode_octets(p: &Primitive, len: usize, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut octets = match (p.wire, value) {
        (Wire::Bytes, Value::Bytes(v)) => v.clone(),
        (Wire::Text(encoding), Value::Text(s)) => {
            if encoding == Encoding::Ascii && !s.is_ascii() {
                return Err(EncodeError::InvalidText {
                    field: p.name.clone(),
                    encoding: encoding.name(),
                });
            }
            s.as_bytes().to_vec()
        }
        _ => return Err(mismatch(p)),
    };
    if octets.len() > len {
        return Err(EncodeError::TooLong {
            field: p.name.clone(),
            max: len,
            actual: octets.len(),
        });
    }
    octets.resize(len, 0);
    Ok(octets)
}

/// Value of a bytes or text primitive. Trailing NUL padding is stripped from text.
pub(crate) fn decode_octets(p: &Primitive, octets: Vec<u8>) -> Result<Value, DecodeError> {
    let Wire::Text(encoding) = p.wire else {
        return Ok(Value::Bytes(octets));
    };

    let end = octets.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let invalid = || DecodeError::InvalidText {
        field: p.name.clone(),
        encoding: encoding.name(),
    };
    let text = &octets[..end];
    if encoding == Encoding::Ascii && !text.is_ascii() {
        return Err(invalid());
    }
    String::from_utf8(text.to_vec())
        .map(Value::Text)
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use crate::order::Endian;

    use super::*;

    fn prim(wire: Wire) -> Primitive {
        Primitive {
            name: "f".to_string(),
            wire,
            offset: 0,
            size: 0,
            endian: Endian::Big,
            lsb_first: false,
        }
    }

    #[test]
    fn test_int_range_is_checked() {
        let signed = prim(Wire::Int { signed: true });
        assert_eq!(encode_word(&signed, 3, &Value::I64(-4)), Ok(0b100));
        assert_eq!(encode_word(&signed, 3, &Value::U64(3)), Ok(0b011));
        assert_eq!(
            encode_word(&signed, 3, &Value::I64(4)),
            Err(EncodeError::ValueOutOfRange {
                field: "f".to_string(),
                bits: 3
            })
        );

        let unsigned = prim(Wire::Int { signed: false });
        assert_eq!(encode_word(&unsigned, 64, &Value::U64(u64::MAX)), Ok(u64::MAX));
        assert!(encode_word(&unsigned, 8, &Value::I64(-1)).is_err());
        assert!(encode_word(&unsigned, 8, &Value::U64(256)).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            encode_word(&prim(Wire::Bool), 1, &Value::I64(1)),
            Err(EncodeError::TypeMismatch {
                field: "f".to_string(),
                expected: "bool"
            })
        );
    }

    #[test]
    fn test_half_float() {
        let p = prim(Wire::Float);
        assert_eq!(encode_word(&p, 16, &Value::F64(10.0)), Ok(0x4900));
        assert_eq!(decode_word(&p, 16, 0x4900), Value::F64(10.0));
    }

    #[test]
    fn test_octets() {
        let text = prim(Wire::Text(Encoding::Ascii));
        assert_eq!(
            encode_octets(&text, 4, &Value::Text("ab".to_string())).unwrap(),
            b"ab\0\0".to_vec()
        );
        assert!(encode_octets(&text, 4, &Value::Text("é".to_string())).is_err());
        assert!(encode_octets(&text, 1, &Value::Text("ab".to_string())).is_err());
        assert_eq!(
            decode_octets(&text, b"ab\0\0".to_vec()).unwrap(),
            Value::Text("ab".to_string())
        );

        let bytes = prim(Wire::Bytes);
        assert_eq!(
            decode_octets(&bytes, b"ab\0".to_vec()).unwrap(),
            Value::Bytes(b"ab\0".to_vec())
        );
    }
}
