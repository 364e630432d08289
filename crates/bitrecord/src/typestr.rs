//! Compact type literals of the form `[order][kind][size]`, e.g. `">u4"` or `"i12"`.
//!
//! * order: `>` big-endian, `<` little-endian, `|` or nothing for "not specified"
//! * kind: `i` signed int, `u` unsigned int, `f` float, `c` complex, `S` bytes
//! * size: item size in the base units of the record the field belongs to

use std::{fmt, str::FromStr};

use crate::{errors::TypeStrError, order::Endian};

/// Logical kind encoded by a type literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Int,
    Float,
    Complex,
    Bytes,
}

/// Parameters carried by a type literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeParams {
    pub byte_order: Option<Endian>,
    pub code: TypeCode,
    pub size: Option<usize>,
    /// Only set for integer literals.
    pub signed: Option<bool>,
}

// Codes valid in the array-interface grammar that have no field type here.
const UNSUPPORTED_CODES: &str = "?bBtmMUVOa";

impl TypeParams {
    /// Parses a type literal.
    ///
    /// ```
    /// use bitrecord::typestr::{TypeCode, TypeParams};
    /// use bitrecord::order::Endian;
    ///
    /// let params = TypeParams::parse(">u4").unwrap();
    /// assert_eq!(params.byte_order, Some(Endian::Big));
    /// assert_eq!(params.code, TypeCode::Int);
    /// assert_eq!(params.size, Some(4));
    /// assert_eq!(params.signed, Some(false));
    /// ```
    pub fn parse(literal: &str) -> Result<Self, TypeStrError> {
        let malformed = || TypeStrError::Malformed(literal.to_string());

        let mut chars = literal.chars().peekable();
        let byte_order = match chars.peek() {
            Some('>') => Some(Some(Endian::Big)),
            Some('<') => Some(Some(Endian::Little)),
            Some('|') => Some(None),
            _ => None,
        };
        if byte_order.is_some() {
            chars.next();
        }

        let code_char = chars.next().ok_or_else(malformed)?;
        let digits: String = chars.collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let (code, signed) = match code_char {
            'i' => (TypeCode::Int, Some(true)),
            'u' => (TypeCode::Int, Some(false)),
            'f' => (TypeCode::Float, None),
            'c' => (TypeCode::Complex, None),
            'S' => (TypeCode::Bytes, None),
            c if UNSUPPORTED_CODES.contains(c) => {
                return Err(TypeStrError::UnsupportedKind {
                    literal: literal.to_string(),
                    code: c,
                });
            }
            _ => return Err(malformed()),
        };

        let size = if digits.is_empty() {
            None
        } else {
            match digits.parse::<usize>() {
                Ok(0) | Err(_) => return Err(TypeStrError::InvalidSize(literal.to_string())),
                Ok(size) => Some(size),
            }
        };

        Ok(TypeParams {
            byte_order: byte_order.flatten(),
            code,
            size,
            signed,
        })
    }
}

impl FromStr for TypeParams {
    type Err = TypeStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeParams::parse(s)
    }
}

impl fmt::Display for TypeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.byte_order {
            Some(Endian::Big) => f.write_str(">")?,
            Some(Endian::Little) => f.write_str("<")?,
            None => {}
        }
        let code = match (self.code, self.signed) {
            (TypeCode::Int, Some(false)) => 'u',
            (TypeCode::Int, _) => 'i',
            (TypeCode::Float, _) => 'f',
            (TypeCode::Complex, _) => 'c',
            (TypeCode::Bytes, _) => 'S',
        };
        write!(f, "{code}")?;
        if let Some(size) = self.size {
            write!(f, "{size}")?;
        }
        Ok(())
    }
}
