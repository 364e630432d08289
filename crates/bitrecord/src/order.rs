//! Base units and the byte/bit order policies of a record.

use std::{fmt, str::FromStr};

use crate::errors::SchemaError;

/// Granularity in which a record expresses its field offsets and sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BaseUnits {
    Bits,
    Bytes,
}

impl BaseUnits {
    /// Number of bits in `units` of this granularity.
    pub fn to_bits(self, units: usize) -> usize {
        match self {
            BaseUnits::Bits => units,
            BaseUnits::Bytes => units.saturating_mul(8),
        }
    }

    /// Signedness of integer fields that leave it open: signed in byte
    /// records, unsigned in bit records.
    pub const fn default_signed(self) -> bool {
        matches!(self, BaseUnits::Bytes)
    }

    /// Number of whole bytes needed to hold `units`, rounding up for bits.
    pub fn to_bytes(self, units: usize) -> usize {
        match self {
            BaseUnits::Bits => units.div_ceil(8),
            BaseUnits::Bytes => units,
        }
    }
}

impl fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseUnits::Bits => f.write_str("bits"),
            BaseUnits::Bytes => f.write_str("bytes"),
        }
    }
}

impl FromStr for BaseUnits {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bits" => Ok(BaseUnits::Bits),
            "bytes" => Ok(BaseUnits::Bytes),
            other => Err(SchemaError::UnknownLiteral {
                what: "base units",
                value: other.to_string(),
            }),
        }
    }
}

/// Concrete endianness used on the wire once a [ByteOrder] has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Endianness of the target platform.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        }
    }
}

/// Declared byte order of a record.
///
/// `Default` is resolved per base unit: byte records use the native order
/// while bit records use big-endian. See [ByteOrder::resolve].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ByteOrder {
    Be,
    Le,
    Native,
    #[default]
    Default,
}

impl ByteOrder {
    /// Resolves this order to the endianness used for a record in `units`.
    pub fn resolve(self, units: BaseUnits) -> Endian {
        match (self, units) {
            (ByteOrder::Be, _) => Endian::Big,
            (ByteOrder::Le, _) => Endian::Little,
            (ByteOrder::Native, _) => Endian::native(),
            (ByteOrder::Default, BaseUnits::Bytes) => Endian::native(),
            (ByteOrder::Default, BaseUnits::Bits) => Endian::Big,
        }
    }
}

impl From<Endian> for ByteOrder {
    fn from(value: Endian) -> Self {
        match value {
            Endian::Big => ByteOrder::Be,
            Endian::Little => ByteOrder::Le,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ByteOrder::Be => "be",
            ByteOrder::Le => "le",
            ByteOrder::Native => "native",
            ByteOrder::Default => "default",
        })
    }
}

impl FromStr for ByteOrder {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "be" | ">" => Ok(ByteOrder::Be),
            "le" | "<" => Ok(ByteOrder::Le),
            "native" => Ok(ByteOrder::Native),
            "default" | "" => Ok(ByteOrder::Default),
            other => Err(SchemaError::UnknownLiteral {
                what: "byte order",
                value: other.to_string(),
            }),
        }
    }
}

/// Declared bit order of a bit record: which end of a field is written first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BitOrder {
    Msb,
    Lsb,
    #[default]
    Default,
}

impl BitOrder {
    /// True when the resolved order is LSB-first. `Default` resolves to MSB-first.
    pub fn is_lsb_first(self) -> bool {
        matches!(self, BitOrder::Lsb)
    }
}

impl fmt::Display for BitOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BitOrder::Msb => "msb",
            BitOrder::Lsb => "lsb",
            BitOrder::Default => "default",
        })
    }
}

impl FromStr for BitOrder {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "msb" => Ok(BitOrder::Msb),
            "lsb" => Ok(BitOrder::Lsb),
            "default" | "" => Ok(BitOrder::Default),
            other => Err(SchemaError::UnknownLiteral {
                what: "bit order",
                value: other.to_string(),
            }),
        }
    }
}
