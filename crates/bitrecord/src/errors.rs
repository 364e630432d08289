//! Error types for schema building, codec compilation, decoding and encoding.

use thiserror::Error;

use crate::order::{BaseUnits, ByteOrder};

/// Errors produced when parsing a compact type literal such as `">u4"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeStrError {
    /// The literal does not match `[order][kind][size]`.
    #[error("invalid data type specifier: {0:?}")]
    Malformed(String),
    /// The kind code belongs to the array-interface grammar but has no field type here.
    #[error("type code {code:?} in {literal:?} is not supported")]
    UnsupportedKind { literal: String, code: char },
    /// The size part is zero or does not fit in `usize`.
    #[error("invalid size in type literal {0:?}")]
    InvalidSize(String),
}

/// Broad classification of a [SchemaError].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// The declared layout contradicts itself (overlaps, sizes, orders).
    Consistency,
    /// A field type cannot be represented on the wire.
    UnsupportedType,
    /// A parameter has an invalid value.
    InvalidValue,
}

/// Errors produced when building a [crate::schema::RecordSchema] or an [crate::field::EnumType].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field {field:?} at offset {offset} overlaps the previous field ending at {min_offset}")]
    Overlap {
        field: String,
        offset: usize,
        min_offset: usize,
    },
    #[error("record size {declared} is smaller than the total size of its fields ({computed})")]
    SizeTooSmall { declared: usize, computed: usize },
    #[error("field {field:?} declares size {declared} but its record type has size {expected}")]
    NestedSizeMismatch {
        field: String,
        declared: usize,
        expected: usize,
    },
    #[error("field {field:?} uses {nested} while the enclosing record uses {parent}")]
    NestedBaseUnits {
        field: String,
        parent: BaseUnits,
        nested: BaseUnits,
    },
    #[error("byte order of field {field:?} ({field_order}) is not consistent with the record byte order ({record_order})")]
    ByteOrderConflict {
        field: String,
        field_order: ByteOrder,
        record_order: ByteOrder,
    },
    #[error("bit order of nested record {field:?} is not consistent with the enclosing record")]
    BitOrderConflict { field: String },
    #[error("type literal {literal:?} is incompatible with the {param} given for field {field:?}")]
    TypeStrConflict {
        field: String,
        literal: String,
        param: &'static str,
    },

    #[error("enum {0:?} mixes member values of incompatible types")]
    MixedEnumValues(String),
    #[error("repeat given for non-sequence field {0:?}")]
    RepeatWithoutSequence(String),
    #[error("no repeat given for sequence field {0:?}")]
    SequenceWithoutRepeat(String),
    #[error("sequence field {0:?} has an element type that cannot be repeated")]
    UnsupportedElement(String),
    #[error(transparent)]
    TypeStr(#[from] TypeStrError),

    #[error("size not specified for field {0:?}")]
    MissingSize(String),
    #[error("field {0:?} has a zero size")]
    ZeroSize(String),
    #[error("field {0:?} has a zero repeat count")]
    ZeroRepeat(String),
    #[error("size or offset of field {0:?} does not fit in usize")]
    SizeOverflow(String),
    #[error("bit order can only be set on records measured in bits")]
    BitOrderOnBytes,
    #[error("a record needs at least one field")]
    EmptyRecord,
    #[error("field names must not be empty")]
    EmptyName,
    #[error("duplicate field name {0:?}")]
    DuplicateName(String),
    #[error("enum {0:?} has no members")]
    EmptyEnum(String),
    #[error("enum {enum_name:?} declares member {member:?} twice")]
    DuplicateMember { enum_name: String, member: String },
    #[error("unknown {what} {value:?}")]
    UnknownLiteral { what: &'static str, value: String },
    #[error("default of field {field:?} is not a valid {expected}")]
    InvalidDefault {
        field: String,
        expected: &'static str,
    },
}

impl SchemaError {
    /// Classifies this error as a consistency, type or value problem.
    pub fn kind(&self) -> SchemaErrorKind {
        match self {
            SchemaError::Overlap { .. }
            | SchemaError::SizeTooSmall { .. }
            | SchemaError::NestedSizeMismatch { .. }
            | SchemaError::NestedBaseUnits { .. }
            | SchemaError::ByteOrderConflict { .. }
            | SchemaError::BitOrderConflict { .. }
            | SchemaError::TypeStrConflict { .. } => SchemaErrorKind::Consistency,
            SchemaError::MixedEnumValues(_)
            | SchemaError::RepeatWithoutSequence(_)
            | SchemaError::SequenceWithoutRepeat(_)
            | SchemaError::UnsupportedElement(_)
            | SchemaError::TypeStr(TypeStrError::UnsupportedKind { .. }) => {
                SchemaErrorKind::UnsupportedType
            }
            SchemaError::TypeStr(_)
            | SchemaError::MissingSize(_)
            | SchemaError::ZeroSize(_)
            | SchemaError::ZeroRepeat(_)
            | SchemaError::SizeOverflow(_)
            | SchemaError::BitOrderOnBytes
            | SchemaError::EmptyRecord
            | SchemaError::EmptyName
            | SchemaError::DuplicateName(_)
            | SchemaError::EmptyEnum(_)
            | SchemaError::DuplicateMember { .. }
            | SchemaError::UnknownLiteral { .. }
            | SchemaError::InvalidDefault { .. } => SchemaErrorKind::InvalidValue,
        }
    }
}

/// Errors produced when compiling a schema for a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("backend handles records in {expected}, schema is in {actual}")]
    BaseUnitsMismatch {
        expected: BaseUnits,
        actual: BaseUnits,
    },
    #[error("field {field:?}: {kind} of size {size} is not supported by this backend")]
    UnsupportedWidth {
        field: String,
        kind: &'static str,
        size: usize,
    },
}

/// Errors from the low-level bit cursor helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitsError {
    /// Requested bit range is beyond the end of the buffer.
    #[error("bit range is out of bounds")]
    OutOfBounds,
    /// More than 64 bits were requested in a single access.
    #[error("at most 64 bits can be accessed at once")]
    TooManyBits,
}

/// Errors produced by [crate::codec::Codec::decode].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },
    #[error("field {field:?}: no enum member has value {value}")]
    UnknownEnumValue { field: String, value: String },
    #[error("field {field:?} does not hold valid {encoding} text")]
    InvalidText {
        field: String,
        encoding: &'static str,
    },
    #[error("missing field {0:?}")]
    MissingField(String),
    #[error("field {field:?} is not {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Bits(#[from] BitsError),
}

/// Errors produced by [crate::codec::Codec::encode].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("missing field {0:?}")]
    MissingField(String),
    #[error("field {field:?} expects {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
    #[error("value of field {field:?} does not fit in {bits} bits")]
    ValueOutOfRange { field: String, bits: usize },
    #[error("field {field:?} holds {max} bytes, got {actual}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
    #[error("field {field:?} expects {expected} items, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("field {field:?}: {member:?} is not a member of the enum")]
    UnknownEnumMember { field: String, member: String },
    #[error("field {field:?} cannot be encoded as {encoding} text")]
    InvalidText {
        field: String,
        encoding: &'static str,
    },
    #[error(transparent)]
    Bits(#[from] BitsError),
}

/// Errors produced by the generic bit-packing primitives in [crate::packbits].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitPackError {
    #[error("bits per sample must be in the range 1..=8, got {0}")]
    UnsupportedWidth(usize),
    #[error("value {value} at index {index} does not fit in {bits} bits")]
    ValueOverflow { index: usize, value: u8, bits: usize },
    #[error("{len} bytes is not a whole number of {chunk_bytes}-byte chunks")]
    IncompleteChunk { len: usize, chunk_bytes: usize },
}

/// Errors surfaced by the convenience methods of [crate::codec::BinaryRecord].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Non-fatal conditions. They are logged through `tracing` and kept where a caller can inspect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("bit record size ({bits} bits) is not aligned to bytes")]
    Alignment { bits: usize },
    #[error("{bits} padding bits added to complete the last byte")]
    Padding { bits: usize },
}
