//! Backend contract, compiled codecs and the [BinaryRecord] trait.

use std::{fmt, marker::PhantomData, sync::Arc};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    backend::{BitBackend, ByteBackend},
    compiled::{self, CodecBinding, Primitive, RecordPlan},
    errors::{CompileError, DecodeError, EncodeError, RecordError},
    order::BaseUnits,
    schema::RecordSchema,
    value::{Record, Value},
};

/// A strategy that moves primitive values in and out of byte buffers.
///
/// A backend only accepts schemas measured in its [Backend::BASE_UNITS].
pub trait Backend: fmt::Debug + Send + Sync + Sized + 'static {
    const BASE_UNITS: BaseUnits;
    /// Signedness of integer fields that do not specify it.
    const DEFAULT_SIGNED: bool;

    /// Rejects primitives this backend cannot represent.
    fn check(primitive: &Primitive) -> Result<(), CompileError>;

    /// Reads one value per non-padding primitive. `data` holds at least the record size.
    fn unpack(binding: &CodecBinding, data: &[u8]) -> Result<Vec<Value>, DecodeError>;

    /// Writes one value per non-padding primitive into a buffer of the record size.
    fn pack(binding: &CodecBinding, values: &[Value]) -> Result<Vec<u8>, EncodeError>;

    #[doc(hidden)]
    fn cache_slot(cache: &CodecCache) -> &OnceCell<Arc<Codec<Self>>>;
}

/// Per-schema storage for compiled codecs, one slot per backend.
#[derive(Debug, Clone, Default)]
pub struct CodecCache {
    pub(crate) bytes: OnceCell<Arc<Codec<ByteBackend>>>,
    pub(crate) bits: OnceCell<Arc<Codec<BitBackend>>>,
}

/// Encoder/decoder compiled from a [RecordSchema] for backend `B`.
///
/// ```
/// use bitrecord::backend::ByteBackend;
/// use bitrecord::field::{FieldDescriptor, FieldType};
/// use bitrecord::order::{BaseUnits, ByteOrder};
/// use bitrecord::schema::RecordSchema;
/// use bitrecord::value::{Record, Value};
///
/// let schema = RecordSchema::builder(BaseUnits::Bytes)
///     .byte_order(ByteOrder::Be)
///     .field(FieldDescriptor::from_typestr("id", "u2").unwrap())
///     .field(FieldDescriptor::new("temp", FieldType::Float).with_size(4))
///     .build()
///     .unwrap();
///
/// let codec = schema.codec::<ByteBackend>().unwrap();
/// let record = Record::new().with("id", 258u64).with("temp", 1.5);
/// let bytes = codec.encode(&record).unwrap();
/// assert_eq!(bytes, [0x01, 0x02, 0x3F, 0xC0, 0x00, 0x00]);
/// assert_eq!(codec.decode(&bytes).unwrap().get("id"), Some(&Value::U64(258)));
/// ```
#[derive(Debug)]
pub struct Codec<B: Backend> {
    binding: CodecBinding,
    plan: RecordPlan,
    backend: PhantomData<B>,
}

impl<B: Backend> Codec<B> {
    /// Compiles `schema`. Prefer [RecordSchema::codec], which caches the result.
    pub fn compile(schema: &RecordSchema) -> Result<Self, CompileError> {
        if schema.base_units() != B::BASE_UNITS {
            return Err(CompileError::BaseUnitsMismatch {
                expected: B::BASE_UNITS,
                actual: schema.base_units(),
            });
        }

        let (binding, plan) = compiled::compile(schema, B::DEFAULT_SIGNED)?;
        for primitive in binding.primitives() {
            B::check(primitive)?;
        }
        debug!(
            primitives = binding.primitives().len(),
            size = binding.size_bytes(),
            "compiled record codec"
        );

        Ok(Self {
            binding,
            plan,
            backend: PhantomData,
        })
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.binding.size_bytes()
    }

    pub fn binding(&self) -> &CodecBinding {
        &self.binding
    }

    /// Decodes the first [Codec::size] bytes of `data`.
    pub fn decode(&self, data: &[u8]) -> Result<Record, DecodeError> {
        if data.len() < self.size() {
            return Err(DecodeError::InsufficientData {
                expected: self.size(),
                actual: data.len(),
            });
        }

        let values = B::unpack(&self.binding, &data[..self.size()])?;
        self.plan.rebuild(&mut values.into_iter())
    }

    /// Encodes `record` into exactly [Codec::size] bytes.
    ///
    /// Fields missing from `record` fall back to their declared default.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, EncodeError> {
        let mut values = Vec::with_capacity(self.binding.value_count());
        self.plan.flatten(record, &mut values)?;
        B::pack(&self.binding, &values)
    }
}

/// A Rust type with a fixed binary layout.
///
/// Implementors describe their schema and how to convert to and from a
/// [Record]; the byte-level methods are provided.
pub trait BinaryRecord: Sized {
    type Backend: Backend;

    fn schema() -> &'static RecordSchema;

    fn from_record(record: &Record) -> Result<Self, DecodeError>;

    fn to_record(&self) -> Record;

    /// Encoded size in bytes.
    fn size() -> usize {
        Self::schema().size_bytes()
    }

    fn from_bytes(data: &[u8]) -> Result<Self, RecordError> {
        let codec = Self::schema().codec::<Self::Backend>()?;
        Ok(Self::from_record(&codec.decode(data)?)?)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let codec = Self::schema().codec::<Self::Backend>()?;
        Ok(codec.encode(&self.to_record())?)
    }
}
