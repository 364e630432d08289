//! Record schema: validated, fully laid-out list of fields.
//!
//! Use [RecordSchema::builder] to declare a record, then [RecordSchema::codec]
//! to obtain the compiled encoder/decoder for a backend.

use std::{collections::HashSet, sync::Arc};

use tracing::warn;

use crate::{
    codec::{Backend, Codec, CodecCache},
    errors::{CompileError, SchemaError, Warning},
    field::{Encoding, FieldDescriptor, FieldType, SequenceKind},
    order::{BaseUnits, BitOrder, ByteOrder, Endian},
    value::{Record, Value},
};

/// A field placed in a record. Offsets and sizes are in the record's base units.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub offset: usize,
    /// Size of one item.
    pub size: usize,
    /// `None` lets the backend pick its default signedness.
    pub signed: Option<bool>,
    pub repeat: Option<usize>,
    pub default: Option<Value>,
    /// Byte order requested by the field's type literal, if any.
    pub byte_order: Option<Endian>,
}

impl Field {
    /// Size of all items.
    pub fn total_size(&self) -> usize {
        self.size * self.repeat.unwrap_or(1)
    }

    /// First unit after the field.
    pub fn end(&self) -> usize {
        self.offset + self.total_size()
    }
}

/// An element of [RecordSchema::padded_fields]: a field or an anonymous gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Span<'a> {
    Field(&'a Field),
    /// Uninterpreted space, written as zeros and never read.
    Padding { offset: usize, size: usize },
}

impl Span<'_> {
    pub fn offset(&self) -> usize {
        match self {
            Span::Field(field) => field.offset,
            Span::Padding { offset, .. } => *offset,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Span::Field(field) => field.total_size(),
            Span::Padding { size, .. } => *size,
        }
    }
}

/// Builder returned by [RecordSchema::builder].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    base_units: BaseUnits,
    byte_order: ByteOrder,
    bit_order: Option<BitOrder>,
    size: Option<usize>,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Only valid for records measured in bits.
    pub fn bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = Some(bit_order);
        self
    }

    /// Total record size in base units. Space after the last field becomes padding.
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Validates the declaration and lays out the fields.
    pub fn build(self) -> Result<RecordSchema, SchemaError> {
        let units = self.base_units;

        let bit_order = match (units, self.bit_order) {
            (BaseUnits::Bytes, Some(_)) => return Err(SchemaError::BitOrderOnBytes),
            (_, order) => order.unwrap_or_default(),
        };
        if self.fields.is_empty() {
            return Err(SchemaError::EmptyRecord);
        }

        let endian = self.byte_order.resolve(units);
        let mut names = HashSet::new();
        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
        let mut auto_offset = 0;

        for descr in self.fields {
            descr.validate()?;
            if !names.insert(descr.name.clone()) {
                return Err(SchemaError::DuplicateName(descr.name));
            }

            let field_order = descr.type_params.and_then(|p| p.byte_order);
            if let Some(order) = field_order {
                if order != endian {
                    return Err(SchemaError::ByteOrderConflict {
                        field: descr.name,
                        field_order: order.into(),
                        record_order: self.byte_order,
                    });
                }
            }

            let mut signed = descr.signed;
            if signed.is_some() && !descr.ty.is_int() {
                warn!(
                    field = %descr.name,
                    "the signed parameter is ignored for {} fields",
                    descr.ty.name()
                );
                signed = None;
            }

            let size = match &descr.ty {
                FieldType::Record(nested) => {
                    check_nested(&descr.name, nested, units, endian, bit_order)?;
                    match descr.size {
                        Some(size) if size != nested.size() => {
                            return Err(SchemaError::NestedSizeMismatch {
                                field: descr.name,
                                declared: size,
                                expected: nested.size(),
                            });
                        }
                        _ => nested.size(),
                    }
                }
                ty => match (descr.size, ty.item()) {
                    (Some(size), _) => size,
                    (None, FieldType::Bool) => 1,
                    (None, _) => return Err(SchemaError::MissingSize(descr.name)),
                },
            };

            let offset = match descr.offset {
                None => auto_offset,
                Some(offset) if offset < auto_offset => {
                    return Err(SchemaError::Overlap {
                        field: descr.name,
                        offset,
                        min_offset: auto_offset,
                    });
                }
                Some(offset) => offset,
            };

            let end = size
                .checked_mul(descr.repeat.unwrap_or(1))
                .and_then(|total| total.checked_add(offset))
                .ok_or_else(|| SchemaError::SizeOverflow(descr.name.clone()))?;

            let mut field = Field {
                name: descr.name,
                ty: descr.ty,
                offset,
                size,
                signed,
                repeat: descr.repeat,
                default: None,
                byte_order: field_order,
            };
            field.default = descr
                .default
                .map(|default| checked_default(&field, units, default))
                .transpose()?;
            auto_offset = end;
            fields.push(field);
        }

        let size = match self.size {
            None => auto_offset,
            Some(size) if size < auto_offset => {
                return Err(SchemaError::SizeTooSmall {
                    declared: size,
                    computed: auto_offset,
                });
            }
            Some(size) => size,
        };

        let mut warnings = Vec::new();
        if units == BaseUnits::Bits && size % 8 != 0 {
            let warning = Warning::Alignment { bits: size };
            warn!("{warning}");
            warnings.push(warning);
        }

        Ok(RecordSchema {
            fields,
            base_units: units,
            byte_order: self.byte_order,
            bit_order,
            size,
            warnings,
            codecs: CodecCache::default(),
        })
    }
}

fn check_nested(
    name: &str,
    nested: &RecordSchema,
    units: BaseUnits,
    endian: Endian,
    bit_order: BitOrder,
) -> Result<(), SchemaError> {
    if nested.base_units != units {
        return Err(SchemaError::NestedBaseUnits {
            field: name.to_string(),
            parent: units,
            nested: nested.base_units,
        });
    }
    if nested.byte_order != ByteOrder::Default && nested.effective_byte_order() != endian {
        return Err(SchemaError::ByteOrderConflict {
            field: name.to_string(),
            field_order: nested.byte_order,
            record_order: endian.into(),
        });
    }
    // leaves declared with a literal order must agree with the enclosing record
    for leaf in nested.flat_fields() {
        if let Some(order) = leaf.byte_order.filter(|order| *order != endian) {
            return Err(SchemaError::ByteOrderConflict {
                field: format!("{name}.{}", leaf.name),
                field_order: order.into(),
                record_order: endian.into(),
            });
        }
    }
    if nested.bit_order != BitOrder::Default
        && nested.bit_order.is_lsb_first() != bit_order.is_lsb_first()
    {
        return Err(SchemaError::BitOrderConflict {
            field: name.to_string(),
        });
    }
    Ok(())
}

/// Checks a declared default against its laid-out field.
///
/// Integers are converted to the variant the field decodes to and sequences
/// to the declared container kind.
fn checked_default(field: &Field, units: BaseUnits, default: Value) -> Result<Value, SchemaError> {
    let invalid = || SchemaError::InvalidDefault {
        field: field.name.clone(),
        expected: field.ty.name(),
    };
    let bits = units.to_bits(field.size);
    let signed = field.signed.unwrap_or(units.default_signed());

    match (&field.ty, default) {
        (FieldType::Record(nested), Value::Record(record)) => {
            let mut checked = Record::new();
            for (name, value) in record.iter() {
                let inner = nested.field(name).ok_or_else(invalid)?;
                checked.insert(name, checked_default(inner, units, value.clone())?);
            }
            Ok(Value::Record(checked))
        }
        (FieldType::Sequence { kind, element }, Value::List(items) | Value::Tuple(items)) => {
            if items.len() != field.repeat.unwrap_or(1) {
                return Err(invalid());
            }
            let items = items
                .into_iter()
                .map(|item| item_default(element, bits, signed, item).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match kind {
                SequenceKind::List => Value::List(items),
                SequenceKind::Tuple => Value::Tuple(items),
            })
        }
        (ty, value) => item_default(ty, bits, signed, value).ok_or_else(invalid),
    }
}

fn item_default(ty: &FieldType, bits: usize, signed: bool, value: Value) -> Option<Value> {
    match (ty, value) {
        (FieldType::Bool, value @ Value::Bool(_))
        | (FieldType::Float, value @ Value::F64(_))
        | (FieldType::Complex, value @ Value::Complex(..)) => Some(value),
        (FieldType::Int, Value::I64(v)) => int_default(i128::from(v), bits, signed),
        (FieldType::Int, Value::U64(v)) => int_default(i128::from(v), bits, signed),
        (FieldType::Bytes, Value::Bytes(v)) if v.len() <= bits / 8 => Some(Value::Bytes(v)),
        (FieldType::Text(encoding), Value::Text(v))
            if v.len() <= bits / 8 && (*encoding == Encoding::Utf8 || v.is_ascii()) =>
        {
            Some(Value::Text(v))
        }
        (FieldType::Enum(e), Value::Enum(member)) if e.value_of(&member).is_some() => {
            Some(Value::Enum(member))
        }
        _ => None,
    }
}

fn int_default(n: i128, bits: usize, signed: bool) -> Option<Value> {
    let bits = bits.min(64);
    let (min, max) = if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    };
    if n < min || n > max {
        return None;
    }
    Some(if signed {
        Value::I64(n as i64)
    } else {
        Value::U64(n as u64)
    })
}

/// A validated record layout.
///
/// Schemas are immutable. The codec for each backend is compiled on first
/// request and cached inside the schema.
///
/// ```
/// use bitrecord::field::{FieldDescriptor, FieldType};
/// use bitrecord::order::BaseUnits;
/// use bitrecord::schema::RecordSchema;
///
/// let schema = RecordSchema::builder(BaseUnits::Bits)
///     .field(FieldDescriptor::new("flag", FieldType::Bool))
///     .field(FieldDescriptor::from_typestr("count", "u7").unwrap())
///     .field(FieldDescriptor::new("id", FieldType::Int).with_size(8).with_offset(16))
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.size(), 24);
/// assert_eq!(schema.size_bytes(), 3);
/// assert_eq!(schema.padded_fields().len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct RecordSchema {
    fields: Vec<Field>,
    base_units: BaseUnits,
    byte_order: ByteOrder,
    bit_order: BitOrder,
    size: usize,
    warnings: Vec<Warning>,
    codecs: CodecCache,
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.base_units == other.base_units
            && self.byte_order == other.byte_order
            && self.bit_order == other.bit_order
            && self.size == other.size
    }
}

impl RecordSchema {
    pub fn builder(base_units: BaseUnits) -> SchemaBuilder {
        SchemaBuilder {
            base_units,
            byte_order: ByteOrder::Default,
            bit_order: None,
            size: None,
            fields: Vec::new(),
        }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields interleaved with padding spans for gaps and trailing space.
    pub fn padded_fields(&self) -> Vec<Span<'_>> {
        let mut spans = Vec::with_capacity(self.fields.len());
        let mut cursor = 0;
        for field in &self.fields {
            if field.offset > cursor {
                spans.push(Span::Padding {
                    offset: cursor,
                    size: field.offset - cursor,
                });
            }
            spans.push(Span::Field(field));
            cursor = field.end();
        }
        if self.size > cursor {
            spans.push(Span::Padding {
                offset: cursor,
                size: self.size - cursor,
            });
        }
        spans
    }

    /// Leaf fields with nested records expanded recursively.
    ///
    /// Offsets are relative to the start of this record and nested names are
    /// joined with `.` (e.g. `header.id`).
    pub fn flat_fields(&self) -> Vec<Field> {
        let mut out = Vec::new();
        self.collect_flat("", 0, &mut out);
        out
    }

    fn collect_flat(&self, prefix: &str, base: usize, out: &mut Vec<Field>) {
        for field in &self.fields {
            let name = format!("{prefix}{}", field.name);
            match &field.ty {
                FieldType::Record(nested) => {
                    nested.collect_flat(&format!("{name}."), base + field.offset, out)
                }
                _ => out.push(Field {
                    name,
                    offset: base + field.offset,
                    ..field.clone()
                }),
            }
        }
    }

    /// Size in base units.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size in bytes, rounded up for bit records.
    pub fn size_bytes(&self) -> usize {
        self.base_units.to_bytes(self.size)
    }

    pub fn base_units(&self) -> BaseUnits {
        self.base_units
    }

    /// Byte order as declared.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Bit order as declared. Always [BitOrder::Default] for byte records.
    pub fn bit_order(&self) -> BitOrder {
        self.bit_order
    }

    /// Resolved byte order.
    pub fn effective_byte_order(&self) -> Endian {
        self.byte_order.resolve(self.base_units)
    }

    /// Resolved bit order: [BitOrder::Lsb] or [BitOrder::Msb].
    pub fn effective_bit_order(&self) -> BitOrder {
        if self.bit_order.is_lsb_first() {
            BitOrder::Lsb
        } else {
            BitOrder::Msb
        }
    }

    /// Non-fatal conditions found while building.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// A record holding every declared default. Nested records without an
    /// explicit default contribute their own defaults.
    pub fn default_record(&self) -> Record {
        let mut record = Record::new();
        for field in &self.fields {
            match (&field.default, &field.ty) {
                (Some(default), _) => {
                    record.insert(field.name.clone(), default.clone());
                }
                (None, FieldType::Record(nested)) => {
                    let nested = nested.default_record();
                    if !nested.is_empty() {
                        record.insert(field.name.clone(), nested);
                    }
                }
                _ => {}
            }
        }
        record
    }

    /// Compiled codec for backend `B`, built on first call and cached.
    pub fn codec<B: Backend>(&self) -> Result<Arc<Codec<B>>, CompileError> {
        B::cache_slot(&self.codecs)
            .get_or_try_init(|| Codec::compile(self).map(Arc::new))
            .cloned()
    }
}
