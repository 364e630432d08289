//! Compilation of a [RecordSchema] into a flat list of wire primitives.
//!
//! Nested records are expanded in place, sequences become `repeat` copies of
//! their element and gaps become padding primitives. A [Plan] remembers how to
//! rebuild the record structure from the flat list of primitive values.

use std::sync::Arc;

use crate::{
    errors::{CompileError, DecodeError, EncodeError},
    field::{EnumType, EnumValueKind, Encoding, FieldType, SequenceKind},
    order::{BaseUnits, Endian},
    schema::{Field, RecordSchema, Span},
    value::{Record, Value},
};

/// Wire representation of one primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Bool,
    Int { signed: bool },
    Float,
    Complex,
    Bytes,
    Text(Encoding),
    /// Never read, written as zeros.
    Padding,
}

impl Wire {
    pub fn name(self) -> &'static str {
        match self {
            Wire::Bool => "bool",
            Wire::Int { .. } => "int",
            Wire::Float => "float",
            Wire::Complex => "complex",
            Wire::Bytes => "bytes",
            Wire::Text(_) => "text",
            Wire::Padding => "padding",
        }
    }
}

/// One entry of a [CodecBinding]. Offsets are relative to the root record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    /// Dotted path of the field the primitive belongs to. Empty for padding.
    pub name: String,
    pub wire: Wire,
    pub offset: usize,
    pub size: usize,
    pub endian: Endian,
    /// Only meaningful for bit records.
    pub lsb_first: bool,
}

/// Flat, immutable primitive list for one schema and one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecBinding {
    base_units: BaseUnits,
    size: usize,
    primitives: Vec<Primitive>,
    values: usize,
}

impl CodecBinding {
    pub fn base_units(&self) -> BaseUnits {
        self.base_units
    }

    /// Record size in base units.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn size_bytes(&self) -> usize {
        self.base_units.to_bytes(self.size)
    }

    /// All primitives in layout order, padding included.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Primitives that carry a value, in layout order.
    pub fn value_primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.iter().filter(|p| p.wire != Wire::Padding)
    }

    /// Number of values exchanged with a backend.
    pub fn value_count(&self) -> usize {
        self.values
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Convert {
    Raw,
    Enum(Arc<EnumType>),
}

impl Convert {
    fn decode(&self, name: &str, raw: Value) -> Result<Value, DecodeError> {
        match self {
            Convert::Raw => Ok(raw),
            Convert::Enum(e) => match e.member_for(&raw) {
                Some(member) => Ok(Value::Enum(member.to_string())),
                None => Err(DecodeError::UnknownEnumValue {
                    field: name.to_string(),
                    value: format!("{raw:?}"),
                }),
            },
        }
    }

    fn encode(&self, name: &str, value: &Value) -> Result<Value, EncodeError> {
        match self {
            Convert::Raw => Ok(value.clone()),
            Convert::Enum(e) => {
                let Value::Enum(member) = value else {
                    return Err(EncodeError::TypeMismatch {
                        field: name.to_string(),
                        expected: "enum member",
                    });
                };
                e.value_of(member)
                    .ok_or_else(|| EncodeError::UnknownEnumMember {
                        field: name.to_string(),
                        member: member.clone(),
                    })
            }
        }
    }
}

/// How to rebuild one field value from the flat list of primitive values.
#[derive(Debug, Clone)]
pub(crate) enum Plan {
    Scalar {
        convert: Convert,
    },
    Sequence {
        kind: SequenceKind,
        repeat: usize,
        convert: Convert,
    },
    Record(RecordPlan),
}

#[derive(Debug, Clone)]
pub(crate) struct PlanField {
    name: String,
    path: String,
    default: Option<Value>,
    plan: Plan,
}

/// Plan of a whole record: its fields in layout order.
#[derive(Debug, Clone)]
pub(crate) struct RecordPlan(Vec<PlanField>);

impl RecordPlan {
    /// Consumes values from `values` and rebuilds the record.
    pub(crate) fn rebuild(
        &self,
        values: &mut impl Iterator<Item = Value>,
    ) -> Result<Record, DecodeError> {
        let mut record = Record::new();
        for field in &self.0 {
            let value = field.plan.rebuild(&field.path, values)?;
            record.insert(field.name.clone(), value);
        }
        Ok(record)
    }

    /// Appends the primitive values of `record` to `out` in layout order.
    ///
    /// Missing fields fall back to their declared default.
    pub(crate) fn flatten(&self, record: &Record, out: &mut Vec<Value>) -> Result<(), EncodeError> {
        for field in &self.0 {
            let value = record
                .get(&field.name)
                .or(field.default.as_ref())
                .ok_or_else(|| EncodeError::MissingField(field.path.clone()))?;
            field.plan.flatten(&field.path, value, out)?;
        }
        Ok(())
    }
}

impl Plan {
    fn rebuild(
        &self,
        path: &str,
        values: &mut impl Iterator<Item = Value>,
    ) -> Result<Value, DecodeError> {
        match self {
            Plan::Scalar { convert } => convert.decode(path, take(path, values)?),
            Plan::Sequence {
                kind,
                repeat,
                convert,
            } => {
                let items = (0..*repeat)
                    .map(|_| convert.decode(path, take(path, values)?))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match kind {
                    SequenceKind::List => Value::List(items),
                    SequenceKind::Tuple => Value::Tuple(items),
                })
            }
            Plan::Record(plan) => Ok(Value::Record(plan.rebuild(values)?)),
        }
    }

    fn flatten(&self, path: &str, value: &Value, out: &mut Vec<Value>) -> Result<(), EncodeError> {
        match self {
            Plan::Scalar { convert } => out.push(convert.encode(path, value)?),
            Plan::Sequence {
                repeat, convert, ..
            } => {
                let items = value.as_slice().ok_or_else(|| EncodeError::TypeMismatch {
                    field: path.to_string(),
                    expected: "list or tuple",
                })?;
                if items.len() != *repeat {
                    return Err(EncodeError::LengthMismatch {
                        field: path.to_string(),
                        expected: *repeat,
                        actual: items.len(),
                    });
                }
                for item in items {
                    out.push(convert.encode(path, item)?);
                }
            }
            Plan::Record(plan) => {
                let record = value.as_record().ok_or_else(|| EncodeError::TypeMismatch {
                    field: path.to_string(),
                    expected: "record",
                })?;
                plan.flatten(record, out)?;
            }
        }
        Ok(())
    }
}

fn take(path: &str, values: &mut impl Iterator<Item = Value>) -> Result<Value, DecodeError> {
    values
        .next()
        .ok_or_else(|| DecodeError::MissingField(path.to_string()))
}

/// Compiles `schema` into a binding plus the plan that rebuilds records.
///
/// `default_signed` is used for integer fields that leave signedness open.
pub(crate) fn compile(
    schema: &RecordSchema,
    default_signed: bool,
) -> Result<(CodecBinding, RecordPlan), CompileError> {
    let mut primitives = Vec::new();
    let plan = compile_record(
        schema,
        "",
        0,
        schema.effective_byte_order(),
        schema.bit_order().is_lsb_first(),
        default_signed,
        &mut primitives,
    )?;
    let values = primitives.iter().filter(|p| p.wire != Wire::Padding).count();

    Ok((
        CodecBinding {
            base_units: schema.base_units(),
            size: schema.size(),
            primitives,
            values,
        },
        plan,
    ))
}

fn compile_record(
    schema: &RecordSchema,
    prefix: &str,
    base: usize,
    endian: Endian,
    lsb_first: bool,
    default_signed: bool,
    out: &mut Vec<Primitive>,
) -> Result<RecordPlan, CompileError> {
    let mut fields = Vec::with_capacity(schema.fields().len());

    for span in schema.padded_fields() {
        let field = match span {
            Span::Padding { offset, size } => {
                out.push(Primitive {
                    name: String::new(),
                    wire: Wire::Padding,
                    offset: base + offset,
                    size,
                    endian,
                    lsb_first,
                });
                continue;
            }
            Span::Field(field) => field,
        };

        let path = format!("{prefix}{}", field.name);
        let plan = match &field.ty {
            FieldType::Record(nested) => Plan::Record(compile_record(
                nested,
                &format!("{path}."),
                base + field.offset,
                endian,
                lsb_first,
                default_signed,
                out,
            )?),
            FieldType::Sequence { kind, element } => {
                let (wire, convert) = wire_for(field, element, default_signed);
                let repeat = field.repeat.unwrap_or(1);
                for i in 0..repeat {
                    out.push(Primitive {
                        name: path.clone(),
                        wire,
                        offset: base + field.offset + i * field.size,
                        size: field.size,
                        endian: field.byte_order.unwrap_or(endian),
                        lsb_first,
                    });
                }
                Plan::Sequence {
                    kind: *kind,
                    repeat,
                    convert,
                }
            }
            ty => {
                let (wire, convert) = wire_for(field, ty, default_signed);
                out.push(Primitive {
                    name: path.clone(),
                    wire,
                    offset: base + field.offset,
                    size: field.size,
                    endian: field.byte_order.unwrap_or(endian),
                    lsb_first,
                });
                Plan::Scalar { convert }
            }
        };

        fields.push(PlanField {
            name: field.name.clone(),
            path,
            default: field.default.clone(),
            plan,
        });
    }

    Ok(RecordPlan(fields))
}

fn wire_for(field: &Field, ty: &FieldType, default_signed: bool) -> (Wire, Convert) {
    let int = Wire::Int {
        signed: field.signed.unwrap_or(default_signed),
    };
    match ty {
        FieldType::Bool => (Wire::Bool, Convert::Raw),
        FieldType::Int => (int, Convert::Raw),
        FieldType::Float => (Wire::Float, Convert::Raw),
        FieldType::Complex => (Wire::Complex, Convert::Raw),
        FieldType::Bytes => (Wire::Bytes, Convert::Raw),
        FieldType::Text(encoding) => (Wire::Text(*encoding), Convert::Raw),
        FieldType::Enum(e) => {
            let wire = match e.value_kind() {
                EnumValueKind::Bool => Wire::Bool,
                EnumValueKind::Int => int,
                EnumValueKind::Text => Wire::Text(Encoding::Utf8),
                EnumValueKind::Bytes => Wire::Bytes,
            };
            (wire, Convert::Enum(e.clone()))
        }
        // rejected when the schema is built
        FieldType::Record(_) | FieldType::Sequence { .. } => (Wire::Padding, Convert::Raw),
    }
}

#[cfg(test)]
mod tests {
    use crate::field::FieldDescriptor;

    use super::*;

    #[test]
    fn test_compile_flattens_nested_and_sequences() {
        let child = Arc::new(
            RecordSchema::builder(BaseUnits::Bytes)
                .field(FieldDescriptor::new("x", FieldType::Int).with_size(2))
                .build()
                .unwrap(),
        );
        let schema = RecordSchema::builder(BaseUnits::Bytes)
            .byte_order(crate::order::ByteOrder::Le)
            .size(12)
            .field(FieldDescriptor::new("a", FieldType::Int).with_size(1))
            .field(
                FieldDescriptor::new("s", FieldType::tuple(FieldType::Int))
                    .with_size(1)
                    .with_repeat(2),
            )
            .field(FieldDescriptor::new("c", FieldType::Record(child)).with_offset(4))
            .build()
            .unwrap();

        let (binding, _) = compile(&schema, true).unwrap();
        let layout: Vec<(&str, Wire, usize, usize)> = binding
            .primitives()
            .iter()
            .map(|p| (p.name.as_str(), p.wire, p.offset, p.size))
            .collect();
        let int = Wire::Int { signed: true };
        assert_eq!(
            layout,
            vec![
                ("a", int, 0, 1),
                ("s", int, 1, 1),
                ("s", int, 2, 1),
                ("", Wire::Padding, 3, 1),
                ("c.x", int, 4, 2),
                ("", Wire::Padding, 6, 6),
            ]
        );
        assert_eq!(binding.value_count(), 4);
        assert!(binding.primitives().iter().all(|p| p.endian == Endian::Little));
    }

    #[test]
    fn test_plan_round_trip() {
        let schema = RecordSchema::builder(BaseUnits::Bits)
            .field(
                FieldDescriptor::new("s", FieldType::list(FieldType::Int))
                    .with_size(4)
                    .with_repeat(3),
            )
            .field(FieldDescriptor::new("b", FieldType::Bool).with_default(true))
            .build()
            .unwrap();
        let (_, plan) = compile(&schema, false).unwrap();

        let record = Record::new().with(
            "s",
            Value::List(vec![Value::U64(1), Value::U64(2), Value::U64(3)]),
        );
        let mut flat = Vec::new();
        plan.flatten(&record, &mut flat).unwrap();
        assert_eq!(
            flat,
            vec![Value::U64(1), Value::U64(2), Value::U64(3), Value::Bool(true)]
        );

        let rebuilt = plan.rebuild(&mut flat.into_iter()).unwrap();
        assert_eq!(rebuilt, record.with("b", true));
    }

    #[test]
    fn test_flatten_errors() {
        let schema = RecordSchema::builder(BaseUnits::Bytes)
            .field(
                FieldDescriptor::new("s", FieldType::list(FieldType::Int))
                    .with_size(1)
                    .with_repeat(2),
            )
            .build()
            .unwrap();
        let (_, plan) = compile(&schema, true).unwrap();

        let mut out = Vec::new();
        assert_eq!(
            plan.flatten(&Record::new(), &mut out),
            Err(EncodeError::MissingField("s".to_string()))
        );
        let record = Record::new().with("s", Value::List(vec![Value::I64(1)]));
        assert_eq!(
            plan.flatten(&record, &mut out),
            Err(EncodeError::LengthMismatch {
                field: "s".to_string(),
                expected: 2,
                actual: 1
            })
        );
    }
}
