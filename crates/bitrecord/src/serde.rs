//! Deserializable record description.
//!
//! These types describe the *layout* of a binary record. They are intended to
//! be loaded from JSON (for example a schema file shipped with your
//! application) and then built into a [RecordSchema]:
//!
//! ```json
//! {
//!   "base_units": "bits",
//!   "byte_order": "le",
//!   "fields": [
//!     { "name": "flag", "type": { "kind": "bool" } },
//!     { "name": "count", "type": { "kind": "typestr", "value": "u7" } },
//!     { "name": "samples", "type": { "kind": "int" }, "size": 4,
//!       "sequence": "list", "repeat": 2, "default": [1, 2] }
//!   ]
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    errors::SchemaError,
    field::{Encoding, EnumType, EnumValue, FieldDescriptor, FieldType, SequenceKind},
    order::{BaseUnits, BitOrder, ByteOrder},
    schema::RecordSchema,
    value::Value,
};

/// Top-level description of a record.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SchemaDef {
    pub base_units: BaseUnits,
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Only allowed when `base_units` is `bits`.
    #[serde(default)]
    pub bit_order: Option<BitOrder>,
    /// Total size in base units; computed from the fields when absent.
    #[serde(default)]
    pub size: Option<usize>,
    /// Fields in layout order.
    pub fields: Vec<FieldDef>,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FieldDef {
    /// Key of the field in decoded records.
    pub name: String,
    /// Logical type of the field (or of each item, for sequences).
    #[serde(rename = "type")]
    pub ty: TypeDef,
    /// Item size in base units.
    #[serde(default)]
    pub size: Option<usize>,
    /// Offset in base units; follows the previous field when absent.
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub signed: Option<bool>,
    /// Turns the field into a sequence of `repeat` items.
    #[serde(default)]
    pub sequence: Option<SequenceKind>,
    #[serde(default)]
    pub repeat: Option<usize>,
    /// Value used when encoding a record that lacks this field.
    #[serde(default)]
    pub default: Option<DefaultDef>,
}

/// Logical field type.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDef {
    Bool,
    Int,
    Float,
    Complex,
    Bytes,
    Text {
        #[serde(default)]
        encoding: Encoding,
    },
    Enum(EnumDef),
    /// Nested record, inlined.
    Record(SchemaDef),
    /// Compact literal such as `">u4"` or `"f8"`.
    Typestr { value: String },
}

/// Enumeration with its members in declaration order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<EnumMemberDef>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EnumMemberDef {
    pub name: String,
    pub value: EnumValueDef,
}

/// Wire value of an enum member.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum EnumValueDef {
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Default value as written in a schema file; interpreted against the field type.
///
/// Text defaults of enum fields name a member. Byte strings are given either
/// as text or as a list of byte values, complex numbers as `[re, im]`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DefaultDef {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    List(Vec<DefaultDef>),
}

impl DefaultDef {
    fn as_f64(&self) -> Option<f64> {
        match self {
            DefaultDef::Int(v) => Some(*v as f64),
            DefaultDef::UInt(v) => Some(*v as f64),
            DefaultDef::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn as_byte(&self) -> Option<u8> {
        match self {
            DefaultDef::Int(v) => u8::try_from(*v).ok(),
            DefaultDef::UInt(v) => u8::try_from(*v).ok(),
            _ => None,
        }
    }

    fn into_value(self, ty: &FieldType) -> Option<Value> {
        let value = match (ty, self) {
            (FieldType::Bool, DefaultDef::Bool(v)) => Value::Bool(v),
            (FieldType::Int, DefaultDef::Int(v)) => Value::I64(v),
            (FieldType::Int, DefaultDef::UInt(v)) => Value::U64(v),
            (FieldType::Float, def) => Value::F64(def.as_f64()?),
            (FieldType::Complex, DefaultDef::List(parts)) => match parts.as_slice() {
                [re, im] => Value::Complex(re.as_f64()?, im.as_f64()?),
                _ => return None,
            },
            (FieldType::Bytes, DefaultDef::Text(s)) => Value::Bytes(s.into_bytes()),
            (FieldType::Bytes, DefaultDef::List(items)) => Value::Bytes(
                items
                    .iter()
                    .map(DefaultDef::as_byte)
                    .collect::<Option<Vec<_>>>()?,
            ),
            (FieldType::Text(_), DefaultDef::Text(s)) => Value::Text(s),
            (FieldType::Enum(e), DefaultDef::Text(member)) => {
                e.value_of(&member)?;
                Value::Enum(member)
            }
            (FieldType::Sequence { kind, element }, DefaultDef::List(items)) => {
                let items = items
                    .into_iter()
                    .map(|item| item.into_value(element))
                    .collect::<Option<Vec<_>>>()?;
                match kind {
                    SequenceKind::List => Value::List(items),
                    SequenceKind::Tuple => Value::Tuple(items),
                }
            }
            _ => return None,
        };
        Some(value)
    }
}

impl From<EnumValueDef> for EnumValue {
    fn from(def: EnumValueDef) -> Self {
        match def {
            EnumValueDef::Bool(v) => EnumValue::Bool(v),
            EnumValueDef::Int(v) => EnumValue::Int(v),
            EnumValueDef::Text(v) => EnumValue::Text(v),
            EnumValueDef::Bytes(v) => EnumValue::Bytes(v),
        }
    }
}

impl TryFrom<EnumDef> for EnumType {
    type Error = SchemaError;

    fn try_from(def: EnumDef) -> Result<Self, Self::Error> {
        EnumType::new(
            def.name,
            def.members.into_iter().map(|m| (m.name, m.value.into())),
        )
    }
}

impl TryFrom<FieldDef> for FieldDescriptor {
    type Error = SchemaError;

    fn try_from(def: FieldDef) -> Result<Self, Self::Error> {
        let name = def.name;
        let mut field = match def.ty {
            // a type literal also carries size, signedness and byte order
            TypeDef::Typestr { value } => FieldDescriptor::from_typestr(name, &value)?,
            TypeDef::Bool => FieldDescriptor::new(name, FieldType::Bool),
            TypeDef::Int => FieldDescriptor::new(name, FieldType::Int),
            TypeDef::Float => FieldDescriptor::new(name, FieldType::Float),
            TypeDef::Complex => FieldDescriptor::new(name, FieldType::Complex),
            TypeDef::Bytes => FieldDescriptor::new(name, FieldType::Bytes),
            TypeDef::Text { encoding } => FieldDescriptor::new(name, FieldType::Text(encoding)),
            TypeDef::Enum(e) => FieldDescriptor::new(name, FieldType::Enum(Arc::new(e.try_into()?))),
            TypeDef::Record(r) => {
                FieldDescriptor::new(name, FieldType::Record(Arc::new(r.try_into()?)))
            }
        };

        if def.size.is_some() {
            field.size = def.size;
        }
        if def.signed.is_some() {
            field.signed = def.signed;
        }
        field.offset = def.offset;
        match (def.sequence, def.repeat) {
            (Some(kind), Some(repeat)) => field = field.repeated(kind, repeat),
            (Some(kind), None) => {
                field.ty = FieldType::Sequence {
                    kind,
                    element: Box::new(field.ty),
                };
            }
            (None, repeat) => field.repeat = repeat,
        }

        if let Some(default) = def.default {
            let value =
                default
                    .into_value(&field.ty)
                    .ok_or_else(|| SchemaError::InvalidDefault {
                        field: field.name.clone(),
                        expected: field.ty.name(),
                    })?;
            field.default = Some(value);
        }

        Ok(field)
    }
}

impl TryFrom<SchemaDef> for RecordSchema {
    type Error = SchemaError;

    fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
        let mut builder = RecordSchema::builder(def.base_units).byte_order(def.byte_order);
        if let Some(bit_order) = def.bit_order {
            builder = builder.bit_order(bit_order);
        }
        if let Some(size) = def.size {
            builder = builder.size(size);
        }
        for field in def.fields {
            builder = builder.field(field.try_into()?);
        }
        builder.build()
    }
}

impl RecordSchema {
    /// Builds a schema from its serialized description.
    pub fn from_def(def: SchemaDef) -> Result<Self, SchemaError> {
        def.try_into()
    }
}
