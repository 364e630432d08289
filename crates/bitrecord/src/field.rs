//! Field declarations: logical types, enumerations and the per-field binary metadata.

use std::{collections::HashSet, fmt, sync::Arc};

use crate::{
    errors::{SchemaError, TypeStrError},
    schema::RecordSchema,
    typestr::{TypeCode, TypeParams},
    value::Value,
};

/// Character set used by text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Encoding {
    /// Every byte must be in 0..=0x7F.
    #[default]
    Ascii,
    Utf8,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Utf8 => "utf-8",
        }
    }
}

/// Container produced when decoding a sequence field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SequenceKind {
    /// Decodes to [Value::List].
    List,
    /// Decodes to [Value::Tuple].
    Tuple,
}

/// Logical type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    /// Pair of floats, each half of the field size.
    Complex,
    Bytes,
    Text(Encoding),
    Enum(Arc<EnumType>),
    /// Nested record, expanded in place by the codec.
    Record(Arc<RecordSchema>),
    /// Fixed number of items of `element`, see [FieldDescriptor::with_repeat].
    Sequence {
        kind: SequenceKind,
        element: Box<FieldType>,
    },
}

impl FieldType {
    /// Text with the default (ASCII) encoding.
    pub fn text() -> Self {
        FieldType::Text(Encoding::default())
    }

    pub fn list(element: FieldType) -> Self {
        FieldType::Sequence {
            kind: SequenceKind::List,
            element: Box::new(element),
        }
    }

    pub fn tuple(element: FieldType) -> Self {
        FieldType::Sequence {
            kind: SequenceKind::Tuple,
            element: Box::new(element),
        }
    }

    /// The item type: the element for sequences, `self` otherwise.
    pub fn item(&self) -> &FieldType {
        match self {
            FieldType::Sequence { element, .. } => element,
            other => other,
        }
    }

    /// True for integers, integer enums and sequences of either.
    pub fn is_int(&self) -> bool {
        match self.item() {
            FieldType::Int => true,
            FieldType::Enum(e) => e.value_kind() == EnumValueKind::Int,
            _ => false,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, FieldType::Sequence { .. })
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Complex => "complex",
            FieldType::Bytes => "bytes",
            FieldType::Text(_) => "text",
            FieldType::Enum(_) => "enum",
            FieldType::Record(_) => "record",
            FieldType::Sequence { .. } => "sequence",
        }
    }
}

/// Value of one enum member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnumValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl EnumValue {
    fn kind(&self) -> EnumValueKind {
        match self {
            EnumValue::Bool(_) => EnumValueKind::Bool,
            EnumValue::Int(_) => EnumValueKind::Int,
            EnumValue::Text(_) => EnumValueKind::Text,
            EnumValue::Bytes(_) => EnumValueKind::Bytes,
        }
    }

    /// Value written on the wire for this member.
    pub(crate) fn to_value(&self, kind: EnumValueKind) -> Value {
        match (self, kind) {
            (EnumValue::Bool(v), EnumValueKind::Int) => Value::I64(i64::from(*v)),
            (EnumValue::Bool(v), _) => Value::Bool(*v),
            (EnumValue::Int(v), _) => Value::I64(*v),
            (EnumValue::Text(v), _) => Value::Text(v.clone()),
            (EnumValue::Bytes(v), _) => Value::Bytes(v.clone()),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (EnumValue::Bool(a), Value::Bool(b)) => a == b,
            (EnumValue::Bool(a), Value::I64(_) | Value::U64(_)) => {
                value.as_i64() == Some(i64::from(*a))
            }
            (EnumValue::Int(a), Value::I64(_) | Value::U64(_)) => value.as_i64() == Some(*a),
            (EnumValue::Text(a), Value::Text(b)) => a == b,
            (EnumValue::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::Bool(v) => write!(f, "{v}"),
            EnumValue::Int(v) => write!(f, "{v}"),
            EnumValue::Text(v) => write!(f, "{v:?}"),
            EnumValue::Bytes(v) => write!(f, "{v:?}"),
        }
    }
}

/// Common wire type of the members of an [EnumType].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumValueKind {
    Bool,
    Int,
    Text,
    Bytes,
}

/// A named enumeration whose members all share one wire type.
///
/// Booleans and integers are compatible and widen to integers. Any other
/// mix is rejected by [EnumType::new].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    members: Vec<(String, EnumValue)>,
    value_kind: EnumValueKind,
}

impl EnumType {
    pub fn new<N, I>(name: impl Into<String>, members: I) -> Result<Self, SchemaError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, EnumValue)>,
    {
        let name = name.into();
        let members: Vec<(String, EnumValue)> =
            members.into_iter().map(|(n, v)| (n.into(), v)).collect();

        let mut seen = HashSet::new();
        for (member, _) in &members {
            if !seen.insert(member.as_str()) {
                return Err(SchemaError::DuplicateMember {
                    enum_name: name,
                    member: member.clone(),
                });
            }
        }

        let mut kinds = members.iter().map(|(_, v)| v.kind());
        let Some(first) = kinds.next() else {
            return Err(SchemaError::EmptyEnum(name));
        };
        let mut value_kind = first;
        for kind in kinds {
            value_kind = match (value_kind, kind) {
                (a, b) if a == b => a,
                (EnumValueKind::Bool, EnumValueKind::Int)
                | (EnumValueKind::Int, EnumValueKind::Bool) => EnumValueKind::Int,
                _ => return Err(SchemaError::MixedEnumValues(name)),
            };
        }

        Ok(EnumType {
            name,
            members,
            value_kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[(String, EnumValue)] {
        &self.members
    }

    pub fn value_kind(&self) -> EnumValueKind {
        self.value_kind
    }

    /// Looks up the member whose value equals the decoded `value`.
    pub fn member_for(&self, value: &Value) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| v.matches(value))
            .map(|(n, _)| n.as_str())
    }

    /// Wire value of the member called `member`.
    pub fn value_of(&self, member: &str) -> Option<Value> {
        self.members
            .iter()
            .find(|(n, _)| n == member)
            .map(|(_, v)| v.to_value(self.value_kind))
    }
}

/// Binary metadata of one field as declared, before layout.
///
/// Sizes are given in the base units of the record the field is added to.
///
/// ```
/// use bitrecord::field::{FieldDescriptor, FieldType};
///
/// let field = FieldDescriptor::new("samples", FieldType::list(FieldType::Int))
///     .with_size(12)
///     .with_signed(true)
///     .with_repeat(4);
/// assert_eq!(field.total_size(), Some(48));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: FieldType,
    /// Item size. Optional for booleans and nested records.
    pub size: Option<usize>,
    /// Inferred from the previous field when absent.
    pub offset: Option<usize>,
    pub signed: Option<bool>,
    pub repeat: Option<usize>,
    pub default: Option<Value>,
    /// Literal the field was declared from, if any.
    pub type_params: Option<TypeParams>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            size: None,
            offset: None,
            signed: None,
            repeat: None,
            default: None,
            type_params: None,
        }
    }

    /// Declares a field from parsed type-literal parameters.
    pub fn from_type_params(name: impl Into<String>, params: TypeParams) -> Self {
        let ty = match params.code {
            TypeCode::Int => FieldType::Int,
            TypeCode::Float => FieldType::Float,
            TypeCode::Complex => FieldType::Complex,
            TypeCode::Bytes => FieldType::Bytes,
        };
        Self {
            size: params.size,
            signed: params.signed,
            type_params: Some(params),
            ..Self::new(name, ty)
        }
    }

    /// Declares a field from a type literal such as `">i12"`.
    pub fn from_typestr(name: impl Into<String>, literal: &str) -> Result<Self, TypeStrError> {
        Ok(Self::from_type_params(name, TypeParams::parse(literal)?))
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = Some(signed);
        self
    }

    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Turns the field into a sequence of `repeat` items of its current type.
    pub fn repeated(mut self, kind: SequenceKind, repeat: usize) -> Self {
        self.ty = FieldType::Sequence {
            kind,
            element: Box::new(self.ty),
        };
        self.repeat = Some(repeat);
        self
    }

    /// Size of all items, when the item size is known and the product fits.
    pub fn total_size(&self) -> Option<usize> {
        self.size
            .and_then(|size| size.checked_mul(self.repeat.unwrap_or(1)))
    }

    /// Checks the invariants that do not depend on the enclosing record.
    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if self.size == Some(0) {
            return Err(SchemaError::ZeroSize(self.name.clone()));
        }
        match (&self.ty, self.repeat) {
            (FieldType::Sequence { element, .. }, Some(repeat)) => {
                if repeat == 0 {
                    return Err(SchemaError::ZeroRepeat(self.name.clone()));
                }
                if matches!(
                    element.as_ref(),
                    FieldType::Sequence { .. } | FieldType::Record(_)
                ) {
                    return Err(SchemaError::UnsupportedElement(self.name.clone()));
                }
            }
            (FieldType::Sequence { .. }, None) => {
                return Err(SchemaError::SequenceWithoutRepeat(self.name.clone()));
            }
            (_, Some(_)) => return Err(SchemaError::RepeatWithoutSequence(self.name.clone())),
            (_, None) => {}
        }
        if let Some(params) = &self.type_params {
            let conflict = |param: &'static str| SchemaError::TypeStrConflict {
                field: self.name.clone(),
                literal: params.to_string(),
                param,
            };
            if params.size.is_some_and(|s| Some(s) != self.size) {
                return Err(conflict("size"));
            }
            if params.signed.is_some_and(|s| Some(s) != self.signed) {
                return Err(conflict("signedness"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> Vec<(&'static str, EnumValue)> {
        vec![("red", EnumValue::Int(1)), ("green", EnumValue::Int(2))]
    }

    #[test]
    fn test_enum_homogeneous() {
        let e = EnumType::new("Color", colors()).unwrap();
        assert_eq!(e.value_kind(), EnumValueKind::Int);
        assert_eq!(e.member_for(&Value::U64(2)), Some("green"));
        assert_eq!(e.member_for(&Value::I64(3)), None);
        assert_eq!(e.value_of("red"), Some(Value::I64(1)));
    }

    #[test]
    fn test_enum_bool_and_int_are_compatible() {
        let e = EnumType::new(
            "Flag",
            [("off", EnumValue::Bool(false)), ("many", EnumValue::Int(2))],
        )
        .unwrap();
        assert_eq!(e.value_kind(), EnumValueKind::Int);
        assert_eq!(e.value_of("off"), Some(Value::I64(0)));
        assert_eq!(e.member_for(&Value::U64(0)), Some("off"));
    }

    #[test]
    fn test_enum_mixed_values_rejected() {
        let err = EnumType::new(
            "Mixed",
            [
                ("a", EnumValue::Int(1)),
                ("b", EnumValue::Text("b".to_string())),
            ],
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::MixedEnumValues("Mixed".to_string()));
    }

    #[test]
    fn test_enum_empty_and_duplicate() {
        let empty: Vec<(String, EnumValue)> = vec![];
        assert_eq!(
            EnumType::new("E", empty).unwrap_err(),
            SchemaError::EmptyEnum("E".to_string())
        );
        assert!(matches!(
            EnumType::new("E", [("a", EnumValue::Int(1)), ("a", EnumValue::Int(2))]),
            Err(SchemaError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_from_typestr() {
        let field = FieldDescriptor::from_typestr("x", "<u4").unwrap();
        assert_eq!(field.ty, FieldType::Int);
        assert_eq!(field.size, Some(4));
        assert_eq!(field.signed, Some(false));
        assert!(field.validate().is_ok());
    }

    #[test]
    fn test_typestr_conflicting_size() {
        let field = FieldDescriptor::from_typestr("x", "u4").unwrap().with_size(2);
        assert!(matches!(
            field.validate(),
            Err(SchemaError::TypeStrConflict { param: "size", .. })
        ));
    }

    #[test]
    fn test_repeat_requires_sequence() {
        let field = FieldDescriptor::new("x", FieldType::Int)
            .with_size(1)
            .with_repeat(2);
        assert_eq!(
            field.validate(),
            Err(SchemaError::RepeatWithoutSequence("x".to_string()))
        );

        let field = FieldDescriptor::new("x", FieldType::list(FieldType::Int)).with_size(1);
        assert_eq!(
            field.validate(),
            Err(SchemaError::SequenceWithoutRepeat("x".to_string()))
        );
    }

    #[test]
    fn test_repeated() {
        let field = FieldDescriptor::new("x", FieldType::Float)
            .with_size(4)
            .repeated(SequenceKind::Tuple, 3);
        assert_eq!(field.ty, FieldType::tuple(FieldType::Float));
        assert_eq!(field.total_size(), Some(12));
        assert!(field.validate().is_ok());
    }

    #[test]
    fn test_zero_size() {
        let field = FieldDescriptor::new("x", FieldType::Int).with_size(0);
        assert_eq!(field.validate(), Err(SchemaError::ZeroSize("x".to_string())));
    }
}
