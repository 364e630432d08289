//! # bitrecord-codegen
//!
//! Generates Rust source declaring a *flat* version of a [RecordSchema]:
//! nested records are expanded into their leaf fields (named `outer.inner`),
//! producing a record with the same binary layout and no nesting.
//!
//! The generated code is a function building the schema with the
//! `bitrecord` builder API. Enumerations are not inlined: a field of enum
//! type `SensorMode` calls a user-provided `sensor_mode()` function returning
//! `Result<EnumType, SchemaError>`.
//!
//! ```
//! use std::sync::Arc;
//!
//! use bitrecord::field::{FieldDescriptor, FieldType};
//! use bitrecord::order::BaseUnits;
//! use bitrecord::schema::RecordSchema;
//! use bitrecord_codegen::FlatSchemaGenerator;
//!
//! let inner = Arc::new(
//!     RecordSchema::builder(BaseUnits::Bits)
//!         .field(FieldDescriptor::new("x", FieldType::Int).with_size(4))
//!         .build()
//!         .unwrap(),
//! );
//! let outer = RecordSchema::builder(BaseUnits::Bits)
//!     .field(FieldDescriptor::new("flag", FieldType::Bool))
//!     .field(FieldDescriptor::new("inner", FieldType::Record(inner)).with_offset(4))
//!     .build()
//!     .unwrap();
//!
//! let code = FlatSchemaGenerator::new(&outer, "flat_outer").get_code(false);
//! assert!(code.contains(r#".field(FieldDescriptor::new("inner.x", FieldType::Int).with_size(4).with_offset(4))"#));
//! ```

use std::collections::BTreeSet;

use bitrecord::{
    field::{Encoding, FieldType, SequenceKind},
    order::{BitOrder, ByteOrder},
    schema::{Field, RecordSchema},
    value::{Record, Value},
};
use tracing::debug;

/// Source code generator for flat record schemas.
#[derive(Debug, Clone)]
pub struct FlatSchemaGenerator {
    indent: String,
    imports: BTreeSet<&'static str>,
    lines: Vec<String>,
}

impl FlatSchemaGenerator {
    /// Generates a function called `name` declaring the flat version of `schema`.
    pub fn new(schema: &RecordSchema, name: &str) -> Self {
        Self::with_indent(schema, name, "    ")
    }

    pub fn with_indent(schema: &RecordSchema, name: &str, indent: &str) -> Self {
        let mut generator = FlatSchemaGenerator {
            indent: indent.to_string(),
            imports: BTreeSet::new(),
            lines: Vec::new(),
        };
        generator.setup_declaration(schema, name);
        generator.setup_fields(schema);
        generator.lines.push("}".to_string());
        debug!(
            fields = schema.flat_fields().len(),
            "generated flat schema {name}"
        );
        generator
    }

    fn push(&mut self, depth: usize, line: String) {
        self.lines.push(format!("{}{line}", self.indent.repeat(depth)));
    }

    fn setup_declaration(&mut self, schema: &RecordSchema, name: &str) {
        self.imports.insert("use bitrecord::errors::SchemaError;");
        self.imports.insert("use bitrecord::order::BaseUnits;");
        self.imports.insert("use bitrecord::schema::RecordSchema;");

        self.lines.push(format!(
            "pub fn {name}() -> Result<RecordSchema, SchemaError> {{"
        ));
        self.push(
            1,
            format!("RecordSchema::builder(BaseUnits::{:?})", schema.base_units()),
        );
        if schema.byte_order() != ByteOrder::Default {
            self.imports.insert("use bitrecord::order::ByteOrder;");
            self.push(2, format!(".byte_order(ByteOrder::{:?})", schema.byte_order()));
        }
        if schema.bit_order() != BitOrder::Default {
            self.imports.insert("use bitrecord::order::BitOrder;");
            self.push(2, format!(".bit_order(BitOrder::{:?})", schema.bit_order()));
        }
        let end = schema.fields().last().map_or(0, Field::end);
        if schema.size() != end {
            self.push(2, format!(".size({})", schema.size()));
        }
    }

    fn setup_fields(&mut self, schema: &RecordSchema) {
        self.imports.insert("use bitrecord::field::{FieldDescriptor, FieldType};");

        let defaults = schema.default_record();
        let mut auto_offset = 0;
        for field in schema.flat_fields() {
            let literal = field.byte_order.zip(type_code(field.ty.item()));
            let mut expr = match literal {
                Some((endian, code)) => {
                    self.imports.insert("use bitrecord::order::Endian;");
                    self.imports.insert("use bitrecord::typestr::{TypeCode, TypeParams};");
                    format!(
                        "FieldDescriptor::from_type_params({:?}, TypeParams {{ byte_order: Some(Endian::{endian:?}), code: TypeCode::{code}, size: Some({}), signed: {:?} }})",
                        field.name, field.size, field.signed
                    )
                }
                None => {
                    let ty = self.type_expr(field.ty.item());
                    let mut expr = format!("FieldDescriptor::new({:?}, {ty})", field.name);
                    if !(matches!(field.ty.item(), FieldType::Bool) && field.size == 1) {
                        expr.push_str(&format!(".with_size({})", field.size));
                    }
                    expr
                }
            };
            if let FieldType::Sequence { kind, .. } = &field.ty {
                self.imports.insert("use bitrecord::field::SequenceKind;");
                let kind = match kind {
                    SequenceKind::List => "List",
                    SequenceKind::Tuple => "Tuple",
                };
                expr.push_str(&format!(
                    ".repeated(SequenceKind::{kind}, {})",
                    field.repeat.unwrap_or(1)
                ));
            }
            if field.offset != auto_offset {
                expr.push_str(&format!(".with_offset({})", field.offset));
            }
            if let (None, Some(signed)) = (literal, field.signed) {
                expr.push_str(&format!(".with_signed({signed})"));
            }
            if let Some(default) = lookup(&defaults, &field.name) {
                let value = self.value_expr(default);
                expr.push_str(&format!(".with_default({value})"));
            }

            auto_offset = field.end();
            self.push(2, format!(".field({expr})"));
        }
        self.push(2, ".build()".to_string());
    }

    fn type_expr(&mut self, ty: &FieldType) -> String {
        match ty {
            FieldType::Bool => "FieldType::Bool".to_string(),
            FieldType::Int => "FieldType::Int".to_string(),
            FieldType::Float => "FieldType::Float".to_string(),
            FieldType::Complex => "FieldType::Complex".to_string(),
            FieldType::Bytes => "FieldType::Bytes".to_string(),
            FieldType::Text(Encoding::Ascii) => "FieldType::text()".to_string(),
            FieldType::Text(Encoding::Utf8) => {
                self.imports.insert("use bitrecord::field::Encoding;");
                "FieldType::Text(Encoding::Utf8)".to_string()
            }
            FieldType::Enum(e) => {
                self.imports.insert("use std::sync::Arc;");
                format!("FieldType::Enum(Arc::new({}()?))", snake_case(e.name()))
            }
            FieldType::Sequence { element, .. } => self.type_expr(element),
            // flat fields hold no records
            FieldType::Record(_) => "FieldType::Bytes".to_string(),
        }
    }

    fn value_expr(&mut self, value: &Value) -> String {
        self.imports.insert("use bitrecord::value::Value;");
        match value {
            Value::Bool(v) => format!("Value::Bool({v})"),
            Value::I64(v) => format!("Value::I64({v})"),
            Value::U64(v) => format!("Value::U64({v})"),
            Value::F64(v) => format!("Value::F64({})", float_literal(*v)),
            Value::Complex(re, im) => {
                format!("Value::Complex({}, {})", float_literal(*re), float_literal(*im))
            }
            Value::Bytes(v) => format!("Value::Bytes({v:?}.to_vec())"),
            Value::Text(v) => format!("Value::Text({v:?}.to_string())"),
            Value::Enum(v) => format!("Value::Enum({v:?}.to_string())"),
            Value::List(items) => format!("Value::List(vec![{}])", self.items_expr(items)),
            Value::Tuple(items) => format!("Value::Tuple(vec![{}])", self.items_expr(items)),
            // nested defaults are spread over the flattened leaves
            Value::Record(_) => "Value::Record(Default::default())".to_string(),
        }
    }

    fn items_expr(&mut self, items: &[Value]) -> String {
        items
            .iter()
            .map(|item| self.value_expr(item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The generated source, optionally preceded by its `use` declarations.
    pub fn get_code(&self, imports: bool) -> String {
        let mut lines: Vec<String> = Vec::new();
        if imports {
            lines.extend(self.imports.iter().map(|line| line.to_string()));
            lines.push(String::new());
        }
        lines.extend(self.lines.iter().cloned());
        lines.join("\n")
    }
}

/// Type-literal code of fields that may carry their own byte order.
fn type_code(ty: &FieldType) -> Option<&'static str> {
    match ty {
        FieldType::Int => Some("Int"),
        FieldType::Float => Some("Float"),
        FieldType::Complex => Some("Complex"),
        FieldType::Bytes => Some("Bytes"),
        _ => None,
    }
}

/// Default of the flattened field `path` (`outer.inner`), if any.
fn lookup<'a>(defaults: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut value = defaults.get(parts.next()?)?;
    for part in parts {
        value = value.as_record()?.get(part)?;
    }
    Some(value)
}

fn float_literal(v: f64) -> String {
    if v.is_nan() {
        "f64::NAN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "f64::INFINITY" } else { "f64::NEG_INFINITY" }.to_string()
    } else {
        format!("{v:?}")
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bitrecord::{
        field::{EnumType, EnumValue, FieldDescriptor},
        order::BaseUnits,
    };

    use super::*;

    fn nested() -> RecordSchema {
        let mode = Arc::new(
            EnumType::new("SensorMode", [("idle", EnumValue::Int(0)), ("run", EnumValue::Int(1))])
                .unwrap(),
        );
        let inner = Arc::new(
            RecordSchema::builder(BaseUnits::Bits)
                .field(FieldDescriptor::new("x", FieldType::Int).with_size(4).with_default(1u64))
                .field(FieldDescriptor::new("mode", FieldType::Enum(mode)).with_size(4))
                .build()
                .unwrap(),
        );
        RecordSchema::builder(BaseUnits::Bits)
            .byte_order(ByteOrder::Le)
            .size(40)
            .field(FieldDescriptor::new("flag", FieldType::Bool).with_default(true))
            .field(FieldDescriptor::new("inner", FieldType::Record(inner)).with_offset(4))
            .field(
                FieldDescriptor::new("samples", FieldType::Int)
                    .with_size(6)
                    .with_signed(true)
                    .repeated(SequenceKind::Tuple, 2),
            )
            .field(FieldDescriptor::new("label", FieldType::text()).with_size(8).with_default("a"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_flat_code() {
        let code = FlatSchemaGenerator::new(&nested(), "flat").get_code(false);
        let expected = r#"pub fn flat() -> Result<RecordSchema, SchemaError> {
    RecordSchema::builder(BaseUnits::Bits)
        .byte_order(ByteOrder::Le)
        .size(40)
        .field(FieldDescriptor::new("flag", FieldType::Bool).with_default(Value::Bool(true)))
        .field(FieldDescriptor::new("inner.x", FieldType::Int).with_size(4).with_offset(4).with_default(Value::U64(1)))
        .field(FieldDescriptor::new("inner.mode", FieldType::Enum(Arc::new(sensor_mode()?))).with_size(4))
        .field(FieldDescriptor::new("samples", FieldType::Int).with_size(6).repeated(SequenceKind::Tuple, 2).with_signed(true))
        .field(FieldDescriptor::new("label", FieldType::text()).with_size(8).with_default(Value::Text("a".to_string())))
        .build()
}"#;
        assert_eq!(code, expected);
    }

    #[test]
    fn test_imports() {
        let code = FlatSchemaGenerator::new(&nested(), "flat").get_code(true);
        let header: Vec<&str> = code.lines().take_while(|l| !l.is_empty()).collect();
        assert_eq!(
            header,
            vec![
                "use bitrecord::errors::SchemaError;",
                "use bitrecord::field::SequenceKind;",
                "use bitrecord::field::{FieldDescriptor, FieldType};",
                "use bitrecord::order::BaseUnits;",
                "use bitrecord::order::ByteOrder;",
                "use bitrecord::schema::RecordSchema;",
                "use bitrecord::value::Value;",
                "use std::sync::Arc;",
            ]
        );
    }

    #[test]
    fn test_flat_schema_has_same_layout() {
        let schema = nested();
        let flat = schema.flat_fields();
        let offsets: Vec<(String, usize)> = flat.into_iter().map(|f| (f.name, f.offset)).collect();
        assert_eq!(
            offsets,
            vec![
                ("flag".to_string(), 0),
                ("inner.x".to_string(), 4),
                ("inner.mode".to_string(), 8),
                ("samples".to_string(), 12),
                ("label".to_string(), 24),
            ]
        );
    }

    #[test]
    fn test_typestr_fields_keep_their_byte_order() {
        let schema = RecordSchema::builder(BaseUnits::Bytes)
            .byte_order(ByteOrder::Be)
            .field(FieldDescriptor::from_typestr("id", ">u2").unwrap())
            .field(FieldDescriptor::new("gain", FieldType::Float).with_size(4))
            .build()
            .unwrap();
        let code = FlatSchemaGenerator::new(&schema, "header").get_code(true);

        assert!(code.contains("use bitrecord::typestr::{TypeCode, TypeParams};"));
        assert!(code.contains(
            r#".field(FieldDescriptor::from_type_params("id", TypeParams { byte_order: Some(Endian::Big), code: TypeCode::Int, size: Some(2), signed: Some(false) }))"#
        ));
        assert!(code.contains(r#".field(FieldDescriptor::new("gain", FieldType::Float).with_size(4))"#));
        assert!(!code.contains(".size("));
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("SensorMode"), "sensor_mode");
        assert_eq!(snake_case("mode"), "mode");
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(float_literal(1.0), "1.0");
        assert_eq!(float_literal(f64::NEG_INFINITY), "f64::NEG_INFINITY");
    }
}
