use std::sync::Arc;

use bitrecord::{
    backend::BitBackend,
    field::{EnumType, EnumValue, FieldDescriptor, FieldType},
    order::{BaseUnits, BitOrder, ByteOrder},
    schema::RecordSchema,
    value::{Record, Value},
};

fn int(name: &str, size: usize) -> FieldDescriptor {
    FieldDescriptor::new(name, FieldType::Int).with_size(size)
}

/// Record exercising every primitive kind; every field has a default.
fn sample_schema(byte_order: ByteOrder, bit_order: BitOrder) -> RecordSchema {
    RecordSchema::builder(BaseUnits::Bits)
        .byte_order(byte_order)
        .bit_order(bit_order)
        // default signedness (unsigned)
        .field(FieldDescriptor::new("field_01", FieldType::Bool).with_default(true))
        .field(int("field_02", 3).with_default(4u64))
        .field(int("field_03", 12).with_default(2048u64))
        .field(
            FieldDescriptor::new("field_04", FieldType::Float)
                .with_size(32)
                .with_default(1.0),
        )
        .field(
            FieldDescriptor::new("field_05", FieldType::Bytes)
                .with_size(24)
                .with_default(b"abc".to_vec()),
        )
        .field(
            FieldDescriptor::new("field_06", FieldType::text())
                .with_size(24)
                .with_default("ABC"),
        )
        .field(int("field_08", 28).with_offset(100).with_default(134217727u64))
        // signed
        .field(FieldDescriptor::new("field_11", FieldType::Bool).with_default(false))
        .field(int("field_12", 3).with_signed(true).with_default(-4i64))
        .field(int("field_13", 12).with_signed(true).with_default(-2048i64))
        .field(int("field_18", 32).with_signed(true).with_default(-(1i64 << 31)))
        // unsigned
        .field(FieldDescriptor::new("field_21", FieldType::Bool).with_default(true))
        .field(int("field_22", 3).with_signed(false).with_default(4u64))
        .field(int("field_23", 12).with_signed(false).with_default(2048u64))
        .field(int("field_28", 32).with_signed(false).with_default(1u64 << 31))
        .build()
        .unwrap()
}

const BE_MSB: [u8; 28] = [
    0xC8, 0x00, 0x3F, 0x80, 0x00, 0x00, // fields 01..04
    0x61, 0x62, 0x63, // b"abc"
    0x41, 0x42, 0x43, // "ABC"
    0x07, 0xFF, 0xFF, 0xFF, // 4 padding bits + field_08
    0x48, 0x00, 0x80, 0x00, 0x00, 0x00, // signed
    0xC8, 0x00, 0x80, 0x00, 0x00, 0x00, // unsigned
];

const LE_MSB: [u8; 28] = [
    0xC0, 0x80, 0x00, 0x00, 0x80, 0x3F, //
    0x61, 0x62, 0x63, //
    0x41, 0x42, 0x43, //
    0x0F, 0xFF, 0xFF, 0x7F, //
    0x40, 0x80, 0x00, 0x00, 0x00, 0x80, //
    0xC0, 0x80, 0x00, 0x00, 0x00, 0x80, //
];

const BE_LSB: [u8; 28] = [
    0x90, 0x01, 0x00, 0x00, 0x01, 0xFC, //
    0xC6, 0x46, 0x86, //
    0xC2, 0x42, 0x82, //
    0x0F, 0xFF, 0xFF, 0xFE, //
    0x10, 0x01, 0x00, 0x00, 0x00, 0x01, //
    0x90, 0x01, 0x00, 0x00, 0x00, 0x01, //
];

const LE_LSB: [u8; 28] = [
    0x91, 0x00, 0xFC, 0x01, 0x00, 0x00, //
    0xC6, 0x46, 0x86, //
    0xC2, 0x42, 0x82, //
    0x0E, 0xFF, 0xFF, 0xFF, //
    0x11, 0x00, 0x01, 0x00, 0x00, 0x00, //
    0x91, 0x00, 0x01, 0x00, 0x00, 0x00, //
];

fn check_golden(byte_order: ByteOrder, bit_order: BitOrder, golden: &[u8]) {
    let schema = sample_schema(byte_order, bit_order);
    assert_eq!(schema.size(), 224);
    let codec = schema.codec::<BitBackend>().unwrap();
    assert_eq!(codec.size(), golden.len());

    let expected = schema.default_record();
    let decoded = codec.decode(golden).unwrap();
    assert_eq!(decoded, expected);
    assert_eq!(decoded.get("field_13"), Some(&Value::I64(-2048)));
    assert_eq!(decoded.get("field_28"), Some(&Value::U64(1 << 31)));

    assert_eq!(codec.encode(&expected).unwrap(), golden);
    // every field falls back to its default
    assert_eq!(codec.encode(&Record::new()).unwrap(), golden);
}

#[test]
fn test_golden_be_msb() {
    check_golden(ByteOrder::Be, BitOrder::Msb, &BE_MSB);
}

#[test]
fn test_golden_le_msb() {
    check_golden(ByteOrder::Le, BitOrder::Msb, &LE_MSB);
}

#[test]
fn test_golden_be_lsb() {
    check_golden(ByteOrder::Be, BitOrder::Lsb, &BE_LSB);
}

#[test]
fn test_golden_le_lsb() {
    check_golden(ByteOrder::Le, BitOrder::Lsb, &LE_LSB);
}

#[test]
fn test_default_orders_are_be_msb() {
    check_golden(ByteOrder::Default, BitOrder::Default, &BE_MSB);
}

fn mixed_schema(byte_order: ByteOrder) -> RecordSchema {
    RecordSchema::builder(BaseUnits::Bits)
        .byte_order(byte_order)
        .field(int("kind", 3))
        .field(FieldDescriptor::new("valid", FieldType::Bool))
        .field(int("count", 12))
        .field(FieldDescriptor::new("gain", FieldType::Float).with_size(32))
        .build()
        .unwrap()
}

#[test]
fn test_mixed_bit_record() {
    let record = Record::new()
        .with("kind", 0b101u64)
        .with("valid", false)
        .with("count", 2048u64)
        .with("gain", 1.0);

    let be: [u8; 6] = [0xA8, 0x00, 0x3F, 0x80, 0x00, 0x00];
    let le: [u8; 6] = [0xA0, 0x80, 0x00, 0x00, 0x80, 0x3F];
    for (byte_order, golden) in [(ByteOrder::Default, be), (ByteOrder::Be, be), (ByteOrder::Le, le)] {
        let codec = mixed_schema(byte_order).codec::<BitBackend>().unwrap();
        assert_eq!(codec.decode(&golden).unwrap(), record);
        assert_eq!(codec.encode(&record).unwrap(), golden);
    }
}

#[test]
fn test_nested_bit_record() {
    let child = Arc::new(
        RecordSchema::builder(BaseUnits::Bits)
            .field(int("field_1", 4).with_default(1u64))
            .field(int("field_2", 4).with_default(2u64))
            .build()
            .unwrap(),
    );
    let schema = RecordSchema::builder(BaseUnits::Bits)
        .field(int("field_1", 4).with_default(0u64))
        .field(FieldDescriptor::new("field_2", FieldType::Record(child.clone())))
        .field(int("field_3", 4).with_default(3u64))
        .field(FieldDescriptor::new("field_4", FieldType::Record(child)))
        .build()
        .unwrap();
    let codec = schema.codec::<BitBackend>().unwrap();

    let golden: [u8; 3] = [0x01, 0x23, 0x12];
    let child_value = Record::new().with("field_1", 1u64).with("field_2", 2u64);
    let expected = Record::new()
        .with("field_1", 0u64)
        .with("field_2", child_value.clone())
        .with("field_3", 3u64)
        .with("field_4", child_value);

    assert_eq!(schema.default_record(), expected);
    assert_eq!(codec.decode(&golden).unwrap(), expected);
    assert_eq!(codec.encode(&expected).unwrap(), golden);
}

#[test]
fn test_bit_sequences() {
    let schema = RecordSchema::builder(BaseUnits::Bits)
        .field(int("field_1", 4).repeated(bitrecord::field::SequenceKind::List, 2))
        .field(int("field_2", 4).repeated(bitrecord::field::SequenceKind::Tuple, 2))
        .build()
        .unwrap();
    let codec = schema.codec::<BitBackend>().unwrap();

    let golden: [u8; 2] = [0x33, 0x44];
    let record = codec.decode(&golden).unwrap();
    assert_eq!(
        record.get("field_1"),
        Some(&Value::List(vec![Value::U64(3), Value::U64(3)]))
    );
    assert_eq!(
        record.get("field_2"),
        Some(&Value::Tuple(vec![Value::U64(4), Value::U64(4)]))
    );
    assert_eq!(codec.encode(&record).unwrap(), golden);
}

#[test]
fn test_bit_enums() {
    let text = Arc::new(
        EnumType::new(
            "Letter",
            [
                ("A", EnumValue::Text("a".to_string())),
                ("B", EnumValue::Text("b".to_string())),
            ],
        )
        .unwrap(),
    );
    let bytes = Arc::new(
        EnumType::new(
            "Octet",
            [("A", EnumValue::Bytes(b"a".to_vec())), ("B", EnumValue::Bytes(b"b".to_vec()))],
        )
        .unwrap(),
    );
    let number = Arc::new(
        EnumType::new("Number", [("A", EnumValue::Int(1)), ("B", EnumValue::Int(2))]).unwrap(),
    );

    let schema = RecordSchema::builder(BaseUnits::Bits)
        .bit_order(BitOrder::Msb)
        .field(
            FieldDescriptor::new("field_1", FieldType::Enum(text))
                .with_size(8)
                .with_default(Value::Enum("A".to_string())),
        )
        .field(
            FieldDescriptor::new("field_2", FieldType::Enum(bytes))
                .with_size(8)
                .with_default(Value::Enum("A".to_string())),
        )
        .field(
            FieldDescriptor::new("field_3", FieldType::Enum(number.clone()))
                .with_size(4)
                .with_default(Value::Enum("A".to_string())),
        )
        .field(
            FieldDescriptor::new("field_4", FieldType::Enum(number))
                .with_size(4)
                .with_default(Value::Enum("A".to_string())),
        )
        .build()
        .unwrap();
    let codec = schema.codec::<BitBackend>().unwrap();

    let golden: [u8; 3] = [0x61, 0x61, 0x11];
    assert_eq!(codec.encode(&Record::new()).unwrap(), golden);
    assert_eq!(codec.decode(&golden).unwrap(), schema.default_record());

    let err = codec.decode(&[0x61, 0x61, 0x13]).unwrap_err();
    assert!(matches!(
        err,
        bitrecord::errors::DecodeError::UnknownEnumValue { .. }
    ));
}
