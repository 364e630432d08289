//! # bitrecord
//!
//! Declarative fixed-layout binary records.
//!
//! Describe a record as an ordered list of typed, sized fields measured in
//! bits or bytes, then encode and decode it with a backend compiled from the
//! description. Fields may be booleans, integers, floats, complex numbers,
//! byte strings, text, enumerations, fixed-length sequences or nested
//! records. Byte order (big/little endian) and, for bit records, bit order
//! (MSB/LSB first) are configurable per record.
//!
//! ## Example
//!
//! ```
//! use bitrecord::backend::BitBackend;
//! use bitrecord::field::{FieldDescriptor, FieldType};
//! use bitrecord::order::BaseUnits;
//! use bitrecord::schema::RecordSchema;
//! use bitrecord::value::{Record, Value};
//!
//! let schema = RecordSchema::builder(BaseUnits::Bits)
//!     .field(FieldDescriptor::new("kind", FieldType::Int).with_size(3))
//!     .field(FieldDescriptor::new("valid", FieldType::Bool))
//!     .field(FieldDescriptor::new("count", FieldType::Int).with_size(12))
//!     .field(FieldDescriptor::new("gain", FieldType::Float).with_size(32))
//!     .build()
//!     .unwrap();
//! let codec = schema.codec::<BitBackend>().unwrap();
//!
//! let data = [0xA8, 0x00, 0x3F, 0x80, 0x00, 0x00];
//! let record = codec.decode(&data).unwrap();
//! assert_eq!(record.get("kind"), Some(&Value::U64(0b101)));
//! assert_eq!(record.get("count"), Some(&Value::U64(2048)));
//! assert_eq!(record.get("gain"), Some(&Value::F64(1.0)));
//! assert_eq!(codec.encode(&record).unwrap(), data);
//! ```

pub mod backend;
pub mod bits;
pub mod codec;
pub mod compiled;
pub mod errors;
pub mod field;
pub mod order;
pub mod packbits;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod typestr;
pub mod value;
