//! The binary codec.
//!
//! A little-endian, length-prefixed document encoding in the element layout
//! used by document databases: each element is a type tag, a NUL-terminated
//! key, and a payload. Decimals travel as decimal128, dates as UTC
//! milliseconds, and object ids as their 12 raw bytes.
//!
//! ## Examples
//!
//! ```rust
//! use flexjson::{binary, doc, Context, Value};
//!
//! let ctx = Context::default();
//! let original = doc!({ "name": "Joe", "score": 1.5, "tags": ["a", "b"] });
//! let bytes = binary::to_bytes(&original, &ctx).unwrap();
//! let back = binary::from_bytes(&bytes, &ctx).unwrap();
//! assert_eq!(back.get("name"), Value::from("Joe"));
//! assert_eq!(back, original);
//! ```

mod decimal128;
mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use crate::{Context, Document, Error, Record, Result, Shape, Value, WireFormat};

/// Element type tags.
pub(crate) mod tag {
    pub const DOUBLE: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const DOCUMENT: u8 = 0x03;
    pub const ARRAY: u8 = 0x04;
    pub const BINARY: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const OBJECT_ID: u8 = 0x07;
    pub const BOOL: u8 = 0x08;
    pub const DATE: u8 = 0x09;
    pub const NULL: u8 = 0x0A;
    pub const REGEX: u8 = 0x0B;
    pub const DB_POINTER: u8 = 0x0C;
    pub const JAVASCRIPT: u8 = 0x0D;
    pub const SYMBOL: u8 = 0x0E;
    pub const CODE_WITH_SCOPE: u8 = 0x0F;
    pub const INT32: u8 = 0x10;
    pub const TIMESTAMP: u8 = 0x11;
    pub const INT64: u8 = 0x12;
    pub const DECIMAL128: u8 = 0x13;
    pub const MIN_KEY: u8 = 0xFF;
    pub const MAX_KEY: u8 = 0x7F;
}

/// Encodes a document.
pub fn to_bytes(doc: &Document, ctx: &Context) -> Result<Vec<u8>> {
    let mut writer = Writer::new(ctx);
    writer.write_document(doc)?;
    Ok(writer.finish())
}

/// Decodes a document that must span the whole input.
pub fn from_bytes(bytes: &[u8], ctx: &Context) -> Result<Document> {
    let mut reader = Reader::new(bytes, ctx);
    let doc = reader.read_document()?;
    if reader.position() != bytes.len() {
        return Err(Error::deserialize(
            "Document",
            format!("{} trailing bytes", bytes.len() - reader.position()),
        ));
    }
    Ok(doc)
}

/// Reads a document stored as an element of a larger stream: a type tag
/// followed by the element payload.
///
/// Null and undefined read as `None`. Anything else that is not a document
/// is read with a warning: arrays come back as documents keyed by index,
/// strings are parsed as text documents, and other values fail.
pub fn read_embedded(bytes: &[u8], ctx: &Context) -> Result<Option<Document>> {
    let mut reader = Reader::new(bytes, ctx);
    let element = reader.u8()?;
    match element {
        tag::NULL | tag::UNDEFINED => Ok(None),
        tag::DOCUMENT => reader.read_document().map(Some),
        tag::ARRAY => {
            ctx.warn(
                "Expected an embedded document but found an array; reading it as a document.",
                None,
            );
            reader.read_document().map(Some)
        }
        other => {
            ctx.warn(
                "Expected an embedded document; attempting a document read.",
                Some(Value::from(format!("0x{other:02x}"))),
            );
            match reader.read_element(other, "")? {
                Some(Value::String(text)) => crate::text::parse_document(&text, ctx).map(Some),
                Some(value) => Err(Error::deserialize(
                    "Document",
                    format!("cannot read {} as a document", value.kind_name()),
                )),
                None => Err(Error::deserialize(
                    "Document",
                    format!("cannot read element type 0x{other:02x} as a document"),
                )),
            }
        }
    }
}

/// Writes a record through its binary mapping.
pub fn to_binary<T: Record>(record: &T, ctx: &Context) -> Result<Vec<u8>> {
    let doc = crate::registry::mapping::<T>(ctx).write(record, WireFormat::Binary, ctx);
    to_bytes(&doc, ctx)
}

/// Reads a record through its binary mapping, validating it when switched on.
pub fn from_binary<T: Record>(bytes: &[u8], ctx: &Context) -> Result<T> {
    let doc = from_bytes(bytes, ctx)?;
    let record = crate::registry::mapping::<T>(ctx).read(&doc, WireFormat::Binary, ctx)?;
    if ctx.options().validate_on_deserialize {
        record.validate_shape(ctx)?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectId;
    use bigdecimal::BigDecimal;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    #[test]
    fn test_value_kinds_survive() {
        let ctx = Context::default();
        let oid = ObjectId::generate();
        let date = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let original = doc!({
            "i": 1,
            "l": (Value::Int64(1 << 40)),
            "d": 2.5,
            "m": (Value::Decimal(BigDecimal::from_str("12.340").unwrap())),
            "b": false,
            "n": null,
            "o": (Value::ObjectId(oid)),
            "t": (Value::Date(date)),
            "nested": { "xs": [1, "two", { "k": true }] }
        });

        let back = from_bytes(&to_bytes(&original, &ctx).unwrap(), &ctx).unwrap();
        assert_eq!(back, original);
        assert_eq!(back.get("o"), Value::ObjectId(oid));
        assert_eq!(back.get("t"), Value::Date(date));
        assert!(matches!(back.get("l"), Value::Int64(_)));
        assert!(matches!(back.get("m"), Value::Decimal(_)));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let ctx = Context::default();
        let mut bytes = to_bytes(&Document::new(), &ctx).unwrap();
        bytes.push(0);
        assert!(from_bytes(&bytes, &ctx).is_err());
    }

    #[test]
    fn test_read_embedded() {
        let ctx = Context::default();
        assert_eq!(read_embedded(&[tag::NULL], &ctx).unwrap(), None);
        assert_eq!(read_embedded(&[tag::UNDEFINED], &ctx).unwrap(), None);

        let mut bytes = vec![tag::DOCUMENT];
        bytes.extend(to_bytes(&doc!({ "a": 1 }), &ctx).unwrap());
        assert_eq!(read_embedded(&bytes, &ctx).unwrap(), Some(doc!({ "a": 1 })));

        bytes[0] = tag::ARRAY;
        assert_eq!(
            read_embedded(&bytes, &ctx).unwrap().map(|d| d.get("a")),
            Some(Value::Int32(1))
        );

        let text = "{\"x\":true}\0";
        let mut bytes = vec![tag::STRING];
        bytes.extend((text.len() as i32).to_le_bytes());
        bytes.extend(text.as_bytes());
        assert_eq!(
            read_embedded(&bytes, &ctx).unwrap().map(|d| d.get("x")),
            Some(Value::Bool(true))
        );

        let mut bytes = vec![tag::INT32];
        bytes.extend(5i32.to_le_bytes());
        assert!(read_embedded(&bytes, &ctx).is_err());
        assert!(read_embedded(&[0x42], &ctx).is_err());
    }
}
