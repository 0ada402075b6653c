//! Binary document writer.
//!
//! Documents are length-prefixed and NUL-terminated; arrays are documents
//! keyed `"0"`, `"1"`, and so on. Records are written through their binary
//! mapping after a cycle check.

use super::decimal128;
use super::tag;
use crate::{Context, Document, Error, Result, Value, WireFormat};

pub struct Writer<'a> {
    buf: Vec<u8>,
    ctx: &'a Context,
    path: Vec<usize>,
}

impl<'a> Writer<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Writer {
            buf: Vec::new(),
            ctx,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_document(&mut self, doc: &Document) -> Result<()> {
        self.path.push(doc.id());
        let entries = doc.entries();
        let result = self.write_body(entries.iter().map(|(k, v)| (k.as_str(), v)));
        self.path.pop();
        result
    }

    fn write_array(&mut self, items: &[Value]) -> Result<()> {
        let keys: Vec<String> = (0..items.len()).map(|i| i.to_string()).collect();
        self.write_body(keys.iter().map(String::as_str).zip(items))
    }

    fn write_body<'v>(&mut self, elements: impl Iterator<Item = (&'v str, &'v Value)>) -> Result<()> {
        let start = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        for (key, value) in elements {
            self.write_element(key, value)?;
        }
        self.buf.push(0);

        let size = i32::try_from(self.buf.len() - start)
            .map_err(|_| Error::serialize("Document", "document exceeds the maximum size"))?;
        self.buf[start..start + 4].copy_from_slice(&size.to_le_bytes());
        Ok(())
    }

    fn write_element(&mut self, key: &str, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.head(tag::NULL, key)?,
            Value::Bool(b) => {
                self.head(tag::BOOL, key)?;
                self.buf.push(u8::from(*b));
            }
            Value::Int32(i) => {
                self.head(tag::INT32, key)?;
                self.buf.extend_from_slice(&i.to_le_bytes());
            }
            Value::Int64(i) => {
                self.head(tag::INT64, key)?;
                self.buf.extend_from_slice(&i.to_le_bytes());
            }
            Value::Double(f) => {
                self.head(tag::DOUBLE, key)?;
                self.buf.extend_from_slice(&f.to_le_bytes());
            }
            Value::Decimal(d) => match decimal128::encode(d) {
                Ok(bytes) => {
                    self.head(tag::DECIMAL128, key)?;
                    self.buf.extend_from_slice(&bytes);
                }
                Err(_) => {
                    self.ctx.warn(
                        "Decimal is outside the decimal128 range; writing it as text.",
                        Some(Value::from(key)),
                    );
                    return self.write_string(key, &d.to_string());
                }
            },
            Value::String(s) => self.write_string(key, s)?,
            Value::Array(items) => {
                self.head(tag::ARRAY, key)?;
                self.write_array(items)?;
            }
            Value::Object(doc) => {
                if self.path.contains(&doc.id()) {
                    self.ctx.warn(
                        "Document contains itself; writing a placeholder instead.",
                        Some(Value::from(key)),
                    );
                    return self.write_string(key, "[circular document]");
                }
                self.head(tag::DOCUMENT, key)?;
                self.write_document(doc)?;
            }
            Value::Date(dt) => {
                self.head(tag::DATE, key)?;
                self.buf.extend_from_slice(&dt.timestamp_millis().to_le_bytes());
            }
            Value::ObjectId(oid) => {
                self.head(tag::OBJECT_ID, key)?;
                self.buf.extend_from_slice(&oid.bytes());
            }
            Value::Record(handle) => {
                if handle.has_cycle(self.ctx) {
                    self.ctx.warn(
                        "Record refers back to itself; writing its display text instead.",
                        Some(Value::from(handle.type_name())),
                    );
                    return self.write_string(key, &handle.display());
                }
                let doc = handle.to_document(WireFormat::Binary, self.ctx);
                self.head(tag::DOCUMENT, key)?;
                self.write_document(&doc)?;
            }
        }
        Ok(())
    }

    fn head(&mut self, tag: u8, key: &str) -> Result<()> {
        if key.contains('\0') {
            return Err(Error::serialize(
                "Document",
                format!("key {key:?} contains a NUL character"),
            ));
        }
        self.buf.push(tag);
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    fn write_string(&mut self, key: &str, s: &str) -> Result<()> {
        self.head(tag::STRING, key)?;
        let len = i32::try_from(s.len() + 1)
            .map_err(|_| Error::serialize("String", "string exceeds the maximum size"))?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        Ok(())
    }
}
