//! Binary document reader.
//!
//! Every read is bounds-checked against the input, and each document's
//! declared length must match the bytes its elements consume. Elements with
//! no document equivalent are consumed and skipped with a warning; a few
//! legacy element types are read as their closest value.

use super::decimal128;
use super::tag;
use crate::{Context, Document, Error, ObjectId, Result, Value};
use chrono::{TimeZone, Utc};

/// Documents nested deeper than this are rejected.
const MAX_DEPTH: usize = 512;

pub struct Reader<'a> {
    data: &'a [u8],
    x: usize,
    depth: usize,
    ctx: &'a Context,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], ctx: &'a Context) -> Self {
        Reader {
            data,
            x: 0,
            depth: 0,
            ctx,
        }
    }

    /// Position of the next unread byte.
    #[must_use]
    pub fn position(&self) -> usize {
        self.x
    }

    fn error(&self, msg: &str) -> Error {
        Error::deserialize("Document", format!("{msg} at byte {}", self.x))
    }

    fn check(&self, n: usize) -> Result<()> {
        if self.data.len().saturating_sub(self.x) < n {
            return Err(self.error("Unexpected end of input"));
        }
        Ok(())
    }

    fn buf(&mut self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        let bytes = &self.data[self.x..self.x + n];
        self.x += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.buf(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.buf(1)?[0])
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    fn length(&mut self) -> Result<usize> {
        let len = self.i32()?;
        usize::try_from(len).map_err(|_| self.error("Negative length"))
    }

    fn cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.x..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.error("Unterminated key"))?;
        let s = std::str::from_utf8(&rest[..end])
            .map_err(|_| self.error("Key is not valid UTF-8"))?
            .to_string();
        self.x += end + 1;
        Ok(s)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.length()?;
        if len == 0 {
            return Err(self.error("String length must include its terminator"));
        }
        let bytes = self.buf(len)?;
        if bytes[len - 1] != 0 {
            return Err(self.error("String is not NUL-terminated"));
        }
        std::str::from_utf8(&bytes[..len - 1])
            .map(str::to_string)
            .map_err(|_| self.error("String is not valid UTF-8"))
    }

    /// Reads a whole document.
    pub fn read_document(&mut self) -> Result<Document> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("Nesting too deep"));
        }

        let start = self.x;
        let size = self.length()?;
        if size < 5 {
            return Err(self.error("Document length is too small"));
        }
        let end = start + size;
        if end > self.data.len() {
            return Err(self.error("Document length exceeds the input"));
        }

        let doc = Document::new();
        loop {
            if self.x >= end {
                return Err(self.error("Document is missing its terminator"));
            }
            let tag = self.u8()?;
            if tag == 0 {
                break;
            }
            let key = self.cstring()?;
            if let Some(value) = self.read_element(tag, &key)? {
                doc.set(key, value);
            }
        }
        if self.x != end {
            return Err(self.error("Document length does not match its contents"));
        }

        self.depth -= 1;
        Ok(doc)
    }

    fn read_array(&mut self) -> Result<Vec<Value>> {
        Ok(self.read_document()?.values())
    }

    /// Reads the payload of an element with the given tag.
    ///
    /// `None` means the element was consumed but has no value to keep.
    pub(crate) fn read_element(&mut self, tag: u8, key: &str) -> Result<Option<Value>> {
        let value = match tag {
            tag::DOUBLE => Value::Double(self.f64()?),
            tag::STRING | tag::JAVASCRIPT | tag::SYMBOL => Value::String(self.string()?),
            tag::DOCUMENT => Value::Object(self.read_document()?),
            tag::ARRAY => Value::Array(self.read_array()?),
            tag::BINARY => {
                let len = self.length()?;
                self.buf(1 + len)?;
                return self.skipped(tag, key);
            }
            tag::UNDEFINED | tag::NULL => Value::Null,
            tag::OBJECT_ID => Value::ObjectId(ObjectId::from_bytes(self.array()?)),
            tag::BOOL => Value::Bool(self.u8()? != 0),
            tag::DATE => {
                let millis = self.i64()?;
                let date = Utc
                    .timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| self.error("Date is out of range"))?;
                Value::Date(date)
            }
            tag::REGEX => {
                let pattern = self.cstring()?;
                let flags = self.cstring()?;
                Value::String(format!("/{pattern}/{flags}"))
            }
            tag::DB_POINTER => {
                self.string()?;
                self.buf(12)?;
                return self.skipped(tag, key);
            }
            tag::CODE_WITH_SCOPE => {
                let start = self.x;
                let len = self.length()?;
                if len < 4 {
                    return Err(self.error("Code with scope length is too small"));
                }
                self.x = start;
                self.buf(len)?;
                return self.skipped(tag, key);
            }
            tag::INT32 => Value::Int32(self.i32()?),
            tag::TIMESTAMP => Value::Int64(self.i64()?),
            tag::INT64 => Value::Int64(self.i64()?),
            tag::DECIMAL128 => decimal128::decode(self.array()?),
            tag::MIN_KEY | tag::MAX_KEY => return self.skipped(tag, key),
            other => {
                return Err(self.error(&format!("Unknown element type 0x{other:02x}")));
            }
        };
        Ok(Some(value))
    }

    fn skipped(&self, tag: u8, key: &str) -> Result<Option<Value>> {
        self.ctx.warn(
            "Skipped a binary element with no document equivalent.",
            Some(Value::from(crate::doc!({
                "key": key,
                "type": (format!("0x{tag:02x}"))
            }))),
        );
        Ok(None)
    }
}
