//! The text codec.
//!
//! Reads and writes documents as JSON text. See [`Reader`] for the accepted
//! input and [`Writer`] for the output rules.
//!
//! ## Examples
//!
//! ```rust
//! use flexjson::{text, Context, Value};
//!
//! let ctx = Context::default();
//! let doc = text::parse_document(r#"{"n": 1.50, "tags": ["a"]}"#, &ctx).unwrap();
//! assert_eq!(doc.get("n"), Value::Double(1.5));
//! assert_eq!(text::document_to_string(&doc, &ctx), r#"{"n":1.50,"tags":["a"]}"#);
//! ```

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use crate::{Context, Document, Options, Record, Result, Shape, Value, WireFormat};

/// Writes a value as compact text using the global context.
#[must_use]
pub fn to_string(value: &Value) -> String {
    to_string_with(value, Context::global())
}

/// Writes a value using the options of `ctx`.
#[must_use]
pub fn to_string_with(value: &Value, ctx: &Context) -> String {
    let mut writer = Writer::new(ctx, ctx.options());
    writer.write_value(value);
    writer.finish()
}

#[must_use]
pub fn document_to_string(doc: &Document, ctx: &Context) -> String {
    document_to_string_with(doc, ctx, ctx.options())
}

/// Writes a document with explicit options, e.g. to force indentation.
#[must_use]
pub fn document_to_string_with(doc: &Document, ctx: &Context, options: &Options) -> String {
    let mut writer = Writer::new(ctx, options);
    writer.write_document(doc);
    writer.finish()
}

/// Parses text that must hold a document.
pub fn parse_document(input: &str, ctx: &Context) -> Result<Document> {
    Reader::new(input, ctx.options()).read_document()
}

/// Parses text holding any value.
pub fn parse_value(input: &str, ctx: &Context) -> Result<Value> {
    Reader::new(input, ctx.options()).read_value()
}

/// Writes a record through its text mapping.
#[must_use]
pub fn to_text<T: Record>(record: &T, ctx: &Context) -> String {
    let doc = crate::registry::mapping::<T>(ctx).write(record, WireFormat::Text, ctx);
    document_to_string(&doc, ctx)
}

/// Reads a record through its text mapping, validating it when switched on.
pub fn from_text<T: Record>(input: &str, ctx: &Context) -> Result<T> {
    let doc = parse_document(input, ctx)?;
    let record = crate::registry::mapping::<T>(ctx).read(&doc, WireFormat::Text, ctx)?;
    if ctx.options().validate_on_deserialize {
        record.validate_shape(ctx)?;
    }
    Ok(record)
}
