//! # flexjson
//!
//! A thread-safe dynamic document with a forgiving coercion engine, a text
//! codec, a binary document codec, and declarative mapping of typed records
//! to either wire format.
//!
//! ## Key Features
//!
//! - **Shared documents**: [`Document`] is an ordered map behind a lock; clones
//!   are handles to the same storage and every operation is safe to call from
//!   many threads
//! - **Coercion**: [`Document::require`] and [`Document::optional`] convert
//!   stored values to any [`Shape`], from numbers in text to enums by name
//! - **Two wire formats**: the [`text`] codec and the length-prefixed
//!   [`binary`] codec, with exact decimals, dates and object ids
//! - **Record mapping**: a [`Record`] declares per-format keys and [`Ignore`]
//!   policies once; mappings are resolved and cached per type
//! - **Diagnostics**: every event goes to `tracing` and to an optional
//!   [`LogSink`]; error events with no sink become [`Error::UnhandledLogEvent`]
//!
//! ## Quick Start
//!
//! ```rust
//! use flexjson::{doc, Document, Value};
//!
//! let d = doc!({
//!     "name": "Alice",
//!     "age": "30",
//!     "tags": ["rust", "serde"]
//! });
//!
//! // Text holding a number coerces to the number
//! let age: u32 = d.require("age").unwrap();
//! assert_eq!(age, 30);
//!
//! // Absent keys fall back to the zero value
//! let score: f64 = d.optional("score").unwrap();
//! assert_eq!(score, 0.0);
//!
//! let text = d.to_text();
//! let back: Document = text.parse().unwrap();
//! assert_eq!(back.get("name"), Value::from("Alice"));
//! ```
//!
//! ### Records
//!
//! ```rust
//! use flexjson::{Document, Field, Ignore, Keys, Record, Schema, WireFormat};
//!
//! #[derive(Clone, Default)]
//! struct Player {
//!     id: String,
//!     screen_name: String,
//!     level: i32,
//! }
//!
//! impl Record for Player {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .identity("id", |p: &Player| &p.id, |p| &mut p.id)
//!             .field(Field::new("screen_name", |p: &Player| &p.screen_name, |p| &mut p.screen_name)
//!                 .keys(Keys::new().binary("sn").ignore(Ignore::NEVER)))
//!             .field(Field::new("level", |p: &Player| &p.level, |p| &mut p.level)
//!                 .ignore(Ignore::WHEN_DEFAULT))
//!     }
//! }
//!
//! let player = Player { id: String::new(), screen_name: "ace".into(), level: 0 };
//! let stored = Document::from_model(&player, WireFormat::Binary);
//! assert_eq!(stored.keys(), vec!["_id", "sn"]);
//!
//! let back: Player = stored.to_model(WireFormat::Binary).unwrap();
//! assert_eq!(back.screen_name, "ace");
//! assert_eq!(back.id.len(), 24);
//! ```
//!
//! ## Configuration
//!
//! Entry points that take no [`Context`] use [`Context::global`]. Install one
//! with [`configure`] before first use to register a sink or switch on
//! validation.
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Binary input is bounds-checked; malformed input is an error, never a panic
//! - Self-containing documents and records are detected before they are written

#[macro_use]
pub mod macros;

pub mod binary;
pub mod context;
pub mod de;
pub mod document;
pub mod driver;
pub mod error;
pub mod log;
pub mod oid;
pub mod options;
pub mod record;
pub mod registry;
pub mod ser;
pub mod shape;
pub mod text;
pub mod value;

pub use context::{configure, Context};
pub use de::{from_value, ValueDeserializer};
pub use document::Document;
pub use error::{Direction, Error, Result};
pub use log::{LogEvent, LogSink, Severity};
pub use oid::ObjectId;
pub use options::Options;
pub use record::{check, Field, Ignore, Keys, Record, RecordHandle, Schema, WireFormat};
pub use ser::{to_value, ValueSerializer};
pub use shape::{Kind, Shape, Stack};
pub use value::Value;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Serialize any `T: Serialize` to compact text.
///
/// # Examples
///
/// ```rust
/// use flexjson::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(to_string(&Point { x: 1, y: 2 }).unwrap(), r#"{"x":1,"y":2}"#);
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a [`Value`].
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with(value, Context::global())
}

/// Serialize any `T: Serialize` to indented text.
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a [`Value`].
pub fn to_string_pretty<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let ctx = Context::global();
    let options = ctx.options().clone().with_pretty(true);
    let mut writer = text::Writer::new(ctx, &options);
    writer.write_value(&to_value(value)?);
    Ok(writer.finish())
}

/// Serialize any `T: Serialize` to text with the options of `ctx`.
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a [`Value`].
pub fn to_string_with<T>(value: &T, ctx: &Context) -> Result<String>
where
    T: ?Sized + Serialize,
{
    Ok(text::to_string_with(&to_value(value)?, ctx))
}

/// Serialize any `T: Serialize` as text into a writer.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
pub fn to_writer<W, T>(mut writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let text = to_string(value)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::serialize("text", e))
}

/// Deserialize a `T` from text.
///
/// The text is read with the lenient text reader (comments and trailing
/// commas allowed) and then converted through [`from_value`].
///
/// # Examples
///
/// ```rust
/// use flexjson::from_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_str(r#"{"x": 1, "y": 2, /* ignored */}"#).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the text is malformed or does not fit `T`. Syntax
/// errors carry the line and column.
pub fn from_str<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_value(text::parse_value(s, Context::global())?)
}

/// Deserialize a `T` from a reader of text.
///
/// # Errors
///
/// Returns an error if reading fails, the text is malformed, or it does not
/// fit `T`.
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut string = String::new();
    reader
        .read_to_string(&mut string)
        .map_err(|e| Error::deserialize("text", e))?;
    from_str(&string)
}

/// Deserialize a `T` from UTF-8 bytes of text.
///
/// # Errors
///
/// Returns an error if the bytes are not UTF-8, the text is malformed, or it
/// does not fit `T`.
pub fn from_slice<T>(v: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let s = std::str::from_utf8(v).map_err(|e| Error::deserialize("text", e))?;
    from_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
        nickname: Option<String>,
    }

    #[test]
    fn test_serde_types_through_text() {
        let user = User {
            id: 7,
            name: "Ann".into(),
            active: true,
            tags: vec!["a".into(), "b".into()],
            nickname: None,
        };
        let text = to_string(&user).unwrap();
        assert_eq!(
            text,
            r#"{"id":7,"name":"Ann","active":true,"tags":["a","b"],"nickname":null}"#
        );
        let back: User = from_str(&text).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_pretty_and_writer() {
        let pretty = to_string_pretty(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(pretty, "{\n  \"x\": 1,\n  \"y\": 2\n}");

        let mut buffer = Vec::new();
        to_writer(&mut buffer, &Point { x: 3, y: 4 }).unwrap();
        let back: Point = from_slice(&buffer).unwrap();
        assert_eq!(back, Point { x: 3, y: 4 });

        let back: Point = from_reader(std::io::Cursor::new(buffer)).unwrap();
        assert_eq!(back.y, 4);
    }

    #[test]
    fn test_text_agrees_with_serde_json() {
        let point = Point { x: -5, y: 10 };
        assert_eq!(
            to_string(&point).unwrap(),
            serde_json::to_string(&point).unwrap()
        );
    }

    #[test]
    fn test_malformed_text() {
        let result: Result<Point> = from_str("{\"x\": 1,");
        assert!(result.is_err());
        let result: Result<Point> = from_slice(&[0xff, 0xfe]);
        assert!(result.is_err());
    }
}
