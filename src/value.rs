//! Dynamic value representation for document data.
//!
//! This module provides the [`Value`] enum, the closed set of things a
//! [`Document`] slot can hold. It is what both wire codecs read into and
//! write from, and what the coercion engine converts into typed shapes.
//!
//! ## Numeric kinds
//!
//! Integers, doubles and exact decimals are kept apart so a value read from
//! one format keeps its meaning when written to the other. Equality and
//! hashing compare numbers by magnitude across kinds, so `Int32(1)`,
//! `Int64(1)` and `Decimal(1)` are equal (the text reader produces decimals).
//!
//! ```rust
//! use flexjson::Value;
//! use bigdecimal::BigDecimal;
//!
//! assert_eq!(Value::from(1), Value::from(1i64));
//! assert_eq!(Value::from(1), Value::from(BigDecimal::from(1)));
//! assert_ne!(Value::from(1), Value::from("1"));
//! ```
//!
//! ### Converting from Rust Types
//!
//! ```rust
//! use flexjson::{to_value, Value};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let value: Value = to_value(&Point { x: 10, y: 20 }).unwrap();
//! assert_eq!(value.as_object().map(|doc| doc.len()), Some(2));
//! ```

use crate::record::RecordHandle;
use crate::{Document, ObjectId};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A dynamically-typed value held by a [`Document`].
///
/// # Examples
///
/// ```rust
/// use flexjson::Value;
///
/// let null = Value::Null;
/// let num = Value::Int32(42);
/// let text = Value::String("hello".to_string());
///
/// assert!(null.is_null());
/// assert!(num.is_number());
/// assert!(text.is_string());
/// ```
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal(BigDecimal),
    String(String),
    Array(Vec<Value>),
    Object(Document),
    Date(DateTime<Utc>),
    ObjectId(ObjectId),
    /// A typed record held by reference. Written through its mapping.
    Record(RecordHandle),
}

impl Value {
    /// Wraps a record so it can be stored in a document.
    pub fn record<T: crate::Record>(record: T) -> Self {
        Value::Record(RecordHandle::new(record))
    }

    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if the value is a boolean.
    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns `true` for any of the numeric kinds.
    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Int32(_) | Value::Int64(_) | Value::Double(_) | Value::Decimal(_)
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Value::Date(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// Returns `true` for null and for strings that are empty or whitespace.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::Value;
    ///
    /// assert!(Value::Null.is_blank());
    /// assert!(Value::from("  ").is_blank());
    /// assert!(!Value::from(0).is_blank());
    /// ```
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// If the value is a boolean, returns it. Otherwise returns `None`.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a string, returns a reference to it. Otherwise returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::from(42).as_str(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an `i64` if it is a whole number in range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::Value;
    ///
    /// assert_eq!(Value::Int32(42).as_i64(), Some(42));
    /// assert_eq!(Value::Double(42.0).as_i64(), Some(42));
    /// assert_eq!(Value::Double(42.5).as_i64(), None);
    /// ```
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(i64::from(*i)),
            Value::Int64(i) => Some(*i),
            Value::Double(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            Value::Decimal(d) if integer_digits(d) <= 19 && d.is_integer() => d.to_i64(),
            _ => None,
        }
    }

    /// Returns the value as an `f64` for any numeric kind.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(i) => Some(f64::from(*i)),
            Value::Int64(i) => Some(*i as f64),
            Value::Double(f) => Some(*f),
            Value::Decimal(d) => Some(
                d.to_string()
                    .parse::<f64>()
                    .ok()
                    .or_else(|| d.to_f64())
                    .unwrap_or(f64::NAN),
            ),
            _ => None,
        }
    }

    /// Returns the value as an exact decimal. Non-finite doubles have none.
    #[must_use]
    pub fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Int32(i) => Some(BigDecimal::from(*i)),
            Value::Int64(i) => Some(BigDecimal::from(*i)),
            Value::Double(f) => double_to_decimal(*f),
            Value::Decimal(d) => Some(d.clone()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(dt) => Some(dt),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object_id(&self) -> Option<&ObjectId> {
        match self {
            Value::ObjectId(oid) => Some(oid),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_record(&self) -> Option<&RecordHandle> {
        match self {
            Value::Record(handle) => Some(handle),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "document",
            Value::Date(_) => "date",
            Value::ObjectId(_) => "objectId",
            Value::Record(_) => "record",
        }
    }
}

/// Digits left of the decimal point; zero or negative below one.
pub(crate) fn integer_digits(d: &BigDecimal) -> i64 {
    if d.is_zero() {
        return 0;
    }
    let (_, scale) = d.as_bigint_and_exponent();
    d.digits() as i64 - scale
}

/// Exact decimal for a finite double, using its shortest round-trip text.
pub(crate) fn double_to_decimal(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    value.to_string().parse().ok()
}

fn numeric_eq(a: &Value, b: &Value) -> Option<bool> {
    if !a.is_number() || !b.is_number() {
        return None;
    }
    let eq = match (a, b) {
        (Value::Double(_), _) | (_, Value::Double(_)) => a.as_f64() == b.as_f64(),
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            a.as_i64() == b.as_i64()
        }
        _ => match (a.as_decimal(), b.as_decimal()) {
            (Some(x), Some(y)) => integer_digits(&x) == integer_digits(&y) && x == y,
            (x, y) => x == y,
        },
    };
    Some(eq)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        eq_in(self, other, &mut Vec::new())
    }
}

/// Structural equality. `seen` holds the container pairs already under
/// comparison; meeting one again counts as equal.
pub(crate) fn eq_in(a: &Value, b: &Value, seen: &mut Vec<(usize, usize)>) -> bool {
    if let Some(eq) = numeric_eq(a, b) {
        return eq;
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| eq_in(x, y, seen))
        }
        (Value::Object(x), Value::Object(y)) => x.eq_in(y, seen),
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::ObjectId(x), Value::ObjectId(y)) => x == y,
        (Value::Record(x), Value::Record(y)) => x.eq_in(y, seen),
        _ => false,
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_in(self, state, &mut Vec::new());
    }
}

/// Hashes `value`; containers already on `path` contribute a marker only.
pub(crate) fn hash_in<H: Hasher>(value: &Value, state: &mut H, path: &mut Vec<usize>) {
    if value.is_number() {
        state.write_u8(2);
        let f = value.as_f64().unwrap_or(f64::NAN);
        let bits = if f == 0.0 {
            0
        } else if f.is_nan() {
            f64::NAN.to_bits()
        } else {
            f.to_bits()
        };
        state.write_u64(bits);
        return;
    }
    match value {
        Value::Null => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        Value::String(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        Value::Array(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items {
                hash_in(item, state, path);
            }
        }
        Value::Object(doc) => {
            state.write_u8(5);
            doc.hash_in(state, path);
        }
        Value::Date(dt) => {
            state.write_u8(6);
            dt.hash(state);
        }
        Value::ObjectId(oid) => {
            state.write_u8(7);
            oid.hash(state);
        }
        Value::Record(handle) => {
            state.write_u8(8);
            handle.hash_in(state, path);
        }
        _ => {}
    }
}

/// Renders the value as compact text, the same way the text writer does.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::text::to_string(self))
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int32(i) => serializer.serialize_i32(*i),
            Value::Int64(i) => serializer.serialize_i64(*i),
            Value::Double(f) => serializer.serialize_f64(*f),
            // Whole decimals that fit stay integers; the rest go through f64.
            Value::Decimal(d) => match self.as_i64() {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(d.to_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for element in items {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Object(doc) => doc.serialize(serializer),
            Value::Date(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Value::ObjectId(oid) => serializer.serialize_str(&oid.to_hex()),
            Value::Record(handle) => handle
                .to_document(crate::WireFormat::Text, crate::Context::global())
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid document value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Value::from(value).narrowed())
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Value::from(value).narrowed())
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Value::Double(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(Value::String(value))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let doc = Document::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    doc.set(key, value);
                }
                Ok(Value::Object(doc))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl Value {
    /// Narrows a 64-bit integer to `Int32` when it fits.
    pub(crate) fn narrowed(self) -> Self {
        match self {
            Value::Int64(i) => match i32::try_from(i) {
                Ok(small) => Value::Int32(small),
                Err(_) => Value::Int64(i),
            },
            other => other,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! from_int32 {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int32(i32::from(value))
                }
            }
        )*
    };
}

from_int32!(i8, i16, i32, u8, u16);

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int64(i64::from(value)).narrowed()
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Value::Int64(i),
            Err(_) => Value::Decimal(BigDecimal::from(value)),
        }
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Double(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<BigDecimal> for Value {
    fn from(value: BigDecimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Object(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Object(Document::from(value))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::ObjectId(value)
    }
}

impl From<RecordHandle> for Value {
    fn from(value: RecordHandle) -> Self {
        Value::Record(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
