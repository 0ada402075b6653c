//! Target shapes for the coercion engine.
//!
//! A [`Shape`] is anything a [`Value`] can be converted into: primitives,
//! exact decimals, dates, collections, documents, enums declared with
//! [`flex_enum!`](crate::flex_enum) and records. The engine in
//! [`Context`] handles null and blank input, then defers to
//! [`Shape::from_value`].
//!
//! ## Numbers
//!
//! Integer targets accept any numeric kind, booleans and integer text.
//! Fractional input is rounded half to even; anything outside the target's
//! range is a conversion error.
//!
//! ```rust
//! use flexjson::{Context, Value};
//!
//! let ctx = Context::default();
//! assert_eq!(ctx.translate::<i32>(&Value::Double(2.5)).unwrap(), 2);
//! assert_eq!(ctx.translate::<i32>(&Value::Double(3.5)).unwrap(), 4);
//! assert!(ctx.translate::<u8>(&Value::Int32(300)).is_err());
//! ```

use crate::record::RecordHandle;
use crate::value::double_to_decimal;
use crate::{Context, Document, Error, ObjectId, Record, Result, Value};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::hash::Hash;
use std::str::FromStr;

/// Whether a shape behaves like a plain value or a reference.
///
/// Only value shapes are skipped by the "when default" ignore policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Value,
    Reference,
}

/// A type the coercion engine can produce from a [`Value`].
pub trait Shape: Sized {
    const KIND: Kind;

    /// Name used in conversion errors.
    fn shape_name() -> String;

    /// The zero value returned for null input and absent optional keys.
    fn zero() -> Self;

    /// Converts a non-null value.
    fn from_value(value: &Value, ctx: &Context) -> Result<Self>;

    fn to_value(&self) -> Value;

    /// Returns `true` if `self` equals the zero value.
    fn is_zero(&self) -> bool;

    /// Nullable shapes treat blank text as null.
    fn nullable() -> bool {
        false
    }

    /// Returns `true` if `self` is a null result.
    fn is_none(&self) -> bool {
        false
    }

    /// Converts null input.
    fn from_null() -> Result<Self> {
        Ok(Self::zero())
    }

    /// The lowest declared value, for shapes with a closed set of values.
    fn floor() -> Option<Self> {
        None
    }

    /// Abstract shapes name no concrete layout and cannot be produced.
    fn is_abstract() -> bool {
        false
    }

    /// Runs record validation, if this shape holds records.
    fn validate_shape(&self, ctx: &Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Whole-number view of a value for integer targets.
pub(crate) fn integer(value: &Value, shape: &str) -> Result<i128> {
    match value {
        Value::Int32(i) => Ok(i128::from(*i)),
        Value::Int64(i) => Ok(i128::from(*i)),
        Value::Bool(b) => Ok(i128::from(*b)),
        Value::Double(f) => {
            if !f.is_finite() {
                return Err(Error::deserialize(shape, format!("{} is not a finite number", f)));
            }
            let rounded = f.round_ties_even();
            if rounded < i128::MIN as f64 || rounded >= i128::MAX as f64 {
                return Err(Error::deserialize(shape, format!("{} is out of range", f)));
            }
            Ok(rounded as i128)
        }
        Value::Decimal(d) => {
            let digits = crate::value::integer_digits(d);
            if digits > 39 {
                return Err(Error::deserialize(shape, format!("{} is out of range", d)));
            }
            if digits < 0 {
                return Ok(0);
            }
            d.with_scale_round(0, RoundingMode::HalfEven)
                .to_i128()
                .ok_or_else(|| Error::deserialize(shape, format!("{} is out of range", d)))
        }
        Value::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| Error::deserialize(shape, format!("'{}' is not an integer", s))),
        other => Err(Error::deserialize(
            shape,
            format!("cannot convert {} to a number", other.kind_name()),
        )),
    }
}

macro_rules! integer_shape {
    ($($ty:ty),*) => {
        $(
            impl Shape for $ty {
                const KIND: Kind = Kind::Value;

                fn shape_name() -> String {
                    stringify!($ty).to_string()
                }

                fn zero() -> Self {
                    0
                }

                fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
                    let wide = integer(value, stringify!($ty))?;
                    <$ty>::try_from(wide).map_err(|_| {
                        Error::deserialize(stringify!($ty), format!("{} is out of range", wide))
                    })
                }

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

integer_shape!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Shape for isize {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "isize".to_string()
    }

    fn zero() -> Self {
        0
    }

    fn from_value(value: &Value, ctx: &Context) -> Result<Self> {
        let wide = i64::from_value(value, ctx)?;
        isize::try_from(wide).map_err(|_| Error::deserialize("isize", format!("{} is out of range", wide)))
    }

    fn to_value(&self) -> Value {
        Value::Int64(*self as i64)
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl Shape for usize {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "usize".to_string()
    }

    fn zero() -> Self {
        0
    }

    fn from_value(value: &Value, ctx: &Context) -> Result<Self> {
        let wide = u64::from_value(value, ctx)?;
        usize::try_from(wide).map_err(|_| Error::deserialize("usize", format!("{} is out of range", wide)))
    }

    fn to_value(&self) -> Value {
        Value::from(*self as u64)
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }
}

fn float(value: &Value, shape: &str) -> Result<f64> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::deserialize(shape, format!("'{}' is not a number", s))),
        other => other.as_f64().ok_or_else(|| {
            Error::deserialize(shape, format!("cannot convert {} to a number", other.kind_name()))
        }),
    }
}

impl Shape for f64 {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "f64".to_string()
    }

    fn zero() -> Self {
        0.0
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        float(value, "f64")
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl Shape for f32 {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "f32".to_string()
    }

    fn zero() -> Self {
        0.0
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        float(value, "f32").map(|f| f as f32)
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl Shape for BigDecimal {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "decimal".to_string()
    }

    fn zero() -> Self {
        BigDecimal::from(0)
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(BigDecimal::from(i32::from(*b))),
            Value::String(s) => BigDecimal::from_str(s.trim())
                .map_err(|_| Error::deserialize("decimal", format!("'{}' is not a number", s))),
            Value::Double(f) => double_to_decimal(*f)
                .ok_or_else(|| Error::deserialize("decimal", format!("{} is not a finite number", f))),
            other => other.as_decimal().ok_or_else(|| {
                Error::deserialize("decimal", format!("cannot convert {} to a number", other.kind_name()))
            }),
        }
    }

    fn to_value(&self) -> Value {
        Value::Decimal(self.clone())
    }

    fn is_zero(&self) -> bool {
        bigdecimal::Zero::is_zero(self)
    }
}

impl Shape for bool {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "bool".to_string()
    }

    fn zero() -> Self {
        false
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(Error::deserialize("bool", format!("'{}' is not a boolean", s)))
                }
            }
            other => match other.as_f64() {
                Some(f) => Ok(f != 0.0),
                None => Err(Error::deserialize(
                    "bool",
                    format!("cannot convert {} to a boolean", other.kind_name()),
                )),
            },
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

impl Shape for char {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "char".to_string()
    }

    fn zero() -> Self {
        '\0'
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        match value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(Error::deserialize("char", format!("'{}' is not a single character", s))),
                }
            }
            other => {
                let code = integer(other, "char")?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| Error::deserialize("char", format!("{} is not a character code", code)))
            }
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn is_zero(&self) -> bool {
        *self == '\0'
    }
}

impl Shape for String {
    const KIND: Kind = Kind::Reference;

    fn shape_name() -> String {
        "String".to_string()
    }

    fn zero() -> Self {
        String::new()
    }

    fn from_value(value: &Value, ctx: &Context) -> Result<Self> {
        Ok(match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Double(f) => f.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Date(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            Value::ObjectId(oid) => oid.to_hex(),
            other => crate::text::to_string_with(other, ctx),
        })
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Integers are Unix milliseconds; text is RFC 3339.
impl Shape for DateTime<Utc> {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "DateTime<Utc>".to_string()
    }

    fn zero() -> Self {
        DateTime::<Utc>::default()
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        match value {
            Value::Date(dt) => Ok(*dt),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::deserialize("DateTime<Utc>", format!("'{}': {}", s, e))),
            other => {
                let millis = other.as_i64().ok_or_else(|| {
                    Error::deserialize(
                        "DateTime<Utc>",
                        format!("cannot convert {} to a date", other.kind_name()),
                    )
                })?;
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| Error::deserialize("DateTime<Utc>", format!("{} is out of range", millis)))
            }
        }
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }
}

impl Shape for ObjectId {
    const KIND: Kind = Kind::Value;

    fn shape_name() -> String {
        "ObjectId".to_string()
    }

    fn zero() -> Self {
        ObjectId::default()
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        match value {
            Value::ObjectId(oid) => Ok(*oid),
            Value::String(s) => ObjectId::parse_hex(s.trim()),
            other => Err(Error::deserialize(
                "ObjectId",
                format!("cannot convert {} to an object id", other.kind_name()),
            )),
        }
    }

    fn to_value(&self) -> Value {
        Value::ObjectId(*self)
    }

    fn is_zero(&self) -> bool {
        *self == ObjectId::default()
    }
}

/// Documents are handed out by handle; text is parsed.
impl Shape for Document {
    const KIND: Kind = Kind::Reference;

    fn shape_name() -> String {
        "Document".to_string()
    }

    fn zero() -> Self {
        Document::new()
    }

    fn from_value(value: &Value, ctx: &Context) -> Result<Self> {
        match value {
            Value::Object(doc) => Ok(doc.clone()),
            Value::String(s) => crate::text::parse_document(s, ctx),
            Value::Record(handle) => Ok(handle.to_document(ctx.format(), ctx)),
            other => Err(Error::deserialize(
                "Document",
                format!("cannot convert {} to a document", other.kind_name()),
            )),
        }
    }

    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// The dynamic target: any value passes through unchanged.
impl Shape for Value {
    const KIND: Kind = Kind::Reference;

    fn shape_name() -> String {
        "Value".to_string()
    }

    fn zero() -> Self {
        Value::Null
    }

    fn from_value(value: &Value, _ctx: &Context) -> Result<Self> {
        Ok(value.clone())
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn is_none(&self) -> bool {
        self.is_null()
    }
}

/// A record of unknown type cannot be instantiated.
impl Shape for RecordHandle {
    const KIND: Kind = Kind::Reference;

    fn shape_name() -> String {
        "RecordHandle".to_string()
    }

    fn zero() -> Self {
        RecordHandle::opaque()
    }

    fn from_value(_value: &Value, _ctx: &Context) -> Result<Self> {
        Err(abstract_target::<Self>())
    }

    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }

    fn is_zero(&self) -> bool {
        false
    }

    fn is_abstract() -> bool {
        true
    }
}

pub(crate) fn abstract_target<T: Shape>() -> Error {
    Error::deserialize(
        T::shape_name(),
        "abstract targets have no concrete layout; request a concrete record type",
    )
}

impl<T: Record> Shape for T {
    const KIND: Kind = Kind::Reference;

    fn shape_name() -> String {
        T::name().to_string()
    }

    fn zero() -> Self {
        T::default()
    }

    fn from_value(value: &Value, ctx: &Context) -> Result<Self> {
        let mapping = crate::registry::mapping::<T>(ctx);
        match value {
            Value::Object(doc) => mapping.read(doc, ctx.format(), ctx),
            Value::String(s) => {
                let doc = crate::text::parse_document(s, ctx)?;
                mapping.read(&doc, ctx.format(), ctx)
            }
            Value::Record(handle) => match handle.downcast_ref::<T>() {
                Some(record) => Ok(record.clone()),
                None => mapping.read(&handle.to_document(ctx.format(), ctx), ctx.format(), ctx),
            },
            other => Err(Error::deserialize(
                T::name(),
                format!("cannot convert {} to a record", other.kind_name()),
            )),
        }
    }

    fn to_value(&self) -> Value {
        Value::record(self.clone())
    }

    fn is_zero(&self) -> bool {
        false
    }

    fn validate_shape(&self, _ctx: &Context) -> Result<()> {
        let mut errors = Vec::new();
        Record::validate(self, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::model_validation(T::name(), errors))
        }
    }
}

impl<T: Shape> Shape for Option<T> {
    const KIND: Kind = T::KIND;

    fn shape_name() -> String {
        format!("Option<{}>", T::shape_name())
    }

    fn zero() -> Self {
        None
    }

    fn from_value(value: &Value, ctx: &Context) -> Result<Self> {
        ctx.translate::<T>(value).map(Some)
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Shape::to_value)
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn nullable() -> bool {
        true
    }

    fn is_none(&self) -> bool {
        Option::is_none(self)
    }

    fn is_abstract() -> bool {
        T::is_abstract()
    }

    fn validate_shape(&self, ctx: &Context) -> Result<()> {
        match self {
            Some(inner) => inner.validate_shape(ctx),
            None => Ok(()),
        }
    }
}

fn elements<T: Shape>(value: &Value, ctx: &Context, shape: &str) -> Result<Vec<T>> {
    match value {
        Value::Array(items) => items.iter().map(|item| ctx.translate::<T>(item)).collect(),
        other => Err(Error::deserialize(
            shape,
            format!("cannot convert {} to a sequence", other.kind_name()),
        )),
    }
}

macro_rules! sequence_shape {
    ($name:literal, $ty:ident $(, $bound:path)*) => {
        impl<T: Shape $(+ $bound)*> Shape for $ty<T> {
            const KIND: Kind = Kind::Reference;

            fn shape_name() -> String {
                format!("{}<{}>", $name, T::shape_name())
            }

            fn zero() -> Self {
                $ty::new()
            }

            fn from_value(value: &Value, ctx: &Context) -> Result<Self> {
                Ok(elements::<T>(value, ctx, &Self::shape_name())?.into_iter().collect())
            }

            fn to_value(&self) -> Value {
                Value::Array(self.iter().map(Shape::to_value).collect())
            }

            fn is_zero(&self) -> bool {
                self.is_empty()
            }

            fn is_abstract() -> bool {
                T::is_abstract()
            }

            fn validate_shape(&self, ctx: &Context) -> Result<()> {
                self.iter().try_for_each(|item| item.validate_shape(ctx))
            }
        }
    };
}

sequence_shape!("Vec", Vec);
sequence_shape!("VecDeque", VecDeque);
sequence_shape!("HashSet", HashSet, Eq, Hash);
sequence_shape!("BTreeSet", BTreeSet, Ord);

/// A last-in, first-out sequence.
///
/// Built from an array so that popping yields the elements in array order,
/// and written back in that same order.
///
/// # Examples
///
/// ```rust
/// use flexjson::{doc, Stack};
///
/// let d = doc!({ "steps": ["a", "b", "c"] });
/// let mut steps: Stack<String> = d.require("steps").unwrap();
/// assert_eq!(steps.pop().as_deref(), Some("a"));
/// assert_eq!(steps.pop().as_deref(), Some("b"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    #[must_use]
    pub fn new() -> Self {
        Stack { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in pop order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().rev()
    }
}

/// The first element becomes the top of the stack.
impl<T> FromIterator<T> for Stack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut items: Vec<T> = iter.into_iter().collect();
        items.reverse();
        Stack { items }
    }
}

sequence_shape!("Stack", Stack);

#[doc(hidden)]
pub fn enum_from_value<E: Copy>(
    name: &str,
    variants: &[(E, &'static str, i64)],
    value: &Value,
) -> Result<E> {
    let raw = match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Some((variant, _, _)) = variants
                .iter()
                .find(|(_, label, _)| label.eq_ignore_ascii_case(trimmed))
            {
                return Ok(*variant);
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| Error::deserialize(name, format!("'{}' is not a declared value", s)))?
        }
        other => {
            let wide = integer(other, name)?;
            i64::try_from(wide)
                .map_err(|_| Error::deserialize(name, format!("{} is not a declared value", wide)))?
        }
    };
    variants
        .iter()
        .find(|(_, _, discriminant)| *discriminant == raw)
        .map(|(variant, _, _)| *variant)
        .ok_or_else(|| Error::deserialize(name, format!("{} is not a declared value", raw)))
}

#[doc(hidden)]
pub fn enum_from_null<E: Copy>(name: &str, variants: &[(E, &'static str, i64)]) -> Result<E> {
    enum_from_value(name, variants, &Value::Int32(0))
}

#[doc(hidden)]
pub fn enum_floor<E: Copy>(variants: &[(E, &'static str, i64)]) -> Option<E> {
    variants
        .iter()
        .min_by_key(|(_, _, discriminant)| *discriminant)
        .map(|(variant, _, _)| *variant)
}
