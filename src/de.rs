//! Conversion of a [`Value`] into any `Deserialize` type.
//!
//! The inverse of [`to_value`](crate::to_value): documents feed struct and
//! map visitors, arrays feed sequences, and enums are read from a variant
//! name or a single-entry `{"Variant": value}` document. Dates and object
//! ids are presented as text; exact decimals as the narrowest fitting number.
//!
//! ```rust
//! use flexjson::{doc, from_value, Value};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! let point: Point = from_value(Value::from(doc!({ "x": 1, "y": 2 }))).unwrap();
//! assert_eq!(point, Point { x: 1, y: 2 });
//! ```

use crate::{Context, Error, Result, Value, WireFormat};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::SecondsFormat;
use serde::de::{self, DeserializeOwned, Error as _, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// Deserializes a `T` from `value`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value))
}

/// A deserializer that reads from an owned [`Value`].
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

fn visit_decimal<'de, V: de::Visitor<'de>>(d: BigDecimal, visitor: V) -> Result<V::Value> {
    if crate::value::integer_digits(&d) <= 20 && d.is_integer() {
        if let Some(i) = d.to_i64() {
            return visitor.visit_i64(i);
        }
        if let Some(u) = d.to_u64() {
            return visitor.visit_u64(u);
        }
    }
    match d.to_string().parse::<f64>().ok().or_else(|| d.to_f64()) {
        Some(f) => visitor.visit_f64(f),
        None => Err(Error::custom(format!("{d} does not fit a number"))),
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int32(i) => visitor.visit_i32(i),
            Value::Int64(i) => visitor.visit_i64(i),
            Value::Double(f) => visitor.visit_f64(f),
            Value::Decimal(d) => visit_decimal(d, visitor),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Object(doc) => visitor.visit_map(MapDeserializer::new(doc.entries())),
            Value::Date(dt) => visitor.visit_string(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            Value::Record(handle) => {
                let doc = handle.to_document(WireFormat::Text, Context::global());
                visitor.visit_map(MapDeserializer::new(doc.entries()))
            }
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(variant) => visitor.visit_enum(EnumDeserializer::new(variant, None)),
            Value::Object(doc) => {
                let mut entries = doc.entries().into_iter();
                match (entries.next(), entries.next()) {
                    (Some((variant, value)), None) => {
                        visitor.visit_enum(EnumDeserializer::new(variant, Some(value)))
                    }
                    _ => Err(Error::custom(
                        "expected a document with a single variant key",
                    )),
                }
            }
            other => Err(Error::custom(format!(
                "expected a variant name or document, found {}",
                other.kind_name()
            ))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> ValueDeserializer {
        ValueDeserializer::new(self)
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: std::vec::IntoIter<(String, Value)>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(entries: Vec<(String, Value)>) -> Self {
        MapDeserializer {
            iter: entries.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl EnumDeserializer {
    fn new(variant: String, value: Option<Value>) -> Self {
        EnumDeserializer { variant, value }
    }
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(self.variant.into_deserializer())?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(Value::Null) | None => Ok(()),
            _ => Err(Error::custom("expected unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("expected newtype variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Array(items)) => visitor.visit_seq(SeqDeserializer::new(items)),
            _ => Err(Error::custom("expected tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Object(doc)) => visitor.visit_map(MapDeserializer::new(doc.entries())),
            _ => Err(Error::custom("expected struct variant")),
        }
    }
}
