//! Lenient deserialization from loaded payloads.
//!
//! Route and query parameters always arrive as strings, so a model with an
//! `age: u32` field could never be filled from `/{age}/profile` by a strict
//! deserializer. [`from_value`] drives any `Deserialize` type from a
//! [`Value`] and converts on demand:
//!
//! | Target | Accepted |
//! |---|---|
//! | integers | numbers, strings holding an integer |
//! | floats | numbers, strings holding a number |
//! | `bool` | booleans, `true/false/1/0/yes/no/on/off` strings, `0`/`1` |
//! | `String` | strings, numbers |
//! | sequences | arrays, or a single scalar as a one-item sequence |
//!
//! Errors carry the location of the failing value so they can be reported
//! per field.
//!
//! ```
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Profile {
//!     age: u32,
//!     tags: Vec<String>,
//! }
//!
//! let payload = json!({"age": "30", "tags": "admin"});
//! let profile: Profile = sift_core::coerce::from_value(&payload).unwrap();
//! assert_eq!(profile.age, 30);
//! assert_eq!(profile.tags, vec!["admin".to_string()]);
//! ```

use crate::report::FieldError;
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    Unexpected, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Number, Value};
use std::fmt;
use thiserror::Error;

/// Deserializes `T` from `value`, coercing scalars where needed.
pub fn from_value<'a, T>(value: &'a Value) -> Result<T, CoerceError>
where
    T: de::Deserialize<'a>,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// A located deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{msg}", location_prefix(.loc))]
pub struct CoerceError {
    loc: Vec<String>,
    msg: String,
    kind: String,
}

impl CoerceError {
    fn new(msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc: Vec::new(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    fn within(mut self, segment: impl Into<String>) -> Self {
        self.loc.insert(0, segment.into());
        self
    }

    /// Location of the failing value, outermost first.
    pub fn loc(&self) -> &[String] {
        &self.loc
    }

    /// Human-readable message.
    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// Machine-readable failure kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

fn location_prefix(loc: &[String]) -> String {
    if loc.is_empty() {
        String::new()
    } else {
        format!("{}: ", loc.join("."))
    }
}

impl de::Error for CoerceError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::new(msg.to_string(), "value_error")
    }

    fn invalid_type(unexp: Unexpected<'_>, exp: &dyn de::Expected) -> Self {
        Self::new(format!("invalid type: {unexp}, expected {exp}"), "type_error")
    }

    fn missing_field(field: &'static str) -> Self {
        Self::new("field required", "missing").within(field)
    }

    fn unknown_field(field: &str, _expected: &'static [&'static str]) -> Self {
        Self::new("extra fields not permitted", "extra_forbidden").within(field)
    }
}

impl From<CoerceError> for FieldError {
    fn from(err: CoerceError) -> Self {
        let loc = if err.loc.is_empty() {
            vec!["__root__".to_string()]
        } else {
            err.loc
        };
        Self::new(loc, err.msg, err.kind)
    }
}

/// A [`Deserializer`] over a borrowed [`Value`] that coerces scalars.
#[derive(Debug, Clone, Copy)]
pub struct ValueDeserializer<'a> {
    value: &'a Value,
}

impl<'a> ValueDeserializer<'a> {
    /// Wraps `value`.
    pub const fn new(value: &'a Value) -> Self {
        Self { value }
    }

    fn integer(&self) -> Result<Integer, CoerceError> {
        let invalid = || CoerceError::new("value is not a valid integer", "type_error.integer");
        match self.value {
            Value::Number(n) => Integer::from_number(n).ok_or_else(invalid),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Integer::Signed)
                    .or_else(|_| s.parse::<u64>().map(Integer::Unsigned))
                    .map_err(|_| invalid())
            }
            Value::Bool(b) => Ok(Integer::Unsigned(u64::from(*b))),
            _ => Err(invalid()),
        }
    }

    fn float(&self) -> Result<f64, CoerceError> {
        let invalid = || CoerceError::new("value is not a valid float", "type_error.float");
        match self.value {
            Value::Number(n) => n.as_f64().ok_or_else(invalid),
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

enum Integer {
    Signed(i64),
    Unsigned(u64),
}

impl Integer {
    fn from_number(n: &Number) -> Option<Self> {
        if let Some(u) = n.as_u64() {
            Some(Self::Unsigned(u))
        } else {
            n.as_i64().map(Self::Signed)
        }
    }

    fn visit<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CoerceError> {
        match self {
            Self::Signed(i) => visitor.visit_i64(i),
            Self::Unsigned(u) => visitor.visit_u64(u),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

macro_rules! deserialize_integer {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                self.integer()?.visit(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ValueDeserializer<'de> {
    type Error = CoerceError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => match Integer::from_number(n) {
                Some(integer) => integer.visit(visitor),
                None => match n.as_f64() {
                    Some(f) => visitor.visit_f64(f),
                    None => Err(de::Error::custom("number out of range")),
                },
            },
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(map)),
        }
    }

    deserialize_integer! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_f64(self.float()?)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let coerced = match self.value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => parse_bool(s),
            Value::Number(n) => match n.as_u64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        };
        match coerced {
            Some(b) => visitor.visit_bool(b),
            None => Err(CoerceError::new(
                "value could not be parsed to a boolean",
                "type_error.bool",
            )),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Number(n) => visitor.visit_string(n.to_string()),
            _ => Err(CoerceError::new("str type expected", "type_error.str")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_bytes(s.as_bytes()),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Object(_) => Err(CoerceError::new(
                "value is not a valid list",
                "type_error.list",
            )),
            scalar => visitor.visit_seq(SeqDeserializer::new(std::slice::from_ref(scalar))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(map)),
            _ => Err(CoerceError::new(
                "value is not a valid dict",
                "type_error.dict",
            )),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            Value::Object(map) if map.len() == 1 => match map.iter().next() {
                Some((variant, value)) => visitor.visit_enum(EnumDeserializer { variant, value }),
                None => Err(de::Error::custom("empty enum object")),
            },
            _ => Err(CoerceError::new(
                "value is not a valid enumeration member",
                "type_error.enum",
            )),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        unit unit_struct identifier
    }
}

struct SeqDeserializer<'a> {
    iter: std::iter::Enumerate<std::slice::Iter<'a, Value>>,
    len: usize,
}

impl<'a> SeqDeserializer<'a> {
    fn new(items: &'a [Value]) -> Self {
        Self {
            iter: items.iter().enumerate(),
            len: items.len(),
        }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'de> {
    type Error = CoerceError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some((index, value)) => seed
                .deserialize(ValueDeserializer::new(value))
                .map(Some)
                .map_err(|e| e.within(index.to_string())),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len)
    }
}

struct MapDeserializer<'a> {
    iter: serde_json::map::Iter<'a>,
    pending: Option<(&'a str, &'a Value)>,
    len: usize,
}

impl<'a> MapDeserializer<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            iter: map.iter(),
            pending: None,
            len: map.len(),
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer<'de> {
    type Error = CoerceError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some((key.as_str(), value));
                seed.deserialize(BorrowedStrDeserializer::new(key.as_str()))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        match self.pending.take() {
            Some((key, value)) => seed
                .deserialize(ValueDeserializer::new(value))
                .map_err(|e| e.within(key)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len)
    }
}

struct EnumDeserializer<'a> {
    variant: &'a str,
    value: &'a Value,
}

impl<'de> EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = CoerceError;
    type Variant = ValueDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        let variant = seed.deserialize(BorrowedStrDeserializer::new(self.variant))?;
        Ok((variant, ValueDeserializer::new(self.value)))
    }
}

impl<'de> VariantAccess<'de> for ValueDeserializer<'de> {
    type Error = CoerceError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.value {
            Value::Null => Ok(()),
            _ => Err(de::Error::invalid_type(Unexpected::Map, &"unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }
}
