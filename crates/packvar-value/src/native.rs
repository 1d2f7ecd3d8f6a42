//! Conversion from [`Value`] to host-native data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{Error, PathStep, Result};
use crate::number::Number;
use crate::value::{Capsule, Value};

/// A value as templates see it.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<NativeValue>),
    Map(BTreeMap<String, NativeValue>),
    Handle(Capsule),
}

/// Converts a fully known value to its native form.
///
/// Integral numbers that fit an `i64` become `Int`; every other finite or
/// infinite number becomes `Float`. Unknown values cannot be converted.
pub fn to_native(value: &Value) -> Result<NativeValue> {
    match value {
        Value::Null => Ok(NativeValue::Absent),
        Value::Unknown => Err(Error::conversion("value is not yet known")),
        Value::Bool(b) => Ok(NativeValue::Bool(*b)),
        Value::Number(n) => Ok(number_to_native(n)),
        Value::String(s) => Ok(NativeValue::String(s.clone())),
        Value::List(items) | Value::Set(items) | Value::Tuple(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| to_native(item).map_err(|e| e.at(PathStep::Index(i))))
            .collect::<Result<Vec<_>>>()
            .map(NativeValue::Seq),
        Value::Map(attrs) | Value::Object(attrs) => attrs
            .iter()
            .map(|(key, item)| {
                to_native(item)
                    .map(|v| (key.clone(), v))
                    .map_err(|e| e.at(PathStep::Key(key.clone())))
            })
            .collect::<Result<BTreeMap<_, _>>>()
            .map(NativeValue::Map),
        Value::Capsule(capsule) => Ok(NativeValue::Handle(capsule.clone())),
    }
}

fn number_to_native(n: &Number) -> NativeValue {
    match n.to_i64() {
        Some(i) => NativeValue::Int(i),
        None => NativeValue::Float(n.to_f64()),
    }
}

impl NativeValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, NativeValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` when this is a map.
    pub fn get(&self, key: &str) -> Option<&NativeValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Non-finite floats serialize as JSON `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for NativeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Seq(items) => serializer.collect_seq(items),
            Self::Map(map) => serializer.collect_map(map),
            Self::Handle(capsule) => serializer.serialize_str(&format!("<{}>", capsule.type_name())),
        }
    }
}

/// Templates render absent values as the empty string.
impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Seq(_) | Self::Map(_) => write!(f, "{}", self.to_json()),
            Self::Handle(capsule) => write!(f, "<{}>", capsule.type_name()),
        }
    }
}

impl From<NativeValue> for Value {
    fn from(native: NativeValue) -> Self {
        match native {
            NativeValue::Absent => Value::Null,
            NativeValue::Bool(b) => Value::Bool(b),
            NativeValue::Int(i) => Value::Number(Number::from_i64(i)),
            NativeValue::Float(x) => Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null),
            NativeValue::String(s) => Value::String(s),
            NativeValue::Seq(items) => Value::Tuple(items.into_iter().map(Value::from).collect()),
            NativeValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            NativeValue::Handle(capsule) => Value::Capsule(capsule),
        }
    }
}
