//! Conversion of values to declared types.

use std::collections::BTreeMap;

use crate::error::{Error, PathStep, Result};
use crate::number::Number;
use crate::types::Type;
use crate::value::Value;

/// Converts `value` so that it conforms to `ty`.
///
/// Null and unknown values conform to every type. Primitives convert through
/// their string form where the text is unambiguous. Sequence kinds convert
/// between each other, as do maps and objects; an object target requires
/// every declared attribute and drops the rest.
pub fn convert(value: &Value, ty: &Type) -> Result<Value> {
    match (value, ty) {
        (Value::Null | Value::Unknown, _) | (_, Type::Any) => Ok(value.clone()),
        (Value::Capsule(_), _) => Err(Error::conversion(format!(
            "{} required",
            ty.friendly_name()
        ))),
        (_, Type::String) => to_string(value),
        (_, Type::Number) => to_number(value),
        (_, Type::Bool) => to_bool(value),
        (_, Type::List(elem)) => convert_elements(value, elem, ty).map(Value::List),
        (_, Type::Set(elem)) => {
            let mut unique: Vec<Value> = Vec::new();
            for item in convert_elements(value, elem, ty)? {
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            Ok(Value::Set(unique))
        }
        (_, Type::Map(elem)) => {
            let Some(attrs) = value.attributes() else {
                return Err(required(ty));
            };
            attrs
                .iter()
                .map(|(key, item)| {
                    convert(item, elem)
                        .map(|v| (key.clone(), v))
                        .map_err(|e| e.at(PathStep::Key(key.clone())))
                })
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Value::Map)
        }
        (_, Type::Tuple(types)) => {
            let Some(items) = value.elements() else {
                return Err(required(ty));
            };
            if items.len() != types.len() {
                return Err(Error::conversion(format!(
                    "tuple with {} elements required",
                    types.len()
                )));
            }
            items
                .iter()
                .zip(types)
                .enumerate()
                .map(|(i, (item, ty))| convert(item, ty).map_err(|e| e.at(PathStep::Index(i))))
                .collect::<Result<Vec<_>>>()
                .map(Value::Tuple)
        }
        (_, Type::Object(attr_types)) => {
            let Some(attrs) = value.attributes() else {
                return Err(required(ty));
            };
            let mut out = BTreeMap::new();
            for (name, attr_ty) in attr_types {
                let Some(item) = attrs.get(name) else {
                    return Err(Error::conversion(format!("attribute {name:?} is required")));
                };
                let converted =
                    convert(item, attr_ty).map_err(|e| e.at(PathStep::Attribute(name.clone())))?;
                out.insert(name.clone(), converted);
            }
            Ok(Value::Object(out))
        }
    }
}

fn required(ty: &Type) -> Error {
    Error::conversion(format!("{} required", ty.friendly_name()))
}

fn convert_elements(value: &Value, elem: &Type, ty: &Type) -> Result<Vec<Value>> {
    let Some(items) = value.elements() else {
        return Err(required(ty));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| convert(item, elem).map_err(|e| e.at(PathStep::Index(i))))
        .collect()
}

fn to_string(value: &Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        _ => Err(Error::conversion("string required")),
    }
}

fn to_number(value: &Value) -> Result<Value> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => Number::parse(s)
            .map(Value::Number)
            .ok_or_else(|| Error::conversion("a number is required")),
        _ => Err(Error::conversion("number required")),
    }
}

fn to_bool(value: &Value) -> Result<Value> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if s == "true" => Ok(Value::Bool(true)),
        Value::String(s) if s == "false" => Ok(Value::Bool(false)),
        Value::String(_) => Err(Error::conversion("a bool is required")),
        _ => Err(Error::conversion("bool required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn num(text: &str) -> Value {
        Value::Number(Number::parse(text).unwrap())
    }

    #[rstest]
    #[case(Value::from(true), Type::String, Value::string("true"))]
    #[case(num("1.5"), Type::String, Value::string("1.5"))]
    #[case(Value::string("42"), Type::Number, num("42"))]
    #[case(Value::string("false"), Type::Bool, Value::Bool(false))]
    #[case(Value::Null, Type::Number, Value::Null)]
    #[case(Value::string("x"), Type::Any, Value::string("x"))]
    fn primitive_conversions(#[case] input: Value, #[case] ty: Type, #[case] expected: Value) {
        assert_eq!(convert(&input, &ty).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::string("abc"), Type::Number, "a number is required")]
    #[case(Value::string("yes"), Type::Bool, "a bool is required")]
    #[case(Value::Tuple(vec![]), Type::String, "string required")]
    #[case(Value::Object(BTreeMap::new()), Type::list(Type::String), "list of string required")]
    #[case(Value::string("a"), Type::map(Type::String), "map of string required")]
    fn conversion_failures(#[case] input: Value, #[case] ty: Type, #[case] message: &str) {
        assert_eq!(convert(&input, &ty).unwrap_err().to_string(), message);
    }

    #[test]
    fn tuple_to_list_converts_elements() {
        let input = Value::Tuple(vec![Value::from(1), Value::string("two")]);
        assert_eq!(
            convert(&input, &Type::list(Type::String)).unwrap(),
            Value::List(vec![Value::string("1"), Value::string("two")])
        );
    }

    #[test]
    fn nested_failure_reports_path() {
        let input = Value::object([("ports", Value::Tuple(vec![num("80"), Value::string("http")]))]);
        let ty = Type::Object(BTreeMap::from([(
            "ports".to_string(),
            Type::list(Type::Number),
        )]));
        assert_eq!(
            convert(&input, &ty).unwrap_err().to_string(),
            "attribute \"ports\", element 1: a number is required"
        );
    }

    #[test]
    fn object_conversion_requires_and_drops_attributes() {
        let ty = Type::Object(BTreeMap::from([("name".to_string(), Type::String)]));
        let extra = Value::object([("name", Value::string("a")), ("other", Value::Null)]);
        assert_eq!(
            convert(&extra, &ty).unwrap(),
            Value::object([("name", Value::string("a"))])
        );

        let missing = Value::object([("other", Value::Null)]);
        assert_eq!(
            convert(&missing, &ty).unwrap_err().to_string(),
            "attribute \"name\" is required"
        );
    }

    #[test]
    fn set_conversion_removes_duplicates() {
        let input = Value::Tuple(vec![Value::string("a"), Value::string("b"), Value::string("a")]);
        assert_eq!(
            convert(&input, &Type::set(Type::String)).unwrap(),
            Value::Set(vec![Value::string("a"), Value::string("b")])
        );
    }

    #[test]
    fn tuple_length_must_match() {
        let input = Value::Tuple(vec![Value::from(1)]);
        let ty = Type::Tuple(vec![Type::Number, Type::String]);
        assert_eq!(
            convert(&input, &ty).unwrap_err().to_string(),
            "tuple with 2 elements required"
        );
    }

    #[test]
    fn object_to_map() {
        let input = Value::object([("a", Value::from(1))]);
        assert_eq!(
            convert(&input, &Type::map(Type::String)).unwrap(),
            Value::Map(BTreeMap::from([("a".to_string(), Value::string("1"))]))
        );
    }
}
