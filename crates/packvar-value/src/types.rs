//! Type constraints written as type expressions.

use std::collections::BTreeMap;
use std::fmt;

use packvar_syntax::{
    Diagnostic, DiagnosticCategory, Diagnostics, ExprKind, Expression, ObjectKey, parse_expression,
};

/// A declared variable type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Any,
    String,
    Number,
    Bool,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Tuple(Vec<Type>),
    Object(BTreeMap<String, Type>),
}

impl Type {
    pub fn list(elem: Type) -> Self {
        Self::List(Box::new(elem))
    }

    pub fn set(elem: Type) -> Self {
        Self::Set(Box::new(elem))
    }

    pub fn map(elem: Type) -> Self {
        Self::Map(Box::new(elem))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::String | Self::Number | Self::Bool)
    }

    /// Human phrasing used in conversion messages, e.g. `list of string`.
    pub fn friendly_name(&self) -> String {
        match self {
            Self::Any => "any".to_string(),
            Self::String => "string".to_string(),
            Self::Number => "number".to_string(),
            Self::Bool => "bool".to_string(),
            Self::List(elem) => format!("list of {}", elem.friendly_name()),
            Self::Set(elem) => format!("set of {}", elem.friendly_name()),
            Self::Map(elem) => format!("map of {}", elem.friendly_name()),
            Self::Tuple(_) => "tuple".to_string(),
            Self::Object(_) => "object".to_string(),
        }
    }

    /// Parses type expression source such as `map(list(number))`.
    pub fn parse(src: &str, filename: &str) -> Result<Self, Diagnostics> {
        let (expr, mut diags) = parse_expression(src, filename);
        if diags.has_errors() {
            return Err(diags);
        }
        Self::from_expression(&expr).map_err(|diag| {
            diags.push(diag);
            diags
        })
    }

    /// Interprets an already parsed expression as a type.
    ///
    /// Bare `list`, `set`, and `map` keywords mean a collection of `any`.
    pub fn from_expression(expr: &Expression) -> Result<Self, Diagnostic> {
        match &expr.kind {
            ExprKind::Parens(inner) => Self::from_expression(inner),
            ExprKind::Traversal(traversal) if traversal.is_bare() => {
                match traversal.root.as_str() {
                    "any" => Ok(Self::Any),
                    "string" => Ok(Self::String),
                    "number" => Ok(Self::Number),
                    "bool" => Ok(Self::Bool),
                    "list" => Ok(Self::list(Self::Any)),
                    "set" => Ok(Self::set(Self::Any)),
                    "map" => Ok(Self::map(Self::Any)),
                    other => Err(invalid(
                        expr,
                        format!("The keyword {other:?} is not a valid type specification."),
                    )),
                }
            }
            ExprKind::FunctionCall { name, args } => Self::from_constructor(expr, name, args),
            _ => Err(invalid(
                expr,
                "A type specification is either a primitive type keyword (bool, number, string) \
                 or a complex type constructor call, like list(string).",
            )),
        }
    }

    fn from_constructor(expr: &Expression, name: &str, args: &[Expression]) -> Result<Self, Diagnostic> {
        if !matches!(name, "list" | "set" | "map" | "tuple" | "object") {
            return Err(invalid(
                expr,
                format!("Keyword {name:?} is not a valid type constructor."),
            ));
        }
        let [arg] = args else {
            return Err(invalid(
                expr,
                format!("The {name} type constructor requires one argument specifying the element type."),
            ));
        };

        match name {
            "list" => Ok(Self::list(Self::from_expression(arg)?)),
            "set" => Ok(Self::set(Self::from_expression(arg)?)),
            "map" => Ok(Self::map(Self::from_expression(arg)?)),
            "tuple" => match &arg.kind {
                ExprKind::Tuple(items) => items
                    .iter()
                    .map(Self::from_expression)
                    .collect::<Result<_, _>>()
                    .map(Self::Tuple),
                _ => Err(invalid(
                    arg,
                    "The tuple type constructor requires a list of element types.",
                )),
            },
            _ => match &arg.kind {
                ExprKind::Object(items) => {
                    let mut attrs = BTreeMap::new();
                    for item in items {
                        let attr_name = match &item.key {
                            ObjectKey::Traversal(t) if t.is_bare() => t.root.clone(),
                            ObjectKey::Expression(Expression {
                                kind: ExprKind::String(s),
                                ..
                            }) => s.clone(),
                            key => {
                                return Err(Diagnostic::error(
                                    DiagnosticCategory::UnsupportedConstruct,
                                    "Invalid type specification",
                                    "Object type attribute names must be identifiers or strings.",
                                )
                                .with_subject(key.range().clone()));
                            }
                        };
                        attrs.insert(attr_name, Self::from_expression(&item.value)?);
                    }
                    Ok(Self::Object(attrs))
                }
                _ => Err(invalid(
                    arg,
                    "The object type constructor requires an object of attribute types.",
                )),
            },
        }
    }
}

fn invalid(expr: &Expression, detail: impl Into<String>) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::UnsupportedConstruct,
        "Invalid type specification",
        detail,
    )
    .with_subject(expr.range.clone())
}

/// Renders the type back as a type expression.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("bool"),
            Self::List(elem) => write!(f, "list({elem})"),
            Self::Set(elem) => write!(f, "set({elem})"),
            Self::Map(elem) => write!(f, "map({elem})"),
            Self::Tuple(elems) => {
                let parts: Vec<String> = elems.iter().map(ToString::to_string).collect();
                write!(f, "tuple([{}])", parts.join(", "))
            }
            Self::Object(attrs) => {
                let parts: Vec<String> = attrs.iter().map(|(k, t)| format!("{k} = {t}")).collect();
                write!(f, "object({{{}}})", parts.join(", "))
            }
        }
    }
}
