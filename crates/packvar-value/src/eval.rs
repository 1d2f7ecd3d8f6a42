//! Literal evaluation of parsed expressions.

use std::collections::BTreeMap;

use packvar_syntax::{
    Diagnostic, DiagnosticCategory, Diagnostics, ExprKind, Expression, ObjectKey, SourceRange,
};

use crate::number::Number;
use crate::value::Value;

/// Evaluates an expression that may only contain literals.
///
/// Variable references and function calls are rejected with a diagnostic and
/// evaluate to null, so a caller can still report every problem at once.
pub fn evaluate(expr: &Expression) -> (Value, Diagnostics) {
    let mut diags = Diagnostics::new();
    let value = eval(expr, &mut diags);
    (value, diags)
}

fn eval(expr: &Expression, diags: &mut Diagnostics) -> Value {
    match &expr.kind {
        ExprKind::Null => Value::Null,
        ExprKind::Bool(b) => Value::Bool(*b),
        ExprKind::Number(text) => match Number::parse(text) {
            Some(n) => Value::Number(n),
            None => {
                diags.push(unsupported(
                    expr,
                    "Invalid number literal",
                    format!("{text:?} is not a valid number."),
                ));
                Value::Null
            }
        },
        ExprKind::String(s) => Value::String(s.clone()),
        ExprKind::Parens(inner) => eval(inner, diags),
        ExprKind::Tuple(items) => Value::Tuple(items.iter().map(|e| eval(e, diags)).collect()),
        ExprKind::Object(items) => {
            let mut attrs = BTreeMap::new();
            let mut seen: BTreeMap<String, SourceRange> = BTreeMap::new();
            for item in items {
                let value = eval(&item.value, diags);
                let Some(key) = object_key(&item.key, diags) else {
                    continue;
                };
                if let Some(first) = seen.get(&key) {
                    diags.push(
                        Diagnostic::error(
                            DiagnosticCategory::DuplicateDefinition,
                            "Duplicate object attribute",
                            format!("An attribute named {key:?} was already defined at {first}."),
                        )
                        .with_subject(item.key.range().clone()),
                    );
                    continue;
                }
                seen.insert(key.clone(), item.key.range().clone());
                attrs.insert(key, value);
            }
            Value::Object(attrs)
        }
        ExprKind::Negate(inner) => match eval(inner, diags) {
            Value::Number(n) => Value::Number(n.negate()),
            Value::Null => Value::Null,
            _ => {
                diags.push(unsupported(
                    expr,
                    "Invalid operand",
                    "Unsuitable value for unary operand: a number is required.",
                ));
                Value::Null
            }
        },
        ExprKind::Traversal(_) => {
            diags.push(unsupported(
                expr,
                "Variables not allowed",
                "Variables may not be used here.",
            ));
            Value::Null
        }
        ExprKind::FunctionCall { .. } => {
            diags.push(unsupported(
                expr,
                "Function calls not allowed",
                "Functions may not be called here.",
            ));
            Value::Null
        }
    }
}

fn object_key(key: &ObjectKey, diags: &mut Diagnostics) -> Option<String> {
    match key {
        ObjectKey::Traversal(t) if t.is_bare() => Some(t.root.clone()),
        ObjectKey::Traversal(t) => {
            diags.push(
                Diagnostic::error(
                    DiagnosticCategory::UnsupportedConstruct,
                    "Invalid object key",
                    "Dotted keys are only allowed as top-level override addresses; \
                     quote the key to use it literally.",
                )
                .with_subject(t.range.clone()),
            );
            None
        }
        ObjectKey::Expression(expr) => match eval(expr, diags) {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => {
                diags.push(unsupported(
                    expr,
                    "Invalid object key",
                    "Object keys must be strings.",
                ));
                None
            }
        },
    }
}

fn unsupported(expr: &Expression, summary: &str, detail: impl Into<String>) -> Diagnostic {
    Diagnostic::error(DiagnosticCategory::UnsupportedConstruct, summary, detail)
        .with_subject(expr.range.clone())
}
