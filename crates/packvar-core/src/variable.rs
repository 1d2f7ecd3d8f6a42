//! Declared variables and override application.

use packvar_syntax::{Diagnostic, DiagnosticCategory, SourceRange};
use packvar_value::{Type, Value, convert};

use crate::ids::VariableId;
use crate::overrides::Override;

/// A declared variable and its current value.
///
/// When `ty` is set, `value` always conforms to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: VariableId,
    pub ty: Option<Type>,
    pub default: Option<Value>,
    pub value: Value,
    pub description: Option<String>,
    pub decl_range: SourceRange,
}

impl Variable {
    /// A variable without a type or default; its value is null.
    pub fn new(name: VariableId, decl_range: SourceRange) -> Self {
        Self {
            name,
            ty: None,
            default: None,
            value: Value::Null,
            description: None,
            decl_range,
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Applies an override, taking its type if it names one, and
    /// re-validates the value against the resulting type.
    ///
    /// On failure the variable is left unchanged. The diagnostic summary
    /// says whether the type, the value, or both were at fault.
    pub fn apply_override(&mut self, ovr: &Override) -> Result<(), Diagnostic> {
        let type_changed = ovr.ty.is_some() && ovr.ty != self.ty;
        let ty = ovr.ty.clone().or_else(|| self.ty.clone());

        let converted = match &ty {
            Some(ty) => convert(&ovr.value, ty),
            None => Ok(ovr.value.clone()),
        };

        match converted {
            Ok(value) => {
                self.ty = ty;
                self.default = Some(value.clone());
                self.value = value;
                Ok(())
            }
            Err(err) => {
                let value_changed = ovr.value != self.value;
                let summary = match (type_changed, value_changed) {
                    (true, true) => "Invalid type and value for variable",
                    (true, false) => "Invalid type for variable",
                    (false, _) => "Invalid value for variable",
                };
                let ty_name = ty.as_ref().map(Type::friendly_name).unwrap_or_default();
                Err(Diagnostic::error(
                    DiagnosticCategory::InvalidValueForType,
                    summary,
                    format!(
                        "The value for {:?} from {} is not compatible with the variable's type \
                         constraint ({ty_name}): {err}.",
                        self.name.as_str(),
                        ovr.source,
                    ),
                )
                .with_subject(ovr.range.clone())
                .with_context(self.decl_range.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PackageId;
    use crate::overrides::OverrideSource;
    use packvar_syntax::Pos;
    use packvar_value::Number;
    use rstest::rstest;

    fn declared(ty: Option<Type>, value: Value) -> Variable {
        Variable {
            ty,
            default: Some(value.clone()),
            value,
            ..Variable::new(VariableId::new("port"), SourceRange::point("vars.hcl", Pos::START))
        }
    }

    fn ovr(value: Value, ty: Option<Type>) -> Override {
        Override {
            ty,
            ..Override::new(
                PackageId::new("web"),
                VariableId::new("port"),
                value,
                SourceRange::point("override.hcl", Pos::START),
                OverrideSource::File("override.hcl".into()),
            )
        }
    }

    #[test]
    fn override_converts_to_declared_type() {
        let mut var = declared(Some(Type::Number), Value::from(80));
        var.apply_override(&ovr(Value::string("8080"), None)).unwrap();
        assert_eq!(var.value, Value::Number(Number::from_i64(8080)));
        assert_eq!(var.default, Some(var.value.clone()));
    }

    #[test]
    fn override_type_replaces_declared_type() {
        let mut var = declared(None, Value::Null);
        var.apply_override(&ovr(Value::from(1), Some(Type::String))).unwrap();
        assert_eq!(var.ty, Some(Type::String));
        assert_eq!(var.value, Value::string("1"));
    }

    #[rstest]
    // Same value, new type it does not fit.
    #[case(Value::string("web"), Some(Type::Number), "Invalid type for variable")]
    // New value that does not fit the declared type.
    #[case(Value::string("http"), None, "Invalid value for variable")]
    // Both change.
    #[case(Value::Tuple(vec![]), Some(Type::Bool), "Invalid type and value for variable")]
    fn failure_messages(#[case] value: Value, #[case] ty: Option<Type>, #[case] summary: &str) {
        let mut var = declared(Some(Type::String), Value::string("web"));
        if ty.is_none() {
            var.ty = Some(Type::Number);
            var.value = Value::from(80);
        }
        let before = var.clone();
        let diag = var.apply_override(&ovr(value, ty)).unwrap_err();
        assert_eq!(diag.summary, summary);
        assert_eq!(diag.category, DiagnosticCategory::InvalidValueForType);
        assert_eq!(var, before);
    }
}
