//! Collection of `variable` blocks from a pack's root variables source.

use std::collections::BTreeMap;

use packvar_syntax::{
    Attribute, Block, Diagnostic, DiagnosticCategory, Diagnostics, ExprKind, Structure, parse_body,
};
use packvar_value::{Type, convert, evaluate};

use crate::ids::{PackageId, VariableId, is_valid_identifier};
use crate::pack::SourceFile;
use crate::variable::Variable;

const VARIABLE_BLOCK: &str = "variable";

/// Collects the variables declared in `source` for `package`.
///
/// A declaration with an invalid name, an invalid type, or a default that
/// does not conform to its type is reported and left out; collection
/// continues with the next declaration.
pub fn collect_declarations(
    package: &PackageId,
    source: &SourceFile,
) -> (BTreeMap<VariableId, Variable>, Diagnostics) {
    let (body, mut diags) = parse_body(&source.content, &source.name);
    let mut variables: BTreeMap<VariableId, Variable> = BTreeMap::new();

    for item in &body.items {
        let block = match item {
            Structure::Block(block) if block.kind == VARIABLE_BLOCK => block,
            Structure::Block(block) => {
                diags.push(unsupported_block(block));
                continue;
            }
            Structure::Attribute(attr) => {
                diags.push(unsupported_argument(attr));
                continue;
            }
        };

        let Some(variable) = collect_variable(block, &mut diags) else {
            continue;
        };
        if let Some(existing) = variables.get(&variable.name) {
            diags.push(
                Diagnostic::error(
                    DiagnosticCategory::DuplicateDefinition,
                    "Duplicate variable declaration",
                    format!(
                        "A variable named {:?} was already declared at {}. Variable names must \
                         be unique within a pack.",
                        variable.name.as_str(),
                        existing.decl_range,
                    ),
                )
                .with_subject(block.header_range()),
            );
            continue;
        }
        variables.insert(variable.name.clone(), variable);
    }

    tracing::debug!(
        package = %package,
        source = %source.name,
        count = variables.len(),
        "Collected variable declarations"
    );
    (variables, diags)
}

fn collect_variable(block: &Block, diags: &mut Diagnostics) -> Option<Variable> {
    let [label] = block.labels.as_slice() else {
        diags.push(
            Diagnostic::error(
                DiagnosticCategory::UnsupportedConstruct,
                "Invalid variable block",
                "A variable block requires exactly one label: the variable name.",
            )
            .with_subject(block.header_range()),
        );
        return None;
    };

    if !is_valid_identifier(&label.value) {
        diags.push(
            Diagnostic::error(
                DiagnosticCategory::InvalidIdentifier,
                "Invalid variable name",
                format!(
                    "{:?} is not a valid name. A name must start with a letter or underscore \
                     and may contain only letters, digits, underscores, and dashes.",
                    label.value
                ),
            )
            .with_subject(label.range.clone()),
        );
        return None;
    }

    let mut variable = Variable::new(VariableId::new(label.value.as_str()), block.range.clone());
    let mut valid = true;
    let mut default_attr: Option<&Attribute> = None;
    let mut seen: BTreeMap<&str, &Attribute> = BTreeMap::new();

    for item in &block.body.items {
        let attr = match item {
            Structure::Attribute(attr) => attr,
            Structure::Block(nested) => {
                diags.push(unsupported_block(nested));
                valid = false;
                continue;
            }
        };
        if let Some(first) = seen.insert(attr.name.as_str(), attr) {
            diags.push(
                Diagnostic::error(
                    DiagnosticCategory::DuplicateDefinition,
                    "Duplicate argument",
                    format!(
                        "The argument {:?} was already set at {}. Each argument may be set only once.",
                        attr.name, first.name_range
                    ),
                )
                .with_subject(attr.name_range.clone()),
            );
            valid = false;
            continue;
        }

        match attr.name.as_str() {
            "type" => match Type::from_expression(&attr.expr) {
                Ok(ty) => variable.ty = Some(ty),
                Err(diag) => {
                    diags.push(diag);
                    valid = false;
                }
            },
            "default" => {
                let (value, value_diags) = evaluate(&attr.expr);
                valid &= !value_diags.has_errors();
                diags.extend(value_diags);
                variable.default = Some(value);
                default_attr = Some(attr);
            }
            "description" => match &attr.expr.kind {
                ExprKind::String(text) => variable.description = Some(text.clone()),
                _ => {
                    diags.push(
                        Diagnostic::error(
                            DiagnosticCategory::UnsupportedConstruct,
                            "Invalid description",
                            "A variable description must be a string literal.",
                        )
                        .with_subject(attr.expr.range.clone()),
                    );
                    valid = false;
                }
            },
            _ => {
                diags.push(unsupported_argument(attr));
                valid = false;
            }
        }
    }

    if !valid {
        return None;
    }

    if let (Some(ty), Some(default), Some(attr)) = (&variable.ty, &variable.default, default_attr) {
        match convert(default, ty) {
            Ok(converted) => variable.default = Some(converted),
            Err(err) => {
                diags.push(
                    Diagnostic::error(
                        DiagnosticCategory::InvalidDeclaredDefault,
                        "Invalid default value for variable",
                        format!(
                            "This default value is not compatible with the variable's type \
                             constraint: {err}."
                        ),
                    )
                    .with_subject(attr.expr.range.clone())
                    .with_context(block.header_range()),
                );
                return None;
            }
        }
    }

    variable.value = variable.default.clone().unwrap_or(packvar_value::Value::Null);
    Some(variable)
}

fn unsupported_block(block: &Block) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::UnsupportedConstruct,
        "Unsupported block type",
        format!("Blocks of type {:?} are not expected here.", block.kind),
    )
    .with_subject(block.kind_range.clone())
}

fn unsupported_argument(attr: &Attribute) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::UnsupportedConstruct,
        "Unsupported argument",
        format!("An argument named {:?} is not expected here.", attr.name),
    )
    .with_subject(attr.name_range.clone())
}
