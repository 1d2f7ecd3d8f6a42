//! Decoding of override sources into [`Override`] records.
//!
//! Override files are decoded by suffix. Configuration-language files are
//! wrapped in a synthetic container so dotted keys parse as object keys,
//! and every reported position is mapped back onto the original bytes.
//! JSON, YAML, and TOML files are decoded through serde.

use std::fs;
use std::path::Path;

use packvar_syntax::wrap::WRAPPER_ATTRIBUTE;
use packvar_syntax::{
    Diagnostic, DiagnosticCategory, Diagnostics, ExprKind, ObjectKey, Pos, SourceRange, Structure,
    TraversalStep, WrappedSource, parse_container, parse_expression,
};
use packvar_value::{Number, Type, Value, evaluate};

use crate::ids::{PackageId, is_valid_identifier};
use crate::overrides::{Override, OverrideSet, OverrideSource};
use crate::parser::VariableMap;
use crate::scheme::AddressingScheme;

/// Override file format, chosen by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.hcl` or `.vars`
    Native,
    Json,
    Yaml,
    Toml,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension.to_lowercase().as_str() {
            "hcl" | "vars" => Some(Self::Native),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Native => "HCL",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
        }
    }
}

/// The result of decoding one override file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFile {
    pub filename: String,
    /// The file content exactly as read.
    pub content: String,
    /// Empty whenever `diagnostics` has errors.
    pub overrides: OverrideSet,
    pub diagnostics: Diagnostics,
}

/// Decodes override sources relative to a root package.
#[derive(Clone, Copy)]
pub struct Decoder<'a> {
    root: &'a PackageId,
    scheme: &'a dyn AddressingScheme,
}

impl<'a> Decoder<'a> {
    pub fn new(root: &'a PackageId, scheme: &'a dyn AddressingScheme) -> Self {
        Self { root, scheme }
    }

    /// Reads and decodes an override file.
    ///
    /// An unreadable file or an unrecognised suffix is returned as `Err`;
    /// problems inside the file are reported in [`DecodedFile::diagnostics`].
    pub fn decode_file(&self, path: &Path) -> Result<DecodedFile, Diagnostic> {
        let filename = path.display().to_string();
        let Some(format) = SourceFormat::from_path(path) else {
            return Err(Diagnostic::error(
                DiagnosticCategory::UnsupportedSourceFormat,
                "Unsupported override file format",
                format!(
                    "The file {filename} has an unrecognised suffix. Override files must end in \
                     .hcl, .vars, .json, .yaml, .yml, or .toml."
                ),
            )
            .with_subject(SourceRange::point(filename, Pos::START)));
        };

        tracing::debug!(?path, format = format.name(), "Decoding override file");
        let content = fs::read_to_string(path).map_err(|err| {
            Diagnostic::error(
                DiagnosticCategory::FileNotFound,
                "Failed to read override file",
                format!("The file {filename} could not be read: {err}."),
            )
            .with_subject(SourceRange::point(filename.clone(), Pos::START))
        })?;

        Ok(self.decode_source(&filename, &content, format))
    }

    /// Decodes override file content that has already been read.
    pub fn decode_source(&self, filename: &str, content: &str, format: SourceFormat) -> DecodedFile {
        let mut file = DecodedFile {
            filename: filename.to_string(),
            content: content.to_string(),
            overrides: OverrideSet::new(),
            diagnostics: Diagnostics::new(),
        };

        match format {
            SourceFormat::Native => self.decode_native(&mut file),
            SourceFormat::Json => {
                let parsed = parse_json(filename, content);
                self.decode_data(&mut file, format, parsed);
            }
            SourceFormat::Yaml => {
                let parsed = parse_yaml(filename, content);
                self.decode_data(&mut file, format, parsed);
            }
            SourceFormat::Toml => {
                let parsed = parse_toml(filename, content);
                self.decode_data(&mut file, format, parsed);
            }
        }

        if file.diagnostics.has_errors() {
            file.overrides = OverrideSet::new();
        }
        tracing::debug!(
            file = %file.filename,
            overrides = file.overrides.len(),
            errors = file.diagnostics.errors().count(),
            "Decoded override file"
        );
        file
    }

    fn decode_native(&self, file: &mut DecodedFile) {
        let wrapped = WrappedSource::wrap(&file.content);
        let (body, diags) = parse_container(wrapped.wrapped(), &file.filename);
        let diags = wrapped.unwrap_diagnostics(diags);
        let failed = diags.has_errors();
        file.diagnostics.extend(diags);
        if failed {
            return;
        }

        let items = match body.items.as_slice() {
            [Structure::Attribute(attr)] if attr.name == WRAPPER_ATTRIBUTE => match &attr.expr.kind {
                ExprKind::Object(items) => items,
                _ => return,
            },
            _ => return,
        };

        for item in items {
            let key_range = wrapped.unwrap_range(item.key.range().clone());
            let range = wrapped.unwrap_range(item.key.range().to(&item.value.range));

            let segments = match key_segments(&item.key) {
                Ok(segments) => segments,
                Err(detail) => {
                    file.diagnostics.push(invalid_key(detail, key_range));
                    continue;
                }
            };

            let (value, value_diags) = evaluate(&item.value);
            let value_diags = wrapped.unwrap_diagnostics(value_diags);
            let failed = value_diags.has_errors();
            file.diagnostics.extend(value_diags);
            if failed {
                continue;
            }

            self.record(file, &segments, value, range, key_range);
        }
    }

    fn decode_data(
        &self,
        file: &mut DecodedFile,
        format: SourceFormat,
        parsed: Result<serde_json::Value, Diagnostic>,
    ) {
        let whole = SourceRange::whole(file.filename.as_str(), &file.content);
        let attrs = match parsed {
            Ok(serde_json::Value::Object(attrs)) => attrs,
            // An empty YAML document
            Ok(serde_json::Value::Null) => return,
            Ok(_) => {
                file.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCategory::Syntax,
                        "Invalid override file",
                        format!(
                            "The top level of a {} override file must be an object of variable values.",
                            format.name()
                        ),
                    )
                    .with_subject(whole),
                );
                return;
            }
            Err(diag) => {
                file.diagnostics.push(diag);
                return;
            }
        };

        for (key, json) in attrs {
            let segments: Vec<String> = key.split('.').map(str::to_string).collect();
            if !segments.iter().all(|s| is_valid_identifier(s)) {
                file.diagnostics
                    .push(invalid_key(invalid_key_detail(&key), whole.clone()));
                continue;
            }
            self.record(file, &segments, Value::from(json), whole.clone(), whole.clone());
        }
    }

    fn record(
        &self,
        file: &mut DecodedFile,
        segments: &[String],
        value: Value,
        range: SourceRange,
        key_range: SourceRange,
    ) {
        let (package, variable) = match self.scheme.resolve_key(self.root, segments) {
            Ok(target) => target,
            Err(detail) => {
                file.diagnostics.push(invalid_key(detail, key_range));
                return;
            }
        };
        tracing::trace!(%package, %variable, file = %file.filename, "Decoded override");
        let ovr = Override::new(
            package,
            variable,
            value,
            range,
            OverrideSource::File(file.filename.clone()),
        );
        if let Err(diag) = file.overrides.insert(ovr) {
            file.diagnostics.push(diag);
        }
    }

    /// Decodes one `key=value` pair from the environment or a CLI flag.
    ///
    /// When the targeted variable is declared as a string or number, or has
    /// no usable type, `raw` is taken literally. Otherwise it is parsed as
    /// an expression so lists and maps can be supplied inline. The type the
    /// raw text was read as is recorded on the override.
    pub fn decode_inline(
        &self,
        source: OverrideSource,
        key: &str,
        raw: &str,
        declarations: &VariableMap,
    ) -> Result<Override, Diagnostics> {
        let filename = inline_filename(&source);
        let key_range = SourceRange::whole(filename.as_str(), key);
        let segments: Vec<String> = key.split('.').map(str::to_string).collect();
        if !segments.iter().all(|s| is_valid_identifier(s)) {
            return Err(invalid_key(invalid_key_detail(key), key_range).into());
        }
        let (package, variable) = self
            .scheme
            .resolve_key(self.root, &segments)
            .map_err(|detail| Diagnostics::from(invalid_key(detail, key_range)))?;

        let declared = declarations
            .get(&package)
            .and_then(|vars| vars.get(&variable))
            .and_then(|var| var.ty.as_ref());
        let value = match declared {
            None | Some(Type::Any) | Some(Type::String) => Value::string(raw),
            Some(Type::Number) => Number::parse(raw.trim())
                .map(Value::Number)
                .unwrap_or_else(|| Value::string(raw)),
            Some(_) => {
                let (expr, mut diags) = parse_expression(raw, &filename);
                if diags.has_errors() {
                    return Err(diags);
                }
                let (value, value_diags) = evaluate(&expr);
                diags.extend(value_diags);
                if diags.has_errors() {
                    return Err(diags);
                }
                value
            }
        };

        tracing::trace!(%package, %variable, %source, "Decoded inline override");
        let range = SourceRange::whole(filename, raw);
        let ovr = Override::new(package, variable, value, range, source);
        Ok(match declared {
            Some(ty) => ovr.with_type(ty.clone()),
            None => ovr,
        })
    }
}

/// Name used in diagnostics for an inline value.
fn inline_filename(source: &OverrideSource) -> String {
    match source {
        OverrideSource::File(name) => name.clone(),
        OverrideSource::Env(key) => format!("<env:{key}>"),
        OverrideSource::Cli(key) => format!("<var:{key}>"),
    }
}

fn key_segments(key: &ObjectKey) -> Result<Vec<String>, String> {
    match key {
        ObjectKey::Traversal(traversal) => {
            let mut segments = vec![traversal.root.clone()];
            for step in &traversal.steps {
                match step {
                    TraversalStep::Attr { name, .. } => segments.push(name.clone()),
                    TraversalStep::Index { .. } => {
                        return Err("Override keys may not contain index steps.".to_string());
                    }
                }
            }
            Ok(segments)
        }
        ObjectKey::Expression(expr) => match &expr.kind {
            ExprKind::String(text) => {
                let segments: Vec<String> = text.split('.').map(str::to_string).collect();
                if segments.iter().all(|s| is_valid_identifier(s)) {
                    Ok(segments)
                } else {
                    Err(invalid_key_detail(text))
                }
            }
            _ => Err("Override keys must be variable names or quoted strings.".to_string()),
        },
    }
}

fn invalid_key_detail(key: &str) -> String {
    format!(
        "{key:?} is not a valid override key. Keys are variable names, optionally prefixed by a \
         dotted package path such as \"redis.port\"."
    )
}

fn invalid_key(detail: String, subject: SourceRange) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::InvalidOverride,
        "Invalid override key",
        detail,
    )
    .with_subject(subject)
}

fn parse_error(filename: &str, format: SourceFormat, message: String, subject: SourceRange) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::Syntax,
        format!("Invalid {} syntax", format.name()),
        format!("The file {filename} could not be parsed: {message}."),
    )
    .with_subject(subject)
}

fn parse_json(filename: &str, content: &str) -> Result<serde_json::Value, Diagnostic> {
    serde_json::from_str(content).map_err(|err| {
        let pos = Pos::from_line_column(content, err.line(), err.column());
        parse_error(
            filename,
            SourceFormat::Json,
            err.to_string(),
            SourceRange::point(filename, pos),
        )
    })
}

fn parse_yaml(filename: &str, content: &str) -> Result<serde_json::Value, Diagnostic> {
    serde_yaml::from_str(content).map_err(|err| {
        let subject = match err.location() {
            Some(location) => SourceRange::point(filename, Pos::from_offset(content, location.index())),
            None => SourceRange::whole(filename, content),
        };
        parse_error(filename, SourceFormat::Yaml, err.to_string(), subject)
    })
}

fn parse_toml(filename: &str, content: &str) -> Result<serde_json::Value, Diagnostic> {
    let table: toml::Table = toml::from_str(content).map_err(|err| {
        let subject = match err.span() {
            Some(span) => SourceRange::new(
                filename,
                Pos::from_offset(content, span.start),
                Pos::from_offset(content, span.end),
            ),
            None => SourceRange::whole(filename, content),
        };
        parse_error(filename, SourceFormat::Toml, err.message().to_string(), subject)
    })?;
    serde_json::to_value(table).map_err(|err| {
        parse_error(
            filename,
            SourceFormat::Toml,
            err.to_string(),
            SourceRange::whole(filename, content),
        )
    })
}
