//! Template context: the nested per-pack view handed to the renderer.

use std::collections::BTreeMap;

use packvar_syntax::{Diagnostic, DiagnosticCategory, Diagnostics, SourceRange, Pos};
use packvar_value::NativeValue;
use serde_json::json;

use crate::error::LookupError;
use crate::pack::{Pack, SELF_KEY};
use crate::parser::ParsedVariables;

/// Resolved variables and metadata for one pack and its dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct PackContext {
    name: String,
    vars: BTreeMap<String, NativeValue>,
    meta: NativeValue,
    dependencies: Vec<(String, PackContext)>,
}

/// Context for a whole pack tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext {
    root: PackContext,
}

impl ParsedVariables {
    /// Builds the template context for `pack` and its dependencies.
    ///
    /// Values that cannot be converted are reported and left out; packs
    /// without declared variables get an empty variable map.
    pub fn to_template_context(&self, pack: &Pack) -> (TemplateContext, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut path = vec![pack.name()];
        let root = self.build(pack, &mut path, &mut diags);
        tracing::debug!(pack = %pack.name(), errors = diags.len(), "Built template context");
        (TemplateContext { root }, diags)
    }

    fn build<'a>(&self, pack: &'a Pack, path: &mut Vec<&'a str>, diags: &mut Diagnostics) -> PackContext {
        let id = self.scheme().scheme().package_id(path);
        let vars = self.native_vars(&id, diags);
        let meta = pack.metadata.to_native().unwrap_or_else(|err| {
            diags.push(
                Diagnostic::error(
                    DiagnosticCategory::ConversionFailure,
                    "Failed to convert pack metadata",
                    format!("The metadata of pack {id} could not be converted: {err}."),
                )
                .with_subject(SourceRange::point(id.to_string(), Pos::START)),
            );
            NativeValue::Map(BTreeMap::new())
        });

        let mut dependencies = Vec::with_capacity(pack.dependencies().len());
        for child in pack.dependencies() {
            path.push(child.alias_or_name());
            let context = self.build(child, path, diags);
            path.pop();
            dependencies.push((child.alias_or_name().to_string(), context));
        }

        PackContext {
            name: pack.alias_or_name().to_string(),
            vars,
            meta,
            dependencies,
        }
    }
}

impl TemplateContext {
    pub fn root(&self) -> &PackContext {
        &self.root
    }

    /// The context of the pack at a dotted dependency path below the root.
    pub fn find(&self, path: &str) -> Option<&PackContext> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(&self.root, |ctx, name| ctx.dependency(name))
    }

    /// Serialized form consumed by the renderer.
    pub fn to_json(&self) -> serde_json::Value {
        self.root.to_json()
    }
}

impl PackContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All of this pack's variables.
    pub fn vars(&self) -> &BTreeMap<String, NativeValue> {
        &self.vars
    }

    pub fn meta_map(&self) -> &NativeValue {
        &self.meta
    }

    /// Looks up a variable by dotted path, failing if any segment is
    /// missing or cannot be traversed.
    pub fn must_var(&self, path: &str) -> Result<&NativeValue, LookupError> {
        lookup_in_map(&self.vars, path)
    }

    /// Like [`must_var`](Self::must_var), returning an empty string on failure.
    pub fn var(&self, path: &str) -> NativeValue {
        lenient(self.must_var(path))
    }

    pub fn must_meta(&self, path: &str) -> Result<&NativeValue, LookupError> {
        match &self.meta {
            NativeValue::Map(map) => lookup_in_map(map, path),
            _ => Err(LookupError::NotTraversable {
                path: String::new(),
                key: path.to_string(),
            }),
        }
    }

    pub fn meta(&self, path: &str) -> NativeValue {
        lenient(self.must_meta(path))
    }

    pub fn dependency(&self, name: &str) -> Option<&PackContext> {
        self.dependencies
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, ctx)| ctx)
    }

    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Dotted paths of every pack below this one, depth-first.
    pub fn dependency_paths(&self) -> Vec<String> {
        self.walk().into_iter().map(|(path, _)| path).collect()
    }

    /// Every pack below this one with its dotted path, depth-first.
    pub fn walk(&self) -> Vec<(String, &PackContext)> {
        let mut out = Vec::new();
        self.walk_into("", &mut out);
        out
    }

    fn walk_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a PackContext)>) {
        for (key, child) in &self.dependencies {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            out.push((path.clone(), child));
            child.walk_into(&path, out);
        }
    }

    /// `{"_self": {"vars": ..., "meta": ...}, "<dependency>": {...}}`
    pub fn to_json(&self) -> serde_json::Value {
        let vars: serde_json::Map<String, serde_json::Value> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        let mut out = serde_json::Map::new();
        out.insert(
            SELF_KEY.to_string(),
            json!({ "vars": vars, "meta": self.meta.to_json() }),
        );
        for (key, child) in &self.dependencies {
            out.insert(key.clone(), child.to_json());
        }
        serde_json::Value::Object(out)
    }
}

fn lenient(found: Result<&NativeValue, LookupError>) -> NativeValue {
    match found {
        Ok(value) => value.clone(),
        Err(err) => {
            tracing::trace!(%err, "Lenient lookup failed");
            NativeValue::String(String::new())
        }
    }
}

fn lookup_in_map<'a>(
    map: &'a BTreeMap<String, NativeValue>,
    path: &str,
) -> Result<&'a NativeValue, LookupError> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    let mut current = map.get(first).ok_or_else(|| LookupError::MissingKey {
        path: String::new(),
        key: first.to_string(),
    })?;
    let mut walked = first.to_string();

    for segment in segments {
        current = match current {
            NativeValue::Map(inner) => inner.get(segment),
            NativeValue::Seq(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => {
                return Err(LookupError::NotTraversable {
                    path: walked,
                    key: segment.to_string(),
                });
            }
        }
        .ok_or_else(|| LookupError::MissingKey {
            path: walked.clone(),
            key: segment.to_string(),
        })?;
        walked.push('.');
        walked.push_str(segment);
    }
    Ok(current)
}
