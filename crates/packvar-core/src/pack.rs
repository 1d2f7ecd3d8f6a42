//! The pack dependency tree.
//!
//! A [`Pack`] owns its dependencies by value, so every dependency instance
//! has exactly one parent. The same underlying pack may appear more than
//! once in a tree under different aliases; each occurrence is a separate
//! node with its own package ID.

use std::fs;
use std::path::Path;

use packvar_value::{NativeValue, Value, to_native};
use serde::{Deserialize, Serialize};

use crate::ids::validate_identifier;
use crate::{Error, Result};

/// Key reserved for a pack's own entry in the template context.
pub const SELF_KEY: &str = "_self";

/// Source text with the name used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), content))
    }
}

/// Descriptive pack metadata, exposed to templates under `meta`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackMetadata {
    pub app: AppMetadata,
    pub pack: PackInfo,
    pub integration: IntegrationMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackInfo {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationMetadata {
    pub identifier: String,
    pub flags: Vec<String>,
    pub name: String,
}

impl PackMetadata {
    /// Parses metadata written as TOML sections `[app]`, `[pack]`, `[integration]`.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Metadata as a nested string-keyed map.
    pub fn to_native(&self) -> Result<NativeValue> {
        let json = serde_json::to_value(self)?;
        Ok(to_native(&Value::from(json))?)
    }
}

/// A node in the pack dependency tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    name: String,
    alias: Option<String>,
    pub metadata: PackMetadata,
    root_variables: Option<SourceFile>,
    dependencies: Vec<Pack>,
}

/// A pack visited by [`Pack::walk`] together with its path from the root.
#[derive(Debug, Clone, Copy)]
pub struct PackNode<'a> {
    pub path: &'a [&'a str],
    pub pack: &'a Pack,
}

impl Pack {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            name,
            alias: None,
            metadata: PackMetadata::default(),
            root_variables: None,
            dependencies: Vec::new(),
        })
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Result<Self> {
        let alias = alias.into();
        validate_identifier(&alias)?;
        self.alias = Some(alias);
        Ok(self)
    }

    pub fn with_metadata(mut self, metadata: PackMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_root_variables(mut self, source: SourceFile) -> Self {
        self.root_variables = Some(source);
        self
    }

    pub fn with_dependency(mut self, child: Pack) -> Result<Self> {
        self.add_dependency(child)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The key this pack is known by under its parent.
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn root_variables(&self) -> Option<&SourceFile> {
        self.root_variables.as_ref()
    }

    pub fn dependencies(&self) -> &[Pack] {
        &self.dependencies
    }

    pub fn dependency(&self, key: &str) -> Option<&Pack> {
        self.dependencies.iter().find(|d| d.alias_or_name() == key)
    }

    /// Adds `child` as a direct dependency.
    ///
    /// Sibling dependencies must have distinct alias-or-name keys, and the
    /// key `_self` is reserved for the pack's own context entry.
    pub fn add_dependency(&mut self, child: Pack) -> Result<()> {
        let key = child.alias_or_name();
        if key == SELF_KEY {
            return Err(Error::InvalidIdentifier {
                name: key.to_string(),
                reason: format!("{SELF_KEY:?} is reserved"),
            });
        }
        if self.dependency(key).is_some() {
            return Err(Error::DuplicateDependency {
                parent: self.name.clone(),
                name: key.to_string(),
            });
        }
        tracing::trace!(parent = %self.name, dependency = %key, "Adding pack dependency");
        self.dependencies.push(child);
        Ok(())
    }

    /// Visits every pack depth-first, parents before children.
    ///
    /// The root's path is its name; each dependency appends its
    /// alias-or-name.
    pub fn walk<F: FnMut(PackNode<'_>)>(&self, mut visit: F) {
        let mut path = vec![self.name.as_str()];
        self.walk_inner(&mut path, &mut visit);
    }

    fn walk_inner<'a, F: FnMut(PackNode<'_>)>(&'a self, path: &mut Vec<&'a str>, visit: &mut F) {
        visit(PackNode { path, pack: self });
        for child in &self.dependencies {
            path.push(child.alias_or_name());
            child.walk_inner(path, visit);
            path.pop();
        }
    }
}
