//! Override records and per-tier override sets.

use std::fmt;

use packvar_syntax::{Diagnostic, DiagnosticCategory, Diagnostics, SourceRange};
use packvar_value::{Type, Value};

use crate::ids::{PackageId, VariableId};

/// Override tiers in ascending precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Env,
    File,
    Cli,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Env => "environment",
            Self::File => "file",
            Self::Cli => "cli",
        })
    }
}

/// Where an override came from. Two overrides with equal sources come
/// from the same decode.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverrideSource {
    /// An override file, by name.
    File(String),
    /// An environment variable, by key after the prefix.
    Env(String),
    /// A CLI flag, by key.
    Cli(String),
}

impl OverrideSource {
    pub fn tier(&self) -> Tier {
        match self {
            Self::File(_) => Tier::File,
            Self::Env(_) => Tier::Env,
            Self::Cli(_) => Tier::Cli,
        }
    }
}

impl fmt::Display for OverrideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(name) => write!(f, "file {name}"),
            Self::Env(key) => write!(f, "environment variable {key}"),
            Self::Cli(key) => write!(f, "flag -var {key}"),
        }
    }
}

/// A value for one variable from one override source.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub package: PackageId,
    pub variable: VariableId,
    pub value: Value,
    /// Type the override was written against, if it names one.
    ///
    /// Inline overrides record the declared type their text was read as.
    /// Override files never name a type; callers building overrides by hand
    /// can set one with [`Override::with_type`] and supply them through
    /// [`ParserConfig::with_override`](crate::ParserConfig::with_override).
    pub ty: Option<Type>,
    pub range: SourceRange,
    pub source: OverrideSource,
}

impl Override {
    pub fn new(
        package: PackageId,
        variable: VariableId,
        value: Value,
        range: SourceRange,
        source: OverrideSource,
    ) -> Self {
        Self {
            package,
            variable,
            value,
            ty: None,
            range,
            source,
        }
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    fn targets(&self, other: &Override) -> bool {
        self.package == other.package && self.variable == other.variable
    }
}

/// Overrides decoded from the sources of one tier, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    entries: Vec<Override>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Override> {
        self.entries.iter()
    }

    pub fn get(&self, package: &PackageId, variable: &VariableId) -> Option<&Override> {
        self.entries
            .iter()
            .find(|o| &o.package == package && &o.variable == variable)
    }

    /// Adds an override; a second override for the same variable is a
    /// duplicate definition and the first is kept.
    pub fn insert(&mut self, ovr: Override) -> Result<(), Diagnostic> {
        match self.entries.iter().find(|existing| existing.targets(&ovr)) {
            Some(existing) => Err(duplicate(existing, &ovr)),
            None => {
                self.entries.push(ovr);
                Ok(())
            }
        }
    }

    /// Merges `other` into this set.
    ///
    /// Entries already present from the same source are skipped, so merging
    /// a set with itself changes nothing. Entries from a different source
    /// for an already-set variable produce one diagnostic each.
    pub fn merge(&mut self, other: &OverrideSet) -> Diagnostics {
        let mut diags = Diagnostics::new();
        for ovr in &other.entries {
            let same_source = self
                .entries
                .iter()
                .any(|existing| existing.targets(ovr) && existing.source == ovr.source);
            if same_source {
                continue;
            }
            if let Err(diag) = self.insert(ovr.clone()) {
                diags.push(diag);
            }
        }
        diags
    }
}

impl<'a> IntoIterator for &'a OverrideSet {
    type Item = &'a Override;
    type IntoIter = std::slice::Iter<'a, Override>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn duplicate(first: &Override, second: &Override) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::DuplicateDefinition,
        "Duplicate variable override",
        format!(
            "The variable {:?} of package {} is set by {} at {} and again by {} at {}.",
            first.variable.as_str(),
            first.package,
            first.source,
            first.range,
            second.source,
            second.range,
        ),
    )
    .with_subject(second.range.clone())
    .with_context(first.range.clone())
}
