//! Structured diagnostics.
//!
//! Every user-correctable input problem is reported as a [`Diagnostic`]
//! rather than a Rust error, so a single run can surface every problem at
//! once. [`Diagnostics`] is the accumulating list passed between phases.

use crate::pos::SourceRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Closed set of diagnostic categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCategory {
    /// Malformed configuration-language or serialization syntax.
    Syntax,
    /// A variable or pack name that is not a valid identifier.
    InvalidIdentifier,
    /// A declared default that does not convert to the declared type.
    InvalidDeclaredDefault,
    /// An override targeting a variable with no root declaration.
    MissingRootDeclaration,
    /// The same variable defined twice by distinct sources.
    DuplicateDefinition,
    /// An override value that does not convert to the variable's type.
    InvalidValueForType,
    /// An override source whose format cannot be determined.
    UnsupportedSourceFormat,
    /// An override source that could not be read.
    FileNotFound,
    /// A resolved value that cannot be turned into a native value.
    ConversionFailure,
    /// A malformed override entry, such as an unaddressable key.
    InvalidOverride,
    /// A syntactically valid construct that is not allowed in this context.
    UnsupportedConstruct,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "syntax",
            Self::InvalidIdentifier => "invalid-identifier",
            Self::InvalidDeclaredDefault => "invalid-declared-default",
            Self::MissingRootDeclaration => "missing-root-declaration",
            Self::DuplicateDefinition => "duplicate-definition",
            Self::InvalidValueForType => "invalid-value-for-type",
            Self::UnsupportedSourceFormat => "unsupported-source-format",
            Self::FileNotFound => "file-not-found",
            Self::ConversionFailure => "conversion-failure",
            Self::InvalidOverride => "invalid-override",
            Self::UnsupportedConstruct => "unsupported-construct",
        };
        f.write_str(name)
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: DiagnosticCategory,
    /// Short, capitalised summary without trailing punctuation.
    pub summary: String,
    /// Full sentence(s) describing the problem.
    pub detail: String,
    /// The range the problem is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SourceRange>,
    /// A broader range giving context, such as the enclosing declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<SourceRange>,
}

impl Diagnostic {
    pub fn error(
        category: DiagnosticCategory,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            category,
            summary: summary.into(),
            detail: detail.into(),
            subject: None,
            context: None,
        }
    }

    pub fn warning(
        category: DiagnosticCategory,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(category, summary, detail)
        }
    }

    pub fn with_subject(mut self, subject: SourceRange) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_context(mut self, context: SourceRange) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Rewrites the subject and context ranges in place.
    pub fn map_ranges(mut self, mut f: impl FnMut(SourceRange) -> SourceRange) -> Self {
        self.subject = self.subject.map(&mut f);
        self.context = self.context.map(&mut f);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        match &self.subject {
            Some(subject) => write!(f, "{level}: {}: {}; {}", subject, self.summary, self.detail),
            None => write!(f, "{level}: {}; {}", self.summary, self.detail),
        }
    }
}

/// An ordered list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Whether any error diagnostic has the given category.
    pub fn has_category(&self, category: DiagnosticCategory) -> bool {
        self.errors().any(|d| d.category == category)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.0.first()
    }

    /// Applies `f` to every subject and context range.
    pub fn map_ranges(self, mut f: impl FnMut(SourceRange) -> SourceRange) -> Self {
        Self(self.0.into_iter().map(|d| d.map_ranges(&mut f)).collect())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diag}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
