//! Package and variable identifiers.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// Whether `name` is a letter or underscore followed by letters, digits,
/// underscores, or dashes.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

pub fn validate_identifier(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier {
            name: name.to_string(),
            reason: "must start with a letter or underscore and contain only letters, digits, \
                     underscores, and dashes"
                .to_string(),
        })
    }
}

/// Dotted path locating a pack in a dependency tree, e.g. `web.redis`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_segments<S: AsRef<str>>(segments: impl IntoIterator<Item = S>) -> Self {
        let parts: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        Self(parts.join("."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    pub fn join(&self, child: &str) -> Self {
        if self.0.is_empty() {
            Self(child.to_string())
        } else {
            Self(format!("{}.{child}", self.0))
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Name of a variable within one package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(String);

impl VariableId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariableId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("foo", true)]
    #[case("_private", true)]
    #[case("with-dash_and_1", true)]
    #[case("1st", false)]
    #[case("-lead", false)]
    #[case("has space", false)]
    #[case("dotted.name", false)]
    #[case("", false)]
    fn identifier_grammar(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_identifier(name), valid);
        assert_eq!(validate_identifier(name).is_ok(), valid);
    }

    #[test]
    fn package_id_segments() {
        let id = PackageId::from_segments(["web", "redis"]);
        assert_eq!(id.as_str(), "web.redis");
        assert_eq!(id.segments().collect::<Vec<_>>(), vec!["web", "redis"]);
        assert_eq!(id.join("cache").to_string(), "web.redis.cache");
        assert_eq!(PackageId::default().join("root").to_string(), "root");
    }
}
