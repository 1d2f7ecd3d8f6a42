//! Package addressing schemes.
//!
//! The hierarchical scheme identifies a pack by the dotted path of names
//! from the root (`web.cache`). The legacy flat scheme identifies a pack by
//! its own alias-or-name, so override keys have at most two segments
//! (`cache.port`). Both share every other phase of resolution.

use serde::{Deserialize, Serialize};

use crate::ids::{PackageId, VariableId};

/// Selects an [`AddressingScheme`] by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    #[default]
    Hierarchical,
    Flat,
}

impl SchemeKind {
    pub fn scheme(self) -> &'static dyn AddressingScheme {
        match self {
            Self::Hierarchical => &Hierarchical,
            Self::Flat => &Flat,
        }
    }
}

/// How package IDs are computed and how override keys address variables.
pub trait AddressingScheme: Send + Sync {
    /// Package ID of the pack reached by `path`, which starts with the
    /// root pack's name and continues with each alias-or-name.
    fn package_id(&self, path: &[&str]) -> PackageId;

    /// Splits the segments of an override key into the targeted package
    /// and variable. A single segment addresses the root package.
    ///
    /// On failure returns the detail text for a diagnostic.
    fn resolve_key(
        &self,
        root: &PackageId,
        segments: &[String],
    ) -> Result<(PackageId, VariableId), String>;

    /// Override key addressing `variable` in `package`.
    fn address(&self, package: &PackageId, variable: &VariableId) -> String {
        format!("{package}.{variable}")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Hierarchical;

impl AddressingScheme for Hierarchical {
    fn package_id(&self, path: &[&str]) -> PackageId {
        PackageId::from_segments(path)
    }

    fn resolve_key(
        &self,
        root: &PackageId,
        segments: &[String],
    ) -> Result<(PackageId, VariableId), String> {
        match segments {
            [] => Err("An override key must name a variable.".to_string()),
            [variable] => Ok((root.clone(), VariableId::new(variable.as_str()))),
            [package @ .., variable] => Ok((
                PackageId::from_segments(package),
                VariableId::new(variable.as_str()),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Flat;

impl AddressingScheme for Flat {
    fn package_id(&self, path: &[&str]) -> PackageId {
        PackageId::new(path.last().copied().unwrap_or_default())
    }

    fn resolve_key(
        &self,
        root: &PackageId,
        segments: &[String],
    ) -> Result<(PackageId, VariableId), String> {
        match segments {
            [variable] => Ok((root.clone(), VariableId::new(variable.as_str()))),
            [package, variable] => Ok((
                PackageId::new(package.as_str()),
                VariableId::new(variable.as_str()),
            )),
            _ => Err(
                "An override key is either a variable name or a pack name followed by a \
                 variable name, such as \"redis.port\"."
                    .to_string(),
            ),
        }
    }
}
