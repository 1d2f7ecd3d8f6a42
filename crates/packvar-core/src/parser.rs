//! The precedence merger.
//!
//! A [`Parser`] collects declarations, decodes every override source, and
//! applies the overrides on top of the declared defaults in fixed order:
//!
//! 1. declared default
//! 2. environment
//! 3. override files, in the order given
//! 4. CLI flags
//!
//! Declaration and decoding errors abort the run before any override is
//! applied. Errors found while applying overrides are collected so every
//! problem is reported in one pass.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use packvar_syntax::{Diagnostic, DiagnosticCategory, Diagnostics};
use packvar_value::{NativeValue, Value, to_native};

use crate::declaration::collect_declarations;
use crate::decoder::Decoder;
use crate::ids::{PackageId, VariableId};
use crate::overrides::{Override, OverrideSet, OverrideSource, Tier};
use crate::pack::{Pack, SourceFile};
use crate::scheme::SchemeKind;
use crate::variable::Variable;
use crate::{Error, Result};

/// Declared variables of every package.
pub type VariableMap = BTreeMap<PackageId, BTreeMap<VariableId, Variable>>;

/// Inputs to a [`Parser`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserConfig {
    /// Package addressed by bare override keys.
    pub root: PackageId,
    pub scheme: SchemeKind,
    /// Root variables source of each package.
    pub declarations: BTreeMap<PackageId, SourceFile>,
    /// Environment overrides, keyed without the prefix.
    pub env_overrides: BTreeMap<String, String>,
    /// Override files, lowest precedence first.
    pub override_files: Vec<PathBuf>,
    pub cli_overrides: BTreeMap<String, String>,
    /// Overrides built by the caller, added to the tier of their source.
    /// Setting a variable that tier's decoded sources already set is a
    /// duplicate definition. Supplied file overrides rank above every
    /// override file.
    pub overrides: Vec<Override>,
    /// Drop file and CLI overrides for undeclared variables instead of
    /// reporting them.
    pub ignore_missing: bool,
}

impl ParserConfig {
    pub fn new(root: impl Into<PackageId>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Derives the root package and declaration sources from a pack tree.
    ///
    /// Fails when two packs in the tree map to the same package ID under
    /// `scheme`, which can only happen with the flat scheme.
    pub fn for_pack(pack: &Pack, scheme: SchemeKind) -> Result<Self> {
        let addressing = scheme.scheme();
        let mut config = Self::new(PackageId::new(pack.name())).with_scheme(scheme);
        let mut seen = BTreeSet::new();
        let mut ambiguous = None;

        pack.walk(|node| {
            let id = addressing.package_id(node.path);
            if !seen.insert(id.clone()) {
                ambiguous.get_or_insert_with(|| id.clone());
            }
            if let Some(source) = node.pack.root_variables() {
                config.declarations.insert(id, source.clone());
            }
        });

        match ambiguous {
            Some(id) => Err(Error::AmbiguousPackage { id: id.to_string() }),
            None => Ok(config),
        }
    }

    pub fn with_scheme(mut self, scheme: SchemeKind) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_declarations(mut self, package: impl Into<PackageId>, source: SourceFile) -> Self {
        self.declarations.insert(package.into(), source);
        self
    }

    pub fn with_env_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    pub fn with_env_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.env_overrides.extend(overrides);
        self
    }

    pub fn with_override_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_files.push(path.into());
        self
    }

    pub fn with_cli_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cli_overrides.insert(key.into(), value.into());
        self
    }

    /// Adds an already-built override, which may carry its own type.
    pub fn with_override(mut self, ovr: Override) -> Self {
        self.overrides.push(ovr);
        self
    }

    pub fn with_ignore_missing(mut self, ignore_missing: bool) -> Self {
        self.ignore_missing = ignore_missing;
        self
    }
}

/// Resolves variables for one configuration.
///
/// A parser owns its declaration and override maps and is consumed by
/// [`Parser::parse`]; use one parser per resolution.
#[derive(Debug)]
pub struct Parser {
    config: ParserConfig,
    declared: VariableMap,
    env: OverrideSet,
    files: Vec<OverrideSet>,
    cli: OverrideSet,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            declared: VariableMap::new(),
            env: OverrideSet::new(),
            files: Vec::new(),
            cli: OverrideSet::new(),
        }
    }

    /// Runs every phase and returns the resolved variables, or all
    /// diagnostics if any error was found.
    pub fn parse(mut self) -> std::result::Result<ParsedVariables, Diagnostics> {
        let mut diags = Diagnostics::new();

        self.collect(&mut diags);
        if diags.has_errors() {
            return Err(diags);
        }

        self.decode(&mut diags)?;
        if diags.has_errors() {
            return Err(diags);
        }

        self.merge(&mut diags);
        if diags.has_errors() {
            return Err(diags);
        }

        tracing::debug!(
            packages = self.declared.len(),
            warnings = diags.len(),
            "Resolved variables"
        );
        Ok(ParsedVariables {
            root: self.config.root,
            scheme: self.config.scheme,
            variables: self.declared,
        })
    }

    fn collect(&mut self, diags: &mut Diagnostics) {
        for (package, source) in &self.config.declarations {
            let (variables, collect_diags) = collect_declarations(package, source);
            diags.extend(collect_diags);
            self.declared.insert(package.clone(), variables);
        }
    }

    /// Decodes every override source. Fatal file problems return early.
    fn decode(&mut self, diags: &mut Diagnostics) -> std::result::Result<(), Diagnostics> {
        let decoder = Decoder::new(&self.config.root, self.config.scheme.scheme());

        for (key, raw) in &self.config.env_overrides {
            let source = OverrideSource::Env(key.clone());
            match decoder.decode_inline(source, key, raw, &self.declared) {
                Ok(ovr) => merge_one(&mut self.env, ovr, diags),
                Err(inline_diags) => diags.extend(inline_diags),
            }
        }

        for path in &self.config.override_files {
            match decoder.decode_file(path) {
                Ok(file) => {
                    diags.extend(file.diagnostics);
                    self.files.push(file.overrides);
                }
                Err(fatal) => {
                    tracing::debug!(?path, "Aborting on unusable override file");
                    diags.push(fatal);
                    return Err(std::mem::take(diags));
                }
            }
        }

        for (key, raw) in &self.config.cli_overrides {
            let source = OverrideSource::Cli(key.clone());
            match decoder.decode_inline(source, key, raw, &self.declared) {
                Ok(ovr) => merge_one(&mut self.cli, ovr, diags),
                Err(inline_diags) => diags.extend(inline_diags),
            }
        }

        let mut supplied = OverrideSet::new();
        for ovr in &self.config.overrides {
            match ovr.source.tier() {
                Tier::Env => merge_one(&mut self.env, ovr.clone(), diags),
                Tier::Cli => merge_one(&mut self.cli, ovr.clone(), diags),
                Tier::File => {
                    if let Err(diag) = supplied.insert(ovr.clone()) {
                        diags.push(diag);
                    }
                }
            }
        }
        if !supplied.is_empty() {
            self.files.push(supplied);
        }

        tracing::debug!(
            env = self.env.len(),
            files = self.files.len(),
            cli = self.cli.len(),
            "Decoded override sources"
        );
        Ok(())
    }

    fn merge(&mut self, diags: &mut Diagnostics) {
        let env = std::mem::take(&mut self.env);
        self.apply(&env, Tier::Env, diags);

        for set in std::mem::take(&mut self.files) {
            self.apply(&set, Tier::File, diags);
        }

        let cli = std::mem::take(&mut self.cli);
        self.apply(&cli, Tier::Cli, diags);
    }

    fn apply(&mut self, overrides: &OverrideSet, tier: Tier, diags: &mut Diagnostics) {
        for ovr in overrides {
            let declared = self
                .declared
                .get_mut(&ovr.package)
                .and_then(|vars| vars.get_mut(&ovr.variable));

            match declared {
                Some(variable) => match variable.apply_override(ovr) {
                    Ok(()) => tracing::trace!(
                        package = %ovr.package,
                        variable = %ovr.variable,
                        %tier,
                        "Applied override"
                    ),
                    Err(diag) => diags.push(diag),
                },
                // The environment is shared with unrelated tools, so stray
                // entries are never an error.
                None if tier == Tier::Env => tracing::debug!(
                    package = %ovr.package,
                    variable = %ovr.variable,
                    "Ignoring environment override for undeclared variable"
                ),
                None if self.config.ignore_missing => tracing::warn!(
                    package = %ovr.package,
                    variable = %ovr.variable,
                    source = %ovr.source,
                    "Ignoring override for undeclared variable"
                ),
                None => diags.push(missing_declaration(ovr)),
            }
        }
    }
}

fn merge_one(set: &mut OverrideSet, ovr: Override, diags: &mut Diagnostics) {
    let mut single = OverrideSet::new();
    if let Err(diag) = single.insert(ovr) {
        diags.push(diag);
    }
    diags.extend(set.merge(&single));
}

fn missing_declaration(ovr: &Override) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::MissingRootDeclaration,
        "Missing base variable declaration to override",
        format!(
            "There is no variable named {:?} in package {}. An override can only set a variable \
             that the pack declares.",
            ovr.variable.as_str(),
            ovr.package,
        ),
    )
    .with_subject(ovr.range.clone())
}

/// Resolved variables of every package. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVariables {
    root: PackageId,
    scheme: SchemeKind,
    variables: VariableMap,
}

impl ParsedVariables {
    pub fn root(&self) -> &PackageId {
        &self.root
    }

    pub fn scheme(&self) -> SchemeKind {
        self.scheme
    }

    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    pub fn package(&self, package: &PackageId) -> Option<&BTreeMap<VariableId, Variable>> {
        self.variables.get(package)
    }

    pub fn get(&self, package: &str, variable: &str) -> Option<&Variable> {
        self.variables
            .get(&PackageId::new(package))
            .and_then(|vars| vars.get(&VariableId::new(variable)))
    }

    pub fn value(&self, package: &str, variable: &str) -> Option<&Value> {
        self.get(package, variable).map(|v| &v.value)
    }

    /// Native values of one package's variables.
    ///
    /// A variable whose value cannot be converted is reported against its
    /// declaration and left out; the others are still returned.
    pub fn native_vars(
        &self,
        package: &PackageId,
        diags: &mut Diagnostics,
    ) -> BTreeMap<String, NativeValue> {
        let Some(vars) = self.variables.get(package) else {
            return BTreeMap::new();
        };
        let mut out = BTreeMap::new();
        for (name, variable) in vars {
            match to_native(&variable.value) {
                Ok(native) => {
                    out.insert(name.to_string(), native);
                }
                Err(err) => diags.push(
                    Diagnostic::error(
                        DiagnosticCategory::ConversionFailure,
                        "Failed to convert variable value",
                        format!(
                            "The value of variable {:?} in package {package} could not be \
                             converted for templates: {err}.",
                            name.as_str()
                        ),
                    )
                    .with_subject(variable.decl_range.clone()),
                ),
            }
        }
        out
    }

    /// Flat `package -> variable -> value` view of every package.
    pub fn flat_map(&self) -> (BTreeMap<String, BTreeMap<String, NativeValue>>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let map = self
            .variables
            .keys()
            .map(|package| (package.to_string(), self.native_vars(package, &mut diags)))
            .collect();
        (map, diags)
    }
}
