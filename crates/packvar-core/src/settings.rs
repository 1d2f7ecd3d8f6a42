//! Resolver settings loaded from a file.
//!
//! ```toml
//! scheme = "hierarchical"
//! ignore_missing = false
//! env_prefix = "NOMAD_PACK_VAR_"
//! var_files = ["overrides.hcl"]
//!
//! [vars]
//! replicas = 3
//! "web.cache.port" = "6380"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::env::{DEFAULT_ENV_PREFIX, env_overrides_from_vars};
use crate::pack::Pack;
use crate::parser::ParserConfig;
use crate::scheme::SchemeKind;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSettings {
    pub scheme: SchemeKind,
    pub ignore_missing: bool,
    pub env_prefix: String,
    /// Override files; relative paths are resolved against the settings file.
    pub var_files: Vec<PathBuf>,
    /// Inline overrides with CLI precedence. Non-string values are passed
    /// on in JSON form, which parses as the equivalent expression.
    pub vars: BTreeMap<String, serde_json::Value>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            scheme: SchemeKind::default(),
            ignore_missing: false,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            var_files: Vec::new(),
            vars: BTreeMap::new(),
        }
    }
}

impl ResolverSettings {
    /// Loads settings, choosing the format from the file extension:
    /// `.toml`, `.json`, `.yaml`, or `.yml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let parse_error = |format: &str, message: String| Error::SettingsParse {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        let mut settings: Self = match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(|e| parse_error("TOML", e.to_string()))?,
            "json" => {
                serde_json::from_str(&content).map_err(|e| parse_error("JSON", e.to_string()))?
            }
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => {
                return Err(Error::UnsupportedFormat {
                    extension: extension.to_string(),
                });
            }
        };

        if let Some(dir) = path.parent() {
            for file in &mut settings.var_files {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
        tracing::debug!(?path, scheme = ?settings.scheme, "Loaded resolver settings");
        Ok(settings)
    }

    /// Applies these settings to `config`. Files are appended after any
    /// already configured; inline overrides never replace explicit ones.
    pub fn apply(&self, mut config: ParserConfig) -> ParserConfig {
        config.scheme = self.scheme;
        config.ignore_missing |= self.ignore_missing;
        config.override_files.extend(self.var_files.iter().cloned());
        for (key, value) in &self.vars {
            let raw = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            config.cli_overrides.entry(key.clone()).or_insert(raw);
        }
        config
    }

    /// A parser configuration for `pack` with these settings applied.
    pub fn config_for_pack(&self, pack: &Pack) -> Result<ParserConfig> {
        ParserConfig::for_pack(pack, self.scheme).map(|config| self.apply(config))
    }

    /// Environment overrides from `vars` under the configured prefix.
    pub fn env_overrides<I, K, V>(&self, vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        env_overrides_from_vars(&self.env_prefix, vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(
        "settings.toml",
        "scheme = \"flat\"\nvar_files = [\"a.hcl\"]\n\n[vars]\nreplicas = 3\n"
    )]
    #[case(
        "settings.json",
        r#"{"scheme": "flat", "var_files": ["a.hcl"], "vars": {"replicas": 3}}"#
    )]
    #[case(
        "settings.yaml",
        "scheme: flat\nvar_files:\n  - a.hcl\nvars:\n  replicas: 3\n"
    )]
    fn loads_every_format(#[case] name: &str, #[case] content: &str) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();

        let settings = ResolverSettings::load(&path).unwrap();
        assert_eq!(settings.scheme, SchemeKind::Flat);
        assert_eq!(settings.var_files, vec![dir.path().join("a.hcl")]);
        assert_eq!(settings.env_prefix, DEFAULT_ENV_PREFIX);

        let config = settings.apply(ParserConfig::new("web").with_cli_override("replicas", "5"));
        assert_eq!(config.scheme, SchemeKind::Flat);
        assert_eq!(config.cli_overrides["replicas"], "5");
    }

    #[test]
    fn non_string_vars_become_expressions() {
        let settings: ResolverSettings =
            toml::from_str("[vars]\nports = [80, 443]\nname = \"web\"\n").unwrap();
        let config = settings.apply(ParserConfig::new("web"));
        assert_eq!(config.cli_overrides["ports"], "[80,443]");
        assert_eq!(config.cli_overrides["name"], "web");
    }

    #[test]
    fn rejects_unknown_extension_and_fields() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("settings.ini");
        fs::write(&ini, "").unwrap();
        assert!(matches!(
            ResolverSettings::load(&ini),
            Err(Error::UnsupportedFormat { .. })
        ));

        let bad = dir.path().join("settings.toml");
        fs::write(&bad, "colour = \"blue\"\n").unwrap();
        assert!(matches!(
            ResolverSettings::load(&bad),
            Err(Error::SettingsParse { .. })
        ));
    }

    #[test]
    fn custom_env_prefix() {
        let settings = ResolverSettings {
            env_prefix: "PACK_".into(),
            ..Default::default()
        };
        let env = settings.env_overrides([("PACK_a", "1"), ("NOMAD_PACK_VAR_b", "2")]);
        assert_eq!(env.len(), 1);
        assert_eq!(env["a"], "1");
    }
}
