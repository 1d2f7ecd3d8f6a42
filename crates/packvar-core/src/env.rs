//! Environment-sourced overrides.
//!
//! Variables named `<prefix><key>` become overrides for `<key>`, where the
//! key may be dotted to address a nested pack.

use std::collections::BTreeMap;
use std::ffi::OsString;

pub const DEFAULT_ENV_PREFIX: &str = "NOMAD_PACK_VAR_";

/// Splits a raw `NAME=value` assignment on the first `=`.
pub fn split_env_assignment(raw: &str) -> Option<(&str, &str)> {
    raw.split_once('=')
}

/// Selects the entries of `vars` whose names start with `prefix`, keyed by
/// the remainder of the name.
pub fn env_overrides_from_vars<I, K, V>(prefix: &str, vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let key = name.as_ref().strip_prefix(prefix)?;
            (!key.is_empty()).then(|| (key.to_string(), value.into()))
        })
        .collect()
}

/// Like [`env_overrides_from_vars`] for raw `NAME=value` strings.
/// Strings without `=` are ignored.
pub fn env_overrides_from_assignments<'a>(
    prefix: &str,
    assignments: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, String> {
    env_overrides_from_vars(
        prefix,
        assignments.into_iter().filter_map(split_env_assignment),
    )
}

/// Snapshot of the process environment under `prefix`.
///
/// Entries whose name or value is not valid UTF-8 are skipped.
pub fn env_overrides_from_process(prefix: &str) -> BTreeMap<String, String> {
    let overrides = env_overrides_from_vars(prefix, utf8_vars(std::env::vars_os()));
    tracing::debug!(prefix, count = overrides.len(), "Read environment overrides");
    overrides
}

fn utf8_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (Ok(name), Err(_)) => {
                tracing::trace!(%name, "Skipping environment variable with a non-UTF-8 value");
                None
            }
            (Err(name), _) => {
                tracing::trace!(?name, "Skipping environment variable with a non-UTF-8 name");
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(unix)]
    #[test]
    fn non_utf8_entries_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let vars = [
            (OsString::from("P_ok"), OsString::from("1")),
            (OsString::from("P_bad_value"), OsString::from_vec(vec![b'a', 0x80])),
            (OsString::from_vec(vec![b'P', b'_', 0xff]), OsString::from("2")),
        ];
        assert_eq!(
            env_overrides_from_vars("P_", utf8_vars(vars)),
            BTreeMap::from([("ok".to_string(), "1".to_string())])
        );
    }

    #[cfg(unix)]
    #[test]
    fn process_snapshot_tolerates_non_utf8_values() {
        use std::os::unix::ffi::OsStringExt;

        let prefix = "PACKVAR_ENV_TEST_";
        // SAFETY: these names are unique to this test and nothing else reads them.
        unsafe {
            std::env::set_var("PACKVAR_ENV_TEST_plain", "eu");
            std::env::set_var("PACKVAR_ENV_TEST_raw", OsString::from_vec(vec![0xc3, 0x28]));
        }
        let overrides = env_overrides_from_process(prefix);
        unsafe {
            std::env::remove_var("PACKVAR_ENV_TEST_plain");
            std::env::remove_var("PACKVAR_ENV_TEST_raw");
        }
        assert_eq!(
            overrides,
            BTreeMap::from([("plain".to_string(), "eu".to_string())])
        );
    }

    #[test]
    fn filters_by_prefix() {
        let vars = [
            ("NOMAD_PACK_VAR_region", "eu"),
            ("NOMAD_PACK_VAR_web.cache.port", "6379"),
            ("NOMAD_PACK_VAR_", "ignored"),
            ("HOME", "/root"),
        ];
        let overrides = env_overrides_from_vars(DEFAULT_ENV_PREFIX, vars);
        assert_eq!(
            overrides,
            BTreeMap::from([
                ("region".to_string(), "eu".to_string()),
                ("web.cache.port".to_string(), "6379".to_string()),
            ])
        );
    }

    #[test]
    fn raw_assignments_split_on_first_equals() {
        assert_eq!(split_env_assignment("A=b=c"), Some(("A", "b=c")));
        assert_eq!(split_env_assignment("novalue"), None);

        let overrides =
            env_overrides_from_assignments("P_", ["P_x=1=2", "P_y", "Q_z=3", "P_empty="]);
        assert_eq!(
            overrides,
            BTreeMap::from([
                ("x".to_string(), "1=2".to_string()),
                ("empty".to_string(), String::new()),
            ])
        );
    }
}
