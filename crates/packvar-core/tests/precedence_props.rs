//! Property tests for tier precedence and override-set merging.

use packvar_core::{
    Override, OverrideSet, OverrideSource, PackageId, Parser, ParserConfig, SourceFile,
    SourceRange, Value, VariableId,
};
use packvar_test_utils::fixtures::variable_block;
use packvar_test_utils::workspace::TestWorkspace;
use proptest::prelude::*;

fn ovr(variable: &str, value: i64, source: OverrideSource) -> Override {
    Override::new(
        PackageId::new("p"),
        VariableId::new(variable),
        Value::from(value),
        SourceRange::whole("src", ""),
        source,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The highest tier that sets a variable decides its value, whatever
    /// the order of the lower tiers.
    #[test]
    fn highest_tier_wins(
        env in proptest::option::of(0i64..1000),
        files in proptest::collection::vec(0i64..1000, 0..4),
        cli in proptest::option::of(0i64..1000),
    ) {
        let ws = TestWorkspace::new();
        let mut config = ParserConfig::new("p").with_declarations(
            "p",
            SourceFile::new("v.hcl", variable_block("n", Some("number"), Some("-1"))),
        );
        if let Some(env) = env {
            config = config.with_env_override("n", env.to_string());
        }
        for (i, value) in files.iter().enumerate() {
            config = config.with_override_file(ws.write(&format!("f{i}.hcl"), &format!("n = {value}\n")));
        }
        if let Some(cli) = cli {
            config = config.with_cli_override("p.n", cli.to_string());
        }

        let expected = cli.or(files.last().copied()).or(env).unwrap_or(-1);
        let parsed = Parser::new(config).parse().unwrap();
        prop_assert_eq!(parsed.value("p", "n"), Some(&Value::from(expected)));
    }

    #[test]
    fn merging_a_set_into_itself_is_idempotent(names in proptest::collection::btree_set("[a-z]{1,6}", 0..8)) {
        let mut set = OverrideSet::new();
        for (i, name) in names.iter().enumerate() {
            set.insert(ovr(name, i as i64, OverrideSource::File("a.hcl".into()))).unwrap();
        }
        let copy = set.clone();
        let diags = set.merge(&copy);
        prop_assert!(diags.is_empty());
        prop_assert_eq!(set.len(), names.len());
    }

    #[test]
    fn distinct_source_conflicts_keep_first(first in any::<i64>(), second in any::<i64>()) {
        let mut left = OverrideSet::new();
        left.insert(ovr("x", first, OverrideSource::File("a.hcl".into()))).unwrap();
        let mut right = OverrideSet::new();
        right.insert(ovr("x", second, OverrideSource::File("b.hcl".into()))).unwrap();

        let diags = left.merge(&right);
        prop_assert_eq!(diags.len(), 1);
        prop_assert_eq!(
            &left.get(&PackageId::new("p"), &VariableId::new("x")).unwrap().value,
            &Value::from(first)
        );
    }
}
