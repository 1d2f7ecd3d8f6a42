//! Generated override files and source positions in decoded override files.

use packvar_core::{
    Decoder, Pack, PackageId, Parser, ParserConfig, SchemeKind, SourceFile, SourceFormat,
    generate_var_file,
};
use packvar_syntax::Pos;
use packvar_test_utils::fixtures::{REDIS_VARIABLES, WEB_VARIABLES};
use packvar_test_utils::workspace::TestWorkspace;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn pack_tree() -> Pack {
    let redis = Pack::new("redis")
        .unwrap()
        .with_root_variables(SourceFile::new("redis/variables.hcl", REDIS_VARIABLES));
    Pack::new("web")
        .unwrap()
        .with_root_variables(SourceFile::new("web/variables.hcl", WEB_VARIABLES))
        .with_dependency(redis)
        .unwrap()
}

// =============================================================================
// Regeneration
// =============================================================================

#[rstest]
#[case(SchemeKind::Hierarchical, "web.redis.port")]
#[case(SchemeKind::Flat, "redis.port")]
fn generated_file_reproduces_resolved_values(#[case] scheme: SchemeKind, #[case] port_key: &str) {
    let pack = pack_tree();
    let ws = TestWorkspace::new();

    let config = ParserConfig::for_pack(&pack, scheme)
        .unwrap()
        .with_cli_override("image", "registry.local/${HOSTNAME}/web:1")
        .with_cli_override("labels", r#"{ team = "platform", "cost.center" = "42" }"#)
        .with_cli_override(port_key, "6390");
    let first = Parser::new(config).parse().unwrap();
    let generated = generate_var_file(&first, &pack);
    let path = ws.write("regenerated.hcl", &generated);

    let config = ParserConfig::for_pack(&pack, scheme)
        .unwrap()
        .with_override_file(&path);
    let second = Parser::new(config).parse().unwrap();

    let (first_values, diags) = first.flat_map();
    assert!(diags.is_empty());
    let (second_values, diags) = second.flat_map();
    assert!(diags.is_empty());
    assert_eq!(first_values, second_values);
    assert_eq!(generate_var_file(&second, &pack), generated);
}

#[test]
fn generated_file_lists_every_pack() {
    let pack = pack_tree();
    let config = ParserConfig::for_pack(&pack, SchemeKind::Hierarchical).unwrap();
    let parsed = Parser::new(config).parse().unwrap();

    insta::assert_snapshot!(generate_var_file(&parsed, &pack), @r#"
    # Variables for pack web

    # Container image to run
    web.image = "nginx:1.27"

    web.labels = {}

    web.replicas = 1

    # Variables for pack web.redis

    web.redis.persistence = false

    web.redis.port = 6379
    "#);
}

// =============================================================================
// Source positions
// =============================================================================

fn decode(content: &str) -> packvar_core::DecodedFile {
    let root = PackageId::new("web");
    Decoder::new(&root, SchemeKind::Hierarchical.scheme()).decode_source(
        "overrides.hcl",
        content,
        SourceFormat::Native,
    )
}

#[test]
fn index_steps_are_not_valid_keys() {
    let file = decode("labels[0] = \"a\"\n");
    assert!(file.overrides.is_empty());
    let diag = file.diagnostics.first().unwrap();
    assert_eq!(diag.summary, "Invalid override key");
    assert_eq!(diag.subject.as_ref().unwrap().start, Pos::START);
}

#[test]
fn closing_brace_in_content_is_reported_in_place() {
    let file = decode("a = 1\n}\n");
    assert!(file.overrides.is_empty());
    assert_eq!(file.diagnostics.len(), 1);
    let diag = file.diagnostics.first().unwrap();
    assert_eq!(diag.summary, "Unexpected closing brace");
    assert_eq!(diag.subject.as_ref().map(|s| s.start), Some(Pos::new(2, 1, 6)));
}

fn padding() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::collection::vec(prop_oneof![Just(""), Just("# note"), Just("  ")], 0..6)
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}".prop_filter("keywords are values", |n| {
        !matches!(n.as_str(), "true" | "false" | "null")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Override ranges slice exactly `key = value` out of the original file.
    #[test]
    fn override_ranges_point_into_original(pad in padding(), key in name(), value in 0u32..100_000) {
        let mut content = pad.join("\n");
        if !pad.is_empty() {
            content.push('\n');
        }
        let assignment = format!("{key} = {value}");
        content.push_str(&assignment);
        content.push('\n');

        let file = decode(&content);
        prop_assert!(file.diagnostics.is_empty(), "{}", file.diagnostics);
        let ovr = file.overrides.iter().next().unwrap();
        prop_assert_eq!(ovr.range.slice(&content), Some(assignment.as_str()));
        prop_assert_eq!(ovr.range.start.line, pad.len() + 1);
        prop_assert_eq!(ovr.range.start.column, 1);
    }

    /// Syntax errors are reported against the original file, never the
    /// wrapped one.
    #[test]
    fn error_ranges_point_into_original(pad in padding(), key in name()) {
        let mut content = pad.join("\n");
        if !pad.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!("{key} \"value\"\n"));

        let file = decode(&content);
        prop_assert_eq!(file.diagnostics.len(), 1);
        prop_assert!(file.overrides.is_empty());
        let subject = file.diagnostics.first().and_then(|d| d.subject.clone()).unwrap();
        prop_assert_eq!(subject.slice(&content), Some("\"value\""));
        prop_assert_eq!(subject.start.line, pad.len() + 1);
        prop_assert_eq!(subject.start.column, key.chars().count() + 2);
    }
}
