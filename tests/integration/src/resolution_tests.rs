//! End-to-end resolution: a pack tree, a settings file, environment
//! variables, override files, and CLI flags feeding one template context.

use packvar_core::{
    DiagnosticCategory, Error, NativeValue, Override, OverrideSource, Pack, PackMetadata,
    PackageId, Parser, ParserConfig, Pos, ResolverSettings, SchemeKind, SourceFile, SourceRange,
    Type, Value, VariableId,
};
use packvar_test_utils::fixtures::{REDIS_VARIABLES, WEB_VARIABLES, variable_block};
use packvar_test_utils::workspace::TestWorkspace;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

const WEB_METADATA: &str = r#"
[app]
url = "https://nginx.org"

[pack]
name = "web"
description = "A web server with a cache"
version = "0.2.0"
"#;

fn pack_tree() -> Pack {
    let redis = Pack::new("redis")
        .unwrap()
        .with_root_variables(SourceFile::new("redis/variables.hcl", REDIS_VARIABLES));
    Pack::new("web")
        .unwrap()
        .with_metadata(PackMetadata::from_toml_str(WEB_METADATA).unwrap())
        .with_root_variables(SourceFile::new("web/variables.hcl", WEB_VARIABLES))
        .with_dependency(redis)
        .unwrap()
}

fn base_config() -> ParserConfig {
    ParserConfig::for_pack(&pack_tree(), SchemeKind::Hierarchical).unwrap()
}

// =============================================================================
// Full pipeline
// =============================================================================

#[test]
fn settings_env_files_and_cli_resolve_into_context() {
    let ws = TestWorkspace::new();
    ws.write(
        "overrides/base.hcl",
        r#"# Shared across environments
image = "httpd:2.4"
web.redis.port = 6380
labels = { team = "platform" }
"#,
    );
    ws.write("overrides/prod.yaml", "replicas: 4\n");
    let settings_path = ws.write(
        "packvar.toml",
        r#"env_prefix = "PACKVAR_"
var_files = ["overrides/base.hcl", "overrides/prod.yaml"]

[vars]
replicas = 6
"#,
    );

    let settings = ResolverSettings::load(&settings_path).unwrap();
    let env = settings.env_overrides([
        ("PACKVAR_web.redis.persistence", "true"),
        ("PACKVAR_replicas", "2"),
        ("PACKVAR_unrelated", "x"),
        ("HOME", "/root"),
    ]);
    assert_eq!(env.len(), 3);

    let pack = pack_tree();
    let config = settings.config_for_pack(&pack).unwrap().with_env_overrides(env);
    let parsed = Parser::new(config).parse().unwrap();
    let (context, diags) = parsed.to_template_context(&pack);
    assert!(diags.is_empty(), "{diags}");

    let json = context.to_json();
    assert_eq!(
        json["_self"]["vars"],
        json!({
            "image": "httpd:2.4",
            "labels": { "team": "platform" },
            "replicas": 6,
        })
    );
    assert_eq!(
        json["redis"]["_self"]["vars"],
        json!({ "persistence": true, "port": 6380 })
    );
    assert_eq!(json["_self"]["meta"]["pack"]["version"], "0.2.0");
    assert_eq!(json["redis"]["_self"]["meta"]["pack"]["name"], "");

    let root = context.root();
    assert_eq!(root.var("labels.team").to_string(), "platform");
    assert_eq!(root.meta("app.url").to_string(), "https://nginx.org");
    assert_eq!(root.dependency_paths(), vec!["redis"]);
    assert_eq!(
        context.find("redis").map(|ctx| ctx.var("port")),
        Some(NativeValue::Int(6380))
    );
}

#[test]
fn defaults_survive_without_overrides() {
    let pack = pack_tree();
    let parsed = Parser::new(base_config()).parse().unwrap();
    let (context, diags) = parsed.to_template_context(&pack);
    assert!(diags.is_empty());
    assert_eq!(context.root().var("image").to_string(), "nginx:1.27");
    assert_eq!(context.root().var("labels"), NativeValue::Map(Default::default()));
    assert_eq!(
        context.find("redis").map(|ctx| ctx.var("persistence")),
        Some(NativeValue::Bool(false))
    );
}

#[test]
fn aliased_dependency_is_addressed_by_alias() {
    let cache = Pack::new("redis")
        .unwrap()
        .with_alias("cache")
        .unwrap()
        .with_root_variables(SourceFile::new("redis/variables.hcl", REDIS_VARIABLES));
    let pack = Pack::new("web").unwrap().with_dependency(cache).unwrap();

    let config = ParserConfig::for_pack(&pack, SchemeKind::Hierarchical)
        .unwrap()
        .with_cli_override("web.cache.port", "7001");
    let parsed = Parser::new(config).parse().unwrap();
    let (context, _) = parsed.to_template_context(&pack);
    assert_eq!(context.root().dependency_names(), vec!["cache"]);
    assert_eq!(context.to_json()["cache"]["_self"]["vars"]["port"], 7001);
}

#[test]
fn huge_exponents_render_as_infinite_floats() {
    let source = format!(
        "{}{}",
        variable_block("big", Some("number"), Some("1e9223372036854775807")),
        variable_block("wide", Some("number"), None),
    );
    let pack = Pack::new("p")
        .unwrap()
        .with_root_variables(SourceFile::new("p/variables.hcl", source));
    let config = ParserConfig::for_pack(&pack, SchemeKind::Hierarchical)
        .unwrap()
        .with_cli_override("wide", "12e9223372036854775806");

    let parsed = Parser::new(config).parse().unwrap();
    let (context, _) = parsed.to_template_context(&pack);
    assert_eq!(context.root().var("big"), NativeValue::Float(f64::INFINITY));
    assert_eq!(context.root().var("wide"), NativeValue::Float(f64::INFINITY));
}

#[test]
fn inline_collections_parse_as_expressions() {
    let parsed = Parser::new(
        base_config()
            .with_cli_override("labels", r#"{ tier = "frontend", owner = "ops" }"#)
            .with_cli_override("image", "{ not = \"parsed\" }"),
    )
    .parse()
    .unwrap();

    let (flat, diags) = parsed.flat_map();
    assert!(diags.is_empty());
    assert_eq!(
        flat["web"]["labels"].to_json(),
        json!({ "owner": "ops", "tier": "frontend" })
    );
    // String variables take the raw text.
    assert_eq!(flat["web"]["image"].to_string(), "{ not = \"parsed\" }");
}

// =============================================================================
// Error reporting
// =============================================================================

#[test]
fn undeclared_env_is_dropped_but_undeclared_cli_is_an_error() {
    assert!(Parser::new(base_config().with_env_override("nope", "1")).parse().is_ok());

    let diags = Parser::new(base_config().with_cli_override("nope", "1"))
        .parse()
        .unwrap_err();
    assert_eq!(diags.len(), 1);
    let diag = diags.first().unwrap();
    assert_eq!(diag.category, DiagnosticCategory::MissingRootDeclaration);
    assert_eq!(diag.summary, "Missing base variable declaration to override");
    assert_eq!(diag.subject.as_ref().map(|s| s.filename.as_str()), Some("<var:nope>"));

    assert!(
        Parser::new(base_config().with_cli_override("nope", "1").with_ignore_missing(true))
            .parse()
            .is_ok()
    );
}

#[test]
fn every_merge_problem_is_reported_at_once() {
    let diags = Parser::new(
        base_config()
            .with_cli_override("replicas", "many")
            .with_cli_override("nope", "1"),
    )
    .parse()
    .unwrap_err();

    assert_eq!(diags.len(), 2);
    assert!(diags.has_category(DiagnosticCategory::MissingRootDeclaration));
    assert!(diags.has_category(DiagnosticCategory::InvalidValueForType));
    let invalid = diags
        .iter()
        .find(|d| d.category == DiagnosticCategory::InvalidValueForType)
        .unwrap();
    assert_eq!(invalid.summary, "Invalid value for variable");
}

fn supplied(variable: &str, value: Value, ty: Type) -> Override {
    Override::new(
        PackageId::new("web"),
        VariableId::new(variable),
        value,
        SourceRange::point("<caller>", Pos::START),
        OverrideSource::Cli(variable.to_string()),
    )
    .with_type(ty)
}

#[test]
fn supplied_override_type_replaces_declared_type() {
    let parsed = Parser::new(
        base_config().with_override(supplied("replicas", Value::from(3), Type::String)),
    )
    .parse()
    .unwrap();
    let replicas = parsed.get("web", "replicas").unwrap();
    assert_eq!(replicas.ty, Some(Type::String));
    assert_eq!(replicas.value, Value::string("3"));
}

#[rstest]
// The declared default, retyped to something it does not fit.
#[case(supplied("image", Value::string("nginx:1.27"), Type::Number), "Invalid type for variable")]
#[case(supplied("replicas", Value::Tuple(vec![]), Type::Bool), "Invalid type and value for variable")]
fn supplied_override_types_are_validated(#[case] ovr: Override, #[case] summary: &str) {
    let diags = Parser::new(base_config().with_override(ovr)).parse().unwrap_err();
    assert_eq!(diags.len(), 1);
    let diag = diags.first().unwrap();
    assert_eq!(diag.category, DiagnosticCategory::InvalidValueForType);
    assert_eq!(diag.summary, summary);
}

#[rstest]
#[case("list(number)", "[\"a\"]")]
#[case("list(string)", "{}")]
#[case("bool", "\"maybe\"")]
fn invalid_declared_default_stops_resolution(#[case] ty: &str, #[case] default: &str) {
    let config = ParserConfig::new("p")
        .with_declarations(
            "p",
            SourceFile::new("variables.hcl", variable_block("v", Some(ty), Some(default))),
        )
        .with_cli_override("v", "[]");

    let diags = Parser::new(config).parse().unwrap_err();
    assert_eq!(diags.len(), 1);
    assert!(diags.has_category(DiagnosticCategory::InvalidDeclaredDefault));
}

#[test]
fn flat_scheme_rejects_ambiguous_pack_names() {
    let queue = Pack::new("queue")
        .unwrap()
        .with_dependency(Pack::new("redis").unwrap())
        .unwrap();
    let pack = Pack::new("web")
        .unwrap()
        .with_dependency(Pack::new("redis").unwrap())
        .unwrap()
        .with_dependency(queue)
        .unwrap();

    assert!(ParserConfig::for_pack(&pack, SchemeKind::Hierarchical).is_ok());
    assert!(matches!(
        ParserConfig::for_pack(&pack, SchemeKind::Flat),
        Err(Error::AmbiguousPackage { id }) if id == "redis"
    ));
}

#[test]
fn diagnostics_render_with_positions() {
    let ws = TestWorkspace::new();
    let file = ws.write("bad.hcl", "replicas = 2\nimage \"httpd\"\n");
    let diags = Parser::new(base_config().with_override_file(&file))
        .parse()
        .unwrap_err();

    let rendered = diags.to_string().replace(&file.display().to_string(), "bad.hcl");
    insta::assert_snapshot!(rendered, @r#"Error: bad.hcl:2,7-14: Missing key/value separator; Expected an equals sign ("=") to mark the beginning of the attribute value."#);
}
