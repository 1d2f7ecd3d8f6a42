//! Integration tests for the configuration-language parser.

use packvar_syntax::{DiagnosticCategory, ExprKind, Pos, parse_body, parse_expression};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("\"unterminated", "Unterminated template string")]
#[case("[1, 2", "Unclosed tuple constructor")]
#[case("[1 2]", "Missing item separator")]
#[case("{ a = 1", "Unclosed object constructor")]
#[case("(1", "Unbalanced parentheses")]
#[case("f(1 2)", "Missing argument separator")]
#[case("a.", "Invalid attribute name")]
#[case("+", "Invalid character")]
fn malformed_expressions_report_first_error(#[case] src: &str, #[case] summary: &str) {
    let (_, diags) = parse_expression(src, "expr");
    assert!(diags.has_errors(), "expected an error for {src:?}");
    assert_eq!(diags.first().map(|d| d.summary.as_str()), Some(summary));
    assert!(diags.has_category(DiagnosticCategory::Syntax));
}

#[rstest]
#[case("null", ExprKind::Null)]
#[case("true", ExprKind::Bool(true))]
#[case("false", ExprKind::Bool(false))]
#[case("12.5", ExprKind::Number("12.5".into()))]
#[case("\"hi\"", ExprKind::String("hi".into()))]
fn literal_expressions(#[case] src: &str, #[case] expected: ExprKind) {
    let (expr, diags) = parse_expression(src, "expr");
    assert!(diags.is_empty());
    assert_eq!(expr.kind, expected);
}

#[test]
fn multiline_collections_ignore_newlines() {
    let src = "[\n  \"a\",\n  \"b\",\n]";
    let (expr, diags) = parse_expression(src, "expr");
    assert!(diags.is_empty(), "{diags}");
    assert!(matches!(expr.kind, ExprKind::Tuple(ref items) if items.len() == 2));
    assert_eq!(expr.range.end, Pos::new(4, 2, src.len()));
}

#[test]
fn nested_blocks_parse() {
    let src = r#"
variable "ports" {
  description = "Ports to expose"
  type        = list(number)
  default     = [80, 443]
}

variable "labels" {
  type = map(string)
  default = {
    team = "platform"
    "tier" = "web"
  }
}
"#;
    let (body, diags) = parse_body(src, "variables.hcl");
    assert!(diags.is_empty(), "{diags}");
    let names: Vec<_> = body
        .blocks()
        .map(|b| b.labels[0].value.as_str())
        .collect();
    assert_eq!(names, vec!["ports", "labels"]);
}

#[test]
fn unclosed_block_is_reported_at_open_brace() {
    let (_, diags) = parse_body("variable \"x\" {\n  type = string\n", "v.hcl");
    assert_eq!(diags.len(), 1);
    let diag = diags.first().cloned().expect("one diagnostic");
    assert_eq!(diag.summary, "Unclosed configuration block");
    assert_eq!(diag.subject.map(|s| s.start), Some(Pos::new(1, 14, 13)));
}

#[test]
fn diagnostic_rendering() {
    let (_, diags) = parse_body("name = \n", "vars.hcl");
    insta::assert_snapshot!(diags.to_string(), @r#"Error: vars.hcl:1,8-2,1: Invalid expression; Expected the start of an expression, but found newline."#);
}
