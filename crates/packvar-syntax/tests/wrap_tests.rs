//! Property tests for the override-file wrapping adapter.

use packvar_syntax::{Diagnostics, Pos, WrappedSource, parse_body, parse_container};
use proptest::prelude::*;

fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}(\\.[a-z]{1,6}){0,2} = [0-9]{1,4}",
        "[a-z]{1,6} = \"[a-z ]{0,8}\"",
        "[a-z]{1,6} \"[a-z]{0,4}\"",
        "# [a-z ]{0,10}",
        "[a-z{}\\[\\]=\", .]{0,12}",
    ]
}

/// Lines that read the same as a plain body and as wrapper entries.
fn body_line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6} = [0-9]{1,4}",
        "[a-z]{1,6} = \"[a-z ]{0,8}\"",
        "# [a-z ]{0,10}",
        "[a-z]{1,6} = \\[[0-9]{0,2}(, ?[0-9]{1,2}){0,2},?",
        "[a-z]{1,6} = \\{",
        "[a-z]{1,6} = [0-9]{1,3},",
        "[a-z]{1,6} = [0-9]{1,3} [0-9]{1,3}",
        "[a-z]{1,6} = \\([0-9]{1,3}",
        "[a-z]{1,6} =",
        "\\}",
    ]
}

fn join_lines(lines: Vec<String>, trailing: bool) -> String {
    let mut content = lines.join("\n");
    if trailing {
        content.push('\n');
    }
    content
}

fn content_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec(line_strategy(), 0..6), any::<bool>())
        .prop_map(|(lines, trailing)| join_lines(lines, trailing))
}

fn body_content_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec(body_line_strategy(), 0..6), any::<bool>())
        .prop_map(|(lines, trailing)| join_lines(lines, trailing))
}

fn outline(diags: &Diagnostics) -> Vec<(String, Pos, Pos)> {
    diags
        .iter()
        .filter_map(|d| {
            let subject = d.subject.as_ref()?;
            Some((d.summary.clone(), subject.start, subject.end))
        })
        .collect()
}

proptest! {
    #[test]
    fn unwrapped_content_is_byte_identical(content in content_strategy()) {
        let wrapped = WrappedSource::wrap(&content);
        prop_assert_eq!(wrapped.original(), content.as_str());
    }

    #[test]
    fn unwrapped_diagnostics_stay_within_content(content in content_strategy()) {
        let wrapped = WrappedSource::wrap(&content);
        let (_, diags) = parse_container(wrapped.wrapped(), "vars.hcl");
        let diags = wrapped.unwrap_diagnostics(diags);

        for diag in &diags {
            for range in diag.subject.iter().chain(diag.context.iter()) {
                prop_assert!(range.start.byte <= range.end.byte);
                prop_assert!(range.end.byte <= content.len());
                // Line/column must agree with the byte offset in the original bytes.
                prop_assert_eq!(Pos::from_offset(&content, range.start.byte), range.start);
                prop_assert_eq!(Pos::from_offset(&content, range.end.byte), range.end);
            }
        }
    }

    /// Wrapping must not change what is reported, or where.
    #[test]
    fn wrapped_diagnostics_match_direct_parse(content in body_content_strategy()) {
        let wrapped = WrappedSource::wrap(&content);
        let (_, diags) = parse_container(wrapped.wrapped(), "vars.hcl");
        let (_, direct) = parse_body(&content, "vars.hcl");
        prop_assert_eq!(outline(&wrapped.unwrap_diagnostics(diags)), outline(&direct));
    }
}
