//! Override file generation from resolved variables.

use std::fmt::Write;

use crate::pack::Pack;
use crate::parser::ParsedVariables;

/// Renders an override file that sets every declared variable of every
/// pack in the tree to its current value.
///
/// Packs are visited depth-first and variables are sorted by name. Keys use
/// the address form of the scheme the variables were resolved with, so
/// decoding the output against the same declarations reproduces the values.
pub fn generate_var_file(parsed: &ParsedVariables, pack: &Pack) -> String {
    let scheme = parsed.scheme().scheme();
    let mut sections = Vec::new();

    pack.walk(|node| {
        let id = scheme.package_id(node.path);
        let Some(vars) = parsed.package(&id).filter(|vars| !vars.is_empty()) else {
            return;
        };

        let mut section = String::new();
        let _ = writeln!(section, "# Variables for pack {id}");
        for (name, variable) in vars {
            section.push('\n');
            if let Some(description) = &variable.description {
                for line in description.lines() {
                    let _ = writeln!(section, "# {line}");
                }
            }
            let _ = writeln!(
                section,
                "{} = {}",
                scheme.address(&id, name),
                variable.value.to_literal()
            );
        }
        sections.push(section);
    });

    sections.join("\n")
}
