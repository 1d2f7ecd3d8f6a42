//! Source positions, diagnostics, and the configuration-language parser
//! used by pack variable declarations and override files.
//!
//! The crate is split into the following layers:
//!
//! - [`pos`]: byte/line/column positions and [`SourceRange`]s
//! - [`diagnostic`]: structured [`Diagnostic`] records and the [`Diagnostics`] list
//! - [`lexer`]: `logos` tokenizer for the configuration language
//! - [`ast`] and [`parser`]: `chumsky` grammar for bodies, blocks, attributes,
//!   and expressions
//! - [`wrap`]: the synthetic-container adapter used to decode override files
//!
//! # Example
//!
//! ```
//! use packvar_syntax::parser::parse_body;
//!
//! let (body, diags) = parse_body("region = \"eu-west-1\"\n", "vars.hcl");
//! assert!(!diags.has_errors());
//! assert_eq!(body.attributes().count(), 1);
//! ```

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod pos;
pub mod wrap;

pub use ast::{
    Attribute, Block, Body, ExprKind, Expression, Label, ObjectItem, ObjectKey, Structure,
    Traversal, TraversalStep,
};
pub use diagnostic::{Diagnostic, DiagnosticCategory, Diagnostics, Severity};
pub use parser::{parse_body, parse_container, parse_expression};
pub use pos::{LineIndex, Pos, SourceRange};
pub use wrap::WrappedSource;
