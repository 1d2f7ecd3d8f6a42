//! Variable resolution and override engine for packs.
//!
//! Resolution runs in fixed phases:
//!
//! 1. Variable declarations are collected from each pack's root variables
//!    source ([`declaration`]).
//! 2. Override sources are decoded into [`Override`] records: environment
//!    variables, override files, and CLI flags ([`decoder`]).
//! 3. Overrides are applied on top of declared defaults in precedence order
//!    `default < env < file < cli` ([`Parser`]).
//! 4. The resolved variables are handed to templates as a nested
//!    per-pack [`TemplateContext`].
//!
//! ```
//! use packvar_core::{Pack, Parser, ParserConfig, SchemeKind, SourceFile};
//!
//! let pack = Pack::new("web")
//!     .unwrap()
//!     .with_root_variables(SourceFile::new(
//!         "variables.hcl",
//!         "variable \"replicas\" {\n  type    = number\n  default = 1\n}\n",
//!     ));
//!
//! let config = ParserConfig::for_pack(&pack, SchemeKind::Hierarchical)
//!     .unwrap()
//!     .with_cli_override("replicas", "3");
//! let parsed = Parser::new(config).parse().unwrap();
//!
//! let (context, diags) = parsed.to_template_context(&pack);
//! assert!(diags.is_empty());
//! assert_eq!(context.root().var("replicas").to_string(), "3");
//! ```

pub mod context;
pub mod declaration;
pub mod decoder;
pub mod env;
pub mod error;
pub mod generate;
pub mod ids;
pub mod logging;
pub mod overrides;
pub mod pack;
pub mod parser;
pub mod scheme;
pub mod settings;
pub mod variable;

pub use context::{PackContext, TemplateContext};
pub use declaration::collect_declarations;
pub use decoder::{DecodedFile, Decoder, SourceFormat};
pub use env::{DEFAULT_ENV_PREFIX, env_overrides_from_process, env_overrides_from_vars};
pub use error::{Error, LookupError, Result};
pub use generate::generate_var_file;
pub use ids::{PackageId, VariableId};
pub use overrides::{Override, OverrideSet, OverrideSource, Tier};
pub use pack::{Pack, PackMetadata, SourceFile};
pub use parser::{ParsedVariables, Parser, ParserConfig, VariableMap};
pub use scheme::{AddressingScheme, SchemeKind};
pub use settings::ResolverSettings;
pub use variable::Variable;

pub use packvar_syntax::{Diagnostic, DiagnosticCategory, Diagnostics, Pos, SourceRange};
pub use packvar_value::{NativeValue, Type, Value};
