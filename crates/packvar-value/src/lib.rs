//! Dynamic value domain, type constraints, and native conversion.
//!
//! Variable values are modelled as a closed tagged union ([`Value`]) because
//! declared types are optional and override values arrive untyped until they
//! are matched against a declaration. This crate provides:
//!
//! - [`Value`] and the arbitrary-precision [`Number`]
//! - [`Type`] constraints parsed from type expressions such as `list(string)`
//! - [`convert()`] to coerce a value to a type constraint
//! - [`evaluate()`] to turn a literal syntax tree into a value
//! - [`to_native()`] and [`NativeValue`] for handing values to templates

pub mod convert;
pub mod error;
pub mod eval;
pub mod native;
pub mod number;
pub mod types;
pub mod value;

pub use convert::convert;
pub use error::{Error, PathStep, Result};
pub use eval::evaluate;
pub use native::{NativeValue, to_native};
pub use number::Number;
pub use types::Type;
pub use value::{Capsule, Value};
