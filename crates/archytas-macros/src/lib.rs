//! Derive macros for Archytas type descriptors.
//!
//! `#[derive(Reflect)]` turns a struct or fieldless enum declaration into a
//! static `archytas_core::TypeInfo`. The descriptor is what the request binder,
//! the validator and the schema registry walk instead of runtime reflection.
//!
//! Field names follow `serde`: `#[serde(rename = "...")]`,
//! `#[serde(rename_all = "...")]`, `#[serde(skip)]` and `#[serde(flatten)]` are
//! read so the descriptor always agrees with the JSON the type produces.
//! API-specific metadata goes in `#[api(...)]`:
//!
//! ```rust,ignore
//! use archytas_core::Reflect;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize, Reflect)]
//! struct ListTodos {
//!     /// Owner of the list.
//!     #[api(in = "path")]
//!     user: String,
//!     #[api(in = "query", min = 1, max = 100)]
//!     limit: i32,
//!     #[api(in = "query", enum = "open|done")]
//!     state: Vec<String>,
//! }
//! ```
//!
//! # Field attributes
//!
//! | Attribute | Meaning |
//! |-----------|---------|
//! | `name = "x"` | parameter name, wins over the serde name |
//! | `in = "path"` / `in = "query"` | parameter location |
//! | `required` | zero values are rejected by the schema validator |
//! | `private` | never exposed as a parameter |
//! | `as_string` | the value travels as a JSON string; pair with `#[serde(with = "archytas_core::as_string")]` |
//! | `enum = "a\|b"` | allowed values |
//! | `min`, `max`, `min_len`, `max_len`, `pattern`, `default`, `description` | constraints and docs |
//!
//! # Container attributes
//!
//! - `rename = "Name"` overrides the definition name.
//! - `response_modifier` routes `Reflect::as_response_modifier` to the type's
//!   `ResponseModifier` implementation.

mod parse;
mod reflect;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `archytas_core::Reflect`.
///
/// Supported inputs are structs with named fields, unit structs, newtype
/// structs and enums whose variants carry no data.
#[proc_macro_derive(Reflect, attributes(api))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
