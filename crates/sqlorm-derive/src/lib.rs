//! Derive macros for sqlorm
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive the `Entity` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlorm::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "users")]
/// struct User {
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     age: Option<i32>,
/// }
/// ```
///
/// # Generated
///
/// - `DESCRIPTOR`: type name, struct kind, table override and one field
///   descriptor per field (name, raw tag, field type, byte offset)
/// - `get_field` / `set_field`: field access by Rust name
///
/// # Attributes
///
/// - `#[orm(table = "name")]` on the struct: table name
/// - `#[orm(column = "name")]` on a field: column name
///
/// Field attributes are captured verbatim as a `key=value,key=value` tag and
/// interpreted when the model is registered. Every field type must implement
/// `sqlorm::SqlType`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
