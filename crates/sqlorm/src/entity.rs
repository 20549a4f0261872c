//! Static struct descriptions emitted by `#[derive(Entity)]`.

use crate::error::OrmResult;
use crate::value::{FieldType, Value};

/// Shape of the type an [`EntityDescriptor`] was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Struct with named fields.
    Struct,
    /// Tuple struct.
    Tuple,
    /// Unit struct.
    Unit,
}

/// One field of an entity, in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub name: &'static str,
    /// Raw `key=value,key=value` tag captured from `#[orm(...)]`.
    pub tag: Option<&'static str>,
    /// Semantic type of the field.
    pub ty: FieldType,
    /// Byte offset of the field inside the struct.
    pub offset: usize,
}

/// Compile-time description of an entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// Rust type name, used for the default table name.
    pub type_name: &'static str,
    pub kind: EntityKind,
    /// Table name from `#[orm(table = "...")]`.
    pub table_name: Option<&'static str>,
    /// Named fields in declaration order.
    pub fields: &'static [FieldDescriptor],
}

/// A struct that can be mapped to a table.
///
/// Normally implemented with `#[derive(Entity)]`:
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
/// # Safety
///
/// Every [`FieldDescriptor`] in `DESCRIPTOR` must name a field of `Self`
/// whose `offset` is its exact byte offset and whose `ty` is exactly the
/// [`FieldType`] of the field's Rust type. The offset-based valuer reads and
/// writes field memory relying on this.
pub unsafe trait Entity: Default + Send + Sync + 'static {
    const DESCRIPTOR: EntityDescriptor;

    /// Read a field by its Rust name.
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Write a field by its Rust name, converting `value` to the field type.
    ///
    /// Returns `UnknownField` for names the struct does not have.
    fn set_field(&mut self, name: &str, value: Value) -> OrmResult<()>;
}
