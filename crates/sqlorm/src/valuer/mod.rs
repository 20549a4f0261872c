//! Field access strategies used to read arguments out of entities and to
//! decode result rows into them.
//!
//! Two interchangeable strategies exist:
//!
//! - [`Creator::Reflect`]: goes through the derive-generated
//!   [`Entity::get_field`] / [`Entity::set_field`] accessors (name match).
//! - [`Creator::Offset`]: reads and writes field memory directly using the
//!   byte offsets and field types recorded in the [`Model`].
//!
//! Both produce identical results; the offset strategy skips the name match.

mod offset;
mod reflect;

pub use offset::{OffsetReader, OffsetValuer};
pub use reflect::{ReflectReader, ReflectValuer};

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::model::{Field, Model};
use crate::row::Row;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Read access to the fields of one entity instance.
pub trait FieldReader {
    /// Read a field by its Rust name.
    fn field(&self, name: &str) -> OrmResult<Value>;
}

/// Read/write access to one entity instance.
pub trait Valuer: FieldReader {
    /// Write every column of `row` into the matching field.
    ///
    /// All columns are resolved before anything is written, so an
    /// `UnknownColumn` error leaves the entity untouched.
    fn set_columns(&mut self, row: &Row) -> OrmResult<()>;
}

/// Selects the field access strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Creator {
    #[default]
    Reflect,
    Offset,
}

impl Creator {
    /// Create a reader over `entity`. `model` must have been parsed from `T`.
    pub fn reader<'a, T: Entity>(
        self,
        model: &'a Model,
        entity: &'a T,
    ) -> OrmResult<Box<dyn FieldReader + 'a>> {
        Ok(match self {
            Creator::Reflect => Box::new(ReflectReader::new(model, entity)?),
            Creator::Offset => Box::new(OffsetReader::new(model, entity)?),
        })
    }

    /// Create a valuer over `entity`. `model` must have been parsed from `T`.
    pub fn valuer<'a, T: Entity>(
        self,
        model: &'a Model,
        entity: &'a mut T,
    ) -> OrmResult<Box<dyn Valuer + 'a>> {
        Ok(match self {
            Creator::Reflect => Box::new(ReflectValuer::new(model, entity)?),
            Creator::Offset => Box::new(OffsetValuer::new(model, entity)?),
        })
    }
}

fn check_model<T: Entity>(model: &Model) -> OrmResult<()> {
    if model.describes::<T>() {
        Ok(())
    } else {
        Err(OrmError::Other(format!(
            "model for table {} does not describe {}",
            model.table_name(),
            T::DESCRIPTOR.type_name
        )))
    }
}

/// Resolve every column of `row`, then hand each value to `write`.
fn write_row<'m>(
    model: &'m Model,
    row: &Row,
    mut write: impl FnMut(&'m Field, Value) -> OrmResult<()>,
) -> OrmResult<()> {
    let fields = row
        .columns()
        .iter()
        .map(|column| {
            model
                .column(column)
                .ok_or_else(|| OrmError::UnknownColumn(column.clone()))
        })
        .collect::<OrmResult<Vec<_>>>()?;

    for ((field, value), column) in fields.into_iter().zip(row.values()).zip(row.columns()) {
        write(field, value.clone()).map_err(|e| match e {
            e @ OrmError::Decode { .. } => e,
            e => OrmError::decode(column.as_str(), e.to_string()),
        })?;
    }
    Ok(())
}
