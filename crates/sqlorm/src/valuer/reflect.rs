use super::{FieldReader, Valuer, check_model, write_row};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::row::Row;
use crate::value::Value;

/// Reads fields through [`Entity::get_field`].
pub struct ReflectReader<'a, T> {
    model: &'a Model,
    entity: &'a T,
}

impl<'a, T: Entity> ReflectReader<'a, T> {
    pub fn new(model: &'a Model, entity: &'a T) -> OrmResult<Self> {
        check_model::<T>(model)?;
        Ok(Self { model, entity })
    }
}

impl<T: Entity> FieldReader for ReflectReader<'_, T> {
    fn field(&self, name: &str) -> OrmResult<Value> {
        get(self.model, self.entity, name)
    }
}

/// Reads and writes fields through the derive-generated accessors.
pub struct ReflectValuer<'a, T> {
    model: &'a Model,
    entity: &'a mut T,
}

impl<'a, T: Entity> ReflectValuer<'a, T> {
    pub fn new(model: &'a Model, entity: &'a mut T) -> OrmResult<Self> {
        check_model::<T>(model)?;
        Ok(Self { model, entity })
    }
}

impl<T: Entity> FieldReader for ReflectValuer<'_, T> {
    fn field(&self, name: &str) -> OrmResult<Value> {
        get(self.model, self.entity, name)
    }
}

impl<T: Entity> Valuer for ReflectValuer<'_, T> {
    fn set_columns(&mut self, row: &Row) -> OrmResult<()> {
        let entity = &mut *self.entity;
        write_row(self.model, row, |field, value| {
            entity.set_field(field.name, value)
        })
    }
}

fn get<T: Entity>(model: &Model, entity: &T, name: &str) -> OrmResult<Value> {
    model.require_field(name)?;
    entity
        .get_field(name)
        .ok_or_else(|| OrmError::UnknownField(name.to_string()))
}
