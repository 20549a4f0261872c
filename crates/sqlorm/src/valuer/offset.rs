use super::{FieldReader, Valuer, check_model, write_row};
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::model::{Field, Model};
use crate::row::Row;
use crate::value::{SqlType, Value, dispatch_field_type};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Reads fields at `base + offset`, typed by the field's [`FieldType`](crate::FieldType).
pub struct OffsetReader<'a, T> {
    model: &'a Model,
    base: NonNull<u8>,
    _entity: PhantomData<&'a T>,
}

impl<'a, T: Entity> OffsetReader<'a, T> {
    pub fn new(model: &'a Model, entity: &'a T) -> OrmResult<Self> {
        check_model::<T>(model)?;
        Ok(Self {
            model,
            base: NonNull::from(entity).cast(),
            _entity: PhantomData,
        })
    }
}

impl<T: Entity> FieldReader for OffsetReader<'_, T> {
    fn field(&self, name: &str) -> OrmResult<Value> {
        let field = self.model.require_field(name)?;
        // SAFETY: the model was parsed from `T`, whose `Entity` impl guarantees
        // offsets and types; `base` points to a `T` borrowed for `'a`.
        Ok(unsafe { read_field(self.base, field) })
    }
}

/// Reads and writes fields at `base + offset`.
pub struct OffsetValuer<'a, T> {
    model: &'a Model,
    base: NonNull<u8>,
    _entity: PhantomData<&'a mut T>,
}

impl<'a, T: Entity> OffsetValuer<'a, T> {
    pub fn new(model: &'a Model, entity: &'a mut T) -> OrmResult<Self> {
        check_model::<T>(model)?;
        Ok(Self {
            model,
            base: NonNull::from(entity).cast(),
            _entity: PhantomData,
        })
    }
}

impl<T: Entity> FieldReader for OffsetValuer<'_, T> {
    fn field(&self, name: &str) -> OrmResult<Value> {
        let field = self.model.require_field(name)?;
        // SAFETY: see `OffsetReader::field`.
        Ok(unsafe { read_field(self.base, field) })
    }
}

impl<T: Entity> Valuer for OffsetValuer<'_, T> {
    fn set_columns(&mut self, row: &Row) -> OrmResult<()> {
        let base = self.base;
        write_row(self.model, row, |field, value| {
            // SAFETY: `base` comes from a `&mut T` held for `'a`, and the
            // field type matches the memory at `offset`.
            unsafe { write_field(base, field, value) }
        })
    }
}

/// # Safety
///
/// `base` must point to a live entity whose field at `field.offset` has the
/// Rust type described by `field.ty`.
unsafe fn read_field(base: NonNull<u8>, field: &Field) -> Value {
    let ptr = unsafe { base.as_ptr().add(field.offset) }.cast_const();
    unsafe { dispatch_field_type!(field.ty, read_as(ptr)) }
}

/// # Safety
///
/// As [`read_field`], and `base` must be valid for writes.
unsafe fn write_field(base: NonNull<u8>, field: &Field, value: Value) -> OrmResult<()> {
    let ptr = unsafe { base.as_ptr().add(field.offset) };
    unsafe { dispatch_field_type!(field.ty, write_as(ptr, value)) }
}

unsafe fn read_as<V: SqlType>(ptr: *const u8) -> Value {
    unsafe { &*ptr.cast::<V>() }.clone().into()
}

unsafe fn write_as<V: SqlType>(ptr: *mut u8, value: Value) -> OrmResult<()> {
    let converted = V::from_value(value)?;
    // Assignment drops the previous value in place.
    unsafe { *ptr.cast::<V>() = converted };
    Ok(())
}
