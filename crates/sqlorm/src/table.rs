//! Table references and joins.

use crate::entity::Entity;
use crate::error::OrmResult;
use crate::expr::{Column, Predicate};
use crate::model::{Model, Registry};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Type-erased handle to an entity type, resolvable through a [`Registry`].
#[derive(Clone, Copy)]
pub(crate) struct EntityHandle {
    type_id: TypeId,
    type_name: &'static str,
    resolve: fn(&Registry) -> OrmResult<Arc<Model>>,
}

impl EntityHandle {
    fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: T::DESCRIPTOR.type_name,
            resolve: Registry::get::<T>,
        }
    }

    pub(crate) fn model(&self, registry: &Registry) -> OrmResult<Arc<Model>> {
        (self.resolve)(registry)
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// The table of an entity type, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub(crate) entity: EntityHandle,
    pub(crate) alias: Option<String>,
}

impl Table {
    pub fn of<T: Entity>() -> Self {
        Self {
            entity: EntityHandle::of::<T>(),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// A column of this table, rendered qualified.
    pub fn col(&self, name: impl Into<String>) -> Column {
        Column::qualified(self.clone(), name)
    }

    pub fn join(self, right: impl Into<TableReference>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), JoinKind::Inner)
    }

    pub fn left_join(self, right: impl Into<TableReference>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), JoinKind::Left)
    }

    pub fn right_join(self, right: impl Into<TableReference>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), JoinKind::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// `(left KIND JOIN right) [USING (..) | ON ..]`
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub(crate) left: TableReference,
    pub(crate) right: TableReference,
    pub(crate) kind: JoinKind,
    pub(crate) on: Vec<Predicate>,
    pub(crate) using: Vec<String>,
}

impl Join {
    pub fn join(self, right: impl Into<TableReference>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), JoinKind::Inner)
    }

    pub fn left_join(self, right: impl Into<TableReference>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), JoinKind::Left)
    }

    pub fn right_join(self, right: impl Into<TableReference>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), JoinKind::Right)
    }
}

/// A join waiting for its `ON` or `USING` condition.
#[derive(Debug, Clone)]
#[must_use = "finish the join with `on` or `using`"]
pub struct JoinBuilder {
    left: TableReference,
    right: TableReference,
    kind: JoinKind,
}

impl JoinBuilder {
    fn new(left: TableReference, right: TableReference, kind: JoinKind) -> Self {
        Self { left, right, kind }
    }

    /// Join condition; several predicates are ANDed.
    pub fn on(self, predicates: impl IntoIterator<Item = Predicate>) -> Join {
        Join {
            left: self.left,
            right: self.right,
            kind: self.kind,
            on: predicates.into_iter().collect(),
            using: Vec::new(),
        }
    }

    /// Join on equally named fields of both sides.
    pub fn using<S: Into<String>>(self, fields: impl IntoIterator<Item = S>) -> Join {
        Join {
            left: self.left,
            right: self.right,
            kind: self.kind,
            on: Vec::new(),
            using: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// What a `FROM` clause refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum TableReference {
    Table(Table),
    Join(Box<Join>),
}

impl TableReference {
    /// The left-most table of the reference.
    pub(crate) fn leftmost(&self) -> &Table {
        match self {
            TableReference::Table(table) => table,
            TableReference::Join(join) => join.left.leftmost(),
        }
    }
}

impl From<Table> for TableReference {
    fn from(table: Table) -> Self {
        TableReference::Table(table)
    }
}

impl From<Join> for TableReference {
    fn from(join: Join) -> Self {
        TableReference::Join(Box::new(join))
    }
}
