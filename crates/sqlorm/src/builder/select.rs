//! SELECT statement builder.

use super::{Query, QueryBuilder, SqlBuilder, resolve_model};
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::executor;
use crate::expr::{Column, Predicate, Selectable};
use crate::middleware::{QueryContext, QueryType};
use crate::model::Model;
use crate::session::Session;
use crate::table::TableReference;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Sort direction of an `ORDER BY` item.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    Asc(Column),
    Desc(Column),
}

impl OrderBy {
    pub fn asc(column: Column) -> Self {
        OrderBy::Asc(column)
    }

    pub fn desc(column: Column) -> Self {
        OrderBy::Desc(column)
    }
}

/// `SELECT <cols|*> FROM <table> [WHERE] [GROUP BY] [HAVING] [ORDER BY] [LIMIT ?] [OFFSET ?];`
#[must_use = "builders do nothing until built or executed"]
pub struct Selector<'s, T, S> {
    session: &'s S,
    model: OnceLock<Arc<Model>>,
    table: Option<TableReference>,
    columns: Vec<Selectable>,
    where_: Vec<Predicate>,
    group_by: Vec<Column>,
    having: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity, S: Session> Selector<'s, T, S> {
    pub fn new(session: &'s S) -> Self {
        Self {
            session,
            model: OnceLock::new(),
            table: None,
            columns: Vec::new(),
            where_: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// Select from a table or join instead of `T`'s own table.
    pub fn from(mut self, table: impl Into<TableReference>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Replace the select list. An empty list selects `*`.
    pub fn select<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Selectable>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// `WHERE`; several predicates are ANDed.
    pub fn filter(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.where_ = predicates.into_iter().collect();
        self
    }

    pub fn group_by(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.group_by = columns.into_iter().collect();
        self
    }

    /// `HAVING`; several predicates are ANDed.
    pub fn having(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.having = predicates.into_iter().collect();
        self
    }

    pub fn order_by(mut self, order: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by = order.into_iter().collect();
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn model(&self) -> OrmResult<&Arc<Model>> {
        resolve_model::<T>(&self.model, self.session.core())
    }

    fn context(&self) -> OrmResult<QueryContext<'_>> {
        Ok(QueryContext::new(
            QueryType::Select,
            self,
            Arc::clone(self.model()?),
        ))
    }

    /// Fetch the first row. Fails with `NoRows` if there is none.
    pub async fn get(self) -> OrmResult<T> {
        let ctx = self.context()?;
        executor::get::<T, S>(self.session, &ctx).await
    }

    /// Fetch every row.
    pub async fn get_multi(self) -> OrmResult<Vec<T>> {
        let ctx = self.context()?;
        executor::get_multi::<T, S>(self.session, &ctx).await
    }
}

impl<T: Entity, S: Session> QueryBuilder for Selector<'_, T, S> {
    fn build(&self) -> OrmResult<Query> {
        let model = self.model()?;
        let mut b = SqlBuilder::new(self.session.core(), model);

        b.push("SELECT ");
        if self.columns.is_empty() {
            b.push("*");
        }
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                b.push(",");
            }
            b.build_selectable(column)?;
        }

        b.push(" FROM ");
        b.build_table(self.table.as_ref())?;
        b.build_predicates(" WHERE ", &self.where_)?;

        if !self.group_by.is_empty() {
            b.push(" GROUP BY ");
            for (i, column) in self.group_by.iter().enumerate() {
                if i > 0 {
                    b.push(",");
                }
                b.build_column(column, false)?;
            }
        }

        b.build_predicates(" HAVING ", &self.having)?;

        if !self.order_by.is_empty() {
            b.push(" ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    b.push(",");
                }
                let (column, dir) = match order {
                    OrderBy::Asc(c) => (c, " ASC"),
                    OrderBy::Desc(c) => (c, " DESC"),
                };
                b.build_column(column, false)?;
                b.push(dir);
            }
        }

        if let Some(limit) = self.limit {
            b.push(" LIMIT ?");
            b.push_arg(limit.into());
        }
        if let Some(offset) = self.offset {
            b.push(" OFFSET ?");
            b.push_arg(offset.into());
        }

        Ok(b.finish())
    }
}
