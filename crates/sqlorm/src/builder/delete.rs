//! DELETE statement builder.

use super::{Query, QueryBuilder, SqlBuilder, resolve_model};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::executor;
use crate::expr::Predicate;
use crate::middleware::{QueryContext, QueryType};
use crate::model::Model;
use crate::row::ExecResult;
use crate::session::Session;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// `DELETE FROM <table> WHERE ...;`
///
/// Building without any predicate fails with [`OrmError::DeleteAll`]; the
/// error still carries the generated SQL so it can be inspected.
#[must_use = "builders do nothing until built or executed"]
pub struct Deleter<'s, T, S> {
    session: &'s S,
    model: OnceLock<Arc<Model>>,
    table: Option<String>,
    where_: Vec<Predicate>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity, S: Session> Deleter<'s, T, S> {
    pub fn new(session: &'s S) -> Self {
        Self {
            session,
            model: OnceLock::new(),
            table: None,
            where_: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Delete from this table name instead of `T`'s table.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// `WHERE`; several predicates are ANDed.
    pub fn filter(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.where_ = predicates.into_iter().collect();
        self
    }

    fn model(&self) -> OrmResult<&Arc<Model>> {
        resolve_model::<T>(&self.model, self.session.core())
    }

    /// Execute the delete.
    pub async fn exec(self) -> OrmResult<ExecResult> {
        let ctx = QueryContext::new(QueryType::Delete, &self, Arc::clone(self.model()?));
        executor::exec(self.session, &ctx).await
    }
}

impl<T: Entity, S: Session> QueryBuilder for Deleter<'_, T, S> {
    fn build(&self) -> OrmResult<Query> {
        let model = self.model()?;
        let mut b = SqlBuilder::new(self.session.core(), model);

        b.push("DELETE FROM ");
        match &self.table {
            Some(name) => b.quote(name),
            None => b.quote(model.table_name()),
        }
        b.build_predicates(" WHERE ", &self.where_)?;

        let query = b.finish();
        if self.where_.is_empty() {
            return Err(OrmError::DeleteAll { sql: query.sql });
        }
        Ok(query)
    }
}
