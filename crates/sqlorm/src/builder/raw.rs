//! Hand-written SQL bound to an entity type.

use super::{Query, QueryBuilder, resolve_model};
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::executor;
use crate::middleware::{QueryContext, QueryType};
use crate::model::Model;
use crate::row::ExecResult;
use crate::session::Session;
use crate::value::Value;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// A raw statement whose rows decode into `T`.
///
/// The SQL is passed through unchanged, so it must already use the
/// session dialect's placeholders and quoting.
///
/// ```ignore
/// let users = RawQuerier::<User, _>::new(&db, "SELECT * FROM `user` WHERE `age` > ?")
///     .bind(18)
///     .get_multi()
///     .await?;
/// ```
#[must_use = "builders do nothing until built or executed"]
pub struct RawQuerier<'s, T, S> {
    session: &'s S,
    model: OnceLock<Arc<Model>>,
    sql: String,
    args: Vec<Value>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity, S: Session> RawQuerier<'s, T, S> {
    pub fn new(session: &'s S, sql: impl Into<String>) -> Self {
        Self {
            session,
            model: OnceLock::new(),
            sql: sql.into(),
            args: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Bind the next positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    fn context(&self) -> OrmResult<QueryContext<'_>> {
        let model = resolve_model::<T>(&self.model, self.session.core())?;
        Ok(QueryContext::new(QueryType::Raw, self, Arc::clone(model)))
    }

    pub async fn get(self) -> OrmResult<T> {
        let ctx = self.context()?;
        executor::get::<T, S>(self.session, &ctx).await
    }

    pub async fn get_multi(self) -> OrmResult<Vec<T>> {
        let ctx = self.context()?;
        executor::get_multi::<T, S>(self.session, &ctx).await
    }

    pub async fn exec(self) -> OrmResult<ExecResult> {
        let ctx = self.context()?;
        executor::exec(self.session, &ctx).await
    }
}

impl<T: Entity, S: Session> QueryBuilder for RawQuerier<'_, T, S> {
    fn build(&self) -> OrmResult<Query> {
        Ok(Query {
            sql: self.sql.clone(),
            args: self.args.clone(),
        })
    }
}
