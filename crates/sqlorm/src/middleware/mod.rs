//! Middleware pipeline wrapped around every statement execution.
//!
//! Middlewares run in registration order: the first one registered sees the
//! call first and the result last. Each receives a [`QueryContext`] and a
//! [`Next`] that continues the chain; the end of the chain compiles the
//! statement, runs it against the session and decodes the result.
//!
//! ```rust,ignore
//! use sqlorm::middleware::{Middleware, Next, QueryContext, QueryResult};
//! use futures_util::future::BoxFuture;
//!
//! struct Audit;
//!
//! impl Middleware for Audit {
//!     fn handle<'a>(&'a self, ctx: &'a QueryContext<'a>, next: Next<'a>) -> BoxFuture<'a, QueryResult> {
//!         Box::pin(async move {
//!             println!("{} on {}", ctx.query_type, ctx.table_name());
//!             next.run(ctx).await
//!         })
//!     }
//! }
//!
//! let db = Db::builder(conn).middleware(Audit).build()?;
//! ```

mod query_log;
mod stats;
mod trace;

#[cfg(test)]
mod tests;

pub use query_log::{LogFn, QueryLogMiddleware};
pub use stats::{QueryStats, StatsMiddleware};
pub use trace::TracingMiddleware;

use crate::builder::QueryBuilder;
use crate::error::OrmResult;
use crate::model::Model;
use crate::row::ExecResult;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The kind of statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Delete,
    /// Hand-written SQL from [`RawQuerier`](crate::RawQuerier).
    Raw,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Select => "SELECT",
            QueryType::Insert => "INSERT",
            QueryType::Delete => "DELETE",
            QueryType::Raw => "RAW",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a middleware gets to see about a statement.
///
/// The builder is shared read-only; calling `build` again yields the same
/// query the end of the chain will run.
pub struct QueryContext<'a> {
    pub query_type: QueryType,
    pub builder: &'a dyn QueryBuilder,
    pub model: Arc<Model>,
}

impl<'a> QueryContext<'a> {
    pub fn new(query_type: QueryType, builder: &'a dyn QueryBuilder, model: Arc<Model>) -> Self {
        Self {
            query_type,
            builder,
            model,
        }
    }

    pub fn table_name(&self) -> &str {
        self.model.table_name()
    }
}

impl fmt::Debug for QueryContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("query_type", &self.query_type)
            .field("table", &self.table_name())
            .finish_non_exhaustive()
    }
}

/// Successful outcome of a statement.
pub enum QueryOutput {
    /// Decoded rows; an entity for `get`, a `Vec` of entities for `get_multi`.
    Decoded(Box<dyn Any + Send>),
    /// Outcome of a statement without rows.
    Exec(ExecResult),
}

impl fmt::Debug for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutput::Decoded(_) => f.write_str("Decoded(..)"),
            QueryOutput::Exec(res) => f.debug_tuple("Exec").field(res).finish(),
        }
    }
}

pub type QueryResult = OrmResult<QueryOutput>;

/// A wrapper around statement execution.
pub trait Middleware: Send + Sync {
    fn handle<'a>(&'a self, ctx: &'a QueryContext<'a>, next: Next<'a>)
    -> BoxFuture<'a, QueryResult>;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle<'a>(
        &'a self,
        ctx: &'a QueryContext<'a>,
        next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        (**self).handle(ctx, next)
    }
}

/// The end of the chain.
pub(crate) trait Handler: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a QueryContext<'a>) -> BoxFuture<'a, QueryResult>;
}

/// The rest of the chain after the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(middlewares: &'a [Arc<dyn Middleware>], handler: &'a dyn Handler) -> Self {
        Self {
            middlewares,
            handler,
        }
    }

    /// Continue with the next middleware, or execute the statement.
    pub fn run(self, ctx: &'a QueryContext<'a>) -> BoxFuture<'a, QueryResult> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.handle(
                ctx,
                Next {
                    middlewares: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.call(ctx),
        }
    }

    /// Number of middlewares left before the statement executes.
    pub fn remaining(&self) -> usize {
        self.middlewares.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

pub(crate) fn truncate_sql(sql: &str, max_bytes: Option<usize>) -> String {
    match max_bytes {
        Some(max) if sql.len() > max => {
            let mut end = max;
            while end > 0 && !sql.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &sql[..end])
        }
        _ => sql.to_string(),
    }
}
