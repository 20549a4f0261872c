//! Sessions: the driver boundary, the shared core and the `Db` handle.
//!
//! The database driver is an external collaborator. It plugs in by
//! implementing [`Connection`] (and its [`Transaction`] type); everything
//! above it (builders, middlewares, decoding) is driver-independent.
//!
//! ```ignore
//! use sqlorm::{Db, Dialect, QueryLogMiddleware, Session};
//!
//! let db = Db::builder(conn)
//!     .dialect(Dialect::Sqlite)
//!     .middleware(QueryLogMiddleware::new())
//!     .build()?;
//!
//! let user = db.select::<User>().filter([col("id").eq(1)]).get().await?;
//! ```

use crate::builder::{Deleter, Inserter, Query, RawQuerier, Selector};
use crate::config::DbConfig;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::middleware::{Middleware, QueryStats, StatsMiddleware};
use crate::model::{ModelOption, Registry};
use crate::row::{ExecResult, Row};
use crate::transaction::Tx;
use crate::valuer::Creator;
use crate::value::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A database connection provided by a driver.
pub trait Connection: Send + Sync {
    type Transaction: Transaction;

    /// Run a statement that returns rows.
    fn query(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Run a statement that returns no rows.
    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send;

    /// Start a transaction.
    fn begin(&self) -> impl Future<Output = OrmResult<Self::Transaction>> + Send;
}

/// A transaction provided by a driver.
pub trait Transaction: Send + Sync {
    fn query(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send;

    fn commit(self) -> impl Future<Output = OrmResult<()>> + Send;

    fn rollback(self) -> impl Future<Output = OrmResult<()>> + Send;
}

/// Registry, dialect, value strategy and middlewares shared by a [`Db`] and
/// its transactions.
pub struct Core {
    registry: Registry,
    dialect: Dialect,
    creator: Creator,
    middlewares: Vec<Arc<dyn Middleware>>,
    query_timeout: Option<Duration>,
    stats: Option<Arc<StatsMiddleware>>,
}

impl Core {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn creator(&self) -> Creator {
        self.creator
    }

    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }
}

impl Default for Core {
    fn default() -> Self {
        Self {
            registry: Registry::new(),
            dialect: Dialect::default(),
            creator: Creator::default(),
            middlewares: Vec::new(),
            query_timeout: None,
            stats: None,
        }
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("dialect", &self.dialect)
            .field("creator", &self.creator)
            .field("middlewares", &self.middlewares.len())
            .field("query_timeout", &self.query_timeout)
            .field("models", &self.registry.len())
            .finish()
    }
}

/// Something statements can run against: a [`Db`] or a [`Tx`].
pub trait Session: Send + Sync {
    fn core(&self) -> &Core;

    fn query(&self, query: &Query) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    fn execute(&self, query: &Query) -> impl Future<Output = OrmResult<ExecResult>> + Send;

    fn select<T: Entity>(&self) -> Selector<'_, T, Self>
    where
        Self: Sized,
    {
        Selector::new(self)
    }

    fn insert<T: Entity>(&self) -> Inserter<'_, T, Self>
    where
        Self: Sized,
    {
        Inserter::new(self)
    }

    fn delete<T: Entity>(&self) -> Deleter<'_, T, Self>
    where
        Self: Sized,
    {
        Deleter::new(self)
    }

    fn raw<T: Entity>(&self, sql: impl Into<String>) -> RawQuerier<'_, T, Self>
    where
        Self: Sized,
    {
        RawQuerier::new(self, sql)
    }
}

/// A database handle: a driver connection plus the shared [`Core`].
pub struct Db<C> {
    conn: C,
    core: Arc<Core>,
}

impl<C: Connection> Db<C> {
    /// Open with defaults: MySQL dialect, reflective value access, no middlewares.
    pub fn open(conn: C) -> Self {
        Self {
            conn,
            core: Arc::new(Core::default()),
        }
    }

    pub fn builder(conn: C) -> DbBuilder<C> {
        DbBuilder {
            conn,
            core: Core::default(),
            options: Vec::new(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn registry(&self) -> &Registry {
        &self.core.registry
    }

    /// Counters of the statistics middleware installed by
    /// [`DbConfig::slow_query_threshold`], if any.
    pub fn stats(&self) -> Option<QueryStats> {
        self.core.stats.as_ref().map(|s| s.stats())
    }

    /// Start a transaction sharing this handle's core.
    pub async fn begin(&self) -> OrmResult<Tx<C::Transaction>> {
        let tx = self.conn.begin().await?;
        debug!(target: "sqlorm.tx", "transaction started");
        Ok(Tx::new(tx, Arc::clone(&self.core)))
    }
}

impl<C> fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db").field("core", &self.core).finish_non_exhaustive()
    }
}

impl<C: Connection> Session for Db<C> {
    fn core(&self) -> &Core {
        &self.core
    }

    fn query(&self, query: &Query) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        self.conn.query(&query.sql, &query.args)
    }

    fn execute(&self, query: &Query) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        self.conn.execute(&query.sql, &query.args)
    }
}

/// Configures a [`Db`].
#[must_use = "call `build` to get a Db"]
pub struct DbBuilder<C> {
    conn: C,
    core: Core,
    options: Vec<(fn(&Registry, Vec<ModelOption>) -> OrmResult<()>, Vec<ModelOption>)>,
}

impl<C: Connection> DbBuilder<C> {
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.core.dialect = dialect;
        self
    }

    pub fn creator(mut self, creator: Creator) -> Self {
        self.core.creator = creator;
        self
    }

    /// Append a middleware. The first one appended is the outermost.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.core.middlewares.push(Arc::new(middleware));
        self
    }

    /// Fail statements that take longer than `timeout` with `OrmError::Timeout`.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.core.query_timeout = Some(timeout);
        self
    }

    /// Register `T` with options when the handle is built.
    pub fn register<T: Entity>(mut self, options: impl IntoIterator<Item = ModelOption>) -> Self {
        fn register<T: Entity>(registry: &Registry, options: Vec<ModelOption>) -> OrmResult<()> {
            registry.register::<T>(options).map(|_| ())
        }
        self.options
            .push((register::<T>, options.into_iter().collect()));
        self
    }

    /// Apply a loaded configuration.
    pub fn config(mut self, config: &DbConfig) -> Self {
        self.core.dialect = config.dialect;
        self.core.creator = config.creator;
        self.core.query_timeout = config.query_timeout;
        if let Some(threshold) = config.slow_query_threshold {
            let stats = Arc::new(StatsMiddleware::new().with_slow_query_threshold(threshold));
            self.core.middlewares.push(Arc::clone(&stats) as Arc<dyn Middleware>);
            self.core.stats = Some(stats);
        }
        self
    }

    /// Build the handle. Fails if a registration requested with
    /// [`DbBuilder::register`] fails.
    pub fn build(self) -> OrmResult<Db<C>> {
        for (register, options) in self.options {
            register(&self.core.registry, options)?;
        }
        debug!(
            dialect = ?self.core.dialect,
            creator = ?self.core.creator,
            middlewares = self.core.middlewares.len(),
            "database handle ready"
        );
        Ok(Db {
            conn: self.conn,
            core: Arc::new(self.core),
        })
    }
}
