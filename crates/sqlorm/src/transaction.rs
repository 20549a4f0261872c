//! Transactions and the closure-scoped `do_tx` helper.
//!
//! ```ignore
//! use sqlorm::{Session, col};
//! use futures_util::FutureExt;
//!
//! let moved = db
//!     .do_tx(|tx| {
//!         async move {
//!             tx.insert::<Order>().values([order]).exec().await?;
//!             tx.delete::<Cart>().filter([col("user_id").eq(7)]).exec().await
//!         }
//!         .boxed()
//!     })
//!     .await?;
//! ```

use crate::builder::Query;
use crate::error::{OrmError, OrmResult};
use crate::row::{ExecResult, Row};
use crate::session::{Connection, Core, Db, Session, Transaction};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// A transaction session sharing the core of the [`Db`] that began it.
///
/// Dropping a `Tx` without calling [`commit`](Tx::commit) or
/// [`rollback`](Tx::rollback) leaves the outcome to the driver.
pub struct Tx<X> {
    tx: X,
    core: Arc<Core>,
}

impl<X: Transaction> Tx<X> {
    pub(crate) fn new(tx: X, core: Arc<Core>) -> Self {
        Self { tx, core }
    }

    pub async fn commit(self) -> OrmResult<()> {
        self.tx.commit().await?;
        debug!(target: "sqlorm.tx", "transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> OrmResult<()> {
        let result = self.tx.rollback().await;
        match &result {
            Ok(()) => warn!(target: "sqlorm.tx", "transaction rolled back"),
            Err(err) => warn!(target: "sqlorm.tx", error = %err, "transaction rollback failed"),
        }
        result
    }
}

impl<X> fmt::Debug for Tx<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx").field("core", &self.core).finish_non_exhaustive()
    }
}

impl<X: Transaction> Session for Tx<X> {
    fn core(&self) -> &Core {
        &self.core
    }

    fn query(&self, query: &Query) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        self.tx.query(&query.sql, &query.args)
    }

    fn execute(&self, query: &Query) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        self.tx.execute(&query.sql, &query.args)
    }
}

impl<C: Connection> Db<C> {
    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`. When `f` returns `Err` or panics, the
    /// transaction is rolled back and the result is
    /// [`OrmError::Transaction`], naming the original failure, the rollback
    /// outcome and whether a panic occurred. A failed commit is returned as is.
    pub async fn do_tx<R, F>(&self, f: F) -> OrmResult<R>
    where
        F: for<'t> FnOnce(&'t Tx<C::Transaction>) -> BoxFuture<'t, OrmResult<R>>,
    {
        let tx = self.begin().await?;
        let outcome = AssertUnwindSafe(async { f(&tx).await })
            .catch_unwind()
            .await;

        let (source, panicked) = match outcome {
            Ok(Ok(value)) => {
                tx.commit().await?;
                return Ok(value);
            }
            Ok(Err(err)) => (err, false),
            Err(payload) => (OrmError::Panic(panic_message(payload.as_ref())), true),
        };

        let rollback = tx.rollback().await.err().map(Box::new);
        Err(OrmError::Transaction {
            source: Box::new(source),
            rollback,
            panicked,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
