use super::{Middleware, Next, QueryContext, QueryResult, truncate_sql};
use crate::value::Value;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Custom sink for logged statements.
pub type LogFn = Arc<dyn Fn(&str, &[Value]) + Send + Sync>;

/// Logs every statement's SQL and arguments before it runs.
///
/// Events go to the `sqlorm.sql` target at the configured level, unless a
/// custom [`LogFn`] is installed. A statement that fails to build is logged
/// and its error returned without running the rest of the chain.
#[derive(Clone)]
pub struct QueryLogMiddleware {
    level: Level,
    max_sql_length: Option<usize>,
    log_fn: Option<LogFn>,
}

impl Default for QueryLogMiddleware {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            log_fn: None,
        }
    }
}

impl fmt::Debug for QueryLogMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryLogMiddleware")
            .field("level", &self.level)
            .field("max_sql_length", &self.max_sql_length)
            .field("log_fn", &self.log_fn.is_some())
            .finish()
    }
}

impl QueryLogMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Truncate SQL longer than `len` bytes.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Send statements to `f` instead of `tracing`.
    pub fn log_fn(mut self, f: impl Fn(&str, &[Value]) + Send + Sync + 'static) -> Self {
        self.log_fn = Some(Arc::new(f));
        self
    }

    fn emit(&self, ctx: &QueryContext<'_>, sql: &str, args: &[Value]) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN => tracing::warn!($($field)*),
                    Level::INFO => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        if let Some(log_fn) = &self.log_fn {
            log_fn(sql, args);
            return;
        }
        let sql = truncate_sql(sql, self.max_sql_length);
        emit_at_level!(
            self.level,
            target: "sqlorm.sql",
            query_type = %ctx.query_type,
            table = ctx.table_name(),
            arg_count = args.len(),
            args = ?args,
            sql = %sql,
        );
    }
}

impl Middleware for QueryLogMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a QueryContext<'a>,
        next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let query = match ctx.builder.build() {
                Ok(query) => query,
                Err(err) => {
                    tracing::warn!(
                        target: "sqlorm.sql",
                        query_type = %ctx.query_type,
                        table = ctx.table_name(),
                        error = %err,
                        "failed to build statement"
                    );
                    return Err(err);
                }
            };
            self.emit(ctx, &query.sql, &query.args);
            next.run(ctx).await
        })
    }
}
