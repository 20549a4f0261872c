use super::{Middleware, Next, QueryContext, QueryOutput, QueryResult};
use futures_util::future::BoxFuture;
use tracing::field::Empty;
use tracing::{Instrument, Level};

/// Runs the rest of the chain inside a `tracing` span.
///
/// The span is named `sqlorm.query` and carries `otel.name` as
/// `<TYPE>_<table>` (for example `SELECT_user`), so OpenTelemetry layers
/// name it per statement kind and table. Failures are recorded in the
/// `error` field.
#[derive(Debug, Clone)]
pub struct TracingMiddleware {
    level: Level,
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl TracingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Span level. Only `INFO`, `DEBUG` and `TRACE` are distinguished;
    /// higher levels use `INFO`.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    fn span(&self, ctx: &QueryContext<'_>) -> tracing::Span {
        let name = format!("{}_{}", ctx.query_type, ctx.table_name());
        macro_rules! span_at {
            ($mac:ident) => {
                tracing::$mac!(
                    "sqlorm.query",
                    otel.name = %name,
                    query_type = %ctx.query_type,
                    table = ctx.table_name(),
                    rows_affected = Empty,
                    error = Empty,
                )
            };
        }
        match self.level {
            Level::TRACE => span_at!(trace_span),
            Level::DEBUG => span_at!(debug_span),
            _ => span_at!(info_span),
        }
    }
}

impl Middleware for TracingMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a QueryContext<'a>,
        next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        let span = self.span(ctx);
        Box::pin(async move {
            let result = next.run(ctx).instrument(span.clone()).await;
            match &result {
                Ok(QueryOutput::Exec(res)) => {
                    span.record("rows_affected", res.rows_affected);
                }
                Ok(QueryOutput::Decoded(_)) => {}
                Err(err) => {
                    span.record("error", tracing::field::display(err));
                }
            }
            result
        })
    }
}
