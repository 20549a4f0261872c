use super::{Middleware, Next, QueryContext, QueryResult, QueryType};
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Collected query statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub total_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub delete_count: u64,
    pub raw_count: u64,
    /// Slowest statement duration.
    pub max_duration: Duration,
    /// Statements slower than the slow-query threshold.
    pub slow_queries: u64,
}

/// Counts statements per kind, failures and durations.
///
/// With a slow-query threshold set, statements that take longer are logged
/// at `WARN` on the `sqlorm.slow_query` target.
#[derive(Debug, Default)]
pub struct StatsMiddleware {
    slow_query_threshold: Option<Duration>,
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    total_duration_nanos: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    delete_count: AtomicU64,
    raw_count: AtomicU64,
    max_duration_nanos: AtomicU64,
    slow_queries: AtomicU64,
}

impl StatsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Snapshot of the current counters.
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            raw_count: self.raw_count.load(Ordering::Relaxed),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            slow_queries: self.slow_queries.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.failed_queries,
            &self.total_duration_nanos,
            &self.select_count,
            &self.insert_count,
            &self.delete_count,
            &self.raw_count,
            &self.max_duration_nanos,
            &self.slow_queries,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn record(&self, ctx: &QueryContext<'_>, duration: Duration, failed: bool) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        let prev_total = self.total_duration_nanos.fetch_add(nanos, Ordering::Relaxed);
        if prev_total.checked_add(nanos).is_none() {
            // Saturate instead of wrapping.
            self.total_duration_nanos.store(u64::MAX, Ordering::Relaxed);
        }

        let counter = match ctx.query_type {
            QueryType::Select => &self.select_count,
            QueryType::Insert => &self.insert_count,
            QueryType::Delete => &self.delete_count,
            QueryType::Raw => &self.raw_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if failed {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }
        self.max_duration_nanos.fetch_max(nanos, Ordering::Relaxed);

        if let Some(threshold) = self.slow_query_threshold {
            if duration > threshold {
                self.slow_queries.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: "sqlorm.slow_query",
                    query_type = %ctx.query_type,
                    table = ctx.table_name(),
                    duration_ms = duration.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    "slow query"
                );
            }
        }
    }
}

impl Middleware for StatsMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a QueryContext<'a>,
        next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let start = Instant::now();
            let result = next.run(ctx).await;
            self.record(ctx, start.elapsed(), result.is_err());
            result
        })
    }
}
