//! What the built-in middlewares write to `tracing`.

mod common;

use common::MockConnection;
use sqlorm::{
    Db, DbConfig, Entity, QueryLogMiddleware, Session, TracingMiddleware, col,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::subscriber::DefaultGuard;

#[derive(Debug, Default, Entity)]
struct Account {
    id: i64,
    owner: String,
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's events into a buffer.
fn capture() -> (Capture, DefaultGuard) {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

#[tokio::test]
async fn query_log_writes_sql_and_args() {
    let (out, _guard) = capture();
    let db = Db::builder(MockConnection::new())
        .middleware(QueryLogMiddleware::new())
        .build()
        .unwrap();

    db.select::<Account>()
        .filter([col("owner").eq("ann")])
        .get_multi()
        .await
        .unwrap();

    let logs = out.contents();
    assert!(logs.contains("sqlorm.sql"), "{logs}");
    assert!(logs.contains("SELECT * FROM `account` WHERE `owner` = ?;"), "{logs}");
    assert!(logs.contains("query_type=SELECT"), "{logs}");
    assert!(logs.contains("Text(\"ann\")"), "{logs}");
}

#[tokio::test]
async fn query_log_truncates_long_sql() {
    let (out, _guard) = capture();
    let db = Db::builder(MockConnection::new())
        .middleware(QueryLogMiddleware::new().max_sql_length(10))
        .build()
        .unwrap();

    db.select::<Account>().get_multi().await.unwrap();

    let logs = out.contents();
    assert!(logs.contains("sql=SELECT * F..."), "{logs}");
    assert!(!logs.contains("`account`;"), "{logs}");
}

#[tokio::test]
async fn query_log_warns_on_build_failure() {
    let (out, _guard) = capture();
    let db = Db::builder(MockConnection::new())
        .middleware(QueryLogMiddleware::new())
        .build()
        .unwrap();

    db.delete::<Account>().exec().await.unwrap_err();

    let logs = out.contents();
    assert!(logs.contains("WARN"), "{logs}");
    assert!(logs.contains("failed to build statement"), "{logs}");
}

#[tokio::test]
async fn tracing_span_names_statement_and_table() {
    let (out, _guard) = capture();
    let db = Db::builder(MockConnection::new())
        .middleware(TracingMiddleware::new())
        .middleware(QueryLogMiddleware::new())
        .build()
        .unwrap();

    db.delete::<Account>()
        .filter([col("id").eq(1)])
        .exec()
        .await
        .unwrap();

    let logs = out.contents();
    assert!(logs.contains("sqlorm.query"), "{logs}");
    assert!(logs.contains("DELETE_account"), "{logs}");
}

#[tokio::test]
async fn slow_queries_are_warned_about() {
    let (out, _guard) = capture();
    let config = DbConfig::new().with_slow_query_threshold(Duration::from_millis(5));
    let conn = MockConnection::new().delay(Duration::from_millis(30));
    let db = Db::builder(conn).config(&config).build().unwrap();

    db.select::<Account>().get_multi().await.unwrap();

    let logs = out.contents();
    assert!(logs.contains("slow query"), "{logs}");
    assert!(logs.contains("sqlorm.slow_query"), "{logs}");
    assert_eq!(db.stats().unwrap().slow_queries, 1);
}
