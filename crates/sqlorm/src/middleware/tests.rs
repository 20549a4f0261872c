use super::*;
use crate::error::OrmError;
use crate::expr::col;
use crate::session::{Db, Session};
use crate::testing::{RecordingConnection, row};
use crate::value::Value;
use crate::Entity;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
struct Account {
    id: i64,
    name: String,
}

/// Appends `<name>:before` / `<name>:after` around the rest of the chain.
struct Recorder {
    name: &'static str,
    events: Arc<Mutex<Vec<String>>>,
}

impl Middleware for Recorder {
    fn handle<'a>(
        &'a self,
        ctx: &'a QueryContext<'a>,
        next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            self.events.lock().unwrap().push(format!("{}:before", self.name));
            let result = next.run(ctx).await;
            self.events.lock().unwrap().push(format!("{}:after", self.name));
            result
        })
    }
}

/// Answers every statement itself.
struct ShortCircuit;

impl Middleware for ShortCircuit {
    fn handle<'a>(
        &'a self,
        _ctx: &'a QueryContext<'a>,
        _next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move { Ok(QueryOutput::Exec(ExecResult::new(42))) })
    }
}

fn account_row(id: i64, name: &str) -> crate::row::Row {
    row(&["id", "name"], vec![Value::Int(id), Value::Text(name.into())])
}

#[tokio::test]
async fn test_first_registered_is_outermost() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let db = Db::builder(RecordingConnection::with_rows(vec![account_row(1, "a")]))
        .middleware(Recorder {
            name: "outer",
            events: Arc::clone(&events),
        })
        .middleware(Recorder {
            name: "inner",
            events: Arc::clone(&events),
        })
        .build()
        .unwrap();

    let account = db.select::<Account>().get().await.unwrap();
    assert_eq!(account.id, 1);
    assert_eq!(
        *events.lock().unwrap(),
        vec!["outer:before", "inner:before", "inner:after", "outer:after"]
    );
}

#[tokio::test]
async fn test_short_circuit_skips_execution() {
    let conn = RecordingConnection::default();
    let db = Db::builder(conn.clone())
        .middleware(ShortCircuit)
        .build()
        .unwrap();

    let res = db
        .delete::<Account>()
        .filter([col("id").eq(1)])
        .exec()
        .await
        .unwrap();
    assert_eq!(res.rows_affected, 42);
    assert!(conn.statements().is_empty());
}

#[tokio::test]
async fn test_replaced_output_type_is_an_error() {
    let db = Db::builder(RecordingConnection::default())
        .middleware(ShortCircuit)
        .build()
        .unwrap();

    let err = db.select::<Account>().get().await.unwrap_err();
    assert!(matches!(err, OrmError::Other(_)));
}

#[tokio::test]
async fn test_query_log_fn_receives_sql_and_args() {
    let logged = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&logged);
    let conn = RecordingConnection::default().with_rows_affected(1);
    let db = Db::builder(conn.clone())
        .middleware(QueryLogMiddleware::new().log_fn(move |sql, args| {
            sink.lock().unwrap().push((sql.to_string(), args.to_vec()));
        }))
        .build()
        .unwrap();

    db.insert::<Account>()
        .values([Account {
            id: 7,
            name: "g".into(),
        }])
        .exec()
        .await
        .unwrap();

    let logged = logged.lock().unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].0, "INSERT INTO `account`(`id`,`name`) VALUES (?,?);");
    assert_eq!(logged[0].1, vec![Value::Int(7), Value::Text("g".into())]);
    assert_eq!(conn.statements().len(), 1);
}

#[tokio::test]
async fn test_query_log_stops_on_build_error() {
    let logged = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&logged);
    let conn = RecordingConnection::default();
    let db = Db::builder(conn.clone())
        .middleware(QueryLogMiddleware::new().log_fn(move |_, _| {
            *sink.lock().unwrap() += 1;
        }))
        .build()
        .unwrap();

    let err = db.delete::<Account>().exec().await.unwrap_err();
    assert!(err.is_delete_all());
    assert_eq!(*logged.lock().unwrap(), 0);
    assert!(conn.statements().is_empty());
}

#[tokio::test]
async fn test_stats_counts_by_kind_and_failures() {
    let stats = Arc::new(StatsMiddleware::new());
    let db = Db::builder(RecordingConnection::with_rows(vec![account_row(1, "a")]))
        .middleware(Arc::clone(&stats))
        .build()
        .unwrap();

    db.select::<Account>().get_multi().await.unwrap();
    db.insert::<Account>()
        .values([Account::default()])
        .exec()
        .await
        .unwrap();
    db.delete::<Account>().exec().await.unwrap_err();
    db.raw::<Account>("SELECT 1").get().await.unwrap();

    let s = stats.stats();
    assert_eq!(s.total_queries, 4);
    assert_eq!(s.failed_queries, 1);
    assert_eq!(s.select_count, 1);
    assert_eq!(s.insert_count, 1);
    assert_eq!(s.delete_count, 1);
    assert_eq!(s.raw_count, 1);
    assert!(s.max_duration <= s.total_duration);

    stats.reset();
    assert_eq!(stats.stats(), QueryStats::default());
}

#[tokio::test]
async fn test_stats_slow_query_threshold() {
    let stats = Arc::new(StatsMiddleware::new().with_slow_query_threshold(Duration::ZERO));
    let db = Db::builder(RecordingConnection::default())
        .middleware(Arc::clone(&stats))
        .build()
        .unwrap();

    db.select::<Account>().get_multi().await.unwrap();
    let s = stats.stats();
    assert_eq!(s.total_queries, 1);
    assert_eq!(s.slow_queries, 1);
}

#[tokio::test]
async fn test_tracing_middleware_passes_results_through() {
    let db = Db::builder(RecordingConnection::with_rows(vec![
        account_row(1, "a"),
        account_row(2, "b"),
    ]))
    .middleware(TracingMiddleware::new())
    .build()
    .unwrap();

    let accounts = db.select::<Account>().get_multi().await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[1].name, "b");
}

#[tokio::test]
async fn test_transaction_runs_the_same_chain() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let db = Db::builder(RecordingConnection::default())
        .middleware(Recorder {
            name: "m",
            events: Arc::clone(&events),
        })
        .build()
        .unwrap();

    let tx = db.begin().await.unwrap();
    tx.delete::<Account>()
        .filter([col("id").eq(1)])
        .exec()
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(*events.lock().unwrap(), vec!["m:before", "m:after"]);
}

#[test]
fn test_truncate_sql() {
    assert_eq!(truncate_sql("SELECT 1", None), "SELECT 1");
    assert_eq!(truncate_sql("SELECT 1", Some(100)), "SELECT 1");
    assert_eq!(truncate_sql("SELECT 1", Some(6)), "SELECT...");
    // Never split a multi-byte character.
    assert_eq!(truncate_sql("é", Some(1)), "...");
}

#[test]
fn test_query_type_display() {
    assert_eq!(QueryType::Select.to_string(), "SELECT");
    assert_eq!(QueryType::Raw.as_str(), "RAW");
}
