//! Transaction lifecycle: explicit begin/commit/rollback and `do_tx`.

mod common;

use common::{MockConnection, Reply, row};
use futures_util::FutureExt;
use sqlorm::{Db, Entity, ExecResult, OrmError, Session, Value, col};

#[derive(Debug, Default, Clone, PartialEq, Entity)]
struct Account {
    id: i64,
    balance: i64,
}

fn account(id: i64, balance: i64) -> Account {
    Account { id, balance }
}

#[tokio::test]
async fn explicit_commit() {
    let conn = MockConnection::new().reply(Reply::Exec(ExecResult::new(1)));
    let db = Db::open(conn.clone());

    let tx = db.begin().await.unwrap();
    tx.insert::<Account>()
        .values([account(1, 100)])
        .exec()
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        conn.log(),
        vec![
            "BEGIN",
            "INSERT INTO `account`(`id`,`balance`) VALUES (?,?);",
            "COMMIT",
        ]
    );
}

#[tokio::test]
async fn explicit_rollback() {
    let conn = MockConnection::new();
    let db = Db::open(conn.clone());

    let tx = db.begin().await.unwrap();
    tx.delete::<Account>()
        .filter([col("id").eq(1)])
        .exec()
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(conn.log().last().map(String::as_str), Some("ROLLBACK"));
}

#[tokio::test]
async fn do_tx_commits_on_success() {
    let conn = MockConnection::new()
        .reply(Reply::Rows(vec![row(
            &["id", "balance"],
            vec![Value::Int(1), Value::Int(100)],
        )]))
        .reply(Reply::Exec(ExecResult::new(1)));
    let db = Db::open(conn.clone());

    let balance = db
        .do_tx(|tx| {
            async move {
                let acc = tx
                    .select::<Account>()
                    .filter([col("id").eq(1)])
                    .get()
                    .await?;
                tx.insert::<Account>()
                    .values([account(2, acc.balance)])
                    .exec()
                    .await?;
                Ok(acc.balance)
            }
            .boxed()
        })
        .await
        .unwrap();

    assert_eq!(balance, 100);
    let log = conn.log();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
    assert_eq!(log.len(), 4);
}

#[tokio::test]
async fn do_tx_rolls_back_on_error() {
    let conn = MockConnection::new();
    let db = Db::open(conn.clone());

    let err = db
        .do_tx(|tx| {
            async move {
                tx.select::<Account>().get().await?;
                Ok(())
            }
            .boxed()
        })
        .await
        .unwrap_err();

    match err {
        OrmError::Transaction {
            source,
            rollback,
            panicked,
        } => {
            assert!(source.is_no_rows());
            assert!(rollback.is_none());
            assert!(!panicked);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(conn.log().last().map(String::as_str), Some("ROLLBACK"));
}

#[tokio::test]
async fn do_tx_rolls_back_on_panic() {
    let conn = MockConnection::new();
    let db = Db::open(conn.clone());

    let err = db
        .do_tx(|_tx| {
            async move {
                if true {
                    panic!("boom");
                }
                Ok(())
            }
            .boxed()
        })
        .await
        .unwrap_err();

    match err {
        OrmError::Transaction {
            source, panicked, ..
        } => {
            assert!(panicked);
            assert!(matches!(*source, OrmError::Panic(ref msg) if msg == "boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(conn.log(), vec!["BEGIN", "ROLLBACK"]);
}

#[tokio::test]
async fn do_tx_rolls_back_when_closure_panics_before_returning() {
    let conn = MockConnection::new();
    let db = Db::open(conn.clone());

    let err = db
        .do_tx(|_tx| {
            if true {
                panic!("sync boom");
            }
            async move { Ok(()) }.boxed()
        })
        .await
        .unwrap_err();

    match err {
        OrmError::Transaction {
            source,
            rollback,
            panicked,
        } => {
            assert!(panicked);
            assert!(rollback.is_none());
            assert!(matches!(*source, OrmError::Panic(ref msg) if msg == "sync boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(conn.log(), vec!["BEGIN", "ROLLBACK"]);
}

#[tokio::test]
async fn do_tx_reports_failed_rollback() {
    let conn = MockConnection::new().fail_rollback();
    let db = Db::open(conn.clone());

    let err = db
        .do_tx(|_tx| async move { Err::<(), _>(OrmError::validation("nope")) }.boxed())
        .await
        .unwrap_err();

    match &err {
        OrmError::Transaction {
            source, rollback, ..
        } => {
            assert!(matches!(**source, OrmError::Validation(_)));
            let rollback = rollback.as_ref().expect("rollback error recorded");
            assert_eq!(rollback.to_string(), "rollback failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("rollback: failed: rollback failed"));
}

#[tokio::test]
async fn do_tx_returns_commit_failure() {
    let conn = MockConnection::new().fail_commit();
    let db = Db::open(conn.clone());

    let err = db
        .do_tx(|_tx| async move { Ok(()) }.boxed())
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Driver(_)));
    assert_eq!(conn.log(), vec!["BEGIN", "COMMIT"]);
}
