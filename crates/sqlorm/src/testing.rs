//! In-memory connection for unit tests.

use crate::builder::Query;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::row::{ExecResult, Row};
use crate::session::{Connection, Db, Transaction};
use crate::value::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    statements: Vec<Query>,
    rows: Vec<Row>,
    rows_affected: u64,
}

/// Records every statement and answers queries with canned rows.
#[derive(Clone, Default)]
pub(crate) struct RecordingConnection {
    state: Arc<Mutex<State>>,
}

impl RecordingConnection {
    pub(crate) fn with_rows(rows: Vec<Row>) -> Self {
        let conn = Self::default();
        conn.state.lock().unwrap().rows = rows;
        conn
    }

    pub(crate) fn with_rows_affected(self, n: u64) -> Self {
        self.state.lock().unwrap().rows_affected = n;
        self
    }

    pub(crate) fn statements(&self) -> Vec<Query> {
        self.state.lock().unwrap().statements.clone()
    }

    fn record(&self, sql: &str, args: &[Value]) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(Query {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        state
    }
}

impl Connection for RecordingConnection {
    type Transaction = RecordingConnection;

    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        Ok(self.record(sql, args).rows.clone())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        Ok(ExecResult::new(self.record(sql, args).rows_affected))
    }

    async fn begin(&self) -> OrmResult<RecordingConnection> {
        Ok(self.clone())
    }
}

impl Transaction for RecordingConnection {
    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        Ok(self.record(sql, args).rows.clone())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        Ok(ExecResult::new(self.record(sql, args).rows_affected))
    }

    async fn commit(self) -> OrmResult<()> {
        Ok(())
    }

    async fn rollback(self) -> OrmResult<()> {
        Ok(())
    }
}

pub(crate) fn db(dialect: Dialect) -> Db<RecordingConnection> {
    Db::builder(RecordingConnection::default())
        .dialect(dialect)
        .build()
        .unwrap()
}

pub(crate) fn row(columns: &[&str], values: Vec<Value>) -> Row {
    let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
    Row::new(columns, values).unwrap()
}
