//! Scripted driver shared by the integration tests.

#![allow(dead_code)]

use sqlorm::{Connection, ExecResult, OrmError, OrmResult, Row, Transaction, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned answer to one statement.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(Vec<Row>),
    Exec(ExecResult),
    Fail(&'static str),
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    log: Vec<String>,
    args: Vec<Vec<Value>>,
    delay: Option<Duration>,
    fail_commit: bool,
    fail_rollback: bool,
}

/// A connection that answers from a script and logs everything it is asked.
///
/// Statements without a scripted reply get an empty row set or zero rows
/// affected.
#[derive(Clone, Default)]
pub struct MockConnection {
    script: Arc<Mutex<Script>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.script.lock().unwrap().replies.push_back(reply);
        self
    }

    pub fn delay(self, delay: Duration) -> Self {
        self.script.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn fail_commit(self) -> Self {
        self.script.lock().unwrap().fail_commit = true;
        self
    }

    pub fn fail_rollback(self) -> Self {
        self.script.lock().unwrap().fail_rollback = true;
        self
    }

    /// Everything the driver saw, in order: SQL text, `BEGIN`, `COMMIT`, `ROLLBACK`.
    pub fn log(&self) -> Vec<String> {
        self.script.lock().unwrap().log.clone()
    }

    /// Arguments of each statement, in order.
    pub fn args(&self) -> Vec<Vec<Value>> {
        self.script.lock().unwrap().args.clone()
    }

    fn push_log(&self, entry: &str) {
        self.script.lock().unwrap().log.push(entry.to_string());
    }

    async fn next_reply(&self, sql: &str, args: &[Value]) -> Option<Reply> {
        let (reply, delay) = {
            let mut script = self.script.lock().unwrap();
            script.log.push(sql.to_string());
            script.args.push(args.to_vec());
            (script.replies.pop_front(), script.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    async fn run_query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        match self.next_reply(sql, args).await {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(msg)) => Err(OrmError::driver(msg)),
            Some(Reply::Exec(_)) => Err(OrmError::driver("scripted exec reply for a query")),
            None => Ok(Vec::new()),
        }
    }

    async fn run_execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        match self.next_reply(sql, args).await {
            Some(Reply::Exec(res)) => Ok(res),
            Some(Reply::Fail(msg)) => Err(OrmError::driver(msg)),
            Some(Reply::Rows(_)) => Err(OrmError::driver("scripted rows reply for an exec")),
            None => Ok(ExecResult::new(0)),
        }
    }
}

impl Connection for MockConnection {
    type Transaction = MockTransaction;

    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.run_query(sql, args).await
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.run_execute(sql, args).await
    }

    async fn begin(&self) -> OrmResult<MockTransaction> {
        self.push_log("BEGIN");
        Ok(MockTransaction { conn: self.clone() })
    }
}

/// Transaction over the same script as the connection that began it.
pub struct MockTransaction {
    conn: MockConnection,
}

impl Transaction for MockTransaction {
    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.conn.run_query(sql, args).await
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.conn.run_execute(sql, args).await
    }

    async fn commit(self) -> OrmResult<()> {
        self.conn.push_log("COMMIT");
        if self.conn.script.lock().unwrap().fail_commit {
            return Err(OrmError::driver("commit failed"));
        }
        Ok(())
    }

    async fn rollback(self) -> OrmResult<()> {
        self.conn.push_log("ROLLBACK");
        if self.conn.script.lock().unwrap().fail_rollback {
            return Err(OrmError::driver("rollback failed"));
        }
        Ok(())
    }
}

/// Build a row from column names and values.
pub fn row(columns: &[&str], values: Vec<Value>) -> Row {
    let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
    Row::new(columns, values).unwrap()
}
