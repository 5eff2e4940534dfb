//! In-memory connection provider that records every statement it sees.

#![allow(dead_code)]

use rawdb::{Connection, ConnectionProvider, DbError, DbResult, FieldMap, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One statement as seen by a scripted connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
struct State {
    statements: Vec<Statement>,
    begins: usize,
    commits: usize,
    rollbacks: usize,
    acquired: usize,
    affected: VecDeque<u64>,
    rows: VecDeque<Vec<FieldMap>>,
    fail_next: Option<String>,
    fail_commit: Option<String>,
    fail_rollback: Option<String>,
    refuse_connections: bool,
}

/// Provider whose connections replay canned results.
///
/// Execute calls pop from the affected-count queue (default 1); fetch calls
/// pop from the row-set queue (default empty).
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<State>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_affected(&self, n: u64) -> &Self {
        self.state.lock().unwrap().affected.push_back(n);
        self
    }

    pub fn push_rows(&self, rows: Vec<FieldMap>) -> &Self {
        self.state.lock().unwrap().rows.push_back(rows);
        self
    }

    /// Make the next statement fail with an execution-side error.
    pub fn fail_next(&self, message: &str) -> &Self {
        self.state.lock().unwrap().fail_next = Some(message.to_string());
        self
    }

    /// Make the next COMMIT fail.
    pub fn fail_commit(&self, message: &str) -> &Self {
        self.state.lock().unwrap().fail_commit = Some(message.to_string());
        self
    }

    /// Make the next ROLLBACK fail.
    pub fn fail_rollback(&self, message: &str) -> &Self {
        self.state.lock().unwrap().fail_rollback = Some(message.to_string());
        self
    }

    pub fn refuse_connections(&self) -> &Self {
        self.state.lock().unwrap().refuse_connections = true;
        self
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.statements().last().map(|s| s.sql.clone())
    }

    pub fn begins(&self) -> usize {
        self.state.lock().unwrap().begins
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn acquired(&self) -> usize {
        self.state.lock().unwrap().acquired
    }
}

pub struct ScriptedConnection {
    state: Arc<Mutex<State>>,
}

impl ScriptedConnection {
    fn record(&self, sql: &str, params: &[Value]) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(Statement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match state.fail_next.take() {
            Some(message) => Err(DbError::Other(message)),
            None => Ok(()),
        }
    }
}

impl Connection for ScriptedConnection {
    async fn begin(&mut self) -> DbResult<()> {
        self.state.lock().unwrap().begins += 1;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.record(sql, params)?;
        Ok(self.state.lock().unwrap().affected.pop_front().unwrap_or(1))
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<FieldMap>> {
        self.record(sql, params)?;
        Ok(self.state.lock().unwrap().rows.pop_front().unwrap_or_default())
    }

    async fn commit(&mut self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_commit.take() {
            return Err(DbError::Other(message));
        }
        state.commits += 1;
        Ok(())
    }

    /// Counts every attempt, failed or not.
    async fn rollback(&mut self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.rollbacks += 1;
        match state.fail_rollback.take() {
            Some(message) => Err(DbError::Other(message)),
            None => Ok(()),
        }
    }
}

impl ConnectionProvider for ScriptedProvider {
    type Connection = ScriptedConnection;

    async fn acquire(&self) -> DbResult<ScriptedConnection> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connections {
            return Err(DbError::Connection("connection refused".to_string()));
        }
        state.acquired += 1;
        Ok(ScriptedConnection {
            state: Arc::clone(&self.state),
        })
    }
}

/// Build a result row from `column -> value` pairs.
pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> FieldMap {
    pairs.into_iter().collect()
}
