//! Single-statement transaction scope.
//!
//! Every write (and every staged read) runs through a [`TransactionScope`]:
//!
//! - acquire a connection from the provider and `BEGIN`,
//! - run exactly one statement,
//! - `COMMIT` on success, `ROLLBACK` on failure and re-surface the error,
//! - release the connection on every exit path.
//!
//! # Example
//!
//! ```ignore
//! use rawdb::{TransactionScope, ExecMode};
//!
//! let affected = TransactionScope::new(&provider)
//!     .execute("update usuarios set email = NULL where name = 'test';", &[])
//!     .await?;
//! ```

use crate::client::{Connection, ConnectionProvider};
use crate::error::{DbError, DbResult};
use crate::row::FieldMap;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Maximum statement length (in bytes) emitted to the log.
const MAX_LOGGED_SQL: usize = 200;

/// How a statement is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Raw execution; yields the affected-row count.
    Execute,
    /// Query-fetch; yields the full row set.
    Fetch,
}

impl FromStr for ExecMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sql" | "execute" => Ok(ExecMode::Execute),
            "as_pd" | "fetch" => Ok(ExecMode::Fetch),
            other => Err(DbError::ModeOperator(format!(
                "mode read in method is not 'sql' or 'as_pd': '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecMode::Execute => f.write_str("execute"),
            ExecMode::Fetch => f.write_str("fetch"),
        }
    }
}

/// Raw result of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rows affected by an `Execute`.
    Affected(u64),
    /// Rows returned by a `Fetch`.
    Rows(Vec<FieldMap>),
}

/// Wraps exactly one statement in a transaction.
pub struct TransactionScope<'p, P> {
    provider: &'p P,
}

impl<'p, P: ConnectionProvider> TransactionScope<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self { provider }
    }

    /// Execute a statement and return the affected-row count.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        match self.run(ExecMode::Execute, sql, params).await? {
            Outcome::Affected(n) => Ok(n),
            Outcome::Rows(rows) => Ok(rows.len() as u64),
        }
    }

    /// Execute a query and return every row.
    pub async fn fetch(&self, sql: &str, params: &[Value]) -> DbResult<Vec<FieldMap>> {
        match self.run(ExecMode::Fetch, sql, params).await? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Affected(_) => Ok(Vec::new()),
        }
    }

    /// Acquire, begin, run one statement, then commit or roll back.
    ///
    /// The connection is dropped (released) before this returns, whatever the
    /// outcome.
    pub async fn run(&self, mode: ExecMode, sql: &str, params: &[Value]) -> DbResult<Outcome> {
        let mut conn = self.provider.acquire().await?;
        conn.begin().await?;

        tracing::debug!(
            target: "rawdb.sql",
            %mode,
            param_count = params.len(),
            sql = %truncate_sql_bytes(sql, MAX_LOGGED_SQL),
        );

        let result = match mode {
            ExecMode::Execute => conn.execute(sql, params).await.map(Outcome::Affected),
            ExecMode::Fetch => conn.fetch(sql, params).await.map(Outcome::Rows),
        };

        match result {
            Ok(outcome) => match conn.commit().await {
                Ok(()) => {
                    tracing::trace!(target: "rawdb.sql", %mode, "committed");
                    Ok(outcome)
                }
                Err(error) => Err(rollback(&mut conn, error).await),
            },
            Err(error) => Err(rollback(&mut conn, error).await),
        }
    }
}

/// Roll back after `error`, folding a rollback failure into the returned error.
async fn rollback<C: Connection>(conn: &mut C, error: DbError) -> DbError {
    tracing::warn!(target: "rawdb.sql", %error, "statement failed, rolling back");
    match conn.rollback().await {
        Ok(()) => error,
        Err(rollback_err) => {
            tracing::error!(target: "rawdb.sql", %rollback_err, "rollback failed");
            DbError::Other(format!("{error} (rollback failed: {rollback_err})"))
        }
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_both_spellings() {
        assert_eq!("sql".parse::<ExecMode>().unwrap(), ExecMode::Execute);
        assert_eq!("as_pd".parse::<ExecMode>().unwrap(), ExecMode::Fetch);
        assert_eq!("fetch".parse::<ExecMode>().unwrap(), ExecMode::Fetch);
    }

    #[test]
    fn unknown_mode_is_mode_operator_error() {
        let err = "dataframe".parse::<ExecMode>().unwrap_err();
        assert!(matches!(err, DbError::ModeOperator(_)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("select 1", 200), "select 1");
        assert_eq!(truncate_sql_bytes("añb", 2), "a");
    }
}
