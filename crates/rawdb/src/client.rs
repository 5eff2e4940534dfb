//! Connection seam used by [`TransactionScope`](crate::TransactionScope).
//!
//! A [`ConnectionProvider`] hands out connections on demand; a [`Connection`]
//! runs transaction control plus a single statement. The Postgres
//! implementation is [`PgProvider`], backed by a `deadpool-postgres` pool.

use crate::error::DbResult;
use crate::row::FieldMap;
use crate::value::Value;
use std::future::Future;

/// A connection exclusively owned by one transaction scope.
///
/// Dropping the connection releases it back to its provider.
pub trait Connection: Send {
    /// Start a transaction.
    fn begin(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbResult<u64>> + Send;

    /// Execute a query and return every row.
    fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbResult<Vec<FieldMap>>> + Send;

    /// Commit the open transaction.
    fn commit(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> impl Future<Output = DbResult<()>> + Send;
}

/// Supplies connections on demand.
pub trait ConnectionProvider: Send + Sync {
    type Connection: Connection;

    /// Acquire a connection. Fails with [`DbError::Connection`](crate::DbError::Connection)
    /// when none can be established.
    fn acquire(&self) -> impl Future<Output = DbResult<Self::Connection>> + Send;
}

impl<P: ConnectionProvider> ConnectionProvider for &P {
    type Connection = P::Connection;

    fn acquire(&self) -> impl Future<Output = DbResult<Self::Connection>> + Send {
        (*self).acquire()
    }
}

impl<P: ConnectionProvider> ConnectionProvider for std::sync::Arc<P> {
    type Connection = P::Connection;

    fn acquire(&self) -> impl Future<Output = DbResult<Self::Connection>> + Send {
        (**self).acquire()
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
pub use pg::{PgConnection, PgProvider};

#[cfg(feature = "pool")]
mod pg {
    use super::{Connection, ConnectionProvider};
    use crate::error::{DbError, DbResult};
    use crate::row::FieldMap;
    use crate::value::Value;
    use deadpool_postgres::{Client, Pool};
    use tokio_postgres::types::ToSql;

    /// Pool-backed connection provider.
    #[derive(Clone)]
    pub struct PgProvider {
        pool: Pool,
    }

    impl PgProvider {
        pub fn new(pool: Pool) -> Self {
            Self { pool }
        }

        pub fn pool(&self) -> &Pool {
            &self.pool
        }
    }

    impl ConnectionProvider for PgProvider {
        type Connection = PgConnection;

        async fn acquire(&self) -> DbResult<PgConnection> {
            let client = self.pool.get().await?;
            Ok(PgConnection {
                client: Some(client),
                in_transaction: false,
            })
        }
    }

    /// A pooled client plus transaction bookkeeping.
    ///
    /// If dropped while a transaction is still open (for example when the
    /// owning future is cancelled), the client is detached from the pool and
    /// closed instead of being recycled mid-transaction.
    pub struct PgConnection {
        client: Option<Client>,
        in_transaction: bool,
    }

    impl PgConnection {
        fn client(&self) -> DbResult<&Client> {
            self.client
                .as_ref()
                .ok_or_else(|| DbError::Connection("connection already released".to_string()))
        }

        async fn control(&mut self, statement: &str) -> DbResult<()> {
            self.client()?
                .batch_execute(statement)
                .await
                .map_err(DbError::from_db_error)
        }
    }

    fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
        params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }

    impl Connection for PgConnection {
        async fn begin(&mut self) -> DbResult<()> {
            self.control("BEGIN").await?;
            self.in_transaction = true;
            Ok(())
        }

        async fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
            let params = bind(params);
            self.client()?
                .execute(sql, &params)
                .await
                .map_err(DbError::from_db_error)
        }

        async fn fetch(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<FieldMap>> {
            let params = bind(params);
            let rows = self
                .client()?
                .query(sql, &params)
                .await
                .map_err(DbError::from_db_error)?;
            rows.iter().map(FieldMap::from_row).collect()
        }

        async fn commit(&mut self) -> DbResult<()> {
            self.control("COMMIT").await?;
            self.in_transaction = false;
            Ok(())
        }

        async fn rollback(&mut self) -> DbResult<()> {
            let result = self.control("ROLLBACK").await;
            // A failed ROLLBACK leaves the session state unknown; keep the
            // flag set so Drop detaches the client.
            if result.is_ok() {
                self.in_transaction = false;
            }
            result
        }
    }

    impl Drop for PgConnection {
        fn drop(&mut self) {
            if self.in_transaction {
                if let Some(client) = self.client.take() {
                    tracing::warn!(
                        target: "rawdb.sql",
                        "connection dropped inside an open transaction; detaching from pool"
                    );
                    drop(Client::take(client));
                }
            }
        }
    }
}
