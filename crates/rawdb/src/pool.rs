//! Connection pool utilities

use crate::client::PgProvider;
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// Create a connection pool from settings.
///
/// # Example
///
/// ```ignore
/// let config = rawdb::DbConfig::from_env()?;
/// let pool = rawdb::create_pool(&config)?;
/// let provider = rawdb::PgProvider::new(pool);
/// ```
pub fn create_pool(config: &DbConfig) -> DbResult<Pool> {
    config.validate()?;
    create_pool_from_url(&config.uri()?, config.pool_size)
}

/// Create a connection pool from a database URL.
///
/// Uses `NoTls`; see [`create_pool_with_tls`] when the database requires TLS.
pub fn create_pool_from_url(database_url: &str, max_size: usize) -> DbResult<Pool> {
    create_pool_with_tls(database_url, NoTls, max_size)
}

/// Create a connection pool using a custom TLS connector.
pub fn create_pool_with_tls<T>(database_url: &str, tls: T, max_size: usize) -> DbResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| DbError::Connection(e.to_string()))?;

    let mgr = Manager::from_config(pg_config, tls, default_manager_config());
    Pool::builder(mgr)
        .max_size(max_size)
        .build()
        .map_err(|e| DbError::Connection(e.to_string()))
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}

impl PgProvider {
    /// Build a provider with a fresh pool from settings.
    pub fn from_config(config: &DbConfig) -> DbResult<Self> {
        Ok(Self::new(create_pool(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_url_is_connection_error() {
        let err = create_pool_from_url("postgres://host:notaport/db", 4).unwrap_err();
        assert!(matches!(err, DbError::Connection(_)));
    }

    #[test]
    fn pool_is_built_lazily() {
        // No connection is attempted until the first `get`.
        let pool = create_pool_from_url("postgres://u:p@127.0.0.1:1/db", 3).unwrap();
        assert_eq!(pool.status().max_size, 3);
    }
}
