//! # rawdb
//!
//! A small repository layer over PostgreSQL that turns structured conditions
//! into SQL text.
//!
//! ## Features
//!
//! - **Condition-driven CRUD**: pass `field -> value` pairs (or a raw clause)
//!   instead of writing statements by hand
//! - **Staged reads**: `get_one(...)` / `get_data()` build the query, a
//!   materializer (`as_model`, `as_dict`, `as_frame`) runs it
//! - **One statement, one transaction**: every call runs inside a
//!   [`TransactionScope`] that commits on success and rolls back on failure
//! - **Explicit registry**: record types are declared with `#[derive(Record)]`
//!   and registered at startup; nothing is discovered at runtime
//!
//! ```ignore
//! use rawdb::{Condition, Operators, PgProvider, Record, Repository, SchemaRegistry};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Record)]
//! #[orm(table = "usuarios")]
//! struct User {
//!     #[orm(id)]
//!     id: String,
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! let provider = PgProvider::from_config(&rawdb::DbConfig::from_env()?)?;
//! let registry = Arc::new(SchemaRegistry::new().with::<User>());
//! let mut users: Repository<User, _> = Repository::new(provider, registry);
//!
//! let ann = users
//!     .get_one(
//!         Condition::new().with("name", "Ann").with("active", true),
//!         Some(&Operators::from(["or"])),
//!     )?
//!     .as_model()
//!     .await?;
//! ```
//!
//! Literal values are inlined into statement text without quote escaping;
//! only [`Repository::insert_all`] binds parameters.

pub mod client;
pub mod condition;
pub mod config;
pub mod error;
pub mod frame;
pub mod registry;
pub mod repository;
pub mod row;
pub mod transaction;
pub mod value;

pub use client::{Connection, ConnectionProvider};
pub use condition::{Condition, DEFAULT_OPERATOR, Operators, build_set, build_where};
pub use config::{DbConfig, Engine};
pub use error::{DbError, DbResult};
pub use frame::Frame;
pub use registry::{ColumnMeta, SchemaRegistry, TableSchema};
pub use repository::{ALL_FIELDS, Repository};
pub use row::{FieldMap, Record, RowExt};
pub use transaction::{ExecMode, Outcome, TransactionScope};
pub use value::{FromValue, ToValue, Value, format_value, format_values};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use client::{PgConnection, PgProvider};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_from_url, create_pool_with_tls};

#[cfg(feature = "derive")]
pub use rawdb_derive::Record;
