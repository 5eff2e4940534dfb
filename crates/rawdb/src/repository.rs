//! Generic CRUD repository bound to one [`Record`] type.
//!
//! Writes execute immediately inside a [`TransactionScope`]. Reads are staged:
//! [`get_one`](Repository::get_one) / [`get_data`](Repository::get_data) only
//! build the pending query, and a materializer
//! ([`as_model`](Repository::as_model), [`as_dict`](Repository::as_dict),
//! [`as_frame`](Repository::as_frame)) runs it.
//!
//! # Example
//!
//! ```ignore
//! use rawdb::{Condition, Repository, SchemaRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SchemaRegistry::new().with::<User>());
//! let mut users: Repository<User, _> = Repository::new(provider, registry);
//!
//! users.insert(user, false).await?;
//!
//! let ann = users
//!     .get_one(Condition::new().with("name", "Ann"), None)?
//!     .as_model()
//!     .await?;
//!
//! let names = users.fields("name").get_data()?.as_frame().await?;
//! ```

use crate::client::ConnectionProvider;
use crate::condition::{Condition, Operators, build_set, build_where};
use crate::error::{DbError, DbResult};
use crate::frame::Frame;
use crate::registry::{SchemaRegistry, TableSchema};
use crate::row::{FieldMap, Record};
use crate::transaction::TransactionScope;
use crate::value::{Value, format_values};
use std::marker::PhantomData;
use std::sync::Arc;

/// Projection used when no field list has been selected.
pub const ALL_FIELDS: &str = "*";

/// Postgres caps a single statement at this many bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

/// CRUD surface for one record type.
///
/// The record type is fixed by the type parameter; the registry decides
/// whether it is bound to a table. Staged-read methods take `&mut self`, so a
/// single repository cannot interleave two staged reads.
pub struct Repository<T, P> {
    provider: P,
    registry: Arc<SchemaRegistry>,
    fields: String,
    query: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record, P: ConnectionProvider> Repository<T, P> {
    pub fn new(provider: P, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            provider,
            registry,
            fields: ALL_FIELDS.to_string(),
            query: String::new(),
            _record: PhantomData,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Table metadata of the bound record type.
    pub fn table(&self) -> DbResult<&TableSchema> {
        self.registry.table_for::<T>()
    }

    /// The staged statement, if one has been built.
    pub fn pending_query(&self) -> Option<&str> {
        (!self.query.is_empty()).then_some(self.query.as_str())
    }

    /// Currently selected projection.
    pub fn selected_fields(&self) -> &str {
        &self.fields
    }

    /// Set the projection for the next staged read (`"name, email"`).
    ///
    /// A blank list selects every column.
    pub fn fields(&mut self, fields: impl AsRef<str>) -> &mut Self {
        let fields = fields.as_ref().trim();
        self.fields = if fields.is_empty() {
            ALL_FIELDS.to_string()
        } else {
            fields.to_string()
        };
        self
    }

    /// Set the projection from a list of column names.
    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list: Vec<String> = columns
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        self.fields(list.join(", "))
    }

    // ─── Writes ─────────────────────────────────────────────────────────────

    /// Insert one record and hand it back unchanged.
    ///
    /// With `strip_auto_key`, primary-key columns are left out so the server
    /// can assign them; generated keys are not read back.
    pub async fn insert(&self, record: T, strip_auto_key: bool) -> DbResult<T> {
        let table = self.table()?;
        let values = insert_values(&record, table, strip_auto_key);
        if values.is_empty() {
            return Err(DbError::parameter(format!(
                "record for table '{}' has no columns to insert",
                table.name
            )));
        }

        let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        let sql = format!(
            "insert into {} ({}) values ({});",
            table.name,
            columns.join(", "),
            format_values(values.iter().map(|(_, v)| v))
        );

        TransactionScope::new(&self.provider).execute(&sql, &[]).await?;
        Ok(record)
    }

    /// Insert many records with one multi-row statement and bound parameters.
    ///
    /// Returns whether at least one row was written. An empty slice performs
    /// no I/O and returns `false`.
    pub async fn insert_all(&self, records: &[T], strip_auto_key: bool) -> DbResult<bool> {
        if records.is_empty() {
            return Ok(false);
        }
        let table = self.table()?;

        let mut columns: Option<Vec<&'static str>> = None;
        let mut groups = Vec::with_capacity(records.len());
        let mut params: Vec<Value> = Vec::new();

        for record in records {
            let values = insert_values(record, table, strip_auto_key);
            let names: Vec<&'static str> = values.iter().map(|(c, _)| *c).collect();
            match &columns {
                Some(expected) => {
                    if *expected != names {
                        return Err(DbError::parameter(
                            "all records passed to insert_all must share one field set",
                        ));
                    }
                }
                None => {
                    if names.is_empty() {
                        return Err(DbError::parameter(format!(
                            "records for table '{}' have no columns to insert",
                            table.name
                        )));
                    }
                    columns = Some(names);
                }
            }

            let start = params.len();
            let placeholders: Vec<String> = (1..=values.len())
                .map(|i| format!("${}", start + i))
                .collect();
            groups.push(format!("({})", placeholders.join(", ")));
            params.extend(values.into_iter().map(|(_, v)| v));
        }

        if params.len() > MAX_BIND_PARAMS {
            return Err(DbError::parameter(format!(
                "insert_all would bind {} parameters (limit {MAX_BIND_PARAMS})",
                params.len()
            )));
        }

        let columns = columns.unwrap_or_default();
        let sql = format!(
            "insert into {} ({}) values {}",
            table.name,
            columns.join(", "),
            groups.join(", ")
        );

        let affected = TransactionScope::new(&self.provider)
            .execute(&sql, &params)
            .await?;
        Ok(affected > 0)
    }

    /// `update <table> set <set> where <where>`; `true` if any row changed.
    pub async fn update(
        &self,
        set: impl Into<Condition>,
        filter: impl Into<Condition>,
        operators: Option<&Operators>,
    ) -> DbResult<bool> {
        let table = self.table()?;
        let set = build_set(&set.into())?;
        let filter = build_where(&filter.into(), operators)?;
        let sql = format!("update {} set {set} where {filter};", table.name);

        let affected = TransactionScope::new(&self.provider)
            .execute(&sql, &[])
            .await?;
        Ok(affected > 0)
    }

    /// `delete from <table> where <where>`; `true` if any row was removed.
    pub async fn delete(
        &self,
        filter: impl Into<Condition>,
        operators: Option<&Operators>,
    ) -> DbResult<bool> {
        let table = self.table()?;
        let filter = build_where(&filter.into(), operators)?;
        let sql = format!("delete from {} where {filter}", table.name);

        let affected = TransactionScope::new(&self.provider)
            .execute(&sql, &[])
            .await?;
        Ok(affected > 0)
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    /// Every row of the table as records.
    pub async fn get_all(&self) -> DbResult<Vec<T>> {
        let table = self.table()?;
        let sql = format!("select * from {}", table.name);
        let rows = TransactionScope::new(&self.provider)
            .fetch(&sql, &[])
            .await?;
        rows.iter().map(T::from_fields).collect()
    }

    /// Stage `select <fields> from <table> where <where>;`.
    pub fn get_one(
        &mut self,
        filter: impl Into<Condition>,
        operators: Option<&Operators>,
    ) -> DbResult<&mut Self> {
        let table = self.table()?.name.clone();
        let filter = build_where(&filter.into(), operators)?;
        let sql = format!("select {} from {table} where {filter};", self.fields);
        Ok(self.stage(sql))
    }

    /// Stage `select <fields> from <table>`.
    pub fn get_data(&mut self) -> DbResult<&mut Self> {
        let table = self.table()?.name.clone();
        let sql = format!("select {} from {table}", self.fields);
        Ok(self.stage(sql))
    }

    fn stage(&mut self, sql: String) -> &mut Self {
        tracing::trace!(target: "rawdb.sql", sql = %sql, "staged query");
        self.query = sql;
        self.fields = ALL_FIELDS.to_string();
        self
    }

    // ─── Materializers ──────────────────────────────────────────────────────

    /// Run the pending query; `None` when nothing is staged.
    async fn fetch_pending(&self) -> DbResult<Option<Vec<FieldMap>>> {
        let Some(sql) = self.pending_query() else {
            return Ok(None);
        };
        let rows = TransactionScope::new(&self.provider)
            .fetch(sql, &[])
            .await?;
        Ok(Some(rows))
    }

    /// First row of the pending query as a record.
    pub async fn as_model(&self) -> DbResult<Option<T>> {
        match self.as_dict().await? {
            Some(fields) => T::from_fields(&fields).map(Some),
            None => Ok(None),
        }
    }

    /// First row of the pending query as a field map.
    pub async fn as_dict(&self) -> DbResult<Option<FieldMap>> {
        Ok(self
            .fetch_pending()
            .await?
            .and_then(|rows| rows.into_iter().next()))
    }

    /// Whole result of the pending query as a frame; `None` when empty.
    pub async fn as_frame(&self) -> DbResult<Option<Frame>> {
        Ok(self
            .fetch_pending()
            .await?
            .filter(|rows| !rows.is_empty())
            .map(Frame::from_records))
    }
}

/// Record values in column order, minus primary-key columns when stripping.
fn insert_values<T: Record>(
    record: &T,
    table: &TableSchema,
    strip_auto_key: bool,
) -> Vec<(&'static str, Value)> {
    let mut values = record.to_values();
    if strip_auto_key {
        let pk = table.primary_key();
        values.retain(|(column, _)| !pk.contains(column));
    }
    values
}
