//! Explicit table registry.
//!
//! Record types are registered once at startup; repositories resolve their
//! bound type against the registry before touching the database.
//!
//! # Example
//!
//! ```ignore
//! use rawdb::SchemaRegistry;
//!
//! let registry = SchemaRegistry::new()
//!     .with::<User>()
//!     .with::<Product>();
//!
//! assert_eq!(registry.primary_key_columns("usuarios"), Some(vec!["id"]));
//! ```

use crate::error::{DbError, DbResult};
use crate::row::Record;
use std::collections::HashMap;

/// Column information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Whether this column is part of the primary key.
    pub is_primary_key: bool,
}

/// Table information: name, ordered columns, primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Column metadata.
    pub columns: Vec<ColumnMeta>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Describe a record type.
    pub fn of<T: Record>() -> Self {
        let pk = T::primary_key();
        let mut table = TableSchema::new(T::table_name());
        for col in T::columns() {
            table.add_column(*col, pk.contains(col));
        }
        table
    }

    /// Add a column to this table schema.
    pub fn add_column(&mut self, name: impl Into<String>, is_primary_key: bool) {
        self.columns.push(ColumnMeta {
            name: name.into(),
            is_primary_key,
        });
    }

    /// Add multiple columns to this table schema.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        for col in columns {
            self.add_column(*col, false);
        }
        self
    }

    /// Mark a column as (part of) the primary key.
    ///
    /// Unknown columns are appended.
    pub fn with_primary_key(mut self, pk: &str) -> Self {
        match self.columns.iter_mut().find(|c| c.name == pk) {
            Some(col) => col.is_primary_key = true,
            None => self.add_column(pk, true),
        }
        self
    }

    /// Check if this table has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary-key column names in order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Registry for table schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// Create a new empty schema registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table from a type that implements `Record`.
    pub fn register<T: Record>(&mut self) {
        self.register_table(TableSchema::of::<T>());
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: Record>(mut self) -> Self {
        self.register::<T>();
        self
    }

    /// Register a table schema directly. A later registration replaces an
    /// earlier one with the same table name.
    pub fn register_table(&mut self, table: TableSchema) {
        tracing::debug!(target: "rawdb.registry", table = %table.name, columns = table.columns.len(), "registered table");
        self.tables.insert(table.name.clone(), table);
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Resolve the table bound to `T`.
    pub fn table_for<T: Record>(&self) -> DbResult<&TableSchema> {
        self.get_table(T::table_name()).ok_or_else(|| {
            DbError::UnboundModel(format!(
                "{} (table '{}') is not registered",
                std::any::type_name::<T>(),
                T::table_name()
            ))
        })
    }

    /// Primary-key column names of a registered table.
    pub fn primary_key_columns(&self, name: &str) -> Option<Vec<&str>> {
        self.get_table(name).map(TableSchema::primary_key)
    }

    /// Check if a table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Get all registered tables.
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    /// Get the number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::FieldMap;
    use crate::value::Value;

    struct Product;

    impl Record for Product {
        fn table_name() -> &'static str {
            "products"
        }

        fn columns() -> &'static [&'static str] {
            &["sku", "region", "name", "price"]
        }

        fn primary_key() -> &'static [&'static str] {
            &["sku", "region"]
        }

        fn to_values(&self) -> Vec<(&'static str, Value)> {
            Vec::new()
        }

        fn from_fields(_: &FieldMap) -> DbResult<Self> {
            Ok(Product)
        }
    }

    #[test]
    fn registers_record_metadata() {
        let registry = SchemaRegistry::new().with::<Product>();
        let table = registry.get_table("products").unwrap();
        assert_eq!(table.column_names(), ["sku", "region", "name", "price"]);
        assert_eq!(table.primary_key(), ["sku", "region"]);
    }

    #[test]
    fn unregistered_type_is_unbound() {
        let registry = SchemaRegistry::new();
        assert!(registry.table_for::<Product>().unwrap_err().is_unbound_model());
    }

    #[test]
    fn manual_schema_marks_primary_key() {
        let table = TableSchema::new("usuarios")
            .with_columns(&["id", "name"])
            .with_primary_key("id");
        assert_eq!(table.primary_key(), ["id"]);
        assert!(table.has_column("name"));

        let mut registry = SchemaRegistry::new();
        registry.register_table(table);
        assert_eq!(registry.primary_key_columns("usuarios"), Some(vec!["id"]));
        assert_eq!(registry.len(), 1);
    }
}
