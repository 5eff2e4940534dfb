//! Row mapping traits and utilities

use crate::error::{DbError, DbResult};
use crate::value::{FromValue, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio_postgres::Row;

/// A record type bound to a table.
///
/// This trait should typically be derived using `#[derive(Record)]`
/// from the `rawdb-derive` crate.
///
/// # Example
///
/// ```ignore
/// use rawdb::Record;
///
/// #[derive(Debug, Clone, PartialEq, Record)]
/// #[orm(table = "usuarios")]
/// struct User {
///     #[orm(id)]
///     id: String,
///     name: String,
///     email: Option<String>,
/// }
/// ```
pub trait Record: Sized {
    /// The database table name.
    fn table_name() -> &'static str;

    /// Column names in declaration order.
    fn columns() -> &'static [&'static str];

    /// Primary-key column names.
    fn primary_key() -> &'static [&'static str] {
        &[]
    }

    /// Serialize into ordered `column -> value` pairs.
    fn to_values(&self) -> Vec<(&'static str, Value)>;

    /// Build an instance from a result row.
    fn from_fields(fields: &FieldMap) -> DbResult<Self>;
}

/// One result row: ordered `column -> value` pairs.
///
/// Lookups by name fail with [`DbError::FieldNotFound`] instead of panicking,
/// so a map can be probed for columns the projection may have left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Value)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a column value, keeping first-insertion order.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Look up a column.
    pub fn get(&self, column: &str) -> DbResult<&Value> {
        self.get_opt(column)
            .ok_or_else(|| DbError::FieldNotFound(column.to_string()))
    }

    pub fn get_opt(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Look up a column and convert it.
    pub fn get_as<T: FromValue>(&self, column: &str) -> DbResult<T> {
        let value = self.get(column)?;
        T::from_value(value).map_err(|message| DbError::decode(column, message))
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.get_opt(column).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> Vec<(String, Value)> {
        self.entries
    }

    /// Decode a Postgres row column by column.
    pub fn from_row(row: &Row) -> DbResult<Self> {
        let mut fields = FieldMap::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value: Value = row
                .try_get(idx)
                .map_err(|e| DbError::decode(column.name(), e.to_string()))?;
            fields.entries.push((column.name().to_string(), value));
        }
        Ok(fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FieldMap::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Extension trait for Row to provide name-based access as a [`FieldMap`]
pub trait RowExt {
    fn to_fields(&self) -> DbResult<FieldMap>;
}

impl RowExt for Row {
    fn to_fields(&self) -> DbResult<FieldMap> {
        FieldMap::from_row(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FieldMap {
        [
            ("id", Value::from("u1")),
            ("name", Value::from("Ann")),
            ("age", Value::Int(31)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn keeps_insertion_order() {
        let keys: Vec<_> = sample().keys().map(str::to_string).collect();
        assert_eq!(keys, ["id", "name", "age"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut fields = sample();
        fields.insert("name", "Bob");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("name").unwrap(), &Value::from("Bob"));
    }

    #[test]
    fn missing_field_is_named_error() {
        let err = sample().get("first_name").unwrap_err();
        assert!(err.is_field_not_found());
        assert!(err.to_string().contains("first_name"));
    }

    #[test]
    fn typed_access_reports_column_on_mismatch() {
        let fields = sample();
        assert_eq!(fields.get_as::<i32>("age").unwrap(), 31);
        match fields.get_as::<bool>("age").unwrap_err() {
            DbError::Decode { column, .. } => assert_eq!(column, "age"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serializes_as_object() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"id":"u1","name":"Ann","age":31}"#);
    }
}
