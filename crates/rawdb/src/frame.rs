//! Tabular view over a full result set.

use crate::error::{DbError, DbResult};
use crate::row::FieldMap;
use crate::value::Value;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A result set laid out as named columns over value rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Build a frame from decoded rows. Column order follows the first row;
    /// cells missing from later rows are filled with NULL.
    pub fn from_records(records: Vec<FieldMap>) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|first| first.keys().map(str::to_string).collect())
            .unwrap_or_default();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get_opt(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> DbResult<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Single cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> DbResult<Option<&Value>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.get(row).map(|r| &r[idx]))
    }

    /// Rows as field maps, one per row.
    pub fn records(&self) -> Vec<FieldMap> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    fn column_index(&self, name: &str) -> DbResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DbError::FieldNotFound(name.to_string()))
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for record in self.records() {
            seq.serialize_element(&record)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::from_records(vec![
            [("name", Value::from("Ann")), ("email", Value::from("a@x"))]
                .into_iter()
                .collect(),
            [("name", Value::from("Bob"))].into_iter().collect(),
        ])
    }

    #[test]
    fn columns_follow_first_row() {
        let f = frame();
        assert_eq!(f.columns(), ["name", "email"]);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn ragged_rows_are_null_filled() {
        assert_eq!(frame().get(1, "email").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn column_extracts_values() {
        let f = frame();
        let names: Vec<_> = f.column("name").unwrap().into_iter().cloned().collect();
        assert_eq!(names, [Value::from("Ann"), Value::from("Bob")]);
        assert!(f.column("password").unwrap_err().is_field_not_found());
    }

    #[test]
    fn records_round_out_to_maps() {
        let records = frame().records();
        assert_eq!(records[0].get("email").unwrap(), &Value::from("a@x"));
        assert_eq!(records[1].get("email").unwrap(), &Value::Null);
    }

    #[test]
    fn serializes_as_record_list() {
        let json = serde_json::to_value(frame()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"name": "Ann", "email": "a@x"},
                {"name": "Bob", "email": null}
            ])
        );
    }
}
