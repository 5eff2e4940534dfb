//! Filter and assignment descriptions rendered into WHERE / SET clauses.
//!
//! A [`Condition`] is either a pre-formatted clause (the caller owns its
//! correctness) or an ordered list of `field = value` pairs. Pairs are joined
//! with `and` unless an [`Operators`] list overrides the joiner at that position.
//!
//! # Example
//! ```ignore
//! use rawdb::{Condition, Operators, build_where};
//!
//! let cond = Condition::new().with("name", "Ann").with("active", true);
//! let sql = build_where(&cond, Some(&Operators::from(["or"])))?;
//! assert_eq!(sql, "name = 'Ann' or active = true ");
//! # Ok::<(), rawdb::DbError>(())
//! ```

use crate::error::{DbError, DbResult};
use crate::value::{Value, format_value};

/// Joiner used when no operator override exists for a pair.
pub const DEFAULT_OPERATOR: &str = "and";

/// A WHERE/SET description.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Raw SQL clause, used verbatim.
    Raw(String),
    /// Ordered `field = value` pairs.
    Pairs(Vec<(String, Value)>),
}

impl Condition {
    /// Start an empty pair list.
    pub fn new() -> Self {
        Condition::Pairs(Vec::new())
    }

    /// Create a raw SQL clause.
    ///
    /// Be careful with SQL injection when using raw conditions.
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    /// Append a `field = value` pair.
    ///
    /// On a raw clause the pair is rendered and joined to the clause with
    /// `and`, so the clause keeps filtering.
    pub fn with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self {
            Condition::Pairs(mut pairs) => {
                pairs.push((field, value));
                Condition::Pairs(pairs)
            }
            Condition::Raw(sql) if sql.trim().is_empty() => Condition::Pairs(vec![(field, value)]),
            Condition::Raw(sql) => Condition::Raw(format!(
                "{} {DEFAULT_OPERATOR} {field} = {}",
                sql.trim_end(),
                format_value(&value, "")
            )),
        }
    }

    /// Number of pairs (a raw clause counts as one).
    pub fn len(&self) -> usize {
        match self {
            Condition::Raw(_) => 1,
            Condition::Pairs(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Condition::Raw(sql) => sql.trim().is_empty(),
            Condition::Pairs(pairs) => pairs.is_empty(),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::raw(sql)
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::Raw(sql)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Condition {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for Condition {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Condition {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Condition::Pairs(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl TryFrom<serde_json::Value> for Condition {
    type Error = DbError;

    /// Strings become raw clauses and objects become pairs in document order.
    fn try_from(value: serde_json::Value) -> DbResult<Self> {
        match value {
            serde_json::Value::String(sql) => Ok(Condition::Raw(sql)),
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(field, v)| Ok((field, Value::try_from(v)?)))
                .collect::<DbResult<Vec<_>>>()
                .map(Condition::Pairs),
            other => Err(DbError::parameter(format!(
                "where must be a string or a mapping, got {other}"
            ))),
        }
    }
}

/// Per-pair joiner overrides (`and`, `or`, `and not`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operators(Vec<String>);

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operator at `index`, if overridden.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every operator must be a word (or words) made of ASCII letters.
    pub fn validate(&self) -> DbResult<()> {
        for op in &self.0 {
            let valid = !op.trim().is_empty()
                && op.chars().all(|c| c.is_ascii_alphabetic() || c == ' ');
            if !valid {
                return Err(DbError::parameter(format!("invalid boolean operator '{op}'")));
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for Operators {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Operators(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Operators {
    fn from(ops: [S; N]) -> Self {
        ops.into_iter().collect()
    }
}

impl<S: Into<String>> From<Vec<S>> for Operators {
    fn from(ops: Vec<S>) -> Self {
        ops.into_iter().collect()
    }
}

impl From<&[&str]> for Operators {
    fn from(ops: &[&str]) -> Self {
        ops.iter().copied().collect()
    }
}

impl TryFrom<serde_json::Value> for Operators {
    type Error = DbError;

    /// Accepts `null` (no overrides) or an array of strings.
    fn try_from(value: serde_json::Value) -> DbResult<Self> {
        let invalid = || DbError::parameter("operators must be null or a list of strings");
        match value {
            serde_json::Value::Null => Ok(Operators::new()),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(op) => Ok(op),
                    _ => Err(invalid()),
                })
                .collect::<DbResult<Vec<_>>>()
                .map(Operators),
            _ => Err(invalid()),
        }
    }
}

/// Render a WHERE clause body.
///
/// Pair `i` is followed by ` <operators[i]> ` when an override exists and by
/// ` and ` otherwise; the last pair is followed by a single space. Overrides
/// beyond the last joiner are ignored.
pub fn build_where(condition: &Condition, operators: Option<&Operators>) -> DbResult<String> {
    if let Some(ops) = operators {
        ops.validate()?;
    }
    match condition {
        Condition::Raw(sql) => Ok(sql.clone()),
        Condition::Pairs(pairs) => {
            if pairs.is_empty() {
                return Err(DbError::parameter("where condition has no fields"));
            }
            let last = pairs.len() - 1;
            let mut out = String::new();
            for (index, (field, value)) in pairs.iter().enumerate() {
                let separator = if index == last {
                    " ".to_string()
                } else {
                    let op = operators
                        .and_then(|ops| ops.get(index))
                        .unwrap_or(DEFAULT_OPERATOR);
                    format!(" {op} ")
                };
                out.push_str(field);
                out.push_str(" = ");
                out.push_str(&format_value(value, &separator));
            }
            Ok(out)
        }
    }
}

/// Render a SET clause body: `a = 1, b = 'x' `.
pub fn build_set(assignments: &Condition) -> DbResult<String> {
    match assignments {
        Condition::Raw(sql) => Ok(sql.clone()),
        Condition::Pairs(pairs) => {
            if pairs.is_empty() {
                return Err(DbError::parameter("set clause has no fields"));
            }
            let last = pairs.len() - 1;
            Ok(pairs
                .iter()
                .enumerate()
                .map(|(index, (field, value))| {
                    let separator = if index == last { " " } else { ", " };
                    format!("{field} = {}", format_value(value, separator))
                })
                .collect())
        }
    }
}
