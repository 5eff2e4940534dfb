//! Dynamically typed scalars and their SQL literal rendering.
//!
//! [`Value`] is the currency of the whole crate: conditions carry it, records
//! serialize into it and result rows decode into it. [`format_value`] renders a
//! value as literal SQL text followed by a separator.

use crate::error::{DbError, DbResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

/// ISO-8601 layout used for timestamp literals. Fractional seconds are only
/// printed when present.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single scalar cell value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) if v.is_nan() => f.write_str("NaN"),
            Value::Float(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(v) => f.write_str(v),
            Value::Timestamp(v) => write!(f, "{}", v.format(ISO_FORMAT)),
        }
    }
}

/// Render a value as a SQL literal followed by `separator`.
///
/// Text and timestamps are single-quoted, numbers and booleans are printed in
/// canonical form and NULL becomes the `NULL` keyword. Non-finite floats are
/// quoted (`'NaN'`, `'Infinity'`) since Postgres only reads them as strings.
/// Embedded single quotes are copied through verbatim.
pub fn format_value(value: &Value, separator: &str) -> String {
    match value {
        Value::Text(_) | Value::Timestamp(_) => format!("'{value}'{separator}"),
        Value::Float(v) if !v.is_finite() => format!("'{value}'{separator}"),
        _ => format!("{value}{separator}"),
    }
}

/// Render a comma-separated literal list (`a, b, c `) as used in `VALUES (...)`.
pub fn format_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> String {
    let values: Vec<&Value> = values.into_iter().collect();
    let last = values.len().saturating_sub(1);
    values
        .iter()
        .enumerate()
        .map(|(index, value)| format_value(value, if index == last { " " } else { ", " }))
        .collect()
}

// ─── Conversions ────────────────────────────────────────────────────────────

/// Conversion of a Rust field into a [`Value`].
///
/// Implemented for the scalar types records are made of; `#[derive(Record)]`
/// calls it once per field.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion of a [`Value`] back into a Rust field.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch<T>(expected: &str, got: &Value) -> Result<T, String> {
    Err(format!("expected {expected}, got {}", got.type_name()))
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => mismatch("text", other),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => mismatch("bool", other),
        }
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {$(
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, String> {
                match value {
                    Value::Int(v) => <$ty>::try_from(*v)
                        .map_err(|_| format!("{v} out of range for {}", stringify!($ty))),
                    other => mismatch("integer", other),
                }
            }
        }
    )*};
}

int_value!(i16, i32, i64);

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_f64().map_or_else(|| mismatch("float", value), Ok)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, ISO_FORMAT)
                .map_err(|e| format!("invalid timestamp '{s}': {e}")),
            other => mismatch("timestamp", other),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.naive_utc())
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, String> {
        NaiveDateTime::from_value(value).map(|ts| ts.and_utc())
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.and_time(NaiveTime::MIN))
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self, String> {
        NaiveDateTime::from_value(value).map(|ts| ts.date())
    }
}

impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => uuid::Uuid::parse_str(s).map_err(|e| e.to_string()),
            other => mismatch("uuid text", other),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.to_value()
    }
}

macro_rules! from_scalar {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                value.to_value()
            }
        }
    )*};
}

from_scalar!(String, &str, bool, i16, i32, i64, f32, f64, NaiveDateTime, DateTime<Utc>, NaiveDate, uuid::Uuid);

impl TryFrom<serde_json::Value> for Value {
    type Error = DbError;

    fn try_from(value: serde_json::Value) -> DbResult<Self> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| DbError::parameter(format!("unrepresentable number {n}"))),
            },
            other => Err(DbError::parameter(format!(
                "value must be a scalar, got {other}"
            ))),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Timestamp(_) => serializer.collect_str(self),
        }
    }
}

// ─── ToSql / FromSql ────────────────────────────────────────────────────────

impl ToSql for Value {
    /// Encode for the parameter's column type.
    ///
    /// Only lossless conversions are performed; every other pairing is an
    /// error instead of a reinterpretation of the wire bytes.
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if is_text_like(ty) {
            return match self {
                Value::Null => Ok(IsNull::Yes),
                Value::Text(v) => v.to_sql(ty, out),
                other => other.to_string().to_sql(ty, out),
            };
        }
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                _ => Err(cannot_bind(self, ty)),
            },
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::INT8 => v.to_sql(ty, out),
                Type::FLOAT4 if (*v as f32) as i128 == i128::from(*v) => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 if (*v as f64) as i128 == i128::from(*v) => (*v as f64).to_sql(ty, out),
                _ => Err(cannot_bind(self, ty)),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::FLOAT4 if !v.is_finite() || (*v as f32).is_finite() => {
                    (*v as f32).to_sql(ty, out)
                }
                Type::INT2 | Type::INT4 | Type::INT8 => match whole_number(*v) {
                    Some(n) => Value::Int(n).to_sql(ty, out),
                    None => Err(cannot_bind(self, ty)),
                },
                _ => Err(cannot_bind(self, ty)),
            },
            Value::Text(v) => match *ty {
                Type::UUID => uuid::Uuid::parse_str(v)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
                }
                Type::INT2 => v.trim().parse::<i16>()?.to_sql(ty, out),
                Type::INT4 => v.trim().parse::<i32>()?.to_sql(ty, out),
                Type::INT8 => v.trim().parse::<i64>()?.to_sql(ty, out),
                Type::FLOAT4 => v.trim().parse::<f32>()?.to_sql(ty, out),
                Type::FLOAT8 => v.trim().parse::<f64>()?.to_sql(ty, out),
                Type::BOOL => v.trim().parse::<bool>()?.to_sql(ty, out),
                Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE => {
                    let ts = NaiveDateTime::parse_from_str(v, ISO_FORMAT)?;
                    Value::Timestamp(ts).to_sql(ty, out)
                }
                _ => Err(cannot_bind(self, ty)),
            },
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.to_sql(ty, out),
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                Type::DATE if v.time() == NaiveTime::MIN => v.date().to_sql(ty, out),
                _ => Err(cannot_bind(self, ty)),
            },
        }
    }

    fn accepts(ty: &Type) -> bool {
        decodable(ty)
    }

    tokio_postgres::types::to_sql_checked!();
}

fn cannot_bind(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind {} value {value} to a column of type {ty}", value.type_name()).into()
}

/// `v` as an integer when it has no fractional part and fits in `i64`.
fn whole_number(v: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it overflows.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (v.is_finite() && v.fract() == 0.0 && (-LIMIT..LIMIT).contains(&v)).then_some(v as i64)
}

fn is_text_like(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn decodable(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::TEXT
            | Type::VARCHAR
            | Type::BPCHAR
            | Type::NAME
            | Type::UNKNOWN
            | Type::UUID
            | Type::JSON
            | Type::JSONB
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::DATE
    )
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::UUID => Value::Text(uuid::Uuid::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => Value::Text(serde_json::Value::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?.naive_utc()),
            Type::DATE => Value::Timestamp(NaiveDate::from_sql(ty, raw)?.and_time(NaiveTime::MIN)),
            _ => Value::Text(String::from_sql(ty, raw)?),
        })
    }

    fn from_sql_null(_: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Value::Null)
    }

    fn accepts(ty: &Type) -> bool {
        decodable(ty)
    }
}
