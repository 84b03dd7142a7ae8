//! Result rows and typed extraction.
//!
//! A [`ResultSet`] is what a [`Statement`](crate::connection::Statement)
//! returns for a query: the column names in select order plus every fetched
//! [`Row`]. [`FromValue`] converts one column value to a Rust type;
//! [`FromRow`] converts a whole row, reading scalar targets from the first
//! column and `Vec` targets from every column positionally.

use std::collections::HashSet;
use std::sync::Arc;

use quill_core::{QuillError, QuillResult};

use crate::value::Value;

/// A generic database row.
///
/// Rows from one result set share their column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the raw values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns `true` if the row has a column with this name.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> QuillResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            QuillError::DatabaseError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Gets a typed value by column index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or the value cannot be
    /// converted to the requested type.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> QuillResult<T> {
        let value = self.values.get(idx).ok_or_else(|| {
            QuillError::DatabaseError(format!(
                "Column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Returns a reference to the raw Value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// All rows returned by one query, with their shared column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Builds a result set from column names and raw row values.
    ///
    /// # Panics
    ///
    /// Panics if any row has a different width than `columns`.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        Self { columns, rows }
    }

    /// A result set with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the column names in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the set of column names, used to decide which members a row
    /// can populate.
    pub fn column_set(&self) -> HashSet<String> {
        self.columns.iter().cloned().collect()
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the query matched no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ── FromValue ──────────────────────────────────────────────────────────

/// Trait for converting a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> QuillResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> QuillError {
    QuillError::TypeMismatch(format!("Expected {expected}, got {}", value.kind()))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(Self::from(*b)),
            _ => Err(mismatch("Int", value)),
        }
    }
}

macro_rules! from_value_narrow_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> QuillResult<Self> {
                    let wide = i64::from_value(value)?;
                    <$t>::try_from(wide).map_err(|e| {
                        QuillError::TypeMismatch(format!(
                            "Int value {wide} out of {} range: {e}",
                            stringify!($t)
                        ))
                    })
                }
            }
        )*
    };
}

from_value_narrow_int!(i32, i16, u32);

impl FromValue for f64 {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> QuillResult<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::String(s) => s.chars().next().ok_or_else(|| mismatch("Char", value)),
            _ => Err(mismatch("Char", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            _ => Err(mismatch("Bytes", value)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => s.parse().map_err(|_| mismatch("Uuid", value)),
            Value::Bytes(b) => Self::from_slice(b).map_err(|_| mismatch("Uuid", value)),
            _ => Err(mismatch("Uuid", value)),
        }
    }
}

// Text-affinity backends hand calendar values back as ISO-8601 strings.

impl FromValue for chrono::NaiveDate {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::String(s) => s.parse().map_err(|_| mismatch("Date", value)),
            _ => Err(mismatch("Date", value)),
        }
    }
}

impl FromValue for chrono::NaiveDateTime {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::DateTimeTz(dt) => Ok(dt.naive_utc()),
            Value::String(s) => Self::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| s.parse())
                .map_err(|_| mismatch("DateTime", value)),
            _ => Err(mismatch("DateTime", value)),
        }
    }
}

impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::DateTimeTz(dt) => Ok(*dt),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|_| mismatch("DateTimeTz", value)),
            _ => Err(mismatch("DateTimeTz", value)),
        }
    }
}

impl FromValue for chrono::NaiveTime {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Time(t) => Ok(*t),
            Value::String(s) => s.parse().map_err(|_| mismatch("Time", value)),
            _ => Err(mismatch("Time", value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::String(s) => serde_json::from_str(s).map_err(|_| mismatch("Json", value)),
            _ => Err(mismatch("Json", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> QuillResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> QuillResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

// ── FromRow ────────────────────────────────────────────────────────────

/// Conversion of a whole row into a scalar or array target.
///
/// Scalars read the first column. `Vec<T>` reads every column in order.
/// `Vec<u8>` is a scalar blob, not an array of bytes.
pub trait FromRow: Sized {
    /// Converts `row` into `Self`.
    fn from_row(row: &Row) -> QuillResult<Self>;
}

fn first_column(row: &Row) -> QuillResult<&Value> {
    row.values()
        .first()
        .ok_or_else(|| QuillError::TypeMismatch("row has no columns".to_string()))
}

macro_rules! from_row_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromRow for $t {
                fn from_row(row: &Row) -> QuillResult<Self> {
                    <$t as FromValue>::from_value(first_column(row)?)
                }
            }
        )*
    };
}

from_row_scalar!(
    i64,
    i32,
    i16,
    u32,
    f64,
    f32,
    bool,
    char,
    String,
    Vec<u8>,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveTime,
    serde_json::Value,
    Value,
);

impl<T: FromValue> FromRow for Option<T> {
    fn from_row(row: &Row) -> QuillResult<Self> {
        <Self as FromValue>::from_value(first_column(row)?)
    }
}

impl<T: FromValue> FromRow for Vec<T> {
    fn from_row(row: &Row) -> QuillResult<Self> {
        row.values().iter().map(T::from_value).collect()
    }
}

impl FromRow for Row {
    fn from_row(row: &Row) -> QuillResult<Self> {
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "name".into(), "score".into()],
            vec![
                vec![Value::Int(1), Value::from("ada"), Value::Float(2.5)],
                vec![Value::Int(2), Value::Null, Value::Int(3)],
            ],
        )
    }

    #[test]
    fn test_row_get_by_name_and_index() {
        let rs = sample();
        let row = rs.first().unwrap();
        assert_eq!(row.get::<i64>("id").unwrap(), 1);
        assert_eq!(row.get::<String>("name").unwrap(), "ada");
        assert_eq!(row.get_by_index::<f64>(2).unwrap(), 2.5);
        assert!(row.get::<i64>("missing").is_err());
        assert!(row.get_by_index::<i64>(9).is_err());
    }

    #[test]
    fn test_row_shares_columns() {
        let rs = sample();
        assert_eq!(rs.len(), 2);
        assert!(rs.rows()[1].has_column("score"));
        assert_eq!(rs.column_set().len(), 3);
    }

    #[test]
    fn test_option_null() {
        let rs = sample();
        let row = &rs.rows()[1];
        assert_eq!(row.get::<Option<String>>("name").unwrap(), None);
        assert!(matches!(
            row.get::<String>("name"),
            Err(QuillError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_int_widening_and_narrowing() {
        assert_eq!(f64::from_value(&Value::Int(3)).unwrap(), 3.0);
        assert_eq!(i32::from_value(&Value::Int(7)).unwrap(), 7);
        assert!(i16::from_value(&Value::Int(1 << 20)).is_err());
        assert!(bool::from_value(&Value::Int(1)).unwrap());
    }

    #[test]
    fn test_text_calendar_values() {
        let d = chrono::NaiveDate::from_value(&Value::from("2024-01-15")).unwrap();
        assert_eq!(d, chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        let dt = chrono::NaiveDateTime::from_value(&Value::from("2024-01-15 12:30:00")).unwrap();
        assert_eq!(dt.date(), d);
        let utc =
            chrono::DateTime::<chrono::Utc>::from_value(&Value::from("2024-01-15T12:30:00+01:00"))
                .unwrap();
        assert_eq!(utc.naive_utc().format("%H:%M").to_string(), "11:30");
    }

    #[test]
    fn test_from_row_scalar_reads_first_column() {
        let rs = sample();
        assert_eq!(i64::from_row(&rs.rows()[0]).unwrap(), 1);
        assert_eq!(Value::from_row(&rs.rows()[1]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_from_row_vec_reads_all_columns() {
        let rs = ResultSet::new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Int(4), Value::Int(5)]],
        );
        assert_eq!(Vec::<i64>::from_row(&rs.rows()[0]).unwrap(), vec![4, 5]);
        assert_eq!(
            Vec::<Value>::from_row(&rs.rows()[0]).unwrap(),
            vec![Value::Int(4), Value::Int(5)]
        );
    }

    #[test]
    fn test_from_row_bytes_is_scalar() {
        let rs = ResultSet::new(
            vec!["data".into(), "other".into()],
            vec![vec![Value::Bytes(vec![9, 8]), Value::Int(0)]],
        );
        assert_eq!(Vec::<u8>::from_row(&rs.rows()[0]).unwrap(), vec![9, 8]);
    }

    #[test]
    fn test_from_row_empty_row() {
        let row = Row::new(Vec::<String>::new().into(), vec![]);
        assert!(i64::from_row(&row).is_err());
        assert!(Vec::<i64>::from_row(&row).unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "column count")]
    fn test_row_width_mismatch_panics() {
        let _ = Row::new(vec!["a".to_string()].into(), vec![]);
    }
}
