//! Values exchanged with the database.
//!
//! A [`Value`] is what an entity member reads as, what a fragment argument
//! binds as, and what a result column decodes to. Builders never inspect a
//! value beyond two questions: is it NULL (so `where_eq` renders `IS NULL`)
//! and is it a [`Value::List`] (so fragment expansion renders an IN-list or
//! an array literal).
//!
//! Conversions go one way here (Rust type to `Value`); the way back is
//! [`FromValue`](crate::row::FromValue).

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// One bound parameter or result column.
///
/// ```
/// use quill_db::Value;
///
/// assert_eq!(Value::from(7_i16), Value::Int(7));
/// assert_eq!(Value::from(None::<&str>), Value::Null);
/// assert_eq!(Value::from(vec![1, 2]).kind(), "List");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Every integer member widens to `i64`.
    Int(i64),
    Float(f64),
    String(String),
    /// A blob. `Vec<u8>` and `&[u8]` land here, never in `List`.
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// An instant. Values carrying any UTC offset are normalized to UTC.
    DateTimeTz(DateTime<Utc>),
    Time(NaiveTime),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    /// A collection argument. Inside a WHERE fragment it expands to
    /// `(?, ?, ...)`; inside SET or VALUES it becomes a dialect array.
    List(Vec<Value>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The variant name, as reported in `TypeMismatch` errors and traces.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::Date(_) => "Date",
            Self::DateTime(_) => "DateTime",
            Self::DateTimeTz(_) => "DateTimeTz",
            Self::Time(_) => "Time",
            Self::Uuid(_) => "Uuid",
            Self::Json(_) => "Json",
            Self::List(_) => "List",
        }
    }
}

/// Renders the value the way it appears in error messages, e.g. the id in
/// `could not find User with ID=7`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Date(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::DateTimeTz(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// `From<$t>` for each scalar member type.
macro_rules! scalar_from {
    ($($t:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from($v: $t) -> Self {
                    $body
                }
            }
        )*
    };
}

scalar_from!(
    bool => |v| Self::Bool(v),
    i64 => |v| Self::Int(v),
    i32 => |v| Self::Int(i64::from(v)),
    i16 => |v| Self::Int(i64::from(v)),
    u32 => |v| Self::Int(i64::from(v)),
    f64 => |v| Self::Float(v),
    f32 => |v| Self::Float(f64::from(v)),
    String => |v| Self::String(v),
    &str => |v| Self::String(v.to_string()),
    &String => |v| Self::String(v.clone()),
    Vec<u8> => |v| Self::Bytes(v),
    &[u8] => |v| Self::Bytes(v.to_vec()),
    NaiveDate => |v| Self::Date(v),
    NaiveDateTime => |v| Self::DateTime(v),
    DateTime<Utc> => |v| Self::DateTimeTz(v),
    DateTime<FixedOffset> => |v| Self::DateTimeTz(v.with_timezone(&Utc)),
    NaiveTime => |v| Self::Time(v),
    uuid::Uuid => |v| Self::Uuid(v),
    serde_json::Value => |v| Self::Json(v),
    Vec<Value> => |v| Self::List(v),
);

/// `Vec<T>`, `[T; N]` and `&[T]` become a [`Value::List`] of the elements.
macro_rules! list_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<Vec<$t>> for Value {
                fn from(v: Vec<$t>) -> Self {
                    Self::List(v.into_iter().map(Value::from).collect())
                }
            }

            impl<const N: usize> From<[$t; N]> for Value {
                fn from(v: [$t; N]) -> Self {
                    Self::List(v.into_iter().map(Value::from).collect())
                }
            }

            impl From<&[$t]> for Value {
                fn from(v: &[$t]) -> Self {
                    Self::List(v.iter().cloned().map(Value::from).collect())
                }
            }
        )*
    };
}

list_from!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    &str,
    uuid::Uuid,
    NaiveDate,
    NaiveDateTime,
    DateTime<Utc>,
);

impl<const N: usize> From<[Value; N]> for Value {
    fn from(v: [Value; N]) -> Self {
        Self::List(v.into())
    }
}

impl From<&[Value]> for Value {
    fn from(v: &[Value]) -> Self {
        Self::List(v.to_vec())
    }
}

/// `None` binds as NULL, which is how optional members write back.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_members_widen() {
        assert_eq!(Value::from(3_i16), Value::Int(3));
        assert_eq!(Value::from(3_i32), Value::Int(3));
        assert_eq!(Value::from(u32::MAX), Value::Int(i64::from(u32::MAX)));
        assert_eq!(Value::from(0.5_f32), Value::Float(0.5));
    }

    #[test]
    fn test_optional_member() {
        assert_eq!(Value::from(Some(5_i64)), Value::Int(5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
        assert!(Value::from(None::<String>).is_null());
    }

    #[test]
    fn test_collections_are_lists_but_bytes_stay_blobs() {
        assert_eq!(
            Value::from(vec![1_i64, 2]),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            Value::from(["a", "b"]),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        let ids: &[i32] = &[3, 4];
        assert_eq!(Value::from(ids), Value::List(vec![Value::Int(3), Value::Int(4)]));
        assert_eq!(Value::from([Value::Null]), Value::List(vec![Value::Null]));

        assert_eq!(Value::from(vec![1_u8, 2]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::from(&[1_u8, 2][..]), Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn test_offset_datetime_normalized_to_utc() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T12:30:00+02:00").unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Value::from(dt), Value::DateTimeTz(expected));
    }

    #[test]
    fn test_calendar_and_identity_values() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(Value::from(day), Value::Date(day));
        assert_eq!(Value::from(day.and_time(noon)), Value::DateTime(day.and_time(noon)));
        assert_eq!(Value::from(noon), Value::Time(noon));

        let id = uuid::Uuid::new_v4();
        assert_eq!(Value::from(id), Value::Uuid(id));
        let doc = serde_json::json!({"tags": ["a"]});
        assert_eq!(Value::from(doc.clone()), Value::Json(doc));
    }

    #[test]
    fn test_display_in_messages() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::from("ada").to_string(), "ada");
        assert_eq!(Value::Bytes(vec![1, 2, 3]).to_string(), "<3 bytes>");
        assert_eq!(Value::from(vec![1, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(
            Value::Uuid(uuid::Uuid::nil()).to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::from(vec![1_i64]).kind(), "List");
        assert_eq!(Value::Null.kind(), "Null");
        assert_eq!(Value::from(1.5).kind(), "Float");
        assert!(!Value::Int(0).is_null());
    }
}
