//! Permissive record-value coercions.
//!
//! `FromValue` is how field assignment and list binding coerce record values
//! into Rust types: string⇄number⇄bool casts are allowed, `Null` collapses to
//! the type's zero value where one exists, and a non-list value bound into a
//! `Vec` target becomes a one-element list rather than failing.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::BindError;
use crate::value::Value;

pub trait FromValue: Sized {
    /// List nesting depth of the target type (`Vec<Vec<i64>>` is 2). Drives
    /// the shallower-result rule: a result one level shallower than the
    /// target becomes the sole element of a one-item list.
    const NESTING: usize = 0;

    fn from_value(value: &Value) -> Result<Self, BindError>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        Ok(value.clone())
    }
}

macro_rules! from_value_int {
    ($($t:ty),*) => {
        $(impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, BindError> {
                if matches!(value, Value::Null) {
                    return Ok(0);
                }
                let wide = value.as_i64().ok_or(BindError::Coercion {
                    got: value.kind_name(),
                    want: stringify!($t),
                })?;
                <$t>::try_from(wide).map_err(|_| BindError::Coercion {
                    got: value.kind_name(),
                    want: stringify!($t),
                })
            }
        })*
    };
}

from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        if matches!(value, Value::Null) {
            return Ok(0.0);
        }
        value.as_f64().ok_or(BindError::Coercion {
            got: value.kind_name(),
            want: "f64",
        })
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        if matches!(value, Value::Null) {
            return Ok(false);
        }
        value.as_bool().ok_or(BindError::Coercion {
            got: value.kind_name(),
            want: "bool",
        })
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        if matches!(value, Value::Null) {
            return Ok(String::new());
        }
        value.as_string().ok_or(BindError::Coercion {
            got: value.kind_name(),
            want: "string",
        })
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::String(s) => s.parse().map_err(|_| BindError::Coercion {
                got: "string",
                want: "date",
            }),
            other => Err(BindError::Coercion {
                got: other.kind_name(),
                want: "date",
            }),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Time(t) => Ok(*t),
            Value::String(s) => s.parse().map_err(|_| BindError::Coercion {
                got: "string",
                want: "time",
            }),
            other => Err(BindError::Coercion {
                got: other.kind_name(),
                want: "time",
            }),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::LocalDateTime(dt) => Ok(*dt),
            Value::DateTime(dt) => Ok(dt.naive_utc()),
            Value::String(s) => s.parse().map_err(|_| BindError::Coercion {
                got: "string",
                want: "local_datetime",
            }),
            other => Err(BindError::Coercion {
                got: other.kind_name(),
                want: "local_datetime",
            }),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| BindError::Coercion {
                    got: "string",
                    want: "datetime",
                }),
            other => Err(BindError::Coercion {
                got: other.kind_name(),
                want: "datetime",
            }),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Lists recurse element-wise; absence is an empty list; a single non-list
/// value becomes a one-element list.
impl<T: FromValue> FromValue for Vec<T> {
    const NESTING: usize = T::NESTING + 1;

    fn from_value(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Null => Ok(Vec::new()),
            // byte arrays coerce element-wise (covers Vec<u8> targets)
            Value::Bytes(bytes) => bytes
                .iter()
                .map(|b| T::from_value(&Value::Integer(i64::from(*b))))
                .collect(),
            Value::List(items) => {
                // Target elements are themselves lists but the result holds
                // none: the result is one level shallower, so it becomes the
                // sole element rather than being spread element-wise.
                if T::NESTING > 0
                    && !items.is_empty()
                    && !items.iter().any(|i| matches!(i, Value::List(_)))
                {
                    return Ok(vec![T::from_value(value)?]);
                }
                items.iter().map(T::from_value).collect()
            }
            single => Ok(vec![T::from_value(single)?]),
        }
    }
}

impl FromValue for HashMap<String, Value> {
    fn from_value(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Null => Ok(HashMap::new()),
            Value::Map(m) => Ok(m.clone()),
            Value::Node(n) => Ok(n.properties.clone()),
            Value::Relationship(r) => Ok(r.properties.clone()),
            other => Err(BindError::Coercion {
                got: other.kind_name(),
                want: "map",
            }),
        }
    }
}
