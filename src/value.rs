//! Native record value model.
//!
//! `Value` is the closed set of kinds a result row cell can hold. It is the
//! carrier between the executor seam (rows coming back from a driver) and the
//! binder, and also the representation of constant parameters registered
//! through the scope.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// A graph node as returned by a driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeValue {
    pub element_id: String,
    /// Label set in driver order. Used for polymorphic resolution.
    pub labels: Vec<String>,
    pub properties: HashMap<String, Value>,
}

/// A relationship as returned by a driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationshipValue {
    pub element_id: String,
    pub rel_type: String,
    pub start_element_id: String,
    pub end_element_id: String,
    pub properties: HashMap<String, Value>,
}

/// One native record value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    LocalDateTime(NaiveDateTime),
    DateTime(DateTime<Utc>),
    Duration {
        months: i64,
        days: i64,
        seconds: i64,
        nanos: i32,
    },
    Point {
        srid: u32,
        x: f64,
        y: f64,
        z: Option<f64>,
    },
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Node(NodeValue),
    Relationship(RelationshipValue),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Kind name for diagnostics and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::LocalDateTime(_) => "local_datetime",
            Value::DateTime(_) => "datetime",
            Value::Duration { .. } => "duration",
            Value::Point { .. } => "point",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Node(_) => "node",
            Value::Relationship(_) => "relationship",
        }
    }

    /// Whether this value is the zero value of its kind.
    ///
    /// The scope uses this to decide which entity fields contribute to a
    /// property-block parameter: only non-zero fields are sent.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Permissive integer cast: integer, float, numeric string, bool.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Permissive float cast: float, integer, numeric string.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Permissive bool cast: bool, 0/1 integer, "true"/"false" string.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(0) => Some(false),
            Value::Integer(1) => Some(true),
            Value::String(s) => match s.trim() {
                "true" | "TRUE" | "True" => Some(true),
                "false" | "FALSE" | "False" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Permissive string cast: string, number, bool.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Property map of a node or relationship value, if this is one.
    pub fn entity_properties(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Node(n) => Some(&n.properties),
            Value::Relationship(r) => Some(&r.properties),
            _ => None,
        }
    }

    /// Convert to a plain JSON value for the binder's structural fallback.
    ///
    /// Nodes and relationships flatten to their property objects; temporal
    /// kinds render as their canonical string form.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Integer(i) => J::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f).map(J::Number).unwrap_or(J::Null),
            Value::String(s) => J::String(s.clone()),
            Value::Bytes(b) => J::Array(b.iter().map(|x| J::from(*x)).collect()),
            Value::Date(d) => J::String(d.to_string()),
            Value::Time(t) => J::String(t.to_string()),
            Value::LocalDateTime(dt) => J::String(dt.to_string()),
            Value::DateTime(dt) => J::String(dt.to_rfc3339()),
            Value::Duration {
                months,
                days,
                seconds,
                nanos,
            } => serde_json::json!({
                "months": months, "days": days, "seconds": seconds, "nanos": nanos
            }),
            Value::Point { srid, x, y, z } => serde_json::json!({
                "srid": srid, "x": x, "y": y, "z": z
            }),
            Value::List(items) => J::Array(items.iter().map(|v| v.to_json()).collect()),
            Value::Map(m) => J::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            Value::Node(n) => J::Object(
                n.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Relationship(r) => J::Object(
                r.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Convert a plain JSON value into a record value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as J;
        match json {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(*b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            J::String(s) => Value::String(s.clone()),
            J::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            J::Object(m) => Value::Map(m.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(v as i64)
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::LocalDateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<NodeValue> for Value {
    fn from(v: NodeValue) -> Self {
        Value::Node(v)
    }
}

impl From<RelationshipValue> for Value {
    fn from(v: RelationshipValue) -> Self {
        Value::Relationship(v)
    }
}
