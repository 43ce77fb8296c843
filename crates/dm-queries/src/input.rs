//! Declarative Filter Input
//!
//! The loosely-shaped structure callers hand to the declarative parser:
//! nested maps and lists of scalars, with raw expressions allowed anywhere a
//! value is. Maps keep insertion order and may repeat keys.

use std::fmt;

use dm_core::Value;

use crate::filters::RawExpression;

/// Key of one declarative entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKey {
    /// Positional key (list index or integer map key)
    Index(usize),
    /// Named key: a field name, `:AND`/`:OR`, or a query rule
    Name(String),
}

impl FilterKey {
    /// Integer-like keys count as numeric, including names such as `"0"`
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Index(_) => true,
            Self::Name(name) => name.parse::<i64>().is_ok(),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for FilterKey {
    fn from(v: &str) -> Self {
        Self::Name(v.to_string())
    }
}

impl From<String> for FilterKey {
    fn from(v: String) -> Self {
        Self::Name(v)
    }
}

impl From<usize> for FilterKey {
    fn from(v: usize) -> Self {
        Self::Index(v)
    }
}

/// One node of declarative input
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    Scalar(Value),
    List(Vec<FilterInput>),
    Map(Vec<(FilterKey, FilterInput)>),
    Expression(RawExpression),
}

impl FilterInput {
    /// Build a map from `(key, value)` pairs, keeping their order
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<FilterKey>,
        V: Into<FilterInput>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list
    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<FilterInput>,
        I: IntoIterator<Item = V>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    /// View as an ordered list.
    ///
    /// A `List` qualifies, and so does a `Map` whose keys are exactly
    /// `0..n` in order. Maps mixing named and positional keys do not.
    pub fn as_sequence(&self) -> Option<Vec<&FilterInput>> {
        match self {
            Self::List(items) => Some(items.iter().collect()),
            Self::Map(entries) => {
                let sequential = entries
                    .iter()
                    .enumerate()
                    .all(|(i, (key, _))| matches!(key, FilterKey::Index(k) if *k == i));
                sequential.then(|| entries.iter().map(|(_, v)| v).collect())
            }
            _ => None,
        }
    }

    /// Keyed entries of a composite; list items are keyed by position
    pub fn entries(&self) -> Option<Vec<(FilterKey, &FilterInput)>> {
        match self {
            Self::List(items) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (FilterKey::Index(i), v))
                    .collect(),
            ),
            Self::Map(entries) => Some(entries.iter().map(|(k, v)| (k.clone(), v)).collect()),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Scalar(v) => v.to_string(),
            Self::List(items) => format!("list of {}", items.len()),
            Self::Map(entries) => format!("map of {}", entries.len()),
            Self::Expression(expr) => expr.sql.clone(),
        }
    }

    /// Convert parsed JSON. Object key order is preserved.
    pub fn from_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Self::Scalar(Value::Null),
            Json::Bool(b) => Self::Scalar(Value::Bool(b)),
            Json::Number(n) => Self::Scalar(match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Json::String(s) => Self::Scalar(Value::String(s)),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (FilterKey::Name(k), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for FilterInput {
    fn from(v: Value) -> Self {
        Self::Scalar(v)
    }
}

impl From<RawExpression> for FilterInput {
    fn from(v: RawExpression) -> Self {
        Self::Expression(v)
    }
}

impl From<&str> for FilterInput {
    fn from(v: &str) -> Self {
        Self::Scalar(Value::from(v))
    }
}

impl From<String> for FilterInput {
    fn from(v: String) -> Self {
        Self::Scalar(Value::from(v))
    }
}

impl From<i32> for FilterInput {
    fn from(v: i32) -> Self {
        Self::Scalar(Value::from(v))
    }
}

impl From<i64> for FilterInput {
    fn from(v: i64) -> Self {
        Self::Scalar(Value::from(v))
    }
}

impl From<bool> for FilterInput {
    fn from(v: bool) -> Self {
        Self::Scalar(Value::from(v))
    }
}

impl From<serde_json::Value> for FilterInput {
    fn from(v: serde_json::Value) -> Self {
        Self::from_json(v)
    }
}
