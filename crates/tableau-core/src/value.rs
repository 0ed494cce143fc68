//! The value type carried between rules and properties

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A value flowing through rule parameters and property reads/writes
///
/// Either a number or a shared immutable string. Cloning a string value
/// shares the underlying `Arc<str>` and never copies the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpressionValue {
    Number(f64),
    String(Arc<str>),
}

impl Default for ExpressionValue {
    fn default() -> Self {
        ExpressionValue::Number(0.0)
    }
}

impl ExpressionValue {
    /// Check if this value is a number
    pub fn is_number(&self) -> bool {
        matches!(self, ExpressionValue::Number(_))
    }

    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, ExpressionValue::String(_))
    }

    /// Try to get this value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ExpressionValue::Number(n) => Some(*n),
            ExpressionValue::String(_) => None,
        }
    }

    /// Try to get this value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExpressionValue::String(s) => Some(s),
            ExpressionValue::Number(_) => None,
        }
    }

    /// Get the number, or `default` for a string value
    pub fn number_or(&self, default: f64) -> f64 {
        self.as_number().unwrap_or(default)
    }

    /// Nonzero numbers and nonempty strings are truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            ExpressionValue::Number(n) => *n != 0.0,
            ExpressionValue::String(s) => !s.is_empty(),
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            ExpressionValue::Number(_) => "number",
            ExpressionValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ExpressionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionValue::Number(n) => write!(f, "{}", n),
            ExpressionValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for ExpressionValue {
    fn from(n: f64) -> Self {
        ExpressionValue::Number(n)
    }
}

impl From<i32> for ExpressionValue {
    fn from(n: i32) -> Self {
        ExpressionValue::Number(n as f64)
    }
}

impl From<bool> for ExpressionValue {
    fn from(b: bool) -> Self {
        ExpressionValue::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<&str> for ExpressionValue {
    fn from(s: &str) -> Self {
        ExpressionValue::String(Arc::from(s))
    }
}

impl From<String> for ExpressionValue {
    fn from(s: String) -> Self {
        ExpressionValue::String(Arc::from(s))
    }
}

impl From<Arc<str>> for ExpressionValue {
    fn from(s: Arc<str>) -> Self {
        ExpressionValue::String(s)
    }
}
