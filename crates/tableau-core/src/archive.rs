//! JSON document reading and writing
//!
//! `Reader` walks a `serde_json::Value` with typed accessors that return
//! `None` (or a caller default) for missing or mistyped keys, so malformed
//! input degrades field by field instead of failing the whole document.
//!
//! A reader may carry a fallback object. Keys absent from the current object
//! are looked up in the fallback, which is how actors inherit unset fields
//! from their library blueprint. Entering a child object drops the fallback.

use crate::value::ExpressionValue;
use serde_json::{Map, Value};

/// Read cursor over a JSON object
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    cur: &'a Value,
    fallback: Option<&'a Value>,
}

impl<'a> Reader<'a> {
    /// Create a reader over a value
    pub fn new(value: &'a Value) -> Self {
        Self {
            cur: value,
            fallback: None,
        }
    }

    /// Attach an object consulted for keys the current object lacks
    pub fn with_fallback(mut self, fallback: Option<&'a Value>) -> Self {
        self.fallback = fallback.filter(|f| !std::ptr::eq(*f, self.cur));
        self
    }

    /// The underlying value
    pub fn value(&self) -> &'a Value {
        self.cur
    }

    /// The fallback object, if any
    pub fn fallback(&self) -> Option<&'a Value> {
        self.fallback
    }

    /// Look up a key in the current object, then in the fallback
    pub fn find(&self, key: &str) -> Option<&'a Value> {
        self.cur
            .get(key)
            .or_else(|| self.fallback.and_then(|f| f.get(key)))
    }

    pub fn has(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    pub fn num(&self, key: &str) -> Option<f64> {
        self.find(key).and_then(Value::as_f64)
    }

    pub fn num_or(&self, key: &str, default: f64) -> f64 {
        self.num(key).unwrap_or(default)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.find(key)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.find(key).and_then(Value::as_bool)
    }

    pub fn boolean_or(&self, key: &str, default: bool) -> bool {
        self.boolean(key).unwrap_or(default)
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.find(key).and_then(Value::as_str)
    }

    pub fn str_or(&self, key: &str, default: &'a str) -> &'a str {
        self.str(key).unwrap_or(default)
    }

    /// Read a number or string as an `ExpressionValue`
    pub fn expression(&self, key: &str) -> Option<ExpressionValue> {
        match self.find(key)? {
            Value::Number(n) => n.as_f64().map(ExpressionValue::Number),
            Value::String(s) => Some(ExpressionValue::from(s.as_str())),
            Value::Bool(b) => Some(ExpressionValue::from(*b)),
            _ => None,
        }
    }

    /// Enter the object at `key`
    ///
    /// Returns `None` without calling `f` if the key is missing or not an object.
    pub fn obj<R>(&self, key: &str, f: impl FnOnce(&Reader<'a>) -> R) -> Option<R> {
        self.find(key)
            .filter(|v| v.is_object())
            .map(|v| f(&Reader::new(v)))
    }

    /// Visit each element of the array at `key`
    pub fn each(&self, key: &str, mut f: impl FnMut(&Reader<'a>)) {
        if let Some(items) = self.find(key).and_then(Value::as_array) {
            for item in items {
                f(&Reader::new(item));
            }
        }
    }

    /// Number of elements in the array at `key` (0 if absent)
    pub fn arr_len(&self, key: &str) -> usize {
        self.find(key)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Visit each member of the current object, then fallback members the
    /// current object does not shadow
    pub fn each_member(&self, mut f: impl FnMut(&'a str, &Reader<'a>)) {
        let own = self.cur.as_object();
        if let Some(own) = own {
            for (key, value) in own {
                f(key.as_str(), &Reader::new(value));
            }
        }
        if let Some(fallback) = self.fallback.and_then(Value::as_object) {
            for (key, value) in fallback {
                if own.map_or(true, |o| !o.contains_key(key)) {
                    f(key.as_str(), &Reader::new(value));
                }
            }
        }
    }
}

/// Builder for a JSON object
#[derive(Debug, Clone, Default)]
pub struct Writer {
    map: Map<String, Value>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num(&mut self, key: &str, value: f64) {
        self.value(key, Value::from(value));
    }

    pub fn int(&mut self, key: &str, value: i64) {
        self.value(key, Value::from(value));
    }

    pub fn boolean(&mut self, key: &str, value: bool) {
        self.value(key, Value::Bool(value));
    }

    pub fn str(&mut self, key: &str, value: &str) {
        self.value(key, Value::String(value.to_string()));
    }

    pub fn expression(&mut self, key: &str, value: &ExpressionValue) {
        match value {
            ExpressionValue::Number(n) => self.num(key, *n),
            ExpressionValue::String(s) => self.str(key, s),
        }
    }

    /// Insert an arbitrary JSON value
    pub fn value(&mut self, key: &str, value: Value) {
        self.map.insert(key.to_string(), value);
    }

    /// Write a nested object built by `f`
    pub fn obj(&mut self, key: &str, f: impl FnOnce(&mut Writer)) {
        let mut child = Writer::new();
        f(&mut child);
        self.value(key, child.into_value());
    }

    /// Write an array built by `f`
    pub fn arr(&mut self, key: &str, f: impl FnOnce(&mut Vec<Value>)) {
        let mut items = Vec::new();
        f(&mut items);
        self.value(key, Value::Array(items));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.map)
    }
}

/// Remove every key of `doc` whose value equals the same key in `blueprint`
///
/// Applied to each component object of an inheriting actor so only the
/// fields that differ from the blueprint are stored. Numbers compare by
/// value, so `3` and `3.0` are equal.
pub fn strip_inherited(doc: &mut Value, blueprint: &Value) {
    let (Some(doc), Some(blueprint)) = (doc.as_object_mut(), blueprint.as_object()) else {
        return;
    };
    doc.retain(|key, value| !blueprint.get(key).map_or(false, |base| same_value(base, value)));
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
