//! Scene-level variables
//!
//! Variables are declared in the scene document with an id, a display name
//! and an initial value. Rules reference them by id through [`VariableRef`].

use crate::archive::{Reader, Writer};
use crate::props::{PropKind, PropValue};
use crate::value::ExpressionValue;
use indexmap::IndexMap;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Reference to a variable by id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef(Arc<str>);

impl VariableRef {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// A reference that names no variable
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for VariableRef {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariableRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl PropValue for VariableRef {
    const KIND: PropKind = PropKind::Variable;

    fn to_expression(&self) -> ExpressionValue {
        ExpressionValue::String(self.0.clone())
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        value.as_str().map(VariableRef::new)
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        reader.str(key).map(VariableRef::new)
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        writer.str(key, &self.0);
    }
}

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    initial: ExpressionValue,
    value: ExpressionValue,
}

/// The variable table of a scene
#[derive(Debug, Clone, Default)]
pub struct Variables {
    vars: IndexMap<String, Variable>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) a variable, resetting it to `initial`
    pub fn declare(&mut self, id: &str, name: &str, initial: ExpressionValue) -> VariableRef {
        self.vars.insert(
            id.to_string(),
            Variable {
                name: name.to_string(),
                value: initial.clone(),
                initial,
            },
        );
        VariableRef::new(id)
    }

    /// Replace the table with the declarations in the array at `key`
    pub fn read(&mut self, reader: &Reader<'_>, key: &str) {
        self.vars.clear();
        reader.each(key, |var| {
            let Some(id) = var.str("id") else {
                tracing::warn!("variable without id skipped");
                return;
            };
            let initial = var.expression("initialValue").unwrap_or_default();
            self.declare(id, var.str_or("name", id), initial);
        });
    }

    pub fn write(&self, writer: &mut Writer, key: &str) {
        writer.arr(key, |items| {
            for (id, var) in &self.vars {
                let initial = match &var.initial {
                    ExpressionValue::Number(n) => json!(n),
                    ExpressionValue::String(s) => json!(&**s),
                };
                items.push(json!({ "id": id, "name": var.name, "initialValue": initial }));
            }
        });
    }

    pub fn contains(&self, var: &VariableRef) -> bool {
        self.vars.contains_key(var.id())
    }

    /// Current value, or the default value for an unknown variable
    pub fn get(&self, var: &VariableRef) -> ExpressionValue {
        self.vars
            .get(var.id())
            .map(|v| v.value.clone())
            .unwrap_or_default()
    }

    /// Assign a variable. Returns `true` only if the value changed.
    pub fn set(&mut self, var: &VariableRef, value: ExpressionValue) -> bool {
        match self.vars.get_mut(var.id()) {
            Some(entry) if entry.value != value => {
                entry.value = value;
                true
            }
            _ => false,
        }
    }

    /// Restore one variable to its initial value. Returns `true` if it changed.
    pub fn reset(&mut self, var: &VariableRef) -> bool {
        match self.vars.get_mut(var.id()) {
            Some(entry) if entry.value != entry.initial => {
                entry.value = entry.initial.clone();
                true
            }
            _ => false,
        }
    }

    /// Restore every variable, returning the ones that changed
    pub fn reset_all(&mut self) -> Vec<VariableRef> {
        let mut changed = Vec::new();
        for (id, entry) in self.vars.iter_mut() {
            if entry.value != entry.initial {
                entry.value = entry.initial.clone();
                changed.push(VariableRef::new(id));
            }
        }
        changed
    }

    /// Find a variable's reference by display name
    pub fn by_name(&self, name: &str) -> Option<VariableRef> {
        self.vars
            .iter()
            .find(|(_, v)| v.name == name)
            .map(|(id, _)| VariableRef::new(id))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_changes() {
        let mut vars = Variables::new();
        let score = vars.declare("v1", "score", ExpressionValue::from(0.0));

        assert!(vars.set(&score, ExpressionValue::from(3.0)));
        assert!(!vars.set(&score, ExpressionValue::from(3.0)));
        assert_eq!(vars.get(&score), ExpressionValue::from(3.0));

        assert!(!vars.set(&VariableRef::new("missing"), ExpressionValue::from(1.0)));
        assert_eq!(vars.get(&VariableRef::new("missing")), ExpressionValue::default());
    }

    #[test]
    fn test_reset() {
        let mut vars = Variables::new();
        let a = vars.declare("a", "a", ExpressionValue::from(1.0));
        let b = vars.declare("b", "b", ExpressionValue::from("x"));
        vars.set(&a, ExpressionValue::from(5.0));

        assert_eq!(vars.reset_all(), vec![a.clone()]);
        assert_eq!(vars.get(&a), ExpressionValue::from(1.0));
        assert!(!vars.reset(&b));
    }

    #[test]
    fn test_read_write() {
        let doc = serde_json::json!({
            "variables": [
                { "id": "v1", "name": "score", "initialValue": 2 },
                { "name": "no id" },
                { "id": "v2", "name": "label", "initialValue": "hi" }
            ]
        });
        let mut vars = Variables::new();
        vars.read(&Reader::new(&doc), "variables");

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.by_name("score"), Some(VariableRef::new("v1")));
        assert_eq!(vars.get(&VariableRef::new("v2")).as_str(), Some("hi"));

        let mut writer = Writer::new();
        vars.write(&mut writer, "variables");
        let mut back = Variables::new();
        back.read(&Reader::new(&writer.into_value()), "variables");
        assert_eq!(back.get(&VariableRef::new("v1")), ExpressionValue::from(2.0));
    }
}
