//! Library of reusable actor blueprints
//!
//! Actors created from a library entry record the entry id as their parent.
//! When read with inheritance, an actor's components fall back to the
//! blueprint for every field the actor does not set itself.

use crate::archive::{Reader, Writer};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One blueprint in the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub entry_id: String,
    #[serde(default)]
    pub title: String,
    /// Actor document: `{"components": {BehaviorName: {...}}}`
    #[serde(default)]
    pub actor_blueprint: Value,
}

impl LibraryEntry {
    pub fn new(entry_id: impl Into<String>, title: impl Into<String>, actor_blueprint: Value) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: title.into(),
            actor_blueprint,
        }
    }

    /// The blueprint's document for one behavior, if it has that component
    pub fn component(&self, behavior_name: &str) -> Option<&Value> {
        self.actor_blueprint
            .get("components")
            .and_then(|components| components.get(behavior_name))
    }
}

/// Blueprints keyed by entry id
#[derive(Debug, Clone, Default)]
pub struct Library {
    entries: IndexMap<String, LibraryEntry>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, entry: LibraryEntry) {
        self.entries.insert(entry.entry_id.clone(), entry);
    }

    pub fn remove(&mut self, entry_id: &str) -> Option<LibraryEntry> {
        self.entries.shift_remove(entry_id)
    }

    pub fn get(&self, entry_id: &str) -> Option<&LibraryEntry> {
        self.entries.get(entry_id)
    }

    /// Read one entry object. Entries without an id are skipped.
    pub fn read_entry(&mut self, reader: &Reader<'_>) -> Option<&LibraryEntry> {
        match serde_json::from_value::<LibraryEntry>(reader.value().clone()) {
            Ok(entry) => {
                let entry_id = entry.entry_id.clone();
                self.insert(entry);
                self.entries.get(&entry_id)
            }
            Err(err) => {
                tracing::warn!(%err, "library entry skipped");
                None
            }
        }
    }

    /// Replace the library with the entries in the array at `key`
    pub fn read(&mut self, reader: &Reader<'_>, key: &str) {
        self.entries.clear();
        reader.each(key, |entry| {
            self.read_entry(entry);
        });
    }

    pub fn write(&self, writer: &mut Writer, key: &str) {
        writer.arr(key, |items| {
            for entry in self.entries.values() {
                if let Ok(value) = serde_json::to_value(entry) {
                    items.push(value);
                }
            }
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
