//! Tag values

use crate::archive::{Reader, Writer};
use crate::props::{PropKind, PropValue};
use crate::value::ExpressionValue;
use std::fmt;
use std::sync::Arc;

/// A normalized (trimmed, lowercased) tag
///
/// The empty tag is the wildcard: as a rule filter it matches every tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Arc<str>);

impl Tag {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name.trim().to_lowercase()))
    }

    /// The wildcard tag
    pub fn empty() -> Self {
        Self(Arc::from(""))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A tag list entry holds exactly one word; whitespace inside would
    /// split it on the next reparse
    pub fn is_single_word(&self) -> bool {
        !self.is_empty() && !self.0.chars().any(char::is_whitespace)
    }

    /// Whether this tag, used as a filter, admits `other`
    pub fn matches(&self, other: &Tag) -> bool {
        self.is_empty() || self == other
    }

    /// Split a whitespace-separated tag list, dropping duplicates
    pub fn parse_list(tags: &str) -> impl Iterator<Item = Tag> + '_ {
        let mut seen: Vec<Tag> = Vec::new();
        tags.split_whitespace().map(Tag::new).filter(move |tag| {
            if seen.contains(tag) {
                false
            } else {
                seen.push(tag.clone());
                true
            }
        })
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::new(name)
    }
}

impl PropValue for Tag {
    const KIND: PropKind = PropKind::Tag;

    fn to_expression(&self) -> ExpressionValue {
        ExpressionValue::String(self.0.clone())
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        value.as_str().map(Tag::new)
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        reader.str(key).map(Tag::new)
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        writer.str(key, &self.0);
    }
}
