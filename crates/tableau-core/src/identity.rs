//! Identity types for actors and behaviors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an actor within a scene
///
/// Ids are allocated from a counter that only grows, so an id freed by
/// removing an actor is never handed out again by fresh allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u32);

impl ActorId {
    /// Create a new actor ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

impl From<u32> for ActorId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Stable numeric identifier of a behavior type
///
/// These ids appear in authored rule data (`behaviorId`) so they must never
/// change once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorId(pub u32);

impl BehaviorId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "behavior:{}", self.0)
    }
}

impl From<u32> for BehaviorId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_display() {
        assert_eq!(ActorId::new(7).to_string(), "actor:7");
        assert_eq!(BehaviorId::new(16).to_string(), "behavior:16");
    }

    #[test]
    fn test_actor_id_serializes_transparently() {
        let json = serde_json::to_string(&ActorId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: ActorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActorId::new(42));
    }
}
