//! Event bridge to the host
//!
//! Inbound events may come from any thread through a [`BridgeSender`]. They
//! are buffered in a channel and dispatched to named receivers on the scene
//! thread during `Scene::update`. The channel is the only point where the
//! scene synchronizes with other threads.
//!
//! Outbound events produced by behaviors collect in an [`Outbox`] until the
//! host takes them.

use crate::error::Result;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named event with JSON parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEvent {
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

impl BridgeEvent {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Thread-safe handle for delivering events into a scene
#[derive(Debug, Clone)]
pub struct BridgeSender {
    tx: Sender<BridgeEvent>,
}

impl BridgeSender {
    /// Queue an event. Returns `false` if the scene has been dropped.
    pub fn send(&self, event: BridgeEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Parse `{"name": .., "params": ..}` and queue it
    pub fn send_json(&self, json: &str) -> Result<bool> {
        let event: BridgeEvent = serde_json::from_str(json)?;
        Ok(self.send(event))
    }
}

/// Inbound side of the bridge, owned by the scene
#[derive(Debug)]
pub struct Inbox {
    tx: Sender<BridgeEvent>,
    rx: Receiver<BridgeEvent>,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> BridgeSender {
        BridgeSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every event queued so far
    pub fn drain(&self) -> Vec<BridgeEvent> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Outbound events waiting for the host
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<BridgeEvent>,
}

impl Outbox {
    pub fn send(&mut self, name: impl Into<String>, params: Value) {
        self.events.push(BridgeEvent::new(name, params));
    }

    pub fn take(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[BridgeEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
