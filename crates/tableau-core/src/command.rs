//! Deferred structural changes
//!
//! Behavior hooks cannot add or remove actors or components directly while
//! the scene is iterating over them. They push a [`SceneCommand`] instead,
//! and the scene applies the queue at the end of the current pass.

use crate::actors::ActorDesc;
use crate::identity::{ActorId, BehaviorId};
use crate::scene::Scene;
use std::collections::VecDeque;
use std::fmt;

/// A structural change applied after the current pass
pub enum SceneCommand {
    AddActor(ActorDesc),
    RemoveActor(ActorId),
    AddComponent { behavior: BehaviorId, actor: ActorId },
    EnableComponent { behavior: BehaviorId, actor: ActorId },
    DisableComponent { behavior: BehaviorId, actor: ActorId },
    RemoveComponent { behavior: BehaviorId, actor: ActorId },
    /// Arbitrary follow-up work with full scene access
    Run(Box<dyn FnOnce(&mut Scene)>),
}

impl fmt::Debug for SceneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneCommand::AddActor(desc) => f.debug_tuple("AddActor").field(desc).finish(),
            SceneCommand::RemoveActor(id) => f.debug_tuple("RemoveActor").field(id).finish(),
            SceneCommand::AddComponent { behavior, actor } => f
                .debug_struct("AddComponent")
                .field("behavior", behavior)
                .field("actor", actor)
                .finish(),
            SceneCommand::EnableComponent { behavior, actor } => f
                .debug_struct("EnableComponent")
                .field("behavior", behavior)
                .field("actor", actor)
                .finish(),
            SceneCommand::DisableComponent { behavior, actor } => f
                .debug_struct("DisableComponent")
                .field("behavior", behavior)
                .field("actor", actor)
                .finish(),
            SceneCommand::RemoveComponent { behavior, actor } => f
                .debug_struct("RemoveComponent")
                .field("behavior", behavior)
                .field("actor", actor)
                .finish(),
            SceneCommand::Run(_) => f.write_str("Run(..)"),
        }
    }
}

/// FIFO queue of pending scene commands
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<SceneCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: SceneCommand) {
        self.pending.push_back(command);
    }

    /// Queue a closure to run with full scene access
    pub fn defer(&mut self, f: impl FnOnce(&mut Scene) + 'static) {
        self.push(SceneCommand::Run(Box::new(f)));
    }

    pub fn remove_actor(&mut self, actor: ActorId) {
        self.push(SceneCommand::RemoveActor(actor));
    }

    pub fn disable_component(&mut self, behavior: BehaviorId, actor: ActorId) {
        self.push(SceneCommand::DisableComponent { behavior, actor });
    }

    pub fn pop(&mut self) -> Option<SceneCommand> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
