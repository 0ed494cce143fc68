//! Behavior catalogs
//!
//! [`TypeRegistry`] is filled once at startup: behavior factories, rule
//! elements and bridge receivers. It is shared between scenes behind an
//! `Arc`. Each scene instantiates its own [`BehaviorRegistry`] from it,
//! which holds the live behavior instances in registration order.

use crate::archive::Reader;
use crate::behavior::{Behavior, BehaviorType, DrawComponent};
use crate::error::{Error, Result};
use crate::identity::BehaviorId;
use crate::props::{PropertyDescriptor, Props};
use crate::rules::RuleRegistry;
use crate::scene::Scene;
use indexmap::IndexMap;
use serde::Serialize;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Handler for a named inbound bridge event
pub type BridgeReceiveFn = fn(&mut Scene, &Reader<'_>);

struct BehaviorFactory {
    id: BehaviorId,
    name: &'static str,
    display_name: &'static str,
    allows_disable_without_removal: bool,
    props: fn() -> &'static [PropertyDescriptor],
    build: fn() -> Box<dyn Behavior>,
}

fn build_behavior<B: BehaviorType + Default>() -> Box<dyn Behavior> {
    Box::new(B::default())
}

/// Editor-facing description of a registered behavior
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorMeta {
    pub id: BehaviorId,
    pub name: &'static str,
    pub display_name: &'static str,
    pub allows_disable_without_removal: bool,
    pub props: &'static [PropertyDescriptor],
}

/// Startup catalog of behavior types, rule elements and bridge receivers
#[derive(Default)]
pub struct TypeRegistry {
    behaviors: Vec<BehaviorFactory>,
    rules: RuleRegistry,
    receivers: IndexMap<String, BridgeReceiveFn>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior type. Both its id and its name must be unused.
    pub fn register_behavior<B: BehaviorType + Default>(&mut self) -> Result<()> {
        if self
            .behaviors
            .iter()
            .any(|factory| factory.id == B::ID || factory.name == B::NAME)
        {
            return Err(Error::DuplicateBehavior(B::NAME.to_string()));
        }
        self.behaviors.push(BehaviorFactory {
            id: B::ID,
            name: B::NAME,
            display_name: B::DISPLAY_NAME,
            allows_disable_without_removal: B::ALLOWS_DISABLE_WITHOUT_REMOVAL,
            props: <B::Props as Props>::descriptors,
            build: build_behavior::<B>,
        });
        Ok(())
    }

    /// Register the handler for inbound bridge events named `name`
    pub fn register_bridge_receiver(&mut self, name: &str, receive: BridgeReceiveFn) -> Result<()> {
        if self.receivers.contains_key(name) {
            return Err(Error::DuplicateBridgeReceiver(name.to_string()));
        }
        self.receivers.insert(name.to_string(), receive);
        Ok(())
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleRegistry {
        &mut self.rules
    }

    pub fn bridge_receiver(&self, name: &str) -> Option<BridgeReceiveFn> {
        self.receivers.get(name).copied()
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    pub fn behavior_metadata(&self) -> Vec<BehaviorMeta> {
        self.behaviors
            .iter()
            .map(|factory| BehaviorMeta {
                id: factory.id,
                name: factory.name,
                display_name: factory.display_name,
                allows_disable_without_removal: factory.allows_disable_without_removal,
                props: (factory.props)(),
            })
            .collect()
    }

    /// Build fresh behavior instances for a new scene
    pub fn instantiate(&self) -> BehaviorRegistry {
        let mut registry = BehaviorRegistry::default();
        for factory in &self.behaviors {
            registry.push((factory.build)());
        }
        registry
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.behaviors.iter().map(|factory| factory.name).collect();
        f.debug_struct("TypeRegistry")
            .field("behaviors", &names)
            .field("rules", &self.rules)
            .field("receivers", &self.receivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A scene's behavior instances
///
/// Lookup by type, by id and by name all resolve to the same instance.
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: Vec<Box<dyn Behavior>>,
    by_type: HashMap<TypeId, usize>,
    by_id: HashMap<BehaviorId, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl BehaviorRegistry {
    fn push(&mut self, behavior: Box<dyn Behavior>) {
        let index = self.behaviors.len();
        self.by_type.insert(behavior.as_any().type_id(), index);
        self.by_id.insert(behavior.behavior_id(), index);
        self.by_name.insert(behavior.name(), index);
        self.behaviors.push(behavior);
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn get<B: BehaviorType>(&self) -> Option<&B> {
        let index = *self.by_type.get(&TypeId::of::<B>())?;
        self.behaviors[index].as_any().downcast_ref::<B>()
    }

    pub fn get_mut<B: BehaviorType>(&mut self) -> Option<&mut B> {
        let index = *self.by_type.get(&TypeId::of::<B>())?;
        self.behaviors[index].as_any_mut().downcast_mut::<B>()
    }

    pub fn by_id(&self, id: BehaviorId) -> Option<&dyn Behavior> {
        let index = *self.by_id.get(&id)?;
        Some(self.behaviors[index].as_ref())
    }

    pub fn by_id_mut(&mut self, id: BehaviorId) -> Option<&mut dyn Behavior> {
        let index = *self.by_id.get(&id)?;
        Some(self.behaviors[index].as_mut())
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn Behavior> {
        let index = *self.by_name.get(name)?;
        Some(self.behaviors[index].as_ref())
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut dyn Behavior> {
        let index = *self.by_name.get(name)?;
        Some(self.behaviors[index].as_mut())
    }

    pub fn index_of<B: BehaviorType>(&self) -> Option<usize> {
        self.by_type.get(&TypeId::of::<B>()).copied()
    }

    pub fn index_of_id(&self, id: BehaviorId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn get_index(&self, index: usize) -> Option<&dyn Behavior> {
        self.behaviors.get(index).map(|b| b.as_ref())
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut dyn Behavior> {
        match self.behaviors.get_mut(index) {
            Some(behavior) => Some(behavior.as_mut()),
            None => None,
        }
    }

    /// Visit every behavior in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Behavior> {
        self.behaviors.iter().map(|b| b.as_ref())
    }

    pub fn for_each(&self, mut f: impl FnMut(&dyn Behavior)) {
        for behavior in &self.behaviors {
            f(behavior.as_ref());
        }
    }

    /// Visit only behaviors with the draw capability
    pub fn for_each_drawable(&self, mut f: impl FnMut(&dyn Behavior, &dyn DrawComponent)) {
        for behavior in &self.behaviors {
            if let Some(drawable) = behavior.drawable() {
                f(behavior.as_ref(), drawable);
            }
        }
    }
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.behaviors.iter().map(|b| b.name()))
            .finish()
    }
}
