//! Behaviors and their components
//!
//! A behavior is one kind of capability (tags, text, music...). It owns a
//! sparse [`ComponentStore`] mapping actor ids to that actor's component for
//! the behavior. Each behavior is implemented once as a [`BehaviorType`], a
//! typed trait with hook methods that all have defaults. A blanket impl
//! turns every `BehaviorType` into the object-safe [`Behavior`] trait the
//! scene stores and dispatches through.
//!
//! Hooks receive a [`BehaviorCx`] with read access to the actor directory
//! and write access to the deferred command queue and the outbox. Structural
//! changes requested from a hook are applied after the hook returns.

use crate::actors::ActorDirectory;
use crate::archive::{Reader, Writer};
use crate::bridge::Outbox;
use crate::command::CommandQueue;
use crate::config::SceneConfig;
use crate::identity::{ActorId, BehaviorId};
use crate::props::{PropId, PropertyDescriptor, Props};
use crate::rules::RuleRegistry;
use crate::value::ExpressionValue;
use indexmap::IndexMap;
use std::any::Any;

/// One actor's data for one behavior
#[derive(Debug, Clone)]
pub struct Component<P, S = ()> {
    pub props: P,
    /// Derived data not stored in documents (caches, handles)
    pub state: S,
    enabled: bool,
}

impl<P, S> Component<P, S> {
    /// A new component starts disabled
    pub fn new(props: P, state: S) -> Self {
        Self {
            props,
            state,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Sparse map from actor to component, in insertion order
#[derive(Debug, Clone)]
pub struct ComponentStore<P, S = ()> {
    components: IndexMap<ActorId, Component<P, S>>,
}

impl<P, S> Default for ComponentStore<P, S> {
    fn default() -> Self {
        Self {
            components: IndexMap::new(),
        }
    }
}

impl<P, S> ComponentStore<P, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.components.contains_key(&actor)
    }

    pub fn get(&self, actor: ActorId) -> Option<&Component<P, S>> {
        self.components.get(&actor)
    }

    pub fn get_mut(&mut self, actor: ActorId) -> Option<&mut Component<P, S>> {
        self.components.get_mut(&actor)
    }

    /// The component only if it exists and is enabled
    pub fn get_enabled(&self, actor: ActorId) -> Option<&Component<P, S>> {
        self.get(actor).filter(|c| c.enabled)
    }

    pub fn insert(&mut self, actor: ActorId, component: Component<P, S>) {
        self.components.insert(actor, component);
    }

    pub fn remove(&mut self, actor: ActorId) -> Option<Component<P, S>> {
        self.components.shift_remove(&actor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &Component<P, S>)> {
        self.components.iter().map(|(id, c)| (*id, c))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ActorId, &mut Component<P, S>)> {
        self.components.iter_mut().map(|(id, c)| (*id, c))
    }

    pub fn iter_enabled(&self) -> impl Iterator<Item = (ActorId, &Component<P, S>)> {
        self.iter().filter(|(_, c)| c.enabled)
    }

    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.components.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn set_enabled(&mut self, actor: ActorId, enabled: bool) -> bool {
        match self.components.get_mut(&actor) {
            Some(c) if c.enabled != enabled => {
                c.enabled = enabled;
                true
            }
            _ => false,
        }
    }
}

/// What behavior hooks may touch besides their own components
pub struct BehaviorCx<'a> {
    pub directory: &'a ActorDirectory,
    pub rules: &'a RuleRegistry,
    pub commands: &'a mut CommandQueue,
    pub outbox: &'a mut Outbox,
    pub config: &'a SceneConfig,
}

/// Receiver of draw calls from the scene's draw pass
pub trait DrawSink {
    fn draw_asset(&mut self, actor: ActorId, asset: &str, frame: f64);

    fn draw_text(&mut self, _actor: ActorId, _text: &str) {}
}

/// Capability of behaviors whose components render
pub trait DrawComponent {
    fn draw_component(&self, actor: ActorId, sink: &mut dyn DrawSink);
}

/// A behavior implementation
///
/// Only `components`/`components_mut` are required. Every hook defaults to
/// doing nothing, and the property hooks default to the generic
/// props-record implementation. An override of `handle_set_property` should
/// still call [`set_component_property`] for the actual assignment.
pub trait BehaviorType: Sized + 'static {
    type Props: Props;
    type State: Default + 'static;

    const ID: BehaviorId;
    const NAME: &'static str;
    const DISPLAY_NAME: &'static str = Self::NAME;

    /// Whether a component may sit disabled on an actor. When `false` the
    /// disable hook must fully release derived state.
    const ALLOWS_DISABLE_WITHOUT_REMOVAL: bool = true;

    fn components(&self) -> &ComponentStore<Self::Props, Self::State>;

    fn components_mut(&mut self) -> &mut ComponentStore<Self::Props, Self::State>;

    fn handle_add_component(&mut self, _actor: ActorId, _cx: &mut BehaviorCx<'_>) {}

    fn handle_enable_component(&mut self, _actor: ActorId, _cx: &mut BehaviorCx<'_>) {}

    /// `removing_actor` is set when the whole actor is being removed
    fn handle_disable_component(&mut self, _actor: ActorId, _removing_actor: bool, _cx: &mut BehaviorCx<'_>) {}

    /// Runs after the component is disabled and before it is erased
    fn handle_remove_component(&mut self, _actor: ActorId, _cx: &mut BehaviorCx<'_>) {}

    /// Read behavior-specific extra state after the props were read
    fn handle_read_component(&mut self, _actor: ActorId, _reader: &Reader<'_>, _cx: &mut BehaviorCx<'_>) {}

    /// Write behavior-specific extra state after the props were written
    fn handle_write_component(&self, _actor: ActorId, _writer: &mut Writer) {}

    fn handle_get_property(&self, actor: ActorId, prop: PropId) -> ExpressionValue {
        get_component_property(self, actor, prop)
    }

    fn handle_set_property(
        &mut self,
        actor: ActorId,
        prop: PropId,
        value: &ExpressionValue,
        _interactive: bool,
        _cx: &mut BehaviorCx<'_>,
    ) -> bool {
        set_component_property(self, actor, prop, value)
    }

    /// Per-frame work
    fn handle_perform(&mut self, _dt: f64, _cx: &mut BehaviorCx<'_>) {}

    fn as_drawable(&self) -> Option<&dyn DrawComponent> {
        None
    }
}

/// Generic property read: the component's props record, or the default value
pub fn get_component_property<B: BehaviorType>(behavior: &B, actor: ActorId, prop: PropId) -> ExpressionValue {
    behavior
        .components()
        .get(actor)
        .and_then(|c| c.props.get(prop))
        .unwrap_or_default()
}

/// Generic property write into the component's props record
pub fn set_component_property<B: BehaviorType>(
    behavior: &mut B,
    actor: ActorId,
    prop: PropId,
    value: &ExpressionValue,
) -> bool {
    behavior
        .components_mut()
        .get_mut(actor)
        .map_or(false, |c| c.props.set(prop, value))
}

/// Object-safe view of a behavior
pub trait Behavior: Any {
    fn behavior_id(&self) -> BehaviorId;
    fn name(&self) -> &'static str;
    fn display_name(&self) -> &'static str;
    fn allows_disable_without_removal(&self) -> bool;
    fn property_descriptors(&self) -> &'static [PropertyDescriptor];

    fn has_component(&self, actor: ActorId) -> bool;
    fn is_component_enabled(&self, actor: ActorId) -> bool;
    fn component_count(&self) -> usize;
    fn component_actors(&self) -> Vec<ActorId>;

    /// Create a default, disabled component. `false` if one already exists.
    fn add_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) -> bool;
    /// `false` (and no hook) if absent or already enabled
    fn enable_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) -> bool;
    /// `false` (and no hook) if absent or already disabled
    fn disable_component(&mut self, actor: ActorId, removing_actor: bool, cx: &mut BehaviorCx<'_>) -> bool;
    /// Disable if needed, run the remove hook, erase. `false` if absent.
    fn remove_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) -> bool;

    /// Property value, or the default value if the actor has no component
    fn get_property(&self, actor: ActorId, prop: PropId) -> ExpressionValue;
    fn set_property(
        &mut self,
        actor: ActorId,
        prop: PropId,
        value: &ExpressionValue,
        interactive: bool,
        cx: &mut BehaviorCx<'_>,
    ) -> bool;

    fn read_component(&mut self, actor: ActorId, reader: &Reader<'_>, cx: &mut BehaviorCx<'_>);
    /// Write props and extra state. `false` if the actor has no component.
    fn write_component(&self, actor: ActorId, writer: &mut Writer) -> bool;

    fn perform(&mut self, dt: f64, cx: &mut BehaviorCx<'_>);
    fn drawable(&self) -> Option<&dyn DrawComponent>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn property_descriptor(&self, prop: PropId) -> Option<&'static PropertyDescriptor> {
        self.property_descriptors().iter().find(|d| d.id == prop)
    }

    /// Read on behalf of a rule. Props without `rules_get` read as the default.
    fn get_property_for_rule(&self, actor: ActorId, prop: PropId) -> ExpressionValue {
        match self.property_descriptor(prop) {
            Some(descriptor) if descriptor.attribs.rules_get => self.get_property(actor, prop),
            _ => ExpressionValue::default(),
        }
    }

    /// Write on behalf of a rule. Props without `rules_set` are left untouched.
    fn set_property_for_rule(
        &mut self,
        actor: ActorId,
        prop: PropId,
        value: &ExpressionValue,
        cx: &mut BehaviorCx<'_>,
    ) -> bool {
        match self.property_descriptor(prop) {
            Some(descriptor) if descriptor.attribs.rules_set => {
                self.set_property(actor, prop, value, false, cx)
            }
            _ => false,
        }
    }
}

impl<B: BehaviorType> Behavior for B {
    fn behavior_id(&self) -> BehaviorId {
        B::ID
    }

    fn name(&self) -> &'static str {
        B::NAME
    }

    fn display_name(&self) -> &'static str {
        B::DISPLAY_NAME
    }

    fn allows_disable_without_removal(&self) -> bool {
        B::ALLOWS_DISABLE_WITHOUT_REMOVAL
    }

    fn property_descriptors(&self) -> &'static [PropertyDescriptor] {
        <B::Props as Props>::descriptors()
    }

    fn has_component(&self, actor: ActorId) -> bool {
        self.components().contains(actor)
    }

    fn is_component_enabled(&self, actor: ActorId) -> bool {
        self.components().get_enabled(actor).is_some()
    }

    fn component_count(&self) -> usize {
        self.components().len()
    }

    fn component_actors(&self) -> Vec<ActorId> {
        self.components().actor_ids().collect()
    }

    fn add_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) -> bool {
        if self.components().contains(actor) {
            return false;
        }
        self.components_mut()
            .insert(actor, Component::new(B::Props::default(), B::State::default()));
        self.handle_add_component(actor, cx);
        true
    }

    fn enable_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) -> bool {
        if !self.components_mut().set_enabled(actor, true) {
            return false;
        }
        self.handle_enable_component(actor, cx);
        true
    }

    fn disable_component(&mut self, actor: ActorId, removing_actor: bool, cx: &mut BehaviorCx<'_>) -> bool {
        if !self.components_mut().set_enabled(actor, false) {
            return false;
        }
        self.handle_disable_component(actor, removing_actor, cx);
        true
    }

    fn remove_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) -> bool {
        if !self.components().contains(actor) {
            return false;
        }
        self.disable_component(actor, false, cx);
        self.handle_remove_component(actor, cx);
        self.components_mut().remove(actor);
        true
    }

    fn get_property(&self, actor: ActorId, prop: PropId) -> ExpressionValue {
        if !self.components().contains(actor) {
            return ExpressionValue::default();
        }
        self.handle_get_property(actor, prop)
    }

    fn set_property(
        &mut self,
        actor: ActorId,
        prop: PropId,
        value: &ExpressionValue,
        interactive: bool,
        cx: &mut BehaviorCx<'_>,
    ) -> bool {
        if !self.components().contains(actor) {
            return false;
        }
        self.handle_set_property(actor, prop, value, interactive, cx)
    }

    fn read_component(&mut self, actor: ActorId, reader: &Reader<'_>, cx: &mut BehaviorCx<'_>) {
        let Some(component) = self.components_mut().get_mut(actor) else {
            return;
        };
        component.props.read(reader);
        self.handle_read_component(actor, reader, cx);
    }

    fn write_component(&self, actor: ActorId, writer: &mut Writer) -> bool {
        let Some(component) = self.components().get(actor) else {
            return false;
        };
        component.props.write(writer);
        self.handle_write_component(actor, writer);
        true
    }

    fn perform(&mut self, dt: f64, cx: &mut BehaviorCx<'_>) {
        self.handle_perform(dt, cx);
    }

    fn drawable(&self) -> Option<&dyn DrawComponent> {
        self.as_drawable()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
