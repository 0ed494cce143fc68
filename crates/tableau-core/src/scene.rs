//! The scene: actors, behaviors and rules wired together
//!
//! A [`Scene`] owns every piece of mutable state: the actor directory, one
//! instance of each registered behavior, the library, variables, deferred
//! commands and the bridge endpoints. It is driven from a single thread.
//! Other threads only reach it through a [`BridgeSender`].
//!
//! ## Frame
//!
//! [`Scene::update`] runs one frame:
//!
//! 1. dispatch inbound bridge events
//! 2. fire pending `create` triggers
//! 3. run every behavior's perform hook, in registration order
//! 4. apply deferred commands
//! 5. materialize draw order
//! 6. rebuild from the loaded document if a restart was requested
//!
//! [`Scene::draw`] is separate and does not mutate anything.

use crate::actors::{ActorDesc, ActorDirectory, DrawOrderParams};
use crate::archive::{strip_inherited, Reader, Writer};
use crate::behavior::{Behavior, BehaviorCx, BehaviorType, DrawSink};
use crate::bridge::{BridgeEvent, BridgeSender, Inbox, Outbox};
use crate::command::{CommandQueue, SceneCommand};
use crate::config::SceneConfig;
use crate::error::{Error, Result};
use crate::identity::{ActorId, BehaviorId};
use crate::library::Library;
use crate::props::PropId;
use crate::registry::{BehaviorRegistry, TypeRegistry};
use crate::rng::SceneRng;
use crate::rules::{
    compare, CreateTrigger, RuleContext, RuleExtras, RulesBehavior, Trigger, VariableChangesTrigger,
    VariableReachesValueTrigger,
};
use crate::value::ExpressionValue;
use crate::variables::{VariableRef, Variables};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A running scene
pub struct Scene {
    types: Arc<TypeRegistry>,
    config: SceneConfig,
    directory: ActorDirectory,
    behaviors: BehaviorRegistry,
    library: Library,
    variables: Variables,
    commands: CommandQueue,
    inbox: Inbox,
    outbox: Outbox,
    /// Actors whose components fall back to their library blueprint
    inheriting: IndexSet<ActorId>,
    /// Document given to the last `load`, rebuilt from on restart
    loaded: Option<Value>,
    restart_requested: bool,
    /// Set while a pass is iterating; structural requests wait for its end
    in_pass: bool,
    fire_depth: u32,
    rng: SceneRng,
}

impl Scene {
    pub fn new(types: Arc<TypeRegistry>, config: SceneConfig) -> Self {
        let config = config.normalized();
        let behaviors = types.instantiate();
        Self {
            rng: SceneRng::new(config.rng_seed),
            directory: ActorDirectory::with_headroom(config.tie_break_headroom),
            types,
            config,
            behaviors,
            library: Library::new(),
            variables: Variables::new(),
            commands: CommandQueue::new(),
            inbox: Inbox::new(),
            outbox: Outbox::default(),
            inheriting: IndexSet::new(),
            loaded: None,
            restart_requested: false,
            in_pass: false,
            fire_depth: 0,
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Random source for rule expressions
    pub fn rng_mut(&mut self) -> &mut SceneRng {
        &mut self.rng
    }

    pub fn directory(&self) -> &ActorDirectory {
        &self.directory
    }

    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    pub fn behavior<B: BehaviorType>(&self) -> Option<&B> {
        self.behaviors.get::<B>()
    }

    /// Direct mutable access, for work that needs no hook context
    pub fn behavior_mut<B: BehaviorType>(&mut self) -> Option<&mut B> {
        self.behaviors.get_mut::<B>()
    }

    /// Run `f` with a behavior and the hook context it would get in a pass
    ///
    /// Commands `f` queues are applied before this returns unless an update
    /// pass is running.
    pub fn with_behavior_cx<B: BehaviorType, R>(
        &mut self,
        f: impl FnOnce(&mut B, &mut BehaviorCx<'_>) -> R,
    ) -> Option<R> {
        let index = self.behaviors.index_of::<B>()?;
        let result = self
            .with_behavior_at(index, |behavior, cx| {
                behavior.as_any_mut().downcast_mut::<B>().map(|b| f(b, cx))
            })
            .flatten();
        self.settle();
        result
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    // Actors

    pub fn add_actor(&mut self, desc: ActorDesc) -> ActorId {
        self.directory.add_actor(desc)
    }

    /// Remove an actor and all its components
    ///
    /// Every behavior's disable hook runs with `removing_actor` set before any
    /// component is erased. Returns `false` if the actor was not live.
    pub fn remove_actor(&mut self, actor: ActorId) -> bool {
        if !self.check_actor(actor) {
            return false;
        }
        for index in 0..self.behaviors.len() {
            self.with_behavior_at(index, |behavior, cx| {
                behavior.disable_component(actor, true, cx);
            });
        }
        for index in 0..self.behaviors.len() {
            self.with_behavior_at(index, |behavior, cx| {
                behavior.remove_component(actor, cx);
            });
        }
        self.inheriting.shift_remove(&actor);
        self.directory.remove_actor(actor);
        self.settle();
        true
    }

    pub fn has_actor(&self, actor: ActorId) -> bool {
        self.directory.has_actor(actor)
    }

    pub fn move_actor(&mut self, actor: ActorId, params: DrawOrderParams) -> bool {
        self.directory.move_actor(actor, params)
    }

    pub fn ensure_draw_order_sort(&mut self) {
        self.directory.ensure_draw_order_sort();
    }

    /// Non-ghost actors back to front
    pub fn actors_by_draw_order(&mut self) -> Vec<ActorId> {
        self.directory.actors_by_draw_order()
    }

    // Components

    pub fn add_component(&mut self, behavior: BehaviorId, actor: ActorId) -> bool {
        if !self.check_actor(actor) {
            return false;
        }
        let added = self
            .with_behavior_id(behavior, |b, cx| b.add_component(actor, cx))
            .unwrap_or(false);
        self.settle();
        added
    }

    pub fn enable_component(&mut self, behavior: BehaviorId, actor: ActorId) -> bool {
        let enabled = self
            .with_behavior_id(behavior, |b, cx| b.enable_component(actor, cx))
            .unwrap_or(false);
        self.settle();
        enabled
    }

    pub fn disable_component(&mut self, behavior: BehaviorId, actor: ActorId) -> bool {
        let disabled = self
            .with_behavior_id(behavior, |b, cx| b.disable_component(actor, false, cx))
            .unwrap_or(false);
        self.settle();
        disabled
    }

    pub fn remove_component(&mut self, behavior: BehaviorId, actor: ActorId) -> bool {
        let removed = self
            .with_behavior_id(behavior, |b, cx| b.remove_component(actor, cx))
            .unwrap_or(false);
        self.settle();
        removed
    }

    pub fn has_component(&self, behavior: BehaviorId, actor: ActorId) -> bool {
        self.behaviors
            .by_id(behavior)
            .map_or(false, |b| b.has_component(actor))
    }

    // Properties

    /// Read a property directly (editor path)
    pub fn get_property(&self, behavior: BehaviorId, actor: ActorId, prop: PropId) -> ExpressionValue {
        self.behaviors
            .by_id(behavior)
            .map(|b| b.get_property(actor, prop))
            .unwrap_or_default()
    }

    /// Write a property directly (editor path). `interactive` marks
    /// continuous edits such as dragging a slider.
    pub fn set_property(
        &mut self,
        behavior: BehaviorId,
        actor: ActorId,
        prop: PropId,
        value: &ExpressionValue,
        interactive: bool,
    ) -> bool {
        let set = self
            .with_behavior_id(behavior, |b, cx| b.set_property(actor, prop, value, interactive, cx))
            .unwrap_or(false);
        self.settle();
        set
    }

    /// Read a property on behalf of a rule
    pub fn get_property_for_rule(&self, behavior: BehaviorId, actor: ActorId, prop: PropId) -> ExpressionValue {
        self.behaviors
            .by_id(behavior)
            .map(|b| b.get_property_for_rule(actor, prop))
            .unwrap_or_default()
    }

    /// Write a property on behalf of a rule. Props not marked `rules_set`
    /// are left untouched.
    pub fn set_property_for_rule(
        &mut self,
        behavior: BehaviorId,
        actor: ActorId,
        prop: PropId,
        value: &ExpressionValue,
    ) -> bool {
        let set = self
            .with_behavior_id(behavior, |b, cx| b.set_property_for_rule(actor, prop, value, cx))
            .unwrap_or(false);
        self.settle();
        set
    }

    // Rules

    /// Run the rules of `actor` triggered by `T` whose trigger params satisfy
    /// `predicate`
    ///
    /// Each matching rule whose conditions all hold runs its response once.
    /// Returns the number of responses run. Ghosts, disabled Rules components
    /// and removed actors never fire. If a response removes the actor, its
    /// remaining rules are skipped.
    pub fn fire_if<T: Trigger>(
        &mut self,
        actor: ActorId,
        extras: RuleExtras,
        predicate: impl Fn(&T::Params) -> bool,
    ) -> usize {
        if self.directory.is_ghost(actor) || !self.directory.has_actor(actor) {
            return 0;
        }
        let rules = match self.behaviors.get::<RulesBehavior>() {
            Some(rules) => rules.matching_rules::<T, _>(actor, predicate),
            None => return 0,
        };
        if rules.is_empty() {
            return 0;
        }
        if self.fire_depth >= self.config.max_fire_depth {
            tracing::warn!(actor = %actor, trigger = T::NAME, depth = self.fire_depth, "rule fire depth exceeded");
            return 0;
        }

        self.fire_depth += 1;
        let mut fired = 0;
        for rule in rules {
            if !self.rules_enabled(actor) {
                break;
            }
            let mut ctx = RuleContext::new(self, actor, extras.clone());
            if rule.conditions_hold(&mut ctx) {
                rule.run_response(&mut ctx);
                fired += 1;
            }
        }
        self.fire_depth -= 1;
        fired
    }

    /// [`fire_if`](Self::fire_if) for every actor with a `T` rule
    pub fn fire_all_if<T: Trigger>(
        &mut self,
        extras: RuleExtras,
        predicate: impl Fn(&T::Params) -> bool,
    ) -> usize {
        let actors = self
            .behaviors
            .get::<RulesBehavior>()
            .map(|rules| rules.actors_with_trigger::<T>())
            .unwrap_or_default();
        actors
            .into_iter()
            .map(|actor| self.fire_if::<T>(actor, extras.clone(), &predicate))
            .sum()
    }

    /// Assign a variable, firing variable triggers if the value changed
    pub fn set_variable(&mut self, var: &VariableRef, value: ExpressionValue) -> bool {
        if !self.variables.set(var, value.clone()) {
            return false;
        }
        self.fire_all_if::<VariableChangesTrigger>(RuleExtras::default(), |params| params.variable == *var);
        if let Some(current) = value.as_number() {
            self.fire_all_if::<VariableReachesValueTrigger>(RuleExtras::default(), |params| {
                params.variable == *var && compare(&params.comparison, current, params.value)
            });
        }
        true
    }

    // Documents

    /// Create an actor from its document
    ///
    /// `doc` is `{"components": {BehaviorName: {...}}}`. With `inherit`, each
    /// component falls back to the parent entry's blueprint for fields `doc`
    /// does not set, and blueprint components missing from `doc` are added.
    /// Components are added and read in behavior order, then enabled, except
    /// on ghosts.
    pub fn read_actor(&mut self, desc: ActorDesc, doc: &Value, inherit: bool) -> ActorId {
        let is_ghost = desc.is_ghost;
        let blueprint = if inherit {
            desc.parent_entry_id
                .as_deref()
                .and_then(|entry_id| self.library.get(entry_id))
                .map(|entry| entry.actor_blueprint.clone())
        } else {
            None
        };
        let inheriting = inherit && desc.parent_entry_id.is_some();

        let actor = self.add_actor(desc);
        if inheriting {
            self.inheriting.insert(actor);
        }

        let own_components = doc.get("components");
        let blueprint_components = blueprint.as_ref().and_then(|b| b.get("components"));
        let empty = Value::Object(Map::new());
        let mut read = Vec::new();

        self.in_pass_scope(|scene| {
            for index in 0..scene.behaviors.len() {
                let Some(name) = scene.behaviors.get_index(index).map(|b| b.name()) else {
                    continue;
                };
                let own = own_components.and_then(|c| c.get(name));
                let fallback = blueprint_components.and_then(|c| c.get(name));
                if own.is_none() && fallback.is_none() {
                    continue;
                }
                let reader = Reader::new(own.unwrap_or(&empty)).with_fallback(fallback);
                scene.with_behavior_at(index, |behavior, cx| {
                    behavior.add_component(actor, cx);
                    behavior.read_component(actor, &reader, cx);
                });
                read.push(index);
            }

            if !is_ghost {
                for index in read {
                    scene.with_behavior_at(index, |behavior, cx| {
                        behavior.enable_component(actor, cx);
                    });
                }
            }
        });
        self.settle();
        actor
    }

    /// Write an actor's document. Only enabled components are written.
    ///
    /// Inheriting actors store only the fields that differ from their
    /// blueprint.
    pub fn write_actor(&self, actor: ActorId) -> Option<Value> {
        if !self.directory.has_actor(actor) {
            return None;
        }
        let mut writer = Writer::new();
        writer.int("actorId", actor.raw() as i64);
        let parent = self.directory.parent_entry_id(actor);
        if let Some(entry_id) = parent {
            writer.str("parentEntryId", entry_id);
        }
        let inheriting = self.inheriting.contains(&actor);
        if inheriting {
            writer.boolean("inherit", true);
        }
        let blueprint = parent
            .filter(|_| inheriting)
            .and_then(|entry_id| self.library.get(entry_id));

        writer.obj("components", |components| {
            for behavior in self.behaviors.iter() {
                if !behavior.is_component_enabled(actor) {
                    continue;
                }
                let mut component = Writer::new();
                behavior.write_component(actor, &mut component);
                let mut value = component.into_value();
                if let Some(base) = blueprint.and_then(|entry| entry.component(behavior.name())) {
                    strip_inherited(&mut value, base);
                }
                components.value(behavior.name(), value);
            }
        });
        Some(writer.into_value())
    }

    /// Replace the scene's contents with a document
    ///
    /// `{"library": [..], "variables": [..], "actors": [..]}`, actors listed
    /// back to front. The document is kept for restarts.
    pub fn load(&mut self, doc: &Value) -> Result<()> {
        if !doc.is_object() {
            return Err(Error::InvalidDocument("scene document must be an object".to_string()));
        }
        self.teardown();
        self.read_document(doc);
        self.loaded = Some(doc.clone());
        Ok(())
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let doc: Value = serde_json::from_str(json)?;
        self.load(&doc)
    }

    /// Write the whole scene. Ghosts are not written.
    pub fn write(&self) -> Value {
        let mut writer = Writer::new();
        self.library.write(&mut writer, "library");
        self.variables.write(&mut writer, "variables");
        writer.arr("actors", |actors| {
            for &actor in self.directory.ordered_ids().iter() {
                if self.directory.is_ghost(actor) {
                    continue;
                }
                if let Some(doc) = self.write_actor(actor) {
                    actors.push(doc);
                }
            }
        });
        writer.into_value()
    }

    /// Create a non-simulated preview actor from a library entry
    pub fn add_ghost_actor(&mut self, entry_id: &str) -> Option<ActorId> {
        let blueprint = self.library.get(entry_id)?.actor_blueprint.clone();
        let desc = ActorDesc::new().with_parent_entry(entry_id).ghost();
        Some(self.read_actor(desc, &blueprint, false))
    }

    // Frame

    /// Run one frame
    pub fn update(&mut self, dt: f64) {
        self.in_pass_scope(|scene| {
            scene.dispatch_bridge_events();
            scene.fire_pending_creates();
            for index in 0..scene.behaviors.len() {
                scene.with_behavior_at(index, |behavior, cx| behavior.perform(dt, cx));
            }
        });
        self.flush_commands();
        self.directory.ensure_draw_order_sort();
        if self.restart_requested {
            self.restart();
        }
    }

    /// Draw every enabled drawable component, back to front
    pub fn draw(&self, sink: &mut dyn DrawSink) {
        let order = self.directory.ordered_ids();
        for &actor in order.iter() {
            if self.directory.is_ghost(actor) {
                continue;
            }
            self.behaviors.for_each_drawable(|behavior, drawable| {
                if behavior.is_component_enabled(actor) {
                    drawable.draw_component(actor, sink);
                }
            });
        }
    }

    /// Rebuild from the loaded document at the end of the current frame
    pub fn request_restart(&mut self) {
        self.restart_requested = true;
    }

    pub fn is_restart_requested(&self) -> bool {
        self.restart_requested
    }

    /// Apply queued commands. Returns how many ran.
    pub fn flush_commands(&mut self) -> usize {
        let was_in_pass = std::mem::replace(&mut self.in_pass, true);
        let mut applied = 0;
        while applied < self.config.max_commands_per_flush {
            let Some(command) = self.commands.pop() else {
                break;
            };
            tracing::debug!(?command, "applying scene command");
            self.apply_command(command);
            applied += 1;
        }
        if !self.commands.is_empty() {
            tracing::warn!(remaining = self.commands.len(), "command flush limit reached");
        }
        self.in_pass = was_in_pass;
        applied
    }

    /// Queue a command for the end of the current pass
    pub fn push_command(&mut self, command: SceneCommand) {
        self.commands.push(command);
        self.settle();
    }

    // Bridge

    /// Handle for delivering events from other threads
    pub fn bridge_sender(&self) -> BridgeSender {
        self.inbox.sender()
    }

    pub fn send_outbound(&mut self, name: impl Into<String>, params: Value) {
        self.outbox.send(name, params);
    }

    pub fn take_outbound_events(&mut self) -> Vec<BridgeEvent> {
        self.outbox.take()
    }

    // Internals

    fn with_behavior_at<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut dyn Behavior, &mut BehaviorCx<'_>) -> R,
    ) -> Option<R> {
        let Scene {
            types,
            config,
            directory,
            behaviors,
            commands,
            outbox,
            ..
        } = self;
        let behavior = behaviors.get_index_mut(index)?;
        let mut cx = BehaviorCx {
            directory,
            rules: types.rules(),
            commands,
            outbox,
            config,
        };
        Some(f(behavior, &mut cx))
    }

    fn with_behavior_id<R>(
        &mut self,
        id: BehaviorId,
        f: impl FnOnce(&mut dyn Behavior, &mut BehaviorCx<'_>) -> R,
    ) -> Option<R> {
        let Some(index) = self.behaviors.index_of_id(id) else {
            if self.config.debug_checks {
                tracing::warn!(behavior = %id, "unknown behavior");
            }
            return None;
        };
        self.with_behavior_at(index, f)
    }

    fn in_pass_scope(&mut self, f: impl FnOnce(&mut Scene)) {
        let was_in_pass = std::mem::replace(&mut self.in_pass, true);
        f(self);
        self.in_pass = was_in_pass;
    }

    fn settle(&mut self) {
        if !self.in_pass {
            self.flush_commands();
        }
    }

    fn check_actor(&self, actor: ActorId) -> bool {
        let live = self.directory.has_actor(actor);
        if !live && self.config.debug_checks {
            tracing::warn!(actor = %actor, "unknown actor");
        }
        live
    }

    fn rules_enabled(&self, actor: ActorId) -> bool {
        self.behaviors
            .get::<RulesBehavior>()
            .map_or(false, |rules| rules.is_component_enabled(actor))
    }

    fn apply_command(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::AddActor(desc) => {
                self.add_actor(desc);
            }
            SceneCommand::RemoveActor(actor) => {
                self.remove_actor(actor);
            }
            SceneCommand::AddComponent { behavior, actor } => {
                self.add_component(behavior, actor);
            }
            SceneCommand::EnableComponent { behavior, actor } => {
                self.enable_component(behavior, actor);
            }
            SceneCommand::DisableComponent { behavior, actor } => {
                self.disable_component(behavior, actor);
            }
            SceneCommand::RemoveComponent { behavior, actor } => {
                self.remove_component(behavior, actor);
            }
            SceneCommand::Run(f) => f(self),
        }
    }

    fn dispatch_bridge_events(&mut self) {
        for event in self.inbox.drain() {
            match self.types.bridge_receiver(&event.name) {
                Some(receive) => receive(self, &Reader::new(&event.params)),
                None => tracing::warn!(event = %event.name, "no receiver for bridge event"),
            }
        }
    }

    fn fire_pending_creates(&mut self) {
        let pending = self
            .behaviors
            .get_mut::<RulesBehavior>()
            .map(RulesBehavior::take_pending_create)
            .unwrap_or_default();
        for actor in pending {
            self.fire_if::<CreateTrigger>(actor, RuleExtras::default(), |_| true);
        }
    }

    /// Remove every actor (running their hooks) and reset scene data
    fn teardown(&mut self) {
        let actors = self.directory.ordered_ids().into_owned();
        self.in_pass_scope(|scene| {
            for actor in actors {
                scene.remove_actor(actor);
            }
        });
        self.commands.clear();
        self.directory.clear();
        self.inheriting.clear();
        self.library.clear();
        self.variables = Variables::new();
        self.rng = SceneRng::new(self.config.rng_seed);
        self.restart_requested = false;
    }

    fn restart(&mut self) {
        self.restart_requested = false;
        let Some(doc) = self.loaded.take() else {
            tracing::warn!("restart requested without a loaded document");
            return;
        };
        tracing::info!(actors = self.directory.len(), "scene restarting");
        self.teardown();
        self.read_document(&doc);
        self.loaded = Some(doc);
    }

    fn read_document(&mut self, doc: &Value) {
        let reader = Reader::new(doc);
        self.library.read(&reader, "library");
        self.variables.read(&reader, "variables");

        let Some(actors) = doc.get("actors").and_then(Value::as_array) else {
            return;
        };
        for actor_doc in actors {
            let actor = Reader::new(actor_doc);
            let desc = ActorDesc {
                requested_id: actor
                    .int("actorId")
                    .and_then(|id| u32::try_from(id).ok())
                    .map(ActorId::new),
                parent_entry_id: actor.str("parentEntryId").map(str::to_string),
                is_ghost: false,
                draw_order: DrawOrderParams::FrontOfAll,
            };
            self.read_actor(desc, actor_doc, actor.boolean_or("inherit", false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{ComponentStore, DrawComponent};
    use crate::props::{NoParams, PropAttribs};
    use crate::rules::{register_builtins, Response, RuleElement};
    use serde_json::json;
    use std::thread;

    crate::props! {
        struct TargetProps {
            hits: f64 = 0.0 => PropAttribs::new().rules_get().rules_set(),
            spawn: bool = false,
        }
    }

    /// Counts rule hits; spawns an actor on enable when `spawn` is set
    #[derive(Default)]
    struct TargetBehavior {
        components: ComponentStore<TargetProps>,
        disabled_for_removal: u32,
    }

    impl TargetBehavior {
        fn hits(&self, actor: ActorId) -> Option<f64> {
            self.components.get(actor).map(|c| c.props.hits)
        }
    }

    impl BehaviorType for TargetBehavior {
        type Props = TargetProps;
        type State = ();

        const ID: BehaviorId = BehaviorId::new(950);
        const NAME: &'static str = "Target";

        fn components(&self) -> &ComponentStore<TargetProps> {
            &self.components
        }

        fn components_mut(&mut self) -> &mut ComponentStore<TargetProps> {
            &mut self.components
        }

        fn handle_enable_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) {
            if self.components.get(actor).map_or(false, |c| c.props.spawn) {
                cx.commands.defer(|scene| {
                    scene.add_actor(ActorDesc::new());
                });
            }
        }

        fn handle_disable_component(&mut self, _actor: ActorId, removing_actor: bool, _cx: &mut BehaviorCx<'_>) {
            if removing_actor {
                self.disabled_for_removal += 1;
            }
        }

        fn as_drawable(&self) -> Option<&dyn DrawComponent> {
            Some(self)
        }
    }

    impl DrawComponent for TargetBehavior {
        fn draw_component(&self, actor: ActorId, sink: &mut dyn DrawSink) {
            sink.draw_asset(actor, "target", self.hits(actor).unwrap_or_default());
        }
    }

    struct PokeTrigger;

    impl Trigger for PokeTrigger {
        const NAME: &'static str = "poke";
        type Owner = TargetBehavior;
        type Params = NoParams;
    }

    struct HitResponse;

    impl RuleElement for HitResponse {
        const NAME: &'static str = "hit";
        type Owner = TargetBehavior;
        type Params = NoParams;

        fn from_params(_params: NoParams) -> Self {
            Self
        }
    }

    impl Response for HitResponse {
        fn run(&self, ctx: &mut RuleContext<'_>) {
            let actor = ctx.actor;
            if let Some(c) = ctx
                .behavior_mut::<TargetBehavior>()
                .and_then(|target| target.components.get_mut(actor))
            {
                c.props.hits += 1.0;
            }
        }
    }

    fn receive_poke(scene: &mut Scene, params: &Reader<'_>) {
        if let Some(actor) = params.int("actorId").and_then(|id| u32::try_from(id).ok()) {
            scene.fire_if::<PokeTrigger>(ActorId::new(actor), RuleExtras::default(), |_| true);
        }
    }

    fn types() -> Arc<TypeRegistry> {
        let mut types = TypeRegistry::new();
        register_builtins(&mut types).unwrap();
        types.register_behavior::<TargetBehavior>().unwrap();
        types.rules_mut().register_trigger::<PokeTrigger>().unwrap();
        types.rules_mut().register_response::<HitResponse>().unwrap();
        types.register_bridge_receiver("poke", receive_poke).unwrap();
        Arc::new(types)
    }

    fn scene() -> Scene {
        Scene::new(types(), SceneConfig::default())
    }

    fn poke() -> Value {
        json!({ "name": "poke", "behaviorId": 950 })
    }

    fn hit() -> Value {
        json!({ "name": "hit", "behaviorId": 950 })
    }

    fn rule(trigger: Value, response: Value) -> Value {
        json!({ "trigger": trigger, "response": response })
    }

    fn number(scene: &Scene, var: &str) -> ExpressionValue {
        scene.variables().get(&VariableRef::new(var))
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(ActorId, String, f64)>,
    }

    impl DrawSink for Recorder {
        fn draw_asset(&mut self, actor: ActorId, asset: &str, frame: f64) {
            self.calls.push((actor, asset.to_string(), frame));
        }
    }

    #[test]
    fn test_remove_actor_cascades_to_components() {
        let mut scene = scene();
        let a = scene.add_actor(ActorDesc::new());
        let b = scene.add_actor(ActorDesc::new());
        let c = scene.add_actor(ActorDesc::new());

        assert!(scene.add_component(TargetBehavior::ID, b));
        assert!(!scene.add_component(TargetBehavior::ID, b));
        assert!(scene.enable_component(TargetBehavior::ID, b));

        assert!(scene.remove_actor(b));
        assert!(!scene.remove_actor(b));
        assert!(!scene.has_component(TargetBehavior::ID, b));
        assert_eq!(scene.behavior::<TargetBehavior>().unwrap().disabled_for_removal, 1);
        assert_eq!(scene.actors_by_draw_order(), vec![a, c]);

        let d = scene.add_actor(ActorDesc::new());
        assert!(d.raw() > c.raw());
        assert!(!scene.add_component(TargetBehavior::ID, b));
        assert!(!scene.add_component(BehaviorId::new(4242), d));
    }

    #[test]
    fn test_property_access() {
        let mut scene = scene();
        let a = scene.add_actor(ActorDesc::new());
        scene.add_component(TargetBehavior::ID, a);
        let hits = PropId::of("hits");
        let spawn = PropId::of("spawn");

        assert!(scene.set_property(TargetBehavior::ID, a, hits, &3.0.into(), false));
        assert_eq!(scene.get_property(TargetBehavior::ID, a, hits), ExpressionValue::from(3.0));

        assert!(!scene.set_property_for_rule(TargetBehavior::ID, a, spawn, &1.0.into()));
        assert!(scene.set_property_for_rule(TargetBehavior::ID, a, hits, &4.0.into()));
        assert_eq!(scene.get_property_for_rule(TargetBehavior::ID, a, hits), ExpressionValue::from(4.0));
        assert_eq!(scene.get_property_for_rule(TargetBehavior::ID, a, spawn), ExpressionValue::default());
    }

    #[test]
    fn test_create_rules_fire_once() {
        let mut scene = scene();
        let doc = json!({
            "variables": [{ "id": "v1", "name": "count", "initialValue": 0 }],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Rules": { "rules": [rule(
                        json!({ "name": "create", "behaviorId": 16 }),
                        json!({ "name": "change variable", "behaviorId": 16, "params": { "variable": "v1", "change_by": 1 } })
                    )] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        assert_eq!(number(&scene, "v1"), ExpressionValue::from(0.0));

        scene.update(0.016);
        assert_eq!(number(&scene, "v1"), ExpressionValue::from(1.0));
        scene.update(0.016);
        assert_eq!(number(&scene, "v1"), ExpressionValue::from(1.0));
    }

    #[test]
    fn test_create_rules_skip_reenabled_rules() {
        let mut scene = scene();
        let doc = json!({
            "variables": [{ "id": "v1", "initialValue": 0 }],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Rules": { "rules": [rule(
                        json!({ "name": "create", "behaviorId": 16 }),
                        json!({ "name": "change variable", "behaviorId": 16, "params": { "variable": "v1", "change_by": 1 } })
                    )] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        let actor = ActorId::new(1);

        scene.update(0.016);
        assert_eq!(number(&scene, "v1"), ExpressionValue::from(1.0));

        assert!(scene.disable_component(RulesBehavior::ID, actor));
        assert!(scene.enable_component(RulesBehavior::ID, actor));
        scene.update(0.016);
        assert_eq!(number(&scene, "v1"), ExpressionValue::from(1.0));
        assert!(scene.behavior::<RulesBehavior>().unwrap().create_fired(actor));
    }

    #[test]
    fn test_variable_reaches_value() {
        let mut scene = scene();
        let doc = json!({
            "variables": [
                { "id": "score", "initialValue": 0 },
                { "id": "done", "initialValue": 0 }
            ],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Rules": { "rules": [rule(
                        json!({
                            "name": "variable reaches value",
                            "behaviorId": 16,
                            "params": { "variable": "score", "comparison": "greater than or equal", "value": 3 }
                        }),
                        json!({ "name": "set variable", "behaviorId": 16, "params": { "variable": "done", "set_to": 1 } })
                    )] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        let score = VariableRef::new("score");

        assert!(scene.set_variable(&score, 2.0.into()));
        assert_eq!(number(&scene, "done"), ExpressionValue::from(0.0));
        assert!(!scene.set_variable(&score, 2.0.into()));
        assert!(scene.set_variable(&score, 3.0.into()));
        assert_eq!(number(&scene, "done"), ExpressionValue::from(1.0));
    }

    #[test]
    fn test_variable_responses_evaluate_expressions() {
        let mut scene = scene();
        let doc = json!({
            "variables": [
                { "id": "base", "initialValue": 4 },
                { "id": "out", "initialValue": 0 }
            ],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Target": {},
                    "Rules": { "rules": [
                        rule(poke(), json!({
                            "name": "set variable",
                            "behaviorId": 16,
                            "params": { "variable": "out", "set_to": {
                                "expressionType": "^",
                                "params": { "lhs": 2, "rhs": { "expressionType": "number", "params": { "value": 3 } } }
                            } }
                        })),
                        rule(poke(), json!({
                            "name": "change variable",
                            "behaviorId": 16,
                            "params": { "variable": "base", "change_by": {
                                "expressionType": "clamp",
                                "params": { "number": 50, "min": 0, "max": 10 }
                            } }
                        }))
                    ] }
                }
            }]
        });
        scene.load(&doc).unwrap();

        scene.fire_if::<PokeTrigger>(ActorId::new(1), RuleExtras::default(), |_| true);
        assert_eq!(number(&scene, "out"), ExpressionValue::from(8.0));
        assert_eq!(number(&scene, "base"), ExpressionValue::from(14.0));
    }

    #[test]
    fn test_fire_depth_is_bounded() {
        let mut scene = Scene::new(types(), SceneConfig::default().with_max_fire_depth(4));
        let doc = json!({
            "variables": [{ "id": "v", "initialValue": 0 }],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Rules": { "rules": [rule(
                        json!({ "name": "variable changes", "behaviorId": 16, "params": { "variable": "v" } }),
                        json!({ "name": "change variable", "behaviorId": 16, "params": { "variable": "v" } })
                    )] }
                }
            }]
        });
        scene.load(&doc).unwrap();

        scene.set_variable(&VariableRef::new("v"), 1.0.into());
        assert_eq!(number(&scene, "v"), ExpressionValue::from(5.0));
    }

    #[test]
    fn test_destroy_skips_remaining_rules() {
        let mut scene = scene();
        let doc = json!({
            "actors": [
                {
                    "actorId": 1,
                    "components": {
                        "Target": {},
                        "Rules": { "rules": [
                            rule(poke(), json!({ "name": "destroy", "behaviorId": 16 })),
                            rule(poke(), hit())
                        ] }
                    }
                },
                {
                    "actorId": 2,
                    "components": { "Target": {}, "Rules": { "rules": [rule(poke(), hit())] } }
                }
            ]
        });
        scene.load(&doc).unwrap();
        let first = ActorId::new(1);
        let second = ActorId::new(2);

        assert_eq!(scene.fire_if::<PokeTrigger>(first, RuleExtras::default(), |_| true), 1);
        assert!(!scene.has_actor(first));
        assert_eq!(scene.fire_if::<PokeTrigger>(first, RuleExtras::default(), |_| true), 0);

        assert_eq!(scene.fire_if::<PokeTrigger>(second, RuleExtras::default(), |_| true), 1);
        assert_eq!(scene.behavior::<TargetBehavior>().unwrap().hits(second), Some(1.0));
    }

    #[test]
    fn test_conditions_gate_response() {
        let mut scene = scene();
        let doc = json!({
            "variables": [{ "id": "armed", "initialValue": 0 }],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Target": {},
                    "Rules": { "rules": [{
                        "trigger": poke(),
                        "conditions": [{
                            "name": "variable meets condition",
                            "behaviorId": 16,
                            "params": { "variable": "armed", "comparison": "equal", "value": 1 }
                        }],
                        "response": hit()
                    }] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        let actor = ActorId::new(1);

        assert_eq!(scene.fire_if::<PokeTrigger>(actor, RuleExtras::default(), |_| true), 0);
        scene.set_variable(&VariableRef::new("armed"), 1.0.into());
        assert_eq!(scene.fire_if::<PokeTrigger>(actor, RuleExtras::default(), |_| true), 1);

        assert!(scene.disable_component(RulesBehavior::ID, actor));
        assert_eq!(scene.fire_if::<PokeTrigger>(actor, RuleExtras::default(), |_| true), 0);
        assert_eq!(scene.behavior::<TargetBehavior>().unwrap().hits(actor), Some(1.0));
    }

    #[test]
    fn test_sequence_runs_steps_in_order() {
        let mut scene = scene();
        let doc = json!({
            "variables": [{ "id": "x", "initialValue": 0 }],
            "actors": [{
                "actorId": 3,
                "components": {
                    "Target": {},
                    "Rules": { "rules": [rule(poke(), json!({
                        "name": "sequence",
                        "behaviorId": 16,
                        "params": { "responses": [
                            hit(),
                            hit(),
                            { "name": "set variable", "behaviorId": 16, "params": { "variable": "x", "set_to": 1 } }
                        ] }
                    }))] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        let actor = ActorId::new(3);

        scene.fire_if::<PokeTrigger>(actor, RuleExtras::default(), |_| true);
        assert_eq!(scene.behavior::<TargetBehavior>().unwrap().hits(actor), Some(2.0));
        assert_eq!(number(&scene, "x"), ExpressionValue::from(1.0));
    }

    #[test]
    fn test_hook_commands_apply_after_hook() {
        let mut scene = scene();
        let actor = scene.read_actor(
            ActorDesc::new(),
            &json!({ "components": { "Target": { "spawn": true } } }),
            false,
        );
        assert!(scene.behaviors().by_id(TargetBehavior::ID).unwrap().is_component_enabled(actor));
        assert_eq!(scene.directory().len(), 2);

        scene.push_command(SceneCommand::RemoveActor(actor));
        assert!(!scene.has_actor(actor));
        assert_eq!(scene.directory().len(), 1);
    }

    #[test]
    fn test_zero_limits_from_ron_still_apply_work() {
        let config = SceneConfig::from_ron("(max_commands_per_flush: 0, max_fire_depth: 0)").unwrap();
        let mut scene = Scene::new(types(), config);
        let actor = scene.add_actor(ActorDesc::new());

        scene.push_command(SceneCommand::RemoveActor(actor));
        scene.update(0.016);
        scene.update(0.016);
        assert!(!scene.has_actor(actor));

        let doc = json!({
            "variables": [{ "id": "v", "initialValue": 0 }],
            "actors": [{
                "actorId": 1,
                "components": { "Rules": { "rules": [rule(
                    json!({ "name": "create", "behaviorId": 16 }),
                    json!({ "name": "change variable", "behaviorId": 16, "params": { "variable": "v" } })
                )] } }
            }]
        });
        scene.load(&doc).unwrap();
        scene.update(0.016);
        assert_eq!(number(&scene, "v"), ExpressionValue::from(1.0));
    }

    #[test]
    fn test_inheriting_actors_write_only_overrides() {
        let mut scene = scene();
        let doc = json!({
            "library": [{
                "entryId": "ball",
                "title": "Ball",
                "actorBlueprint": { "components": { "Target": { "hits": 7, "spawn": false } } }
            }],
            "variables": [],
            "actors": [
                { "actorId": 4, "parentEntryId": "ball", "inherit": true, "components": { "Target": { "hits": 9 } } },
                { "actorId": 5, "parentEntryId": "ball", "inherit": true, "components": {} },
                { "actorId": 6, "components": { "Target": { "hits": 1 } } }
            ]
        });
        scene.load(&doc).unwrap();

        let target = scene.behavior::<TargetBehavior>().unwrap();
        assert_eq!(target.hits(ActorId::new(4)), Some(9.0));
        assert_eq!(target.hits(ActorId::new(5)), Some(7.0));

        let written = scene.write();
        assert_eq!(written["library"][0]["entryId"], "ball");
        assert_eq!(
            written["actors"][0],
            json!({ "actorId": 4, "parentEntryId": "ball", "inherit": true, "components": { "Target": { "hits": 9.0 } } })
        );
        assert_eq!(written["actors"][1]["components"], json!({ "Target": {} }));
        assert_eq!(
            written["actors"][2]["components"],
            json!({ "Target": { "hits": 1.0, "spawn": false } })
        );

        let mut copy = self::scene();
        copy.load(&written).unwrap();
        assert_eq!(copy.write(), written);
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        let mut scene = scene();
        assert!(matches!(scene.load(&json!([1, 2])), Err(Error::InvalidDocument(_))));
        assert!(matches!(scene.load_json("{"), Err(Error::Json(_))));
        assert!(scene.load_json(r#"{ "actors": [] }"#).is_ok());
    }

    #[test]
    fn test_load_does_not_reuse_actor_ids() {
        let mut scene = scene();
        let first = scene.add_actor(ActorDesc::new());
        let second = scene.add_actor(ActorDesc::new());

        scene.load_json(r#"{ "actors": [] }"#).unwrap();
        assert!(!scene.has_actor(first));
        let fresh = scene.add_actor(ActorDesc::new());
        assert!(fresh.raw() > first.raw().max(second.raw()));

        scene.load(&json!({ "actors": [{ "actorId": 1, "components": {} }] })).unwrap();
        assert!(scene.has_actor(ActorId::new(1)));
        assert!(scene.add_actor(ActorDesc::new()).raw() > fresh.raw());
    }

    #[test]
    fn test_ghost_actors_are_inert() {
        let mut scene = scene();
        let doc = json!({
            "library": [{
                "entryId": "coin",
                "actorBlueprint": { "components": {
                    "Target": { "hits": 2 },
                    "Rules": { "rules": [rule(
                        json!({ "name": "create", "behaviorId": 16 }),
                        json!({ "name": "set variable", "behaviorId": 16, "params": { "variable": "seen", "set_to": 1 } })
                    )] }
                } }
            }],
            "variables": [{ "id": "seen", "initialValue": 0 }],
            "actors": []
        });
        scene.load(&doc).unwrap();

        let ghost = scene.add_ghost_actor("coin").unwrap();
        assert!(scene.directory().is_ghost(ghost));
        assert!(scene.has_component(TargetBehavior::ID, ghost));
        assert!(!scene.behaviors().by_id(TargetBehavior::ID).unwrap().is_component_enabled(ghost));

        scene.update(0.1);
        assert_eq!(number(&scene, "seen"), ExpressionValue::from(0.0));
        assert_eq!(scene.fire_if::<CreateTrigger>(ghost, RuleExtras::default(), |_| true), 0);
        assert_eq!(scene.write()["actors"], json!([]));

        let mut sink = Recorder::default();
        scene.draw(&mut sink);
        assert!(sink.calls.is_empty());
        assert!(scene.add_ghost_actor("missing").is_none());
    }

    #[test]
    fn test_draw_back_to_front() {
        let mut scene = scene();
        let front = scene.add_actor(ActorDesc::new());
        let back = scene.add_actor(ActorDesc::new().with_draw_order(DrawOrderParams::BehindAll));
        let hidden = scene.add_actor(ActorDesc::new());
        for actor in [front, back, hidden] {
            scene.add_component(TargetBehavior::ID, actor);
        }
        scene.enable_component(TargetBehavior::ID, front);
        scene.enable_component(TargetBehavior::ID, back);
        scene.set_property(TargetBehavior::ID, back, PropId::of("hits"), &2.0.into(), false);

        let mut sink = Recorder::default();
        scene.draw(&mut sink);
        assert_eq!(
            sink.calls,
            vec![(back, "target".to_string(), 2.0), (front, "target".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_bridge_events_dispatch_on_update() {
        let mut scene = scene();
        let doc = json!({
            "actors": [{
                "actorId": 1,
                "components": { "Target": {}, "Rules": { "rules": [rule(poke(), hit())] } }
            }]
        });
        scene.load(&doc).unwrap();

        let sender = scene.bridge_sender();
        thread::spawn(move || {
            assert!(sender.send(BridgeEvent::new("poke", json!({ "actorId": 1 }))));
            assert!(sender.send(BridgeEvent::new("unheard", json!({}))));
        })
        .join()
        .unwrap();

        let actor = ActorId::new(1);
        assert_eq!(scene.behavior::<TargetBehavior>().unwrap().hits(actor), Some(0.0));
        scene.update(0.016);
        assert_eq!(scene.behavior::<TargetBehavior>().unwrap().hits(actor), Some(1.0));

        scene.send_outbound("score", json!({ "value": 3 }));
        let events = scene.take_outbound_events();
        assert_eq!(events, vec![BridgeEvent::new("score", json!({ "value": 3 }))]);
        assert!(scene.take_outbound_events().is_empty());
    }

    #[test]
    fn test_restart_rebuilds_loaded_document() {
        let mut scene = scene();
        let doc = json!({
            "variables": [{ "id": "score", "initialValue": 0 }],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Target": {},
                    "Rules": { "rules": [rule(poke(), json!({ "name": "restart scene", "behaviorId": 16 }))] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        scene.set_variable(&VariableRef::new("score"), 5.0.into());
        scene.add_actor(ActorDesc::new());

        scene.fire_if::<PokeTrigger>(ActorId::new(1), RuleExtras::default(), |_| true);
        assert!(scene.is_restart_requested());
        assert_eq!(scene.directory().len(), 2);

        scene.update(0.0);
        assert!(!scene.is_restart_requested());
        assert_eq!(number(&scene, "score"), ExpressionValue::from(0.0));
        assert_eq!(scene.directory().len(), 1);
        assert!(scene.has_actor(ActorId::new(1)));
    }

    #[test]
    fn test_with_behavior_cx() {
        let mut scene = scene();
        let actor = scene.add_actor(ActorDesc::new());
        let added = scene.with_behavior_cx::<TargetBehavior, _>(|target, cx| {
            cx.commands.remove_actor(actor);
            target.components.len()
        });
        assert_eq!(added, Some(0));
        assert!(!scene.has_actor(actor));
    }
}
