//! The Rules behavior: per-actor rule lists

use super::{CreateTrigger, Rule, Trigger};
use crate::archive::{Reader, Writer};
use crate::behavior::{BehaviorCx, BehaviorType, ComponentStore};
use crate::identity::{ActorId, BehaviorId};
use crate::props::NoParams;
use indexmap::IndexSet;
use serde_json::Value;
use std::rc::Rc;

/// Rules attached to one actor
#[derive(Debug, Default)]
pub struct ActorRules {
    rules: Vec<Rc<Rule>>,
    /// The authored rule array, written back unchanged
    source: Option<Value>,
    /// Set once the create rules ran; they never run again for this load
    create_fired: bool,
}

impl ActorRules {
    pub fn rules(&self) -> &[Rc<Rule>] {
        &self.rules
    }

    pub fn create_fired(&self) -> bool {
        self.create_fired
    }

    fn has_trigger<T: Trigger>(&self) -> bool {
        self.rules.iter().any(|rule| rule.is_triggered_by::<T>())
    }
}

/// Owns every actor's rules and the built-in rule elements
#[derive(Debug, Default)]
pub struct RulesBehavior {
    components: ComponentStore<NoParams, ActorRules>,
    pending_create: IndexSet<ActorId>,
}

impl RulesBehavior {
    pub fn rules(&self, actor: ActorId) -> &[Rc<Rule>] {
        self.components
            .get(actor)
            .map(|component| component.state.rules())
            .unwrap_or(&[])
    }

    /// Whether the actor's create rules already ran for this load
    pub fn create_fired(&self, actor: ActorId) -> bool {
        self.components.get(actor).map_or(false, |component| component.state.create_fired())
    }

    /// Append a rule built in code
    ///
    /// Such rules run like loaded ones but are not part of the written
    /// document, which only carries the authored rule array.
    pub fn add_rule(&mut self, actor: ActorId, rule: Rule) -> bool {
        let Some(component) = self.components.get_mut(actor) else {
            return false;
        };
        let creates = rule.is_triggered_by::<CreateTrigger>();
        component.state.rules.push(Rc::new(rule));
        if creates && component.is_enabled() && !component.state.create_fired {
            self.pending_create.insert(actor);
        }
        true
    }

    /// Rules of an enabled component triggered by `T` whose params satisfy `predicate`
    ///
    /// The returned handles stay valid even if the actor's rules are replaced
    /// or removed while they run.
    pub fn matching_rules<T, F>(&self, actor: ActorId, predicate: F) -> Vec<Rc<Rule>>
    where
        T: Trigger,
        F: Fn(&T::Params) -> bool,
    {
        let Some(component) = self.components.get_enabled(actor) else {
            return Vec::new();
        };
        component
            .state
            .rules
            .iter()
            .filter(|rule| rule.trigger_params::<T>().map_or(false, &predicate))
            .cloned()
            .collect()
    }

    /// Actors with an enabled Rules component holding at least one `T` rule
    pub fn actors_with_trigger<T: Trigger>(&self) -> Vec<ActorId> {
        self.components
            .iter_enabled()
            .filter(|(_, component)| component.state.has_trigger::<T>())
            .map(|(actor, _)| actor)
            .collect()
    }

    /// Actors whose create rules have not fired yet, oldest first
    ///
    /// Taken actors count as fired and are not queued again by a later
    /// enable.
    pub fn take_pending_create(&mut self) -> Vec<ActorId> {
        let pending: Vec<ActorId> = self.pending_create.drain(..).collect();
        for &actor in &pending {
            if let Some(component) = self.components.get_mut(actor) {
                component.state.create_fired = true;
            }
        }
        pending
    }

    pub fn has_pending_create(&self) -> bool {
        !self.pending_create.is_empty()
    }
}

impl BehaviorType for RulesBehavior {
    type Props = NoParams;
    type State = ActorRules;

    const ID: BehaviorId = BehaviorId::new(16);
    const NAME: &'static str = "Rules";

    fn components(&self) -> &ComponentStore<NoParams, ActorRules> {
        &self.components
    }

    fn components_mut(&mut self) -> &mut ComponentStore<NoParams, ActorRules> {
        &mut self.components
    }

    fn handle_read_component(&mut self, actor: ActorId, reader: &Reader<'_>, cx: &mut BehaviorCx<'_>) {
        let registry = cx.rules;
        let mut rules = Vec::new();
        reader.each("rules", |rule| {
            if let Some(rule) = registry.load_rule(rule) {
                rules.push(Rc::new(rule));
            }
        });
        tracing::debug!(actor = %actor, count = rules.len(), "rules loaded");

        if let Some(component) = self.components.get_mut(actor) {
            component.state = ActorRules {
                rules,
                source: reader.find("rules").cloned(),
                create_fired: false,
            };
        }
    }

    fn handle_write_component(&self, actor: ActorId, writer: &mut Writer) {
        if let Some(source) = self.components.get(actor).and_then(|c| c.state.source.clone()) {
            writer.value("rules", source);
        }
    }

    fn handle_enable_component(&mut self, actor: ActorId, _cx: &mut BehaviorCx<'_>) {
        let creates = self
            .components
            .get(actor)
            .map_or(false, |c| !c.state.create_fired && c.state.has_trigger::<CreateTrigger>());
        if creates {
            self.pending_create.insert(actor);
        }
    }

    fn handle_disable_component(&mut self, actor: ActorId, _removing_actor: bool, _cx: &mut BehaviorCx<'_>) {
        self.pending_create.shift_remove(&actor);
    }
}
