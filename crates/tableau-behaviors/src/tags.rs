//! Tags behavior
//!
//! An actor's tags are authored as one whitespace-separated string. The
//! behavior keeps the parsed list on the component and an index from tag to
//! actors, covering enabled components only.

use indexmap::IndexSet;
use smallvec::SmallVec;
use std::collections::HashMap;
use tableau_core::rules::{Condition, Response, RuleContext, RuleElement, RuleExtras, Trigger};
use tableau_core::{
    set_component_property, ActorDirectory, ActorId, BehaviorCx, BehaviorId, BehaviorType,
    ComponentStore, ExpressionValue, PropAttribs, PropId, Reader, Result, Scene, Tag, TypeRegistry,
};

pub type TagList = SmallVec<[Tag; 4]>;

const TAGS_STRING: PropId = PropId::of("tags_string");

tableau_core::props! {
    pub struct TagsProps {
        tags_string: String = String::new() => PropAttribs::new().label("tags"),
    }
}

#[derive(Debug, Default)]
pub struct TagsBehavior {
    components: ComponentStore<TagsProps, TagList>,
    index: HashMap<Tag, IndexSet<ActorId>>,
    /// Actors whose tags string was edited interactively and needs reparsing
    dirty: IndexSet<ActorId>,
}

impl TagsBehavior {
    /// Whether the actor has `tag`. The empty tag is on every actor.
    pub fn has_tag(&self, actor: ActorId, tag: &Tag) -> bool {
        if tag.is_empty() {
            return true;
        }
        self.tags(actor).contains(tag)
    }

    pub fn tags(&self, actor: ActorId) -> &[Tag] {
        self.components
            .get(actor)
            .map(|component| component.state.as_slice())
            .unwrap_or(&[])
    }

    /// Actors with an enabled component holding `tag`, or every non-ghost
    /// actor for the empty tag
    pub fn actors_with_tag(&self, tag: &Tag, directory: &ActorDirectory) -> Vec<ActorId> {
        if tag.is_empty() {
            return directory.actor_ids().collect();
        }
        self.index
            .get(tag)
            .map(|actors| actors.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count_actors_with_tag(&self, tag: &Tag, directory: &ActorDirectory) -> usize {
        if tag.is_empty() {
            return directory.actor_ids().count();
        }
        self.index.get(tag).map_or(0, IndexSet::len)
    }

    /// Add a tag, keeping the tags string in sync. `false` if the actor has
    /// no component, the tag is empty, holds whitespace or is already present.
    pub fn add_tag(&mut self, actor: ActorId, tag: Tag) -> bool {
        let Some(component) = self.components.get_mut(actor) else {
            return false;
        };
        if !tag.is_single_word() {
            if !tag.is_empty() {
                tracing::warn!(actor = %actor, tag = %tag, "tag with whitespace rejected");
            }
            return false;
        }
        if component.state.contains(&tag) {
            return false;
        }
        if component.is_enabled() {
            index_insert(&mut self.index, actor, &tag);
        }
        component.state.push(tag);
        component.props.tags_string = join(&component.state);
        true
    }

    /// Remove a tag, keeping the tags string in sync. `false` if absent.
    pub fn remove_tag(&mut self, actor: ActorId, tag: &Tag) -> bool {
        let Some(component) = self.components.get_mut(actor) else {
            return false;
        };
        let Some(position) = component.state.iter().position(|t| t == tag) else {
            return false;
        };
        component.state.remove(position);
        component.props.tags_string = join(&component.state);
        if component.is_enabled() {
            index_remove(&mut self.index, actor, tag);
        }
        true
    }

    fn reparse(&mut self, actor: ActorId) {
        let Some(component) = self.components.get_mut(actor) else {
            return;
        };
        let parsed: TagList = Tag::parse_list(&component.props.tags_string).collect();
        let previous = std::mem::replace(&mut component.state, parsed);
        if component.is_enabled() {
            for tag in &previous {
                index_remove(&mut self.index, actor, tag);
            }
            for tag in &component.state {
                index_insert(&mut self.index, actor, tag);
            }
        }
    }
}

fn join(tags: &[Tag]) -> String {
    tags.iter().map(Tag::as_str).collect::<Vec<_>>().join(" ")
}

fn index_insert(index: &mut HashMap<Tag, IndexSet<ActorId>>, actor: ActorId, tag: &Tag) {
    index.entry(tag.clone()).or_default().insert(actor);
}

fn index_remove(index: &mut HashMap<Tag, IndexSet<ActorId>>, actor: ActorId, tag: &Tag) {
    if let Some(actors) = index.get_mut(tag) {
        actors.shift_remove(&actor);
        if actors.is_empty() {
            index.remove(tag);
        }
    }
}

impl BehaviorType for TagsBehavior {
    type Props = TagsProps;
    type State = TagList;

    const ID: BehaviorId = BehaviorId::new(17);
    const NAME: &'static str = "Tags";

    fn components(&self) -> &ComponentStore<TagsProps, TagList> {
        &self.components
    }

    fn components_mut(&mut self) -> &mut ComponentStore<TagsProps, TagList> {
        &mut self.components
    }

    fn handle_read_component(&mut self, actor: ActorId, _reader: &Reader<'_>, _cx: &mut BehaviorCx<'_>) {
        self.reparse(actor);
    }

    fn handle_enable_component(&mut self, actor: ActorId, _cx: &mut BehaviorCx<'_>) {
        if let Some(component) = self.components.get(actor) {
            for tag in &component.state {
                index_insert(&mut self.index, actor, tag);
            }
        }
    }

    fn handle_disable_component(&mut self, actor: ActorId, _removing_actor: bool, _cx: &mut BehaviorCx<'_>) {
        self.dirty.shift_remove(&actor);
        if let Some(component) = self.components.get(actor) {
            for tag in &component.state {
                index_remove(&mut self.index, actor, tag);
            }
        }
    }

    fn handle_set_property(
        &mut self,
        actor: ActorId,
        prop: PropId,
        value: &ExpressionValue,
        interactive: bool,
        _cx: &mut BehaviorCx<'_>,
    ) -> bool {
        let changed = set_component_property(self, actor, prop, value);
        if changed && prop == TAGS_STRING {
            if interactive {
                self.dirty.insert(actor);
            } else {
                self.reparse(actor);
            }
        }
        changed
    }

    fn handle_perform(&mut self, _dt: f64, _cx: &mut BehaviorCx<'_>) {
        let dirty: Vec<ActorId> = self.dirty.drain(..).collect();
        for actor in dirty {
            self.reparse(actor);
        }
    }
}

/// Add a tag and fire `gain tag` rules
pub fn add_tag(scene: &mut Scene, actor: ActorId, tag: &Tag) -> bool {
    let added = scene
        .behavior_mut::<TagsBehavior>()
        .map_or(false, |tags| tags.add_tag(actor, tag.clone()));
    if added {
        scene.fire_if::<GainTagTrigger>(actor, RuleExtras::default(), |params| params.tag.matches(tag));
    }
    added
}

/// Remove a tag and fire `lose tag` rules
pub fn remove_tag(scene: &mut Scene, actor: ActorId, tag: &Tag) -> bool {
    let removed = scene
        .behavior_mut::<TagsBehavior>()
        .map_or(false, |tags| tags.remove_tag(actor, tag));
    if removed {
        scene.fire_if::<LoseTagTrigger>(actor, RuleExtras::default(), |params| params.tag.matches(tag));
    }
    removed
}

tableau_core::props! {
    pub struct TagParams {
        tag: Tag = Tag::empty(),
    }
}

/// Fires when the actor gains a tag. An empty `tag` matches any tag.
pub struct GainTagTrigger;

impl Trigger for GainTagTrigger {
    const NAME: &'static str = "gain tag";
    type Owner = TagsBehavior;
    type Params = TagParams;
}

/// Fires when the actor loses a tag. An empty `tag` matches any tag.
pub struct LoseTagTrigger;

impl Trigger for LoseTagTrigger {
    const NAME: &'static str = "lose tag";
    type Owner = TagsBehavior;
    type Params = TagParams;
}

pub struct AddTagResponse {
    params: TagParams,
}

impl RuleElement for AddTagResponse {
    const NAME: &'static str = "add tag";
    type Owner = TagsBehavior;
    type Params = TagParams;

    fn from_params(params: TagParams) -> Self {
        Self { params }
    }
}

impl Response for AddTagResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        add_tag(ctx.scene, ctx.actor, &self.params.tag);
    }
}

pub struct RemoveTagResponse {
    params: TagParams,
}

impl RuleElement for RemoveTagResponse {
    const NAME: &'static str = "remove tag";
    type Owner = TagsBehavior;
    type Params = TagParams;

    fn from_params(params: TagParams) -> Self {
        Self { params }
    }
}

impl Response for RemoveTagResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        remove_tag(ctx.scene, ctx.actor, &self.params.tag);
    }
}

pub struct HasTagCondition {
    params: TagParams,
}

impl RuleElement for HasTagCondition {
    const NAME: &'static str = "has tag";
    type Owner = TagsBehavior;
    type Params = TagParams;

    fn from_params(params: TagParams) -> Self {
        Self { params }
    }
}

impl Condition for HasTagCondition {
    fn eval(&self, ctx: &mut RuleContext<'_>) -> bool {
        ctx.behavior::<TagsBehavior>()
            .map_or(false, |tags| tags.has_tag(ctx.actor, &self.params.tag))
    }
}

pub fn register(types: &mut TypeRegistry) -> Result<()> {
    types.register_behavior::<TagsBehavior>()?;
    let rules = types.rules_mut();
    rules.register_trigger::<GainTagTrigger>()?;
    rules.register_trigger::<LoseTagTrigger>()?;
    rules.register_condition::<HasTagCondition>()?;
    rules.register_response::<AddTagResponse>()?;
    rules.register_response::<RemoveTagResponse>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{rule, scene};
    use serde_json::json;
    use tableau_core::{ActorDesc, VariableRef};

    fn tags(scene: &Scene) -> &TagsBehavior {
        scene.behavior::<TagsBehavior>().unwrap()
    }

    fn gain(tag: &str) -> serde_json::Value {
        json!({ "name": "gain tag", "behaviorId": 17, "params": { "tag": tag } })
    }

    fn set_var(var: &str) -> serde_json::Value {
        json!({ "name": "set variable", "behaviorId": 16, "params": { "variable": var, "set_to": 1 } })
    }

    #[test]
    fn test_index_follows_enable_state() {
        let mut scene = scene();
        let actor = scene.read_actor(
            ActorDesc::new(),
            &json!({ "components": { "Tags": { "tags_string": "Red blue red" } } }),
            false,
        );
        let red = Tag::new("red");

        assert_eq!(tags(&scene).tags(actor), &[Tag::new("red"), Tag::new("blue")]);
        assert_eq!(tags(&scene).actors_with_tag(&red, scene.directory()), vec![actor]);

        scene.disable_component(TagsBehavior::ID, actor);
        assert!(tags(&scene).actors_with_tag(&red, scene.directory()).is_empty());
        assert!(tags(&scene).has_tag(actor, &red));

        scene.enable_component(TagsBehavior::ID, actor);
        assert_eq!(tags(&scene).count_actors_with_tag(&red, scene.directory()), 1);

        scene.remove_actor(actor);
        assert_eq!(tags(&scene).count_actors_with_tag(&red, scene.directory()), 0);
        assert!(!tags(&scene).has_tag(actor, &red));
    }

    #[test]
    fn test_empty_tag_matches_everything() {
        let mut scene = scene();
        let a = scene.add_actor(ActorDesc::new());
        let b = scene.add_actor(ActorDesc::new());
        let empty = Tag::empty();
        assert!(tags(&scene).has_tag(a, &empty));
        assert_eq!(tags(&scene).actors_with_tag(&empty, scene.directory()), vec![a, b]);
    }

    #[test]
    fn test_gain_tag_wildcard_filter() {
        let mut scene = scene();
        let doc = json!({
            "variables": [
                { "id": "any", "initialValue": 0 },
                { "id": "blue", "initialValue": 0 }
            ],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Tags": {},
                    "Rules": { "rules": [
                        rule(gain(""), set_var("any")),
                        rule(gain("blue"), set_var("blue"))
                    ] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        let actor = ActorId::new(1);

        assert!(add_tag(&mut scene, actor, &Tag::new("red")));
        assert_eq!(scene.variables().get(&VariableRef::new("any")), ExpressionValue::from(1.0));
        assert_eq!(scene.variables().get(&VariableRef::new("blue")), ExpressionValue::from(0.0));
        assert!(!add_tag(&mut scene, actor, &Tag::new("red")));
    }

    #[test]
    fn test_tag_responses_and_condition() {
        let mut scene = scene();
        let doc = json!({
            "variables": [{ "id": "hot", "initialValue": 0 }],
            "actors": [{
                "actorId": 1,
                "components": {
                    "Tags": { "tags_string": "red" },
                    "Rules": { "rules": [
                        rule(
                            json!({ "name": "lose tag", "behaviorId": 17, "params": { "tag": "red" } }),
                            json!({ "name": "add tag", "behaviorId": 17, "params": { "tag": "hot" } })
                        ),
                        {
                            "trigger": gain("hot"),
                            "conditions": [{ "name": "has tag", "behaviorId": 17, "params": { "tag": "hot" } }],
                            "response": set_var("hot")
                        }
                    ] }
                }
            }]
        });
        scene.load(&doc).unwrap();
        let actor = ActorId::new(1);

        assert!(remove_tag(&mut scene, actor, &Tag::new("red")));
        assert_eq!(tags(&scene).tags(actor), &[Tag::new("hot")]);
        assert_eq!(scene.variables().get(&VariableRef::new("hot")), ExpressionValue::from(1.0));

        let written = scene.write_actor(actor).unwrap();
        assert_eq!(written["components"]["Tags"]["tags_string"], "hot");
    }

    #[test]
    fn test_add_tag_rejects_whitespace() {
        let mut scene = scene();
        let actor = scene.read_actor(
            ActorDesc::new(),
            &json!({ "components": { "Tags": { "tags_string": "red" } } }),
            false,
        );

        assert!(!add_tag(&mut scene, actor, &Tag::new("big blue")));
        assert_eq!(tags(&scene).tags(actor), &[Tag::new("red")]);
        assert!(tags(&scene)
            .actors_with_tag(&Tag::new("big blue"), scene.directory())
            .is_empty());

        // Reparsing the written string yields the same list
        scene.update(0.016);
        let written = scene.write_actor(actor).unwrap();
        assert_eq!(written["components"]["Tags"]["tags_string"], "red");
        assert!(add_tag(&mut scene, actor, &Tag::new("blue")));
        assert_eq!(tags(&scene).tags(actor), &[Tag::new("red"), Tag::new("blue")]);
    }

    #[test]
    fn test_interactive_edit_reindexes_on_perform() {
        let mut scene = scene();
        let actor = scene.read_actor(
            ActorDesc::new(),
            &json!({ "components": { "Tags": { "tags_string": "red" } } }),
            false,
        );
        let green = Tag::new("green");

        scene.set_property(TagsBehavior::ID, actor, TAGS_STRING, &"green".into(), true);
        assert!(tags(&scene).actors_with_tag(&green, scene.directory()).is_empty());
        scene.update(0.016);
        assert_eq!(tags(&scene).actors_with_tag(&green, scene.directory()), vec![actor]);

        scene.set_property(TagsBehavior::ID, actor, TAGS_STRING, &"red".into(), false);
        assert_eq!(tags(&scene).actors_with_tag(&Tag::new("red"), scene.directory()), vec![actor]);
        assert!(tags(&scene).actors_with_tag(&green, scene.directory()).is_empty());
    }
}
