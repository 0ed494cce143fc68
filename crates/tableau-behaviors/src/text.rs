//! Text behavior
//!
//! Text boxes are laid out by the host UI. Every frame the behavior
//! publishes a `textActors` outbound event when that data changed, and taps
//! come back as `textTapped` bridge events. The draw pass only reports the
//! raw content of visible boxes.

use serde_json::{json, Value};
use tableau_core::rules::{Response, RuleContext, RuleElement, RuleExtras, RulesBehavior, Trigger};
use tableau_core::{
    ActorId, BehaviorCx, BehaviorId, BehaviorType, ComponentStore, DrawComponent, DrawSink, NoParams,
    PropAttribs, Reader, Result, Scene, TypeRegistry,
};

tableau_core::props! {
    pub struct TextProps {
        content: String = String::new() => PropAttribs::new().label("Content"),
        visible: bool = true => PropAttribs::new().label("Visible").rules_get().rules_set(),
        /// Position in the host's text list. `-1` on read means "after all others".
        order: i32 = -1,
    }
}

#[derive(Debug, Default)]
pub struct TextBehavior {
    components: ComponentStore<TextProps>,
    last_published: Option<Value>,
}

impl TextBehavior {
    pub fn set_visible(&mut self, actor: ActorId, visible: bool) -> bool {
        match self.components.get_mut(actor) {
            Some(component) => {
                component.props.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self, actor: ActorId) -> bool {
        self.components
            .get_enabled(actor)
            .map_or(false, |component| component.props.visible)
    }

    pub fn content(&self, actor: ActorId) -> Option<&str> {
        self.components.get(actor).map(|c| c.props.content.as_str())
    }
}

impl BehaviorType for TextBehavior {
    type Props = TextProps;
    type State = ();

    const ID: BehaviorId = BehaviorId::new(19);
    const NAME: &'static str = "Text";

    fn components(&self) -> &ComponentStore<TextProps> {
        &self.components
    }

    fn components_mut(&mut self) -> &mut ComponentStore<TextProps> {
        &mut self.components
    }

    fn handle_read_component(&mut self, actor: ActorId, _reader: &Reader<'_>, _cx: &mut BehaviorCx<'_>) {
        let needs_order = self
            .components
            .get(actor)
            .map_or(false, |component| component.props.order == -1);
        if !needs_order {
            return;
        }
        let max_order = self
            .components
            .iter()
            .map(|(_, component)| component.props.order)
            .fold(0, i32::max);
        if let Some(component) = self.components.get_mut(actor) {
            component.props.order = max_order + 1;
        }
    }

    fn handle_perform(&mut self, _dt: f64, cx: &mut BehaviorCx<'_>) {
        if !self.components.is_empty() || self.last_published.is_some() {
            cx.commands.defer(publish_text_actors);
        }
    }

    fn as_drawable(&self) -> Option<&dyn DrawComponent> {
        Some(self)
    }
}

impl DrawComponent for TextBehavior {
    fn draw_component(&self, actor: ActorId, sink: &mut dyn DrawSink) {
        if let Some(component) = self.components.get_enabled(actor) {
            if component.props.visible {
                sink.draw_text(actor, &component.props.content);
            }
        }
    }
}

/// Send `textActors` to the host if it differs from the last one sent
pub fn publish_text_actors(scene: &mut Scene) {
    let Some(text) = scene.behavior::<TextBehavior>() else {
        return;
    };
    let rules = scene.behavior::<RulesBehavior>();
    let actors: Vec<Value> = text
        .components
        .iter_enabled()
        .map(|(actor, component)| {
            let has_tap_trigger = rules.map_or(false, |rules| {
                rules.rules(actor).iter().any(|rule| rule.is_triggered_by::<TapTrigger>())
            });
            json!({
                "actorId": actor.raw(),
                "content": format_content(scene, &component.props.content),
                "order": component.props.order,
                "hasTapTrigger": has_tap_trigger,
                "visible": component.props.visible,
            })
        })
        .collect();
    let data = json!({ "textActors": actors });
    if text.last_published.as_ref() == Some(&data) {
        return;
    }

    tracing::debug!(count = actors_len(&data), "publishing text actors");
    scene.send_outbound("textActors", data.clone());
    if let Some(text) = scene.behavior_mut::<TextBehavior>() {
        text.last_published = Some(data);
    }
}

fn actors_len(data: &Value) -> usize {
    data["textActors"].as_array().map_or(0, Vec::len)
}

/// Replace `$name` with the value of the variable named `name`
///
/// Numbers show at most five decimals without trailing zeros. Unknown names
/// are left as written.
pub fn format_content(scene: &Scene, content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find('$') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(after.len());
        let name = &after[..len];
        match scene.variables().by_name(name).filter(|_| !name.is_empty()) {
            Some(var) => {
                let value = scene.variables().get(&var);
                match value.as_number() {
                    Some(n) => result.push_str(&format_number(n)),
                    None => result.push_str(&value.to_string()),
                }
            }
            None => {
                result.push('$');
                result.push_str(name);
            }
        }
        rest = &after[len..];
    }
    result.push_str(rest);
    result
}

fn format_number(n: f64) -> String {
    let formatted = format!("{n:.5}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Fires when the host reports a tap on the actor's text
pub struct TapTrigger;

impl Trigger for TapTrigger {
    const NAME: &'static str = "tap";
    type Owner = TextBehavior;
    type Params = NoParams;
}

pub struct ShowResponse;

impl RuleElement for ShowResponse {
    const NAME: &'static str = "show";
    type Owner = TextBehavior;
    type Params = NoParams;

    fn from_params(_params: NoParams) -> Self {
        Self
    }
}

impl Response for ShowResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let actor = ctx.actor;
        if let Some(text) = ctx.behavior_mut::<TextBehavior>() {
            text.set_visible(actor, true);
        }
    }
}

pub struct HideResponse;

impl RuleElement for HideResponse {
    const NAME: &'static str = "hide";
    type Owner = TextBehavior;
    type Params = NoParams;

    fn from_params(_params: NoParams) -> Self {
        Self
    }
}

impl Response for HideResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let actor = ctx.actor;
        if let Some(text) = ctx.behavior_mut::<TextBehavior>() {
            text.set_visible(actor, false);
        }
    }
}

/// `textTapped {actorId}`: fire `tap` rules of an actor with enabled text
fn receive_text_tapped(scene: &mut Scene, params: &Reader<'_>) {
    let Some(actor) = params
        .int("actorId")
        .and_then(|id| u32::try_from(id).ok())
        .map(ActorId::new)
    else {
        tracing::warn!("textTapped without actorId");
        return;
    };
    let enabled = scene
        .behavior::<TextBehavior>()
        .map_or(false, |text| text.components.get_enabled(actor).is_some());
    if enabled {
        scene.fire_if::<TapTrigger>(actor, RuleExtras::default(), |_| true);
    }
}

pub fn register(types: &mut TypeRegistry) -> Result<()> {
    types.register_behavior::<TextBehavior>()?;
    types.register_bridge_receiver("textTapped", receive_text_tapped)?;
    let rules = types.rules_mut();
    rules.register_trigger::<TapTrigger>()?;
    rules.register_response::<ShowResponse>()?;
    rules.register_response::<HideResponse>()?;
    Ok(())
}
