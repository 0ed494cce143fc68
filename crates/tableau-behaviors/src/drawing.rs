//! Drawing behavior: frame-animated vector drawings referenced by hash

use tableau_core::{
    ActorId, BehaviorCx, BehaviorId, BehaviorType, ComponentStore, DrawComponent, DrawSink,
    PropAttribs, Reader, Result, TypeRegistry, Writer,
};

tableau_core::props! {
    pub struct DrawingProps {
        hash: String = String::new(),
        frame: f64 = 1.0 => PropAttribs::new().label("frame").min(1.0).rules_get().rules_set(),
        playing: bool = false => PropAttribs::new().label("playing").rules_get().rules_set(),
        frames_per_second: f64 = 4.0 => PropAttribs::new().label("frames per second").min(0.0),
    }
}

/// Animation data that is not a prop
#[derive(Debug, Clone)]
pub struct Animation {
    pub frame_count: u32,
}

impl Default for Animation {
    fn default() -> Self {
        Self { frame_count: 1 }
    }
}

#[derive(Debug, Default)]
pub struct DrawingBehavior {
    components: ComponentStore<DrawingProps, Animation>,
}

impl DrawingBehavior {
    /// Current whole frame, 1-based
    pub fn current_frame(&self, actor: ActorId) -> Option<u32> {
        self.components
            .get(actor)
            .map(|component| component.props.frame.floor().max(1.0) as u32)
    }

    pub fn frame_count(&self, actor: ActorId) -> Option<u32> {
        self.components.get(actor).map(|c| c.state.frame_count)
    }
}

/// Advance `frame` by `steps`, wrapping within `1..=frame_count`
fn advance(frame: f64, steps: f64, frame_count: u32) -> f64 {
    let count = f64::from(frame_count.max(1));
    let offset = (frame - 1.0 + steps).rem_euclid(count);
    1.0 + offset
}

impl BehaviorType for DrawingBehavior {
    type Props = DrawingProps;
    type State = Animation;

    const ID: BehaviorId = BehaviorId::new(20);
    const NAME: &'static str = "Drawing";

    fn components(&self) -> &ComponentStore<DrawingProps, Animation> {
        &self.components
    }

    fn components_mut(&mut self) -> &mut ComponentStore<DrawingProps, Animation> {
        &mut self.components
    }

    fn handle_read_component(&mut self, actor: ActorId, reader: &Reader<'_>, _cx: &mut BehaviorCx<'_>) {
        if let Some(component) = self.components.get_mut(actor) {
            let frame_count = reader
                .int("frameCount")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(1);
            component.state.frame_count = frame_count.max(1);
        }
    }

    fn handle_write_component(&self, actor: ActorId, writer: &mut Writer) {
        if let Some(component) = self.components.get(actor) {
            writer.int("frameCount", i64::from(component.state.frame_count));
        }
    }

    fn handle_perform(&mut self, dt: f64, _cx: &mut BehaviorCx<'_>) {
        for (_, component) in self.components.iter_mut() {
            if !component.is_enabled() || !component.props.playing {
                continue;
            }
            let steps = dt * component.props.frames_per_second;
            component.props.frame = advance(component.props.frame, steps, component.state.frame_count);
        }
    }

    fn as_drawable(&self) -> Option<&dyn DrawComponent> {
        Some(self)
    }
}

impl DrawComponent for DrawingBehavior {
    fn draw_component(&self, actor: ActorId, sink: &mut dyn DrawSink) {
        let Some(component) = self.components.get_enabled(actor) else {
            return;
        };
        if component.props.hash.is_empty() {
            return;
        }
        sink.draw_asset(actor, &component.props.hash, component.props.frame.floor());
    }
}

pub fn register(types: &mut TypeRegistry) -> Result<()> {
    types.register_behavior::<DrawingBehavior>()
}
