//! Music behavior
//!
//! Playback happens in the host. The behavior hands out playback handles,
//! tracks which are active per actor and tells the host through `musicPlay`
//! and `musicStop` outbound events. A disabled Music component never keeps a
//! handle.

use indexmap::IndexMap;
use serde_json::json;
use tableau_core::rules::{Response, RuleContext, RuleElement};
use tableau_core::{
    ActorId, BehaviorCx, BehaviorId, BehaviorType, ComponentStore, NoParams, Outbox, PropAttribs,
    Result, TypeRegistry,
};

pub const AUTOPLAY_MODES: &[&str] = &["none", "once", "loop"];

tableau_core::props! {
    pub struct MusicProps {
        /// Song document, as authored by the music editor
        song: String = String::new(),
        autoplay: String = String::from("loop") => PropAttribs::new().label("autoplay when enabled").allowed(AUTOPLAY_MODES),
        volume: f64 = 1.0 => PropAttribs::new().label("volume").min(0.0).max(1.0).rules_get().rules_set(),
    }
}

/// Identifies one playing stream in the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u32);

#[derive(Debug, Default)]
pub struct MusicBehavior {
    components: ComponentStore<MusicProps>,
    active_tracks: IndexMap<ActorId, Vec<PlaybackHandle>>,
    next_handle: u32,
}

impl MusicBehavior {
    pub fn active_track_count(&self, actor: ActorId) -> usize {
        self.active_tracks.get(&actor).map_or(0, Vec::len)
    }

    pub fn total_active_tracks(&self) -> usize {
        self.active_tracks.values().map(Vec::len).sum()
    }

    /// Start the actor's song. `false` without an enabled component.
    pub fn play(&mut self, actor: ActorId, looping: bool, outbox: &mut Outbox) -> bool {
        let Some(component) = self.components.get_enabled(actor) else {
            return false;
        };
        self.next_handle += 1;
        let handle = PlaybackHandle(self.next_handle);
        outbox.send(
            "musicPlay",
            json!({
                "actorId": actor.raw(),
                "handle": handle.0,
                "song": component.props.song,
                "loop": looping,
                "volume": component.props.volume,
            }),
        );
        self.active_tracks.entry(actor).or_default().push(handle);
        true
    }

    /// Stop every stream of the actor. Returns how many were stopped.
    pub fn stop(&mut self, actor: ActorId, outbox: &mut Outbox) -> usize {
        let Some(handles) = self.active_tracks.shift_remove(&actor) else {
            return 0;
        };
        for handle in &handles {
            outbox.send("musicStop", json!({ "actorId": actor.raw(), "handle": handle.0 }));
        }
        handles.len()
    }
}

impl BehaviorType for MusicBehavior {
    type Props = MusicProps;
    type State = ();

    const ID: BehaviorId = BehaviorId::new(22);
    const NAME: &'static str = "Music";
    const ALLOWS_DISABLE_WITHOUT_REMOVAL: bool = false;

    fn components(&self) -> &ComponentStore<MusicProps> {
        &self.components
    }

    fn components_mut(&mut self) -> &mut ComponentStore<MusicProps> {
        &mut self.components
    }

    fn handle_enable_component(&mut self, actor: ActorId, cx: &mut BehaviorCx<'_>) {
        if self.active_track_count(actor) > 0 {
            return;
        }
        let mode = self
            .components
            .get(actor)
            .map(|component| component.props.autoplay.clone())
            .unwrap_or_default();
        match mode.as_str() {
            "once" => {
                self.play(actor, false, cx.outbox);
            }
            "loop" => {
                self.play(actor, true, cx.outbox);
            }
            _ => {}
        }
    }

    fn handle_disable_component(&mut self, actor: ActorId, _removing_actor: bool, cx: &mut BehaviorCx<'_>) {
        let stopped = self.stop(actor, cx.outbox);
        if stopped > 0 {
            tracing::debug!(actor = %actor, stopped, "music stopped on disable");
        }
    }
}

tableau_core::props! {
    pub struct PlaySongParams {
        play_mode: String = String::from("once") => PropAttribs::new().label("play mode").allowed(&["once", "loop"]),
    }
}

pub struct PlaySongResponse {
    params: PlaySongParams,
}

impl RuleElement for PlaySongResponse {
    const NAME: &'static str = "play song";
    type Owner = MusicBehavior;
    type Params = PlaySongParams;

    fn from_params(params: PlaySongParams) -> Self {
        Self { params }
    }
}

impl Response for PlaySongResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let actor = ctx.actor;
        let looping = self.params.play_mode == "loop";
        ctx.scene.with_behavior_cx::<MusicBehavior, _>(|music, cx| {
            music.stop(actor, cx.outbox);
            music.play(actor, looping, cx.outbox);
        });
    }
}

pub struct StopSongResponse;

impl RuleElement for StopSongResponse {
    const NAME: &'static str = "stop song";
    type Owner = MusicBehavior;
    type Params = NoParams;

    fn from_params(_params: NoParams) -> Self {
        Self
    }
}

impl Response for StopSongResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let actor = ctx.actor;
        ctx.scene.with_behavior_cx::<MusicBehavior, _>(|music, cx| {
            music.stop(actor, cx.outbox);
        });
    }
}

pub fn register(types: &mut TypeRegistry) -> Result<()> {
    types.register_behavior::<MusicBehavior>()?;
    let rules = types.rules_mut();
    rules.register_response::<PlaySongResponse>()?;
    rules.register_response::<StopSongResponse>()?;
    Ok(())
}
