//! Tableau Behaviors - the standard behavior set
//!
//! Each module holds one behavior with its props, rule elements and a
//! `register` function:
//! - `Tags` (17) - whitespace-separated tags with a tag to actors index
//! - `Text` (19) - text boxes, published to the host UI
//! - `Drawing` (20) - frame-animated drawings
//! - `Counter` (21) - a bounded number per actor
//! - `Music` (22) - background songs with playback handles
//!
//! [`register_all`] installs the built-in Rules behavior followed by all of
//! the above, in that order.

pub mod counter;
pub mod drawing;
pub mod music;
pub mod tags;
pub mod text;

pub use counter::CounterBehavior;
pub use drawing::DrawingBehavior;
pub use music::MusicBehavior;
pub use tags::TagsBehavior;
pub use text::TextBehavior;

use std::sync::Arc;
use tableau_core::{rules, Result, TypeRegistry};

/// Register the Rules behavior and every standard behavior
pub fn register_all(types: &mut TypeRegistry) -> Result<()> {
    rules::register_builtins(types)?;
    tags::register(types)?;
    text::register(types)?;
    drawing::register(types)?;
    counter::register(types)?;
    music::register(types)?;
    Ok(())
}

/// A shareable type registry holding every standard behavior
pub fn standard_types() -> Result<Arc<TypeRegistry>> {
    let mut types = TypeRegistry::new();
    register_all(&mut types)?;
    Ok(Arc::new(types))
}

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::{json, Value};
    use tableau_core::{Scene, SceneConfig};

    pub fn scene() -> Scene {
        Scene::new(super::standard_types().unwrap(), SceneConfig::default())
    }

    pub fn rule(trigger: Value, response: Value) -> Value {
        json!({ "trigger": trigger, "response": response })
    }
}
