//! Tableau Core - actor/behavior/rule runtime for rule-based scenes
//!
//! This crate provides the scene runtime behind a visual scripting tool:
//! - Actor identity and back-to-front draw order (`ActorDirectory`)
//! - Behaviors holding per-actor components (`BehaviorType`, `Behavior`)
//! - Declarative props records with editor metadata (`props!`)
//! - A rule engine of triggers, conditions, responses and expressions (`rules`)
//! - A seeded random source for rule expressions (`SceneRng`)
//! - Library blueprints with per-field inheritance (`Library`)
//! - Scene variables, document load/save and the frame loop (`Scene`)
//!
//! ## Threading
//!
//! A scene is driven from one thread. Events from other threads arrive
//! through a cloneable `BridgeSender` and are dispatched at the start of the
//! next `Scene::update`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tableau_core::{rules, ActorDesc, Scene, SceneConfig, TypeRegistry};
//!
//! let mut types = TypeRegistry::new();
//! rules::register_builtins(&mut types).unwrap();
//!
//! let mut scene = Scene::new(Arc::new(types), SceneConfig::default());
//! let actor = scene.add_actor(ActorDesc::new());
//! assert!(scene.has_actor(actor));
//! scene.update(1.0 / 60.0);
//! ```

mod actors;
mod archive;
mod behavior;
mod bridge;
mod command;
mod config;
mod error;
mod identity;
mod library;
mod props;
mod registry;
mod rng;
pub mod rules;
mod scene;
mod tag;
mod value;
mod variables;

pub use actors::{ActorDesc, ActorDirectory, DrawOrder, DrawOrderParams, DEFAULT_TIE_BREAK_HEADROOM};
pub use archive::{strip_inherited, Reader, Writer};
pub use behavior::{
    get_component_property, set_component_property, Behavior, BehaviorCx, BehaviorType, Component,
    ComponentStore, DrawComponent, DrawSink,
};
pub use bridge::{BridgeEvent, BridgeSender, Inbox, Outbox};
pub use command::{CommandQueue, SceneCommand};
pub use config::SceneConfig;
pub use error::{Error, Result};
pub use identity::{ActorId, BehaviorId};
pub use library::{Library, LibraryEntry};
pub use props::{NoParams, PropAttribs, PropId, PropKind, PropValue, PropertyDescriptor, Props};
pub use registry::{BehaviorMeta, BehaviorRegistry, BridgeReceiveFn, TypeRegistry};
pub use rng::SceneRng;
pub use scene::Scene;
pub use tag::Tag;
pub use value::ExpressionValue;
pub use variables::{VariableRef, Variables};
