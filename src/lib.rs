//! scene-ngin
//!
//! A small wgpu scene engine built around one guarantee: nothing is drawn
//! before the GPU resources it uses are ready, and everything is released in a
//! fixed order when a scene goes away.
//!
//! High-level modules
//! - `flow`: the [`Scene`](flow::Scene) contract and the lifecycle state machine
//!   ([`SceneController`](flow::SceneController))
//! - `resources`: shader, mesh and texture registries, asset sources, media
//! - `render`: per-frame draw dispatch
//! - `context`: the GPU context owned by one controller
//! - `gpu`: the graphics capability the engine drives, with a wgpu and a
//!   headless backend
//! - `data_structures`: geometry, draw plans and transforms
//! - `camera`, `config`, `error`, `logging`: ambient pieces
//! - `host`: a winit window running one scene
//! - `scenes`: the scenes shipped with the viewer
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod gpu;
pub mod host;
pub mod logging;
pub mod render;
pub mod resources;
pub mod scenes;

// Re-exports commonly used types for convenience in downstream code.
pub use config::EngineConfig;
pub use error::SceneError;
pub use flow::{LifecycleState, Next, Scene, SceneController};
pub use gpu::{GraphicsApi, HeadlessApi, WgpuApi};
