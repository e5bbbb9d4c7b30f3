//! Asset-load sequencing and scene assembly for a 3D text showcase.
//!
//! An HDR environment map and a typeface font are loaded one after the other
//! while a progress indicator tracks the bytes received. Once both are in, the
//! scene is filled with two lines of extruded text and a scatter of torus and
//! torus knot pairs that fade in while the camera flies towards them. Loading
//! and assembly are platform independent; the native window loop lives in
//! `main.rs` and the browser bindings in [`web`].

pub mod app;
pub mod assets;
pub mod config;
pub mod controls;
pub mod data_model;
pub mod error;
pub mod geometry;
pub mod input;
pub mod loading;
pub mod placement;
pub mod progress;
pub mod render;
pub mod scene;
pub mod sequencer;
pub mod text;
pub mod tween;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{ShowcaseApp, Viewport};
pub use config::ShowcaseConfig;
pub use data_model::SceneHandle;
pub use error::{LoadError, SequenceError, Stage};
pub use input::{InputState, KeyCode, MouseButton};
pub use loading::LoadingManager;
pub use progress::{LoadEvent, ProgressSink, ProgressState, ProgressTracker};
pub use render::{CameraParams, Renderer};
pub use scene::{Scene, SceneSummary};
pub use sequencer::{AssemblyReport, SceneSequencer};
