//! Ambient Matrix - real-time frame effects for chained LED panels
//!
//! Turns a live BGR camera stream into stylized output for an interactive
//! ambient display: motion-driven effects built on a running background
//! model, procedural generators for idle hours, a multi-panel compositor,
//! and an auto-cycle controller that crossfades between effects.

pub mod config;
pub mod contour;
pub mod cycle;
pub mod draw;
pub mod effects;
pub mod engine;
pub mod frame;
pub mod motion;
pub mod panels;

pub use config::EngineConfig;
pub use effects::{Effect, EffectContext, PanelMode, SystemMode};
pub use engine::{Engine, EngineControls, EngineStatus};
pub use frame::{Frame, GrayBuffer};
