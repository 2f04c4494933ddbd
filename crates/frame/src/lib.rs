//! Frame controller: owns the per-tick sequence around the traversal kernel.
//!
//! Each tick runs strictly in order: apply input to the camera, rebuild and
//! upload constants if the camera is dirty, dispatch the kernel. The host
//! loop (window, event pump, presentation) calls into [`FrameHandler`] and
//! feeds events through [`FrameController::handle_event`].
//!
//! # Invariants
//! - Ticks never overlap; the controller is single-threaded.
//! - Resources are acquired in `on_init`; a failure there aborts setup.

mod config;
mod controller;

pub use config::{CameraConfig, ConfigError, SceneConfig, WindowConfig};
pub use controller::{FrameController, FrameError, FrameEvent, FrameHandler};
