//! Camera / projection: pose, look-at orientation and the pixel-to-ray transform.
//!
//! # Invariants
//! - Rotation is composed as `Rz * Rx * Ry`; no other order is valid.
//! - The viewport extent is never zero on either axis.
//! - Any pose or extent mutation leaves the camera dirty until the derived
//!   constants are rebuilt and `mark_stable` is called.

mod camera;

pub use camera::{CameraError, CameraState, FORWARD, VoxelCamera};
