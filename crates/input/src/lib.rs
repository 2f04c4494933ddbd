//! Input: a fixed set of movement keys mapped to a camera-local velocity.
//!
//! # Invariants
//! - Input state is passed explicitly to the frame controller; nothing here
//!   queries a window or global key table.

pub mod keys;

pub use keys::{InputState, MoveKey};
