//! Shared types used across the voxel tracer crates.

mod types;

pub use types::Extent;
