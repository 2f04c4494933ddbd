//! wgpu backend for the voxel tracer.
//!
//! Owns every GPU resource the kernel touches: the frame constants uniform,
//! the 3-D occupancy texture, the write-only output image and the compute
//! pipeline, plus a present pass that blits the output image to a surface.
//!
//! # Invariants
//! - The kernel's declared workgroup size is verified before its pipeline is built.
//! - Renderer construction fails on any wgpu validation error.
//! - Resources are released when the renderer is dropped.

mod gpu;
mod present;
mod shaders;

pub use gpu::{RenderError, VoxelRenderer};
pub use shaders::TRAVERSE_KERNEL;
