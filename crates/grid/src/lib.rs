//! Voxel occupancy storage: one bit per cell of a cube of side `R`.
//!
//! # Invariants
//! - Bit index of `(x, y, z)` is `x + y*R + z*R*R` (x fastest, then y, then z).
//! - Word index is `bit / 32`, bit offset is `bit % 32`.
//! - A freshly constructed grid is fully occupied.
//! - Resolution is fixed for the lifetime of the grid.

mod grid;
mod texel;

pub use grid::{
    BITS_PER_WORD, BitLocation, DEFAULT_RESOLUTION, GridError, MAX_RESOLUTION, VoxelGrid,
};
pub use texel::{
    BITS_PER_TEXEL, RESOLUTION_ALIGNMENT, TexelExtent, TexelLocation, WORDS_PER_TEXEL,
};
