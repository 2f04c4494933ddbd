//! Packing of the occupancy words into a 3-D RGBA32Uint texture.
//!
//! Each texel carries 128 consecutive occupancy bits: channel `c` holds
//! word `4 * texel + c`. Texels are laid out row-major over an extent of
//! `(R/4, R/4, R/8)`, which covers exactly `R^3 / 128` texels.

use crate::grid::{BITS_PER_WORD, GridError, VoxelGrid};

/// Occupancy bits per texel (four 32-bit channels).
pub const BITS_PER_TEXEL: u32 = 128;

pub const WORDS_PER_TEXEL: u32 = BITS_PER_TEXEL / BITS_PER_WORD;

/// Resolutions must be a multiple of this to pack into whole texels.
pub const RESOLUTION_ALIGNMENT: u32 = 8;

/// Size of the voxel texture in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelExtent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Where a cell's bit lives inside the voxel texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelLocation {
    pub texel: [u32; 3],
    pub channel: u32,
    pub offset: u32,
}

impl TexelExtent {
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Bytes per texture row, as needed by the upload layout.
    pub fn bytes_per_row(&self) -> u32 {
        self.width * BITS_PER_TEXEL / 8
    }

    /// Address a linear bit index the way the traversal kernel does.
    pub fn locate(&self, bit: usize) -> TexelLocation {
        let texel = bit / BITS_PER_TEXEL as usize;
        let within = (bit % BITS_PER_TEXEL as usize) as u32;
        let w = self.width as usize;
        let h = self.height as usize;
        TexelLocation {
            texel: [
                (texel % w) as u32,
                ((texel / w) % h) as u32,
                (texel / (w * h)) as u32,
            ],
            channel: within / BITS_PER_WORD,
            offset: within % BITS_PER_WORD,
        }
    }
}

impl VoxelGrid {
    /// Texture extent for uploading this grid. Requires `R` to be a multiple of [`RESOLUTION_ALIGNMENT`] so that
    /// the words divide evenly into texels.
    pub fn texel_extent(&self) -> Result<TexelExtent, GridError> {
        let r = self.resolution();
        if r % RESOLUTION_ALIGNMENT != 0 {
            return Err(GridError::UnalignedResolution(r));
        }
        Ok(TexelExtent {
            width: r / 4,
            height: r / 4,
            depth: r / 8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_resolution_extent() {
        let grid = VoxelGrid::new(24).unwrap();
        let extent = grid.texel_extent().unwrap();
        assert_eq!(
            extent,
            TexelExtent {
                width: 6,
                height: 6,
                depth: 3
            }
        );
        assert_eq!(extent.texel_count() * BITS_PER_TEXEL as usize, grid.cell_count());
        assert_eq!(
            extent.texel_count() * WORDS_PER_TEXEL as usize,
            grid.word_count()
        );
        assert_eq!(extent.bytes_per_row(), 6 * 16);
    }

    #[test]
    fn unaligned_resolution_is_rejected() {
        let grid = VoxelGrid::new(20).unwrap();
        assert_eq!(grid.texel_extent(), Err(GridError::UnalignedResolution(20)));
    }

    #[test]
    fn locate_matches_word_layout() {
        let grid = VoxelGrid::new(24).unwrap();
        let extent = grid.texel_extent().unwrap();

        let first = extent.locate(grid.bit_location(0, 0, 0).bit);
        assert_eq!(first, TexelLocation { texel: [0, 0, 0], channel: 0, offset: 0 });

        let loc = grid.bit_location(23, 23, 23);
        let last = extent.locate(loc.bit);
        assert_eq!(last.texel, [5, 5, 2]);
        assert_eq!(last.channel, 3);
        assert_eq!(last.offset, 31);

        // The texel's linear index and channel reproduce the word index.
        let t = last.texel;
        let linear = t[0] + t[1] * extent.width + t[2] * extent.width * extent.height;
        assert_eq!((linear * WORDS_PER_TEXEL + last.channel) as usize, loc.word);
        assert_eq!(last.offset, loc.offset);
    }
}
