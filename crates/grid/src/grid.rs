/// Side length of the placeholder scene volume.
pub const DEFAULT_RESOLUTION: u32 = 24;

/// Occupancy bits stored per backing word.
pub const BITS_PER_WORD: u32 = u32::BITS;

/// Largest side length whose cell count still fits a 32-bit bit index, which
/// is what the traversal kernel computes with.
pub const MAX_RESOLUTION: u32 = 1625;

/// Errors from grid construction and layout queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("voxel resolution must be positive")]
    ZeroResolution,
    #[error("voxel resolution {0} exceeds the maximum of {MAX_RESOLUTION}")]
    ResolutionTooLarge(u32),
    #[error("voxel resolution {0} is not a multiple of 8; cannot pack into 128-bit texels")]
    UnalignedResolution(u32),
}

/// Where a cell's occupancy bit lives in the backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitLocation {
    /// Linear bit index, `x + y*R + z*R*R`.
    pub bit: usize,
    /// Index into `raw_words()`.
    pub word: usize,
    /// Bit within that word, least significant first.
    pub offset: u32,
}

/// Cubic bit-packed occupancy volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    resolution: u32,
    words: Vec<u32>,
}

impl VoxelGrid {
    /// Create a fully occupied grid of side `resolution`.
    ///
    /// Bits past the last cell in the final word are left clear.
    pub fn new(resolution: u32) -> Result<Self, GridError> {
        if resolution == 0 {
            return Err(GridError::ZeroResolution);
        }
        if resolution > MAX_RESOLUTION {
            return Err(GridError::ResolutionTooLarge(resolution));
        }

        let cells = (resolution as usize).pow(3);
        let word_count = cells.div_ceil(BITS_PER_WORD as usize);
        let mut words = vec![u32::MAX; word_count];

        let tail = (cells % BITS_PER_WORD as usize) as u32;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last = (1u32 << tail) - 1;
            }
        }

        tracing::debug!(resolution, word_count, "voxel grid created");
        Ok(Self { resolution, words })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Total number of cells, `R^3`.
    pub fn cell_count(&self) -> usize {
        (self.resolution as usize).pow(3)
    }

    /// Number of backing words, `ceil(R^3 / 32)`.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// True if every coordinate is within `[0, R)`.
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        x < self.resolution && y < self.resolution && z < self.resolution
    }

    /// Locate the bit for `(x, y, z)`.
    ///
    /// # Panics
    /// If any coordinate is outside `[0, R)`. Coordinates are never wrapped.
    pub fn bit_location(&self, x: u32, y: u32, z: u32) -> BitLocation {
        assert!(
            self.contains(x, y, z),
            "voxel ({x}, {y}, {z}) outside grid of resolution {}",
            self.resolution
        );
        let r = self.resolution as usize;
        let bit = x as usize + y as usize * r + z as usize * r * r;
        BitLocation {
            bit,
            word: bit / BITS_PER_WORD as usize,
            offset: (bit % BITS_PER_WORD as usize) as u32,
        }
    }

    /// # Panics
    /// If any coordinate is outside `[0, R)`.
    pub fn is_occupied(&self, x: u32, y: u32, z: u32) -> bool {
        let loc = self.bit_location(x, y, z);
        self.words[loc.word] & (1 << loc.offset) != 0
    }

    /// Checked variant of [`is_occupied`](Self::is_occupied).
    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<bool> {
        self.contains(x, y, z).then(|| self.is_occupied(x, y, z))
    }

    /// # Panics
    /// If any coordinate is outside `[0, R)`.
    pub fn set_occupied(&mut self, x: u32, y: u32, z: u32, value: bool) {
        let loc = self.bit_location(x, y, z);
        let mask = 1u32 << loc.offset;
        if value {
            self.words[loc.word] |= mask;
        } else {
            self.words[loc.word] &= !mask;
        }
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Backing storage in bit-index order, ready for upload.
    pub fn raw_words(&self) -> &[u32] {
        &self.words
    }

    /// Backing storage as little-endian-in-memory bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            words: vec![u32::MAX; (DEFAULT_RESOLUTION as usize).pow(3) / BITS_PER_WORD as usize],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(r: u32) -> impl Iterator<Item = (u32, u32, u32)> {
        (0..r).flat_map(move |z| (0..r).flat_map(move |y| (0..r).map(move |x| (x, y, z))))
    }

    #[test]
    fn default_grid_is_fully_occupied() {
        let grid = VoxelGrid::default();
        assert_eq!(grid.resolution(), DEFAULT_RESOLUTION);
        assert_eq!(grid, VoxelGrid::new(DEFAULT_RESOLUTION).unwrap());
        assert!(coords(DEFAULT_RESOLUTION).all(|(x, y, z)| grid.is_occupied(x, y, z)));
        assert_eq!(grid.occupied_count(), grid.cell_count());
    }

    #[test]
    fn word_count_is_ceiling_of_cells() {
        assert_eq!(VoxelGrid::new(24).unwrap().word_count(), 24 * 24 * 24 / 32);
        assert_eq!(VoxelGrid::new(1).unwrap().word_count(), 1);
        assert_eq!(VoxelGrid::new(5).unwrap().word_count(), 4); // 125 bits
    }

    #[test]
    fn tail_bits_stay_clear() {
        let grid = VoxelGrid::new(5).unwrap();
        assert_eq!(grid.occupied_count(), 125);
        assert_eq!(grid.raw_words()[3], (1 << 29) - 1);
    }

    #[test]
    fn rejects_bad_resolution() {
        assert_eq!(VoxelGrid::new(0), Err(GridError::ZeroResolution));
        assert_eq!(
            VoxelGrid::new(MAX_RESOLUTION + 1),
            Err(GridError::ResolutionTooLarge(MAX_RESOLUTION + 1))
        );
    }

    #[test]
    fn bit_index_is_x_fastest_then_y_then_z() {
        let grid = VoxelGrid::new(24).unwrap();
        assert_eq!(grid.bit_location(1, 0, 0).bit, 1);
        assert_eq!(grid.bit_location(0, 1, 0).bit, 24);
        assert_eq!(grid.bit_location(0, 0, 1).bit, 576);
        let loc = grid.bit_location(7, 3, 2);
        assert_eq!(loc.bit, 7 + 3 * 24 + 2 * 576);
        assert_eq!(loc.word, loc.bit / 32);
        assert_eq!(loc.offset as usize, loc.bit % 32);
    }

    #[test]
    fn set_then_get_is_injective() {
        let r = 6;
        let mut grid = VoxelGrid::new(r).unwrap();
        for (x, y, z) in coords(r) {
            grid.set_occupied(x, y, z, false);
            assert!(!grid.is_occupied(x, y, z));
            for (ox, oy, oz) in coords(r) {
                if (ox, oy, oz) != (x, y, z) {
                    assert!(grid.is_occupied(ox, oy, oz), "({ox},{oy},{oz}) aliased ({x},{y},{z})");
                }
            }
            grid.set_occupied(x, y, z, true);
            assert!(grid.is_occupied(x, y, z));
        }
    }

    #[test]
    fn corner_voxels_do_not_alias() {
        let r = 24;
        let mut grid = VoxelGrid::new(r).unwrap();
        grid.set_occupied(0, 0, 0, false);
        grid.set_occupied(23, 23, 23, false);

        let first = grid.bit_location(0, 0, 0);
        let last = grid.bit_location(23, 23, 23);
        assert_eq!(first.bit, 0);
        assert_eq!(last.bit, (r as usize).pow(3) - 1);
        assert_ne!((first.word, first.offset), (last.word, last.offset));

        assert!(!grid.is_occupied(0, 0, 0));
        assert!(!grid.is_occupied(23, 23, 23));
        assert_eq!(grid.occupied_count(), grid.cell_count() - 2);
        assert_eq!(grid.raw_words()[0], !1);
        assert_eq!(*grid.raw_words().last().unwrap(), !(1 << 31));
    }

    #[test]
    fn checked_get_rejects_out_of_range() {
        let grid = VoxelGrid::new(4).unwrap();
        assert_eq!(grid.get(3, 3, 3), Some(true));
        assert_eq!(grid.get(4, 0, 0), None);
        assert_eq!(grid.get(0, 0, 99), None);
    }

    #[test]
    #[should_panic(expected = "outside grid")]
    fn out_of_range_coordinate_panics() {
        let grid = VoxelGrid::new(4).unwrap();
        grid.is_occupied(0, 4, 0);
    }

    #[test]
    fn bytes_mirror_words() {
        let mut grid = VoxelGrid::new(8).unwrap();
        grid.set_occupied(0, 0, 0, false);
        assert_eq!(grid.as_bytes().len(), grid.word_count() * 4);
        assert_eq!(&grid.as_bytes()[..4], &(!1u32).to_ne_bytes());
    }
}
