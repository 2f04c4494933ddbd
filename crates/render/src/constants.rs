use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use voxtrace_camera::VoxelCamera;

/// Constant block read by every kernel invocation of a dispatch.
///
/// Mirrors the WGSL uniform struct
/// `{ pixel_to_ray: mat4x4<f32>, voxel_resolution: u32, render_mode: u32 }`,
/// padded to the 16-byte uniform alignment (80 bytes total).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    pixel_to_ray: [[f32; 4]; 4],
    voxel_resolution: u32,
    render_mode: u32,
    _pad: [u32; 2],
}

impl FrameConstants {
    fn new(voxel_resolution: u32, render_mode: u32) -> Self {
        Self {
            pixel_to_ray: Mat4::IDENTITY.to_cols_array_2d(),
            voxel_resolution,
            render_mode,
            _pad: [0; 2],
        }
    }

    pub fn pixel_to_ray(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.pixel_to_ray)
    }

    pub fn voxel_resolution(&self) -> u32 {
        self.voxel_resolution
    }

    pub fn render_mode(&self) -> u32 {
        self.render_mode
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Owns the frame constants and rebuilds them lazily from a camera.
///
/// Resolution and render mode are fixed at scene setup; only the
/// pixel-to-ray matrix follows the camera.
#[derive(Debug, Clone)]
pub struct ConstantsTracker {
    constants: FrameConstants,
    rebuilds: u64,
}

impl ConstantsTracker {
    pub fn new(voxel_resolution: u32, render_mode: u32) -> Self {
        Self {
            constants: FrameConstants::new(voxel_resolution, render_mode),
            rebuilds: 0,
        }
    }

    pub fn constants(&self) -> &FrameConstants {
        &self.constants
    }

    /// How many times the constants have been rebuilt and uploaded.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// If the camera is dirty, rebuild the pixel-to-ray matrix, hand the full
    /// block to `upload`, and mark the camera stable once the upload succeeds.
    ///
    /// Returns `Ok(true)` when a rebuild happened. A failed upload leaves the
    /// camera dirty so the next call retries.
    pub fn refresh<E>(
        &mut self,
        camera: &mut VoxelCamera,
        upload: impl FnOnce(&FrameConstants) -> Result<(), E>,
    ) -> Result<bool, E> {
        if !camera.is_dirty() {
            return Ok(false);
        }

        self.constants.pixel_to_ray = camera.pixel_to_ray_matrix().to_cols_array_2d();
        upload(&self.constants)?;
        camera.mark_stable();
        self.rebuilds += 1;

        tracing::debug!(
            rebuilds = self.rebuilds,
            width = camera.extent().width(),
            height = camera.extent().height(),
            "frame constants rebuilt"
        );
        Ok(true)
    }
}
