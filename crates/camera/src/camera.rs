use glam::{Mat4, Vec3, Vec4};
use voxtrace_common::Extent;

/// Camera-local forward axis. After the Y/Z swap in the pixel-to-ray chain,
/// view-space "into the screen" lands on +Y; X is right and Z is up.
pub const FORWARD: Vec3 = Vec3::Y;

/// Errors from camera configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("field of view must be within (0, 180) degrees, got {0}")]
    InvalidFov(f32),
    #[error("look-at target coincides with the camera position {0}")]
    DegenerateLookAt(Vec3),
}

/// Whether the derived pixel-to-ray transform is up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    /// Nothing changed since the last rebuild.
    Stable,
    /// Pose or extent changed; the transform must be rebuilt and re-uploaded.
    Dirty,
}

/// Yaw/pitch voxel camera that produces a pixel-to-ray matrix for the
/// traversal kernel.
#[derive(Debug, Clone)]
pub struct VoxelCamera {
    position: Vec3,
    /// Euler angles in radians.
    rotation: Vec3,
    extent: Extent,
    /// Vertical field of view in degrees.
    fov: f32,
    state: CameraState,
}

fn validate_fov(fov: f32) -> Result<f32, CameraError> {
    if fov.is_finite() && fov > 0.0 && fov < 180.0 {
        Ok(fov)
    } else {
        Err(CameraError::InvalidFov(fov))
    }
}

impl VoxelCamera {
    /// Create a camera. It starts dirty: no constants have been derived yet.
    pub fn new(
        position: Vec3,
        rotation: Vec3,
        extent: Extent,
        fov: f32,
    ) -> Result<Self, CameraError> {
        Ok(Self {
            position,
            rotation,
            extent,
            fov: validate_fov(fov)?,
            state: CameraState::Dirty,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == CameraState::Dirty
    }

    /// Record that the derived constants were rebuilt from the current pose.
    pub fn mark_stable(&mut self) {
        self.state = CameraState::Stable;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.state = CameraState::Dirty;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.state = CameraState::Dirty;
    }

    pub fn set_extent(&mut self, extent: Extent) {
        self.extent = extent;
        self.state = CameraState::Dirty;
    }

    pub fn set_fov(&mut self, fov: f32) -> Result<(), CameraError> {
        self.fov = validate_fov(fov)?;
        self.state = CameraState::Dirty;
        Ok(())
    }

    /// Move by a camera-local velocity (x right, y forward, z up) over `dt` seconds.
    pub fn move_local(&mut self, velocity: Vec3, dt: f32) {
        let delta = self.rotation_matrix().transform_vector3(velocity * dt);
        self.translate(delta);
    }

    /// Orient along `direction` with yaw about Z and pitch about X. Roll is zeroed.
    pub fn look_direction(&mut self, direction: Vec3) {
        let yaw = (-direction.x).atan2(direction.y);
        let pitch = direction.z.atan2(direction.truncate().length());
        self.set_rotation(Vec3::new(pitch, 0.0, yaw));
    }

    /// Face `target` from the current position.
    pub fn look_at(&mut self, target: Vec3) -> Result<(), CameraError> {
        let direction = target - self.position;
        if direction.length_squared() <= f32::EPSILON {
            return Err(CameraError::DegenerateLookAt(self.position));
        }
        self.look_direction(direction);
        Ok(())
    }

    pub fn rotation_matrix(&self) -> Mat4 {
        let rot_x = Mat4::from_rotation_x(self.rotation.x);
        let rot_y = Mat4::from_rotation_y(self.rotation.y);
        let rot_z = Mat4::from_rotation_z(self.rotation.z);
        rot_z * rot_x * rot_y
    }

    pub fn translation_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
    }

    /// World-space viewing direction.
    pub fn forward(&self) -> Vec3 {
        self.rotation_matrix().transform_vector3(FORWARD)
    }

    /// Transform taking a homogeneous pixel coordinate `(px, py, 1, 1)` to a
    /// world-space point on the ray through that pixel's center. The ray
    /// direction is that point minus `position`.
    ///
    /// Pixel `(0, 0)` is the top-left corner. The vertical half-FOV is kept
    /// for landscape viewports and the horizontal one for portrait viewports;
    /// the other axis widens with the aspect ratio.
    pub fn pixel_to_ray_matrix(&self) -> Mat4 {
        let size = self.extent.as_vec2();
        let aspect = self.extent.aspect();
        let tan_half_fov = (self.fov * 0.5).to_radians().tan();

        let center_pixel = Mat4::from_cols(
            Vec4::X,
            Vec4::Y,
            Vec4::new(0.5, 0.5, 1.0, 0.0),
            Vec4::W,
        );

        let pixel_to_ndc = Mat4::from_cols(
            Vec4::new(2.0 / size.x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, -2.0 / size.y, 0.0, 0.0),
            Vec4::new(-1.0, 1.0, 1.0, 0.0),
            Vec4::W,
        );

        let ndc_to_view = Mat4::from_scale(Vec3::new(
            tan_half_fov * aspect.max(1.0),
            tan_half_fov / aspect.min(1.0),
            1.0,
        ));

        let swap_yz = Mat4::from_cols(Vec4::X, Vec4::Z, Vec4::Y, Vec4::W);

        self.translation_matrix()
            * self.rotation_matrix()
            * swap_yz
            * ndc_to_view
            * pixel_to_ndc
            * center_pixel
    }

    /// Normalized world-space direction of the ray through pixel `(px, py)`.
    pub fn ray_direction(&self, px: f32, py: f32) -> Vec3 {
        let point = self.pixel_to_ray_matrix() * Vec4::new(px, py, 1.0, 1.0);
        (point.truncate() - self.position).normalize()
    }
}
