use glam::Vec3;
use voxtrace_camera::{CameraError, VoxelCamera};
use voxtrace_common::Extent;
use voxtrace_grid::{GridError, VoxelGrid};
use voxtrace_input::{InputState, MoveKey};
use voxtrace_render::{ConstantsTracker, KERNEL_WORKGROUP_SIZE, KernelBackend, WorkgroupSize};

use crate::config::SceneConfig;

/// Errors surfaced by the frame controller.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("voxel grid error: {0}")]
    Grid(#[from] GridError),
    #[error("kernel backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("frame ticked before scene setup")]
    NotInitialized,
}

fn backend_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> FrameError {
    FrameError::Backend(Box::new(e))
}

/// Events the host loop feeds into the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameEvent {
    /// Window or surface resized, in physical pixels.
    Resize { width: u32, height: u32 },
    /// Movement key pressed or released.
    Key { key: MoveKey, pressed: bool },
    /// Window lost keyboard focus; held keys are released.
    FocusLost,
    /// Advance one frame.
    Tick { dt: f32 },
}

/// Lifecycle hooks invoked by a host loop.
pub trait FrameHandler {
    type Error;

    /// Acquire scene resources. Called once before the first tick.
    fn on_init(&mut self) -> Result<(), Self::Error>;

    /// Run one frame. `dt` is in seconds.
    fn on_tick(&mut self, dt: f32) -> Result<(), Self::Error>;

    /// The viewport changed size.
    fn on_resize(&mut self, width: u32, height: u32) -> Result<(), Self::Error>;
}

/// Drives camera, constants and kernel dispatch against a [`KernelBackend`].
pub struct FrameController<B: KernelBackend> {
    camera: VoxelCamera,
    grid: VoxelGrid,
    tracker: ConstantsTracker,
    input: InputState,
    backend: B,
    focus: Vec3,
    move_speed: f32,
    workgroup: WorkgroupSize,
    initialized: bool,
    ticks: u64,
}

impl<B: KernelBackend> FrameController<B> {
    /// Build the scene from `config` with a fully occupied voxel grid.
    /// `extent` is the viewport size reported by the window.
    pub fn new(config: &SceneConfig, extent: Extent, backend: B) -> Result<Self, FrameError> {
        let grid = VoxelGrid::new(config.voxel_resolution)?;
        Self::with_grid(config, extent, grid, backend)
    }

    /// Build the scene around an existing grid. The config's resolution is
    /// ignored in favor of the grid's.
    pub fn with_grid(
        config: &SceneConfig,
        extent: Extent,
        grid: VoxelGrid,
        backend: B,
    ) -> Result<Self, FrameError> {
        let camera = VoxelCamera::new(config.camera.position, Vec3::ZERO, extent, config.camera.fov)?;
        let tracker = ConstantsTracker::new(grid.resolution(), config.render_mode);
        Ok(Self {
            camera,
            grid,
            tracker,
            input: InputState::new(),
            backend,
            focus: config.camera.focus,
            move_speed: config.camera.move_speed,
            workgroup: KERNEL_WORKGROUP_SIZE,
            initialized: false,
            ticks: 0,
        })
    }

    pub fn camera(&self) -> &VoxelCamera {
        &self.camera
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn tracker(&self) -> &ConstantsTracker {
        &self.tracker
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Single dispatch site for host events.
    pub fn handle_event(&mut self, event: FrameEvent) -> Result<(), FrameError> {
        match event {
            FrameEvent::Resize { width, height } => self.on_resize(width, height),
            FrameEvent::Key { key, pressed } => {
                self.input.set(key, pressed);
                Ok(())
            }
            FrameEvent::FocusLost => {
                self.input.clear();
                Ok(())
            }
            FrameEvent::Tick { dt } => self.on_tick(dt),
        }
    }

    fn sync_constants(&mut self) -> Result<bool, FrameError> {
        let backend = &mut self.backend;
        self.tracker
            .refresh(&mut self.camera, |constants| backend.upload_constants(constants))
            .map_err(backend_error)
    }

    fn face_focus(&mut self) {
        if let Err(e) = self.camera.look_at(self.focus) {
            tracing::warn!("keeping previous orientation: {e}");
        }
    }
}

impl<B: KernelBackend> FrameHandler for FrameController<B> {
    type Error = FrameError;

    fn on_init(&mut self) -> Result<(), FrameError> {
        let _span = tracing::info_span!("scene_setup").entered();

        self.backend
            .upload_voxels(&self.grid)
            .map_err(backend_error)?;
        self.backend
            .resize_output(self.camera.extent())
            .map_err(backend_error)?;

        self.camera.look_at(self.focus)?;
        self.sync_constants()?;
        self.initialized = true;

        tracing::info!(
            resolution = self.grid.resolution(),
            occupied = self.grid.occupied_count(),
            width = self.camera.extent().width(),
            height = self.camera.extent().height(),
            "scene initialized"
        );
        Ok(())
    }

    fn on_tick(&mut self, dt: f32) -> Result<(), FrameError> {
        let _span = tracing::trace_span!("frame_tick", tick = self.ticks).entered();
        if !self.initialized {
            return Err(FrameError::NotInitialized);
        }

        let velocity = self.input.velocity(self.move_speed);
        if velocity != Vec3::ZERO {
            self.camera.move_local(velocity, dt);
            self.face_focus();
        }

        self.sync_constants()?;

        let groups = self.workgroup.groups_for(self.camera.extent());
        self.backend.dispatch(groups).map_err(backend_error)?;
        self.ticks += 1;
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> Result<(), FrameError> {
        if Extent::is_degenerate(width, height) {
            tracing::warn!(width, height, "degenerate viewport clamped to at least 1x1");
        }
        let extent = Extent::new(width, height);
        if extent == self.camera.extent() {
            return Ok(());
        }

        tracing::debug!(width = extent.width(), height = extent.height(), "viewport resized");
        self.camera.set_extent(extent);
        if !self.initialized {
            // Picked up by on_init.
            return Ok(());
        }
        self.backend.resize_output(extent).map_err(backend_error)?;
        self.sync_constants()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxtrace_render::{BackendCall, DispatchSize, RecordingBackend};

    fn controller() -> FrameController<RecordingBackend> {
        let config = SceneConfig::default();
        let mut ctl =
            FrameController::new(&config, config.window.extent(), RecordingBackend::new())
                .unwrap();
        ctl.on_init().unwrap();
        ctl
    }

    fn assert_faces(ctl: &FrameController<RecordingBackend>, target: Vec3) {
        let expected = (target - ctl.camera().position()).normalize();
        assert!((ctl.camera().forward().normalize() - expected).length() < 1e-4);
    }

    #[test]
    fn init_uploads_voxels_output_and_constants() {
        let ctl = controller();
        let calls = ctl.backend().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0],
            BackendCall::UploadVoxels {
                resolution: 24,
                words: 432
            }
        );
        assert_eq!(calls[1], BackendCall::ResizeOutput(Extent::new(1280, 720)));
        assert!(matches!(calls[2], BackendCall::UploadConstants(_)));

        let constants = ctl.backend().last_constants().unwrap();
        assert_eq!(constants.voxel_resolution(), 24);
        assert_eq!(constants.render_mode(), 0);
        assert!(!ctl.camera().is_dirty());
        assert_faces(&ctl, Vec3::ZERO);
    }

    #[test]
    fn tick_before_init_fails() {
        let config = SceneConfig::default();
        let mut ctl =
            FrameController::new(&config, config.window.extent(), RecordingBackend::new())
                .unwrap();
        assert!(!ctl.is_initialized());
        assert!(matches!(ctl.on_tick(0.016), Err(FrameError::NotInitialized)));

        ctl.on_init().unwrap();
        assert!(ctl.is_initialized());
        ctl.on_tick(0.016).unwrap();
    }

    #[test]
    fn idle_tick_only_dispatches() {
        let mut ctl = controller();
        ctl.backend_mut().take_calls();

        ctl.on_tick(0.016).unwrap();
        assert_eq!(
            ctl.backend().calls(),
            &[BackendCall::Dispatch(DispatchSize { x: 160, y: 90, z: 1 })]
        );
        assert_eq!(ctl.tracker().rebuilds(), 1);
        assert_eq!(ctl.ticks(), 1);
    }

    #[test]
    fn movement_uploads_before_dispatch() {
        let mut ctl = controller();
        ctl.backend_mut().take_calls();
        let start = ctl.camera().position();

        ctl.handle_event(FrameEvent::Key {
            key: MoveKey::Right,
            pressed: true,
        })
        .unwrap();
        ctl.handle_event(FrameEvent::Tick { dt: 0.5 }).unwrap();

        let calls = ctl.backend().calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], BackendCall::UploadConstants(_)));
        assert!(matches!(calls[1], BackendCall::Dispatch(_)));

        let moved = ctl.camera().position() - start;
        assert!((moved.length() - 2.5).abs() < 1e-4);
        assert_faces(&ctl, Vec3::ZERO);
    }

    #[test]
    fn focus_lost_releases_keys() {
        let mut ctl = controller();
        ctl.handle_event(FrameEvent::Key {
            key: MoveKey::Forward,
            pressed: true,
        })
        .unwrap();
        ctl.handle_event(FrameEvent::FocusLost).unwrap();
        assert!(!ctl.input().any_pressed());

        ctl.backend_mut().take_calls();
        ctl.handle_event(FrameEvent::Tick { dt: 0.1 }).unwrap();
        assert_eq!(ctl.backend().calls().len(), 1);
    }

    #[test]
    fn resize_rebuilds_constants_once() {
        let mut ctl = controller();
        let before = *ctl.backend().last_constants().unwrap();
        ctl.backend_mut().take_calls();

        ctl.handle_event(FrameEvent::Resize {
            width: 640,
            height: 360,
        })
        .unwrap();

        let calls = ctl.backend().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], BackendCall::ResizeOutput(Extent::new(640, 360)));
        let BackendCall::UploadConstants(after) = calls[1] else {
            panic!("expected constants upload, got {:?}", calls[1]);
        };
        assert_ne!(after.pixel_to_ray(), before.pixel_to_ray());
        assert_eq!(ctl.tracker().rebuilds(), 2);
        assert!(!ctl.camera().is_dirty());

        ctl.backend_mut().take_calls();
        ctl.on_tick(0.016).unwrap();
        assert_eq!(
            ctl.backend().calls(),
            &[BackendCall::Dispatch(DispatchSize { x: 80, y: 45, z: 1 })]
        );
        assert_eq!(ctl.tracker().rebuilds(), 2);
    }

    #[test]
    fn same_size_resize_is_ignored() {
        let mut ctl = controller();
        ctl.backend_mut().take_calls();
        ctl.on_resize(1280, 720).unwrap();
        assert!(ctl.backend().calls().is_empty());
        assert_eq!(ctl.tracker().rebuilds(), 1);
    }

    #[test]
    fn zero_size_resize_is_clamped() {
        let mut ctl = controller();
        ctl.on_resize(0, 0).unwrap();
        assert_eq!(ctl.camera().extent(), Extent::new(1, 1));

        let constants = ctl.backend().last_constants().unwrap();
        assert!(
            constants
                .pixel_to_ray()
                .to_cols_array()
                .iter()
                .all(|v| v.is_finite())
        );

        ctl.backend_mut().take_calls();
        ctl.on_tick(0.016).unwrap();
        assert_eq!(
            ctl.backend().dispatches().next(),
            Some(&DispatchSize { x: 1, y: 1, z: 1 })
        );
    }

    #[test]
    fn resize_before_init_is_applied_at_setup() {
        let config = SceneConfig::default();
        let mut ctl =
            FrameController::new(&config, config.window.extent(), RecordingBackend::new())
                .unwrap();
        ctl.on_resize(800, 600).unwrap();
        assert!(ctl.backend().calls().is_empty());

        ctl.on_init().unwrap();
        assert_eq!(
            ctl.backend().calls()[1],
            BackendCall::ResizeOutput(Extent::new(800, 600))
        );
    }

    #[test]
    fn custom_grid_keeps_its_contents() {
        let config = SceneConfig::default();
        let mut grid = VoxelGrid::new(8).unwrap();
        grid.set_occupied(1, 2, 3, false);
        let mut ctl = FrameController::with_grid(
            &config,
            config.window.extent(),
            grid,
            RecordingBackend::new(),
        )
        .unwrap();
        ctl.on_init().unwrap();

        assert!(!ctl.grid().is_occupied(1, 2, 3));
        assert_eq!(ctl.tracker().constants().voxel_resolution(), 8);
    }

    #[test]
    fn bad_config_fails_construction() {
        let mut config = SceneConfig::default();
        config.camera.fov = 0.0;
        let result = FrameController::new(&config, Extent::default(), RecordingBackend::new());
        assert!(matches!(result, Err(FrameError::Camera(CameraError::InvalidFov(_)))));

        let mut config = SceneConfig::default();
        config.voxel_resolution = 0;
        let result = FrameController::new(&config, Extent::default(), RecordingBackend::new());
        assert!(matches!(result, Err(FrameError::Grid(GridError::ZeroResolution))));
    }
}
