use std::convert::Infallible;
use voxtrace_common::Extent;
use voxtrace_grid::VoxelGrid;

use crate::constants::FrameConstants;
use crate::dispatch::DispatchSize;

/// Graphics-API side of the kernel contract.
///
/// The frame controller drives a backend in a fixed order each tick:
/// constants upload, then dispatch. Backends rely on their API's submission
/// order to make the upload visible to the dispatch that follows it.
pub trait KernelBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Upload the occupancy volume to the kernel's read-only voxel binding.
    /// Called once at scene setup.
    fn upload_voxels(&mut self, grid: &VoxelGrid) -> Result<(), Self::Error>;

    /// (Re)create the write-only output image at `extent`.
    fn resize_output(&mut self, extent: Extent) -> Result<(), Self::Error>;

    /// Overwrite the whole constant block.
    fn upload_constants(&mut self, constants: &FrameConstants) -> Result<(), Self::Error>;

    /// Bind output image and voxel data and run the kernel over `groups`.
    fn dispatch(&mut self, groups: DispatchSize) -> Result<(), Self::Error>;
}

/// A call observed by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    UploadVoxels { resolution: u32, words: usize },
    ResizeOutput(Extent),
    UploadConstants(FrameConstants),
    Dispatch(DispatchSize),
}

/// Backend that records every call instead of talking to a GPU.
///
/// Used for headless tooling and to test the frame sequence.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Drain the recorded calls.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn dispatches(&self) -> impl Iterator<Item = &DispatchSize> {
        self.calls.iter().filter_map(|c| match c {
            BackendCall::Dispatch(d) => Some(d),
            _ => None,
        })
    }

    /// The most recently uploaded constant block.
    pub fn last_constants(&self) -> Option<&FrameConstants> {
        self.calls.iter().rev().find_map(|c| match c {
            BackendCall::UploadConstants(k) => Some(k),
            _ => None,
        })
    }
}

impl KernelBackend for RecordingBackend {
    type Error = Infallible;

    fn upload_voxels(&mut self, grid: &VoxelGrid) -> Result<(), Infallible> {
        self.calls.push(BackendCall::UploadVoxels {
            resolution: grid.resolution(),
            words: grid.word_count(),
        });
        Ok(())
    }

    fn resize_output(&mut self, extent: Extent) -> Result<(), Infallible> {
        self.calls.push(BackendCall::ResizeOutput(extent));
        Ok(())
    }

    fn upload_constants(&mut self, constants: &FrameConstants) -> Result<(), Infallible> {
        self.calls.push(BackendCall::UploadConstants(*constants));
        Ok(())
    }

    fn dispatch(&mut self, groups: DispatchSize) -> Result<(), Infallible> {
        tracing::trace!(x = groups.x, y = groups.y, "recorded dispatch");
        self.calls.push(BackendCall::Dispatch(groups));
        Ok(())
    }
}
