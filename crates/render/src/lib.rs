//! Rendering adapter: the data contract between the CPU core and the
//! traversal kernel, independent of any graphics API.
//!
//! # Invariants
//! - Frame constants are derived from the camera, never set directly.
//! - Constants are rebuilt only when the camera is dirty and uploaded as a
//!   full overwrite.
//! - Dispatch tiles use the same workgroup size the kernel declares; the
//!   kernel source is checked against it before any pipeline is built.
//!
//! Backends implement [`KernelBackend`]. The wgpu backend lives in
//! `voxtrace-render-wgpu`; [`RecordingBackend`] records calls for tests and
//! headless tooling.

mod backend;
mod constants;
mod dispatch;

pub use backend::{BackendCall, KernelBackend, RecordingBackend};
pub use constants::{ConstantsTracker, FrameConstants};
pub use dispatch::{
    DispatchSize, KERNEL_WORKGROUP_SIZE, KernelError, WorkgroupSize, compute_group_counts,
    declared_workgroup_sizes, verify_kernel_workgroup,
};
