use std::fmt;
use voxtrace_common::Extent;

/// Tile of kernel invocations scheduled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Groups needed to cover every pixel of `extent`.
    pub fn groups_for(&self, extent: Extent) -> DispatchSize {
        compute_group_counts(extent.width(), extent.height(), self.x, self.y)
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// The workgroup size every traversal kernel must declare.
pub const KERNEL_WORKGROUP_SIZE: WorkgroupSize = WorkgroupSize::new(8, 8, 1);

/// Workgroup counts for one kernel dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    pub fn total_groups(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

/// Ceiling division of the viewport by the local size. Always one group deep.
///
/// # Panics
/// If either local size is zero.
pub fn compute_group_counts(width: u32, height: u32, local_x: u32, local_y: u32) -> DispatchSize {
    assert!(
        local_x > 0 && local_y > 0,
        "workgroup local size must be positive, got {local_x}x{local_y}"
    );
    DispatchSize {
        x: width.div_ceil(local_x),
        y: height.div_ceil(local_y),
        z: 1,
    }
}

/// Errors from checking a kernel's declared workgroup size.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("cannot parse kernel source:\n{0}")]
    Parse(String),
    #[error("kernel source declares no compute entry point")]
    MissingEntryPoint,
    #[error("entry point `{0}` sizes its workgroup with pipeline overrides")]
    UnresolvedWorkgroupSize(String),
    #[error("entry point `{entry}` declares workgroup size {declared}, dispatcher assumes {expected}")]
    WorkgroupMismatch {
        entry: String,
        declared: WorkgroupSize,
        expected: WorkgroupSize,
    },
}

/// Parse `source` as WGSL and collect each compute entry point's resolved
/// workgroup size. Constant expressions are evaluated; comments are ignored.
fn compute_entry_points(source: &str) -> Result<Vec<(String, WorkgroupSize)>, KernelError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| KernelError::Parse(e.emit_to_string(source)))?;

    let entries = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == naga::ShaderStage::Compute)
        .map(|ep| {
            let [x, y, z] = ep.workgroup_size;
            if x == 0 || y == 0 || z == 0 {
                return Err(KernelError::UnresolvedWorkgroupSize(ep.name.clone()));
            }
            Ok((ep.name.clone(), WorkgroupSize::new(x, y, z)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if entries.is_empty() {
        return Err(KernelError::MissingEntryPoint);
    }
    Ok(entries)
}

/// Workgroup size of every compute entry point in a WGSL source, in
/// declaration order.
pub fn declared_workgroup_sizes(source: &str) -> Result<Vec<WorkgroupSize>, KernelError> {
    Ok(compute_entry_points(source)?
        .into_iter()
        .map(|(_, size)| size)
        .collect())
}

/// Startup check that every compute entry point in `source` uses `expected`.
///
/// A mismatch is not detectable at dispatch time; it silently leaves pixels
/// unwritten or writes out of bounds, so pipelines are only built after this
/// passes.
pub fn verify_kernel_workgroup(source: &str, expected: WorkgroupSize) -> Result<(), KernelError> {
    for (entry, declared) in compute_entry_points(source)? {
        if declared != expected {
            return Err(KernelError::WorkgroupMismatch {
                entry,
                declared,
                expected,
            });
        }
    }
    Ok(())
}
