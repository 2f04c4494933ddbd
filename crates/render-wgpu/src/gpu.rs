use crate::present::PresentPass;
use crate::shaders;
use std::num::NonZeroU64;
use voxtrace_common::Extent;
use voxtrace_grid::{GridError, TexelExtent, VoxelGrid};
use voxtrace_render::{
    DispatchSize, FrameConstants, KERNEL_WORKGROUP_SIZE, KernelBackend, KernelError,
    verify_kernel_workgroup,
};

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const VOXEL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Uint;
const CONSTANTS_SIZE: u64 = std::mem::size_of::<FrameConstants>() as u64;

/// Errors from the wgpu backend.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("wgpu validation failed: {0}")]
    Validation(String),
    #[error("{0} has not been created yet")]
    NotReady(&'static str),
    #[error("{what} dimension {size} exceeds the device limit of {limit}")]
    ExceedsLimit {
        what: &'static str,
        size: u32,
        limit: u32,
    },
}

/// Reject a texture whose largest dimension is over the device limit.
fn check_limit(what: &'static str, size: wgpu::Extent3d, limit: u32) -> Result<(), RenderError> {
    let largest = size.width.max(size.height).max(size.depth_or_array_layers);
    if largest > limit {
        return Err(RenderError::ExceedsLimit {
            what,
            size: largest,
            limit,
        });
    }
    Ok(())
}

fn pop_validation_scope(device: &wgpu::Device) -> Result<(), RenderError> {
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::Validation(err.to_string())),
        None => Ok(()),
    }
}

fn texture_size(extent: TexelExtent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: extent.depth,
    }
}

fn output_size(extent: Extent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width(),
        height: extent.height(),
        depth_or_array_layers: 1,
    }
}

/// Runs the traversal kernel on a wgpu device and blits its output.
///
/// Owns the device and queue so the frame controller can drive it through
/// [`KernelBackend`] alone.
pub struct VoxelRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    constants_buffer: wgpu::Buffer,
    voxel_view: Option<wgpu::TextureView>,
    output_view: Option<wgpu::TextureView>,
    bind_group: Option<wgpu::BindGroup>,
    present: PresentPass,
}

impl VoxelRenderer {
    /// Build the compute pipeline for `kernel_source` (or the bundled kernel).
    ///
    /// The kernel's declared workgroup size is checked before anything is
    /// created on the device.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        kernel_source: Option<&str>,
    ) -> Result<Self, RenderError> {
        let source = kernel_source.unwrap_or(shaders::TRAVERSE_KERNEL);
        verify_kernel_workgroup(source, KERNEL_WORKGROUP_SIZE)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("traverse_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: OUTPUT_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Uint,
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(CONSTANTS_SIZE),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("traverse_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("traverse_kernel"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("traverse_pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: None,
            compilation_options: Default::default(),
            cache: None,
        });

        let constants_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_constants"),
            size: CONSTANTS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let present = PresentPass::new(&device, surface_format);

        pop_validation_scope(&device)?;

        tracing::info!(
            workgroup = %KERNEL_WORKGROUP_SIZE,
            custom_kernel = kernel_source.is_some(),
            "traversal pipeline created"
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            layout,
            constants_buffer,
            voxel_view: None,
            output_view: None,
            bind_group: None,
            present,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Blit the most recent output image onto `target`.
    pub fn present(&self, target: &wgpu::TextureView) -> Result<(), RenderError> {
        if !self.present.is_ready() {
            return Err(RenderError::NotReady("output image"));
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("present_encoder"),
            });
        self.present.encode(&mut encoder, target);
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn rebuild_bind_group(&mut self) {
        let (Some(output), Some(voxels)) = (&self.output_view, &self.voxel_view) else {
            return;
        };
        self.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("traverse_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(output),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(voxels),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.constants_buffer.as_entire_binding(),
                },
            ],
        }));
    }
}

impl KernelBackend for VoxelRenderer {
    type Error = RenderError;

    fn upload_voxels(&mut self, grid: &VoxelGrid) -> Result<(), RenderError> {
        let extent = grid.texel_extent()?;
        let size = texture_size(extent);
        check_limit(
            "voxel texture",
            size,
            self.device.limits().max_texture_dimension_3d,
        )?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("voxel_bits"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: VOXEL_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            grid.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(extent.bytes_per_row()),
                rows_per_image: Some(extent.height),
            },
            size,
        );
        pop_validation_scope(&self.device)?;

        tracing::debug!(
            resolution = grid.resolution(),
            texels = extent.texel_count(),
            "voxel texture uploaded"
        );

        self.voxel_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.rebuild_bind_group();
        Ok(())
    }

    fn resize_output(&mut self, extent: Extent) -> Result<(), RenderError> {
        let size = output_size(extent);
        check_limit(
            "output image",
            size,
            self.device.limits().max_texture_dimension_2d,
        )?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("out_image"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        pop_validation_scope(&self.device)?;

        self.present.set_source(&self.device, &view);
        self.output_view = Some(view);
        self.rebuild_bind_group();

        tracing::debug!(width = extent.width(), height = extent.height(), "output image resized");
        Ok(())
    }

    fn upload_constants(&mut self, constants: &FrameConstants) -> Result<(), RenderError> {
        self.queue
            .write_buffer(&self.constants_buffer, 0, constants.as_bytes());
        Ok(())
    }

    fn dispatch(&mut self, groups: DispatchSize) -> Result<(), RenderError> {
        let bind_group = match (&self.bind_group, &self.voxel_view) {
            (Some(bind_group), _) => bind_group,
            (None, None) => return Err(RenderError::NotReady("voxel texture")),
            (None, Some(_)) => return Err(RenderError::NotReady("output image")),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("traverse_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("traverse_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups.x, groups.y, groups.z);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
