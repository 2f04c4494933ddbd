use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use voxtrace_common::Extent;
use voxtrace_frame::{FrameController, FrameEvent, FrameHandler, SceneConfig};
use voxtrace_input::MoveKey;
use voxtrace_render_wgpu::VoxelRenderer;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "voxtrace-desktop", about = "Real-time voxel ray tracer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replacement WGSL traversal kernel
    #[arg(long)]
    kernel: Option<PathBuf>,
}

fn move_key(code: KeyCode) -> Option<MoveKey> {
    match code {
        KeyCode::KeyW => Some(MoveKey::Forward),
        KeyCode::KeyS => Some(MoveKey::Back),
        KeyCode::KeyA => Some(MoveKey::Left),
        KeyCode::KeyD => Some(MoveKey::Right),
        KeyCode::KeyE => Some(MoveKey::Up),
        KeyCode::KeyQ => Some(MoveKey::Down),
        _ => None,
    }
}

/// The kernel writes display-ready unorm values, so a non-sRGB surface keeps
/// the blit from gamma-encoding them a second time.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

/// Everything that exists once the window is up.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    controller: FrameController<VoxelRenderer>,
}

impl Gpu {
    fn reconfigure(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface
            .configure(self.controller.backend().device(), &self.config);
    }

    fn redraw(&mut self, dt: f32) -> Result<()> {
        self.controller.handle_event(FrameEvent::Tick { dt })?;

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (w, h) = (self.config.width, self.config.height);
                self.reconfigure(w, h);
                return Ok(());
            }
            Err(e) => return Err(e).context("acquire surface texture"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.controller.backend().present(&view)?;
        output.present();
        Ok(())
    }
}

struct App {
    scene: SceneConfig,
    kernel: Option<String>,
    gpu: Option<Gpu>,
    last_frame: Instant,
}

impl App {
    fn new(scene: SceneConfig, kernel: Option<String>) -> Self {
        Self {
            scene,
            kernel,
            gpu: None,
            last_frame: Instant::now(),
        }
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title(self.scene.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.scene.window.width,
                self.scene.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("voxtrace_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let surface_format =
            pick_surface_format(&caps.formats).context("surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            adapter = %adapter.get_info().name,
            "GPU initialized"
        );

        let renderer = VoxelRenderer::new(device, queue, surface_format, self.kernel.as_deref())?;
        let extent = Extent::new(size.width, size.height);
        let mut controller = FrameController::new(&self.scene, extent, renderer)?;
        controller.on_init()?;

        Ok(Gpu {
            window,
            surface,
            config,
            controller,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => {
                self.gpu = Some(gpu);
                self.last_frame = Instant::now();
            }
            Err(e) => {
                tracing::error!("scene setup failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => {
                gpu.reconfigure(size.width, size.height);
                gpu.controller
                    .handle_event(FrameEvent::Resize {
                        width: size.width,
                        height: size.height,
                    })
                    .map_err(anyhow::Error::from)
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state == ElementState::Pressed {
                    event_loop.exit();
                }
                match move_key(code) {
                    Some(key) => gpu
                        .controller
                        .handle_event(FrameEvent::Key {
                            key,
                            pressed: state == ElementState::Pressed,
                        })
                        .map_err(anyhow::Error::from),
                    None => Ok(()),
                }
            }
            WindowEvent::Focused(false) => gpu
                .controller
                .handle_event(FrameEvent::FocusLost)
                .map_err(anyhow::Error::from),
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;
                gpu.redraw(dt)
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::error!("frame failed: {e:#}");
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("voxtrace-desktop starting");

    let scene = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("load scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    let kernel = cli
        .kernel
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("read kernel {}", path.display()))
        })
        .transpose()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene, kernel);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map_to_camera_axes() {
        assert_eq!(move_key(KeyCode::KeyW), Some(MoveKey::Forward));
        assert_eq!(move_key(KeyCode::KeyS), Some(MoveKey::Back));
        assert_eq!(move_key(KeyCode::KeyA), Some(MoveKey::Left));
        assert_eq!(move_key(KeyCode::KeyD), Some(MoveKey::Right));
        assert_eq!(move_key(KeyCode::KeyE), Some(MoveKey::Up));
        assert_eq!(move_key(KeyCode::KeyQ), Some(MoveKey::Down));
        assert_eq!(move_key(KeyCode::Space), None);
    }

    #[test]
    fn surface_prefers_linear_format() {
        use wgpu::TextureFormat::{Bgra8Unorm, Bgra8UnormSrgb, Rgba8UnormSrgb};
        assert_eq!(pick_surface_format(&[Bgra8UnormSrgb, Bgra8Unorm]), Some(Bgra8Unorm));
        assert_eq!(pick_surface_format(&[Rgba8UnormSrgb]), Some(Rgba8UnormSrgb));
        assert_eq!(pick_surface_format(&[]), None);
    }

    #[test]
    fn cli_accepts_config_and_kernel() {
        let cli = Cli::parse_from(["voxtrace-desktop", "-v", "--config", "scene.json", "--kernel", "k.wgsl"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("scene.json")));
        assert_eq!(cli.kernel, Some(PathBuf::from("k.wgsl")));
    }
}
