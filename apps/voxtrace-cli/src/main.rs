use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glam::Mat4;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use voxtrace_camera::VoxelCamera;
use voxtrace_common::Extent;
use voxtrace_frame::{FrameController, FrameEvent, FrameHandler, SceneConfig};
use voxtrace_grid::VoxelGrid;
use voxtrace_input::MoveKey;
use voxtrace_render::{
    BackendCall, KERNEL_WORKGROUP_SIZE, RecordingBackend, compute_group_counts,
    verify_kernel_workgroup,
};

#[derive(Parser)]
#[command(name = "voxtrace-cli", about = "Inspect voxel tracer math without a GPU")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config (JSON) used for camera and grid defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and kernel contract
    Info,
    /// Print the pixel-to-ray matrix for a viewport
    Constants {
        #[arg(long, default_value = "1280")]
        width: u32,
        #[arg(long, default_value = "720")]
        height: u32,
        /// Vertical field of view in degrees (overrides the config)
        #[arg(long)]
        fov: Option<f32>,
    },
    /// Print workgroup counts for a viewport
    Groups {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Print storage and texture layout of a voxel grid
    Grid {
        #[arg(long, default_value = "24")]
        resolution: u32,
    },
    /// Verify a kernel's declared workgroup size (bundled kernel by default)
    CheckKernel {
        #[arg(long)]
        kernel: Option<PathBuf>,
    },
    /// Run frames against a recording backend and summarize the calls
    Simulate {
        #[arg(short, long, default_value = "60")]
        ticks: u32,
        /// Movement key held for the whole run
        #[arg(long, value_enum)]
        hold: Option<HeldKey>,
        /// Seconds per tick
        #[arg(long, default_value = "0.016")]
        dt: f32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HeldKey {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl From<HeldKey> for MoveKey {
    fn from(key: HeldKey) -> Self {
        match key {
            HeldKey::Forward => MoveKey::Forward,
            HeldKey::Back => MoveKey::Back,
            HeldKey::Left => MoveKey::Left,
            HeldKey::Right => MoveKey::Right,
            HeldKey::Up => MoveKey::Up,
            HeldKey::Down => MoveKey::Down,
        }
    }
}

fn format_matrix(m: Mat4) -> String {
    // Printed row by row; the matrix itself is column-major.
    (0..4)
        .map(|r| {
            let row = m.row(r);
            format!("[{:>10.5} {:>10.5} {:>10.5} {:>10.5}]", row.x, row.y, row.z, row.w)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn constants_report(scene: &SceneConfig, extent: Extent) -> anyhow::Result<String> {
    let mut camera = VoxelCamera::new(scene.camera.position, glam::Vec3::ZERO, extent, scene.camera.fov)?;
    camera.look_at(scene.camera.focus)?;

    let (w, h) = (extent.width() as f32, extent.height() as f32);
    let mut out = format!(
        "viewport {}x{}, fov {}, eye {}\nrotation {}\npixel_to_ray:\n{}\n",
        extent.width(),
        extent.height(),
        camera.fov(),
        camera.position(),
        camera.rotation(),
        format_matrix(camera.pixel_to_ray_matrix()),
    );
    for (label, px, py) in [
        ("top-left", 0.0, 0.0),
        ("center", (w - 1.0) / 2.0, (h - 1.0) / 2.0),
        ("bottom-right", w - 1.0, h - 1.0),
    ] {
        out.push_str(&format!("ray {label:<12} {}\n", camera.ray_direction(px, py)));
    }
    Ok(out)
}

fn grid_report(resolution: u32) -> anyhow::Result<String> {
    let grid = VoxelGrid::new(resolution)?;
    let mut out = format!(
        "resolution {resolution}: {} cells, {} words, {} bytes, {} occupied\n",
        grid.cell_count(),
        grid.word_count(),
        grid.as_bytes().len(),
        grid.occupied_count(),
    );
    match grid.texel_extent() {
        Ok(t) => out.push_str(&format!(
            "texture {}x{}x{} rgba32uint ({} texels, {} bytes per row)\n",
            t.width,
            t.height,
            t.depth,
            t.texel_count(),
            t.bytes_per_row()
        )),
        Err(e) => out.push_str(&format!("texture: {e}\n")),
    }
    Ok(out)
}

struct SimulationSummary {
    ticks: u32,
    constant_uploads: usize,
    dispatches: usize,
    final_eye: glam::Vec3,
}

fn simulate(
    scene: &SceneConfig,
    ticks: u32,
    hold: Option<MoveKey>,
    dt: f32,
) -> anyhow::Result<SimulationSummary> {
    let mut controller =
        FrameController::new(scene, scene.window.extent(), RecordingBackend::new())?;
    controller.on_init()?;
    if let Some(key) = hold {
        controller.handle_event(FrameEvent::Key { key, pressed: true })?;
    }
    for _ in 0..ticks {
        controller.handle_event(FrameEvent::Tick { dt })?;
    }

    let calls = controller.backend().calls();
    Ok(SimulationSummary {
        ticks,
        constant_uploads: calls
            .iter()
            .filter(|c| matches!(c, BackendCall::UploadConstants(_)))
            .count(),
        dispatches: controller.backend().dispatches().count(),
        final_eye: controller.camera().position(),
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut scene = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("load scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("voxtrace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel workgroup: {KERNEL_WORKGROUP_SIZE}");
            println!(
                "frame constants: {} bytes",
                std::mem::size_of::<voxtrace_render::FrameConstants>()
            );
            println!(
                "scene: resolution {}, render mode {}, window {}x{}",
                scene.voxel_resolution,
                scene.render_mode,
                scene.window.width,
                scene.window.height
            );
        }
        Commands::Constants { width, height, fov } => {
            if let Some(fov) = fov {
                scene.camera.fov = fov;
            }
            print!("{}", constants_report(&scene, Extent::new(width, height))?);
        }
        Commands::Groups { width, height } => {
            let groups = compute_group_counts(
                width,
                height,
                KERNEL_WORKGROUP_SIZE.x,
                KERNEL_WORKGROUP_SIZE.y,
            );
            println!(
                "{width}x{height} at {KERNEL_WORKGROUP_SIZE}: {}x{}x{} groups ({} total)",
                groups.x,
                groups.y,
                groups.z,
                groups.total_groups()
            );
        }
        Commands::Grid { resolution } => {
            print!("{}", grid_report(resolution)?);
        }
        Commands::CheckKernel { kernel } => {
            let (name, source) = match &kernel {
                Some(path) => (
                    path.display().to_string(),
                    std::fs::read_to_string(path)
                        .with_context(|| format!("read kernel {}", path.display()))?,
                ),
                None => (
                    "bundled kernel".to_owned(),
                    voxtrace_render_wgpu::TRAVERSE_KERNEL.to_owned(),
                ),
            };
            verify_kernel_workgroup(&source, KERNEL_WORKGROUP_SIZE)
                .with_context(|| format!("{name} failed the workgroup check"))?;
            println!("{name}: workgroup size {KERNEL_WORKGROUP_SIZE} OK");
        }
        Commands::Simulate { ticks, hold, dt } => {
            let summary = simulate(&scene, ticks, hold.map(MoveKey::from), dt)?;
            println!(
                "{} ticks: {} constant uploads, {} dispatches, eye at {}",
                summary.ticks, summary.constant_uploads, summary.dispatches, summary.final_eye
            );
        }
    }

    Ok(())
}
