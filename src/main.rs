//! blockview - chunked voxel structure renderer
//!
//! Builds chunk meshes for a demo structure and renders one headless frame.

mod cli;
mod demo;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, time::Instant};

use anyhow::{Context, Result};
use blockview_assets::{registry_from_file, BlockRegistry};
use blockview_render::{
    Camera, ChunkBuilder, GpuUploader, RenderContext, RenderSettings, Renderer, Resources,
};
use blockview_world::BlockSource;
use cli::CliOptions;
use glam::Vec3;
use tracing::info;

const DEFAULT_BLOCKS_PATH: &str = "config/blocks.json";

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting blockview v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let settings = load_settings(&cli);
    let registry = load_registry(cli.blocks.as_deref())?;
    let resources = Arc::new(Resources::with_default_models(registry));
    let structure = demo::demo_structure()?;

    let size = (settings.resolution.width, settings.resolution.height);
    let ctx = pollster::block_on(RenderContext::new_headless(
        size,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ))?;

    let started = Instant::now();
    let uploader = GpuUploader::new(ctx.device.clone());
    let mut builder = ChunkBuilder::new(structure, resources.clone(), settings.chunk_size, uploader)
        .context("failed to build chunk meshes")?;
    let stats = builder.chunk_stats();
    info!(
        chunks = stats.len(),
        lights = builder.emissive_lights().len(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "chunk meshes built"
    );
    if let Some(path) = &cli.metrics {
        blockview_render::write_metrics_to_file(&stats, path)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    let camera = frame_camera(&builder, &settings, ctx.aspect_ratio());
    let overlays = cli.overlays.unwrap_or(settings.overlays);
    let mut renderer = Renderer::new(ctx, settings, &resources, cli.atlas.as_deref())?;
    let report = renderer.render_to_png(&mut builder, &camera, overlays, &cli.output)?;

    info!(
        output = %cli.output.display(),
        drawn = report.entries_drawn,
        culled = report.entries_culled,
        passes = ?report.plan.passes(),
        "frame written"
    );
    Ok(())
}

fn load_settings(cli: &CliOptions) -> RenderSettings {
    let mut settings = match &cli.config {
        Some(path) => RenderSettings::load_from_path(path),
        None => RenderSettings::load(),
    };
    if cli.direct {
        settings = settings.direct();
    }
    if let Some((width, height)) = cli.resolution {
        settings.resolution.width = width;
        settings.resolution.height = height;
    }
    if cli.draw_distance.is_some() {
        settings.draw_distance = cli.draw_distance;
    }
    settings
}

/// Explicit block files must load; the default path is optional.
fn load_registry(path: Option<&Path>) -> Result<BlockRegistry> {
    if let Some(path) = path {
        return registry_from_file(path)
            .with_context(|| format!("failed to load block definitions from {}", path.display()));
    }
    let default = PathBuf::from(DEFAULT_BLOCKS_PATH);
    if !default.exists() {
        return Ok(BlockRegistry::builtin());
    }
    match registry_from_file(&default) {
        Ok(registry) => Ok(registry),
        Err(err) => {
            tracing::warn!(path = %default.display(), %err, "invalid block definitions; using builtin set");
            Ok(BlockRegistry::builtin())
        }
    }
}

fn frame_camera<S: BlockSource>(
    builder: &ChunkBuilder<S, GpuUploader>,
    settings: &RenderSettings,
    aspect: f32,
) -> Camera {
    let (min, max) = builder
        .structure()
        .bounds()
        .map(|bounds| {
            let (min, max) = bounds.corners_f32();
            (Vec3::from(min), Vec3::from(max))
        })
        .unwrap_or((Vec3::ZERO, Vec3::ONE));
    let mut camera = Camera::framing(min, max, aspect);
    camera.fov = settings.fov_degrees.to_radians();
    camera
}
