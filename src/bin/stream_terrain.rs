//! Headless streaming demo: walks a viewer across an fBm height field.
//!
//! Usage: cargo run --release --bin stream_terrain -- [OPTIONS]
//!
//! Options:
//!   --steps <N>       Frames to simulate (default: 600)
//!   --speed <U>       World units moved per frame (default: 8.0)
//!   --seed <SEED>     Noise seed (default: 12345)
//!   --scale <SCALE>   Noise feature size in chunk-space units (default: 300.0)
//!   --config <PATH>   Streamer config JSON (default: built-in)
//!   --save-config <PATH>  Write the effective config and exit

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use terrastream::core::{StreamerConfig, logging};
use terrastream::streaming::{ChunkStreamer, GridHeightProvider, ThreadedMeshBuilder, WorkerPool};

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> terrastream::core::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let steps = parse_usize_arg(&args, "--steps").unwrap_or(600);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(8.0);
    let seed = parse_u32_arg(&args, "--seed").unwrap_or(12345);
    let scale = parse_f32_arg(&args, "--scale").unwrap_or(300.0);

    let config = match parse_str_arg(&args, "--config") {
        Some(path) => StreamerConfig::load(&PathBuf::from(path))?,
        None => StreamerConfig::default(),
    };
    if let Some(path) = parse_str_arg(&args, "--save-config") {
        config.save(&PathBuf::from(&path))?;
        log::info!("Wrote config to {}", path);
        return Ok(());
    }

    let noise = Fbm::<Perlin>::new(seed)
        .set_octaves(5)
        .set_persistence(0.5)
        .set_lacunarity(2.0);
    let source = move |p: Vec2| {
        let value = noise.get([(p.x / scale) as f64, (p.y / scale) as f64]);
        ((value + 1.0) * 0.5) as f32
    };

    let pool = Arc::new(WorkerPool::new(config.worker_threads)?);
    let heights = GridHeightProvider::new(Arc::clone(&pool), source);
    let meshes = ThreadedMeshBuilder::new(Arc::clone(&pool), &config);
    let mut streamer = ChunkStreamer::new(config, heights, meshes)?;

    let start = Instant::now();
    let mut position = Vec2::ZERO;
    for step in 0..steps {
        let t = step as f32 * 0.01;
        position += Vec2::new(1.0, t.sin() * 0.5).normalize() * speed;
        streamer.update(position);

        if step % 100 == 0 {
            log_progress(&streamer, step);
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    // Let in-flight work land before the final report
    let deadline = Instant::now() + Duration::from_secs(30);
    while !pool.is_idle() && Instant::now() < deadline {
        streamer.process_completions();
        std::thread::sleep(Duration::from_millis(10));
    }
    streamer.process_completions();

    log_progress(&streamer, steps);
    let triangles: usize = streamer
        .visible_chunks()
        .filter_map(|c| c.current_display_mesh())
        .map(|m| m.triangle_count())
        .sum();
    log::info!(
        "Done in {:.1}s: {} chunks, {} visible, {} triangles on screen",
        start.elapsed().as_secs_f32(),
        streamer.chunk_count(),
        streamer.visible_chunk_count(),
        triangles
    );
    Ok(())
}

fn log_progress(streamer: &ChunkStreamer, step: usize) {
    let stats = streamer.stats();
    log::info!(
        "step {}: viewer chunk {}, {} visible, {} heights, {}/{} meshes built, {} failed, {} stale",
        step,
        streamer.viewer_chunk_coord(),
        streamer.visible_chunk_count(),
        stats.height_requests,
        stats.meshes_built,
        stats.mesh_requests,
        stats.build_failures,
        stats.stale_results
    );
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
