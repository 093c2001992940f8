//! Scene viewer
//!
//! Loads a scene file and renders a fixed number of frames on the headless
//! device, logging what each frame drew.
//!
//! ```text
//! scene_viewer [SCENE] [--config engine.toml] [--frames N] [--dt SECONDS]
//! ```

use std::path::PathBuf;

use clap::Parser;
use deferred_engine::config::{Config, EngineConfig};
use deferred_engine::foundation::logging;
use deferred_engine::render::HeadlessDevice;
use deferred_engine::{Engine, EngineError};
use thiserror::Error;

#[derive(Error, Debug)]
enum ViewerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Render a scene on the headless device and report what each frame drew
#[derive(Parser, Debug)]
#[command(name = "scene_viewer", version)]
struct Options {
    /// Scene file; defaults to scenes/demo.ron under the asset directory
    scene: Option<PathBuf>,

    /// Engine settings file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of frames to render
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Seconds per frame
    #[arg(long, value_name = "SECONDS", default_value_t = 1.0 / 60.0)]
    dt: f32,
}

fn run(options: Options) -> Result<(), ViewerError> {
    let config = match &options.config {
        Some(path) => EngineConfig::load_from_file(path).map_err(EngineError::from)?,
        None => EngineConfig::default(),
    };
    let scene = options
        .scene
        .unwrap_or_else(|| PathBuf::from(&config.asset_dir).join("scenes").join("demo.ron"));

    let mut engine = Engine::new(config, HeadlessDevice::new());
    engine.init()?;
    let loaded = engine.load_scene(&scene)?;
    engine.late_init()?;
    log::info!(
        "Scene '{}' ready: {} entities, {} lights, {} cameras",
        loaded.name,
        loaded.entities.len(),
        loaded.lights.len(),
        loaded.cameras.len()
    );

    let mut total_drawn = 0;
    let mut total_culled = 0;
    for frame in 0..options.frames {
        let stats = engine.update(options.dt)?;
        total_drawn += stats.meshes_drawn;
        total_culled += stats.meshes_culled;
        log::debug!(
            "Frame {}: {} drawn, {} culled, {} light volumes, {} shadow maps",
            frame,
            stats.meshes_drawn,
            stats.meshes_culled,
            stats.light_volumes,
            stats.shadow_maps
        );
    }

    log::info!(
        "Rendered {} frames ({} draw calls recorded): {} meshes drawn, {} culled",
        options.frames,
        engine.device().draw_count(),
        total_drawn,
        total_culled
    );
    engine.shutdown();
    Ok(())
}

fn main() {
    logging::init_with_level(log::LevelFilter::Info);

    if let Err(e) = run(Options::parse()) {
        log::error!("Scene viewer failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_without_arguments() {
        let options = Options::try_parse_from(["scene_viewer"]).unwrap();
        assert!(options.scene.is_none());
        assert!(options.config.is_none());
        assert_eq!(options.frames, 120);
        assert_relative_eq!(options.dt, 1.0 / 60.0);
    }

    #[test]
    fn test_flags_and_scene_path() {
        let options = Options::try_parse_from([
            "scene_viewer",
            "assets/scenes/hall.ron",
            "--config",
            "engine.toml",
            "--frames",
            "10",
            "--dt",
            "0.05",
        ])
        .unwrap();
        assert_eq!(options.scene, Some(PathBuf::from("assets/scenes/hall.ron")));
        assert_eq!(options.config, Some(PathBuf::from("engine.toml")));
        assert_eq!(options.frames, 10);
        assert_relative_eq!(options.dt, 0.05);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(Options::try_parse_from(["scene_viewer", "--frames", "many"]).is_err());
        assert!(Options::try_parse_from(["scene_viewer", "--dt"]).is_err());
        assert!(Options::try_parse_from(["scene_viewer", "--zoom", "2"]).is_err());
    }
}
