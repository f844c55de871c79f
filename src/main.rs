use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use turntable_scene::{config::AppConfig, flow, scene::SceneDescription};

/// Renders the turntable scene in a window.
#[derive(Parser, Debug)]
#[command(name = "turntable-scene", version)]
struct Cli {
    /// Configuration file (RON). Missing means defaults.
    #[arg(long, default_value = "config.ron")]
    config: PathBuf,

    /// Scene description, overrides the config.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Asset directory texture paths are resolved against, overrides the config.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Initial window width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Load and validate the scene, print a summary and exit without opening a window.
    #[arg(long)]
    check: bool,

    /// Write the effective configuration to this file and exit.
    #[arg(long)]
    write_config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(assets) = &self.assets {
            config.asset_root = assets.clone();
        }
        if let Some(scene) = &self.scene {
            config.scene = scene.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        config
    }
}

fn check(config: &AppConfig) -> anyhow::Result<()> {
    let path = config.scene_path();
    let scene = SceneDescription::load(&path)
        .with_context(|| format!("could not load the scene from {}", path.display()))?;
    let warnings = scene.validate();
    println!(
        "{}: {} parts, {} textures, {} materials, {} lights, {} warnings",
        path.display(),
        scene.parts.len(),
        scene.textures.len(),
        scene.materials.len(),
        scene.lights.len(),
        warnings.len()
    );
    for source in &scene.textures {
        let file = turntable_scene::resources::asset_path(&config.asset_root, &source.path);
        if !file.exists() {
            println!("  texture {:?}: {} is missing", source.tag, file.display());
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Warning: Could not initialize logger: {}", e);
    }

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("could not load the config from {}", cli.config.display()))?;
    let config = cli.apply(config);

    if let Some(path) = &cli.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("could not write the config to {}", path.display()))?;
        log::info!("Wrote configuration to {:?}", path);
        return Ok(());
    }
    if cli.check {
        return check(&config);
    }

    flow::run(config)
}
