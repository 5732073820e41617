use std::path::PathBuf;

use clap::Parser;
use scene_ngin::{
    EngineConfig,
    logging::{LoggingConfig, init_logging},
    scenes::SceneKind,
};

/// Renders one of the bundled scenes in a window.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[arg(value_enum, default_value_t = SceneKind::Gallery)]
    scene: SceneKind,

    /// TOML engine configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding `shaders/` and `textures/`. Overrides the config.
    #[arg(long)]
    assets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(assets) = cli.assets {
        config.asset_root = assets;
    }
    init_logging(LoggingConfig {
        filter: config.log_filter.clone(),
        ..Default::default()
    });
    log::info!("Starting scene {:?}", cli.scene);
    scene_ngin::host::run(cli.scene.build(), config)
}
