//! # Artisan
//!
//! Loads recipe files and resolves craft queries.
//!
//! ```text
//! artisan [config.toml] [shaped|shapeless <grid>] [owner=<name>]
//! ```
//!
//! Without a query and with `hot_reload` set, keeps running and reloads the
//! recipe directory whenever its files change.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use artisan_engine::{CraftQuery, EngineConfig, RecipeLoader, Registry};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How often the recipe directory is scanned for changes.
const HOT_RELOAD_INTERVAL: Duration = Duration::from_secs(1);

/// Main entry point.
fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = if args.first().is_some_and(|arg| arg.ends_with(".toml")) {
        PathBuf::from(args.remove(0))
    } else {
        EngineConfig::config_path()
    };

    let mut config = EngineConfig::load_from(&config_path);
    config.validate();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(config.log_directive.parse()?))
        .init();

    info!("Artisan starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if !config_path.exists() {
        if let Err(e) = config.save_to(&config_path) {
            warn!("Failed to write default config: {e}");
        }
    }

    let registry = Registry::new();
    let mut loader = RecipeLoader::from_config(&config);
    loader.load_all(&registry)?;
    info!("Registry: {:?}", registry.stats());

    if !args.is_empty() {
        let query = CraftQuery::parse(&args)?;
        match query.resolve(&registry) {
            Some(output) => println!("{output}"),
            None => println!("No matching recipe"),
        }
        return Ok(());
    }

    if config.hot_reload {
        info!("Watching {:?} for recipe changes", config.recipe_dir);
        loop {
            thread::sleep(HOT_RELOAD_INTERVAL);
            if loader.check_hot_reload(&registry) {
                info!("Registry: {:?}", registry.stats());
            }
        }
    }

    Ok(())
}
