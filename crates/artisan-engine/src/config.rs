//! Engine configuration.
//!
//! Controls where recipe files live, hot reloading, logging and which
//! recipe files are accepted. Configuration can be loaded from and saved
//! to a TOML file.

use artisan_common::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::recipe_loader::DEFAULT_RECIPE_PATH;

/// Configuration file name.
const CONFIG_FILE: &str = "artisan.toml";

/// Log directive used when none is configured.
pub const DEFAULT_LOG_DIRECTIVE: &str = "artisan=info";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Configuration format version
    pub version: String,

    // === Recipes ===
    /// Directory scanned for `*.toml` recipe files
    pub recipe_dir: PathBuf,
    /// Keep running and reload recipes when files in `recipe_dir` change
    pub hot_reload: bool,
    /// Accept recipe files that declare no owner
    pub allow_ownerless: bool,

    // === Logging ===
    /// Default tracing directive, extended by `RUST_LOG`
    pub log_directive: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: SchemaVersion::ENGINE_CONFIG.to_string(),
            recipe_dir: PathBuf::from(DEFAULT_RECIPE_PATH),
            hot_reload: false,
            allow_ownerless: true,
            log_directive: DEFAULT_LOG_DIRECTIVE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut file| file.read_to_string(&mut contents)) {
            warn!("Failed to read config file: {e}");
            return Self::default();
        }

        let config: Self = match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                return Self::default();
            },
        };

        let readable = config
            .version
            .parse::<SchemaVersion>()
            .and_then(|version| SchemaVersion::ENGINE_CONFIG.ensure_readable(&version));
        if let Err(e) = readable {
            warn!("Ignoring config file {}: {e}", path.display());
            return Self::default();
        }

        info!("Loaded config from {}", path.display());
        config
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        // Try to use standard config directory
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("artisan").join(CONFIG_FILE)
        } else {
            // Fall back to current directory
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Normalize configuration values.
    pub fn validate(&mut self) {
        let directive = self.log_directive.trim();
        self.log_directive = if directive.is_empty() {
            DEFAULT_LOG_DIRECTIVE.to_string()
        } else {
            directive.to_string()
        };

        if self.recipe_dir.as_os_str().is_empty() {
            self.recipe_dir = PathBuf::from(DEFAULT_RECIPE_PATH);
        }
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
