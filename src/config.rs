//! Highlighter configuration
//!
//! Stores user preferences in `~/.config/treelight/config.yaml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::theme::DEFAULT_THEME_ID;

/// Configuration read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreelightConfig {
    /// Default theme id (e.g., "github-dark", "github-light")
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Surface language and parse failures instead of printing plain code
    #[serde(default)]
    pub strict: bool,

    /// Extra directory of theme files, read after `~/.config/treelight/themes/`
    #[serde(default)]
    pub themes_dir: Option<PathBuf>,
}

fn default_theme() -> String {
    DEFAULT_THEME_ID.to_string()
}

impl Default for TreelightConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            strict: false,
            themes_dir: None,
        }
    }
}

impl TreelightConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Self::default()
        })
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
