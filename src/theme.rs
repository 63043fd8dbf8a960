//! Theme store and color resolution
//!
//! Themes map dot-namespaced capture names (`keyword`, `variable.parameter`, ...) to
//! colors. Built-in themes are YAML documents embedded at compile time; user themes are
//! loaded from YAML or JSON files.
//!
//! Color lookup walks the namespace: `variable.parameter.special` tries
//! `variable.parameter.special`, then `variable.parameter`, then `variable`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, Result};

// Embed theme YAML files at compile time
pub const GITHUB_DARK_YAML: &str = include_str!("../themes/github-dark.yaml");
pub const GITHUB_LIGHT_YAML: &str = include_str!("../themes/github-light.yaml");
pub const GITHUB_DARK_HIGH_CONTRAST_YAML: &str =
    include_str!("../themes/github-dark-high-contrast.yaml");
pub const GITHUB_LIGHT_HIGH_CONTRAST_YAML: &str =
    include_str!("../themes/github-light-high-contrast.yaml");

/// Theme used when neither the request nor the configuration names a registered one
pub const DEFAULT_THEME_ID: &str = "github-dark";

/// A built-in theme entry
pub struct BuiltinTheme {
    /// Stable identifier (e.g. "github-dark")
    pub id: &'static str,
    /// Embedded YAML content
    pub yaml: &'static str,
}

/// Registry of all built-in themes
pub const BUILTIN_THEMES: &[BuiltinTheme] = &[
    BuiltinTheme {
        id: "github-dark",
        yaml: GITHUB_DARK_YAML,
    },
    BuiltinTheme {
        id: "github-light",
        yaml: GITHUB_LIGHT_YAML,
    },
    BuiltinTheme {
        id: "github-dark-high-contrast",
        yaml: GITHUB_DARK_HIGH_CONTRAST_YAML,
    },
    BuiltinTheme {
        id: "github-light-high-contrast",
        yaml: GITHUB_LIGHT_HIGH_CONTRAST_YAML,
    },
];

/// Color channel of a style entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Foreground,
    Background,
}

/// A single style entry: either a bare foreground color or explicit channels
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ThemeStyle {
    /// `keyword: "#ff7b72"` (foreground only)
    Color(String),
    /// `keyword: { fg: "#ff7b72", bg: "#000000" }`
    Channels {
        #[serde(default)]
        fg: Option<String>,
        #[serde(default)]
        bg: Option<String>,
    },
}

impl ThemeStyle {
    /// Color for one channel. A bare color never answers for the background.
    pub fn channel(&self, channel: Channel) -> Option<&str> {
        match (self, channel) {
            (ThemeStyle::Color(color), Channel::Foreground) => Some(color),
            (ThemeStyle::Color(_), Channel::Background) => None,
            (ThemeStyle::Channels { fg, .. }, Channel::Foreground) => fg.as_deref(),
            (ThemeStyle::Channels { bg, .. }, Channel::Background) => bg.as_deref(),
        }
    }
}

/// A theme document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeDefinition {
    /// Identifier; normalized when the theme is registered
    #[serde(default)]
    pub id: String,
    /// Display name (e.g. "GitHub Dark")
    #[serde(default)]
    pub name: Option<String>,
    pub styles: HashMap<String, ThemeStyle>,
}

impl ThemeDefinition {
    /// Create a theme from an id and a set of style entries
    pub fn new<I, K>(id: &str, styles: I) -> Self
    where
        I: IntoIterator<Item = (K, ThemeStyle)>,
        K: Into<String>,
    {
        Self {
            id: id.to_string(),
            name: None,
            styles: styles.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Load theme from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::InvalidTheme(format!("YAML parse error: {e}")))
    }

    /// Load theme from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidTheme(format!("JSON parse error: {e}")))
    }

    /// Load a theme file; `.json` files are read as JSON, everything else as YAML.
    /// A theme without an id takes the file stem.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut theme = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
        .map_err(|e| Error::InvalidTheme(format!("{}: {e}", path.display())))?;

        if theme.id.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                theme.id = stem.to_string();
            }
        }
        Ok(theme)
    }

    /// Load a built-in theme by id
    pub fn from_builtin(id: &str) -> Result<Self> {
        let entry = BUILTIN_THEMES
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::InvalidTheme(format!("unknown built-in theme: {id}")))?;
        Self::from_yaml(entry.yaml)
    }

    /// Find the style entry for `key`, trimming trailing namespace segments until one
    /// matches.
    pub fn resolve_entry(&self, key: &str) -> Option<&ThemeStyle> {
        let mut current = key;
        loop {
            if let Some(style) = self.styles.get(current) {
                return Some(style);
            }

            let dot_pos = current.rfind('.')?;
            current = &current[..dot_pos];
        }
    }

    /// Resolve the color of `key` on one channel.
    ///
    /// The cascade walks the namespace only: once the nearest entry is found, a missing
    /// channel on it yields `None` rather than consulting a parent.
    pub fn color(&self, key: &str, channel: Channel) -> Option<&str> {
        self.resolve_entry(key)?.channel(channel)
    }

    /// CSS class naming this theme in the code block
    pub fn css_class(&self) -> String {
        if self.id.is_empty() {
            return DEFAULT_THEME_ID.to_string();
        }
        self.id.split_whitespace().collect::<Vec<_>>().join("-")
    }
}

/// Normalize a theme id: lowercase, underscores become hyphens.
pub fn normalize_theme_id(id: &str) -> String {
    id.to_lowercase().replace('_', "-")
}

/// Registered themes plus the fallback chain used to pick one
#[derive(Debug, Clone)]
pub struct ThemeStore {
    themes: HashMap<String, Arc<ThemeDefinition>>,
    /// Configured default, tried before the built-in default
    default_id: String,
}

impl Default for ThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            themes: HashMap::new(),
            default_id: DEFAULT_THEME_ID.to_string(),
        }
    }

    /// Create a store holding every built-in theme
    pub fn with_builtins() -> Self {
        let mut store = Self::new();
        for builtin in BUILTIN_THEMES {
            match ThemeDefinition::from_yaml(builtin.yaml) {
                Ok(theme) => {
                    store.register_as(builtin.id, theme);
                }
                Err(e) => tracing::error!("Failed to parse built-in theme {}: {}", builtin.id, e),
            }
        }
        store
    }

    /// Register a theme under its own id, replacing any previous theme with that id.
    /// A theme without an id is registered as the built-in default.
    pub fn register(&mut self, theme: ThemeDefinition) -> String {
        let id = if theme.id.is_empty() {
            DEFAULT_THEME_ID.to_string()
        } else {
            theme.id.clone()
        };
        self.register_as(&id, theme)
    }

    /// Register a theme under an explicit name, replacing any previous theme with that id.
    /// Returns the normalized id.
    pub fn register_as(&mut self, name: &str, mut theme: ThemeDefinition) -> String {
        let id = normalize_theme_id(name);
        theme.id = id.clone();
        if self.themes.insert(id.clone(), Arc::new(theme)).is_some() {
            tracing::debug!("Replaced theme {}", id);
        }
        id
    }

    /// Set the configured default theme id
    pub fn set_default(&mut self, id: &str) {
        self.default_id = normalize_theme_id(id);
    }

    /// The configured default theme id
    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Look up a theme by exact (normalized) id
    pub fn get(&self, id: &str) -> Option<Arc<ThemeDefinition>> {
        self.themes.get(&normalize_theme_id(id)).cloned()
    }

    /// Pick a theme: requested name, then the configured default, then the built-in
    /// default. Fails only when none of them is registered.
    pub fn get_theme(&self, name: Option<&str>) -> Result<Arc<ThemeDefinition>> {
        name.and_then(|n| self.get(n))
            .or_else(|| self.get(&self.default_id))
            .or_else(|| self.get(DEFAULT_THEME_ID))
            .ok_or_else(|| Error::Configuration(DEFAULT_THEME_ID.to_string()))
    }

    /// Registered theme ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.themes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Register every `*.yaml`, `*.yml` and `*.json` theme in `dir`.
    /// Unreadable files are logged and skipped. Returns the ids registered.
    pub fn load_dir(&mut self, dir: &Path) -> Vec<String> {
        let mut loaded = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            tracing::debug!("Theme directory {} not readable", dir.display());
            return loaded;
        };

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
            })
            .collect();
        paths.sort();

        for path in paths {
            match ThemeDefinition::from_file(&path) {
                Ok(theme) => {
                    tracing::info!("Loading user theme from {}", path.display());
                    loaded.push(self.register(theme));
                }
                Err(e) => tracing::warn!("Skipping theme {}: {}", path.display(), e),
            }
        }
        loaded
    }
}
