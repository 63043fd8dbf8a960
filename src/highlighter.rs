//! Highlighting orchestrator
//!
//! [`Treelight`] owns the theme store and the language registry and turns
//! `(code, language)` into a themed code block:
//!
//! ```text
//! highlight(code, lang) → ThemeStore::get_theme → LanguageRegistry::load(lang)
//!                       → LanguageState::highlight(code) → render_captures → code_block
//! ```
//!
//! Language and parse failures degrade to an escaped, unhighlighted block unless
//! [`HighlightOptions::strict`] is set.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinSet;

use crate::config::TreelightConfig;
use crate::error::{Error, Result};
use crate::html::{code_block, escape_html};
use crate::syntax::{builtin, render_captures, Backend, LanguageLoader, LanguageRegistry};
use crate::theme::{Channel, ThemeDefinition, ThemeStore};

/// Reserved theme key for the block background
pub const UI_BACKGROUND: &str = "ui.background";
/// Reserved theme key for the block foreground
pub const UI_FOREGROUND: &str = "ui.foreground";

const FALLBACK_BACKGROUND: &str = "#ffffff";
const FALLBACK_FOREGROUND: &str = "#000000";

/// Per-call options for [`Treelight::highlight`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Theme id; falls back to the default theme when absent or unknown
    pub theme: Option<String>,
    /// Surface language and parse failures instead of returning plain output
    pub strict: bool,
    /// Give up parsing after this long; the attempt then counts as a parse failure
    pub timeout: Option<Duration>,
}

impl HighlightOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Block colors for a theme: `(background, foreground)`.
///
/// Each reserved key resolves through the namespace cascade (`ui.background` falls back
/// to `ui`), preferring its own channel and then the other one before the hard-coded
/// default.
fn block_colors(theme: &ThemeDefinition) -> (String, String) {
    let pick = |key: &str, primary: Channel, secondary: Channel, fallback: &str| {
        theme
            .color(key, primary)
            .or_else(|| theme.color(key, secondary))
            .unwrap_or(fallback)
            .to_string()
    };

    (
        pick(
            UI_BACKGROUND,
            Channel::Background,
            Channel::Foreground,
            FALLBACK_BACKGROUND,
        ),
        pick(
            UI_FOREGROUND,
            Channel::Foreground,
            Channel::Background,
            FALLBACK_FOREGROUND,
        ),
    )
}

/// Syntax highlighter: registered themes, registered languages and the shared backend
pub struct Treelight {
    themes: RwLock<ThemeStore>,
    languages: Arc<LanguageRegistry>,
}

impl std::fmt::Debug for Treelight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Treelight")
            .field("themes", &self.theme_ids())
            .field("languages", &self.languages)
            .finish()
    }
}

impl Default for Treelight {
    fn default() -> Self {
        Self::new()
    }
}

impl Treelight {
    /// A highlighter with the built-in themes and no languages
    pub fn new() -> Self {
        Self::with_backend(Backend::new())
    }

    /// A highlighter sharing an existing backend handle
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            themes: RwLock::new(ThemeStore::with_builtins()),
            languages: Arc::new(LanguageRegistry::new(backend)),
        }
    }

    pub fn builder() -> TreelightBuilder {
        TreelightBuilder::default()
    }

    /// Build a highlighter from user configuration.
    ///
    /// Themes in the user themes directory are registered first, then those in the
    /// configured `themes_dir`, so the latter win on id clashes.
    pub fn from_config(config: &TreelightConfig) -> Self {
        let highlighter = Self::new();
        {
            let mut themes = highlighter.themes.write().unwrap_or_else(PoisonError::into_inner);
            let dirs = crate::config_paths::themes_dir()
                .into_iter()
                .chain(config.themes_dir.clone());
            for dir in dirs {
                let loaded = themes.load_dir(&dir);
                if !loaded.is_empty() {
                    tracing::info!("Loaded {} theme(s) from {}", loaded.len(), dir.display());
                }
            }
            themes.set_default(&config.theme);
        }
        highlighter.register_builtin_languages();
        highlighter
    }

    pub fn backend(&self) -> &Backend {
        self.languages.backend()
    }

    /// Register a theme under its own id; returns the id used
    pub fn register_theme(&self, theme: ThemeDefinition) -> String {
        self.themes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(theme)
    }

    /// Register a theme under `name`, overriding the document's id
    pub fn register_theme_as(&self, name: &str, theme: ThemeDefinition) -> String {
        self.themes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_as(name, theme)
    }

    /// Set the theme used when a call names none, or names an unknown one
    pub fn set_default_theme(&self, id: &str) {
        self.themes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_default(id);
    }

    /// Resolve a theme through the fallback chain
    pub fn get_theme(&self, name: Option<&str>) -> Result<Arc<ThemeDefinition>> {
        self.themes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_theme(name)
    }

    pub fn register_language(&self, id: &str, loader: impl Into<LanguageLoader>) {
        self.languages.register(id, loader);
    }

    /// Register every grammar compiled into this build. Returns the ids registered.
    pub fn register_builtin_languages(&self) -> Vec<String> {
        builtin::all()
            .into_iter()
            .map(|definition| {
                let id = definition.id.clone();
                self.languages.register(&id, definition);
                id
            })
            .collect()
    }

    /// Load a language now instead of on first use
    pub async fn load_language(&self, id: &str) -> Result<()> {
        self.languages.load(id).await.map(|_| ())
    }

    /// Load every registered language concurrently, stopping at the first failure
    pub async fn preload(&self) -> Result<()> {
        let mut set = JoinSet::new();
        for id in self.languages.ids() {
            let registry = Arc::clone(&self.languages);
            set.spawn(async move { registry.load(&id).await.map(|_| ()) });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => result?,
                Err(e) => {
                    return Err(Error::BackendUnavailable(format!(
                        "language load task failed: {e}"
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn language_ids(&self) -> Vec<String> {
        self.languages.ids()
    }

    pub fn theme_ids(&self) -> Vec<String> {
        self.themes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids()
    }

    /// Whether `id` has been loaded and memoized
    pub fn is_loaded(&self, id: &str) -> bool {
        self.languages.is_loaded(id)
    }

    /// Highlight `code` as `language` and wrap it in a themed code block.
    ///
    /// Only a missing default theme fails in non-strict mode; every language or parse
    /// failure yields the escaped code without spans instead.
    pub async fn highlight(
        &self,
        code: &str,
        language: &str,
        options: &HighlightOptions,
    ) -> Result<String> {
        let theme = self.get_theme(options.theme.as_deref())?;
        let class = theme.css_class();
        let (background, foreground) = block_colors(&theme);

        let content = match self
            .highlight_inline(code, language, &theme, options.timeout)
            .await
        {
            Ok(content) => content,
            Err(e) if options.strict || !e.is_recoverable() => return Err(e),
            Err(e) => {
                tracing::warn!("Highlighting {} failed, emitting plain code: {}", language, e);
                escape_html(code)
            }
        };

        Ok(code_block(&content, &class, &background, &foreground))
    }

    /// Inline span markup for `code`, without the surrounding block
    pub async fn highlight_inline(
        &self,
        code: &str,
        language: &str,
        theme: &ThemeDefinition,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let state = self.languages.load(language).await?;
        let captures = state.highlight_within(code, timeout)?;
        tracing::trace!("{} captures for {} bytes of {}", captures.len(), code.len(), language);
        Ok(render_captures(code, &captures, theme))
    }
}

/// Collects themes and languages for a [`Treelight`]
#[derive(Default)]
pub struct TreelightBuilder {
    backend: Option<Backend>,
    themes: Vec<(Option<String>, ThemeDefinition)>,
    languages: Vec<(String, LanguageLoader)>,
    default_theme: Option<String>,
    builtin_languages: bool,
    theme_dirs: Vec<PathBuf>,
}

impl TreelightBuilder {
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn theme(mut self, theme: ThemeDefinition) -> Self {
        self.themes.push((None, theme));
        self
    }

    pub fn theme_as(mut self, name: &str, theme: ThemeDefinition) -> Self {
        self.themes.push((Some(name.to_string()), theme));
        self
    }

    pub fn theme_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.theme_dirs.push(dir.into());
        self
    }

    pub fn default_theme(mut self, id: &str) -> Self {
        self.default_theme = Some(id.to_string());
        self
    }

    pub fn language(mut self, id: &str, loader: impl Into<LanguageLoader>) -> Self {
        self.languages.push((id.to_string(), loader.into()));
        self
    }

    pub fn builtin_languages(mut self) -> Self {
        self.builtin_languages = true;
        self
    }

    pub fn build(self) -> Treelight {
        let highlighter = Treelight::with_backend(self.backend.unwrap_or_default());
        {
            let mut themes = highlighter.themes.write().unwrap_or_else(PoisonError::into_inner);
            for dir in &self.theme_dirs {
                themes.load_dir(dir);
            }
            for (name, theme) in self.themes {
                match name {
                    Some(name) => themes.register_as(&name, theme),
                    None => themes.register(theme),
                };
            }
            if let Some(id) = &self.default_theme {
                themes.set_default(id);
            }
        }

        if self.builtin_languages {
            highlighter.register_builtin_languages();
        }
        for (id, loader) in self.languages {
            highlighter.register_language(&id, loader);
        }
        highlighter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{LanguageDefinition, LanguageQueries};
    use crate::theme::ThemeStyle;

    #[test]
    fn test_block_colors_prefer_own_channel() {
        let theme = ThemeDefinition::new(
            "t",
            [
                (
                    UI_BACKGROUND,
                    ThemeStyle::Channels {
                        fg: Some("#111".into()),
                        bg: Some("#222".into()),
                    },
                ),
                (UI_FOREGROUND, ThemeStyle::Color("#333".into())),
            ],
        );
        assert_eq!(block_colors(&theme), ("#222".to_string(), "#333".to_string()));
    }

    #[test]
    fn test_block_colors_cross_channel_fallback() {
        let theme = ThemeDefinition::new(
            "t",
            [
                (UI_BACKGROUND, ThemeStyle::Color("#abc".into())),
                (
                    UI_FOREGROUND,
                    ThemeStyle::Channels {
                        fg: None,
                        bg: Some("#def".into()),
                    },
                ),
            ],
        );
        assert_eq!(block_colors(&theme), ("#abc".to_string(), "#def".to_string()));
    }

    #[test]
    fn test_block_colors_cascade_to_namespace_root() {
        let theme = ThemeDefinition::new(
            "t",
            [(
                "ui",
                ThemeStyle::Channels {
                    fg: Some("#111".into()),
                    bg: Some("#222".into()),
                },
            )],
        );
        assert_eq!(block_colors(&theme), ("#222".to_string(), "#111".to_string()));
    }

    #[test]
    fn test_block_colors_nearest_entry_wins() {
        let theme = ThemeDefinition::new(
            "t",
            [
                ("ui", ThemeStyle::Color("#111".into())),
                (
                    UI_BACKGROUND,
                    ThemeStyle::Channels {
                        fg: None,
                        bg: Some("#333".into()),
                    },
                ),
            ],
        );
        assert_eq!(block_colors(&theme), ("#333".to_string(), "#111".to_string()));
    }

    #[test]
    fn test_block_colors_default_black_on_white() {
        let theme = ThemeDefinition::new("t", Vec::<(String, ThemeStyle)>::new());
        assert_eq!(
            block_colors(&theme),
            (FALLBACK_BACKGROUND.to_string(), FALLBACK_FOREGROUND.to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_language_degrades() {
        let highlighter = Treelight::new();
        let html = highlighter
            .highlight("a < b", "nope", &HighlightOptions::new())
            .await
            .unwrap();
        assert!(html.contains("<code>a &lt; b</code>"));
        assert!(!html.contains("<span"));
        assert_eq!(highlighter.backend().init_count(), 0);
    }

    #[tokio::test]
    async fn test_strict_surfaces_invalid_definition() {
        let highlighter = Treelight::builder()
            .language(
                "toy",
                LanguageDefinition {
                    id: "toy".into(),
                    grammar: None,
                    queries: LanguageQueries::default(),
                },
            )
            .build();
        let err = highlighter
            .highlight("x", "toy", &HighlightOptions::new().strict(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidLanguageDefinition { .. }));
    }

    #[tokio::test]
    async fn test_missing_default_theme_always_fails() {
        let highlighter = Treelight::new();
        highlighter.set_default_theme("missing");
        // Built-in default still present, so this resolves
        assert!(highlighter.get_theme(Some("also-missing")).is_ok());

        let empty = Treelight {
            themes: RwLock::new(ThemeStore::new()),
            languages: Arc::new(LanguageRegistry::default()),
        };
        let err = empty
            .highlight("x", "go", &HighlightOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_builder_registers_themes_and_default() {
        let highlighter = Treelight::builder()
            .theme_as(
                "My Theme",
                ThemeDefinition::new("ignored", [("keyword", ThemeStyle::Color("#f00".into()))]),
            )
            .default_theme("my theme")
            .build();
        assert!(highlighter.theme_ids().contains(&"my theme".to_string()));

        let html = highlighter
            .highlight("x", "none", &HighlightOptions::new())
            .await
            .unwrap();
        assert!(html.starts_with(r#"<pre class="treelight my-theme""#));
        assert!(html.contains(r#"style="background-color: #ffffff; color: #000000""#));
    }

    #[tokio::test]
    async fn test_requested_theme_overrides_default() {
        let highlighter = Treelight::new();
        let html = highlighter
            .highlight("x", "none", &HighlightOptions::new().theme("github-light"))
            .await
            .unwrap();
        assert!(html.starts_with(r#"<pre class="treelight github-light""#));
    }

    #[cfg(feature = "go")]
    #[tokio::test]
    async fn test_parse_failure_degrades_unless_strict() {
        let highlighter = Treelight::builder().builtin_languages().build();
        let code = "x := 1\n".repeat(20_000);
        let options = HighlightOptions::new().timeout(Duration::ZERO);

        let html = highlighter.highlight(&code, "go", &options).await.unwrap();
        assert!(!html.contains("<span"));
        assert!(html.ends_with(&format!("<code>{code}</code></pre>")));

        let err = highlighter
            .highlight(&code, "go", &options.clone().strict(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParseFailure(ref id) if id == "go"));

        // Same language still highlights without a deadline
        let html = highlighter
            .highlight("x := 1", "go", &HighlightOptions::new().strict(true))
            .await
            .unwrap();
        assert!(html.contains("<span"));
    }

    #[tokio::test]
    async fn test_preload_with_nothing_registered() {
        let highlighter = Treelight::new();
        highlighter.preload().await.unwrap();
        assert_eq!(highlighter.backend().init_count(), 0);
    }
}
