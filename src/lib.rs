//! Treelight - tree-sitter syntax highlighting to HTML
//!
//! Parses source code with tree-sitter, runs a language's highlight query and renders
//! the captures as nested, themed `<span>` elements inside a `<pre><code>` block.
//!
//! ```no_run
//! # async fn demo() -> treelight::Result<()> {
//! use treelight::{HighlightOptions, Treelight};
//!
//! let highlighter = Treelight::builder().builtin_languages().build();
//! let html = highlighter
//!     .highlight("x := 1", "go", &HighlightOptions::new().theme("github-light"))
//!     .await?;
//! # let _ = html;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod config_paths;
pub mod error;
pub mod highlighter;
pub mod html;
pub mod syntax;
pub mod theme;
pub mod tracing;

// Re-export commonly used types
pub use config::TreelightConfig;
pub use error::{Error, Result};
pub use highlighter::{HighlightOptions, Treelight, TreelightBuilder};
pub use html::escape_html;
pub use syntax::{Capture, Grammar, LanguageDefinition, LanguageLoader, LanguageQueries};
pub use theme::{ThemeDefinition, ThemeStyle};
