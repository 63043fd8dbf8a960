//! Syntax highlighting module
//!
//! Provides tree-sitter based highlighting with:
//! - Language loaders resolved lazily and memoized per id
//! - A shared parsing backend started exactly once
//! - Capture extraction and capture-to-markup rendering
//!
//! ## Architecture
//!
//! ```text
//! LanguageRegistry::load(id) → LanguageLoader::resolve → Backend::compile_grammar
//!                            → LanguageState { parser, highlight query } (memoized)
//! LanguageState::highlight(source) → Vec<Capture> → render_captures → inline markup
//! ```

mod highlights;
mod languages;
mod parser;
mod registry;
mod render;

pub use highlights::{class_name_for, Capture};
pub use languages::{
    builtin, decode_embedded, fetch_grammar, Grammar, LanguageDefinition, LanguageLoader,
    LanguageManifest, LanguageQueries, LoaderFuture,
};
pub use parser::{Backend, CompiledGrammar, LanguageState};
pub use registry::LanguageRegistry;
pub use render::render_captures;
