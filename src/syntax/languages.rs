//! Language definitions and loaders
//!
//! A language is registered as a [`LanguageLoader`]: a ready definition, a factory, or
//! an async factory. All three resolve to a [`LanguageDefinition`] carrying the grammar
//! and its highlight query.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine as _;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Where a grammar comes from
#[derive(Clone)]
pub enum Grammar {
    /// Grammar linked into the binary (e.g. `tree_sitter_go::LANGUAGE.into()`)
    Native(tree_sitter::Language),
    /// Compiled grammar artifact (wasm)
    Wasm(Arc<[u8]>),
    /// Base64 text of a grammar artifact, optionally as a `data:` URI
    Embedded(String),
    /// URL to download the grammar artifact from
    Url(String),
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grammar::Native(language) => f
                .debug_tuple("Native")
                .field(&language.abi_version())
                .finish(),
            Grammar::Wasm(bytes) => write!(f, "Wasm({} bytes)", bytes.len()),
            Grammar::Embedded(text) => write!(f, "Embedded({} chars)", text.len()),
            Grammar::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

/// Decode an embedded grammar: base64 text, with or without a `data:...;base64,` prefix.
pub fn decode_embedded(text: &str) -> Result<Vec<u8>> {
    let payload = match text.strip_prefix("data:") {
        Some(uri) => uri.split_once(',').map(|(_, data)| data).unwrap_or(uri),
        None => text,
    };
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if payload.is_empty() {
        return Err(Error::BackendUnavailable(
            "embedded grammar is empty".to_string(),
        ));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::BackendUnavailable(format!("cannot decode embedded grammar: {e}")))
}

/// Download a grammar artifact. Runs the blocking request off the async executor.
#[cfg(feature = "fetch")]
pub async fn fetch_grammar(url: &str) -> Result<Vec<u8>> {
    use std::io::Read;

    let url = url.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Downloading grammar from {}", url);
        let response = ureq::get(&url)
            .call()
            .map_err(|e| Error::BackendUnavailable(format!("failed to download {url}: {e}")))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| Error::BackendUnavailable(format!("failed to read {url}: {e}")))?;
        Ok(bytes)
    })
    .await
    .map_err(|e| Error::BackendUnavailable(format!("grammar download task failed: {e}")))?
}

#[cfg(not(feature = "fetch"))]
pub async fn fetch_grammar(url: &str) -> Result<Vec<u8>> {
    Err(Error::BackendUnavailable(format!(
        "cannot download {url}: built without the `fetch` feature"
    )))
}

/// Query sources for a language
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageQueries {
    /// Capture patterns for highlighting; required to load the language
    #[serde(default)]
    pub highlights: Option<String>,
    #[serde(default)]
    pub injections: Option<String>,
    /// Reserved; not used for rendering
    #[serde(default)]
    pub locals: Option<String>,
}

impl LanguageQueries {
    pub fn highlights(highlights: impl Into<String>) -> Self {
        Self {
            highlights: Some(highlights.into()),
            ..Self::default()
        }
    }
}

/// Everything needed to build a language's parser and highlight query
#[derive(Debug, Clone)]
pub struct LanguageDefinition {
    pub id: String,
    pub grammar: Option<Grammar>,
    pub queries: LanguageQueries,
}

/// Serialized form of a language definition (YAML or JSON)
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageManifest {
    pub id: String,
    /// Base64 grammar artifact
    #[serde(default)]
    pub wasm: Option<String>,
    #[serde(default)]
    pub wasm_url: Option<String>,
    #[serde(default)]
    pub queries: LanguageQueries,
}

impl LanguageDefinition {
    /// Definition for a grammar linked into the binary
    pub fn native(id: &str, language: tree_sitter::Language, highlights: &str) -> Self {
        Self {
            id: id.to_string(),
            grammar: Some(Grammar::Native(language)),
            queries: LanguageQueries::highlights(highlights),
        }
    }

    pub fn from_manifest(manifest: LanguageManifest) -> Self {
        let grammar = manifest
            .wasm
            .map(Grammar::Embedded)
            .or(manifest.wasm_url.map(Grammar::Url));
        Self {
            id: manifest.id,
            grammar,
            queries: manifest.queries,
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: LanguageManifest = serde_yaml::from_str(yaml)
            .map_err(|e| Error::invalid_language("<manifest>", format!("YAML parse error: {e}")))?;
        Ok(Self::from_manifest(manifest))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: LanguageManifest = serde_json::from_str(json)
            .map_err(|e| Error::invalid_language("<manifest>", format!("JSON parse error: {e}")))?;
        Ok(Self::from_manifest(manifest))
    }

    /// Load a manifest file; `.json` files are read as JSON, everything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// The highlight query, or `InvalidLanguageDefinition` when it is missing
    pub fn highlight_query(&self) -> Result<&str> {
        match self.queries.highlights.as_deref() {
            Some(query) if !query.trim().is_empty() => Ok(query),
            _ => Err(Error::invalid_language(&self.id, "missing highlights query")),
        }
    }
}

/// Future returned by async language factories
pub type LoaderFuture = Pin<Box<dyn Future<Output = Result<LanguageDefinition>> + Send>>;

type SyncFactory = dyn Fn() -> Result<LanguageDefinition> + Send + Sync;
type AsyncFactory = dyn Fn() -> LoaderFuture + Send + Sync;

/// How a registered language produces its definition
#[derive(Clone)]
pub enum LanguageLoader {
    Value(LanguageDefinition),
    Factory(Arc<SyncFactory>),
    AsyncFactory(Arc<AsyncFactory>),
}

impl LanguageLoader {
    /// Loader backed by a synchronous factory
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn() -> Result<LanguageDefinition> + Send + Sync + 'static,
    {
        LanguageLoader::Factory(Arc::new(factory))
    }

    /// Loader backed by an async factory
    pub fn from_async<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<LanguageDefinition>> + Send + 'static,
    {
        LanguageLoader::AsyncFactory(Arc::new(move || Box::pin(factory())))
    }

    /// Produce the definition, running the factory if there is one
    pub async fn resolve(&self) -> Result<LanguageDefinition> {
        match self {
            LanguageLoader::Value(definition) => Ok(definition.clone()),
            LanguageLoader::Factory(factory) => factory(),
            LanguageLoader::AsyncFactory(factory) => factory().await,
        }
    }
}

impl From<LanguageDefinition> for LanguageLoader {
    fn from(definition: LanguageDefinition) -> Self {
        LanguageLoader::Value(definition)
    }
}

impl fmt::Debug for LanguageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageLoader::Value(definition) => {
                f.debug_tuple("Value").field(&definition.id).finish()
            }
            LanguageLoader::Factory(_) => f.write_str("Factory"),
            LanguageLoader::AsyncFactory(_) => f.write_str("AsyncFactory"),
        }
    }
}

/// Grammars linked into the binary, one cargo feature each
pub mod builtin {
    #[allow(unused_imports)]
    use super::{LanguageDefinition, LanguageQueries};

    /// Concatenate query sources, most specific first
    #[allow(dead_code)]
    fn layered(sources: &[&str]) -> String {
        sources.join("\n")
    }

    #[cfg(feature = "go")]
    pub fn go() -> LanguageDefinition {
        LanguageDefinition::native(
            "go",
            tree_sitter_go::LANGUAGE.into(),
            tree_sitter_go::HIGHLIGHTS_QUERY,
        )
    }

    #[cfg(feature = "rust")]
    pub fn rust() -> LanguageDefinition {
        LanguageDefinition::native(
            "rust",
            tree_sitter_rust::LANGUAGE.into(),
            tree_sitter_rust::HIGHLIGHTS_QUERY,
        )
    }

    #[cfg(feature = "python")]
    pub fn python() -> LanguageDefinition {
        LanguageDefinition::native(
            "python",
            tree_sitter_python::LANGUAGE.into(),
            tree_sitter_python::HIGHLIGHTS_QUERY,
        )
    }

    #[cfg(feature = "java")]
    pub fn java() -> LanguageDefinition {
        LanguageDefinition::native(
            "java",
            tree_sitter_java::LANGUAGE.into(),
            tree_sitter_java::HIGHLIGHTS_QUERY,
        )
    }

    // C, C++ and Bash export HIGHLIGHT_QUERY (singular)
    #[cfg(feature = "c")]
    pub fn c() -> LanguageDefinition {
        LanguageDefinition::native(
            "c",
            tree_sitter_c::LANGUAGE.into(),
            tree_sitter_c::HIGHLIGHT_QUERY,
        )
    }

    /// The C++ query only covers C++ additions; the C query supplies keywords,
    /// comments and literals.
    #[cfg(feature = "cpp")]
    pub fn cpp() -> LanguageDefinition {
        LanguageDefinition::native(
            "cpp",
            tree_sitter_cpp::LANGUAGE.into(),
            &layered(&[tree_sitter_cpp::HIGHLIGHT_QUERY, tree_sitter_c::HIGHLIGHT_QUERY]),
        )
    }

    #[cfg(feature = "bash")]
    pub fn bash() -> LanguageDefinition {
        LanguageDefinition::native(
            "bash",
            tree_sitter_bash::LANGUAGE.into(),
            tree_sitter_bash::HIGHLIGHT_QUERY,
        )
    }

    #[cfg(feature = "php")]
    pub fn php() -> LanguageDefinition {
        LanguageDefinition::native(
            "php",
            tree_sitter_php::LANGUAGE_PHP.into(),
            tree_sitter_php::HIGHLIGHTS_QUERY,
        )
    }

    #[cfg(feature = "javascript")]
    pub fn javascript() -> LanguageDefinition {
        ecma(
            "javascript",
            tree_sitter_javascript::LANGUAGE.into(),
            &[tree_sitter_javascript::HIGHLIGHT_QUERY],
            &[tree_sitter_javascript::LOCALS_QUERY],
        )
    }

    #[cfg(feature = "javascript")]
    pub fn jsx() -> LanguageDefinition {
        ecma(
            "jsx",
            tree_sitter_javascript::LANGUAGE.into(),
            &[
                tree_sitter_javascript::JSX_HIGHLIGHT_QUERY,
                tree_sitter_javascript::HIGHLIGHT_QUERY,
            ],
            &[tree_sitter_javascript::LOCALS_QUERY],
        )
    }

    #[cfg(feature = "typescript")]
    pub fn typescript() -> LanguageDefinition {
        ecma(
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            &[
                tree_sitter_typescript::HIGHLIGHTS_QUERY,
                tree_sitter_javascript::HIGHLIGHT_QUERY,
            ],
            &[
                tree_sitter_typescript::LOCALS_QUERY,
                tree_sitter_javascript::LOCALS_QUERY,
            ],
        )
    }

    #[cfg(feature = "typescript")]
    pub fn tsx() -> LanguageDefinition {
        ecma(
            "tsx",
            tree_sitter_typescript::LANGUAGE_TSX.into(),
            &[
                tree_sitter_javascript::JSX_HIGHLIGHT_QUERY,
                tree_sitter_typescript::HIGHLIGHTS_QUERY,
                tree_sitter_javascript::HIGHLIGHT_QUERY,
            ],
            &[
                tree_sitter_typescript::LOCALS_QUERY,
                tree_sitter_javascript::LOCALS_QUERY,
            ],
        )
    }

    // The TypeScript crates ship no injections query; every dialect shares JavaScript's
    #[cfg(feature = "javascript")]
    fn ecma(
        id: &str,
        language: tree_sitter::Language,
        highlights: &[&str],
        locals: &[&str],
    ) -> LanguageDefinition {
        LanguageDefinition {
            queries: LanguageQueries {
                highlights: Some(layered(highlights)),
                injections: Some(tree_sitter_javascript::INJECTIONS_QUERY.to_string()),
                locals: Some(layered(locals)),
            },
            ..LanguageDefinition::native(id, language, "")
        }
    }

    /// Every grammar enabled at build time
    pub fn all() -> Vec<LanguageDefinition> {
        #[allow(unused_mut)]
        let mut languages = Vec::new();
        #[cfg(feature = "go")]
        languages.push(go());
        #[cfg(feature = "rust")]
        languages.push(rust());
        #[cfg(feature = "python")]
        languages.push(python());
        #[cfg(feature = "java")]
        languages.push(java());
        #[cfg(feature = "c")]
        languages.push(c());
        #[cfg(feature = "cpp")]
        languages.push(cpp());
        #[cfg(feature = "bash")]
        languages.push(bash());
        #[cfg(feature = "php")]
        languages.push(php());
        #[cfg(feature = "javascript")]
        languages.extend([javascript(), jsx()]);
        #[cfg(feature = "typescript")]
        languages.extend([typescript(), tsx()]);
        languages
    }
}
