//! Tree-sitter backend, parser state and capture extraction
//!
//! The [`Backend`] is the shared parsing runtime. It is initialized at most once, by
//! whichever caller needs it first; every caller arriving while that initialization is
//! in flight awaits the same attempt.
//!
//! A [`LanguageState`] owns one language's parser and compiled highlight query.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use streaming_iterator::StreamingIterator;
use tokio::sync::OnceCell;
use tree_sitter::{Language, ParseOptions, Parser, Query, QueryCursor, Tree};

use super::highlights::Capture;
use super::languages::{decode_embedded, fetch_grammar, Grammar};
use crate::error::{Error, Result};

/// Process resources shared by every language
struct Runtime {
    #[cfg(feature = "wasm")]
    engine: tree_sitter::wasmtime::Engine,
}

impl Runtime {
    fn start() -> Result<Self> {
        tracing::info!(
            "Starting parsing backend (grammar ABI {}..={})",
            tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION,
            tree_sitter::LANGUAGE_VERSION
        );
        Ok(Self {
            #[cfg(feature = "wasm")]
            engine: tree_sitter::wasmtime::Engine::default(),
        })
    }

    #[cfg(feature = "wasm")]
    fn load_wasm(&self, id: &str, bytes: &[u8]) -> Result<CompiledGrammar> {
        let mut store = tree_sitter::WasmStore::new(&self.engine)
            .map_err(|e| Error::BackendUnavailable(format!("cannot create wasm store: {e}")))?;
        let language = store.load_language(id, bytes).map_err(|e| {
            Error::BackendUnavailable(format!("cannot compile grammar for \"{id}\": {e}"))
        })?;
        Ok(CompiledGrammar {
            language,
            store: Some(store),
        })
    }

    #[cfg(not(feature = "wasm"))]
    fn load_wasm(&self, id: &str, _bytes: &[u8]) -> Result<CompiledGrammar> {
        Err(Error::BackendUnavailable(format!(
            "cannot compile binary grammar for \"{id}\": built without the `wasm` feature"
        )))
    }
}

/// A grammar ready to be handed to a parser
pub struct CompiledGrammar {
    language: Language,
    /// Wasm languages only run on a parser holding the store they were loaded into
    #[cfg(feature = "wasm")]
    store: Option<tree_sitter::WasmStore>,
}

impl CompiledGrammar {
    fn native(language: Language) -> Self {
        Self {
            language,
            #[cfg(feature = "wasm")]
            store: None,
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }
}

struct BackendInner {
    runtime: OnceCell<Runtime>,
    /// Completed initializations; never exceeds one
    init_count: AtomicUsize,
}

/// Handle to the shared parsing runtime. Clones share the same runtime.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

impl Default for Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Backend {
    /// Create an uninitialized backend; it starts on first use
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BackendInner {
                runtime: OnceCell::new(),
                init_count: AtomicUsize::new(0),
            }),
        }
    }

    async fn runtime(&self) -> Result<&Runtime> {
        self.inner
            .runtime
            .get_or_try_init(|| async {
                let runtime = Runtime::start()?;
                self.inner.init_count.fetch_add(1, Ordering::SeqCst);
                Ok(runtime)
            })
            .await
    }

    /// Start the runtime if nobody has yet, or wait for the start in progress
    pub async fn ensure_ready(&self) -> Result<()> {
        self.runtime().await.map(|_| ())
    }

    pub fn is_ready(&self) -> bool {
        self.inner.runtime.initialized()
    }

    /// How many times the runtime has been initialized (0 or 1)
    pub fn init_count(&self) -> usize {
        self.inner.init_count.load(Ordering::SeqCst)
    }

    /// Turn a grammar source into a language, decoding or downloading it first if needed
    pub async fn compile_grammar(&self, id: &str, grammar: &Grammar) -> Result<CompiledGrammar> {
        let runtime = self.runtime().await?;
        let bytes = match grammar {
            Grammar::Native(language) => return Ok(CompiledGrammar::native(language.clone())),
            Grammar::Wasm(bytes) => bytes.to_vec(),
            Grammar::Embedded(text) => decode_embedded(text)?,
            Grammar::Url(url) => fetch_grammar(url).await?,
        };
        runtime.load_wasm(id, &bytes)
    }
}

/// Parser and compiled highlight query for one language
pub struct LanguageState {
    id: String,
    language: Language,
    /// tree-sitter parsers are !Sync; one parse at a time per language
    parser: Mutex<Parser>,
    highlight_query: Query,
}

impl std::fmt::Debug for LanguageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageState")
            .field("id", &self.id)
            .field("captures", &self.highlight_query.capture_names())
            .finish()
    }
}

impl LanguageState {
    /// Build the parser and compile the highlight query
    pub fn new(id: &str, grammar: CompiledGrammar, highlights: &str) -> Result<Self> {
        let mut parser = Parser::new();

        #[cfg(feature = "wasm")]
        if let Some(store) = grammar.store {
            parser.set_wasm_store(store).map_err(|e| {
                Error::BackendUnavailable(format!("cannot attach wasm store for \"{id}\": {e}"))
            })?;
        }

        if let Err(e) = parser.set_language(&grammar.language) {
            tracing::error!("Failed to set language for {}: {}", id, e);
            return Err(Error::BackendUnavailable(format!(
                "grammar for \"{id}\" is incompatible: {e}"
            )));
        }

        // Create query (may fail if query syntax is invalid)
        let highlight_query = Query::new(&grammar.language, highlights).map_err(|e| {
            tracing::error!("Failed to compile query for {}: {}", id, e);
            Error::invalid_language(id, format!("malformed highlights query: {e}"))
        })?;

        Ok(Self {
            id: id.to_string(),
            language: grammar.language,
            parser: Mutex::new(parser),
            highlight_query,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Capture names declared by the highlight query
    pub fn capture_names(&self) -> &[&str] {
        self.highlight_query.capture_names()
    }

    /// Parse a source string from scratch
    pub fn parse(&self, source: &str) -> Result<Tree> {
        self.parse_within(source, None)
    }

    /// Parse a source string, giving up once `timeout` has elapsed
    pub fn parse_within(&self, source: &str, timeout: Option<Duration>) -> Result<Tree> {
        let mut parser = self.parser.lock().unwrap_or_else(PoisonError::into_inner);
        let tree = match timeout {
            None => parser.parse(source, None),
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                let bytes = source.as_bytes();
                let mut past_deadline = |_: &tree_sitter::ParseState| Instant::now() >= deadline;
                parser.parse_with_options(
                    &mut |offset: usize, _: tree_sitter::Point| {
                        bytes.get(offset..).unwrap_or_default()
                    },
                    None,
                    Some(ParseOptions::new().progress_callback(&mut past_deadline)),
                )
            }
        };
        tree.ok_or_else(|| {
            // A cancelled parse would otherwise resume on the next call
            parser.reset();
            tracing::error!("Parse failed for {}", self.id);
            Error::ParseFailure(self.id.clone())
        })
    }

    /// Run the highlight query over a parsed tree
    pub fn captures(&self, tree: &Tree, source: &str) -> Vec<Capture> {
        let mut cursor = QueryCursor::new();
        let names = self.highlight_query.capture_names();
        let mut result = Vec::new();

        // Run query and collect captures using StreamingIterator
        let mut captures = cursor.captures(&self.highlight_query, tree.root_node(), source.as_bytes());
        while let Some((query_match, capture_idx)) = captures.next() {
            let capture = &query_match.captures[*capture_idx];
            let node = capture.node;
            result.push(Capture::new(
                names[capture.index as usize],
                node.start_byte(),
                node.end_byte(),
            ));
        }

        result
    }

    /// Parse `source` and return its captures
    pub fn highlight(&self, source: &str) -> Result<Vec<Capture>> {
        self.highlight_within(source, None)
    }

    /// Like [`LanguageState::highlight`], failing with `ParseFailure` when parsing
    /// outlasts `timeout`
    pub fn highlight_within(&self, source: &str, timeout: Option<Duration>) -> Result<Vec<Capture>> {
        let tree = self.parse_within(source, timeout)?;
        Ok(self.captures(&tree, source))
    }
}
