//! Language registry
//!
//! Maps language ids to loaders and memoizes the [`LanguageState`] built from each one.
//! States live for the lifetime of the registry; registering over an id that is already
//! loaded does not replace the loaded state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::languages::LanguageLoader;
use super::parser::{Backend, LanguageState};
use crate::error::{Error, Result};

pub struct LanguageRegistry {
    backend: Backend,
    loaders: RwLock<HashMap<String, LanguageLoader>>,
    cache: RwLock<HashMap<String, Arc<LanguageState>>>,
}

impl std::fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageRegistry")
            .field("backend", &self.backend)
            .field("languages", &self.ids())
            .finish()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new(Backend::new())
    }
}

impl LanguageRegistry {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            loaders: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Register a loader under `id`, replacing any previous loader
    pub fn register(&self, id: &str, loader: impl Into<LanguageLoader>) {
        if self.is_loaded(id) {
            tracing::warn!("Language {} is already loaded; keeping the loaded state", id);
        }
        self.loaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), loader.into());
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Registered language ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Get the parser state for `id`, building it on first use.
    ///
    /// Two concurrent first loads of one id may both build; the last one stored wins.
    pub async fn load(&self, id: &str) -> Result<Arc<LanguageState>> {
        if let Some(state) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Ok(Arc::clone(state));
        }

        let loader = self
            .loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownLanguage(id.to_string()))?;

        self.backend.ensure_ready().await?;

        let definition = loader.resolve().await?;
        let highlights = definition.highlight_query()?;
        let grammar = definition.grammar.as_ref().ok_or_else(|| {
            Error::invalid_language(id, "no grammar: provide a binary grammar or a grammar URL")
        })?;

        let grammar_name = if definition.id.is_empty() {
            id
        } else {
            definition.id.as_str()
        };
        let compiled = self.backend.compile_grammar(grammar_name, grammar).await?;
        let state = Arc::new(LanguageState::new(id, compiled, highlights)?);

        tracing::debug!("Loaded language {}", id);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), Arc::clone(&state));
        Ok(state)
    }
}
