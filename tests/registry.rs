//! Language registry and shared backend tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use treelight::syntax::{Backend, LanguageRegistry};
use treelight::{Error, LanguageDefinition, LanguageLoader, LanguageQueries, Treelight};

fn toy_without_grammar() -> LanguageDefinition {
    LanguageDefinition {
        id: "toy".to_string(),
        grammar: None,
        queries: LanguageQueries::highlights("(identifier) @variable"),
    }
}

#[tokio::test]
async fn test_unknown_language_error() {
    let registry = LanguageRegistry::default();
    assert!(matches!(
        registry.load("cobol").await,
        Err(Error::UnknownLanguage(_))
    ));
}

#[tokio::test]
async fn test_failed_load_is_not_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = LanguageRegistry::default();
    let counter = Arc::clone(&calls);
    registry.register(
        "toy",
        LanguageLoader::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(toy_without_grammar())
        }),
    );

    assert!(registry.load("toy").await.is_err());
    assert!(registry.load("toy").await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!registry.is_loaded("toy"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_share_one_initialization() {
    let backend = Backend::new();
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let backend = backend.clone();
        tasks.push(tokio::spawn(async move { backend.ensure_ready().await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(backend.init_count(), 1);
}

#[tokio::test]
async fn test_highlighters_can_share_a_backend() {
    let backend = Backend::new();
    let first = Treelight::with_backend(backend.clone());
    let second = Treelight::with_backend(backend.clone());
    first.backend().ensure_ready().await.unwrap();
    second.backend().ensure_ready().await.unwrap();
    assert_eq!(backend.init_count(), 1);
}

#[cfg(feature = "go")]
mod native {
    use super::*;
    use treelight::syntax::builtin;

    #[tokio::test]
    async fn test_loader_runs_once_per_language() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = LanguageRegistry::default();
        let counter = Arc::clone(&calls);
        registry.register(
            "go",
            LanguageLoader::from_fn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(builtin::go())
            }),
        );

        let first = registry.load("go").await.unwrap();
        let second = registry.load("go").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_loader() {
        let registry = LanguageRegistry::default();
        registry.register(
            "go",
            LanguageLoader::from_async(|| async {
                tokio::task::yield_now().await;
                Ok(builtin::go())
            }),
        );
        let state = registry.load("go").await.unwrap();
        assert_eq!(state.id(), "go");
    }

    #[tokio::test]
    async fn test_registration_id_used_for_anonymous_definition() {
        let registry = LanguageRegistry::default();
        let mut definition = builtin::go();
        definition.id = String::new();
        registry.register("golang", definition);
        assert_eq!(registry.load("golang").await.unwrap().id(), "golang");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_across_languages_init_backend_once() {
        let highlighter = Arc::new(Treelight::new());
        for id in ["go-a", "go-b", "go-c", "go-d"] {
            highlighter.register_language(id, builtin::go());
        }

        let mut tasks = Vec::new();
        for id in ["go-a", "go-b", "go-c", "go-d", "go-a", "go-b"] {
            let highlighter = Arc::clone(&highlighter);
            tasks.push(tokio::spawn(async move {
                highlighter.load_language(id).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(highlighter.backend().init_count(), 1);
        for id in ["go-a", "go-b", "go-c", "go-d"] {
            assert!(highlighter.is_loaded(id));
        }
    }

    #[tokio::test]
    async fn test_preload_loads_everything() {
        let highlighter = Treelight::builder().builtin_languages().build();
        highlighter.preload().await.unwrap();
        for id in highlighter.language_ids() {
            assert!(highlighter.is_loaded(&id), "{id} not loaded");
        }
        assert_eq!(highlighter.backend().init_count(), 1);
    }

    #[tokio::test]
    async fn test_preload_reports_failures() {
        let highlighter = Treelight::builder()
            .language("go", builtin::go())
            .language("toy", toy_without_grammar())
            .build();
        assert!(matches!(
            highlighter.preload().await,
            Err(Error::InvalidLanguageDefinition { .. })
        ));
        assert!(!highlighter.is_loaded("toy"));
    }
}
