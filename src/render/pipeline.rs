//! Fetch, render and cache in one call.
//!
//! [`ManifestPipeline`] is the caller the revalidating cache expects: it asks
//! the cache first and only fetches and renders when told to, then stores
//! the result. Output is cached per rendered directory, so two paths inside
//! one source never share documents. The whole sequence holds a lock for
//! that directory, so concurrent requests for it trigger at most one
//! upstream fetch.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::document::Document;
use super::kustomize::Renderer;
use crate::cache::{CacheStore, Lookup, RevalidatingCache};
use crate::error::{CacheError, Result};
use crate::fetch::{RevalidationProbe, SourceFetcher};
use crate::source::SourceId;

/// Per-key mutexes, created on first use and dropped once nobody holds them.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.to_string()).or_default().clone()
    }

    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map holds one reference and `lock` the other.
        let idle = Arc::strong_count(&lock) == 2;
        drop(lock);
        if idle {
            locks.remove(key);
        }
    }
}

/// Renders sources, serving unchanged ones from the cache.
pub struct ManifestPipeline<S, P, F, R> {
    cache: RevalidatingCache<S, P>,
    fetcher: F,
    renderer: R,
    locks: KeyedLocks,
}

impl<S, P, F, R> ManifestPipeline<S, P, F, R>
where
    S: CacheStore,
    P: RevalidationProbe,
    F: SourceFetcher,
    R: Renderer,
{
    pub fn new(cache: RevalidatingCache<S, P>, fetcher: F, renderer: R) -> Self {
        Self {
            cache,
            fetcher,
            renderer,
            locks: KeyedLocks::default(),
        }
    }

    /// The revalidating cache in front of the renderer.
    pub fn cache(&self) -> &RevalidatingCache<S, P> {
        &self.cache
    }

    /// Render `path` inside `source`.
    ///
    /// Served from cache while upstream reports the source unchanged;
    /// otherwise fetched into a scratch directory, rendered, and stored.
    /// `path` must be relative and stay inside the source.
    pub fn render(&self, source: &SourceId, path: impl AsRef<Path>) -> Result<Vec<Document>> {
        let scoped = source.with_path(path)?;
        let key = scoped.cache_id();

        let lock = self.locks.acquire(&key);
        let result = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.render_locked(source, &scoped)
        };
        self.locks.release(&key, lock);

        result
    }

    fn render_locked(&self, source: &SourceId, scoped: &SourceId) -> Result<Vec<Document>> {
        match self.cache.get_manifests(scoped) {
            Ok(Lookup::Cached(documents)) => {
                tracing::info!("Using cached manifests for {}", scoped);
                return Ok(documents);
            }
            Ok(Lookup::FirstRequest) => tracing::info!("First request for {}, rendering", scoped),
            Ok(Lookup::Modified) => tracing::info!("{} changed upstream, rendering", scoped),
            Err(CacheError::MissingCachedValue { key }) => {
                tracing::warn!("Cached output {} is gone, rendering {} again", key, scoped)
            }
            Err(e) => return Err(e),
        }

        let scratch = tempfile::Builder::new().prefix("kustomize").tempdir()?;
        let destination = scratch.path().join("source");
        self.fetcher.fetch(source, &destination)?;

        let root = match scoped.path() {
            Some(path) => destination.join(path),
            None => destination,
        };
        let documents = self.renderer.render(&root)?;

        if let Err(e) = self.cache.add(scoped, documents.clone()) {
            tracing::warn!("Rendered {} but could not cache it: {}", scoped, e);
        }

        Ok(documents)
    }
}
