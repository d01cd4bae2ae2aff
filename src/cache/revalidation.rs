//! ETag revalidation in front of rendered manifests.
//!
//! Each source has two token slots in the store. The *committed* token is
//! the one whose rendered output is on file. The *pending* token is the
//! latest one upstream reported, waiting for a successful [`add`] to back
//! it with output. A failed fetch or render therefore never leaves a
//! committed token that points at nothing.
//!
//! [`add`]: RevalidatingCache::add

use super::{CacheKey, CacheStore, CacheValue, ValidatorToken};
use crate::error::{CacheError, Result};
use crate::fetch::{ProbeOutcome, RevalidationProbe};
use crate::render::Document;
use crate::source::SourceId;

/// Default admission cost charged per stored entry.
pub const DEFAULT_ENTRY_COST: i64 = 1;

/// Answer to "give me the manifests for this source".
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Upstream unchanged; the stored output.
    Cached(Vec<Document>),
    /// Nothing rendered yet for this source. Fetch, render, then `add`.
    FirstRequest,
    /// Upstream has a newer version. Fetch, render, then `add`.
    Modified,
}

impl Lookup {
    /// Documents served from cache; empty for the re-render signals.
    pub fn documents(&self) -> &[Document] {
        match self {
            Self::Cached(documents) => documents,
            Self::FirstRequest | Self::Modified => &[],
        }
    }

    /// Error-shaped view: re-render signals become
    /// [`CacheError::NotYetCached`] / [`CacheError::ResourceModified`].
    pub fn into_result(self) -> Result<Vec<Document>> {
        match self {
            Self::Cached(documents) => Ok(documents),
            Self::FirstRequest => Err(CacheError::NotYetCached),
            Self::Modified => Err(CacheError::ResourceModified),
        }
    }
}

/// Serves rendered manifests while upstream reports them unchanged.
pub struct RevalidatingCache<S, P> {
    store: S,
    probe: P,
    entry_cost: i64,
}

impl<S: CacheStore, P: RevalidationProbe> RevalidatingCache<S, P> {
    /// Create a cache charging [`DEFAULT_ENTRY_COST`] per entry.
    pub fn new(store: S, probe: P) -> Self {
        Self {
            store,
            probe,
            entry_cost: DEFAULT_ENTRY_COST,
        }
    }

    /// Charge `cost` per entry instead.
    pub fn with_entry_cost(mut self, cost: i64) -> Self {
        self.entry_cost = cost;
        self
    }

    /// Decide whether stored output for `source` is still valid.
    ///
    /// Issues exactly one probe and performs at most one store write.
    pub fn get_manifests(&self, source: &SourceId) -> Result<Lookup> {
        let Some(token) = self.committed_token(source) else {
            return match self.probe.probe(source, None)? {
                ProbeOutcome::Unavailable { status } => Err(self.unavailable(source, status)),
                ProbeOutcome::Changed { token } => {
                    self.record_pending(source, token)?;
                    tracing::debug!("First request for {}, not cached yet", source);
                    Ok(Lookup::FirstRequest)
                }
                ProbeOutcome::NotModified => Ok(Lookup::FirstRequest),
            };
        };

        match self.probe.probe(source, Some(&token))? {
            ProbeOutcome::NotModified => {
                let key = CacheKey::manifests(source, &token);
                let stored = self.store.get(&key).and_then(CacheValue::into_manifests);
                let Some(documents) = stored else {
                    // Upstream confirmed `token`; a re-render must be stored under it.
                    let pending = CacheKey::pending_token(source);
                    if let Err(e) = self.put(&pending, CacheValue::Token(token)) {
                        tracing::warn!("Could not record token for {}: {}", source, e);
                    }
                    return Err(CacheError::MissingCachedValue { key: key.encode() });
                };
                tracing::debug!(
                    "{} unchanged at {}, serving {} documents",
                    source,
                    token,
                    documents.len()
                );
                Ok(Lookup::Cached(documents))
            }
            ProbeOutcome::Changed { token } => {
                self.record_pending(source, token)?;
                tracing::debug!("{} modified upstream", source);
                Ok(Lookup::Modified)
            }
            ProbeOutcome::Unavailable { status } => Err(self.unavailable(source, status)),
        }
    }

    /// Store freshly rendered output for `source`.
    ///
    /// The output is keyed by the most recently observed token, which then
    /// becomes the committed token. Output stored under the previously
    /// committed token is dropped, as is the pending marker. Fails with
    /// [`CacheError::MissingToken`] if no probe has ever reported a token for
    /// `source`.
    pub fn add(&self, source: &SourceId, documents: Vec<Document>) -> Result<()> {
        let token = self
            .observed_token(source)
            .ok_or_else(|| CacheError::MissingToken {
                source_id: source.to_string(),
            })?;
        let previous = self.committed_token(source);

        let key = CacheKey::manifests(source, &token);
        self.put(&key, CacheValue::Manifests(documents))?;
        self.put(&CacheKey::token(source), CacheValue::Token(token.clone()))?;

        if let Some(previous) = previous.filter(|previous| *previous != token) {
            tracing::debug!("Dropping output of {} at superseded {}", source, previous);
            self.store.remove(&CacheKey::manifests(source, &previous));
        }
        if self.pending_token(source).as_ref() == Some(&token) {
            self.store.remove(&CacheKey::pending_token(source));
        }

        Ok(())
    }

    /// Latest token seen for `source`: pending if any, else committed.
    pub fn observed_token(&self, source: &SourceId) -> Option<ValidatorToken> {
        self.pending_token(source)
            .or_else(|| self.committed_token(source))
    }

    /// Token whose output is on file.
    pub fn committed_token(&self, source: &SourceId) -> Option<ValidatorToken> {
        self.store
            .get(&CacheKey::token(source))
            .and_then(CacheValue::into_token)
    }

    fn pending_token(&self, source: &SourceId) -> Option<ValidatorToken> {
        self.store
            .get(&CacheKey::pending_token(source))
            .and_then(CacheValue::into_token)
    }

    fn record_pending(&self, source: &SourceId, token: Option<ValidatorToken>) -> Result<()> {
        match token {
            Some(token) => self.put(&CacheKey::pending_token(source), CacheValue::Token(token)),
            None => {
                tracing::warn!("Upstream sent no ETag for {}", source);
                Ok(())
            }
        }
    }

    fn put(&self, key: &CacheKey, value: CacheValue) -> Result<()> {
        if self.store.set(key, value, self.entry_cost) {
            Ok(())
        } else {
            Err(CacheError::StoreRejected { key: key.encode() })
        }
    }

    fn unavailable(&self, source: &SourceId, status: u16) -> CacheError {
        CacheError::UpstreamUnavailable {
            source_id: source.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Probe that replays scripted outcomes and records the tokens it saw.
    #[derive(Default)]
    struct ScriptedProbe {
        outcomes: Mutex<VecDeque<Result<ProbeOutcome>>>,
        seen: Mutex<Vec<Option<ValidatorToken>>>,
    }

    impl ScriptedProbe {
        fn with(outcomes: Vec<Result<ProbeOutcome>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::default(),
            }
        }

        fn seen(&self) -> Vec<Option<ValidatorToken>> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl RevalidationProbe for ScriptedProbe {
        fn probe(&self, _source: &SourceId, token: Option<&ValidatorToken>) -> Result<ProbeOutcome> {
            self.seen.lock().unwrap().push(token.cloned());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected probe")
        }
    }

    /// Store that refuses every write.
    struct FullStore;

    impl CacheStore for FullStore {
        fn get(&self, _key: &CacheKey) -> Option<CacheValue> {
            None
        }

        fn set(&self, _key: &CacheKey, _value: CacheValue, _cost: i64) -> bool {
            false
        }

        fn remove(&self, _key: &CacheKey) -> bool {
            false
        }
    }

    fn source() -> SourceId {
        SourceId::parse("example.com/owner/repo").unwrap()
    }

    fn etag(value: &str) -> ValidatorToken {
        ValidatorToken::new(value)
    }

    fn changed(value: &str) -> Result<ProbeOutcome> {
        Ok(ProbeOutcome::Changed {
            token: Some(etag(value)),
        })
    }

    fn deployment() -> Vec<Document> {
        vec![Document::from_json(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "demo-deployment" },
            "spec": { "replicas": 2 }
        }))
        .unwrap()]
    }

    /// Store already holding `etag` as the committed token with output.
    fn primed_store(token: &str, documents: Option<Vec<Document>>) -> MemoryStore {
        let store = MemoryStore::new(100);
        store.set(&CacheKey::token(&source()), CacheValue::Token(etag(token)), 1);
        if let Some(documents) = documents {
            store.set(
                &CacheKey::manifests(&source(), &etag(token)),
                CacheValue::Manifests(documents),
                1,
            );
        }
        store
    }

    #[test]
    fn first_request_records_token_and_signals_not_cached() {
        let probe = ScriptedProbe::with(vec![changed("etag-example")]);
        let cache = RevalidatingCache::new(MemoryStore::new(100), &probe);

        let lookup = cache.get_manifests(&source()).unwrap();

        assert_eq!(lookup, Lookup::FirstRequest);
        assert!(lookup.documents().is_empty());
        assert_eq!(cache.observed_token(&source()), Some(etag("etag-example")));
        assert!(cache.committed_token(&source()).is_none());
        assert_eq!(probe.seen(), vec![None]);
    }

    #[test]
    fn first_request_error_shape_matches_message() {
        let probe = ScriptedProbe::with(vec![changed("etag-example")]);
        let cache = RevalidatingCache::new(MemoryStore::new(100), &probe);

        let err = cache.get_manifests(&source()).unwrap().into_result().unwrap_err();

        assert_eq!(err.to_string(), "first request, not cached yet");
    }

    #[test]
    fn first_request_propagates_transport_error() {
        let probe = ScriptedProbe::with(vec![Err(CacheError::Transport {
            url: "https://api.github.com/repos/owner/repo".into(),
            message: "error sending request".into(),
        })]);
        let store = MemoryStore::new(100);
        let cache = RevalidatingCache::new(&store, &probe);

        let err = cache.get_manifests(&source()).unwrap_err();

        assert!(matches!(err, CacheError::Transport { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn first_request_with_rejecting_store_fails() {
        let probe = ScriptedProbe::with(vec![changed("etag-example")]);
        let cache = RevalidatingCache::new(FullStore, &probe);

        let err = cache.get_manifests(&source()).unwrap_err();

        assert!(matches!(err, CacheError::StoreRejected { .. }));
    }

    #[test]
    fn unchanged_resource_serves_cached_manifests() {
        let probe = ScriptedProbe::with(vec![Ok(ProbeOutcome::NotModified)]);
        let cache = RevalidatingCache::new(
            primed_store("etag-example", Some(deployment())),
            &probe,
        );

        let lookup = cache.get_manifests(&source()).unwrap();

        assert_eq!(lookup, Lookup::Cached(deployment()));
        assert_eq!(probe.seen(), vec![Some(etag("etag-example"))]);
    }

    #[test]
    fn unchanged_resource_without_output_is_an_invariant_violation() {
        let probe = ScriptedProbe::with(vec![Ok(ProbeOutcome::NotModified)]);
        let cache = RevalidatingCache::new(primed_store("etag-example", None), &probe);

        let err = cache.get_manifests(&source()).unwrap_err();

        match err {
            CacheError::MissingCachedValue { key } => assert!(key.contains("etag-example")),
            other => panic!("expected MissingCachedValue, got {:?}", other),
        }
    }

    #[test]
    fn missing_output_can_be_restored_under_confirmed_token() {
        let probe = ScriptedProbe::with(vec![
            changed("etag-2"),
            Ok(ProbeOutcome::NotModified),
            Ok(ProbeOutcome::NotModified),
        ]);
        let store = primed_store("etag-example", None);
        let cache = RevalidatingCache::new(&store, &probe);

        // A failed render leaves "etag-2" pending; upstream then confirms the
        // committed token again.
        cache.get_manifests(&source()).unwrap();
        assert!(cache.get_manifests(&source()).is_err());
        cache.add(&source(), deployment()).unwrap();

        assert_eq!(cache.committed_token(&source()), Some(etag("etag-example")));
        assert_eq!(
            cache.get_manifests(&source()).unwrap(),
            Lookup::Cached(deployment())
        );
    }

    #[test]
    fn conditional_probe_transport_error_propagates() {
        let probe = ScriptedProbe::with(vec![Err(CacheError::Transport {
            url: "u".into(),
            message: "error sending request".into(),
        })]);
        let cache = RevalidatingCache::new(
            primed_store("etag-example", Some(deployment())),
            &probe,
        );

        assert!(matches!(
            cache.get_manifests(&source()).unwrap_err(),
            CacheError::Transport { .. }
        ));
    }

    #[test]
    fn modified_resource_signals_rerender() {
        let probe = ScriptedProbe::with(vec![changed("etag-2")]);
        let cache = RevalidatingCache::new(
            primed_store("etag-example", Some(deployment())),
            &probe,
        );

        let lookup = cache.get_manifests(&source()).unwrap();

        assert_eq!(lookup, Lookup::Modified);
        assert!(lookup.documents().is_empty());
        assert_eq!(
            lookup.into_result().unwrap_err().to_string(),
            "resource modified, should download it again"
        );
    }

    #[test]
    fn modified_resource_keeps_serving_old_token_until_add() {
        let probe = ScriptedProbe::with(vec![changed("etag-2"), Ok(ProbeOutcome::NotModified)]);
        let cache = RevalidatingCache::new(
            primed_store("etag-example", Some(deployment())),
            &probe,
        );

        cache.get_manifests(&source()).unwrap();

        assert_eq!(cache.committed_token(&source()), Some(etag("etag-example")));
        assert_eq!(cache.observed_token(&source()), Some(etag("etag-2")));

        // Render failed, nothing was added: the next probe still uses the old token.
        cache.get_manifests(&source()).unwrap();
        assert_eq!(probe.seen()[1], Some(etag("etag-example")));
    }

    #[test]
    fn add_after_modified_stores_under_new_token() {
        let probe = ScriptedProbe::with(vec![changed("etag-2")]);
        let store = primed_store("etag-example", Some(deployment()));
        let cache = RevalidatingCache::new(&store, &probe);

        cache.get_manifests(&source()).unwrap();
        cache.add(&source(), Vec::new()).unwrap();

        assert_eq!(cache.committed_token(&source()), Some(etag("etag-2")));
        assert_eq!(
            store.get(&CacheKey::manifests(&source(), &etag("etag-2"))),
            Some(CacheValue::Manifests(Vec::new()))
        );
        assert!(store
            .get(&CacheKey::manifests(&source(), &etag("etag-example")))
            .is_none());
        assert!(store.get(&CacheKey::pending_token(&source())).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unavailable_upstream_is_an_error_and_leaves_cache_alone() {
        let probe = ScriptedProbe::with(vec![Ok(ProbeOutcome::Unavailable { status: 429 })]);
        let store = primed_store("etag-example", Some(deployment()));
        let cache = RevalidatingCache::new(&store, &probe);

        let err = cache.get_manifests(&source()).unwrap_err();

        assert!(matches!(err, CacheError::UpstreamUnavailable { status: 429, .. }));
        assert_eq!(cache.observed_token(&source()), Some(etag("etag-example")));
    }

    #[test]
    fn add_without_token_fails() {
        let probe = ScriptedProbe::default();
        let cache = RevalidatingCache::new(MemoryStore::new(100), &probe);

        let err = cache.add(&source(), deployment()).unwrap_err();

        assert!(matches!(err, CacheError::MissingToken { .. }));
    }

    #[test]
    fn add_stores_manifests_and_commits_token() {
        let probe = ScriptedProbe::with(vec![changed("etag-example")]);
        let store = MemoryStore::new(100);
        let cache = RevalidatingCache::new(&store, &probe);

        cache.get_manifests(&source()).unwrap();
        cache.add(&source(), deployment()).unwrap();

        assert_eq!(cache.committed_token(&source()), Some(etag("etag-example")));
        assert_eq!(
            store.get(&CacheKey::manifests(&source(), &etag("etag-example"))),
            Some(CacheValue::Manifests(deployment()))
        );
    }

    #[test]
    fn add_with_rejecting_store_fails() {
        let probe = ScriptedProbe::default();
        let store = MemoryStore::new(1);
        store.set(
            &CacheKey::token(&source()),
            CacheValue::Token(etag("etag-example")),
            1,
        );
        let cache = RevalidatingCache::new(&store, &probe).with_entry_cost(2);

        let err = cache.add(&source(), deployment()).unwrap_err();

        assert!(matches!(err, CacheError::StoreRejected { .. }));
    }

    #[test]
    fn add_twice_is_idempotent() {
        let probe = ScriptedProbe::default();
        let store = primed_store("etag-example", None);
        let cache = RevalidatingCache::new(&store, &probe);

        cache.add(&source(), deployment()).unwrap();
        let after_first = store.len();
        cache.add(&source(), deployment()).unwrap();

        assert_eq!(store.len(), after_first);
        assert_eq!(
            store.get(&CacheKey::manifests(&source(), &etag("etag-example"))),
            Some(CacheValue::Manifests(deployment()))
        );
    }

    #[test]
    fn sources_sharing_a_token_do_not_share_output() {
        let other = SourceId::parse("example.com/other/repo").unwrap();
        let probe = ScriptedProbe::with(vec![Ok(ProbeOutcome::NotModified)]);
        let store = primed_store("shared", Some(deployment()));
        store.set(&CacheKey::token(&other), CacheValue::Token(etag("shared")), 1);
        let cache = RevalidatingCache::new(&store, &probe);

        let err = cache.get_manifests(&other).unwrap_err();

        assert!(matches!(err, CacheError::MissingCachedValue { .. }));
    }

    #[test]
    fn end_to_end_first_then_cached() {
        let probe = ScriptedProbe::with(vec![changed("etag-1"), Ok(ProbeOutcome::NotModified)]);
        let cache = RevalidatingCache::new(MemoryStore::new(100), &probe);

        assert_eq!(cache.get_manifests(&source()).unwrap(), Lookup::FirstRequest);
        assert_eq!(cache.observed_token(&source()), Some(etag("etag-1")));

        cache.add(&source(), deployment()).unwrap();

        assert_eq!(
            cache.get_manifests(&source()).unwrap(),
            Lookup::Cached(deployment())
        );
        assert_eq!(probe.seen(), vec![None, Some(etag("etag-1"))]);
    }
}
