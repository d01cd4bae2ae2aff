//! Integration tests for the revalidating cache public API.

use httpmock::prelude::*;
use manifest_cache::cache::{
    CacheKey, CacheStore, CacheValue, DiskStore, Lookup, MemoryStore, RevalidatingCache,
    ValidatorToken,
};
use manifest_cache::fetch::{HttpProbe, StatusPolicy};
use manifest_cache::render::Document;
use manifest_cache::source::SourceId;
use manifest_cache::CacheError;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn probe_for(server: &MockServer) -> HttpProbe {
    HttpProbe::builder()
        .api_base(server.base_url())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn deployment(name: &str) -> Document {
    Document::from_json(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name }
    }))
    .unwrap()
}

#[test]
fn first_request_then_unchanged_source() {
    let server = MockServer::start();
    let source = SourceId::parse("example.com/owner/repo").unwrap();

    let mut unconditional = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo");
        then.status(200).header("ETag", "etag-1");
    });

    let cache = RevalidatingCache::new(MemoryStore::new(100), probe_for(&server));

    let lookup = cache.get_manifests(&source).unwrap();
    assert_eq!(lookup, Lookup::FirstRequest);
    assert!(lookup.documents().is_empty());
    assert_eq!(
        cache.observed_token(&source),
        Some(ValidatorToken::new("etag-1"))
    );
    unconditional.assert();
    unconditional.delete();

    cache.add(&source, vec![deployment("deploy1")]).unwrap();

    let conditional = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo")
            .header("If-None-Match", "etag-1");
        then.status(304);
    });

    let lookup = cache.get_manifests(&source).unwrap();
    assert_eq!(lookup, Lookup::Cached(vec![deployment("deploy1")]));
    conditional.assert();
}

#[test]
fn seeded_store_serves_on_not_modified() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo")
            .header("If-None-Match", "etag-1");
        then.status(304);
    });

    let source = SourceId::parse("example.com/owner/repo").unwrap();
    let token = ValidatorToken::new("etag-1");
    let store = MemoryStore::new(100);
    assert!(store.set(
        &CacheKey::manifests(&source, &token),
        CacheValue::Manifests(vec![deployment("deploy1")]),
        1
    ));
    assert!(store.set(&CacheKey::token(&source), CacheValue::Token(token), 1));

    let cache = RevalidatingCache::new(store, probe_for(&server));

    let documents = cache.get_manifests(&source).unwrap().into_result().unwrap();
    assert_eq!(documents, vec![deployment("deploy1")]);
}

#[test]
fn modified_source_is_stored_under_new_token() {
    let server = MockServer::start();
    let source = SourceId::parse("example.com/owner/repo").unwrap();
    let temp = TempDir::new().unwrap();
    let cache = RevalidatingCache::new(DiskStore::new(temp.path(), 100), probe_for(&server));

    let mut v1 = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo");
        then.status(200).header("ETag", "\"v1\"");
    });
    cache.get_manifests(&source).unwrap();
    cache.add(&source, vec![deployment("old")]).unwrap();
    v1.delete();

    let mut v2 = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo")
            .header("If-None-Match", "\"v1\"");
        then.status(200).header("ETag", "\"v2\"");
    });
    let err = cache
        .get_manifests(&source)
        .unwrap()
        .into_result()
        .unwrap_err();
    assert!(matches!(err, CacheError::ResourceModified));
    assert_eq!(
        cache.committed_token(&source),
        Some(ValidatorToken::new("\"v1\""))
    );

    cache.add(&source, vec![deployment("new")]).unwrap();
    assert_eq!(
        cache.committed_token(&source),
        Some(ValidatorToken::new("\"v2\""))
    );
    v2.delete();

    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo")
            .header("If-None-Match", "\"v2\"");
        then.status(304);
    });
    assert_eq!(
        cache.get_manifests(&source).unwrap(),
        Lookup::Cached(vec![deployment("new")])
    );

    // Only the committed token and its output remain on disk.
    let on_disk = DiskStore::new(temp.path(), 100);
    let keys: Vec<_> = on_disk.list().unwrap().into_iter().map(|e| e.key).collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|key| !key.contains("v1")));
    assert_eq!(on_disk.total_cost().unwrap(), 2);
}

#[test]
fn disk_store_state_survives_reopen() {
    let server = MockServer::start();
    let source = SourceId::parse("example.com/owner/repo").unwrap();
    let temp = TempDir::new().unwrap();

    let mut first = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo");
        then.status(200).header("ETag", "\"v1\"");
    });
    {
        let cache = RevalidatingCache::new(DiskStore::new(temp.path(), 100), probe_for(&server));
        cache.get_manifests(&source).unwrap();
        cache.add(&source, vec![deployment("deploy1")]).unwrap();
    }
    first.delete();

    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo")
            .header("If-None-Match", "\"v1\"");
        then.status(304);
    });

    let reopened = RevalidatingCache::new(DiskStore::new(temp.path(), 100), probe_for(&server));
    assert_eq!(
        reopened.get_manifests(&source).unwrap(),
        Lookup::Cached(vec![deployment("deploy1")])
    );
}

#[test]
fn not_modified_without_output_is_missing_cached_value() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo");
        then.status(304);
    });

    let source = SourceId::parse("example.com/owner/repo").unwrap();
    let store = MemoryStore::new(100);
    assert!(store.set(
        &CacheKey::token(&source),
        CacheValue::Token(ValidatorToken::new("etag-1")),
        1
    ));
    let cache = RevalidatingCache::new(store, probe_for(&server));

    let err = cache.get_manifests(&source).unwrap_err();

    assert!(matches!(err, CacheError::MissingCachedValue { .. }));
}

#[test]
fn strict_policy_keeps_cached_output_on_rate_limit() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo");
        then.status(429);
    });

    let source = SourceId::parse("example.com/owner/repo").unwrap();
    let token = ValidatorToken::new("etag-1");
    let store = MemoryStore::new(100);
    assert!(store.set(&CacheKey::token(&source), CacheValue::Token(token.clone()), 1));

    let probe = HttpProbe::builder()
        .api_base(server.base_url())
        .policy(StatusPolicy::Strict)
        .build()
        .unwrap();
    let cache = RevalidatingCache::new(store, probe);

    let err = cache.get_manifests(&source).unwrap_err();

    assert!(matches!(
        err,
        CacheError::UpstreamUnavailable { status: 429, .. }
    ));
    assert_eq!(cache.committed_token(&source), Some(token));
}

#[test]
fn add_before_any_probe_is_missing_token() {
    let server = MockServer::start();
    let source = SourceId::parse("example.com/owner/repo").unwrap();
    let cache = RevalidatingCache::new(MemoryStore::new(100), probe_for(&server));

    let err = cache.add(&source, vec![deployment("deploy1")]).unwrap_err();

    assert!(matches!(err, CacheError::MissingToken { .. }));
}

#[test]
fn unreachable_upstream_is_transport_error() {
    let source = SourceId::parse("example.com/owner/repo").unwrap();
    let probe = HttpProbe::builder()
        .api_base("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let cache = RevalidatingCache::new(MemoryStore::new(100), probe);

    let err = cache.get_manifests(&source).unwrap_err();

    assert!(matches!(err, CacheError::Transport { .. }));
}
