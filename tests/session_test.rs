mod common;

use std::{sync::Arc, time::Duration};

use chrono::TimeDelta;
use common::{ManualClock, record};
use myspoti::management::{Clock, SessionTokenCache};

fn cache_with_ttl(clock: &ManualClock, ttl_secs: u64) -> SessionTokenCache {
    SessionTokenCache::new(Arc::new(clock.clone()), Duration::from_secs(ttl_secs))
}

#[tokio::test]
async fn test_put_then_get_returns_same_record() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 3600);
    let token = record("x", "y", clock.now() + TimeDelta::seconds(3600));

    cache.put("s1", token.clone()).await;

    assert_eq!(cache.get("s1").await, Some(token));
}

#[tokio::test]
async fn test_get_returns_expired_records_unchanged() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 3600);
    let token = record("x", "y", clock.now() - TimeDelta::seconds(10));

    cache.put("s1", token.clone()).await;

    assert_eq!(cache.get("s1").await, Some(token));
}

#[tokio::test]
async fn test_put_replaces_previous_record() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 3600);
    let expires_at = clock.now() + TimeDelta::seconds(3600);

    cache.put("s1", record("x", "y", expires_at)).await;
    cache.put("s1", record("z", "y", expires_at)).await;

    assert_eq!(cache.get("s1").await.unwrap().access_token, "z");
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 3600);
    let expires_at = clock.now() + TimeDelta::seconds(3600);

    cache.put("alice", record("a", "ra", expires_at)).await;
    cache.put("bob", record("b", "rb", expires_at)).await;
    assert!(cache.clear("alice").await);

    assert_eq!(cache.get("alice").await, None);
    assert_eq!(cache.get("bob").await.unwrap().access_token, "b");
}

#[tokio::test]
async fn test_clear_unknown_session() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 3600);

    assert!(!cache.clear("nobody").await);
    assert!(cache.is_empty().await);
    assert_eq!(cache.get("nobody").await, None);
}

#[tokio::test]
async fn test_idle_sessions_expire() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 600);
    let expires_at = clock.now() + TimeDelta::days(1);

    cache.put("s1", record("x", "y", expires_at)).await;
    clock.advance(TimeDelta::seconds(601));

    assert_eq!(cache.get("s1").await, None);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_reads_keep_sessions_alive() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 600);
    let expires_at = clock.now() + TimeDelta::days(1);

    cache.put("s1", record("x", "y", expires_at)).await;
    for _ in 0..3 {
        clock.advance(TimeDelta::seconds(400));
        assert!(cache.get("s1").await.is_some());
    }
}

#[tokio::test]
async fn test_put_evicts_other_idle_sessions() {
    let clock = ManualClock::new();
    let cache = cache_with_ttl(&clock, 600);
    let expires_at = clock.now() + TimeDelta::days(1);

    cache.put("old", record("x", "y", expires_at)).await;
    clock.advance(TimeDelta::seconds(700));
    cache.put("new", record("z", "w", expires_at)).await;

    assert_eq!(cache.len().await, 1);
    assert!(cache.get("new").await.is_some());
}
