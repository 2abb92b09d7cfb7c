//! Integration tests for sliding-window rate limiting over a shared store.
//!
//! Test coverage includes:
//! - One budget enforced across several limiter instances
//! - Window rollover driven by a simulated clock
//! - Create and read actions accounted separately
//! - Limiter windows and note records coexisting in one store

use std::sync::Arc;

use ember::kv::InMemoryBackend;
use ember::notes::{CreateNoteRequest, NoteLimits, NoteStore};
use ember::time::SimulatedTimeProvider;
use ember::{RateLimitAction, RateLimiter};

#[tokio::test]
async fn test_limiter_instances_over_one_store_share_the_budget() {
    let backend = Arc::new(InMemoryBackend::new());
    let limiter_a = RateLimiter::new(backend.clone());
    let limiter_b = RateLimiter::new(backend);

    for _ in 0..3 {
        assert!(limiter_a
            .allow("10.0.0.1", RateLimitAction::Create, 4)
            .await
            .unwrap());
    }
    assert!(limiter_b
        .allow("10.0.0.1", RateLimitAction::Create, 4)
        .await
        .unwrap());

    // Budget spent through either instance counts for both.
    assert!(!limiter_a
        .allow("10.0.0.1", RateLimitAction::Create, 4)
        .await
        .unwrap());
    assert!(!limiter_b
        .allow("10.0.0.1", RateLimitAction::Create, 4)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_budget_recovers_after_the_window_passes() {
    let clock = Arc::new(SimulatedTimeProvider::new(5_000_000));
    let backend = Arc::new(InMemoryBackend::with_time_provider(clock.clone()));
    let limiter = RateLimiter::new(backend);

    for _ in 0..2 {
        assert!(limiter
            .allow("10.0.0.1", RateLimitAction::Read, 2)
            .await
            .unwrap());
    }
    assert!(!limiter
        .allow("10.0.0.1", RateLimitAction::Read, 2)
        .await
        .unwrap());

    clock.advance_secs(61);
    assert!(limiter
        .allow("10.0.0.1", RateLimitAction::Read, 2)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_create_and_read_have_separate_budgets() {
    let backend = Arc::new(InMemoryBackend::new());
    let limiter = RateLimiter::new(backend);

    assert!(limiter
        .allow("10.0.0.1", RateLimitAction::Create, 1)
        .await
        .unwrap());
    assert!(!limiter
        .allow("10.0.0.1", RateLimitAction::Create, 1)
        .await
        .unwrap());

    // An exhausted create budget leaves reads untouched.
    assert!(limiter
        .allow("10.0.0.1", RateLimitAction::Read, 1)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_limiter_windows_and_notes_coexist_in_one_store() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = NoteStore::new(
        backend.clone(),
        NoteLimits {
            size_limit_bytes: 4096,
            meta_limit_bytes: 256,
            max_views: 10,
            max_expiration_minutes: 60,
            id_length: 32,
            allow_advanced: true,
        },
    );
    let limiter = RateLimiter::new(backend);

    let id = store
        .create(CreateNoteRequest {
            contents: "payload".to_string(),
            meta: "m".to_string(),
            views: Some(1),
            expiration: None,
        })
        .await
        .unwrap();

    // Hammering the limiter never touches note records.
    for _ in 0..5 {
        limiter
            .allow("10.0.0.1", RateLimitAction::Read, 2)
            .await
            .unwrap();
    }

    let note = store.consume(&id).await.unwrap();
    assert_eq!(note.contents, "payload");
}
