//! Action coordinator tests
//!
//! Run with: cargo test -p integration-tests --test interaction_tests

use forum_cache::keys;
use forum_core::{ActionKind, CounterSnapshot, Id, TargetKind, UserActionStatus};
use integration_tests::{reactions, sorted, TestEngine};

const ACTOR: Id = Id::new(42);
const OTHER_ACTOR: Id = Id::new(43);
const POST: Id = Id::new(7);

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_like_then_repeat_is_idempotent() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    let stats = posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    assert_eq!(reactions(&stats), (1, 0, 0));

    let stats = posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    assert_eq!(reactions(&stats), (1, 0, 0));
    assert_eq!(engine.ledger.len(), 1);
}

#[tokio::test]
async fn test_dislike_displaces_like() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    let stats = posts.perform_action(ACTOR, POST, ActionKind::Dislike).await.unwrap();

    assert_eq!(reactions(&stats), (0, 1, 0));
    assert_eq!(
        engine.ledger.rows_for(42, TargetKind::Post, 7),
        vec![ActionKind::Dislike]
    );
}

#[tokio::test]
async fn test_cancel_without_prior_action_is_noop() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    posts.perform_action(ACTOR, POST, ActionKind::Dislike).await.unwrap();

    let stats = posts.cancel_action(ACTOR, POST, ActionKind::Favorite).await.unwrap();
    assert_eq!(reactions(&stats), (0, 1, 0));
    assert_eq!(engine.ledger.len(), 1);
}

#[tokio::test]
async fn test_insert_losing_the_race_changes_nothing() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    engine.ledger.miss_next_find();

    let stats = posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    assert_eq!(reactions(&stats), (1, 0, 0));
    assert_eq!(engine.ledger.len(), 1);
    assert_eq!(
        engine
            .cache
            .raw_field(&keys::stats_key(TargetKind::Post, POST), "like_count")
            .as_deref(),
        Some("1")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_leave_one_row() {
    let engine = TestEngine::new().with_post(7);

    let mut requests = Vec::new();
    for _ in 0..16 {
        let ctx = engine.ctx.clone();
        requests.push(tokio::spawn(async move {
            ctx.posts().perform_action(ACTOR, POST, ActionKind::Like).await
        }));
    }
    for request in requests {
        request.await.unwrap().unwrap();
    }

    assert_eq!(engine.ledger.rows_for(42, TargetKind::Post, 7), vec![ActionKind::Like]);
    engine.ctx.sync().sync_all().await.unwrap();
    let stats = engine.ctx.posts().get_stats(POST).await.unwrap();
    assert_eq!(reactions(&stats), (1, 0, 0));
}

#[tokio::test]
async fn test_cache_miss_backfills_then_serves_from_cache() {
    let engine = TestEngine::new();
    engine
        .targets
        .seed(TargetKind::Post, 99, CounterSnapshot::new(3, 0, 0, 10));
    let posts = engine.ctx.posts();

    let first = posts.get_stats(Id::new(99)).await.unwrap();
    assert_eq!(first, CounterSnapshot::new(3, 0, 0, 10));
    assert_eq!(engine.targets.snapshot_reads(), 1);
    assert_eq!(
        engine
            .cache
            .raw_field(&keys::stats_key(TargetKind::Post, Id::new(99)), "view_count")
            .as_deref(),
        Some("10")
    );

    let second = posts.get_stats(Id::new(99)).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(engine.targets.snapshot_reads(), 1);
}

#[tokio::test]
async fn test_all_zero_cache_entry_is_treated_as_miss() {
    let engine = TestEngine::new().with_post(100);
    let posts = engine.ctx.posts();

    posts.get_stats(Id::new(100)).await.unwrap();
    posts.get_stats(Id::new(100)).await.unwrap();
    assert_eq!(engine.targets.snapshot_reads(), 2);
}

// ============================================================================
// Invariants
// ============================================================================

#[tokio::test]
async fn test_like_and_dislike_are_mutually_exclusive() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    for kind in [ActionKind::Like, ActionKind::Dislike, ActionKind::Like] {
        posts.perform_action(ACTOR, POST, kind).await.unwrap();
    }

    let stats = posts.get_stats(POST).await.unwrap();
    assert_eq!(reactions(&stats), (1, 0, 0));
    assert_eq!(
        engine.ledger.rows_for(42, TargetKind::Post, 7),
        vec![ActionKind::Like]
    );

    let status = posts.get_user_action_status(ACTOR, POST).await.unwrap();
    assert!(status.has_liked);
    assert!(!status.has_disliked);
}

#[tokio::test]
async fn test_favorite_is_independent_of_like() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    let stats = posts.perform_action(ACTOR, POST, ActionKind::Favorite).await.unwrap();

    assert_eq!(reactions(&stats), (1, 0, 1));
    assert_eq!(
        sorted(engine.ledger.rows_for(42, TargetKind::Post, 7)),
        vec![ActionKind::Favorite, ActionKind::Like]
    );
}

#[tokio::test]
async fn test_counts_aggregate_across_actors() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    posts.perform_action(OTHER_ACTOR, POST, ActionKind::Like).await.unwrap();
    let stats = posts.perform_action(Id::new(44), POST, ActionKind::Dislike).await.unwrap();

    assert_eq!(reactions(&stats), (2, 1, 0));
}

#[tokio::test]
async fn test_cancel_removes_action_and_flag() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    posts.perform_action(OTHER_ACTOR, POST, ActionKind::Like).await.unwrap();
    let stats = posts.cancel_action(ACTOR, POST, ActionKind::Like).await.unwrap();

    assert_eq!(reactions(&stats), (1, 0, 0));
    assert!(engine.ledger.rows_for(42, TargetKind::Post, 7).is_empty());

    let status = posts.get_user_action_status(ACTOR, POST).await.unwrap();
    assert_eq!(status, UserActionStatus::default());
}

#[tokio::test]
async fn test_mutations_mark_target_dirty() {
    let engine = TestEngine::new().with_post(7).with_post(8);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    posts.incr_view_count(Id::new(8)).await.unwrap();

    assert_eq!(
        engine.cache.members(&keys::dirty_key(TargetKind::Post)),
        vec![Id::new(7), Id::new(8)]
    );
}

#[tokio::test]
async fn test_noop_calls_do_not_mark_dirty() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.cancel_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    assert!(engine.cache.members(&keys::dirty_key(TargetKind::Post)).is_empty());
}

// ============================================================================
// Views
// ============================================================================

#[tokio::test]
async fn test_views_accumulate_in_cache_only() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    for _ in 0..3 {
        posts.incr_view_count(POST).await.unwrap();
    }

    let stats = posts.get_stats(POST).await.unwrap();
    assert_eq!(stats.view_count, 3);
    assert_eq!(engine.targets.stored(TargetKind::Post, 7).unwrap().view_count, 0);
}

#[tokio::test]
async fn test_comment_views_are_rejected() {
    let engine = TestEngine::new().with_comment(5);
    let err = engine
        .ctx
        .comments()
        .incr_view_count(Id::new(5))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_comment_favorite_is_rejected() {
    let engine = TestEngine::new().with_comment(5);
    let comments = engine.ctx.comments();

    let err = comments
        .perform_action(ACTOR, Id::new(5), ActionKind::Favorite)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.error_code(), "UNSUPPORTED_ACTION");
    assert!(engine.ledger.is_empty());

    let stats = comments
        .perform_action(ACTOR, Id::new(5), ActionKind::Like)
        .await
        .unwrap();
    assert_eq!(reactions(&stats), (1, 0, 0));
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let engine = TestEngine::new();
    let err = engine
        .ctx
        .posts()
        .perform_action(ACTOR, Id::new(404), ActionKind::Like)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert_eq!(err.error_code(), "UNKNOWN_POST");
    assert!(engine.ledger.is_empty());
}

#[tokio::test]
async fn test_deleted_target_is_not_found() {
    let engine = TestEngine::new().with_comment(5);
    engine.targets.soft_delete(TargetKind::Comment, 5);

    let err = engine
        .ctx
        .comments()
        .get_stats(Id::new(5))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_COMMENT");
}

#[tokio::test]
async fn test_transaction_failure_leaves_cache_untouched() {
    let engine = TestEngine::new().with_post(7);
    engine.ledger.set_failing(true);

    let err = engine
        .ctx
        .posts()
        .perform_action(ACTOR, POST, ActionKind::Like)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert_eq!(err.error_code(), "TRANSACTION_FAILURE");
    assert!(!engine.cache.contains_key(&keys::stats_key(TargetKind::Post, POST)));
    assert!(engine.cache.members(&keys::dirty_key(TargetKind::Post)).is_empty());
}

// ============================================================================
// Cache degradation
// ============================================================================

#[tokio::test]
async fn test_cache_outage_does_not_fail_callers() {
    let engine = TestEngine::new();
    engine
        .targets
        .seed(TargetKind::Post, 7, CounterSnapshot::new(5, 1, 0, 20));
    engine.cache.set_unavailable(true);
    let posts = engine.ctx.posts();

    let stats = posts.perform_action(ACTOR, POST, ActionKind::Like).await.unwrap();
    assert_eq!(stats, CounterSnapshot::new(5, 1, 0, 20));
    assert_eq!(
        engine.ledger.rows_for(42, TargetKind::Post, 7),
        vec![ActionKind::Like]
    );

    let status = posts.get_user_action_status(ACTOR, POST).await.unwrap();
    assert!(status.has_liked);

    posts.incr_view_count(POST).await.unwrap();
    posts.cancel_action(ACTOR, POST, ActionKind::Like).await.unwrap();
}

#[tokio::test]
async fn test_flags_rebuilt_from_ledger_after_flush() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(ACTOR, POST, ActionKind::Dislike).await.unwrap();
    posts.perform_action(ACTOR, POST, ActionKind::Favorite).await.unwrap();
    engine.cache.flush();

    let status = posts.get_user_action_status(ACTOR, POST).await.unwrap();
    assert_eq!(
        status,
        UserActionStatus {
            has_liked: false,
            has_disliked: true,
            has_favorited: true,
        }
    );

    let flags_key = keys::user_action_key(TargetKind::Post, ACTOR, POST);
    assert_eq!(engine.cache.raw_field(&flags_key, "dislike").as_deref(), Some("1"));
    assert_eq!(engine.cache.raw_field(&flags_key, "like").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_ledger_seeded_action_is_reported() {
    let engine = TestEngine::new().with_comment(5);
    engine.ledger.seed(42, TargetKind::Comment, 5, ActionKind::Like);

    let status = engine
        .ctx
        .comments()
        .get_user_action_status(ACTOR, Id::new(5))
        .await
        .unwrap();
    assert!(status.has_liked);

    let stats = engine
        .ctx
        .comments()
        .perform_action(ACTOR, Id::new(5), ActionKind::Like)
        .await
        .unwrap();
    assert_eq!(engine.ledger.len(), 1);
    assert_eq!(reactions(&stats), (0, 0, 0));
}
