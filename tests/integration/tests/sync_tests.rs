//! Reconciliation job tests
//!
//! Run with: cargo test -p integration-tests --test sync_tests

use forum_cache::keys;
use forum_core::{ActionKind, CounterSnapshot, Id, StatsCache, TargetKind, TargetPolicy};
use forum_service::SyncReport;
use integration_tests::{reactions, TestEngine};

async fn mark_dirty(engine: &TestEngine, kind: TargetKind, ids: &[i64]) {
    for id in ids {
        engine
            .cache
            .mark_dirty(&keys::dirty_key(kind), Id::new(*id))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_sync_rewrites_live_targets_and_drops_deleted_ones() {
    let engine = TestEngine::new().with_post(7).with_post(8).with_post(9);
    engine.targets.soft_delete(TargetKind::Post, 8);
    engine.targets.soft_delete(TargetKind::Post, 9);
    engine.ledger.seed(1, TargetKind::Post, 7, ActionKind::Like);
    engine.ledger.seed(2, TargetKind::Post, 7, ActionKind::Like);
    engine
        .cache
        .set_fields(&keys::stats_key(TargetKind::Post, Id::new(8)), &[("like_count", 4)])
        .await
        .unwrap();
    mark_dirty(&engine, TargetKind::Post, &[7, 8, 9]).await;

    let report = engine
        .ctx
        .sync()
        .sync_target_kind(TargetPolicy::POST)
        .await
        .unwrap();

    assert_eq!(
        report,
        SyncReport {
            synced: 1,
            tombstoned: 2,
            failed: 0,
        }
    );
    assert_eq!(
        reactions(&engine.targets.stored(TargetKind::Post, 7).unwrap()),
        (2, 0, 0)
    );
    assert_eq!(
        engine.targets.stored(TargetKind::Post, 8).unwrap(),
        CounterSnapshot::default()
    );
    assert!(!engine
        .cache
        .contains_key(&keys::stats_key(TargetKind::Post, Id::new(8))));
    assert!(engine.cache.members(&keys::dirty_key(TargetKind::Post)).is_empty());
}

#[tokio::test]
async fn test_sync_repairs_drifted_cache() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();
    for actor in 1..=3 {
        posts.perform_action(Id::new(actor), Id::new(7), ActionKind::Like).await.unwrap();
    }
    posts.perform_action(Id::new(4), Id::new(7), ActionKind::Favorite).await.unwrap();

    let stats_key = keys::stats_key(TargetKind::Post, Id::new(7));
    engine
        .cache
        .set_fields(&stats_key, &[("like_count", 99), ("dislike_count", -2)])
        .await
        .unwrap();

    let report = engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(report.synced, 1);

    let expected = CounterSnapshot::new(3, 0, 1, 0);
    assert_eq!(engine.targets.stored(TargetKind::Post, 7).unwrap(), expected);
    assert_eq!(posts.get_stats(Id::new(7)).await.unwrap(), expected);
    assert_eq!(engine.cache.raw_field(&stats_key, "like_count").as_deref(), Some("3"));
}

#[tokio::test]
async fn test_sync_persists_cached_views() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();
    for _ in 0..4 {
        posts.incr_view_count(Id::new(7)).await.unwrap();
    }

    engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(engine.targets.stored(TargetKind::Post, 7).unwrap().view_count, 4);
}

#[tokio::test]
async fn test_sync_keeps_persisted_views_after_cache_flush() {
    let engine = TestEngine::new();
    engine
        .targets
        .seed(TargetKind::Post, 7, CounterSnapshot::new(0, 0, 0, 10));
    engine.ledger.seed(1, TargetKind::Post, 7, ActionKind::Dislike);
    engine.cache.flush();
    mark_dirty(&engine, TargetKind::Post, &[7]).await;

    engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(
        engine.targets.stored(TargetKind::Post, 7).unwrap(),
        CounterSnapshot::new(0, 1, 0, 10)
    );
}

#[tokio::test]
async fn test_sync_covers_comments() {
    let engine = TestEngine::new().with_comment(5);
    let comments = engine.ctx.comments();
    comments.perform_action(Id::new(1), Id::new(5), ActionKind::Like).await.unwrap();
    comments.perform_action(Id::new(2), Id::new(5), ActionKind::Dislike).await.unwrap();

    let report = engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(
        engine.targets.stored(TargetKind::Comment, 5).unwrap(),
        CounterSnapshot::new(1, 1, 0, 0)
    );
}

#[tokio::test]
async fn test_cancel_after_sync_reports_ledger_counts() {
    let engine = TestEngine::new().with_post(7);
    let posts = engine.ctx.posts();

    posts.perform_action(Id::new(42), Id::new(7), ActionKind::Like).await.unwrap();
    engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(reactions(&engine.targets.stored(TargetKind::Post, 7).unwrap()), (1, 0, 0));

    let stats = posts.cancel_action(Id::new(42), Id::new(7), ActionKind::Like).await.unwrap();
    assert_eq!(reactions(&stats), (0, 0, 0));
    assert!(engine.ledger.is_empty());
    assert_eq!(
        engine
            .cache
            .raw_field(&keys::stats_key(TargetKind::Post, Id::new(7)), "like_count")
            .as_deref(),
        Some("0")
    );

    engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(reactions(&engine.targets.stored(TargetKind::Post, 7).unwrap()), (0, 0, 0));
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let engine = TestEngine::new().with_post(7);
    engine
        .ctx
        .posts()
        .perform_action(Id::new(1), Id::new(7), ActionKind::Like)
        .await
        .unwrap();

    let first = engine.ctx.sync().sync_all().await.unwrap();
    let stored = engine.targets.stored(TargetKind::Post, 7).unwrap();

    mark_dirty(&engine, TargetKind::Post, &[7]).await;
    let second = engine.ctx.sync().with_batch_size(1).sync_all().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.targets.stored(TargetKind::Post, 7).unwrap(), stored);

    let third = engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(third.total(), 0);
}

#[tokio::test]
async fn test_sync_batches_every_dirty_id() {
    let mut engine = TestEngine::new();
    for id in 1..=5 {
        engine = engine.with_post(id);
        engine.ledger.seed(100, TargetKind::Post, id, ActionKind::Favorite);
    }
    mark_dirty(&engine, TargetKind::Post, &[1, 2, 3, 4, 5]).await;

    let report = engine.ctx.sync().with_batch_size(2).sync_all().await.unwrap();
    assert_eq!(report.synced, 5);
    for id in 1..=5 {
        assert_eq!(engine.targets.stored(TargetKind::Post, id).unwrap().favorite_count, 1);
    }
}

#[tokio::test]
async fn test_failed_target_stays_dirty() {
    let engine = TestEngine::new().with_post(7);
    engine
        .ctx
        .posts()
        .perform_action(Id::new(1), Id::new(7), ActionKind::Like)
        .await
        .unwrap();
    engine.targets.set_unavailable(true);

    let report = engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(
        engine.cache.members(&keys::dirty_key(TargetKind::Post)),
        vec![Id::new(7)]
    );

    engine.targets.set_unavailable(false);
    let report = engine.ctx.sync().sync_all().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(engine.targets.stored(TargetKind::Post, 7).unwrap().like_count, 1);
}

#[tokio::test]
async fn test_unreadable_dirty_set_fails_the_run() {
    let engine = TestEngine::new().with_post(7);
    engine.cache.set_unavailable(true);

    let err = engine.ctx.sync().sync_all().await.unwrap_err();
    assert!(err.is_cache());
}
