//! Test helpers: a fully wired engine on in-memory stores

use forum_cache::{InMemoryStatsCache, InMemoryTaskBroker};
use forum_core::{ActionKind, CounterSnapshot, TargetKind};
use forum_service::ServiceContext;
use std::sync::Arc;
use std::time::Duration;

use crate::fixtures::{InMemoryLedger, InMemoryTargets};

/// Coordinator, reconciliation, and broker sharing one set of fakes
pub struct TestEngine {
    pub ctx: Arc<ServiceContext>,
    pub targets: Arc<InMemoryTargets>,
    pub ledger: Arc<InMemoryLedger>,
    pub cache: Arc<InMemoryStatsCache>,
    pub broker: Arc<InMemoryTaskBroker>,
}

impl TestEngine {
    pub fn new() -> Self {
        let targets = Arc::new(InMemoryTargets::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let cache = Arc::new(InMemoryStatsCache::new());
        let ctx = Arc::new(ServiceContext::new(
            targets.clone(),
            ledger.clone(),
            cache.clone(),
        ));

        Self {
            ctx,
            targets,
            ledger,
            cache,
            broker: Arc::new(InMemoryTaskBroker::new()),
        }
    }

    /// Create a post with zeroed counters
    pub fn with_post(self, id: i64) -> Self {
        self.targets.seed(TargetKind::Post, id, CounterSnapshot::default());
        self
    }

    /// Create a comment with zeroed counters
    pub fn with_comment(self, id: i64) -> Self {
        self.targets
            .seed(TargetKind::Comment, id, CounterSnapshot::default());
        self
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// `{like, dislike, favorite}` of a snapshot, for compact assertions
pub fn reactions(snapshot: &CounterSnapshot) -> (i64, i64, i64) {
    (
        snapshot.like_count,
        snapshot.dislike_count,
        snapshot.favorite_count,
    )
}

/// Ledger rows sorted for comparison
pub fn sorted(mut kinds: Vec<ActionKind>) -> Vec<ActionKind> {
    kinds.sort_by_key(|kind| kind.as_str());
    kinds
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
