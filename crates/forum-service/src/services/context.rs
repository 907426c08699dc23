//! Service context - dependency container for services
//!
//! Holds the repositories and the stats cache. Every dependency is a trait
//! object so production adapters and in-memory fakes are interchangeable.

use std::sync::Arc;

use forum_core::traits::{ActionRepository, StatsCache, TargetRepository};
use forum_core::{TargetKind, TargetPolicy};

use super::interaction::InteractionService;
use super::sync::SyncService;

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    target_repo: Arc<dyn TargetRepository>,
    action_repo: Arc<dyn ActionRepository>,

    // Cache
    stats_cache: Arc<dyn StatsCache>,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        target_repo: Arc<dyn TargetRepository>,
        action_repo: Arc<dyn ActionRepository>,
        stats_cache: Arc<dyn StatsCache>,
    ) -> Self {
        Self {
            target_repo,
            action_repo,
            stats_cache,
        }
    }

    // === Repositories ===

    /// Get the target repository
    pub fn target_repo(&self) -> &dyn TargetRepository {
        self.target_repo.as_ref()
    }

    /// Get the action ledger repository
    pub fn action_repo(&self) -> &dyn ActionRepository {
        self.action_repo.as_ref()
    }

    // === Cache ===

    /// Get the stats cache
    pub fn stats_cache(&self) -> &dyn StatsCache {
        self.stats_cache.as_ref()
    }

    // === Services ===

    /// Coordinator for post interactions
    pub fn posts(&self) -> InteractionService<'_> {
        InteractionService::new(self, TargetPolicy::POST)
    }

    /// Coordinator for comment interactions
    pub fn comments(&self) -> InteractionService<'_> {
        InteractionService::new(self, TargetPolicy::COMMENT)
    }

    /// Coordinator for an arbitrary target kind
    pub fn interactions(&self, kind: TargetKind) -> InteractionService<'_> {
        InteractionService::new(self, TargetPolicy::for_kind(kind))
    }

    /// Reconciliation job with the default batch size
    pub fn sync(&self) -> SyncService<'_> {
        SyncService::new(self)
    }
}
