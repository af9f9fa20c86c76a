//! dpl-testkit
//!
//! In-memory implementations of the service store traits plus fixture
//! builders, used by scenario tests in `dpl-service` and `dpl-daemon`.
//! No persistence, no network; state lives behind tokio RwLocks so the
//! same instance can be shared across handlers and assertions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use dpl_schemas::{
    AwardStatus, Draw, DrawId, DrawTemplate, PlayTypeCode, PrizeId, PrizeOption, PrizePool,
    TemplateId, TierLabel,
};
use dpl_service::{AwardStore, DrawStore, Stores, TemplateStore, WriteOutcome};

// ---------------------------------------------------------------------------
// In-memory stores
// ---------------------------------------------------------------------------

/// One in-memory backend implementing all three store traits.
#[derive(Default)]
pub struct MemStores {
    draws: RwLock<BTreeMap<DrawId, Draw>>,
    templates: RwLock<BTreeMap<TemplateId, DrawTemplate>>,
    awards: RwLock<BTreeMap<PrizeId, Vec<AwardStatus>>>,
}

impl MemStores {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bundle this backend into the service's store handles.
    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            draws: Arc::clone(self) as Arc<dyn DrawStore>,
            templates: Arc::clone(self) as Arc<dyn TemplateStore>,
            awards: Arc::clone(self) as Arc<dyn AwardStore>,
        }
    }

    pub async fn insert_draw(&self, draw: Draw) {
        self.draws.write().await.insert(draw.draw_id, draw);
    }

    pub async fn insert_template(&self, template: DrawTemplate) {
        self.templates
            .write()
            .await
            .insert(template.template_id, template);
    }

    pub async fn insert_award(&self, prize_id: PrizeId, status: AwardStatus) {
        self.awards
            .write()
            .await
            .entry(prize_id)
            .or_default()
            .push(status);
    }

    /// Snapshot a draw for assertions.
    pub async fn draw(&self, draw_id: DrawId) -> Option<Draw> {
        self.draws.read().await.get(&draw_id).cloned()
    }
}

#[async_trait]
impl DrawStore for MemStores {
    async fn fetch_draw(&self, draw_id: DrawId) -> Result<Option<Draw>> {
        Ok(self.draws.read().await.get(&draw_id).cloned())
    }

    async fn write_pool(
        &self,
        draw_id: DrawId,
        expected_version: i64,
        pool: &PrizePool,
    ) -> Result<WriteOutcome> {
        let mut draws = self.draws.write().await;
        let Some(draw) = draws.get_mut(&draw_id) else {
            return Ok(WriteOutcome::VersionConflict);
        };
        if draw.pool_version != expected_version {
            return Ok(WriteOutcome::VersionConflict);
        }
        draw.pool = pool.clone();
        draw.pool_version += 1;
        Ok(WriteOutcome::Written {
            new_version: draw.pool_version,
        })
    }
}

#[async_trait]
impl TemplateStore for MemStores {
    async fn fetch_template(&self, template_id: TemplateId) -> Result<Option<DrawTemplate>> {
        Ok(self.templates.read().await.get(&template_id).cloned())
    }
}

#[async_trait]
impl AwardStore for MemStores {
    async fn statuses_for_prize(&self, prize_id: PrizeId) -> Result<Vec<AwardStatus>> {
        Ok(self
            .awards
            .read()
            .await
            .get(&prize_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Conflict-injecting draw store
// ---------------------------------------------------------------------------

/// Wraps a [`DrawStore`] and refuses the first `n` conditional writes with a
/// version conflict, then delegates. Exercises the bounded retry loop.
pub struct ConflictingDrawStore {
    inner: Arc<dyn DrawStore>,
    conflicts_remaining: AtomicU32,
    pub conflicts_served: AtomicU32,
}

impl ConflictingDrawStore {
    pub fn new(inner: Arc<dyn DrawStore>, conflicts: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            conflicts_remaining: AtomicU32::new(conflicts),
            conflicts_served: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl DrawStore for ConflictingDrawStore {
    async fn fetch_draw(&self, draw_id: DrawId) -> Result<Option<Draw>> {
        self.inner.fetch_draw(draw_id).await
    }

    async fn write_pool(
        &self,
        draw_id: DrawId,
        expected_version: i64,
        pool: &PrizePool,
    ) -> Result<WriteOutcome> {
        let remaining = self.conflicts_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts_remaining.store(remaining - 1, Ordering::SeqCst);
            self.conflicts_served.fetch_add(1, Ordering::SeqCst);
            return Ok(WriteOutcome::VersionConflict);
        }
        self.inner.write_pool(draw_id, expected_version, pool).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn catalog(codes: &[&str]) -> BTreeSet<PlayTypeCode> {
    codes.iter().map(|c| PlayTypeCode::new(*c)).collect()
}

/// A fresh draw with the given catalog and pool at version 0.
pub fn draw(draw_id: DrawId, codes: &[&str], pool: PrizePool) -> Draw {
    Draw {
        draw_id,
        game_type: "standard".to_string(),
        play_type_catalog: catalog(codes),
        pool_version: 0,
        pool,
    }
}

/// Build a pool from `(code, tier, option)` triples.
pub fn pool(entries: &[(&str, &str, PrizeOption)]) -> PrizePool {
    let mut p = PrizePool::empty();
    for (code, tier, option) in entries {
        p.insert(
            PlayTypeCode::new(*code),
            TierLabel::new(*tier),
            option.clone(),
        );
    }
    p
}
