//! Store boundaries consumed by the command handlers.
//!
//! Implementations must be object-safe (`Arc<dyn ...>`) and `Send + Sync`;
//! `dpl-db` provides the Postgres implementations, `dpl-testkit` the
//! in-memory ones used by scenario tests.

use anyhow::Result;
use async_trait::async_trait;

use dpl_schemas::{AwardStatus, Draw, DrawId, DrawTemplate, PrizeId, PrizePool, TemplateId};

/// Outcome of a conditional pool write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The pool was written; the aggregate now carries `new_version`.
    Written { new_version: i64 },
    /// Someone else wrote between our read and our write. The caller retries
    /// from a fresh read; nothing was persisted.
    VersionConflict,
}

/// Versioned read / conditional write over draw aggregates.
#[async_trait]
pub trait DrawStore: Send + Sync {
    /// Fetch a draw with its current pool and pool version. `None` when the
    /// draw does not exist or is not visible to the caller.
    async fn fetch_draw(&self, draw_id: DrawId) -> Result<Option<Draw>>;

    /// Write `pool` iff the stored version still equals `expected_version`.
    async fn write_pool(
        &self,
        draw_id: DrawId,
        expected_version: i64,
        pool: &PrizePool,
    ) -> Result<WriteOutcome>;
}

/// Read-only template catalog lookup.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn fetch_template(&self, template_id: TemplateId) -> Result<Option<DrawTemplate>>;
}

/// Award existence/status query per prize id. Only statuses are consumed;
/// the redemption lifecycle itself is an external collaborator.
#[async_trait]
pub trait AwardStore: Send + Sync {
    async fn statuses_for_prize(&self, prize_id: PrizeId) -> Result<Vec<AwardStatus>>;
}
