use dpl_schemas::{BlockedChange, PlayTypeCode, PrizePool, TierLabel};

/// Flat addressing key for one option slot: `(play_type_code, tier)`.
/// Composition operates over the union of these keys across both pools.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PoolKey {
    pub code: PlayTypeCode,
    pub tier: TierLabel,
}

impl PoolKey {
    pub fn new(code: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            code: PlayTypeCode::new(code),
            tier: TierLabel::new(tier),
        }
    }
}

/// Result of composing a desired pool onto a current pool.
///
/// `blocked` is non-fatal evidence: those keys retained the current option
/// instead of the computed outcome. The change lists record which keys were
/// actually touched; keys in neither list were carried over unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub pool: PrizePool,
    pub blocked: Vec<BlockedChange>,
    pub added: Vec<PoolKey>,
    pub upserted: Vec<PoolKey>,
    pub removed: Vec<PoolKey>,
}

impl Composition {
    /// True when every candidate change was applied (nothing blocked).
    pub fn is_fully_applied(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.upserted.len() + self.removed.len()
    }
}
