//! dpl-schemas
//!
//! Shared domain and wire types for the draw prize pool service:
//! pools, templates, awards, apply modes, and the response DTO shapes.
//!
//! No business logic lives here. The composition rules are in `dpl-pool`,
//! template instantiation in `dpl-template`, command handling in
//! `dpl-service`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Id newtypes
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identity of a single scheduled drawing event.
    DrawId
);
uuid_id!(
    /// Identity of a persisted prize record. Awards reference this id.
    PrizeId
);
uuid_id!(
    /// Identity of a named, reusable prize pool template.
    TemplateId
);
uuid_id!(
    /// Identity of an issued award record.
    AwardId
);

// ---------------------------------------------------------------------------
// Play type / tier keys
// ---------------------------------------------------------------------------

/// Code for a distinct game variant within a draw (e.g. `"lottery"`).
/// Unique within a pool; must come from the draw's game-type catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayTypeCode(pub String);

impl PlayTypeCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rank/category label within a play type's prize structure (e.g. `"tier1"`).
/// Unique within a play-type pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierLabel(pub String);

impl TierLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Prize identity
// ---------------------------------------------------------------------------

/// Whether a prize option references a persisted prize record.
///
/// `Unassigned` means "not yet materialized": no prize row exists and no
/// award can reference it. An id is minted only when the option is actually
/// added or upserted into a draw's pool — never at template instantiation —
/// so blocked or unchanged candidates cannot leave orphaned identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<PrizeId>", into = "Option<PrizeId>")]
pub enum PrizeIdentity {
    Unassigned,
    Established(PrizeId),
}

impl PrizeIdentity {
    pub fn established(&self) -> Option<PrizeId> {
        match self {
            PrizeIdentity::Unassigned => None,
            PrizeIdentity::Established(id) => Some(*id),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, PrizeIdentity::Unassigned)
    }
}

impl From<Option<PrizeId>> for PrizeIdentity {
    fn from(v: Option<PrizeId>) -> Self {
        match v {
            None => PrizeIdentity::Unassigned,
            Some(id) => PrizeIdentity::Established(id),
        }
    }
}

impl From<PrizeIdentity> for Option<PrizeId> {
    fn from(v: PrizeIdentity) -> Self {
        v.established()
    }
}

// ---------------------------------------------------------------------------
// Prize pool aggregate
// ---------------------------------------------------------------------------

/// A single awardable prize attached to one tier of one play type.
///
/// Costs are integer micros (1e-6 currency units) so pool content compares
/// deterministically with no floating point at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeOption {
    pub identity: PrizeIdentity,
    pub name: String,
    pub cost_micros: i64,
    /// Days the prize stays redeemable after award. `None` = no expiry.
    pub redeem_valid_days: Option<u32>,
    pub description: Option<String>,
}

impl PrizeOption {
    pub fn new(name: impl Into<String>, cost_micros: i64) -> Self {
        Self {
            identity: PrizeIdentity::Unassigned,
            name: name.into(),
            cost_micros,
            redeem_valid_days: None,
            description: None,
        }
    }

    pub fn with_identity(mut self, id: PrizeId) -> Self {
        self.identity = PrizeIdentity::Established(id);
        self
    }

    pub fn with_redeem_valid_days(mut self, days: u32) -> Self {
        self.redeem_valid_days = Some(days);
        self
    }

    /// Attribute-only equality: everything except the identity.
    /// Used to compare pool *content* across applies where ids were re-minted.
    pub fn same_attributes(&self, other: &PrizeOption) -> bool {
        self.name == other.name
            && self.cost_micros == other.cost_micros
            && self.redeem_valid_days == other.redeem_valid_days
            && self.description == other.description
    }
}

/// Tier structure for one play type. Tier uniqueness is structural (map key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTypePool {
    pub tiers: BTreeMap<TierLabel, PrizeOption>,
}

/// Full prize pool for a draw, keyed by play-type code (unique, ordered
/// deterministically). Created empty with the draw; replaced/merged only via
/// apply-template or clone operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePool {
    pub play_types: BTreeMap<PlayTypeCode, PlayTypePool>,
}

impl PrizePool {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &PlayTypeCode, tier: &TierLabel) -> Option<&PrizeOption> {
        self.play_types.get(code)?.tiers.get(tier)
    }

    /// Insert an option at `(code, tier)`, creating the play-type entry as
    /// needed. Replaces any existing option at that key.
    pub fn insert(&mut self, code: PlayTypeCode, tier: TierLabel, option: PrizeOption) {
        self.play_types
            .entry(code)
            .or_default()
            .tiers
            .insert(tier, option);
    }

    /// Total option count across all play types.
    pub fn option_count(&self) -> usize {
        self.play_types.values().map(|p| p.tiers.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Draw aggregate
// ---------------------------------------------------------------------------

/// A single scheduled drawing. Identity is immutable; the pool is replaced
/// in place per apply under optimistic concurrency (`pool_version`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub draw_id: DrawId,
    pub game_type: String,
    /// Play-type codes valid for this draw's game type. Desired pools are
    /// validated against this catalog before any write.
    pub play_type_catalog: BTreeSet<PlayTypeCode>,
    /// Optimistic-concurrency token; bumped on every successful pool write.
    pub pool_version: i64,
    pub pool: PrizePool,
}

// ---------------------------------------------------------------------------
// Templates (read-only desired-state sources)
// ---------------------------------------------------------------------------

/// Desired content for one tier of one play type in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeOptionInput {
    /// Present = "same logical prize, update its attributes".
    /// Absent = a new prize whose id is minted only if it lands in the pool.
    pub prize_id: Option<PrizeId>,
    pub name: String,
    pub cost_micros: i64,
    pub redeem_valid_days: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTierInput {
    pub tier: TierLabel,
    pub option: PrizeOptionInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTypeInput {
    pub code: PlayTypeCode,
    pub tiers: Vec<PrizeTierInput>,
}

/// Named, reusable blueprint for a prize pool. Never mutated by apply
/// operations. The input tree is a plain Vec, so duplicate `(code, tier)`
/// keys are representable and must be rejected at instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawTemplate {
    pub template_id: TemplateId,
    pub name: String,
    pub play_types: Vec<PlayTypeInput>,
}

// ---------------------------------------------------------------------------
// Apply mode
// ---------------------------------------------------------------------------

/// Policy governing how desired pool state supersedes a draw's current pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Result mirrors the desired pool; keys only in the current pool are
    /// removed (subject to the award guard).
    Replace,
    /// Desired keys are upserted; current-only keys are kept.
    Merge,
    /// Only keys absent from the current pool are added; nothing existing
    /// is touched.
    AddMissingOnly,
}

impl ApplyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyMode::Replace => "replace",
            ApplyMode::Merge => "merge",
            ApplyMode::AddMissingOnly => "add_missing_only",
        }
    }
}

// ---------------------------------------------------------------------------
// Awards (external collaborator; only status-per-prize is consumed here)
// ---------------------------------------------------------------------------

/// Lifecycle status of an issued award, independent of the pool definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardStatus {
    Awarded,
    Redeemed,
    Expired,
    Cancelled,
}

impl AwardStatus {
    /// Live awards protect their prize from removal or identity reassignment.
    pub fn is_live(&self) -> bool {
        matches!(self, AwardStatus::Awarded | AwardStatus::Redeemed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AwardStatus::Awarded => "AWARDED",
            AwardStatus::Redeemed => "REDEEMED",
            AwardStatus::Expired => "EXPIRED",
            AwardStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AWARDED" => Some(AwardStatus::Awarded),
            "REDEEMED" => Some(AwardStatus::Redeemed),
            "EXPIRED" => Some(AwardStatus::Expired),
            "CANCELLED" => Some(AwardStatus::Cancelled),
            _ => None,
        }
    }
}

/// An issued award bound to a prize id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardReference {
    pub award_id: AwardId,
    pub prize_id: PrizeId,
    pub status: AwardStatus,
    pub awarded_at_utc: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Blocked changes (non-fatal policy conflicts)
// ---------------------------------------------------------------------------

/// Why a candidate change was blocked and the prior option retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    /// The current option's prize has a live (awarded/redeemed) award;
    /// removing it or reassigning its identity is never allowed.
    AwardedPrizeConflict,
}

/// One `(play_type, tier)` key whose candidate change was blocked.
/// Blocked changes are reported alongside a successful result — they never
/// fail the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedChange {
    pub play_type_code: PlayTypeCode,
    pub tier: TierLabel,
    pub reason: BlockedReason,
}

// ---------------------------------------------------------------------------
// Response DTO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeOptionDto {
    pub prize_id: Option<PrizeId>,
    pub name: String,
    pub cost_micros: i64,
    pub redeem_valid_days: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTierDto {
    pub tier: TierLabel,
    pub option: PrizeOptionDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTypePoolDto {
    pub play_type_code: PlayTypeCode,
    pub tiers: Vec<PrizeTierDto>,
}

/// Projection of a draw's pool returned by both apply operations and the
/// pool read endpoint. `blocked_changes` is empty on full success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawPrizePoolDto {
    pub draw_id: DrawId,
    pub play_type_pools: Vec<PlayTypePoolDto>,
    pub blocked_changes: Vec<BlockedChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_identity_serializes_as_nullable_id() {
        let id = PrizeId::new();
        let opt = PrizeOption::new("hat", 100).with_identity(id);
        let v = serde_json::to_value(&opt).unwrap();
        assert_eq!(v["identity"], serde_json::json!(id.0));

        let unassigned = PrizeOption::new("hat", 100);
        let v = serde_json::to_value(&unassigned).unwrap();
        assert!(v["identity"].is_null());
    }

    #[test]
    fn prize_identity_roundtrips_through_json() {
        let opt = PrizeOption::new("mug", 50).with_identity(PrizeId::new());
        let back: PrizeOption =
            serde_json::from_str(&serde_json::to_string(&opt).unwrap()).unwrap();
        assert_eq!(opt, back);
    }

    #[test]
    fn pool_roundtrips_through_json() {
        let mut pool = PrizePool::empty();
        pool.insert(
            PlayTypeCode::new("lottery"),
            TierLabel::new("tier1"),
            PrizeOption::new("grand", 1_000_000).with_redeem_valid_days(30),
        );
        let back: PrizePool =
            serde_json::from_str(&serde_json::to_string(&pool).unwrap()).unwrap();
        assert_eq!(pool, back);
    }

    #[test]
    fn apply_mode_uses_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&ApplyMode::AddMissingOnly).unwrap(),
            "\"add_missing_only\""
        );
        let m: ApplyMode = serde_json::from_str("\"replace\"").unwrap();
        assert_eq!(m, ApplyMode::Replace);
    }

    #[test]
    fn award_status_liveness() {
        assert!(AwardStatus::Awarded.is_live());
        assert!(AwardStatus::Redeemed.is_live());
        assert!(!AwardStatus::Expired.is_live());
        assert!(!AwardStatus::Cancelled.is_live());
    }

    #[test]
    fn award_status_parse_matches_as_str() {
        for st in [
            AwardStatus::Awarded,
            AwardStatus::Redeemed,
            AwardStatus::Expired,
            AwardStatus::Cancelled,
        ] {
            assert_eq!(AwardStatus::parse(st.as_str()), Some(st));
        }
        assert_eq!(AwardStatus::parse("VOID"), None);
    }
}
