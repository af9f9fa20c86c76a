use std::collections::{BTreeMap, BTreeSet};

use dpl_schemas::{
    ApplyMode, AwardStatus, BlockedChange, BlockedReason, PrizeId, PrizeOption, PrizePool,
};

use crate::types::{Composition, PoolKey};

/// True when any status in the set protects the prize from destructive
/// changes. Expired and cancelled awards do not block.
pub fn award_blocks_change(statuses: &[AwardStatus]) -> bool {
    statuses.iter().any(|s| s.is_live())
}

fn flatten(pool: &PrizePool) -> BTreeMap<PoolKey, &PrizeOption> {
    let mut out = BTreeMap::new();
    for (code, ptp) in &pool.play_types {
        for (tier, option) in &ptp.tiers {
            out.insert(
                PoolKey {
                    code: code.clone(),
                    tier: tier.clone(),
                },
                option,
            );
        }
    }
    out
}

/// Candidate outcome for one key under the mode table.
enum Candidate<'a> {
    /// Current option carried over untouched.
    Keep(&'a PrizeOption),
    /// Desired option supersedes the current one (current may be absent,
    /// which is a plain add).
    Take {
        current: Option<&'a PrizeOption>,
        desired: &'a PrizeOption,
    },
    /// Current option dropped from the result.
    Remove(&'a PrizeOption),
}

fn candidate_for<'a>(
    mode: ApplyMode,
    current: Option<&'a PrizeOption>,
    desired: Option<&'a PrizeOption>,
) -> Candidate<'a> {
    match (current, desired) {
        (Some(c), Some(d)) => match mode {
            ApplyMode::Replace | ApplyMode::Merge => {
                // Identical content is not a change; skip the guard entirely
                // so a no-op re-apply cannot be blocked or re-minted.
                if c == d {
                    Candidate::Keep(c)
                } else {
                    Candidate::Take {
                        current: Some(c),
                        desired: d,
                    }
                }
            }
            ApplyMode::AddMissingOnly => Candidate::Keep(c),
        },
        (Some(c), None) => match mode {
            ApplyMode::Replace => Candidate::Remove(c),
            ApplyMode::Merge | ApplyMode::AddMissingOnly => Candidate::Keep(c),
        },
        (None, Some(d)) => Candidate::Take {
            current: None,
            desired: d,
        },
        (None, None) => unreachable!("key taken from the union of both pools"),
    }
}

/// The established identity a candidate take would destroy, if any.
///
/// Taking the desired option over a current one is destructive exactly when
/// the current option has an established identity that the desired option
/// does not carry forward. Same-id upserts are attribute updates of the same
/// logical prize and pass without a guard.
fn destroyed_identity(current: &PrizeOption, desired: &PrizeOption) -> Option<PrizeId> {
    let cur = current.identity.established()?;
    match desired.identity.established() {
        Some(d) if d == cur => None,
        _ => Some(cur),
    }
}

/// Established identities whose candidate outcome under `mode` is a removal
/// or an identity-reassigning upsert. The caller resolves award liveness for
/// these out-of-band (the lookups may run concurrently) and feeds the live
/// ones back into [`compose`] as `protected`.
pub fn destructive_prize_ids(
    current: &PrizePool,
    desired: &PrizePool,
    mode: ApplyMode,
) -> BTreeSet<PrizeId> {
    let cmap = flatten(current);
    let dmap = flatten(desired);

    let mut keys: BTreeSet<&PoolKey> = cmap.keys().collect();
    keys.extend(dmap.keys());

    let mut out = BTreeSet::new();
    for key in keys {
        match candidate_for(mode, cmap.get(key).copied(), dmap.get(key).copied()) {
            Candidate::Keep(_) => {}
            Candidate::Take {
                current: Some(c),
                desired: d,
            } => {
                if let Some(id) = destroyed_identity(c, d) {
                    out.insert(id);
                }
            }
            Candidate::Take { current: None, .. } => {}
            Candidate::Remove(c) => {
                if let Some(id) = c.identity.established() {
                    out.insert(id);
                }
            }
        }
    }
    out
}

/// Compose `desired` onto `current` under `mode`.
///
/// `protected` is the set of prize ids with live awards (resolved by the
/// caller from [`destructive_prize_ids`]). For every key whose candidate
/// outcome would destroy a protected identity, the current option is
/// retained instead and the key is recorded in `blocked` with reason
/// `AwardedPrizeConflict`.
///
/// Pure and deterministic: same inputs, same output, stable ordering.
/// Identity minting for `Unassigned` options is deliberately NOT done here —
/// the caller mints only for keys listed in `added`/`upserted`, so blocked
/// and unchanged candidates can never leave orphaned identities.
pub fn compose(
    current: &PrizePool,
    desired: &PrizePool,
    mode: ApplyMode,
    protected: &BTreeSet<PrizeId>,
) -> Composition {
    let cmap = flatten(current);
    let dmap = flatten(desired);

    let mut keys: BTreeSet<&PoolKey> = cmap.keys().collect();
    keys.extend(dmap.keys());

    let mut out = Composition {
        pool: PrizePool::empty(),
        blocked: Vec::new(),
        added: Vec::new(),
        upserted: Vec::new(),
        removed: Vec::new(),
    };

    for key in keys {
        let candidate = candidate_for(mode, cmap.get(key).copied(), dmap.get(key).copied());
        match candidate {
            Candidate::Keep(c) => {
                out.pool.insert(key.code.clone(), key.tier.clone(), c.clone());
            }
            Candidate::Take {
                current: Some(c),
                desired: d,
            } => {
                match destroyed_identity(c, d) {
                    Some(id) if protected.contains(&id) => {
                        out.pool.insert(key.code.clone(), key.tier.clone(), c.clone());
                        out.blocked.push(BlockedChange {
                            play_type_code: key.code.clone(),
                            tier: key.tier.clone(),
                            reason: BlockedReason::AwardedPrizeConflict,
                        });
                    }
                    _ => {
                        out.pool.insert(key.code.clone(), key.tier.clone(), d.clone());
                        out.upserted.push(key.clone());
                    }
                }
            }
            Candidate::Take {
                current: None,
                desired: d,
            } => {
                out.pool.insert(key.code.clone(), key.tier.clone(), d.clone());
                out.added.push(key.clone());
            }
            Candidate::Remove(c) => {
                match c.identity.established() {
                    Some(id) if protected.contains(&id) => {
                        out.pool.insert(key.code.clone(), key.tier.clone(), c.clone());
                        out.blocked.push(BlockedChange {
                            play_type_code: key.code.clone(),
                            tier: key.tier.clone(),
                            reason: BlockedReason::AwardedPrizeConflict,
                        });
                    }
                    _ => {
                        out.removed.push(key.clone());
                    }
                }
            }
        }
    }

    out
}
