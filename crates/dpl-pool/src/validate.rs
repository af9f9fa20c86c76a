use std::collections::BTreeSet;
use std::fmt;

use dpl_schemas::{PlayTypeCode, PrizeOption, PrizePool, TierLabel};

/// Field-level or structural violation found in a candidate pool.
///
/// Every variant carries the offending key so callers can surface exactly
/// which slot failed. Any violation aborts the whole apply operation before
/// persistence (all-or-nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `cost_micros` must be ≥ 0.
    InvalidCost {
        code: PlayTypeCode,
        tier: TierLabel,
        cost_micros: i64,
    },
    /// `redeem_valid_days` must be absent or strictly positive.
    InvalidRedeemValidDays {
        code: PlayTypeCode,
        tier: TierLabel,
        days: u32,
    },
    /// `name` must be non-empty.
    InvalidName { code: PlayTypeCode, tier: TierLabel },
    /// Play-type code not present in the draw's game-type catalog.
    UnknownPlayTypeCode { code: PlayTypeCode },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCost {
                code,
                tier,
                cost_micros,
            } => write!(
                f,
                "invalid cost at {code}/{tier}: {cost_micros} (must be >= 0)"
            ),
            ValidationError::InvalidRedeemValidDays { code, tier, days } => write!(
                f,
                "invalid redeem_valid_days at {code}/{tier}: {days} (must be > 0 when set)"
            ),
            ValidationError::InvalidName { code, tier } => {
                write!(f, "empty prize name at {code}/{tier}")
            }
            ValidationError::UnknownPlayTypeCode { code } => {
                write!(f, "unknown play type code: {code}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Per-option checks, order-independent.
pub fn validate_option(
    code: &PlayTypeCode,
    tier: &TierLabel,
    option: &PrizeOption,
) -> Result<(), ValidationError> {
    if option.cost_micros < 0 {
        return Err(ValidationError::InvalidCost {
            code: code.clone(),
            tier: tier.clone(),
            cost_micros: option.cost_micros,
        });
    }
    if let Some(days) = option.redeem_valid_days {
        if days == 0 {
            return Err(ValidationError::InvalidRedeemValidDays {
                code: code.clone(),
                tier: tier.clone(),
                days,
            });
        }
    }
    if option.name.trim().is_empty() {
        return Err(ValidationError::InvalidName {
            code: code.clone(),
            tier: tier.clone(),
        });
    }
    Ok(())
}

/// Validate every option in the pool plus pool-level catalog membership.
///
/// Tier uniqueness within a play type is structural (`PrizePool` is
/// map-keyed) and is enforced at template instantiation where duplicate
/// inputs are still representable.
pub fn validate_pool(
    pool: &PrizePool,
    catalog: &BTreeSet<PlayTypeCode>,
) -> Result<(), ValidationError> {
    for (code, ptp) in &pool.play_types {
        if !catalog.contains(code) {
            return Err(ValidationError::UnknownPlayTypeCode { code: code.clone() });
        }
        for (tier, option) in &ptp.tiers {
            validate_option(code, tier, option)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(codes: &[&str]) -> BTreeSet<PlayTypeCode> {
        codes.iter().map(|c| PlayTypeCode::new(*c)).collect()
    }

    fn valid_pool() -> PrizePool {
        let mut pool = PrizePool::empty();
        pool.insert(
            PlayTypeCode::new("lottery"),
            TierLabel::new("tier1"),
            PrizeOption::new("grand", 1_000_000).with_redeem_valid_days(30),
        );
        pool
    }

    #[test]
    fn valid_pool_passes() {
        assert!(validate_pool(&valid_pool(), &catalog(&["lottery"])).is_ok());
    }

    #[test]
    fn negative_cost_rejected_with_offending_key() {
        let mut pool = valid_pool();
        pool.insert(
            PlayTypeCode::new("lottery"),
            TierLabel::new("tier2"),
            PrizeOption::new("broke", -1),
        );
        let err = validate_pool(&pool, &catalog(&["lottery"])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidCost {
                code: PlayTypeCode::new("lottery"),
                tier: TierLabel::new("tier2"),
                cost_micros: -1,
            }
        );
    }

    #[test]
    fn zero_redeem_valid_days_rejected() {
        let mut pool = PrizePool::empty();
        pool.insert(
            PlayTypeCode::new("lottery"),
            TierLabel::new("tier1"),
            PrizeOption::new("grand", 10).with_redeem_valid_days(0),
        );
        let err = validate_pool(&pool, &catalog(&["lottery"])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRedeemValidDays { days: 0, .. }));
    }

    #[test]
    fn absent_redeem_valid_days_is_fine() {
        let mut pool = PrizePool::empty();
        pool.insert(
            PlayTypeCode::new("lottery"),
            TierLabel::new("tier1"),
            PrizeOption::new("grand", 10),
        );
        assert!(validate_pool(&pool, &catalog(&["lottery"])).is_ok());
    }

    #[test]
    fn blank_name_rejected() {
        let mut pool = PrizePool::empty();
        pool.insert(
            PlayTypeCode::new("lottery"),
            TierLabel::new("tier1"),
            PrizeOption::new("   ", 10),
        );
        let err = validate_pool(&pool, &catalog(&["lottery"])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidName { .. }));
    }

    #[test]
    fn code_outside_catalog_rejected() {
        let err = validate_pool(&valid_pool(), &catalog(&["raffle"])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownPlayTypeCode {
                code: PlayTypeCode::new("lottery")
            }
        );
    }
}
