//! dpl-template
//!
//! Template instantiation: converts a read-only [`DrawTemplate`] input tree
//! into a concrete desired [`PrizePool`] for the composition engine.
//!
//! Identity rules:
//! - An input with `prize_id` present instantiates as `Established(id)` —
//!   "same logical prize, update its attributes".
//! - An input with no `prize_id` instantiates as `Unassigned`; an id is
//!   minted downstream only if the option is actually added or upserted,
//!   never here.
//!
//! Pure. The template is never mutated.

use std::collections::BTreeSet;
use std::fmt;

use dpl_schemas::{
    DrawTemplate, PlayTypeCode, PrizeOption, PrizeOptionInput, PrizePool, TierLabel,
};

/// Structural failure while instantiating a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiateError {
    /// The template repeats a `(play_type_code, tier)` key.
    DuplicateTierInPlayType { code: PlayTypeCode, tier: TierLabel },
    /// A template play-type code is not in the draw's game-type catalog.
    UnknownPlayTypeCode { code: PlayTypeCode },
}

impl fmt::Display for InstantiateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstantiateError::DuplicateTierInPlayType { code, tier } => {
                write!(f, "template repeats tier {tier} in play type {code}")
            }
            InstantiateError::UnknownPlayTypeCode { code } => {
                write!(f, "template uses unknown play type code: {code}")
            }
        }
    }
}

impl std::error::Error for InstantiateError {}

fn instantiate_option(input: &PrizeOptionInput) -> PrizeOption {
    PrizeOption {
        identity: input.prize_id.into(),
        name: input.name.clone(),
        cost_micros: input.cost_micros,
        redeem_valid_days: input.redeem_valid_days,
        description: input.description.clone(),
    }
}

/// Instantiate `template` into a desired pool, validated against `catalog`.
///
/// Fails fast on the first structural violation; the composition engine and
/// per-option validation run downstream on the instantiated pool.
pub fn instantiate(
    template: &DrawTemplate,
    catalog: &BTreeSet<PlayTypeCode>,
) -> Result<PrizePool, InstantiateError> {
    let mut pool = PrizePool::empty();
    let mut seen: BTreeSet<(&PlayTypeCode, &TierLabel)> = BTreeSet::new();

    for play_type in &template.play_types {
        if !catalog.contains(&play_type.code) {
            return Err(InstantiateError::UnknownPlayTypeCode {
                code: play_type.code.clone(),
            });
        }
        for entry in &play_type.tiers {
            if !seen.insert((&play_type.code, &entry.tier)) {
                return Err(InstantiateError::DuplicateTierInPlayType {
                    code: play_type.code.clone(),
                    tier: entry.tier.clone(),
                });
            }
            pool.insert(
                play_type.code.clone(),
                entry.tier.clone(),
                instantiate_option(&entry.option),
            );
        }
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_schemas::{PlayTypeInput, PrizeId, PrizeIdentity, PrizeTierInput, TemplateId};

    fn tier_input(tier: &str, prize_id: Option<PrizeId>, cost: i64) -> PrizeTierInput {
        PrizeTierInput {
            tier: TierLabel::new(tier),
            option: PrizeOptionInput {
                prize_id,
                name: format!("prize {tier}"),
                cost_micros: cost,
                redeem_valid_days: Some(30),
                description: None,
            },
        }
    }

    fn template(play_types: Vec<PlayTypeInput>) -> DrawTemplate {
        DrawTemplate {
            template_id: TemplateId::new(),
            name: "spring".to_string(),
            play_types,
        }
    }

    fn catalog(codes: &[&str]) -> BTreeSet<PlayTypeCode> {
        codes.iter().map(|c| PlayTypeCode::new(*c)).collect()
    }

    #[test]
    fn carries_present_prize_id_and_leaves_absent_unassigned() {
        let p1 = PrizeId::new();
        let t = template(vec![PlayTypeInput {
            code: PlayTypeCode::new("lottery"),
            tiers: vec![tier_input("tier1", Some(p1), 100), tier_input("tier2", None, 50)],
        }]);

        let pool = instantiate(&t, &catalog(&["lottery"])).unwrap();

        let tier1 = pool
            .get(&PlayTypeCode::new("lottery"), &TierLabel::new("tier1"))
            .unwrap();
        assert_eq!(tier1.identity, PrizeIdentity::Established(p1));

        let tier2 = pool
            .get(&PlayTypeCode::new("lottery"), &TierLabel::new("tier2"))
            .unwrap();
        assert_eq!(tier2.identity, PrizeIdentity::Unassigned);
    }

    #[test]
    fn duplicate_tier_in_same_play_type_rejected() {
        let t = template(vec![PlayTypeInput {
            code: PlayTypeCode::new("lottery"),
            tiers: vec![tier_input("tier1", None, 100), tier_input("tier1", None, 50)],
        }]);

        let err = instantiate(&t, &catalog(&["lottery"])).unwrap_err();
        assert_eq!(
            err,
            InstantiateError::DuplicateTierInPlayType {
                code: PlayTypeCode::new("lottery"),
                tier: TierLabel::new("tier1"),
            }
        );
    }

    #[test]
    fn duplicate_detection_spans_repeated_play_type_blocks() {
        // Same (code, tier) key split across two blocks of the same code.
        let t = template(vec![
            PlayTypeInput {
                code: PlayTypeCode::new("lottery"),
                tiers: vec![tier_input("tier1", None, 100)],
            },
            PlayTypeInput {
                code: PlayTypeCode::new("lottery"),
                tiers: vec![tier_input("tier1", None, 50)],
            },
        ]);

        let err = instantiate(&t, &catalog(&["lottery"])).unwrap_err();
        assert!(matches!(err, InstantiateError::DuplicateTierInPlayType { .. }));
    }

    #[test]
    fn same_tier_label_in_different_play_types_is_allowed() {
        let t = template(vec![
            PlayTypeInput {
                code: PlayTypeCode::new("lottery"),
                tiers: vec![tier_input("tier1", None, 100)],
            },
            PlayTypeInput {
                code: PlayTypeCode::new("raffle"),
                tiers: vec![tier_input("tier1", None, 20)],
            },
        ]);

        let pool = instantiate(&t, &catalog(&["lottery", "raffle"])).unwrap();
        assert_eq!(pool.option_count(), 2);
    }

    #[test]
    fn code_outside_catalog_rejected() {
        let t = template(vec![PlayTypeInput {
            code: PlayTypeCode::new("scratchcard"),
            tiers: vec![tier_input("tier1", None, 100)],
        }]);

        let err = instantiate(&t, &catalog(&["lottery"])).unwrap_err();
        assert_eq!(
            err,
            InstantiateError::UnknownPlayTypeCode {
                code: PlayTypeCode::new("scratchcard"),
            }
        );
    }

    #[test]
    fn template_is_not_mutated() {
        let t = template(vec![PlayTypeInput {
            code: PlayTypeCode::new("lottery"),
            tiers: vec![tier_input("tier1", None, 100)],
        }]);
        let before = t.clone();
        let _ = instantiate(&t, &catalog(&["lottery"])).unwrap();
        assert_eq!(t, before);
    }
}
