use dpl_schemas::{
    BlockedChange, DrawId, DrawPrizePoolDto, PlayTypePoolDto, PrizeOption, PrizeOptionDto,
    PrizePool, PrizeTierDto,
};

fn project_option(option: &PrizeOption) -> PrizeOptionDto {
    PrizeOptionDto {
        prize_id: option.identity.established(),
        name: option.name.clone(),
        cost_micros: option.cost_micros,
        redeem_valid_days: option.redeem_valid_days,
        description: option.description.clone(),
    }
}

/// Serialize a pool aggregate into the response shape. Iteration order is
/// the pool's own deterministic (BTreeMap) order.
pub fn project_pool(
    draw_id: DrawId,
    pool: &PrizePool,
    blocked_changes: Vec<BlockedChange>,
) -> DrawPrizePoolDto {
    DrawPrizePoolDto {
        draw_id,
        play_type_pools: pool
            .play_types
            .iter()
            .map(|(code, play_type)| PlayTypePoolDto {
                play_type_code: code.clone(),
                tiers: play_type
                    .tiers
                    .iter()
                    .map(|(tier, option)| PrizeTierDto {
                        tier: tier.clone(),
                        option: project_option(option),
                    })
                    .collect(),
            })
            .collect(),
        blocked_changes,
    }
}
