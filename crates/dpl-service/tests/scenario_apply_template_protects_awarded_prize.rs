//! End-to-end command scenario: a template rollout against a draw whose
//! current pool has a prize with a live award. The protected slot keeps its
//! prior state and is reported; everything else applies.

use dpl_schemas::{
    ApplyMode, AwardStatus, BlockedReason, DrawId, DrawTemplate, PlayTypeCode, PlayTypeInput,
    PrizeId, PrizeOption, PrizeOptionInput, PrizeTierInput, TemplateId, TierLabel,
};
use dpl_service::{apply_template, ApplyError, ApplyTemplateCommand};
use dpl_testkit::{draw, pool, MemStores};

fn tier_input(tier: &str, prize_id: Option<PrizeId>, name: &str, cost: i64) -> PrizeTierInput {
    PrizeTierInput {
        tier: TierLabel::new(tier),
        option: PrizeOptionInput {
            prize_id,
            name: name.to_string(),
            cost_micros: cost,
            redeem_valid_days: None,
            description: None,
        },
    }
}

fn spring_template() -> DrawTemplate {
    DrawTemplate {
        template_id: TemplateId::new(),
        name: "spring".to_string(),
        play_types: vec![PlayTypeInput {
            code: PlayTypeCode::new("lottery"),
            tiers: vec![
                tier_input("tier1", None, "grand", 150),
                tier_input("tier2", None, "runner up", 50),
            ],
        }],
    }
}

async fn seeded() -> (std::sync::Arc<MemStores>, DrawId, TemplateId, PrizeId) {
    let backend = MemStores::new();
    let p1 = PrizeId::new();
    let draw_id = DrawId::new();

    backend
        .insert_draw(draw(
            draw_id,
            &["lottery"],
            pool(&[(
                "lottery",
                "tier1",
                PrizeOption::new("grand", 100).with_identity(p1),
            )]),
        ))
        .await;

    let template = spring_template();
    let template_id = template.template_id;
    backend.insert_template(template).await;

    (backend, draw_id, template_id, p1)
}

#[tokio::test]
async fn replace_keeps_awarded_tier_adds_new_tier_and_reports_block() {
    let (backend, draw_id, template_id, p1) = seeded().await;
    backend.insert_award(p1, AwardStatus::Awarded).await;

    let dto = apply_template(
        &backend.stores(),
        ApplyTemplateCommand {
            draw_id,
            template_id,
            mode: ApplyMode::Replace,
        },
    )
    .await
    .unwrap();

    let tiers = &dto.play_type_pools[0].tiers;
    assert_eq!(tiers.len(), 2);

    // tier1 protected: prior cost and identity retained.
    assert_eq!(tiers[0].tier, TierLabel::new("tier1"));
    assert_eq!(tiers[0].option.cost_micros, 100);
    assert_eq!(tiers[0].option.prize_id, Some(p1));

    // tier2 added with a freshly minted identity.
    assert_eq!(tiers[1].tier, TierLabel::new("tier2"));
    assert_eq!(tiers[1].option.cost_micros, 50);
    assert!(tiers[1].option.prize_id.is_some());

    assert_eq!(dto.blocked_changes.len(), 1);
    assert_eq!(dto.blocked_changes[0].tier, TierLabel::new("tier1"));
    assert_eq!(
        dto.blocked_changes[0].reason,
        BlockedReason::AwardedPrizeConflict
    );

    // Persisted state matches the projection and the version advanced.
    let stored = backend.draw(draw_id).await.unwrap();
    assert_eq!(stored.pool_version, 1);
    assert_eq!(
        stored
            .pool
            .get(&PlayTypeCode::new("lottery"), &TierLabel::new("tier1"))
            .unwrap()
            .identity
            .established(),
        Some(p1)
    );
}

#[tokio::test]
async fn add_missing_only_leaves_existing_tier_untouched() {
    let (backend, draw_id, template_id, p1) = seeded().await;
    backend.insert_award(p1, AwardStatus::Awarded).await;

    let dto = apply_template(
        &backend.stores(),
        ApplyTemplateCommand {
            draw_id,
            template_id,
            mode: ApplyMode::AddMissingOnly,
        },
    )
    .await
    .unwrap();

    let tiers = &dto.play_type_pools[0].tiers;
    assert_eq!(tiers.len(), 2);
    assert_eq!(tiers[0].option.cost_micros, 100);
    assert_eq!(tiers[0].option.prize_id, Some(p1));
    assert_eq!(tiers[1].option.cost_micros, 50);
    assert!(dto.blocked_changes.is_empty());
}

#[tokio::test]
async fn expired_award_does_not_protect_and_replace_applies_fully() {
    let (backend, draw_id, template_id, p1) = seeded().await;
    backend.insert_award(p1, AwardStatus::Expired).await;
    backend.insert_award(p1, AwardStatus::Cancelled).await;

    let dto = apply_template(
        &backend.stores(),
        ApplyTemplateCommand {
            draw_id,
            template_id,
            mode: ApplyMode::Replace,
        },
    )
    .await
    .unwrap();

    let tiers = &dto.play_type_pools[0].tiers;
    assert_eq!(tiers[0].option.cost_micros, 150);
    assert_ne!(tiers[0].option.prize_id, Some(p1));
    assert!(dto.blocked_changes.is_empty());
}

#[tokio::test]
async fn unknown_draw_and_template_surface_not_found() {
    let (backend, draw_id, template_id, _p1) = seeded().await;

    let err = apply_template(
        &backend.stores(),
        ApplyTemplateCommand {
            draw_id: DrawId::new(),
            template_id,
            mode: ApplyMode::Merge,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApplyError::DrawNotFound(_)));

    let err = apply_template(
        &backend.stores(),
        ApplyTemplateCommand {
            draw_id,
            template_id: TemplateId::new(),
            mode: ApplyMode::Merge,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApplyError::TemplateNotFound(_)));
}
