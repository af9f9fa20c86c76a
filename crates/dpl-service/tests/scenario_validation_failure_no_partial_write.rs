//! Validation is all-or-nothing: if any option in the desired set fails
//! validation, the persisted pool must equal the pre-operation pool exactly.

use dpl_pool::ValidationError;
use dpl_schemas::{
    ApplyMode, DrawId, DrawTemplate, PlayTypeCode, PlayTypeInput, PrizeOption, PrizeOptionInput,
    PrizeTierInput, TemplateId, TierLabel,
};
use dpl_service::{apply_template, ApplyError, ApplyTemplateCommand};
use dpl_testkit::{draw, pool, MemStores};

fn bad_cost_template() -> DrawTemplate {
    DrawTemplate {
        template_id: TemplateId::new(),
        name: "broken".to_string(),
        play_types: vec![PlayTypeInput {
            code: PlayTypeCode::new("lottery"),
            tiers: vec![
                PrizeTierInput {
                    tier: TierLabel::new("tier1"),
                    option: PrizeOptionInput {
                        prize_id: None,
                        name: "fine".to_string(),
                        cost_micros: 10,
                        redeem_valid_days: None,
                        description: None,
                    },
                },
                PrizeTierInput {
                    tier: TierLabel::new("tier2"),
                    option: PrizeOptionInput {
                        prize_id: None,
                        name: "negative".to_string(),
                        cost_micros: -5,
                        redeem_valid_days: None,
                        description: None,
                    },
                },
            ],
        }],
    }
}

#[tokio::test]
async fn invalid_cost_aborts_whole_apply_with_offending_key() {
    let backend = MemStores::new();
    let draw_id = DrawId::new();
    let before = pool(&[("lottery", "tier1", PrizeOption::new("grand", 100))]);
    backend
        .insert_draw(draw(draw_id, &["lottery"], before.clone()))
        .await;

    let template = bad_cost_template();
    let template_id = template.template_id;
    backend.insert_template(template).await;

    let err = apply_template(
        &backend.stores(),
        ApplyTemplateCommand {
            draw_id,
            template_id,
            mode: ApplyMode::Replace,
        },
    )
    .await
    .unwrap_err();

    match err {
        ApplyError::Validation(ValidationError::InvalidCost { code, tier, cost_micros }) => {
            assert_eq!(code, PlayTypeCode::new("lottery"));
            assert_eq!(tier, TierLabel::new("tier2"));
            assert_eq!(cost_micros, -5);
        }
        other => panic!("expected InvalidCost, got {other}"),
    }

    // Nothing persisted: pool bytes and version both unchanged.
    let stored = backend.draw(draw_id).await.unwrap();
    assert_eq!(stored.pool, before);
    assert_eq!(stored.pool_version, 0);
}

#[tokio::test]
async fn duplicate_template_tier_aborts_before_any_write() {
    let backend = MemStores::new();
    let draw_id = DrawId::new();
    let before = pool(&[("lottery", "tier1", PrizeOption::new("grand", 100))]);
    backend
        .insert_draw(draw(draw_id, &["lottery"], before.clone()))
        .await;

    let template = DrawTemplate {
        template_id: TemplateId::new(),
        name: "dup".to_string(),
        play_types: vec![PlayTypeInput {
            code: PlayTypeCode::new("lottery"),
            tiers: vec![
                PrizeTierInput {
                    tier: TierLabel::new("tier1"),
                    option: PrizeOptionInput {
                        prize_id: None,
                        name: "a".to_string(),
                        cost_micros: 1,
                        redeem_valid_days: None,
                        description: None,
                    },
                },
                PrizeTierInput {
                    tier: TierLabel::new("tier1"),
                    option: PrizeOptionInput {
                        prize_id: None,
                        name: "b".to_string(),
                        cost_micros: 2,
                        redeem_valid_days: None,
                        description: None,
                    },
                },
            ],
        }],
    };
    let template_id = template.template_id;
    backend.insert_template(template).await;

    let err = apply_template(
        &backend.stores(),
        ApplyTemplateCommand {
            draw_id,
            template_id,
            mode: ApplyMode::Merge,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApplyError::Instantiate(_)));

    let stored = backend.draw(draw_id).await.unwrap();
    assert_eq!(stored.pool, before);
    assert_eq!(stored.pool_version, 0);
}
