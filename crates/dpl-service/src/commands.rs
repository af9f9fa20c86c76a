use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{info, warn};

use dpl_pool::{award_blocks_change, compose, destructive_prize_ids, validate_pool, Composition};
use dpl_schemas::{
    ApplyMode, Draw, DrawId, DrawPrizePoolDto, PrizeId, PrizeIdentity, PrizePool, TemplateId,
};
use dpl_template::instantiate;

use crate::error::ApplyError;
use crate::project::project_pool;
use crate::stores::{AwardStore, DrawStore, TemplateStore, WriteOutcome};

/// Bounded optimistic-concurrency retry budget. Each attempt recomputes the
/// whole pipeline from a fresh read, so retries are idempotent.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Store handles shared by all command handlers. Cloneable (Arc).
#[derive(Clone)]
pub struct Stores {
    pub draws: Arc<dyn DrawStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub awards: Arc<dyn AwardStore>,
}

#[derive(Debug, Clone, Copy)]
pub struct ApplyTemplateCommand {
    pub draw_id: DrawId,
    pub template_id: TemplateId,
    pub mode: ApplyMode,
}

#[derive(Debug, Clone, Copy)]
pub struct CloneFromDrawCommand {
    pub draw_id: DrawId,
    pub source_draw_id: DrawId,
    pub mode: ApplyMode,
}

/// Where the desired pool comes from.
#[derive(Debug, Clone, Copy)]
enum DesiredSource {
    Template(TemplateId),
    CloneFrom(DrawId),
}

/// Apply a named template to a draw's pool under the selected mode.
pub async fn apply_template(
    stores: &Stores,
    cmd: ApplyTemplateCommand,
) -> Result<DrawPrizePoolDto, ApplyError> {
    run_apply(
        stores,
        cmd.draw_id,
        DesiredSource::Template(cmd.template_id),
        cmd.mode,
    )
    .await
}

/// Clone another draw's current pool into this draw under the selected mode.
/// The source pool is read-only; cloning never mutates the source.
pub async fn clone_from_draw(
    stores: &Stores,
    cmd: CloneFromDrawCommand,
) -> Result<DrawPrizePoolDto, ApplyError> {
    // Rejected before any load so a self-clone cannot touch state at all.
    if cmd.source_draw_id == cmd.draw_id {
        return Err(ApplyError::SelfCloneNotAllowed(cmd.draw_id));
    }
    run_apply(
        stores,
        cmd.draw_id,
        DesiredSource::CloneFrom(cmd.source_draw_id),
        cmd.mode,
    )
    .await
}

async fn resolve_desired(
    stores: &Stores,
    draw: &Draw,
    source: DesiredSource,
) -> Result<PrizePool, ApplyError> {
    match source {
        DesiredSource::Template(template_id) => {
            let template = stores
                .templates
                .fetch_template(template_id)
                .await
                .map_err(ApplyError::Store)?
                .ok_or(ApplyError::TemplateNotFound(template_id))?;
            Ok(instantiate(&template, &draw.play_type_catalog)?)
        }
        DesiredSource::CloneFrom(source_draw_id) => {
            let source_draw = stores
                .draws
                .fetch_draw(source_draw_id)
                .await
                .map_err(ApplyError::Store)?
                .ok_or(ApplyError::SourceDrawNotFound(source_draw_id))?;
            Ok(source_draw.pool)
        }
    }
}

/// Resolve award liveness for every destructive candidate.
///
/// Lookups are per-prize and order-independent, so they fan out concurrently;
/// all of them must complete before composition finalizes.
async fn protected_prize_ids(
    stores: &Stores,
    current: &PrizePool,
    desired: &PrizePool,
    mode: ApplyMode,
) -> Result<BTreeSet<PrizeId>, ApplyError> {
    let candidates: Vec<PrizeId> = destructive_prize_ids(current, desired, mode)
        .into_iter()
        .collect();

    let lookups = candidates
        .iter()
        .map(|id| stores.awards.statuses_for_prize(*id));
    let statuses = try_join_all(lookups).await.map_err(ApplyError::Store)?;

    Ok(candidates
        .into_iter()
        .zip(statuses)
        .filter(|(_, sts)| award_blocks_change(sts))
        .map(|(id, _)| id)
        .collect())
}

/// Mint identities for options that actually landed in the result.
///
/// Only keys listed as added/upserted are eligible; blocked and unchanged
/// slots keep whatever identity they had, so a blocked apply can never leave
/// an orphaned prize id behind.
fn mint_identities(composition: &mut Composition) {
    for key in composition.added.iter().chain(composition.upserted.iter()) {
        if let Some(play_type) = composition.pool.play_types.get_mut(&key.code) {
            if let Some(option) = play_type.tiers.get_mut(&key.tier) {
                if option.identity.is_unassigned() {
                    option.identity = PrizeIdentity::Established(PrizeId::new());
                }
            }
        }
    }
}

async fn run_apply(
    stores: &Stores,
    draw_id: DrawId,
    source: DesiredSource,
    mode: ApplyMode,
) -> Result<DrawPrizePoolDto, ApplyError> {
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let draw = stores
            .draws
            .fetch_draw(draw_id)
            .await
            .map_err(ApplyError::Store)?
            .ok_or(ApplyError::DrawNotFound(draw_id))?;

        let desired = resolve_desired(stores, &draw, source).await?;
        let protected = protected_prize_ids(stores, &draw.pool, &desired, mode).await?;

        let mut composition = compose(&draw.pool, &desired, mode, &protected);
        mint_identities(&mut composition);

        // All-or-nothing: any violation aborts with nothing persisted.
        validate_pool(&composition.pool, &draw.play_type_catalog)?;

        match stores
            .draws
            .write_pool(draw_id, draw.pool_version, &composition.pool)
            .await
            .map_err(ApplyError::Store)?
        {
            WriteOutcome::Written { new_version } => {
                info!(
                    draw_id = %draw_id,
                    mode = mode.as_str(),
                    new_version,
                    changed = composition.change_count(),
                    blocked = composition.blocked.len(),
                    "pool apply committed"
                );
                return Ok(project_pool(
                    draw_id,
                    &composition.pool,
                    composition.blocked,
                ));
            }
            WriteOutcome::VersionConflict => {
                warn!(
                    draw_id = %draw_id,
                    attempt,
                    "pool write lost version race; recomputing from fresh read"
                );
            }
        }
    }

    Err(ApplyError::ConcurrencyConflict {
        attempts: MAX_WRITE_ATTEMPTS,
    })
}
