//! dpl-db
//!
//! Postgres persistence for draws, templates, and award statuses.
//! [`PgStores`] implements the `dpl-service` store traits; the conditional
//! pool write is a single `update ... where pool_version = $expected`
//! statement, so the version check and the write are atomic in the database.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use dpl_schemas::{
    AwardStatus, Draw, DrawId, DrawTemplate, PlayTypeCode, PrizeId, PrizePool, TemplateId,
};
use dpl_service::{AwardStore, DrawStore, TemplateStore, WriteOutcome};

pub const ENV_DB_URL: &str = "DPL_DATABASE_URL";

/// Connect to Postgres using DPL_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_draws_table: bool,
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='draws'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_draws_table: exists,
    })
}

/// Count draws whose pool has ever been written (version > 0).
/// Used by CLI guardrails before migrating a database with composed pools.
pub async fn count_composed_pools(pool: &PgPool) -> Result<i64> {
    // If schema doesn't exist yet, treat as 0 (safe) rather than failing.
    let st = status(pool).await?;
    if !st.has_draws_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from draws where pool_version > 0",
    )
    .fetch_one(pool)
    .await
    .context("count_composed_pools failed")?;

    Ok(n)
}

// ---------------------------------------------------------------------------
// Seed/operational helpers
// ---------------------------------------------------------------------------

/// Register a game type with its play-type code catalog (upsert).
pub async fn upsert_game_type(pool: &PgPool, game_type: &str, codes: &[PlayTypeCode]) -> Result<()> {
    let codes_json = serde_json::to_value(codes).context("serialize play type codes")?;
    sqlx::query(
        r#"
        insert into game_types (game_type, play_type_codes)
        values ($1, $2)
        on conflict (game_type) do update set play_type_codes = excluded.play_type_codes
        "#,
    )
    .bind(game_type)
    .bind(codes_json)
    .execute(pool)
    .await
    .context("upsert_game_type failed")?;
    Ok(())
}

/// Insert a new draw with an empty pool at version 0.
pub async fn insert_draw(pool: &PgPool, draw_id: DrawId, game_type: &str) -> Result<()> {
    sqlx::query("insert into draws (draw_id, game_type) values ($1, $2)")
        .bind(draw_id.0)
        .bind(game_type)
        .execute(pool)
        .await
        .context("insert_draw failed")?;
    Ok(())
}

pub async fn insert_template(pool: &PgPool, template: &DrawTemplate) -> Result<()> {
    let body = serde_json::to_value(template).context("serialize template body")?;
    sqlx::query("insert into draw_templates (template_id, name, body) values ($1, $2, $3)")
        .bind(template.template_id.0)
        .bind(&template.name)
        .bind(body)
        .execute(pool)
        .await
        .context("insert_template failed")?;
    Ok(())
}

pub async fn insert_award(pool: &PgPool, prize_id: PrizeId, status: AwardStatus) -> Result<()> {
    sqlx::query(
        "insert into prize_awards (award_id, prize_id, status) values ($1, $2, $3)",
    )
    .bind(Uuid::new_v4())
    .bind(prize_id.0)
    .bind(status.as_str())
    .execute(pool)
    .await
    .context("insert_award failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Store trait implementations
// ---------------------------------------------------------------------------

/// Postgres-backed implementation of all three service store traits.
#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pg(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DrawStore for PgStores {
    async fn fetch_draw(&self, draw_id: DrawId) -> Result<Option<Draw>> {
        let row = sqlx::query(
            r#"
            select
              d.draw_id,
              d.game_type,
              d.pool_version,
              d.pool,
              coalesce(g.play_type_codes, '[]'::jsonb) as play_type_codes
            from draws d
            left join game_types g using (game_type)
            where d.draw_id = $1
            "#,
        )
        .bind(draw_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("fetch_draw failed")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let pool_json: Value = row.try_get("pool")?;
        let pool: PrizePool =
            serde_json::from_value(pool_json).context("decode stored prize pool")?;

        let codes_json: Value = row.try_get("play_type_codes")?;
        let codes: Vec<PlayTypeCode> =
            serde_json::from_value(codes_json).context("decode play type catalog")?;

        Ok(Some(Draw {
            draw_id: DrawId(row.try_get("draw_id")?),
            game_type: row.try_get("game_type")?,
            play_type_catalog: codes.into_iter().collect(),
            pool_version: row.try_get("pool_version")?,
            pool,
        }))
    }

    async fn write_pool(
        &self,
        draw_id: DrawId,
        expected_version: i64,
        pool: &PrizePool,
    ) -> Result<WriteOutcome> {
        let pool_json = serde_json::to_value(pool).context("serialize prize pool")?;

        let result = sqlx::query(
            r#"
            update draws
            set pool = $3,
                pool_version = pool_version + 1
            where draw_id = $1
              and pool_version = $2
            "#,
        )
        .bind(draw_id.0)
        .bind(expected_version)
        .bind(pool_json)
        .execute(&self.pool)
        .await
        .context("write_pool update failed")?;

        // Zero rows = somebody advanced the version between our read and
        // this write (the caller already proved the draw exists).
        if result.rows_affected() == 0 {
            return Ok(WriteOutcome::VersionConflict);
        }

        Ok(WriteOutcome::Written {
            new_version: expected_version + 1,
        })
    }
}

#[async_trait]
impl TemplateStore for PgStores {
    async fn fetch_template(&self, template_id: TemplateId) -> Result<Option<DrawTemplate>> {
        let row = sqlx::query("select body from draw_templates where template_id = $1")
            .bind(template_id.0)
            .fetch_optional(&self.pool)
            .await
            .context("fetch_template failed")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body: Value = row.try_get("body")?;
        let template: DrawTemplate =
            serde_json::from_value(body).context("decode stored template body")?;
        Ok(Some(template))
    }
}

#[async_trait]
impl AwardStore for PgStores {
    async fn statuses_for_prize(&self, prize_id: PrizeId) -> Result<Vec<AwardStatus>> {
        let rows = sqlx::query("select status from prize_awards where prize_id = $1")
            .bind(prize_id.0)
            .fetch_all(&self.pool)
            .await
            .context("statuses_for_prize failed")?;

        rows.into_iter()
            .map(|row| {
                let s: String = row.try_get("status")?;
                AwardStatus::parse(&s).ok_or_else(|| anyhow!("invalid award status: {s}"))
            })
            .collect()
    }
}
