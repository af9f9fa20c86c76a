use std::collections::BTreeSet;
use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use dpl_pool::validate_pool;
use dpl_schemas::{AwardStatus, DrawId, DrawTemplate, PlayTypeCode, PrizeId};
use dpl_service::{project_pool, DrawStore};
use dpl_template::instantiate;

#[derive(Parser)]
#[command(name = "dpl")]
#[command(about = "Draw prize pool operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Template utilities
    Template {
        #[command(subcommand)]
        cmd: TemplateCmd,
    },

    /// Draw utilities
    Draw {
        #[command(subcommand)]
        cmd: DrawCmd,
    },

    /// Game-type catalog commands
    GameType {
        #[command(subcommand)]
        cmd: GameTypeCmd,
    },

    /// Award store commands (operational/testing)
    Award {
        #[command(subcommand)]
        cmd: AwardCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses when any draw already has a
    /// composed pool (pool_version > 0) unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB that holds composed pools.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum TemplateCmd {
    /// Parse a template file and instantiate it against a play-type catalog.
    /// Fails on duplicate tiers, unknown codes, or invalid option values.
    Validate {
        /// Path to a JSON DrawTemplate file
        file: String,

        /// Play-type codes forming the catalog (repeatable)
        #[arg(long = "play-type", required = true)]
        play_types: Vec<String>,
    },

    /// Insert a template file into the template catalog.
    Add {
        /// Path to a JSON DrawTemplate file
        file: String,
    },
}

#[derive(Subcommand)]
enum DrawCmd {
    /// Create a new draw with an empty pool at version 0.
    Create {
        /// Game type the draw belongs to (must exist in game_types)
        #[arg(long)]
        game_type: String,
    },

    /// Fetch a draw's current pool and print the JSON projection.
    Pool {
        /// Draw id
        #[arg(long)]
        draw_id: String,
    },
}

#[derive(Subcommand)]
enum GameTypeCmd {
    /// Register (or replace) a game type's play-type catalog.
    Upsert {
        #[arg(long)]
        game_type: String,

        /// Play-type codes (repeatable)
        #[arg(long = "play-type", required = true)]
        play_types: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AwardCmd {
    /// Record an award row against a prize identity.
    Add {
        /// Prize id
        #[arg(long)]
        prize_id: String,

        /// AWARDED | REDEEMED | EXPIRED | CANCELLED
        #[arg(long)]
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = dpl_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = dpl_db::status(&pool).await?;
                    println!("db_ok={} has_draws_table={}", s.ok, s.has_draws_table);
                }
                DbCmd::Migrate { yes } => {
                    let n = dpl_db::count_composed_pools(&pool).await?;
                    if n > 0 && !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: {} draw(s) already hold composed pools. Re-run with: `dpl db migrate --yes`",
                            n
                        );
                    }

                    dpl_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::Template { cmd } => match cmd {
            TemplateCmd::Validate { file, play_types } => {
                let template = read_template(&file)?;
                let catalog = parse_catalog(&play_types);

                let desired = instantiate(&template, &catalog)?;
                validate_pool(&desired, &catalog)?;

                println!("template_valid=true");
                println!("template_id={}", template.template_id);
                println!("name={}", template.name);
                println!("option_count={}", desired.option_count());
            }
            TemplateCmd::Add { file } => {
                let template = read_template(&file)?;
                let pool = dpl_db::connect_from_env().await?;
                dpl_db::insert_template(&pool, &template).await?;
                println!("template_added=true template_id={}", template.template_id);
            }
        },

        Commands::Draw { cmd } => match cmd {
            DrawCmd::Create { game_type } => {
                let pool = dpl_db::connect_from_env().await?;
                let draw_id = DrawId::new();
                dpl_db::insert_draw(&pool, draw_id, &game_type).await?;
                println!("draw_created=true draw_id={} game_type={}", draw_id, game_type);
            }
            DrawCmd::Pool { draw_id } => {
                let draw_id = DrawId(Uuid::parse_str(&draw_id).context("invalid draw_id uuid")?);
                let pool = dpl_db::connect_from_env().await?;
                let stores = dpl_db::PgStores::new(pool);

                let draw = stores
                    .fetch_draw(draw_id)
                    .await?
                    .with_context(|| format!("draw not found: {draw_id}"))?;

                let dto = project_pool(draw_id, &draw.pool, Vec::new());
                println!("pool_version={}", draw.pool_version);
                println!("{}", serde_json::to_string_pretty(&dto)?);
            }
        },

        Commands::GameType { cmd } => match cmd {
            GameTypeCmd::Upsert {
                game_type,
                play_types,
            } => {
                let codes: Vec<PlayTypeCode> =
                    play_types.iter().map(|c| PlayTypeCode::new(c.as_str())).collect();
                let pool = dpl_db::connect_from_env().await?;
                dpl_db::upsert_game_type(&pool, &game_type, &codes).await?;
                println!(
                    "game_type_upserted=true game_type={} play_types={}",
                    game_type,
                    play_types.join(",")
                );
            }
        },

        Commands::Award { cmd } => match cmd {
            AwardCmd::Add { prize_id, status } => {
                let prize_id =
                    PrizeId(Uuid::parse_str(&prize_id).context("invalid prize_id uuid")?);
                let status = AwardStatus::parse(&status)
                    .with_context(|| format!("invalid award status: {status}"))?;

                let pool = dpl_db::connect_from_env().await?;
                dpl_db::insert_award(&pool, prize_id, status).await?;
                println!(
                    "award_added=true prize_id={} status={}",
                    prize_id,
                    status.as_str()
                );
            }
        },
    }

    Ok(())
}

fn read_template(path: &str) -> Result<DrawTemplate> {
    let raw = fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("{path} is not a valid template"))
}

fn parse_catalog(codes: &[String]) -> BTreeSet<PlayTypeCode> {
    codes.iter().map(|c| PlayTypeCode::new(c.as_str())).collect()
}
