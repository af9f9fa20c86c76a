//! dpl-service
//!
//! Command handlers for the two pool composition operations:
//! apply-from-template and clone-from-draw.
//!
//! Each operation runs as one logical transaction scoped to a single draw:
//! read the pool at its current version, resolve the desired source, fan out
//! the award lookups, compose, mint identities for landed options, validate,
//! and write conditionally on the version being unchanged. A version
//! conflict retries the whole pipeline from a fresh read, bounded.
//!
//! Persistence and transport are behind traits ([`stores`]); the engine
//! itself lives in `dpl-pool` and is pure.

mod commands;
mod error;
mod project;
mod stores;

pub use commands::{
    apply_template, clone_from_draw, ApplyTemplateCommand, CloneFromDrawCommand, Stores,
    MAX_WRITE_ATTEMPTS,
};
pub use error::ApplyError;
pub use project::project_pool;
pub use stores::{AwardStore, DrawStore, TemplateStore, WriteOutcome};
