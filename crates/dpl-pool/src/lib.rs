//! dpl-pool
//!
//! Prize pool composition engine.
//!
//! Architectural decisions:
//! - Composition is a pure function from (current, desired, mode, protected)
//!   to a new pool plus a blocked-change list
//! - A prize with a live award is never removed and never has its identity
//!   reassigned, regardless of mode (hard invariant over mode instructions)
//! - Blocked candidates retain the current option and are reported, not fatal
//! - Validation is per-option + per-pool and aborts the whole operation
//!
//! Deterministic, pure logic. No IO. No store calls.

mod engine;
mod types;
mod validate;

pub use engine::{award_blocks_change, compose, destructive_prize_ids};
pub use types::*;
pub use validate::{validate_option, validate_pool, ValidationError};
