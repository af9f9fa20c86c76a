//! Request and response types for all dpl-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use serde::{Deserialize, Serialize};

use dpl_schemas::{ApplyMode, DrawId, TemplateId};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// POST /v1/draws/:draw_id/pool/apply-template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyTemplateRequest {
    pub template_id: TemplateId,
    pub apply_mode: ApplyMode,
}

// ---------------------------------------------------------------------------
// POST /v1/draws/:draw_id/pool/clone-from-draw
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneFromDrawRequest {
    pub source_draw_id: DrawId,
    pub apply_mode: ApplyMode,
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Uniform error body for all non-2xx daemon responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable failure kind, e.g. "draw_not_found".
    pub kind: String,
}
