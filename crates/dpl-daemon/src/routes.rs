//! Axum router and all HTTP handlers for dpl-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use dpl_schemas::{DrawId, DrawPrizePoolDto};
use dpl_service::{
    apply_template, clone_from_draw, project_pool, ApplyError, ApplyTemplateCommand,
    CloneFromDrawCommand,
};

use crate::{
    api_types::{ApplyTemplateRequest, CloneFromDrawRequest, ErrorResponse, HealthResponse},
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/draws/:draw_id/pool", get(get_pool))
        .route(
            "/v1/draws/:draw_id/pool/apply-template",
            post(apply_template_handler),
        )
        .route(
            "/v1/draws/:draw_id/pool/clone-from-draw",
            post(clone_from_draw_handler),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a command failure to an HTTP status plus a uniform error body.
fn apply_error_response(err: ApplyError) -> Response {
    let (status, kind) = match &err {
        ApplyError::DrawNotFound(_) => (StatusCode::NOT_FOUND, "draw_not_found"),
        ApplyError::TemplateNotFound(_) => (StatusCode::NOT_FOUND, "template_not_found"),
        ApplyError::SourceDrawNotFound(_) => (StatusCode::NOT_FOUND, "source_draw_not_found"),
        ApplyError::SelfCloneNotAllowed(_) => (StatusCode::BAD_REQUEST, "self_clone_not_allowed"),
        ApplyError::Instantiate(_) => (StatusCode::UNPROCESSABLE_ENTITY, "instantiate_failed"),
        ApplyError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
        ApplyError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, "concurrency_conflict"),
        ApplyError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_failure"),
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: kind.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();

    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// GET /v1/draws/:draw_id/pool
// ---------------------------------------------------------------------------

pub(crate) async fn get_pool(
    State(st): State<Arc<AppState>>,
    Path(draw_id): Path<DrawId>,
) -> Response {
    let draw = match st.stores.draws.fetch_draw(draw_id).await {
        Ok(Some(draw)) => draw,
        Ok(None) => return apply_error_response(ApplyError::DrawNotFound(draw_id)),
        Err(e) => return apply_error_response(ApplyError::Store(e)),
    };

    let dto = project_pool(draw_id, &draw.pool, Vec::new());
    (StatusCode::OK, Json(dto)).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/draws/:draw_id/pool/apply-template
// ---------------------------------------------------------------------------

pub(crate) async fn apply_template_handler(
    State(st): State<Arc<AppState>>,
    Path(draw_id): Path<DrawId>,
    Json(req): Json<ApplyTemplateRequest>,
) -> Response {
    let result = apply_template(
        &st.stores,
        ApplyTemplateCommand {
            draw_id,
            template_id: req.template_id,
            mode: req.apply_mode,
        },
    )
    .await;

    finish_apply(&st, draw_id, req.apply_mode.as_str(), result).await
}

// ---------------------------------------------------------------------------
// POST /v1/draws/:draw_id/pool/clone-from-draw
// ---------------------------------------------------------------------------

pub(crate) async fn clone_from_draw_handler(
    State(st): State<Arc<AppState>>,
    Path(draw_id): Path<DrawId>,
    Json(req): Json<CloneFromDrawRequest>,
) -> Response {
    let result = clone_from_draw(
        &st.stores,
        CloneFromDrawCommand {
            draw_id,
            source_draw_id: req.source_draw_id,
            mode: req.apply_mode,
        },
    )
    .await;

    finish_apply(&st, draw_id, req.apply_mode.as_str(), result).await
}

/// Shared tail of both apply endpoints: bump counters, publish the bus event,
/// encode the response.
async fn finish_apply(
    st: &Arc<AppState>,
    draw_id: DrawId,
    mode: &str,
    result: Result<DrawPrizePoolDto, ApplyError>,
) -> Response {
    match result {
        Ok(dto) => {
            {
                let mut s = st.status.write().await;
                s.applies_committed += 1;
                s.last_applied_draw_id = Some(draw_id);
            }
            info!(draw_id = %draw_id, mode, "pool apply served");
            let _ = st.bus.send(BusMsg::PoolApplied {
                draw_id,
                mode: mode.to_string(),
                blocked: dto.blocked_changes.len(),
            });
            (StatusCode::OK, Json(dto)).into_response()
        }
        Err(err) => {
            {
                let mut s = st.status.write().await;
                s.applies_rejected += 1;
            }
            let _ = st.bus.send(BusMsg::LogLine {
                level: "WARN".to_string(),
                msg: format!("apply rejected for draw {draw_id}: {err}"),
            });
            apply_error_response(err)
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Status(_) => "status",
                    BusMsg::PoolApplied { .. } => "pool_applied",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
