// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # aumos-governor-proxy
//!
//! Network-level enforcement for the AumOS runtime governor. The proxy
//! intercepts tool calls outside the agent process, making the boundary
//! non-bypassable:
//!
//! ```text
//! Agent ──▶ POST /tool/{name} ──▶ Kernel.step ──▶ audit entry (durable)
//!                                      │
//!                    ┌─────────────────┴─────────────┐
//!                    ▼ GO                            ▼ HALT
//!             registered handler                403 Forbidden
//! ```
//!
//! ## Fail-closed semantics
//!
//! * kernel says HALT → `403`, the tool is never invoked;
//! * malformed request body → `400` plus a blocked audit entry;
//! * any error before the decision is served → `403`, never a silent pass;
//! * panics anywhere in the handler stack → `403` via the catch-panic layer;
//! * handler failure after a GO → `502` plus a supplementary audit entry
//!   carrying `execution_error`.
//!
//! The kernel and the audit recorder share one mutex, held across the step
//! and the audit flush — decisions become visible to callers only after
//! their entry is durable. Tool execution happens after the lock is
//! released.
//!
//! ## Endpoints
//!
//! | Route              | Purpose                                    |
//! |--------------------|--------------------------------------------|
//! | `POST /tool/:name` | Governed tool execution                    |
//! | `GET /health`      | Liveness; never consults the kernel        |
//! | `GET /metrics`     | Prometheus text exposition                 |
//! | `GET /audit`       | Chain summary: entry count and head hash   |

pub mod metrics;

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use aumos_governor_core::audit::{AuditRecorder, AuditSink};
use aumos_governor_core::{allow, Decision, FailureKind, Kernel, Signals};

pub use metrics::GovernorMetrics;

// ---------------------------------------------------------------------------
// Tool backend
// ---------------------------------------------------------------------------

type ToolHandler = Box<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Registry of named tool handlers the proxy forwards permitted calls to.
///
/// Handlers are synchronous closures over JSON params. The governor never
/// inspects tool bodies — a handler is opaque effect code.
#[derive(Default)]
pub struct ToolBackend {
    handlers: HashMap<String, ToolHandler>,
}

impl ToolBackend {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the `echo` and `add` diagnostics tools.
    pub fn with_builtins() -> Self {
        let mut backend = Self::new();
        backend.register("echo", |params| {
            Ok(json!({ "result": params.get("message").cloned().unwrap_or(Value::Null) }))
        });
        backend.register("add", |params| {
            let a = params.get("a").and_then(Value::as_f64).unwrap_or(0.0);
            let b = params.get("b").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(json!({ "result": a + b }))
        });
        backend
    }

    /// Register (or replace) a handler for `name`.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// `true` when a handler exists for `name`.
    pub fn has_tool(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invoke the handler for `name`.
    pub fn execute(&self, name: &str, params: &Value) -> Result<Value, String> {
        match self.handlers.get(name) {
            Some(handler) => handler(params),
            None => Err(format!("unknown tool: {name}")),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The kernel and its audit recorder, serialized together: the mutex is
/// held across the step and the audit flush.
struct Governed {
    kernel: Kernel,
    recorder: AuditRecorder<Box<dyn AuditSink + Send>>,
}

/// Shared proxy state.
pub struct ProxyState {
    governed: Mutex<Governed>,
    backend: ToolBackend,
    metrics: GovernorMetrics,
}

impl ProxyState {
    /// Assemble proxy state from a kernel, an audit recorder, and a tool
    /// backend.
    pub fn new(
        kernel: Kernel,
        recorder: AuditRecorder<Box<dyn AuditSink + Send>>,
        backend: ToolBackend,
    ) -> Self {
        Self {
            governed: Mutex::new(Governed { kernel, recorder }),
            backend,
            metrics: GovernorMetrics::new(),
        }
    }

    /// The metrics registry (shared with the `/metrics` endpoint).
    pub fn metrics(&self) -> &GovernorMetrics {
        &self.metrics
    }
}

// ---------------------------------------------------------------------------
// Error type — everything pre-decision maps to 403
// ---------------------------------------------------------------------------

/// Fail-closed proxy error: anything that goes wrong before a decision is
/// served blocks the action. Never a 500, never a silent pass-through.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The audit entry could not be made durable; the step was rolled back.
    #[error("audit write failed: {0}")]
    Audit(String),
    /// Internal serialization or locking failure.
    #[error("enforcement error: {0}")]
    Enforcement(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        warn!(error = %self, "blocking request (fail-closed)");
        (
            StatusCode::FORBIDDEN,
            Json(json!({
                "blocked": true,
                "halt_reason": "ENFORCEMENT_ERROR",
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

fn default_params() -> Value {
    json!({})
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolCallBody {
    #[serde(default = "default_params")]
    params: Value,
    #[serde(default = "Signals::idle")]
    signals: Signals,
    #[serde(default)]
    agent_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the proxy router over shared state.
pub fn create_router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/tool/:name", post(call_tool))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/audit", get(audit_summary))
        .layer(CatchPanicLayer::custom(panic_to_forbidden))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fail-closed panic surface: a panic anywhere below the layer becomes a
/// 403, never a default 500.
fn panic_to_forbidden(
    _err: Box<dyn Any + Send + 'static>,
) -> axum::http::Response<http_body_util::Full<bytes::Bytes>> {
    let body = json!({
        "blocked": true,
        "halt_reason": "ENFORCEMENT_ERROR",
        "error": "panic in enforcement path",
    });
    axum::http::Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header("content-type", "application/json")
        .body(http_body_util::Full::from(body.to_string()))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn call_tool(
    State(state): State<Arc<ProxyState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let parsed: Result<ToolCallBody, _> = serde_json::from_slice(&body);
    let request = match parsed {
        Ok(request) => request,
        Err(error) => {
            info!(tool = %name, %error, "malformed tool call body");
            log_blocked(&state, &name, "malformed request body")?;
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "malformed" })),
            )
                .into_response());
        }
    };

    if let Some(agent_id) = &request.agent_id {
        tracing::debug!(%agent_id, tool = %name, "tool call attributed");
    }

    // Step + audit under one lock; the decision exists only once its entry
    // is durable.
    let decision = {
        let mut guard = state
            .governed
            .lock()
            .map_err(|_| ProxyError::Enforcement("governor lock poisoned".into()))?;
        let governed = &mut *guard;
        governed
            .kernel
            .step_audited(&name, &request.params, request.signals, &mut governed.recorder)
            .map_err(|error| ProxyError::Audit(error.to_string()))?
    };
    state.metrics.record_decision(&decision);

    if !allow(&decision) {
        info!(
            tool = %name,
            step = decision.step,
            failure = decision.failure.map(|f| f.as_str()).unwrap_or("UNKNOWN"),
            "tool call blocked"
        );
        return Ok(halted_response(&decision));
    }

    if !state.backend.has_tool(&name) {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("tool not found: {name}") })),
        )
            .into_response());
    }

    match state.backend.execute(&name, &request.params) {
        Ok(result) => Ok((
            StatusCode::OK,
            Json(json!({
                "allowed": true,
                "step": decision.step,
                "budget": decision.budgets,
                "result": result,
            })),
        )
            .into_response()),
        Err(error) => {
            warn!(tool = %name, %error, "upstream handler failed");
            log_upstream_failure(&state, &name, &request, &decision, &error)?;
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "upstream" })),
            )
                .into_response())
        }
    }
}

/// Liveness only — never consults the kernel.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn render_metrics(State(state): State<Arc<ProxyState>>) -> Response {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
        .into_response()
}

async fn audit_summary(
    State(state): State<Arc<ProxyState>>,
) -> Result<Json<Value>, ProxyError> {
    let guard = state
        .governed
        .lock()
        .map_err(|_| ProxyError::Enforcement("governor lock poisoned".into()))?;
    Ok(Json(json!({
        "entries": guard.recorder.entries_written(),
        "head_hash": guard.recorder.head_hash(),
    })))
}

// ---------------------------------------------------------------------------
// Audit helpers
// ---------------------------------------------------------------------------

/// Record a blocked attempt that never reached the kernel (e.g. a malformed
/// body): a halted snapshot over the current budgets, zeroed signals.
fn log_blocked(state: &ProxyState, action: &str, reason: &str) -> Result<(), ProxyError> {
    let mut guard = state
        .governed
        .lock()
        .map_err(|_| ProxyError::Enforcement("governor lock poisoned".into()))?;
    let governed = &mut *guard;
    let snapshot = Decision::halt(
        governed.kernel.step_index(),
        governed.kernel.budgets(),
        FailureKind::External,
        reason.into(),
    );
    governed
        .recorder
        .log(
            governed.kernel.agent_id(),
            action,
            &Value::Null,
            Signals::idle(),
            &snapshot,
        )
        .map_err(|error| ProxyError::Audit(error.to_string()))?;
    Ok(())
}

/// Append the supplementary entry for a permitted call whose handler failed.
fn log_upstream_failure(
    state: &ProxyState,
    action: &str,
    request: &ToolCallBody,
    decision: &Decision,
    error: &str,
) -> Result<(), ProxyError> {
    let mut guard = state
        .governed
        .lock()
        .map_err(|_| ProxyError::Enforcement("governor lock poisoned".into()))?;
    let governed = &mut *guard;
    governed
        .recorder
        .log_execution_error(
            governed.kernel.agent_id(),
            action,
            &request.params,
            request.signals,
            decision,
            error.into(),
        )
        .map_err(|error| ProxyError::Audit(error.to_string()))?;
    Ok(())
}

fn halted_response(decision: &Decision) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "halted": true,
            "failure": decision.failure.map(|f| f.as_str()),
            "reason": decision.reason,
            "step": decision.step,
        })),
    )
        .into_response()
}
