// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Handler-level tests of the enforcement boundary: permitted execution,
//! governed refusal, malformed input, upstream failure, and the fail-closed
//! guarantees.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use aumos_governor_core::audit::{AuditEntry, AuditError, AuditRecorder, AuditSink, MemoryAuditLog};
use aumos_governor_core::{ContractEnforcer, Kernel, Profile};
use aumos_governor_proxy::{create_router, ProxyState, ToolBackend};

fn fixed_clock() -> u64 {
    1_700_000_000_000
}

fn state_with(profile: Profile, backend: ToolBackend) -> Arc<ProxyState> {
    let kernel =
        Kernel::with_contracts("agent-proxy-test", profile, ContractEnforcer::disabled()).unwrap();
    let recorder = AuditRecorder::with_clock(
        Box::new(MemoryAuditLog::new()) as Box<dyn AuditSink + Send>,
        fixed_clock,
    );
    Arc::new(ProxyState::new(kernel, recorder, backend))
}

fn tool_request(name: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/tool/{name}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn permitted_call_executes_the_tool() {
    let app = create_router(state_with(Profile::balanced(), ToolBackend::with_builtins()));

    let response = app
        .oneshot(tool_request(
            "echo",
            r#"{"params":{"message":"hi"},"signals":{"reward":0.5,"novelty":0.1,"urgency":0.0}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["step"], 1);
    assert_eq!(body["result"]["result"], "hi");
    assert!(body["budget"]["effort"].as_f64().unwrap() < 1.0);
}

#[tokio::test]
async fn halted_kernel_refuses_with_403() {
    let profile = Profile {
        max_steps: 1,
        ..Profile::balanced()
    };
    let app = create_router(state_with(profile, ToolBackend::with_builtins()));

    let response = app
        .clone()
        .oneshot(tool_request("echo", r#"{"params":{"message":"hi"}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["halted"], true);
    assert_eq!(body["failure"], "EXTERNAL");
    assert!(body["reason"].as_str().unwrap().contains("step cap"));

    // The terminal decision replays on every further attempt.
    let again = app
        .oneshot(tool_request("echo", r#"{"params":{}}"#))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_body_gets_400_and_a_blocked_audit_entry() {
    let app = create_router(state_with(Profile::balanced(), ToolBackend::with_builtins()));

    let response = app
        .clone()
        .oneshot(tool_request("echo", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "malformed");

    // Unknown fields are malformed too (fail-closed schema).
    let response = app
        .clone()
        .oneshot(tool_request("echo", r#"{"params":{},"surprise":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let summary = app
        .oneshot(Request::builder().uri("/audit").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let summary = json_body(summary).await;
    assert_eq!(summary["entries"], 2);
}

#[tokio::test]
async fn unknown_tool_is_404_after_the_decision_is_recorded() {
    let app = create_router(state_with(Profile::balanced(), ToolBackend::with_builtins()));

    let response = app
        .clone()
        .oneshot(tool_request("launch_rockets", r#"{"params":{}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let summary = app
        .oneshot(Request::builder().uri("/audit").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(summary).await["entries"], 1);
}

#[tokio::test]
async fn upstream_failure_is_502_with_a_supplementary_entry() {
    let mut backend = ToolBackend::with_builtins();
    backend.register("flaky", |_| Err("connection reset".into()));
    let app = create_router(state_with(Profile::balanced(), backend));

    let response = app
        .clone()
        .oneshot(tool_request("flaky", r#"{"params":{}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "upstream");

    // One entry for the GO decision, one carrying the execution error.
    let summary = app
        .oneshot(Request::builder().uri("/audit").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(summary).await["entries"], 2);
}

/// A sink that refuses every append, simulating a dead audit volume.
struct FailingSink;

impl AuditSink for FailingSink {
    fn append(&mut self, _entry: &AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Sink("disk full".into()))
    }
}

#[tokio::test]
async fn audit_failure_fails_closed_with_403() {
    let kernel = Kernel::with_contracts(
        "agent-proxy-test",
        Profile::balanced(),
        ContractEnforcer::disabled(),
    )
    .unwrap();
    let recorder =
        AuditRecorder::with_clock(Box::new(FailingSink) as Box<dyn AuditSink + Send>, fixed_clock);
    let state = Arc::new(ProxyState::new(kernel, recorder, ToolBackend::with_builtins()));
    let app = create_router(state);

    let response = app
        .oneshot(tool_request("echo", r#"{"params":{}}"#))
        .await
        .unwrap();
    // Never 200, never 500: the decision could not be made durable.
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["blocked"], true);
}

#[tokio::test]
async fn handler_panic_fails_closed_with_403() {
    let mut backend = ToolBackend::with_builtins();
    backend.register("explode", |_| panic!("tool blew up"));
    let app = create_router(state_with(Profile::balanced(), backend));

    let response = app
        .oneshot(tool_request("explode", r#"{"params":{}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_never_consults_the_kernel() {
    let profile = Profile {
        max_steps: 1,
        ..Profile::balanced()
    };
    let app = create_router(state_with(profile, ToolBackend::with_builtins()));

    // Halt the kernel first.
    let _ = app
        .clone()
        .oneshot(tool_request("echo", r#"{"params":{}}"#))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn metrics_expose_steps_and_halts() {
    let profile = Profile {
        max_steps: 2,
        ..Profile::balanced()
    };
    let app = create_router(state_with(profile, ToolBackend::with_builtins()));

    for _ in 0..2 {
        let _ = app
            .clone()
            .oneshot(tool_request("echo", r#"{"params":{}}"#))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("governance_steps_total 2"));
    assert!(text.contains("governance_halts_total{reason=\"EXTERNAL\"} 1"));
    assert!(text.contains("governance_effort"));
    assert!(text.contains("governance_risk"));
    assert!(text.contains("governance_persistence"));
    assert!(text.contains("governance_exploration"));
}
