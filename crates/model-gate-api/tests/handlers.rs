// crates/model-gate-api/tests/handlers.rs
// ============================================================================
// Module: Gateway Handler Tests
// Description: End-to-end service tests over fixture stores and a stub backend.
// Purpose: Pin envelope shapes, HTTP mapping, and the audit-per-request rule.
// ============================================================================

//! ## Overview
//! Drives the gateway service directly: authorization outcomes and their
//! HTTP mapping, the information-hiding invariant for inactive models, the
//! fallback degrade path, catalog visibility, the admin audit query, and the
//! exactly-one-audit-record-per-request contract.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::http::StatusCode;
use model_gate_api::AuditReader;
use model_gate_api::CompletionBody;
use model_gate_api::GatewayService;
use model_gate_api::GatewayServiceParts;
use model_gate_api::IdentityResolver;
use model_gate_api::ImageBody;
use model_gate_api::ListModelsQuery;
use model_gate_api::LogsQuery;
use model_gate_api::RequestContext;
use model_gate_api::events::GatewayEvents;
use model_gate_api::events::NoopEventSink;
use model_gate_config::AuthTokenEntry;
use model_gate_config::Environment;
use model_gate_config::LogLevel;
use model_gate_config::ServerAuthConfig;
use model_gate_core::AccessTier;
use model_gate_core::AuditRecorder;
use model_gate_core::AuditStatus;
use model_gate_core::BackendError;
use model_gate_core::BackendProxy;
use model_gate_core::BackendResponse;
use model_gate_core::CompletionCall;
use model_gate_core::FallbackPolicy;
use model_gate_core::Identity;
use model_gate_core::IdentityId;
use model_gate_core::IdentityStatus;
use model_gate_core::ImageCall;
use model_gate_core::InMemoryAuditSink;
use model_gate_core::InMemoryDirectoryStore;
use model_gate_core::ModelBackend;
use model_gate_core::ModelId;
use model_gate_core::ModelRecord;
use model_gate_core::OperationKind;
use model_gate_core::SharedDirectoryStore;
use model_gate_core::TokenUsage;
use serde_json::json;

// ============================================================================
// SECTION: Test Fixtures
// ============================================================================

/// Stub backend with switchable health.
struct StubBackend {
    /// When false, every call fails with a transport error.
    healthy: bool,
}

impl ModelBackend for StubBackend {
    fn complete_text(&self, call: &CompletionCall) -> Result<BackendResponse, BackendError> {
        if !self.healthy {
            return Err(BackendError::Transport("backend connection failed".to_string()));
        }
        Ok(BackendResponse {
            payload: json!({"id": "cmpl-1", "model": call.backend_model, "choices": []}),
            usage: Some(TokenUsage {
                prompt_tokens: 3,
                completion_tokens: 5,
                total_tokens: 8,
            }),
        })
    }

    fn generate_image(&self, _call: &ImageCall) -> Result<BackendResponse, BackendError> {
        if !self.healthy {
            return Err(BackendError::Transport("backend connection failed".to_string()));
        }
        Ok(BackendResponse {
            payload: json!({"created": 1, "data": [{"url": "https://img.example/1"}]}),
            usage: Some(TokenUsage {
                prompt_tokens: 2,
                completion_tokens: 0,
                total_tokens: 2,
            }),
        })
    }
}

/// Builds a service over the fixture catalog plus a disabled identity and an
/// inactive model.
fn service(healthy: bool, fallback: bool) -> (GatewayService, InMemoryAuditSink) {
    let directory = InMemoryDirectoryStore::with_fixture();
    directory.put_identity(Identity {
        id: IdentityId::new("identity-disabled"),
        handle: "disabled_user".to_string(),
        display_name: "Disabled User".to_string(),
        status: IdentityStatus::Disabled,
        tier: AccessTier::Admin,
        allowed_models: BTreeSet::new(),
        token_ceiling: None,
        feature_flags: BTreeSet::new(),
    });
    directory.put_model(ModelRecord {
        id: ModelId::new("text-retired"),
        name: "Retired Text Model".to_string(),
        description: "decommissioned".to_string(),
        operation: OperationKind::Text,
        required_tier: AccessTier::Basic,
        active: false,
        backend_params: json!({}),
    });
    let sink = InMemoryAuditSink::new();
    let auth = ServerAuthConfig {
        tokens: vec![
            AuthTokenEntry {
                token: "token-admin".to_string(),
                identity_id: IdentityId::new("identity-admin"),
            },
            AuthTokenEntry {
                token: "token-basic".to_string(),
                identity_id: IdentityId::new("identity-basic"),
            },
            AuthTokenEntry {
                token: "token-advanced".to_string(),
                identity_id: IdentityId::new("identity-advanced"),
            },
            AuthTokenEntry {
                token: "token-disabled".to_string(),
                identity_id: IdentityId::new("identity-disabled"),
            },
            AuthTokenEntry {
                token: "token-ghost".to_string(),
                identity_id: IdentityId::new("identity-ghost"),
            },
        ],
    };
    let backend: Arc<dyn ModelBackend> = Arc::new(StubBackend {
        healthy,
    });
    let gateway = GatewayService::new(GatewayServiceParts {
        directory: SharedDirectoryStore::from_store(directory),
        recorder: AuditRecorder::new(Arc::new(sink.clone())),
        audit_reader: AuditReader::Memory(sink.clone()),
        proxy: BackendProxy::new(
            backend,
            FallbackPolicy {
                fallback_on_backend_error: fallback,
            },
        ),
        resolver: IdentityResolver::from_config(Some(&auth), false),
        events: GatewayEvents::new(LogLevel::Error, Arc::new(NoopEventSink)),
        environment: Environment::Development,
    });
    (gateway, sink)
}

/// Builds a request context carrying the given bearer token.
fn ctx(token: &str) -> RequestContext {
    RequestContext {
        auth_header: Some(format!("Bearer {token}")),
        identity_header: None,
        request_id: "req-test".to_string(),
    }
}

/// Builds a completion body with an optional token budget.
fn completion(max_tokens: Option<u32>) -> CompletionBody {
    CompletionBody {
        prompt: "hello".to_string(),
        max_tokens,
        temperature: None,
    }
}

// ============================================================================
// SECTION: Completion Flows
// ============================================================================

#[test]
fn allowed_completion_returns_the_backend_payload_and_audits_success() {
    let (gateway, sink) = service(true, true);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-basic"),
        &completion(Some(500)),
    );
    assert_eq!(status, StatusCode::OK);
    assert!(envelope.ok);
    assert!(envelope.warning.is_none());
    assert_eq!(envelope.data.expect("payload present")["id"], "cmpl-1");

    let records = sink.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Success);
    assert_eq!(records[0].handle.as_deref(), Some("basic_user"));
    assert_eq!(records[0].usage.map(|usage| usage.total_tokens), Some(8));
    assert!(records[0].reason_code.is_none());
}

#[test]
fn under_tier_caller_is_denied_and_audited() {
    let (gateway, sink) = service(true, true);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-advanced"),
        &completion(None),
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    let error = envelope.error.expect("error body");
    assert_eq!(error.code, "ACCESS_DENIED");

    let records = sink.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Denied);
    assert_eq!(records[0].reason_code.as_deref(), Some("ACCESS_DENIED"));
}

#[test]
fn allow_listed_caller_reaches_a_model_above_their_tier() {
    let (gateway, _sink) = service(true, true);
    // The advanced fixture identity allow-lists image-advanced.
    let (status, envelope) = gateway.image_generation(
        &ctx("token-advanced"),
        &ModelId::new("image-advanced"),
        &ImageBody {
            prompt: "a lighthouse".to_string(),
            n: None,
            size: None,
        },
    );
    assert_eq!(status, StatusCode::OK);
    assert!(envelope.ok);
}

#[test]
fn token_budget_over_the_ceiling_is_rejected() {
    let (gateway, sink) = service(true, true);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-basic"),
        &completion(Some(1_001)),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope.error.expect("error body").code, "TOKEN_LIMIT_EXCEEDED");
    assert_eq!(sink.snapshot()[0].reason_code.as_deref(), Some("TOKEN_LIMIT_EXCEEDED"));
}

// ============================================================================
// SECTION: Information Hiding
// ============================================================================

#[test]
fn inactive_and_missing_models_are_indistinguishable_to_callers() {
    let (gateway, _sink) = service(true, true);
    let (missing_status, missing_envelope) = gateway.text_completion(
        &ctx("token-admin"),
        &ModelId::new("no-such-model"),
        &completion(None),
    );
    let (inactive_status, inactive_envelope) = gateway.text_completion(
        &ctx("token-admin"),
        &ModelId::new("text-retired"),
        &completion(None),
    );
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(inactive_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_envelope.error, inactive_envelope.error);
}

#[test]
fn wrong_endpoint_for_a_model_is_treated_as_not_found() {
    let (gateway, _sink) = service(true, true);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-admin"),
        &ModelId::new("image-basic"),
        &completion(None),
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(envelope.error.expect("error body").code, "MODEL_NOT_FOUND");
}

// ============================================================================
// SECTION: Identity Outcomes
// ============================================================================

#[test]
fn unknown_identity_is_audited_with_the_presented_id() {
    let (gateway, sink) = service(true, true);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-ghost"),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(envelope.error.expect("error body").code, "IDENTITY_NOT_FOUND");
    let records = sink.snapshot();
    assert_eq!(records[0].identity_id, IdentityId::new("identity-ghost"));
    assert!(records[0].handle.is_none());
}

#[test]
fn disabled_identity_is_denied_regardless_of_tier() {
    let (gateway, sink) = service(true, true);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-disabled"),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(envelope.error.expect("error body").code, "IDENTITY_DISABLED");
    assert_eq!(sink.snapshot()[0].status, AuditStatus::Denied);
}

#[test]
fn missing_credentials_are_rejected_before_any_audit_write() {
    let (gateway, sink) = service(true, true);
    let (status, envelope) = gateway.text_completion(
        &RequestContext::default(),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(envelope.error.expect("error body").code, "AUTH_REQUIRED");
    assert!(sink.is_empty());
}

// ============================================================================
// SECTION: Fallback Degrade Path
// ============================================================================

#[test]
fn backend_failure_degrades_to_a_warning_success_and_an_error_audit() {
    let (gateway, sink) = service(false, true);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    assert_eq!(status, StatusCode::OK);
    assert!(envelope.ok);
    assert!(envelope.warning.is_some());
    let payload = envelope.data.expect("fallback payload");
    assert_eq!(payload["id"], "fallback-completion");

    let records = sink.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Error);
    assert_eq!(records[0].reason_code.as_deref(), Some("INTERNAL_ERROR"));
    let summary = records[0].response_summary.clone().expect("summary present");
    assert_eq!(summary["fallback"], true);
    assert!(
        summary["failure"]
            .as_str()
            .expect("failure preserved")
            .contains("backend connection failed")
    );
}

#[test]
fn disabled_fallback_surfaces_a_bad_gateway_error() {
    let (gateway, sink) = service(false, false);
    let (status, envelope) = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(envelope.error.expect("error body").code, "INTERNAL_ERROR");
    assert_eq!(sink.snapshot()[0].status, AuditStatus::Error);
}

// ============================================================================
// SECTION: Catalog Listing
// ============================================================================

#[test]
fn listing_shows_only_models_visible_to_the_caller() {
    let (gateway, sink) = service(true, true);
    let (status, envelope) =
        gateway.list_models(&ctx("token-basic"), &ListModelsQuery::default());
    assert_eq!(status, StatusCode::OK);
    let data = envelope.data.expect("listing present");
    assert_eq!(data["count"], 2);

    let (_, admin_envelope) = gateway.list_models(&ctx("token-admin"), &ListModelsQuery::default());
    assert_eq!(admin_envelope.data.expect("listing present")["count"], 4);

    assert_eq!(sink.len(), 2);
}

#[test]
fn listing_honors_the_operation_filter() {
    let (gateway, _sink) = service(true, true);
    let (_, envelope) = gateway.list_models(
        &ctx("token-admin"),
        &ListModelsQuery {
            operation: Some("image".to_string()),
        },
    );
    let data = envelope.data.expect("listing present");
    assert_eq!(data["count"], 2);

    let (_, unknown) = gateway.list_models(
        &ctx("token-admin"),
        &ListModelsQuery {
            operation: Some("audio".to_string()),
        },
    );
    assert_eq!(unknown.data.expect("listing present")["count"], 0);
}

// ============================================================================
// SECTION: Admin Audit Query
// ============================================================================

#[test]
fn admin_can_query_the_audit_trail_with_filters() {
    let (gateway, _sink) = service(true, true);
    let _ = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    let _ = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-advanced"),
        &completion(None),
    );

    let (status, envelope) = gateway.query_logs(
        &ctx("token-admin"),
        &LogsQuery {
            status: Some("denied".to_string()),
            ..LogsQuery::default()
        },
    );
    assert_eq!(status, StatusCode::OK);
    let data = envelope.data.expect("logs present");
    assert_eq!(data["total"], 1);
    assert_eq!(data["logs"][0]["reason_code"], "ACCESS_DENIED");
}

#[test]
fn non_admin_callers_cannot_query_the_audit_trail() {
    let (gateway, _sink) = service(true, true);
    let (status, envelope) = gateway.query_logs(&ctx("token-basic"), &LogsQuery::default());
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(envelope.error.expect("error body").code, "ACCESS_DENIED");
}

#[test]
fn invalid_log_filter_labels_are_rejected() {
    let (gateway, _sink) = service(true, true);
    let (status, _) = gateway.query_logs(
        &ctx("token-admin"),
        &LogsQuery {
            status: Some("exploded".to_string()),
            ..LogsQuery::default()
        },
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// SECTION: Audit Invariant
// ============================================================================

#[test]
fn every_handled_request_writes_exactly_one_audit_record() {
    let (gateway, sink) = service(false, true);
    let _ = gateway.list_models(&ctx("token-basic"), &ListModelsQuery::default());
    let _ = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    let _ = gateway.text_completion(
        &ctx("token-basic"),
        &ModelId::new("text-advanced"),
        &completion(None),
    );
    let _ = gateway.text_completion(
        &ctx("token-ghost"),
        &ModelId::new("text-basic"),
        &completion(None),
    );
    let _ = gateway.image_generation(
        &ctx("token-advanced"),
        &ModelId::new("image-basic"),
        &ImageBody {
            prompt: "a lighthouse".to_string(),
            n: None,
            size: None,
        },
    );
    let records = sink.snapshot();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|record| record.reason_code.is_some()
        || record.status == AuditStatus::Success));
}
