// crates/model-gate-core/tests/proxy.rs
// ============================================================================
// Module: Backend Proxy Tests
// Description: Validates fallback policy behavior and usage pass-through.
// Purpose: Pin the degrade-gracefully contract and parameter resolution.
// ============================================================================

//! ## Overview
//! Covers verbatim usage pass-through on backend success, deterministic
//! fallback payloads on failure, the policy toggle that turns fallback off,
//! and backend model name resolution from catalog parameters.

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

use std::sync::Mutex;

use model_gate_core::AccessTier;
use model_gate_core::BackendError;
use model_gate_core::BackendProxy;
use model_gate_core::BackendResponse;
use model_gate_core::CompletionCall;
use model_gate_core::EffectiveLimits;
use model_gate_core::FallbackPolicy;
use model_gate_core::IdentityId;
use model_gate_core::ImageCall;
use model_gate_core::ImageForward;
use model_gate_core::ModelBackend;
use model_gate_core::ModelId;
use model_gate_core::ModelRecord;
use model_gate_core::OperationKind;
use model_gate_core::ProxyOutcome;
use model_gate_core::TextForward;
use model_gate_core::Timestamp;
use model_gate_core::TokenUsage;
use serde_json::json;

/// Stub backend that either succeeds with a fixed payload or always fails.
struct StubBackend {
    /// When false, every call fails with a transport error.
    healthy: bool,
    /// Captured completion calls for assertion.
    completion_calls: Mutex<Vec<CompletionCall>>,
    /// Captured image calls for assertion.
    image_calls: Mutex<Vec<ImageCall>>,
}

impl StubBackend {
    /// Creates a stub backend with the given health.
    fn new(healthy: bool) -> Self {
        Self {
            healthy,
            completion_calls: Mutex::new(Vec::new()),
            image_calls: Mutex::new(Vec::new()),
        }
    }
}

impl ModelBackend for &StubBackend {
    fn complete_text(&self, call: &CompletionCall) -> Result<BackendResponse, BackendError> {
        self.completion_calls.lock().expect("lock").push(call.clone());
        if !self.healthy {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(BackendResponse {
            payload: json!({"id": "cmpl-1", "model": call.backend_model}),
            usage: Some(TokenUsage {
                prompt_tokens: 7,
                completion_tokens: 11,
                total_tokens: 18,
            }),
        })
    }

    fn generate_image(&self, call: &ImageCall) -> Result<BackendResponse, BackendError> {
        self.image_calls.lock().expect("lock").push(call.clone());
        if !self.healthy {
            return Err(BackendError::Status {
                status: 503,
            });
        }
        Ok(BackendResponse {
            payload: json!({"created": 1, "data": [{"url": "https://img.example/1"}]}),
            usage: Some(TokenUsage {
                prompt_tokens: 4,
                completion_tokens: 0,
                total_tokens: 4,
            }),
        })
    }
}

/// Builds a text catalog model with explicit backend parameters.
fn text_model() -> ModelRecord {
    ModelRecord {
        id: ModelId::new("text-advanced"),
        name: "Advanced Text Model".to_string(),
        description: "test".to_string(),
        operation: OperationKind::Text,
        required_tier: AccessTier::Advanced,
        active: true,
        backend_params: json!({"models": ["text-advanced-v1"], "temperature": 0.7}),
    }
}

/// Builds an image catalog model with explicit backend parameters.
fn image_model() -> ModelRecord {
    ModelRecord {
        id: ModelId::new("image-advanced"),
        name: "Advanced Image Model".to_string(),
        description: "test".to_string(),
        operation: OperationKind::Image,
        required_tier: AccessTier::Advanced,
        active: true,
        backend_params: json!({"models": ["image-advanced-v1"], "n": 4, "size": "1024x1024"}),
    }
}

/// Fixed timestamp used across proxy tests.
const NOW: Timestamp = Timestamp::from_unix_millis(1_700_000_000_000);

#[test]
fn successful_completion_passes_usage_through_verbatim() {
    let backend = StubBackend::new(true);
    let proxy = BackendProxy::new(
        &backend,
        FallbackPolicy {
            fallback_on_backend_error: true,
        },
    );
    let outcome = proxy
        .forward_text(
            &text_model(),
            &TextForward {
                prompt: "hello".to_string(),
                temperature: Some(0.2),
            },
            EffectiveLimits {
                max_tokens: 4_000,
            },
            &IdentityId::new("identity-1"),
            NOW,
        )
        .expect("forward succeeds");
    match outcome {
        ProxyOutcome::Success {
            response,
        } => {
            let usage = response.usage.expect("usage present");
            assert_eq!(usage.total_tokens, 18);
        }
        ProxyOutcome::Fallback {
            ..
        } => panic!("expected success outcome"),
    }
    let calls = backend.completion_calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].backend_model, "text-advanced-v1");
    assert_eq!(calls[0].max_tokens, 4_000);
}

#[test]
fn backend_failure_with_fallback_enabled_degrades_to_placeholder() {
    let backend = StubBackend::new(false);
    let proxy = BackendProxy::new(
        &backend,
        FallbackPolicy {
            fallback_on_backend_error: true,
        },
    );
    let outcome = proxy
        .forward_text(
            &text_model(),
            &TextForward {
                prompt: "hello".to_string(),
                temperature: None,
            },
            EffectiveLimits {
                max_tokens: 1_000,
            },
            &IdentityId::new("identity-1"),
            NOW,
        )
        .expect("fallback substitutes a response");
    let failure = outcome.failure().expect("failure preserved");
    assert!(failure.contains("connection refused"));
    let usage = outcome.response().usage.expect("fallback usage estimate");
    assert_eq!(usage.total_tokens, 30);
    let text = outcome.response().payload["choices"][0]["text"]
        .as_str()
        .expect("fallback text present");
    assert!(text.contains("connection refused"));
}

#[test]
fn backend_failure_with_fallback_disabled_propagates_the_error() {
    let backend = StubBackend::new(false);
    let proxy = BackendProxy::new(
        &backend,
        FallbackPolicy {
            fallback_on_backend_error: false,
        },
    );
    let result = proxy.forward_text(
        &text_model(),
        &TextForward {
            prompt: "hello".to_string(),
            temperature: None,
        },
        EffectiveLimits {
            max_tokens: 1_000,
        },
        &IdentityId::new("identity-1"),
        NOW,
    );
    assert!(result.is_err());
}

#[test]
fn image_fallback_uses_the_resolved_size_and_fixed_usage() {
    let backend = StubBackend::new(false);
    let proxy = BackendProxy::new(
        &backend,
        FallbackPolicy {
            fallback_on_backend_error: true,
        },
    );
    let outcome = proxy
        .forward_image(
            &image_model(),
            &ImageForward {
                prompt: "a lighthouse".to_string(),
                n: None,
                size: None,
            },
            &IdentityId::new("identity-1"),
            NOW,
        )
        .expect("fallback substitutes a response");
    let url = outcome.response().payload["data"][0]["url"].as_str().expect("url present");
    assert!(url.contains("1024x1024"));
    let usage = outcome.response().usage.expect("fallback usage estimate");
    assert_eq!(usage.total_tokens, 5);
}

#[test]
fn image_count_is_capped_by_catalog_parameters() {
    let backend = StubBackend::new(true);
    let proxy = BackendProxy::new(
        &backend,
        FallbackPolicy {
            fallback_on_backend_error: true,
        },
    );
    proxy
        .forward_image(
            &image_model(),
            &ImageForward {
                prompt: "a lighthouse".to_string(),
                n: Some(10),
                size: Some("256x256".to_string()),
            },
            &IdentityId::new("identity-1"),
            NOW,
        )
        .expect("forward succeeds");
    let calls = backend.image_calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].n, 4);
    assert_eq!(calls[0].size, "256x256");
    assert_eq!(calls[0].backend_model, "image-advanced-v1");
}

#[test]
fn missing_catalog_model_names_fall_back_to_operation_defaults() {
    let backend = StubBackend::new(true);
    let proxy = BackendProxy::new(
        &backend,
        FallbackPolicy {
            fallback_on_backend_error: true,
        },
    );
    let mut bare = text_model();
    bare.backend_params = json!({});
    proxy
        .forward_text(
            &bare,
            &TextForward {
                prompt: "hello".to_string(),
                temperature: None,
            },
            EffectiveLimits {
                max_tokens: 500,
            },
            &IdentityId::new("identity-1"),
            NOW,
        )
        .expect("forward succeeds");
    let calls = backend.completion_calls.lock().expect("lock");
    assert_eq!(calls[0].backend_model, "text-basic-v1");
}
