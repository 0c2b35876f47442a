// model-gate-core/src/runtime/proxy.rs
// ============================================================================
// Module: Model Gate Backend Proxy
// Description: Forwards allowed requests to the backend with fallback policy.
// Purpose: Normalize backend results and degrade gracefully on backend failure.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! The backend proxy forwards an allowed request to the model backend and
//! normalizes its response and usage. Backend failure is converted into a
//! deterministic fallback response when the explicit [`FallbackPolicy`]
//! permits it; the original failure is preserved so the audit trail records
//! the truth while the caller still receives a usable payload. Only
//! structural and authorization failures surface as hard errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::EffectiveLimits;
use crate::core::IdentityId;
use crate::core::ModelRecord;
use crate::core::Timestamp;
use crate::core::TokenUsage;
use crate::interfaces::BackendError;
use crate::interfaces::BackendResponse;
use crate::interfaces::CompletionCall;
use crate::interfaces::ImageCall;
use crate::interfaces::ModelBackend;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Backend model name used when catalog parameters name none (text).
const DEFAULT_TEXT_BACKEND_MODEL: &str = "text-basic-v1";
/// Backend model name used when catalog parameters name none (image).
const DEFAULT_IMAGE_BACKEND_MODEL: &str = "image-basic-v1";
/// Image size used when neither caller nor catalog supplies one.
const DEFAULT_IMAGE_SIZE: &str = "512x512";
/// Fixed usage estimate attached to text fallback payloads.
const TEXT_FALLBACK_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 20,
    total_tokens: 30,
};
/// Fixed usage estimate attached to image fallback payloads.
const IMAGE_FALLBACK_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 5,
    completion_tokens: 0,
    total_tokens: 5,
};

// ============================================================================
// SECTION: Fallback Policy
// ============================================================================

/// Explicit degrade policy applied on backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FallbackPolicy {
    /// Substitute a deterministic fallback response instead of failing.
    pub fallback_on_backend_error: bool,
}

// ============================================================================
// SECTION: Forward Payloads
// ============================================================================

/// Caller-supplied text completion payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextForward {
    /// Prompt text.
    pub prompt: String,
    /// Sampling temperature when supplied.
    pub temperature: Option<f64>,
}

/// Caller-supplied image generation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageForward {
    /// Prompt text.
    pub prompt: String,
    /// Requested image count, capped by catalog parameters.
    pub n: Option<u32>,
    /// Requested image size; catalog default applies when absent.
    pub size: Option<String>,
}

// ============================================================================
// SECTION: Proxy Outcome
// ============================================================================

/// Result of forwarding an allowed request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyOutcome {
    /// Backend served the request; payload and usage pass through verbatim.
    Success {
        /// Normalized backend response.
        response: BackendResponse,
    },
    /// Backend failed and the policy substituted a fallback response.
    Fallback {
        /// Deterministic placeholder response.
        response: BackendResponse,
        /// Original backend failure, preserved for the audit trail.
        failure: String,
    },
}

impl ProxyOutcome {
    /// Returns the response carried by the outcome.
    #[must_use]
    pub const fn response(&self) -> &BackendResponse {
        match self {
            Self::Success { response } | Self::Fallback { response, .. } => response,
        }
    }

    /// Returns the preserved backend failure for fallback outcomes.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Fallback { failure, .. } => Some(failure.as_str()),
        }
    }
}

// ============================================================================
// SECTION: Backend Proxy
// ============================================================================

/// Forwards allowed requests to a [`ModelBackend`] under a fallback policy.
pub struct BackendProxy<B> {
    /// Backend collaborator.
    backend: B,
    /// Degrade policy applied on backend failure.
    policy: FallbackPolicy,
}

impl<B: ModelBackend> BackendProxy<B> {
    /// Creates a proxy over `backend` with the provided policy.
    #[must_use]
    pub const fn new(backend: B, policy: FallbackPolicy) -> Self {
        Self {
            backend,
            policy,
        }
    }

    /// Returns the active fallback policy.
    #[must_use]
    pub const fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Forwards a text completion to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] only when the backend fails and the fallback
    /// policy is disabled.
    pub fn forward_text(
        &self,
        model: &ModelRecord,
        payload: &TextForward,
        limits: EffectiveLimits,
        user: &IdentityId,
        now: Timestamp,
    ) -> Result<ProxyOutcome, BackendError> {
        let backend_model = backend_model_name(model, DEFAULT_TEXT_BACKEND_MODEL);
        let call = CompletionCall {
            backend_model: backend_model.clone(),
            prompt: payload.prompt.clone(),
            max_tokens: limits.max_tokens,
            temperature: payload.temperature,
            user: user.clone(),
        };
        match self.backend.complete_text(&call) {
            Ok(response) => Ok(ProxyOutcome::Success {
                response,
            }),
            Err(err) if self.policy.fallback_on_backend_error => {
                Ok(text_fallback(&backend_model, &err, now))
            }
            Err(err) => Err(err),
        }
    }

    /// Forwards an image generation to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] only when the backend fails and the fallback
    /// policy is disabled.
    pub fn forward_image(
        &self,
        model: &ModelRecord,
        payload: &ImageForward,
        user: &IdentityId,
        now: Timestamp,
    ) -> Result<ProxyOutcome, BackendError> {
        let backend_model = backend_model_name(model, DEFAULT_IMAGE_BACKEND_MODEL);
        let max_count = param_u32(&model.backend_params, "n").unwrap_or(1);
        let size = payload.size.clone().unwrap_or_else(|| {
            param_str(&model.backend_params, "size")
                .unwrap_or(DEFAULT_IMAGE_SIZE)
                .to_string()
        });
        let call = ImageCall {
            backend_model,
            prompt: payload.prompt.clone(),
            n: payload.n.unwrap_or(1).min(max_count),
            size: size.clone(),
            user: user.clone(),
        };
        match self.backend.generate_image(&call) {
            Ok(response) => Ok(ProxyOutcome::Success {
                response,
            }),
            Err(err) if self.policy.fallback_on_backend_error => {
                Ok(image_fallback(&size, &err, now))
            }
            Err(err) => Err(err),
        }
    }
}

// ============================================================================
// SECTION: Parameter Resolution
// ============================================================================

/// Resolves the backend model name from catalog parameters.
///
/// The catalog stores candidate backend names under `models`; the first
/// entry wins. The catalog id itself is never forwarded.
fn backend_model_name(model: &ModelRecord, default_name: &str) -> String {
    model
        .backend_params
        .get("models")
        .and_then(Value::as_array)
        .and_then(|names| names.first())
        .and_then(Value::as_str)
        .unwrap_or(default_name)
        .to_string()
}

/// Reads a string parameter from the catalog parameter map.
fn param_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// Reads an unsigned integer parameter from the catalog parameter map.
fn param_u32(params: &Value, key: &str) -> Option<u32> {
    params.get(key).and_then(Value::as_u64).and_then(|value| u32::try_from(value).ok())
}

// ============================================================================
// SECTION: Fallback Payloads
// ============================================================================

/// Builds the deterministic text fallback outcome.
fn text_fallback(backend_model: &str, err: &BackendError, now: Timestamp) -> ProxyOutcome {
    let failure = err.to_string();
    let payload = json!({
        "id": "fallback-completion",
        "object": "completion",
        "created": now.as_unix_millis() / 1_000,
        "model": backend_model,
        "choices": [{
            "text": format!(
                "This is a fallback response; the model backend could not be reached: {failure}"
            ),
            "index": 0,
            "logprobs": null,
            "finish_reason": "stop",
        }],
        "usage": TEXT_FALLBACK_USAGE,
    });
    ProxyOutcome::Fallback {
        response: BackendResponse {
            payload,
            usage: Some(TEXT_FALLBACK_USAGE),
        },
        failure,
    }
}

/// Builds the deterministic image fallback outcome.
fn image_fallback(size: &str, err: &BackendError, now: Timestamp) -> ProxyOutcome {
    let failure = err.to_string();
    let payload = json!({
        "created": now.as_unix_millis() / 1_000,
        "data": [{
            "url": format!("https://placehold.co/{size}/webp?text=Fallback+Image"),
        }],
        "usage": IMAGE_FALLBACK_USAGE,
    });
    ProxyOutcome::Fallback {
        response: BackendResponse {
            payload,
            usage: Some(IMAGE_FALLBACK_USAGE),
        },
        failure,
    }
}
