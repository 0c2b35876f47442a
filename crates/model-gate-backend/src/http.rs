// model-gate-backend/src/http.rs
// ============================================================================
// Module: HTTP Model Backend
// Description: Blocking HTTP client for the backend model service.
// Purpose: Forward completion and image calls with strict transport limits.
// Dependencies: model-gate-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The HTTP backend posts completion and image-generation calls to the
//! configured model service and normalizes the response into a raw payload
//! plus the backend-reported usage. Transport failures, non-success statuses,
//! and unreadable payloads surface as [`BackendError`]; the proxy decides
//! whether those degrade to a fallback response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use model_gate_core::BackendError;
use model_gate_core::BackendResponse;
use model_gate_core::CompletionCall;
use model_gate_core::ImageCall;
use model_gate_core::ModelBackend;
use model_gate_core::TokenUsage;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Backend path serving text completions.
const COMPLETIONS_PATH: &str = "/v1/completions";
/// Backend path serving image generations.
const IMAGES_PATH: &str = "/v1/images/generations";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP model backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBackendConfig {
    /// Base URL of the backend model service.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Allow cleartext HTTP base URLs.
    pub allow_http: bool,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3001".to_string(),
            timeout_ms: 5_000,
            allow_http: true,
            max_response_bytes: 1024 * 1024,
            user_agent: "model-gate/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Backend Implementation
// ============================================================================

/// Blocking HTTP implementation of [`ModelBackend`].
pub struct HttpModelBackend {
    /// Backend configuration, including limits and policy.
    config: HttpBackendConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpModelBackend {
    /// Creates a new HTTP backend with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the base URL violates the scheme policy
    /// or the HTTP client cannot be created.
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        validate_base_url(&config)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| BackendError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Posts a JSON body and normalizes the response.
    fn post_json(&self, path: &str, body: &Value) -> Result<BackendResponse, BackendError> {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|err| BackendError::Transport(transport_label(&err)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = read_response_limited(response, self.config.max_response_bytes)?;
        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|err| BackendError::MalformedPayload(err.to_string()))?;
        let usage = extract_usage(&payload);
        Ok(BackendResponse {
            payload,
            usage,
        })
    }
}

impl ModelBackend for HttpModelBackend {
    fn complete_text(&self, call: &CompletionCall) -> Result<BackendResponse, BackendError> {
        let mut body = json!({
            "model": call.backend_model,
            "prompt": call.prompt,
            "max_tokens": call.max_tokens,
            "user": call.user,
        });
        if let Some(temperature) = call.temperature
            && let Some(map) = body.as_object_mut()
        {
            map.insert("temperature".to_string(), json!(temperature));
        }
        self.post_json(COMPLETIONS_PATH, &body)
    }

    fn generate_image(&self, call: &ImageCall) -> Result<BackendResponse, BackendError> {
        let body = json!({
            "model": call.backend_model,
            "prompt": call.prompt,
            "n": call.n,
            "size": call.size,
            "user": call.user,
        });
        self.post_json(IMAGES_PATH, &body)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the configured base URL against the scheme policy.
fn validate_base_url(config: &HttpBackendConfig) -> Result<(), BackendError> {
    if config.base_url.starts_with("https://") {
        return Ok(());
    }
    if config.base_url.starts_with("http://") && config.allow_http {
        return Ok(());
    }
    Err(BackendError::Transport("backend base url violates scheme policy".to_string()))
}

/// Normalizes a reqwest error into a stable transport label.
fn transport_label(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "backend request timed out".to_string()
    } else if err.is_connect() {
        "backend connection failed".to_string()
    } else {
        "backend request failed".to_string()
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, BackendError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| BackendError::Transport("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(BackendError::MalformedPayload(
            "backend response exceeds size limit".to_string(),
        ));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|_| BackendError::Transport("failed to read backend response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(BackendError::MalformedPayload(
            "backend response exceeds size limit".to_string(),
        ));
    }
    Ok(buf)
}

/// Extracts the backend-reported usage block, when present and well-formed.
///
/// Usage passes through verbatim; a malformed block degrades to `None`
/// rather than failing an otherwise readable response.
fn extract_usage(payload: &Value) -> Option<TokenUsage> {
    payload.get("usage").and_then(|usage| serde_json::from_value(usage.clone()).ok())
}
