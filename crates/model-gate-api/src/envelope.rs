// model-gate-api/src/envelope.rs
// ============================================================================
// Module: Gateway Response Envelope
// Description: Caller-facing response envelope and HTTP status mapping.
// Purpose: Keep reason codes stable and internal detail environment-gated.
// Dependencies: axum, model-gate-core, serde
// ============================================================================

//! ## Overview
//! Every gateway endpoint answers with the same envelope:
//! `{ ok, data?, error? { code, message }, warning? }`. Denials surface only
//! the closed reason-code set; the not-found code deliberately hides whether
//! a model is nonexistent, inactive, or served by a different endpoint.
//! Internal errors carry detail only in the development environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::StatusCode;
use model_gate_config::Environment;
use model_gate_core::DenyReason;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Stable code for collaborator failures.
pub const INTERNAL_ERROR_CODE: &str = "INTERNAL_ERROR";
/// Stable code for unauthenticated requests.
pub const AUTH_REQUIRED_CODE: &str = "AUTH_REQUIRED";
/// Generic internal error message used in production.
const INTERNAL_ERROR_MESSAGE: &str = "an internal error occurred";

// ============================================================================
// SECTION: Envelope Types
// ============================================================================

/// Caller-facing error payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Caller-facing response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Envelope {
    /// Whether the request produced a usable result.
    pub ok: bool,
    /// Result payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error payload on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    /// Degrade warning attached to fallback responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Envelope {
    /// Builds a success envelope.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            warning: None,
        }
    }

    /// Builds a success envelope carrying a degrade warning.
    #[must_use]
    pub fn success_with_warning(data: Value, warning: impl Into<String>) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            warning: Some(warning.into()),
        }
    }

    /// Builds a failure envelope.
    #[must_use]
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
            warning: None,
        }
    }
}

// ============================================================================
// SECTION: Reply Construction
// ============================================================================

/// HTTP status plus envelope, the unit every handler produces.
pub type Reply = (StatusCode, Envelope);

/// Builds the reply for a denial.
#[must_use]
pub fn deny_reply(reason: DenyReason) -> Reply {
    (deny_status(reason), Envelope::failure(reason.code(), reason.message()))
}

/// Builds the reply for an unauthenticated request.
#[must_use]
pub fn auth_required_reply(message: &str) -> Reply {
    (StatusCode::UNAUTHORIZED, Envelope::failure(AUTH_REQUIRED_CODE, message))
}

/// Builds the reply for a collaborator failure.
///
/// Detail is surfaced only in the development environment; production
/// callers receive a generic message.
#[must_use]
pub fn internal_error_reply(environment: Environment, status: StatusCode, detail: &str) -> Reply {
    let message = if environment.is_development() {
        detail.to_string()
    } else {
        INTERNAL_ERROR_MESSAGE.to_string()
    };
    (status, Envelope::failure(INTERNAL_ERROR_CODE, message))
}

/// Maps a deny reason to its HTTP status.
#[must_use]
pub const fn deny_status(reason: DenyReason) -> StatusCode {
    match reason {
        DenyReason::ModelNotFound | DenyReason::IdentityNotFound => StatusCode::NOT_FOUND,
        DenyReason::IdentityDisabled | DenyReason::AccessDenied => StatusCode::FORBIDDEN,
        DenyReason::TokenLimitExceeded => StatusCode::BAD_REQUEST,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only envelope assertions."
    )]

    use axum::http::StatusCode;
    use model_gate_config::Environment;
    use model_gate_core::DenyReason;

    use super::deny_reply;
    use super::deny_status;
    use super::internal_error_reply;

    #[test]
    fn deny_statuses_follow_the_documented_mapping() {
        assert_eq!(deny_status(DenyReason::ModelNotFound), StatusCode::NOT_FOUND);
        assert_eq!(deny_status(DenyReason::IdentityNotFound), StatusCode::NOT_FOUND);
        assert_eq!(deny_status(DenyReason::IdentityDisabled), StatusCode::FORBIDDEN);
        assert_eq!(deny_status(DenyReason::AccessDenied), StatusCode::FORBIDDEN);
        assert_eq!(deny_status(DenyReason::TokenLimitExceeded), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn deny_replies_carry_the_stable_code() {
        let (status, envelope) = deny_reply(DenyReason::AccessDenied);
        assert_eq!(status, StatusCode::FORBIDDEN);
        let error = envelope.error.expect("error body present");
        assert_eq!(error.code, "ACCESS_DENIED");
        assert!(!envelope.ok);
    }

    #[test]
    fn internal_detail_is_gated_to_development() {
        let (_, dev) = internal_error_reply(
            Environment::Development,
            StatusCode::INTERNAL_SERVER_ERROR,
            "directory store io error: disk gone",
        );
        assert!(dev.error.expect("error body").message.contains("disk gone"));

        let (_, prod) = internal_error_reply(
            Environment::Production,
            StatusCode::INTERNAL_SERVER_ERROR,
            "directory store io error: disk gone",
        );
        assert!(!prod.error.expect("error body").message.contains("disk gone"));
    }
}
