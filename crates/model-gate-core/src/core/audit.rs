// model-gate-core/src/core/audit.rs
// ============================================================================
// Module: Model Gate Audit Model
// Description: Immutable audit records for attempted model access.
// Purpose: Represent the append-only trail written once per request.
// Dependencies: serde, serde_json, crate::core
// ============================================================================

//! ## Overview
//! An [`AuditRecord`] captures the outcome of exactly one gateway request:
//! who asked, which model, which operation, the verdict, timing, and token
//! usage when available. Records are constructed once per request and never
//! mutated after the request completes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AuditRecordId;
use crate::core::identifiers::IdentityId;
use crate::core::identifiers::ModelId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Gateway Operation
// ============================================================================

/// Gateway operation covered by the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOperation {
    /// Catalog listing of models visible to the caller.
    ListModels,
    /// Text completion request.
    TextCompletion,
    /// Image generation request.
    ImageGeneration,
}

impl GatewayOperation {
    /// Returns the stable string label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListModels => "list_models",
            Self::TextCompletion => "text_completion",
            Self::ImageGeneration => "image_generation",
        }
    }

    /// Parses an operation from its stable string label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "list_models" => Some(Self::ListModels),
            "text_completion" => Some(Self::TextCompletion),
            "image_generation" => Some(Self::ImageGeneration),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Audit Status
// ============================================================================

/// Final status of an audited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Request was authorized and served.
    Success,
    /// Request was denied by the decision engine.
    Denied,
    /// Request failed on a collaborator, including the fallback degrade path.
    Error,
}

impl AuditStatus {
    /// Returns the stable string label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }

    /// Parses a status from its stable string label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "success" => Some(Self::Success),
            "denied" => Some(Self::Denied),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Token Usage
// ============================================================================

/// Token usage reported by the backend, passed through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u64,
    /// Tokens produced by the completion.
    pub completion_tokens: u64,
    /// Total tokens reported by the backend.
    pub total_tokens: u64,
}

// ============================================================================
// SECTION: Audit Record
// ============================================================================

/// Append-only record of one gateway request.
///
/// # Invariants
/// - Exactly one record exists per request, on every code path.
/// - `reason_code` is present whenever `status` is not [`AuditStatus::Success`].
/// - Records are immutable once the request completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: AuditRecordId,
    /// Identity id the caller presented, even when no such identity exists.
    pub identity_id: IdentityId,
    /// Login handle when the identity was resolved.
    pub handle: Option<String>,
    /// Target model, absent for catalog listings.
    pub model_id: Option<ModelId>,
    /// Gateway operation.
    pub operation: GatewayOperation,
    /// Request arrival time (unix millis).
    pub requested_at: Timestamp,
    /// Wall-clock duration of the request in milliseconds.
    pub duration_ms: u64,
    /// Final request status.
    pub status: AuditStatus,
    /// Stable reason code; required when `status` is not success.
    pub reason_code: Option<String>,
    /// Backend token usage when available.
    pub usage: Option<TokenUsage>,
    /// Opaque request parameters retained for forensic replay.
    pub request_params: Option<Value>,
    /// Opaque response summary retained for forensic replay.
    pub response_summary: Option<Value>,
}
