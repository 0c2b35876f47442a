// model-gate-core/src/runtime/recorder.rs
// ============================================================================
// Module: Model Gate Audit Recorder
// Description: Builds and persists exactly one audit record per request.
// Purpose: Guarantee a complete audit trail across allow, deny, and error paths.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The audit recorder turns request metadata and a final outcome into an
//! immutable [`AuditRecord`] and attempts the append synchronously before
//! the handler returns. A failed append is surfaced to the caller for
//! reporting but must never alter the response already prepared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::core::AuditRecord;
use crate::core::AuditRecordId;
use crate::core::AuditStatus;
use crate::core::GatewayOperation;
use crate::core::IdentityId;
use crate::core::ModelId;
use crate::core::Timestamp;
use crate::core::TokenUsage;
use crate::interfaces::AuditError;
use crate::interfaces::AuditSink;

// ============================================================================
// SECTION: Audit Draft
// ============================================================================

/// Request-scoped draft collected while a request is being served.
///
/// A draft is created when the request arrives and finished exactly once on
/// the path that produces the response.
#[derive(Debug, Clone)]
pub struct AuditDraft {
    /// Record identifier assigned at request arrival.
    id: AuditRecordId,
    /// Identity id the caller presented.
    identity_id: IdentityId,
    /// Login handle, set once the identity is resolved.
    handle: Option<String>,
    /// Target model, absent for catalog listings.
    model_id: Option<ModelId>,
    /// Gateway operation.
    operation: GatewayOperation,
    /// Request arrival time.
    requested_at: Timestamp,
    /// Opaque request parameters for forensic replay.
    request_params: Option<Value>,
}

impl AuditDraft {
    /// Opens a draft for an arriving request.
    #[must_use]
    pub const fn begin(
        id: AuditRecordId,
        identity_id: IdentityId,
        operation: GatewayOperation,
        requested_at: Timestamp,
    ) -> Self {
        Self {
            id,
            identity_id,
            handle: None,
            model_id: None,
            operation,
            requested_at,
            request_params: None,
        }
    }

    /// Sets the target model id.
    #[must_use]
    pub fn with_model(mut self, model_id: ModelId) -> Self {
        self.model_id = Some(model_id);
        self
    }

    /// Sets the resolved login handle.
    #[must_use]
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Attaches opaque request parameters.
    #[must_use]
    pub fn with_request_params(mut self, params: Value) -> Self {
        self.request_params = Some(params);
        self
    }

    /// Finishes the draft into an immutable record.
    ///
    /// # Invariants
    /// - `outcome.reason_code` must be present whenever `outcome.status` is
    ///   not [`AuditStatus::Success`]; handlers uphold this on every path.
    #[must_use]
    pub fn finish(self, completed_at: Timestamp, outcome: AuditOutcome) -> AuditRecord {
        AuditRecord {
            id: self.id,
            identity_id: self.identity_id,
            handle: self.handle,
            model_id: self.model_id,
            operation: self.operation,
            requested_at: self.requested_at,
            duration_ms: self.requested_at.millis_until(completed_at),
            status: outcome.status,
            reason_code: outcome.reason_code,
            usage: outcome.usage,
            request_params: self.request_params,
            response_summary: outcome.response_summary,
        }
    }
}

// ============================================================================
// SECTION: Audit Outcome
// ============================================================================

/// Final outcome folded into a draft when the request completes.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// Final request status.
    pub status: AuditStatus,
    /// Stable reason code; required when status is not success.
    pub reason_code: Option<String>,
    /// Backend token usage when available.
    pub usage: Option<TokenUsage>,
    /// Opaque response summary for forensic replay.
    pub response_summary: Option<Value>,
}

impl AuditOutcome {
    /// Builds a success outcome.
    #[must_use]
    pub const fn success(usage: Option<TokenUsage>, response_summary: Option<Value>) -> Self {
        Self {
            status: AuditStatus::Success,
            reason_code: None,
            usage,
            response_summary,
        }
    }

    /// Builds a denied outcome carrying the deny reason code.
    #[must_use]
    pub fn denied(reason_code: impl Into<String>) -> Self {
        Self {
            status: AuditStatus::Denied,
            reason_code: Some(reason_code.into()),
            usage: None,
            response_summary: None,
        }
    }

    /// Builds an error outcome carrying the failure reason.
    #[must_use]
    pub fn error(reason_code: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            status: AuditStatus::Error,
            reason_code: Some(reason_code.into()),
            usage,
            response_summary: None,
        }
    }

    /// Attaches a response summary to the outcome.
    #[must_use]
    pub fn with_response_summary(mut self, summary: Value) -> Self {
        self.response_summary = Some(summary);
        self
    }
}

// ============================================================================
// SECTION: Audit Recorder
// ============================================================================

/// Shared recorder writing finished records through an [`AuditSink`].
#[derive(Clone)]
pub struct AuditRecorder {
    /// Append-only sink collaborator.
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    /// Creates a recorder over the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
        }
    }

    /// Attempts to append a finished record synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the sink write fails; callers report the
    /// failure but keep the response they already prepared.
    pub fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.sink.append(record)
    }
}
