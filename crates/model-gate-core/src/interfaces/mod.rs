// model-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Model Gate Interfaces
// Description: Backend-agnostic interfaces for directory, audit, and backend.
// Purpose: Define the collaborator surfaces used by the Model Gate runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Model Gate integrates with external systems without
//! embedding backend-specific details. Absence is a representable value
//! (`Ok(None)`), never an error; errors are reserved for infrastructure
//! failure and map to internal errors, not denials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::AuditRecord;
use crate::core::Identity;
use crate::core::IdentityId;
use crate::core::ModelId;
use crate::core::ModelRecord;
use crate::core::OperationKind;
use crate::core::TokenUsage;

// ============================================================================
// SECTION: Directory Store
// ============================================================================

/// Directory store errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Store I/O error.
    #[error("directory store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("directory store corruption: {0}")]
    Corrupt(String),
    /// Store data is invalid.
    #[error("directory store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("directory store error: {0}")]
    Store(String),
}

/// Read surface over the identity and model catalogs.
///
/// Catalogs are read-mostly; callers must tolerate a record changing between
/// lookup and decision. A stale read that denies a just-granted permission is
/// acceptable and self-corrects on retry.
pub trait DirectoryStore: Send + Sync {
    /// Looks up an identity by id.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the store itself fails; an unknown id
    /// is `Ok(None)`.
    fn find_identity(&self, id: &IdentityId) -> Result<Option<Identity>, DirectoryError>;

    /// Looks up a model by id.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the store itself fails; an unknown id
    /// is `Ok(None)`.
    fn find_model(&self, id: &ModelId) -> Result<Option<ModelRecord>, DirectoryError>;

    /// Lists active models, optionally restricted to one operation kind.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the store itself fails.
    fn list_active_models(
        &self,
        operation: Option<OperationKind>,
    ) -> Result<Vec<ModelRecord>, DirectoryError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Audit sink errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Sink I/O error.
    #[error("audit sink io error: {0}")]
    Io(String),
    /// Sink reported an error.
    #[error("audit sink error: {0}")]
    Sink(String),
}

/// Append-only sink for audit records.
pub trait AuditSink: Send + Sync {
    /// Appends one audit record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the write fails. Callers report the
    /// failure but never let it alter the response already prepared.
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

// ============================================================================
// SECTION: Model Backend
// ============================================================================

/// Backend call for a text completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionCall {
    /// Backend model name resolved from catalog parameters.
    pub backend_model: String,
    /// Prompt text forwarded verbatim.
    pub prompt: String,
    /// Token ceiling applied to the call.
    pub max_tokens: u32,
    /// Sampling temperature when the caller supplied one.
    pub temperature: Option<f64>,
    /// Identity id forwarded for backend-side attribution.
    pub user: IdentityId,
}

/// Backend call for an image generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCall {
    /// Backend model name resolved from catalog parameters.
    pub backend_model: String,
    /// Prompt text forwarded verbatim.
    pub prompt: String,
    /// Number of images to generate.
    pub n: u32,
    /// Image size label, e.g. `512x512`.
    pub size: String,
    /// Identity id forwarded for backend-side attribution.
    pub user: IdentityId,
}

/// Normalized backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Raw backend payload returned to the caller unchanged.
    pub payload: Value,
    /// Backend-reported token usage, passed through verbatim.
    pub usage: Option<TokenUsage>,
}

/// Model backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, read).
    #[error("backend transport error: {0}")]
    Transport(String),
    /// Backend answered with a non-success status.
    #[error("backend rejected request: status {status}")]
    Status {
        /// HTTP status code reported by the backend.
        status: u16,
    },
    /// Backend payload could not be interpreted.
    #[error("backend returned malformed payload: {0}")]
    MalformedPayload(String),
}

/// Backend model service collaborator.
pub trait ModelBackend: Send + Sync {
    /// Forwards a text completion call.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot serve the call.
    fn complete_text(&self, call: &CompletionCall) -> Result<BackendResponse, BackendError>;

    /// Forwards an image generation call.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot serve the call.
    fn generate_image(&self, call: &ImageCall) -> Result<BackendResponse, BackendError>;
}

impl ModelBackend for std::sync::Arc<dyn ModelBackend> {
    fn complete_text(&self, call: &CompletionCall) -> Result<BackendResponse, BackendError> {
        self.as_ref().complete_text(call)
    }

    fn generate_image(&self, call: &ImageCall) -> Result<BackendResponse, BackendError> {
        self.as_ref().generate_image(call)
    }
}
