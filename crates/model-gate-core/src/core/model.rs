// model-gate-core/src/core/model.rs
// ============================================================================
// Module: Model Gate Catalog Model
// Description: Catalog entries describing backend AI model endpoints.
// Purpose: Provide the immutable model records consumed by the decision engine.
// Dependencies: serde, serde_json, crate::core
// ============================================================================

//! ## Overview
//! A [`ModelRecord`] describes one AI capability endpoint: its operation
//! kind, required access tier, activation flag, and the opaque backend
//! parameters forwarded to the proxy. Unrecognized operation labels
//! deserialize to [`OperationKind::Unsupported`] so a widened catalog never
//! breaks an older gateway.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ModelId;
use crate::core::identity::AccessTier;

// ============================================================================
// SECTION: Operation Kind
// ============================================================================

/// Operation served by a catalog model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Text completion.
    Text,
    /// Image generation.
    Image,
    /// Catalog label this gateway does not serve; treated as not-found.
    #[serde(other)]
    Unsupported,
}

impl OperationKind {
    /// Returns the stable string label for the operation kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Unsupported => "unsupported",
        }
    }

    /// Parses an operation kind from its stable string label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Model Record
// ============================================================================

/// Catalog entry for one backend AI model.
///
/// # Invariants
/// - `required_tier` is meaningful only while `active` is true; inactive
///   models are denied for every identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Unique catalog identifier.
    pub id: ModelId,
    /// Human-readable model name.
    pub name: String,
    /// Model description for catalog listings.
    pub description: String,
    /// Operation this model serves.
    pub operation: OperationKind,
    /// Minimum tier required for tier-based access.
    #[serde(default)]
    pub required_tier: AccessTier,
    /// Whether the model accepts requests.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Opaque parameters passed through to the backend proxy.
    #[serde(default = "default_backend_params")]
    pub backend_params: Value,
}

/// Returns the default activation flag for deserialized records.
const fn default_active() -> bool {
    true
}

/// Returns the default empty backend parameter map.
fn default_backend_params() -> Value {
    Value::Object(serde_json::Map::new())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
