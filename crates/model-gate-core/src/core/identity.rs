// model-gate-core/src/core/identity.rs
// ============================================================================
// Module: Model Gate Identity Model
// Description: Caller identity records and the ordered access tier.
// Purpose: Provide the immutable caller profile consumed by the decision engine.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! An [`Identity`] is the caller profile the decision engine evaluates:
//! status, ordered access tier, explicit model allow-list, and token ceiling.
//! Tier comparison is centralized in [`AccessTier::rank`]; no other component
//! may order tiers on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::IdentityId;
use crate::core::identifiers::ModelId;

// ============================================================================
// SECTION: Access Tier
// ============================================================================

/// Ordered access tier gating model access.
///
/// # Invariants
/// - The ordering `Basic < Advanced < Admin` is total and matches [`AccessTier::rank`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    /// Entry-level tier.
    #[default]
    Basic,
    /// Elevated tier for advanced models.
    Advanced,
    /// Administrative tier with access to every active model.
    Admin,
}

impl AccessTier {
    /// Returns the numeric rank used for tier comparison.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Advanced => 2,
            Self::Admin => 3,
        }
    }

    /// Returns the tier-derived default token ceiling.
    #[must_use]
    pub const fn default_token_ceiling(self) -> u32 {
        match self {
            Self::Basic => 1_000,
            Self::Advanced => 4_000,
            Self::Admin => 10_000,
        }
    }

    /// Returns the stable string label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Admin => "admin",
        }
    }

    /// Parses a tier from its stable string label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "basic" => Some(Self::Basic),
            "advanced" => Some(Self::Advanced),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Identity Status
// ============================================================================

/// Activation status for a caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    /// Identity may make requests subject to authorization.
    #[default]
    Active,
    /// Identity is denied regardless of tier or allow-list.
    Disabled,
}

impl IdentityStatus {
    /// Returns true when the identity is disabled.
    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled)
    }
}

// ============================================================================
// SECTION: Identity Record
// ============================================================================

/// Caller identity profile.
///
/// # Invariants
/// - `token_ceiling`, when present, is greater than zero (enforced at store
///   and configuration boundaries).
/// - `allowed_models` entries need not reference existing catalog models;
///   stale references simply never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque unique identifier.
    pub id: IdentityId,
    /// Unique human-readable login name.
    pub handle: String,
    /// Display name for audit and reporting surfaces.
    pub display_name: String,
    /// Activation status.
    #[serde(default)]
    pub status: IdentityStatus,
    /// Ordered access tier.
    #[serde(default)]
    pub tier: AccessTier,
    /// Models explicitly permitted regardless of tier comparison.
    #[serde(default)]
    pub allowed_models: BTreeSet<ModelId>,
    /// Per-identity token ceiling override; falls back to the tier default.
    #[serde(default)]
    pub token_ceiling: Option<u32>,
    /// Opaque capability strings carried through to collaborators.
    #[serde(default)]
    pub feature_flags: BTreeSet<String>,
}

impl Identity {
    /// Resolves the effective token ceiling: explicit override, else the
    /// tier-derived default.
    #[must_use]
    pub fn effective_token_ceiling(&self) -> u32 {
        self.token_ceiling.unwrap_or_else(|| self.tier.default_token_ceiling())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
