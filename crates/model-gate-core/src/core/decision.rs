// model-gate-core/src/core/decision.rs
// ============================================================================
// Module: Model Gate Access Decision
// Description: The ALLOW/DENY verdict produced for one request.
// Purpose: Represent decision outcomes, reason codes, and effective limits.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Decision`] is the ephemeral verdict the decision engine produces for a
//! single request. Denials carry one reason from a closed taxonomy; allows
//! carry the informational basis that granted access and the effective
//! limits to apply downstream. Decisions are created and discarded within a
//! request and never persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Deny Reasons
// ============================================================================

/// Closed reason taxonomy for denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Model is unknown, inactive, or served by a different endpoint.
    ModelNotFound,
    /// Caller identity is unknown.
    IdentityNotFound,
    /// Caller identity is disabled.
    IdentityDisabled,
    /// Caller lacks tier or allow-list access to the model.
    AccessDenied,
    /// Requested tokens exceed the caller's token ceiling.
    TokenLimitExceeded,
}

impl DenyReason {
    /// Returns the stable wire code for the reason.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ModelNotFound => "MODEL_NOT_FOUND",
            Self::IdentityNotFound => "IDENTITY_NOT_FOUND",
            Self::IdentityDisabled => "IDENTITY_DISABLED",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::TokenLimitExceeded => "TOKEN_LIMIT_EXCEEDED",
        }
    }

    /// Returns the caller-facing message for the reason.
    ///
    /// Messages deliberately do not distinguish nonexistent, inactive, and
    /// wrong-endpoint models beyond the shared not-found wording.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ModelNotFound => "model not found",
            Self::IdentityNotFound => "identity not found",
            Self::IdentityDisabled => "identity is disabled",
            Self::AccessDenied => "access to this model is not permitted",
            Self::TokenLimitExceeded => "requested tokens exceed the permitted ceiling",
        }
    }
}

// ============================================================================
// SECTION: Allow Basis
// ============================================================================

/// Informational basis recorded when access is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowBasis {
    /// Granted because the caller holds the admin tier.
    AdminTier,
    /// Granted by explicit allow-list membership.
    AllowList,
    /// Granted because the caller's tier meets the model's required tier.
    TierRank,
}

impl AllowBasis {
    /// Returns the stable label for the basis.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminTier => "admin_tier",
            Self::AllowList => "allow_list",
            Self::TierRank => "tier_rank",
        }
    }
}

// ============================================================================
// SECTION: Effective Limits
// ============================================================================

/// Resource limits applied to an allowed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveLimits {
    /// Token ceiling forwarded to the backend for text operations.
    pub max_tokens: u32,
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Verdict produced by the access decision engine for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// Request is authorized with the given limits.
    Allow {
        /// Informational basis that granted access.
        basis: AllowBasis,
        /// Effective limits to apply downstream.
        limits: EffectiveLimits,
    },
    /// Request is denied.
    Deny {
        /// Reason for the denial.
        reason: DenyReason,
    },
}

impl Decision {
    /// Returns true when the decision allows the request.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Returns the deny reason when the decision is a denial.
    #[must_use]
    pub const fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow { .. } => None,
            Self::Deny { reason } => Some(*reason),
        }
    }

    /// Returns the effective limits when the decision allows the request.
    #[must_use]
    pub const fn limits(&self) -> Option<EffectiveLimits> {
        match self {
            Self::Allow { limits, .. } => Some(*limits),
            Self::Deny { .. } => None,
        }
    }
}
