// model-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Model Gate Decision Engine
// Description: Deterministic access decisions for one (identity, model) pair.
// Purpose: Decide ALLOW/DENY and compute effective limits without I/O.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The decision engine maps an optional identity, an optional model, the
//! requested operation, and the requested token budget to a [`Decision`].
//! The check order is fixed; reordering it would change which reason code a
//! request with several defects receives. The engine performs no I/O and
//! never fails: absence and policy violations are ordinary return values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::AccessTier;
use crate::core::AllowBasis;
use crate::core::Decision;
use crate::core::DenyReason;
use crate::core::EffectiveLimits;
use crate::core::Identity;
use crate::core::ModelRecord;
use crate::core::OperationKind;

// ============================================================================
// SECTION: Decision Entry Point
// ============================================================================

/// Decides whether `identity` may invoke `operation` on `model`.
///
/// Check order (fixed):
/// 1. unknown model
/// 2. inactive model (indistinguishable from unknown to the caller)
/// 3. operation mismatch (wrong endpoint is treated as not-found)
/// 4. unknown identity
/// 5. disabled identity
/// 6. authorization disjunction: admin tier, allow-list, or tier rank
/// 7. token ceiling for text operations
/// 8. allow with effective limits
#[must_use]
pub fn decide(
    identity: Option<&Identity>,
    model: Option<&ModelRecord>,
    operation: OperationKind,
    requested_tokens: Option<u32>,
) -> Decision {
    let Some(model) = model else {
        return Decision::Deny {
            reason: DenyReason::ModelNotFound,
        };
    };
    if !model.active {
        return Decision::Deny {
            reason: DenyReason::ModelNotFound,
        };
    }
    if operation != model.operation {
        return Decision::Deny {
            reason: DenyReason::ModelNotFound,
        };
    }
    let Some(identity) = identity else {
        return Decision::Deny {
            reason: DenyReason::IdentityNotFound,
        };
    };
    if identity.status.is_disabled() {
        return Decision::Deny {
            reason: DenyReason::IdentityDisabled,
        };
    }
    let Some(basis) = grant_basis(identity, model) else {
        return Decision::Deny {
            reason: DenyReason::AccessDenied,
        };
    };
    let ceiling = identity.effective_token_ceiling();
    if operation == OperationKind::Text
        && let Some(requested) = requested_tokens
        && requested > ceiling
    {
        return Decision::Deny {
            reason: DenyReason::TokenLimitExceeded,
        };
    }
    let max_tokens =
        requested_tokens.unwrap_or_else(|| identity.tier.default_token_ceiling()).min(ceiling);
    Decision::Allow {
        basis,
        limits: EffectiveLimits {
            max_tokens,
        },
    }
}

// ============================================================================
// SECTION: Authorization Disjunction
// ============================================================================

/// Returns the basis that grants access, if any.
///
/// The allow-list is evaluated as a disjunct, not a fallback: membership
/// alone is sufficient even below the required tier, and a higher tier is
/// sufficient without membership.
fn grant_basis(identity: &Identity, model: &ModelRecord) -> Option<AllowBasis> {
    if identity.tier == AccessTier::Admin {
        return Some(AllowBasis::AdminTier);
    }
    if identity.allowed_models.contains(&model.id) {
        return Some(AllowBasis::AllowList);
    }
    if identity.tier.rank() >= model.required_tier.rank() {
        return Some(AllowBasis::TierRank);
    }
    None
}

// ============================================================================
// SECTION: Catalog Visibility
// ============================================================================

/// Returns true when `model` appears in `identity`'s catalog listing.
///
/// Visibility uses the same disjunction as [`decide`] step 6, restricted to
/// active models; an inactive model is invisible to everyone, including
/// admin.
#[must_use]
pub fn visible(identity: &Identity, model: &ModelRecord) -> bool {
    model.active && grant_basis(identity, model).is_some()
}
