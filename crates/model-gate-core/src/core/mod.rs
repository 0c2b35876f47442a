// model-gate-core/src/core/mod.rs
// ============================================================================
// Module: Model Gate Core Types
// Description: Canonical identity, catalog, decision, and audit structures.
// Purpose: Provide stable, serializable types for gateway decisions and logs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Model Gate core types define the caller identity profile, the model
//! catalog entry, the per-request access decision, and the append-only audit
//! record. These types are the canonical source of truth for any derived API
//! surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod decision;
pub mod hashing;
pub mod identifiers;
pub mod identity;
pub mod model;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditRecord;
pub use audit::AuditStatus;
pub use audit::GatewayOperation;
pub use audit::TokenUsage;
pub use decision::AllowBasis;
pub use decision::Decision;
pub use decision::DenyReason;
pub use decision::EffectiveLimits;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::AuditRecordId;
pub use identifiers::IdentityId;
pub use identifiers::ModelId;
pub use identity::AccessTier;
pub use identity::Identity;
pub use identity::IdentityStatus;
pub use model::ModelRecord;
pub use model::OperationKind;
pub use time::Timestamp;
