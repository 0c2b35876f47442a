// model-gate-core/src/core/time.rs
// ============================================================================
// Module: Model Gate Time Model
// Description: Canonical timestamp representation for audit records.
// Purpose: Provide explicit time values so the decision path stays replayable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Model Gate embeds explicit time values in audit records. The decision
//! engine never reads wall-clock time directly; hosts supply timestamps at
//! request boundaries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in Model Gate audit records.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the non-negative distance to a later timestamp in milliseconds.
    #[must_use]
    pub const fn millis_until(self, later: Self) -> u64 {
        let delta = later.0.saturating_sub(self.0);
        if delta < 0 { 0 } else { delta as u64 }
    }
}
