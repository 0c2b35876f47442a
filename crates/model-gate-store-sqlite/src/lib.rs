// model-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Model Gate SQLite Store Library
// Description: Durable directory and audit stores backed by SQLite.
// Purpose: Expose the SQLite store implementations used by the gateway.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! This crate provides durable implementations of the Model Gate directory
//! store and audit sink using `SQLite` in WAL mode. Audit rows carry
//! canonical-JSON snapshots with SHA-256 digests that are verified on read;
//! tampered rows fail closed instead of being served.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::AuditPage;
pub use store::AuditQuery;
pub use store::SqliteAuditStore;
pub use store::SqliteDirectoryStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
