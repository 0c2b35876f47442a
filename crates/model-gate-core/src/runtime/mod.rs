// model-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Model Gate Runtime
// Description: Decision engine, backend proxy, audit recorder, and stores.
// Purpose: Provide the request-scoped runtime built on the core types.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime combines the pure decision engine with the backend proxy and
//! the audit recorder. Everything here is deterministic given its inputs;
//! I/O happens only behind the collaborator interfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod engine;
pub mod proxy;
pub mod recorder;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::decide;
pub use engine::visible;
pub use proxy::BackendProxy;
pub use proxy::FallbackPolicy;
pub use proxy::ImageForward;
pub use proxy::ProxyOutcome;
pub use proxy::TextForward;
pub use recorder::AuditDraft;
pub use recorder::AuditOutcome;
pub use recorder::AuditRecorder;
pub use store::InMemoryAuditSink;
pub use store::InMemoryDirectoryStore;
pub use store::SharedDirectoryStore;
pub use store::fixture_identities;
pub use store::fixture_models;
