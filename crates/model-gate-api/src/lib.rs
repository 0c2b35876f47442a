// model-gate-api/src/lib.rs
// ============================================================================
// Module: Model Gate API Library
// Description: HTTP gateway surface for Model Gate.
// Purpose: Expose the gateway service, server wiring, and envelope types.
// Dependencies: crate::{auth, envelope, events, handlers, server}
// ============================================================================

//! ## Overview
//! The API crate wires the Model Gate core into an axum HTTP surface: caller
//! resolution from bearer tokens, per-operation request handlers that run the
//! decision engine and the backend proxy, the shared response envelope, and
//! the append-before-respond audit discipline.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod envelope;
pub mod events;
pub mod handlers;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthError;
pub use auth::IdentityResolver;
pub use auth::RequestContext;
pub use envelope::Envelope;
pub use envelope::ErrorBody;
pub use envelope::Reply;
pub use events::GatewayEvents;
pub use handlers::AuditReader;
pub use handlers::CompletionBody;
pub use handlers::GatewayService;
pub use handlers::GatewayServiceParts;
pub use handlers::ImageBody;
pub use handlers::ListModelsQuery;
pub use handlers::LogsQuery;
pub use server::GatewayServer;
pub use server::GatewayServerError;
