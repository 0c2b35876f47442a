// model-gate-api/src/auth.rs
// ============================================================================
// Module: Gateway Caller Resolution
// Description: Bearer-token resolution of the caller identity.
// Purpose: Map transport credentials to an identity id, fail closed.
// Dependencies: model-gate-core, model-gate-config
// ============================================================================

//! ## Overview
//! The gateway resolves callers from a static bearer token table configured
//! at startup. Resolution yields only an [`IdentityId`]; existence, status,
//! and authorization are evaluated by the decision engine against the
//! directory store. In the development environment an explicit identity
//! header may be honored when `dev_permissive` is enabled; production
//! configurations reject that override at validation time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use model_gate_config::ServerAuthConfig;
use model_gate_core::IdentityId;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header length.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;
/// Header carrying the explicit identity override in dev-permissive mode.
pub const DEV_IDENTITY_HEADER: &str = "x-identity-id";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request credentials extracted from transport headers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authorization header value, when present.
    pub auth_header: Option<String>,
    /// Explicit identity header value, when present.
    pub identity_header: Option<String>,
    /// Request identifier assigned at the transport edge.
    pub request_id: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Caller resolution errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credentials were presented.
    #[error("authentication required")]
    MissingCredentials,
    /// Presented credentials did not resolve to an identity.
    #[error("invalid bearer token")]
    UnknownToken,
}

// ============================================================================
// SECTION: Identity Resolver
// ============================================================================

/// Resolves transport credentials to an identity id.
pub struct IdentityResolver {
    /// Static token table mapping bearer tokens to identities.
    tokens: BTreeMap<String, IdentityId>,
    /// Honor the explicit identity header without a token.
    dev_permissive: bool,
}

impl IdentityResolver {
    /// Builds a resolver from server auth configuration.
    #[must_use]
    pub fn from_config(auth: Option<&ServerAuthConfig>, dev_permissive: bool) -> Self {
        let tokens = auth
            .map(|config| {
                config
                    .tokens
                    .iter()
                    .map(|entry| (entry.token.clone(), entry.identity_id.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            tokens,
            dev_permissive,
        }
    }

    /// Returns true when no bearer tokens are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Resolves the caller identity for one request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no credentials are presented or the token
    /// is unknown. The resolved identity may still be absent from the
    /// directory; that outcome belongs to the decision engine.
    pub fn resolve(&self, ctx: &RequestContext) -> Result<IdentityId, AuthError> {
        if let Some(header) = ctx.auth_header.as_deref() {
            let token = parse_bearer_token(header)?;
            return self.tokens.get(&token).cloned().ok_or(AuthError::UnknownToken);
        }
        if self.dev_permissive
            && let Some(identity) = ctx.identity_header.as_deref()
            && !identity.is_empty()
        {
            return Ok(IdentityId::new(identity));
        }
        Err(AuthError::MissingCredentials)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a bearer token from an authorization header value.
fn parse_bearer_token(header: &str) -> Result<String, AuthError> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::UnknownToken);
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
