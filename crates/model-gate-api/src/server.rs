// model-gate-api/src/server.rs
// ============================================================================
// Module: Gateway HTTP Server
// Description: axum wiring for the Model Gate HTTP surface.
// Purpose: Route requests into the gateway service and serve them.
// Dependencies: axum, tokio, model-gate-config, model-gate-core
// ============================================================================

//! ## Overview
//! The HTTP server assembles the gateway service from configuration (store
//! backends, backend client, fallback policy, caller resolver) and exposes
//! the REST surface. Handlers bridge into the synchronous decision path with
//! `block_in_place`; every reply is the shared response envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use model_gate_backend::HttpBackendConfig;
use model_gate_backend::HttpModelBackend;
use model_gate_config::GatewayConfig;
use model_gate_config::StoreKind;
use model_gate_core::AuditRecorder;
use model_gate_core::BackendProxy;
use model_gate_core::FallbackPolicy;
use model_gate_core::InMemoryAuditSink;
use model_gate_core::InMemoryDirectoryStore;
use model_gate_core::ModelBackend;
use model_gate_core::ModelId;
use model_gate_core::SharedDirectoryStore;
use model_gate_store_sqlite::SqliteAuditStore;
use model_gate_store_sqlite::SqliteDirectoryStore;
use model_gate_store_sqlite::SqliteStoreConfig;
use serde_json::json;
use thiserror::Error;

use crate::auth::DEV_IDENTITY_HEADER;
use crate::auth::IdentityResolver;
use crate::auth::RequestContext;
use crate::envelope::Envelope;
use crate::events::GatewayEvents;
use crate::handlers::AuditReader;
use crate::handlers::CompletionBody;
use crate::handlers::GatewayService;
use crate::handlers::GatewayServiceParts;
use crate::handlers::ImageBody;
use crate::handlers::ListModelsQuery;
use crate::handlers::LogsQuery;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway server errors.
#[derive(Debug, Error)]
pub enum GatewayServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Gateway Server
// ============================================================================

/// Gateway server instance.
pub struct GatewayServer {
    /// Validated configuration.
    config: GatewayConfig,
    /// Assembled gateway service.
    service: Arc<GatewayService>,
}

impl GatewayServer {
    /// Builds a gateway server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when validation or initialization fails.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayServerError> {
        config.validate().map_err(|err| GatewayServerError::Config(err.to_string()))?;
        let events = GatewayEvents::stderr(config.logging.level);
        let directory = build_directory_store(&config)?;
        let (recorder, audit_reader) = build_audit_stores(&config)?;
        let backend: Arc<dyn ModelBackend> = Arc::new(
            HttpModelBackend::new(HttpBackendConfig {
                base_url: config.backend.base_url.clone(),
                timeout_ms: config.backend.timeout_ms,
                allow_http: config.backend.allow_http,
                max_response_bytes: config.backend.max_response_bytes,
                user_agent: config.backend.user_agent.clone(),
            })
            .map_err(|err| GatewayServerError::Init(err.to_string()))?,
        );
        let proxy = BackendProxy::new(
            backend,
            FallbackPolicy {
                fallback_on_backend_error: config.backend.fallback_on_backend_error,
            },
        );
        let resolver =
            IdentityResolver::from_config(config.server.auth.as_ref(), config.server.dev_permissive);
        emit_posture_warnings(&events, &config, &resolver);
        let service = Arc::new(GatewayService::new(GatewayServiceParts {
            directory,
            recorder,
            audit_reader,
            proxy,
            resolver,
            events,
            environment: config.server.environment,
        }));
        Ok(Self {
            config,
            service,
        })
    }

    /// Returns the router serving the gateway surface.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.service), self.config.server.max_body_bytes)
    }

    /// Serves requests on the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), GatewayServerError> {
        let addr: SocketAddr = self
            .config
            .server
            .bind
            .parse()
            .map_err(|_| GatewayServerError::Config("invalid bind address".to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| GatewayServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|_| GatewayServerError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Assembly Helpers
// ============================================================================

/// Builds the directory store from configuration.
fn build_directory_store(
    config: &GatewayConfig,
) -> Result<SharedDirectoryStore, GatewayServerError> {
    let store = match config.directory.store {
        StoreKind::Memory => {
            SharedDirectoryStore::from_store(InMemoryDirectoryStore::with_fixture())
        }
        StoreKind::Sqlite => {
            let path = config.directory.path.clone().ok_or_else(|| {
                GatewayServerError::Config("sqlite directory store requires path".to_string())
            })?;
            let store = SqliteDirectoryStore::new(&SqliteStoreConfig::new(path))
                .map_err(|err| GatewayServerError::Init(err.to_string()))?;
            SharedDirectoryStore::from_store(store)
        }
    };
    Ok(store)
}

/// Builds the audit recorder and query surface from configuration.
fn build_audit_stores(
    config: &GatewayConfig,
) -> Result<(AuditRecorder, AuditReader), GatewayServerError> {
    match config.audit.store {
        StoreKind::Memory => {
            let sink = InMemoryAuditSink::new();
            Ok((AuditRecorder::new(Arc::new(sink.clone())), AuditReader::Memory(sink)))
        }
        StoreKind::Sqlite => {
            let path = config.audit.path.clone().ok_or_else(|| {
                GatewayServerError::Config("sqlite audit store requires path".to_string())
            })?;
            let store = SqliteAuditStore::new(&SqliteStoreConfig::new(path))
                .map_err(|err| GatewayServerError::Init(err.to_string()))?;
            Ok((AuditRecorder::new(Arc::new(store.clone())), AuditReader::Sqlite(store)))
        }
    }
}

/// Emits startup security posture warnings.
fn emit_posture_warnings(
    events: &GatewayEvents,
    config: &GatewayConfig,
    resolver: &IdentityResolver,
) {
    if config.server.dev_permissive {
        events.security(
            "dev_permissive",
            "identity header override enabled; do not use outside development",
        );
    }
    if resolver.is_empty() && !config.server.dev_permissive {
        events.security(
            "no_auth_tokens",
            "no bearer tokens configured; every request will be rejected",
        );
    }
}

/// Builds the axum router over the gateway service.
fn build_router(service: Arc<GatewayService>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(handle_health))
        .route("/api/models", get(handle_list_models))
        .route("/api/models/{model_id}/completions", post(handle_text_completion))
        .route("/api/models/{model_id}/generations", post(handle_image_generation))
        .route("/api/admin/logs", get(handle_query_logs))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(service)
}

// ============================================================================
// SECTION: HTTP Handlers
// ============================================================================

/// Liveness probe.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(Envelope::success(json!({ "status": "ok" }))))
}

/// Lists models visible to the caller.
async fn handle_list_models(
    State(service): State<Arc<GatewayService>>,
    headers: HeaderMap,
    Query(query): Query<ListModelsQuery>,
) -> impl IntoResponse {
    let ctx = request_context(&headers);
    let reply = run_blocking(|| service.list_models(&ctx, &query));
    (reply.0, Json(reply.1))
}

/// Serves a text completion request.
async fn handle_text_completion(
    State(service): State<Arc<GatewayService>>,
    Path(model_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CompletionBody>,
) -> impl IntoResponse {
    let ctx = request_context(&headers);
    let model_id = ModelId::new(model_id);
    let reply = run_blocking(|| service.text_completion(&ctx, &model_id, &body));
    (reply.0, Json(reply.1))
}

/// Serves an image generation request.
async fn handle_image_generation(
    State(service): State<Arc<GatewayService>>,
    Path(model_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ImageBody>,
) -> impl IntoResponse {
    let ctx = request_context(&headers);
    let model_id = ModelId::new(model_id);
    let reply = run_blocking(|| service.image_generation(&ctx, &model_id, &body));
    (reply.0, Json(reply.1))
}

/// Lists audit records for administrators.
async fn handle_query_logs(
    State(service): State<Arc<GatewayService>>,
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let ctx = request_context(&headers);
    let reply = run_blocking(|| service.query_logs(&ctx, &query));
    (reply.0, Json(reply.1))
}

// ============================================================================
// SECTION: Request Helpers
// ============================================================================

/// Extracts the request context from transport headers.
fn request_context(headers: &HeaderMap) -> RequestContext {
    let auth_header =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    let identity_header = headers
        .get(DEV_IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    RequestContext {
        auth_header,
        identity_header,
        request_id: new_request_id(),
    }
}

/// Generates a fresh request identifier.
fn new_request_id() -> String {
    let value: u128 = rand::random();
    format!("req-{value:032x}")
}

/// Runs a synchronous gateway call, shifting to a blocking context when the
/// multi-thread runtime is available.
fn run_blocking<T>(call: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(call)
        }
        _ => call(),
    }
}
