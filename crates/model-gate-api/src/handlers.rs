// model-gate-api/src/handlers.rs
// ============================================================================
// Module: Gateway Request Handlers
// Description: Per-operation orchestration of decision, proxy, and audit.
// Purpose: Guarantee one decision and one audit record per request.
// Dependencies: model-gate-core, model-gate-store-sqlite, serde_json
// ============================================================================

//! ## Overview
//! The gateway service orchestrates each operation the same way: resolve the
//! caller, look up identity and model snapshots, run the decision engine,
//! forward allowed requests through the backend proxy, and seal exactly one
//! audit record before the reply is returned. Collaborator failures map to
//! internal errors; only the explicit fallback policy converts a backend
//! failure into an apparent success.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::http::StatusCode;
use model_gate_config::Environment;
use model_gate_core::AccessTier;
use model_gate_core::AuditDraft;
use model_gate_core::AuditOutcome;
use model_gate_core::AuditRecord;
use model_gate_core::AuditRecordId;
use model_gate_core::AuditRecorder;
use model_gate_core::AuditStatus;
use model_gate_core::BackendProxy;
use model_gate_core::Decision;
use model_gate_core::DenyReason;
use model_gate_core::DirectoryStore;
use model_gate_core::GatewayOperation;
use model_gate_core::Identity;
use model_gate_core::IdentityId;
use model_gate_core::ImageForward;
use model_gate_core::InMemoryAuditSink;
use model_gate_core::ModelBackend;
use model_gate_core::ModelId;
use model_gate_core::ModelRecord;
use model_gate_core::OperationKind;
use model_gate_core::ProxyOutcome;
use model_gate_core::SharedDirectoryStore;
use model_gate_core::TextForward;
use model_gate_core::Timestamp;
use model_gate_core::decide;
use model_gate_core::visible;
use model_gate_store_sqlite::AuditPage;
use model_gate_store_sqlite::AuditQuery;
use model_gate_store_sqlite::SqliteAuditStore;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::auth::IdentityResolver;
use crate::auth::RequestContext;
use crate::envelope::Envelope;
use crate::envelope::INTERNAL_ERROR_CODE;
use crate::envelope::Reply;
use crate::envelope::auth_required_reply;
use crate::envelope::deny_reply;
use crate::envelope::internal_error_reply;
use crate::events::GatewayEvents;
use crate::events::RequestEventParams;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Warning attached to fallback responses.
const FALLBACK_WARNING: &str =
    "the model backend was unreachable; a fallback response was substituted";
/// Default page size for audit log queries.
const DEFAULT_LOGS_LIMIT: u64 = 10;

// ============================================================================
// SECTION: Request Bodies
// ============================================================================

/// Text completion request body.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct CompletionBody {
    /// Prompt text.
    pub prompt: String,
    /// Requested token budget.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Image generation request body.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ImageBody {
    /// Prompt text.
    pub prompt: String,
    /// Requested image count.
    #[serde(default)]
    pub n: Option<u32>,
    /// Requested image size label.
    #[serde(default)]
    pub size: Option<String>,
}

/// Query parameters for the model listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListModelsQuery {
    /// Restrict the listing to one operation label.
    #[serde(rename = "type")]
    pub operation: Option<String>,
}

/// Query parameters for the audit log listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    /// Restrict to one identity id.
    pub identity_id: Option<String>,
    /// Restrict to one model id.
    pub model_id: Option<String>,
    /// Restrict to one status label.
    pub status: Option<String>,
    /// Restrict to one operation label.
    pub operation: Option<String>,
    /// Inclusive lower bound on request time (unix millis).
    pub from: Option<i64>,
    /// Inclusive upper bound on request time (unix millis).
    pub to: Option<i64>,
    /// Page number, starting at one.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

// ============================================================================
// SECTION: Audit Reader
// ============================================================================

/// Query surface over the configured audit sink.
#[derive(Clone)]
pub enum AuditReader {
    /// In-memory sink snapshot (memory deployments and tests).
    Memory(InMemoryAuditSink),
    /// Durable SQLite audit store.
    Sqlite(SqliteAuditStore),
}

impl AuditReader {
    /// Runs an audit query against the configured sink.
    ///
    /// # Errors
    ///
    /// Returns a failure description when the underlying store fails.
    pub fn query(&self, query: &AuditQuery) -> Result<AuditPage, String> {
        match self {
            Self::Sqlite(store) => store.query(query).map_err(|err| err.to_string()),
            Self::Memory(sink) => {
                let mut records: Vec<AuditRecord> = sink
                    .snapshot()
                    .into_iter()
                    .filter(|record| matches_query(record, query))
                    .collect();
                records.sort_by(|a, b| {
                    b.requested_at
                        .cmp(&a.requested_at)
                        .then_with(|| b.id.as_str().cmp(a.id.as_str()))
                });
                let total = u64::try_from(records.len()).unwrap_or(u64::MAX);
                let limit = query.limit.max(1);
                let items = records
                    .into_iter()
                    .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
                    .take(usize::try_from(limit).unwrap_or(usize::MAX))
                    .collect();
                Ok(AuditPage {
                    items,
                    total,
                })
            }
        }
    }
}

/// Returns true when a record matches every filter in the query.
fn matches_query(record: &AuditRecord, query: &AuditQuery) -> bool {
    if let Some(identity_id) = &query.identity_id
        && record.identity_id != *identity_id
    {
        return false;
    }
    if let Some(model_id) = &query.model_id
        && record.model_id.as_ref() != Some(model_id)
    {
        return false;
    }
    if let Some(status) = query.status
        && record.status != status
    {
        return false;
    }
    if let Some(operation) = query.operation
        && record.operation != operation
    {
        return false;
    }
    if let Some(from_millis) = query.from_millis
        && record.requested_at.as_unix_millis() < from_millis
    {
        return false;
    }
    if let Some(to_millis) = query.to_millis
        && record.requested_at.as_unix_millis() > to_millis
    {
        return false;
    }
    true
}

// ============================================================================
// SECTION: Gateway Service
// ============================================================================

/// Pieces required to assemble a gateway service.
pub struct GatewayServiceParts {
    /// Directory store collaborator.
    pub directory: SharedDirectoryStore,
    /// Audit recorder writing through the configured sink.
    pub recorder: AuditRecorder,
    /// Query surface over the audit sink.
    pub audit_reader: AuditReader,
    /// Backend proxy with its fallback policy.
    pub proxy: BackendProxy<Arc<dyn ModelBackend>>,
    /// Caller resolver.
    pub resolver: IdentityResolver,
    /// Operational event logger.
    pub events: GatewayEvents,
    /// Deployment environment.
    pub environment: Environment,
}

/// Request orchestration shared by every gateway endpoint.
pub struct GatewayService {
    /// Directory store collaborator.
    directory: SharedDirectoryStore,
    /// Audit recorder writing through the configured sink.
    recorder: AuditRecorder,
    /// Query surface over the audit sink.
    audit_reader: AuditReader,
    /// Backend proxy with its fallback policy.
    proxy: BackendProxy<Arc<dyn ModelBackend>>,
    /// Caller resolver.
    resolver: IdentityResolver,
    /// Operational event logger.
    events: GatewayEvents,
    /// Deployment environment.
    environment: Environment,
}

impl GatewayService {
    /// Assembles the service from its parts.
    #[must_use]
    pub fn new(parts: GatewayServiceParts) -> Self {
        Self {
            directory: parts.directory,
            recorder: parts.recorder,
            audit_reader: parts.audit_reader,
            proxy: parts.proxy,
            resolver: parts.resolver,
            events: parts.events,
            environment: parts.environment,
        }
    }

    /// Returns the deployment environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Lists the models visible to the caller.
    pub fn list_models(&self, ctx: &RequestContext, query: &ListModelsQuery) -> Reply {
        let requested_at = now();
        let Some(identity_id) = self.resolve_caller(ctx) else {
            return auth_required_reply("authentication required");
        };
        let draft = AuditDraft::begin(
            new_audit_id(),
            identity_id.clone(),
            GatewayOperation::ListModels,
            requested_at,
        );
        let identity = match self.directory.find_identity(&identity_id) {
            Ok(identity) => identity,
            Err(err) => return self.internal(ctx, draft, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
        };
        let Some(identity) = identity else {
            return self.denied(ctx, draft, DenyReason::IdentityNotFound);
        };
        let draft = draft.with_handle(identity.handle.clone());
        if identity.status.is_disabled() {
            return self.denied(ctx, draft, DenyReason::IdentityDisabled);
        }
        let kind = match query.operation.as_deref() {
            None => None,
            Some(label) => match OperationKind::parse(label) {
                Some(kind) => Some(kind),
                // Unknown labels match nothing rather than erroring.
                None => {
                    let outcome = AuditOutcome::success(None, Some(json!({ "count": 0 })));
                    self.seal(ctx, draft, outcome);
                    return (
                        StatusCode::OK,
                        Envelope::success(json!({ "count": 0, "models": [] })),
                    );
                }
            },
        };
        let models = match self.directory.list_active_models(kind) {
            Ok(models) => models,
            Err(err) => return self.internal(ctx, draft, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
        };
        let listing: Vec<Value> = models
            .iter()
            .filter(|model| visible(&identity, model))
            .map(model_listing_entry)
            .collect();
        let outcome = AuditOutcome::success(None, Some(json!({ "count": listing.len() })));
        self.seal(ctx, draft, outcome);
        (
            StatusCode::OK,
            Envelope::success(json!({ "count": listing.len(), "models": listing })),
        )
    }

    /// Serves a text completion request.
    pub fn text_completion(
        &self,
        ctx: &RequestContext,
        model_id: &ModelId,
        body: &CompletionBody,
    ) -> Reply {
        let requested_at = now();
        let Some(identity_id) = self.resolve_caller(ctx) else {
            return auth_required_reply("authentication required");
        };
        let draft = AuditDraft::begin(
            new_audit_id(),
            identity_id.clone(),
            GatewayOperation::TextCompletion,
            requested_at,
        )
        .with_model(model_id.clone())
        .with_request_params(serde_json::to_value(body).unwrap_or(Value::Null));

        let (draft, identity, model) = match self.load_snapshots(ctx, draft, &identity_id, model_id)
        {
            Ok(loaded) => loaded,
            Err(reply) => return reply,
        };
        let decision =
            decide(identity.as_ref(), model.as_ref(), OperationKind::Text, body.max_tokens);
        if let Decision::Deny {
            reason,
        } = decision
        {
            return self.denied(ctx, draft, reason);
        }
        let (Some(identity), Some(model), Some(limits)) = (identity, model, decision.limits())
        else {
            return self.internal(
                ctx,
                draft,
                StatusCode::INTERNAL_SERVER_ERROR,
                "decision state inconsistent with directory snapshots",
            );
        };
        let forward = TextForward {
            prompt: body.prompt.clone(),
            temperature: body.temperature,
        };
        let result = self.proxy.forward_text(&model, &forward, limits, &identity.id, requested_at);
        self.reply_from_proxy(ctx, draft, result)
    }

    /// Serves an image generation request.
    pub fn image_generation(
        &self,
        ctx: &RequestContext,
        model_id: &ModelId,
        body: &ImageBody,
    ) -> Reply {
        let requested_at = now();
        let Some(identity_id) = self.resolve_caller(ctx) else {
            return auth_required_reply("authentication required");
        };
        let draft = AuditDraft::begin(
            new_audit_id(),
            identity_id.clone(),
            GatewayOperation::ImageGeneration,
            requested_at,
        )
        .with_model(model_id.clone())
        .with_request_params(serde_json::to_value(body).unwrap_or(Value::Null));

        let (draft, identity, model) = match self.load_snapshots(ctx, draft, &identity_id, model_id)
        {
            Ok(loaded) => loaded,
            Err(reply) => return reply,
        };
        let decision = decide(identity.as_ref(), model.as_ref(), OperationKind::Image, None);
        if let Decision::Deny {
            reason,
        } = decision
        {
            return self.denied(ctx, draft, reason);
        }
        let (Some(identity), Some(model)) = (identity, model) else {
            return self.internal(
                ctx,
                draft,
                StatusCode::INTERNAL_SERVER_ERROR,
                "decision state inconsistent with directory snapshots",
            );
        };
        let forward = ImageForward {
            prompt: body.prompt.clone(),
            n: body.n,
            size: body.size.clone(),
        };
        let result = self.proxy.forward_image(&model, &forward, &identity.id, requested_at);
        self.reply_from_proxy(ctx, draft, result)
    }

    /// Lists audit records for administrators.
    pub fn query_logs(&self, ctx: &RequestContext, query: &LogsQuery) -> Reply {
        let Some(identity_id) = self.resolve_caller(ctx) else {
            return auth_required_reply("authentication required");
        };
        let identity = match self.directory.find_identity(&identity_id) {
            Ok(identity) => identity,
            Err(err) => {
                return internal_error_reply(
                    self.environment,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &err.to_string(),
                );
            }
        };
        let Some(identity) = identity else {
            return deny_reply(DenyReason::IdentityNotFound);
        };
        if identity.status.is_disabled() {
            return deny_reply(DenyReason::IdentityDisabled);
        }
        if identity.tier != AccessTier::Admin {
            return deny_reply(DenyReason::AccessDenied);
        }
        let audit_query = match build_audit_query(query) {
            Ok(audit_query) => audit_query,
            Err(message) => {
                return (StatusCode::BAD_REQUEST, Envelope::failure("INVALID_REQUEST", message));
            }
        };
        match self.audit_reader.query(&audit_query) {
            Ok(page) => {
                let limit = audit_query.limit.max(1);
                let pages = page.total.div_ceil(limit);
                let current = audit_query.offset / limit + 1;
                (
                    StatusCode::OK,
                    Envelope::success(json!({
                        "count": page.items.len(),
                        "total": page.total,
                        "page": current,
                        "pages": pages,
                        "logs": page.items,
                    })),
                )
            }
            Err(failure) => internal_error_reply(
                self.environment,
                StatusCode::INTERNAL_SERVER_ERROR,
                &failure,
            ),
        }
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    /// Resolves the caller, logging refusals.
    fn resolve_caller(&self, ctx: &RequestContext) -> Option<IdentityId> {
        match self.resolver.resolve(ctx) {
            Ok(identity_id) => Some(identity_id),
            Err(err) => {
                self.events.security("auth_refused", err.to_string());
                None
            }
        }
    }

    /// Loads identity and model snapshots, converting store failures.
    #[allow(clippy::type_complexity, reason = "Snapshot tuple is local to the handlers.")]
    fn load_snapshots(
        &self,
        ctx: &RequestContext,
        draft: AuditDraft,
        identity_id: &IdentityId,
        model_id: &ModelId,
    ) -> Result<(AuditDraft, Option<Identity>, Option<ModelRecord>), Reply> {
        let identity = match self.directory.find_identity(identity_id) {
            Ok(identity) => identity,
            Err(err) => {
                return Err(self.internal(
                    ctx,
                    draft,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &err.to_string(),
                ));
            }
        };
        let draft = match &identity {
            Some(identity) => draft.with_handle(identity.handle.clone()),
            None => draft,
        };
        let model = match self.directory.find_model(model_id) {
            Ok(model) => model,
            Err(err) => {
                return Err(self.internal(
                    ctx,
                    draft,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &err.to_string(),
                ));
            }
        };
        Ok((draft, identity, model))
    }

    /// Builds the reply for a proxy result, sealing the audit record.
    fn reply_from_proxy(
        &self,
        ctx: &RequestContext,
        draft: AuditDraft,
        result: Result<ProxyOutcome, model_gate_core::BackendError>,
    ) -> Reply {
        match result {
            Ok(ProxyOutcome::Success {
                response,
            }) => {
                let outcome = AuditOutcome::success(
                    response.usage,
                    Some(json!({ "fallback": false, "usage": response.usage })),
                );
                self.seal(ctx, draft, outcome);
                (StatusCode::OK, Envelope::success(response.payload))
            }
            Ok(ProxyOutcome::Fallback {
                response,
                failure,
            }) => {
                let outcome = AuditOutcome::error(INTERNAL_ERROR_CODE, response.usage)
                    .with_response_summary(json!({ "fallback": true, "failure": failure }));
                self.seal(ctx, draft, outcome);
                (
                    StatusCode::OK,
                    Envelope::success_with_warning(response.payload, FALLBACK_WARNING),
                )
            }
            Err(err) => {
                let detail = err.to_string();
                let outcome = AuditOutcome::error(INTERNAL_ERROR_CODE, None)
                    .with_response_summary(json!({ "fallback": false, "failure": detail }));
                self.seal(ctx, draft, outcome);
                internal_error_reply(self.environment, StatusCode::BAD_GATEWAY, &detail)
            }
        }
    }

    /// Seals a denial and builds its reply.
    fn denied(&self, ctx: &RequestContext, draft: AuditDraft, reason: DenyReason) -> Reply {
        self.seal(ctx, draft, AuditOutcome::denied(reason.code()));
        deny_reply(reason)
    }

    /// Seals an internal failure and builds its reply.
    fn internal(
        &self,
        ctx: &RequestContext,
        draft: AuditDraft,
        status: StatusCode,
        detail: &str,
    ) -> Reply {
        let outcome = AuditOutcome::error(INTERNAL_ERROR_CODE, None)
            .with_response_summary(json!({ "failure": detail }));
        self.seal(ctx, draft, outcome);
        internal_error_reply(self.environment, status, detail)
    }

    /// Finishes the draft, attempts the audit write, and emits the request
    /// event. Called exactly once on every handler path.
    fn seal(&self, ctx: &RequestContext, draft: AuditDraft, outcome: AuditOutcome) -> AuditRecord {
        let record = draft.finish(now(), outcome);
        if let Err(err) = self.recorder.append(&record) {
            self.events.audit_failure(ctx.request_id.clone(), err.to_string());
        }
        self.events.request(RequestEventParams {
            request_id: ctx.request_id.clone(),
            identity_id: Some(record.identity_id.to_string()),
            operation: record.operation.as_str(),
            model_id: record.model_id.as_ref().map(ToString::to_string),
            status: record.status.as_str(),
            reason_code: record.reason_code.clone(),
            duration_ms: record.duration_ms,
        });
        record
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current wall-clock timestamp.
fn now() -> Timestamp {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// Generates a fresh audit record identifier.
fn new_audit_id() -> AuditRecordId {
    let value: u128 = rand::random();
    AuditRecordId::new(format!("audit-{value:032x}"))
}

/// Builds the catalog listing entry for one model.
fn model_listing_entry(model: &ModelRecord) -> Value {
    json!({
        "id": model.id,
        "name": model.name,
        "description": model.description,
        "type": model.operation.as_str(),
        "parameters": model.backend_params,
    })
}

/// Translates the transport query into an audit store query.
fn build_audit_query(query: &LogsQuery) -> Result<AuditQuery, String> {
    let status = match query.status.as_deref() {
        None => None,
        Some(label) => Some(
            AuditStatus::parse(label).ok_or_else(|| format!("unknown status label: {label}"))?,
        ),
    };
    let operation = match query.operation.as_deref() {
        None => None,
        Some(label) => Some(
            GatewayOperation::parse(label)
                .ok_or_else(|| format!("unknown operation label: {label}"))?,
        ),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LOGS_LIMIT).max(1);
    let page = query.page.unwrap_or(1).max(1);
    Ok(AuditQuery {
        identity_id: query.identity_id.as_deref().map(IdentityId::new),
        model_id: query.model_id.as_deref().map(ModelId::new),
        status,
        operation,
        from_millis: query.from,
        to_millis: query.to,
        offset: (page - 1).saturating_mul(limit),
        limit,
    })
}
