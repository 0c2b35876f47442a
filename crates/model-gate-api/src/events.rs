// model-gate-api/src/events.rs
// ============================================================================
// Module: Gateway Log Events
// Description: Structured JSON-line events for gateway request handling.
// Purpose: Emit operational logs without hard sink dependencies.
// Dependencies: model-gate-config, serde
// ============================================================================

//! ## Overview
//! This module defines the gateway's operational log events and sinks. Events
//! are JSON lines and deliberately separate from the audit trail: losing a
//! log line is acceptable, losing an audit record is not. Deployments route
//! the stream to their preferred pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use model_gate_config::LogLevel;
use serde::Serialize;

// ============================================================================
// SECTION: Event Payloads
// ============================================================================

/// Request-completion log event.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_id: String,
    /// Identity id the caller presented.
    pub identity_id: Option<String>,
    /// Gateway operation label.
    pub operation: &'static str,
    /// Target model when applicable.
    pub model_id: Option<String>,
    /// Final status label.
    pub status: &'static str,
    /// Reason code for non-success outcomes.
    pub reason_code: Option<String>,
    /// Request duration in milliseconds.
    pub duration_ms: u64,
}

/// Security posture log event.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
}

/// Audit persistence failure log event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditFailureEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier whose record could not be persisted.
    pub request_id: String,
    /// Failure description.
    pub failure: String,
}

/// Returns the current unix epoch in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Sink for gateway log events.
pub trait EventSink: Send + Sync {
    /// Writes one serialized JSON line.
    fn write_line(&self, line: &str);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn write_line(&self, line: &str) {
        let _ = writeln!(std::io::stderr(), "{line}");
    }
}

/// No-op sink for tests.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn write_line(&self, _line: &str) {}
}

// ============================================================================
// SECTION: Event Logger
// ============================================================================

/// Level-gated logger for gateway events.
#[derive(Clone)]
pub struct GatewayEvents {
    /// Minimum level emitted.
    level: LogLevel,
    /// Destination sink.
    sink: Arc<dyn EventSink>,
}

impl GatewayEvents {
    /// Creates a logger with the given level and sink.
    #[must_use]
    pub fn new(level: LogLevel, sink: Arc<dyn EventSink>) -> Self {
        Self {
            level,
            sink,
        }
    }

    /// Creates a stderr logger with the given level.
    #[must_use]
    pub fn stderr(level: LogLevel) -> Self {
        Self::new(level, Arc::new(StderrEventSink))
    }

    /// Emits a request-completion event at info level.
    pub fn request(&self, params: RequestEventParams) {
        if self.level < LogLevel::Info {
            return;
        }
        self.emit(&RequestEvent {
            event: "gateway_request",
            timestamp_ms: now_ms(),
            request_id: params.request_id,
            identity_id: params.identity_id,
            operation: params.operation,
            model_id: params.model_id,
            status: params.status,
            reason_code: params.reason_code,
            duration_ms: params.duration_ms,
        });
    }

    /// Emits a security posture event at warn level.
    pub fn security(&self, kind: &'static str, message: impl Into<String>) {
        if self.level < LogLevel::Warn {
            return;
        }
        self.emit(&SecurityEvent {
            event: "gateway_security",
            timestamp_ms: now_ms(),
            kind,
            message: message.into(),
        });
    }

    /// Emits an audit persistence failure at error level.
    pub fn audit_failure(&self, request_id: impl Into<String>, failure: impl Into<String>) {
        self.emit(&AuditFailureEvent {
            event: "gateway_audit_failure",
            timestamp_ms: now_ms(),
            request_id: request_id.into(),
            failure: failure.into(),
        });
    }

    /// Serializes and writes one event.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(line) = serde_json::to_string(event) {
            self.sink.write_line(&line);
        }
    }
}

/// Inputs required to construct a request event.
pub struct RequestEventParams {
    /// Request identifier.
    pub request_id: String,
    /// Identity id the caller presented.
    pub identity_id: Option<String>,
    /// Gateway operation label.
    pub operation: &'static str,
    /// Target model when applicable.
    pub model_id: Option<String>,
    /// Final status label.
    pub status: &'static str,
    /// Reason code for non-success outcomes.
    pub reason_code: Option<String>,
    /// Request duration in milliseconds.
    pub duration_ms: u64,
}
