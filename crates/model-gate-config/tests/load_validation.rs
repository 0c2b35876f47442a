// crates/model-gate-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Tests
// Description: Validates TOML loading, env resolution, and token table rules.
// Purpose: Pin the fail-closed posture of gateway configuration.
// ============================================================================

//! ## Overview
//! Exercises full-document parsing from disk, the missing-file error for an
//! explicit path, and the bearer token table limits.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::io::Write;
use std::path::Path;

use model_gate_config::ConfigError;
use model_gate_config::Environment;
use model_gate_config::GatewayConfig;
use model_gate_config::LogLevel;
use model_gate_config::StoreKind;

/// Writes a config document to a temp file and loads it.
fn load_document(document: &str) -> Result<GatewayConfig, ConfigError> {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(document.as_bytes()).expect("write config");
    GatewayConfig::load(Some(file.path()))
}

#[test]
fn full_document_parses_and_validates() {
    let config = load_document(
        r#"
[server]
bind = "127.0.0.1:8080"
environment = "production"
max_body_bytes = 65536

[server.auth]
tokens = [
    { token = "secret-admin", identity_id = "identity-admin" },
    { token = "secret-basic", identity_id = "identity-basic" },
]

[directory]
store = "sqlite"
path = "/var/lib/model-gate/directory.db"

[audit]
store = "sqlite"
path = "/var/lib/model-gate/audit.db"

[backend]
base_url = "https://models.internal"
timeout_ms = 2500
allow_http = false
fallback_on_backend_error = false

[logging]
level = "warn"
"#,
    )
    .expect("config loads");
    assert_eq!(config.server.environment, Environment::Production);
    assert_eq!(config.directory.store, StoreKind::Sqlite);
    assert_eq!(config.audit.store, StoreKind::Sqlite);
    assert!(!config.backend.fallback_on_backend_error);
    assert_eq!(config.logging.level, LogLevel::Warn);
    let auth = config.server.auth.expect("auth table present");
    assert_eq!(auth.tokens.len(), 2);
}

#[test]
fn explicit_missing_path_is_an_io_error() {
    let result = GatewayConfig::load(Some(Path::new("/nonexistent/model-gate.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn duplicate_tokens_are_rejected() {
    let result = load_document(
        r#"
[server.auth]
tokens = [
    { token = "same", identity_id = "identity-a" },
    { token = "same", identity_id = "identity-b" },
]
"#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn empty_token_is_rejected() {
    let result = load_document(
        r#"
[server.auth]
tokens = [{ token = "", identity_id = "identity-a" }]
"#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn unknown_log_level_fails_parse() {
    let result = load_document(
        r#"
[logging]
level = "trace"
"#,
    );
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
