// model-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Directory and Audit Stores
// Description: Durable DirectoryStore and AuditSink backed by SQLite WAL.
// Purpose: Persist catalog records and the append-only audit trail.
// Dependencies: model-gate-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`DirectoryStore`] and an append-only
//! [`AuditSink`] using `SQLite`. Catalog rows store canonical JSON payloads
//! keyed by id. Audit rows additionally carry a SHA-256 digest over the
//! canonical snapshot; loads verify the digest and fail closed on mismatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use model_gate_core::AuditRecord;
use model_gate_core::AuditStatus;
use model_gate_core::DEFAULT_HASH_ALGORITHM;
use model_gate_core::GatewayOperation;
use model_gate_core::HashAlgorithm;
use model_gate_core::Identity;
use model_gate_core::IdentityId;
use model_gate_core::ModelId;
use model_gate_core::ModelRecord;
use model_gate_core::OperationKind;
use model_gate_core::hashing::canonical_json_bytes;
use model_gate_core::hashing::hash_bytes;
use model_gate_core::interfaces::AuditError;
use model_gate_core::interfaces::AuditSink;
use model_gate_core::interfaces::DirectoryError;
use model_gate_core::interfaces::DirectoryStore;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized record size accepted by the store.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;
/// Maximum rows returned by one audit query page.
pub const MAX_AUDIT_PAGE_SIZE: usize = 1_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` stores.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl SqliteStoreConfig {
    /// Creates a config for the given database path with defaults.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for DirectoryError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

impl From<SqliteStoreError> for AuditError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message)
            | SqliteStoreError::Corrupt(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Invalid(message) => Self::Sink(message),
        }
    }
}

// ============================================================================
// SECTION: Directory Store
// ============================================================================

/// `SQLite`-backed directory store for identities and models.
#[derive(Clone)]
pub struct SqliteDirectoryStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDirectoryStore {
    /// Opens an `SQLite`-backed directory store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let mut connection = open_connection(config)?;
        initialize_directory_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Inserts or replaces an identity record.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when serialization or the write fails.
    pub fn upsert_identity(&self, identity: &Identity) -> Result<(), SqliteStoreError> {
        if identity.token_ceiling == Some(0) {
            return Err(SqliteStoreError::Invalid(
                "identity token_ceiling must be greater than zero".to_string(),
            ));
        }
        let payload = serialize_record(identity)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO identities (identity_id, record_json) VALUES (?1, ?2) ON \
                 CONFLICT(identity_id) DO UPDATE SET record_json = excluded.record_json",
                params![identity.id.as_str(), payload],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Inserts or replaces a model record.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when serialization or the write fails.
    pub fn upsert_model(&self, model: &ModelRecord) -> Result<(), SqliteStoreError> {
        let payload = serialize_record(model)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO models (model_id, record_json) VALUES (?1, ?2) ON \
                 CONFLICT(model_id) DO UPDATE SET record_json = excluded.record_json",
                params![model.id.as_str(), payload],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Acquires the connection guard.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }
}

impl DirectoryStore for SqliteDirectoryStore {
    fn find_identity(&self, id: &IdentityId) -> Result<Option<Identity>, DirectoryError> {
        let guard = self.lock()?;
        let row: Option<Vec<u8>> = guard
            .query_row(
                "SELECT record_json FROM identities WHERE identity_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        let Some(bytes) = row else {
            return Ok(None);
        };
        let identity: Identity = deserialize_record(&bytes)?;
        if identity.id != *id {
            return Err(SqliteStoreError::Invalid(
                "identity_id mismatch between key and payload".to_string(),
            )
            .into());
        }
        Ok(Some(identity))
    }

    fn find_model(&self, id: &ModelId) -> Result<Option<ModelRecord>, DirectoryError> {
        let guard = self.lock()?;
        let row: Option<Vec<u8>> = guard
            .query_row(
                "SELECT record_json FROM models WHERE model_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        let Some(bytes) = row else {
            return Ok(None);
        };
        let model: ModelRecord = deserialize_record(&bytes)?;
        if model.id != *id {
            return Err(SqliteStoreError::Invalid(
                "model_id mismatch between key and payload".to_string(),
            )
            .into());
        }
        Ok(Some(model))
    }

    fn list_active_models(
        &self,
        operation: Option<OperationKind>,
    ) -> Result<Vec<ModelRecord>, DirectoryError> {
        let rows: Vec<Vec<u8>> = {
            let guard = self.lock()?;
            let mut statement = guard
                .prepare("SELECT record_json FROM models ORDER BY model_id")
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let rows = statement
                .query_map(params![], |row| row.get(0))
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?
                .collect::<Result<Vec<Vec<u8>>, _>>()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            rows
        };
        let mut models = Vec::with_capacity(rows.len());
        for bytes in rows {
            let model: ModelRecord = deserialize_record(&bytes)?;
            if model.active && operation.is_none_or(|kind| model.operation == kind) {
                models.push(model);
            }
        }
        Ok(models)
    }
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// Filter and pagination parameters for audit queries.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Restrict to one identity.
    pub identity_id: Option<IdentityId>,
    /// Restrict to one model.
    pub model_id: Option<ModelId>,
    /// Restrict to one status.
    pub status: Option<AuditStatus>,
    /// Restrict to one operation.
    pub operation: Option<GatewayOperation>,
    /// Inclusive lower bound on `requested_at` (unix millis).
    pub from_millis: Option<i64>,
    /// Inclusive upper bound on `requested_at` (unix millis).
    pub to_millis: Option<i64>,
    /// Rows to skip before the first returned row.
    pub offset: u64,
    /// Maximum rows to return; clamped to [`MAX_AUDIT_PAGE_SIZE`].
    pub limit: u64,
}

/// One page of audit query results, newest first.
#[derive(Debug, Clone)]
pub struct AuditPage {
    /// Matching records for the requested page.
    pub items: Vec<AuditRecord>,
    /// Total matching rows across all pages.
    pub total: u64,
}

/// `SQLite`-backed append-only audit store.
#[derive(Clone)]
pub struct SqliteAuditStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteAuditStore {
    /// Opens an `SQLite`-backed audit store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let mut connection = open_connection(config)?;
        initialize_audit_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Queries the audit trail with filters and pagination, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or a row fails hash
    /// verification.
    pub fn query(&self, query: &AuditQuery) -> Result<AuditPage, SqliteStoreError> {
        let limit = query.limit.clamp(1, MAX_AUDIT_PAGE_SIZE as u64);
        let mut clauses: Vec<&'static str> = Vec::new();
        let mut bindings: Vec<SqlValue> = Vec::new();
        if let Some(identity_id) = &query.identity_id {
            clauses.push("identity_id = ?");
            bindings.push(SqlValue::Text(identity_id.as_str().to_string()));
        }
        if let Some(model_id) = &query.model_id {
            clauses.push("model_id = ?");
            bindings.push(SqlValue::Text(model_id.as_str().to_string()));
        }
        if let Some(status) = query.status {
            clauses.push("status = ?");
            bindings.push(SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(operation) = query.operation {
            clauses.push("operation = ?");
            bindings.push(SqlValue::Text(operation.as_str().to_string()));
        }
        if let Some(from_millis) = query.from_millis {
            clauses.push("requested_at >= ?");
            bindings.push(SqlValue::Integer(from_millis));
        }
        if let Some(to_millis) = query.to_millis {
            clauses.push("requested_at <= ?");
            bindings.push(SqlValue::Integer(to_millis));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let guard = self.lock()?;
        let total: i64 = guard
            .query_row(
                &format!("SELECT COUNT(*) FROM audit_log{where_clause}"),
                params_from_iter(bindings.iter()),
                |row| row.get(0),
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;

        let select = format!(
            "SELECT record_json, record_hash, hash_algorithm FROM audit_log{where_clause} ORDER \
             BY requested_at DESC, audit_id DESC LIMIT {limit} OFFSET {offset}",
            offset = query.offset
        );
        let mut statement =
            guard.prepare(&select).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params_from_iter(bindings.iter()), |row| {
                let bytes: Vec<u8> = row.get(0)?;
                let hash: String = row.get(1)?;
                let algorithm: String = row.get(2)?;
                Ok((bytes, hash, algorithm))
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(statement);
        drop(guard);

        let mut items = Vec::with_capacity(rows.len());
        for (bytes, hash_value, algorithm_label) in rows {
            let algorithm = parse_hash_algorithm(&algorithm_label)?;
            let digest = hash_bytes(algorithm, &bytes);
            if digest.value != hash_value {
                return Err(SqliteStoreError::Corrupt(
                    "audit row hash mismatch".to_string(),
                ));
            }
            items.push(deserialize_record(&bytes)?);
        }
        Ok(AuditPage {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    /// Acquires the connection guard.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }
}

impl AuditSink for SqliteAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let payload = serialize_record(record).map_err(AuditError::from)?;
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &payload);
        let guard = self.lock().map_err(AuditError::from)?;
        guard
            .execute(
                "INSERT INTO audit_log (audit_id, identity_id, model_id, operation, status, \
                 requested_at, record_json, record_hash, hash_algorithm) VALUES (?1, ?2, ?3, ?4, \
                 ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id.as_str(),
                    record.identity_id.as_str(),
                    record.model_id.as_ref().map(ModelId::as_str),
                    record.operation.as_str(),
                    record.status.as_str(),
                    record.requested_at.as_unix_millis(),
                    payload,
                    digest.value,
                    hash_algorithm_label(digest.algorithm),
                ],
            )
            .map_err(|err| AuditError::Sink(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = wal;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Initializes or validates the schema version table.
fn initialize_schema_version(tx: &rusqlite::Transaction<'_>) -> Result<(), SqliteStoreError> {
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(())
        }
        Some(value) if value == SCHEMA_VERSION => Ok(()),
        Some(value) => Err(SqliteStoreError::VersionMismatch(format!(
            "unsupported schema version: {value}"
        ))),
    }
}

/// Initializes the directory store schema.
fn initialize_directory_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    initialize_schema_version(&tx)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS identities (
            identity_id TEXT PRIMARY KEY,
            record_json BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS models (
            model_id TEXT PRIMARY KEY,
            record_json BLOB NOT NULL
        );",
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Initializes the audit store schema.
fn initialize_audit_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    initialize_schema_version(&tx)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS audit_log (
            audit_id TEXT PRIMARY KEY,
            identity_id TEXT NOT NULL,
            model_id TEXT,
            operation TEXT NOT NULL,
            status TEXT NOT NULL,
            requested_at INTEGER NOT NULL,
            record_json BLOB NOT NULL,
            record_hash TEXT NOT NULL,
            hash_algorithm TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_log_identity
            ON audit_log (identity_id, requested_at);
        CREATE INDEX IF NOT EXISTS idx_audit_log_model
            ON audit_log (model_id, requested_at);
        CREATE INDEX IF NOT EXISTS idx_audit_log_status
            ON audit_log (status, requested_at);",
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}

// ============================================================================
// SECTION: Record Helpers
// ============================================================================

/// Serializes a record to canonical JSON with the size limit enforced.
fn serialize_record<T: serde::Serialize>(record: &T) -> Result<Vec<u8>, SqliteStoreError> {
    let bytes =
        canonical_json_bytes(record).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::Invalid(format!(
            "record exceeds size limit: {} bytes (max {MAX_RECORD_BYTES})",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Deserializes a stored JSON record.
fn deserialize_record<T: serde::de::DeserializeOwned>(
    bytes: &[u8],
) -> Result<T, SqliteStoreError> {
    serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Returns the canonical hash algorithm label.
const fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(SqliteStoreError::Invalid(format!("unsupported hash algorithm: {other}"))),
    }
}
