// crates/model-gate-store-sqlite/tests/store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validates durable directory and audit store behavior.
// Purpose: Pin round-trips, filters, pagination, and hash verification.
// ============================================================================

//! ## Overview
//! Exercises catalog round-trips through a real database file, active-model
//! filtering, audit append plus filtered queries, newest-first ordering,
//! and the fail-closed response to a tampered audit row.

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

use model_gate_core::AuditOutcome;
use model_gate_core::AuditRecordId;
use model_gate_core::AuditSink;
use model_gate_core::AuditStatus;
use model_gate_core::DirectoryStore;
use model_gate_core::GatewayOperation;
use model_gate_core::IdentityId;
use model_gate_core::ModelId;
use model_gate_core::OperationKind;
use model_gate_core::Timestamp;
use model_gate_core::runtime::AuditDraft;
use model_gate_core::runtime::fixture_identities;
use model_gate_core::runtime::fixture_models;
use model_gate_store_sqlite::AuditQuery;
use model_gate_store_sqlite::SqliteAuditStore;
use model_gate_store_sqlite::SqliteDirectoryStore;
use model_gate_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Creates a directory store in a fresh temp directory.
fn directory_store() -> (TempDir, SqliteDirectoryStore) {
    let dir = TempDir::new().expect("temp dir");
    let config = SqliteStoreConfig::new(dir.path().join("directory.db"));
    let store = SqliteDirectoryStore::new(&config).expect("store opens");
    (dir, store)
}

/// Creates an audit store in a fresh temp directory.
fn audit_store() -> (TempDir, SqliteAuditStore) {
    let dir = TempDir::new().expect("temp dir");
    let config = SqliteStoreConfig::new(dir.path().join("audit.db"));
    let store = SqliteAuditStore::new(&config).expect("store opens");
    (dir, store)
}

/// Appends one audit record with the given id, status, and time.
fn append_record(store: &SqliteAuditStore, id: &str, status: AuditStatus, at_millis: i64) {
    let draft = AuditDraft::begin(
        AuditRecordId::new(id),
        IdentityId::new("identity-basic"),
        GatewayOperation::TextCompletion,
        Timestamp::from_unix_millis(at_millis),
    )
    .with_handle("basic_user")
    .with_model(ModelId::new("text-basic"));
    let outcome = match status {
        AuditStatus::Success => AuditOutcome::success(None, None),
        AuditStatus::Denied => AuditOutcome::denied("ACCESS_DENIED"),
        AuditStatus::Error => AuditOutcome::error("backend transport error", None),
    };
    let record = draft.finish(Timestamp::from_unix_millis(at_millis + 25), outcome);
    store.append(&record).expect("append succeeds");
}

// ============================================================================
// SECTION: Directory Store
// ============================================================================

#[test]
fn catalog_records_round_trip_through_the_database() {
    let (_dir, store) = directory_store();
    for identity in fixture_identities() {
        store.upsert_identity(&identity).expect("upsert identity");
    }
    for model in fixture_models() {
        store.upsert_model(&model).expect("upsert model");
    }

    let admin = store
        .find_identity(&IdentityId::new("identity-admin"))
        .expect("store healthy")
        .expect("admin present");
    assert_eq!(admin.handle, "admin");

    let model = store
        .find_model(&ModelId::new("image-advanced"))
        .expect("store healthy")
        .expect("model present");
    assert_eq!(model.operation, OperationKind::Image);

    assert!(
        store
            .find_identity(&IdentityId::new("ghost"))
            .expect("store healthy")
            .is_none()
    );
}

#[test]
fn upsert_replaces_existing_records() {
    let (_dir, store) = directory_store();
    let mut model = fixture_models().remove(0);
    store.upsert_model(&model).expect("insert");
    model.active = false;
    store.upsert_model(&model).expect("replace");
    let loaded =
        store.find_model(&model.id).expect("store healthy").expect("model present");
    assert!(!loaded.active);
}

#[test]
fn listing_filters_inactive_models_and_operations() {
    let (_dir, store) = directory_store();
    for mut model in fixture_models() {
        if model.id.as_str() == "text-advanced" {
            model.active = false;
        }
        store.upsert_model(&model).expect("upsert model");
    }
    let text = store
        .list_active_models(Some(OperationKind::Text))
        .expect("store healthy");
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].id.as_str(), "text-basic");
    let all = store.list_active_models(None).expect("store healthy");
    assert_eq!(all.len(), 3);
}

#[test]
fn zero_token_ceiling_is_rejected_at_the_boundary() {
    let (_dir, store) = directory_store();
    let mut identity = fixture_identities().remove(1);
    identity.token_ceiling = Some(0);
    assert!(store.upsert_identity(&identity).is_err());
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

#[test]
fn audit_records_round_trip_and_page_newest_first() {
    let (_dir, store) = audit_store();
    append_record(&store, "audit-1", AuditStatus::Success, 10_000);
    append_record(&store, "audit-2", AuditStatus::Denied, 20_000);
    append_record(&store, "audit-3", AuditStatus::Error, 30_000);

    let page = store
        .query(&AuditQuery {
            limit: 2,
            ..AuditQuery::default()
        })
        .expect("query succeeds");
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id.as_str(), "audit-3");
    assert_eq!(page.items[1].id.as_str(), "audit-2");

    let second_page = store
        .query(&AuditQuery {
            limit: 2,
            offset: 2,
            ..AuditQuery::default()
        })
        .expect("query succeeds");
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].id.as_str(), "audit-1");
}

#[test]
fn audit_queries_filter_by_status_and_time_range() {
    let (_dir, store) = audit_store();
    append_record(&store, "audit-1", AuditStatus::Success, 10_000);
    append_record(&store, "audit-2", AuditStatus::Denied, 20_000);
    append_record(&store, "audit-3", AuditStatus::Denied, 30_000);

    let denied = store
        .query(&AuditQuery {
            status: Some(AuditStatus::Denied),
            limit: 10,
            ..AuditQuery::default()
        })
        .expect("query succeeds");
    assert_eq!(denied.total, 2);
    assert!(denied.items.iter().all(|record| record.status == AuditStatus::Denied));

    let windowed = store
        .query(&AuditQuery {
            from_millis: Some(15_000),
            to_millis: Some(25_000),
            limit: 10,
            ..AuditQuery::default()
        })
        .expect("query succeeds");
    assert_eq!(windowed.total, 1);
    assert_eq!(windowed.items[0].id.as_str(), "audit-2");
}

#[test]
fn duplicate_audit_ids_are_rejected_as_append_only() {
    let (_dir, store) = audit_store();
    append_record(&store, "audit-1", AuditStatus::Success, 10_000);
    let draft = AuditDraft::begin(
        AuditRecordId::new("audit-1"),
        IdentityId::new("identity-basic"),
        GatewayOperation::TextCompletion,
        Timestamp::from_unix_millis(11_000),
    );
    let record =
        draft.finish(Timestamp::from_unix_millis(11_050), AuditOutcome::success(None, None));
    assert!(store.append(&record).is_err());
}

#[test]
fn tampered_audit_rows_fail_verification_on_read() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("audit.db");
    let config = SqliteStoreConfig::new(path.clone());
    let store = SqliteAuditStore::new(&config).expect("store opens");
    append_record(&store, "audit-1", AuditStatus::Success, 10_000);
    drop(store);

    // Flip the recorded status without updating the row hash.
    let connection = rusqlite::Connection::open(&path).expect("raw connection");
    connection
        .execute(
            "UPDATE audit_log SET record_json = replace(record_json, 'success', 'denied')",
            [],
        )
        .expect("tamper row");
    drop(connection);

    let reopened = SqliteAuditStore::new(&config).expect("store reopens");
    let result = reopened.query(&AuditQuery {
        limit: 10,
        ..AuditQuery::default()
    });
    assert!(result.is_err());
}
