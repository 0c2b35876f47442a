// crates/model-gate-core/tests/store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Validates the in-memory directory store and fixture catalog.
// Purpose: Pin lookup semantics, active filtering, and fixture contents.
// ============================================================================

//! ## Overview
//! Covers `Ok(None)` semantics for unknown ids, the active/operation filter
//! on catalog listings, and the shape of the seeded fixture data.

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

use model_gate_core::AccessTier;
use model_gate_core::DirectoryStore;
use model_gate_core::IdentityId;
use model_gate_core::ModelId;
use model_gate_core::OperationKind;
use model_gate_core::runtime::InMemoryDirectoryStore;
use model_gate_core::runtime::fixture_models;

#[test]
fn unknown_ids_resolve_to_none_not_errors() {
    let store = InMemoryDirectoryStore::new();
    let identity = store.find_identity(&IdentityId::new("ghost")).expect("store healthy");
    assert!(identity.is_none());
    let model = store.find_model(&ModelId::new("ghost")).expect("store healthy");
    assert!(model.is_none());
}

#[test]
fn fixture_store_resolves_all_seeded_records() {
    let store = InMemoryDirectoryStore::with_fixture();
    let admin = store
        .find_identity(&IdentityId::new("identity-admin"))
        .expect("store healthy")
        .expect("admin seeded");
    assert_eq!(admin.tier, AccessTier::Admin);
    assert_eq!(admin.handle, "admin");

    let model = store
        .find_model(&ModelId::new("text-advanced"))
        .expect("store healthy")
        .expect("model seeded");
    assert_eq!(model.required_tier, AccessTier::Advanced);
    assert!(model.active);
}

#[test]
fn listing_filters_inactive_models_and_operation_kinds() {
    let store = InMemoryDirectoryStore::with_fixture();
    let mut retired = fixture_models().remove(0);
    retired.active = false;
    store.put_model(retired.clone());

    let all_active = store.list_active_models(None).expect("store healthy");
    assert_eq!(all_active.len(), 3);
    assert!(all_active.iter().all(|model| model.id != retired.id));

    let images = store.list_active_models(Some(OperationKind::Image)).expect("store healthy");
    assert_eq!(images.len(), 2);
    assert!(images.iter().all(|model| model.operation == OperationKind::Image));
}

#[test]
fn fixture_allow_lists_cover_the_expected_models() {
    let store = InMemoryDirectoryStore::with_fixture();
    let basic = store
        .find_identity(&IdentityId::new("identity-basic"))
        .expect("store healthy")
        .expect("basic seeded");
    assert!(basic.allowed_models.contains(&ModelId::new("text-basic")));
    assert!(!basic.allowed_models.contains(&ModelId::new("text-advanced")));
    assert_eq!(basic.effective_token_ceiling(), 1_000);
}
