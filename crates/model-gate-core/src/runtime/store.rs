// model-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Model Gate In-Memory Stores
// Description: In-memory directory store and audit sink with fixture data.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`DirectoryStore`] and
//! [`AuditSink`] plus the seeded fixture catalog used by tests and
//! memory-mode deployments. The fixture mirrors a small three-identity,
//! four-model installation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::json;

use crate::core::AccessTier;
use crate::core::AuditRecord;
use crate::core::Identity;
use crate::core::IdentityId;
use crate::core::IdentityStatus;
use crate::core::ModelId;
use crate::core::ModelRecord;
use crate::core::OperationKind;
use crate::interfaces::AuditError;
use crate::interfaces::AuditSink;
use crate::interfaces::DirectoryError;
use crate::interfaces::DirectoryStore;

// ============================================================================
// SECTION: In-Memory Directory Store
// ============================================================================

/// In-memory directory store for tests and memory-mode deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectoryStore {
    /// Identity map protected by a mutex.
    identities: Arc<Mutex<BTreeMap<IdentityId, Identity>>>,
    /// Model map protected by a mutex.
    models: Arc<Mutex<BTreeMap<ModelId, ModelRecord>>>,
}

impl InMemoryDirectoryStore {
    /// Creates an empty in-memory directory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the fixture catalog.
    #[must_use]
    pub fn with_fixture() -> Self {
        let store = Self::new();
        for identity in fixture_identities() {
            store.put_identity(identity);
        }
        for model in fixture_models() {
            store.put_model(model);
        }
        store
    }

    /// Inserts or replaces an identity.
    pub fn put_identity(&self, identity: Identity) {
        if let Ok(mut guard) = self.identities.lock() {
            guard.insert(identity.id.clone(), identity);
        }
    }

    /// Inserts or replaces a model.
    pub fn put_model(&self, model: ModelRecord) {
        if let Ok(mut guard) = self.models.lock() {
            guard.insert(model.id.clone(), model);
        }
    }
}

impl DirectoryStore for InMemoryDirectoryStore {
    fn find_identity(&self, id: &IdentityId) -> Result<Option<Identity>, DirectoryError> {
        let guard = self
            .identities
            .lock()
            .map_err(|_| DirectoryError::Store("identity map mutex poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    fn find_model(&self, id: &ModelId) -> Result<Option<ModelRecord>, DirectoryError> {
        let guard = self
            .models
            .lock()
            .map_err(|_| DirectoryError::Store("model map mutex poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    fn list_active_models(
        &self,
        operation: Option<OperationKind>,
    ) -> Result<Vec<ModelRecord>, DirectoryError> {
        let guard = self
            .models
            .lock()
            .map_err(|_| DirectoryError::Store("model map mutex poisoned".to_string()))?;
        Ok(guard
            .values()
            .filter(|model| model.active)
            .filter(|model| operation.is_none_or(|kind| model.operation == kind))
            .cloned()
            .collect())
    }
}

// ============================================================================
// SECTION: In-Memory Audit Sink
// ============================================================================

/// In-memory append-only audit sink for tests and memory-mode deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditSink {
    /// Appended records in arrival order.
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditSink {
    /// Creates an empty in-memory audit sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all appended records in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns the number of appended records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or_default()
    }

    /// Returns true when no records have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .map_err(|_| AuditError::Sink("audit sink mutex poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrappers
// ============================================================================

/// Shared directory store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedDirectoryStore {
    /// Inner store implementation.
    inner: Arc<dyn DirectoryStore>,
}

impl SharedDirectoryStore {
    /// Wraps a directory store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl DirectoryStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl DirectoryStore for SharedDirectoryStore {
    fn find_identity(&self, id: &IdentityId) -> Result<Option<Identity>, DirectoryError> {
        self.inner.find_identity(id)
    }

    fn find_model(&self, id: &ModelId) -> Result<Option<ModelRecord>, DirectoryError> {
        self.inner.find_model(id)
    }

    fn list_active_models(
        &self,
        operation: Option<OperationKind>,
    ) -> Result<Vec<ModelRecord>, DirectoryError> {
        self.inner.list_active_models(operation)
    }
}

// ============================================================================
// SECTION: Fixture Catalog
// ============================================================================

/// Returns the fixture identities: one per tier.
#[must_use]
pub fn fixture_identities() -> Vec<Identity> {
    vec![
        Identity {
            id: IdentityId::new("identity-admin"),
            handle: "admin".to_string(),
            display_name: "Administrator".to_string(),
            status: IdentityStatus::Active,
            tier: AccessTier::Admin,
            allowed_models: BTreeSet::new(),
            token_ceiling: Some(10_000),
            feature_flags: ["fine-tuning".to_string(), "model-management".to_string()]
                .into_iter()
                .collect(),
        },
        Identity {
            id: IdentityId::new("identity-basic"),
            handle: "basic_user".to_string(),
            display_name: "Basic User".to_string(),
            status: IdentityStatus::Active,
            tier: AccessTier::Basic,
            allowed_models: [ModelId::new("text-basic"), ModelId::new("image-basic")]
                .into_iter()
                .collect(),
            token_ceiling: Some(1_000),
            feature_flags: BTreeSet::new(),
        },
        Identity {
            id: IdentityId::new("identity-advanced"),
            handle: "advanced_user".to_string(),
            display_name: "Advanced User".to_string(),
            status: IdentityStatus::Active,
            tier: AccessTier::Advanced,
            allowed_models: [
                ModelId::new("text-basic"),
                ModelId::new("text-advanced"),
                ModelId::new("image-basic"),
                ModelId::new("image-advanced"),
            ]
            .into_iter()
            .collect(),
            token_ceiling: Some(4_000),
            feature_flags: ["fine-tuning".to_string()].into_iter().collect(),
        },
    ]
}

/// Returns the fixture model catalog: two text and two image models.
#[must_use]
pub fn fixture_models() -> Vec<ModelRecord> {
    vec![
        ModelRecord {
            id: ModelId::new("text-basic"),
            name: "Basic Text Model".to_string(),
            description: "General-purpose text generation".to_string(),
            operation: OperationKind::Text,
            required_tier: AccessTier::Basic,
            active: true,
            backend_params: json!({
                "max_tokens": 1000,
                "temperature": 0.7,
                "models": ["text-basic-v1"],
            }),
        },
        ModelRecord {
            id: ModelId::new("text-advanced"),
            name: "Advanced Text Model".to_string(),
            description: "High-quality text generation".to_string(),
            operation: OperationKind::Text,
            required_tier: AccessTier::Advanced,
            active: true,
            backend_params: json!({
                "max_tokens": 4000,
                "temperature": 0.7,
                "models": ["text-advanced-v1"],
            }),
        },
        ModelRecord {
            id: ModelId::new("image-basic"),
            name: "Basic Image Model".to_string(),
            description: "General-purpose image generation".to_string(),
            operation: OperationKind::Image,
            required_tier: AccessTier::Basic,
            active: true,
            backend_params: json!({
                "n": 1,
                "size": "512x512",
                "models": ["image-basic-v1"],
            }),
        },
        ModelRecord {
            id: ModelId::new("image-advanced"),
            name: "Advanced Image Model".to_string(),
            description: "High-quality image generation".to_string(),
            operation: OperationKind::Image,
            required_tier: AccessTier::Advanced,
            active: true,
            backend_params: json!({
                "n": 4,
                "size": "1024x1024",
                "models": ["image-advanced-v1"],
            }),
        },
    ]
}
