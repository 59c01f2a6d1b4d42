//! Test fixtures and harness helpers.
//!
//! Provides a pre-wired coordinator over an in-memory repository and a
//! recording index, plus common scenario setups.

use lodestore_core::{
    Cardinality, ChildKind, ChildSchema, CoordinatorConfig, CreationPolicy, FieldMap,
    PersistenceCoordinator, RecordingIndex, Resource, SearchIndex,
};
use lodestore_protocol::ResourceUri;
use lodestore_repository::{InMemoryRepository, Repository};
use std::sync::Arc;

/// A pre-wired test harness.
pub struct TestHarness {
    /// The in-memory repository backing the coordinator.
    pub repository: Arc<InMemoryRepository>,
    /// The recording index wired into the coordinator.
    pub index: Arc<RecordingIndex>,
    /// The coordinator under test.
    pub coordinator: PersistenceCoordinator,
}

impl TestHarness {
    /// Creates a harness with the default base container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base(ResourceUri::parse("http://repo/objects").expect("valid base"))
    }

    /// Creates a harness with a specific base container.
    #[must_use]
    pub fn with_base(base: ResourceUri) -> Self {
        let repository = Arc::new(InMemoryRepository::new());
        let index = Arc::new(RecordingIndex::new());
        let coordinator = PersistenceCoordinator::new(
            Arc::clone(&repository) as Arc<dyn Repository>,
            CoordinatorConfig::new(base),
        )
        .with_index(Arc::clone(&index) as Arc<dyn SearchIndex>);
        Self {
            repository,
            index,
            coordinator,
        }
    }

    /// Creates a fresh resource with no declared children.
    #[must_use]
    pub fn resource(&self) -> Resource {
        Resource::new()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a fresh harness.
pub fn with_harness<F, R>(f: F) -> R
where
    F: FnOnce(&TestHarness) -> R,
{
    let harness = TestHarness::new();
    f(&harness)
}

/// Scenario helpers.
pub mod scenarios {
    use super::*;

    /// A schema with an eager structured child and a lazy binary child,
    /// the shape of a typical repository object.
    #[must_use]
    pub fn object_schema() -> Arc<ChildSchema> {
        Arc::new(
            ChildSchema::new()
                .declare("descMetadata", CreationPolicy::Eager, ChildKind::Structured)
                .expect("valid declaration")
                .declare("content", CreationPolicy::Lazy, ChildKind::Binary)
                .expect("valid declaration"),
        )
    }

    /// A field map delegating common fields onto the structured child
    /// of [`object_schema`].
    #[must_use]
    pub fn object_fields() -> FieldMap {
        FieldMap::new()
            .declare("title", "descMetadata", "dc:title", Cardinality::One)
            .expect("valid declaration")
            .declare("subjects", "descMetadata", "dc:subject", Cardinality::Many)
            .expect("valid declaration")
    }

    /// Creates and saves a resource with a title, returning the
    /// persisted instance.
    #[must_use]
    pub fn persisted_resource(harness: &TestHarness, title: &str) -> Resource {
        let mut resource = Resource::new();
        resource.set_one("title", title).expect("mutable resource");
        harness
            .coordinator
            .save(&mut resource)
            .expect("save succeeds");
        resource
    }
}
