//! Save/delete lifecycle orchestration.

use crate::config::CoordinatorConfig;
use crate::contained::ChildContent;
use crate::diff::compute_change_set;
use crate::error::{CoreError, CoreResult};
use crate::index::{serialize_for_index, NullIndex, SearchIndex};
use crate::resource::Resource;
use crate::tombstone::TombstoneManager;
use lodestore_protocol::{AttributeMap, Existence, ResourceUri};
use lodestore_repository::Repository;
use std::sync::Arc;
use tracing::{debug, warn};

/// Mints local names for new resources.
///
/// When no minter is configured, identity assignment is deferred to the
/// repository's response to a create-in-container request.
pub trait IdentityMinter: Send + Sync {
    /// Returns the slug for a new resource, placed under the configured
    /// base container.
    fn mint(&self, resource: &Resource) -> String;
}

/// Options for [`PersistenceCoordinator::delete`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Also purge the tombstone marker after the delete.
    pub eradicate: bool,
}

impl DeleteOptions {
    /// Options that additionally purge the tombstone marker.
    #[must_use]
    pub fn eradicating() -> Self {
        Self { eradicate: true }
    }
}

/// Orchestrates the full save/delete lifecycle of resources.
///
/// Per invocation there is a single logical thread of control: every
/// remote call blocks until response, and no lock is taken. Concurrent
/// saves of the same resource from multiple threads or processes are
/// not coordinated here; the repository's own concurrency control is
/// the only protection. The coordinator passes the last known version
/// token to partial updates but does not verify it before diffing, nor
/// retry on conflict.
pub struct PersistenceCoordinator {
    repository: Arc<dyn Repository>,
    index: Arc<dyn SearchIndex>,
    config: CoordinatorConfig,
    minter: Option<Arc<dyn IdentityMinter>>,
    tombstones: TombstoneManager,
}

impl PersistenceCoordinator {
    /// Creates a coordinator with a no-op index and no identity minter.
    pub fn new(repository: Arc<dyn Repository>, config: CoordinatorConfig) -> Self {
        let tombstones = TombstoneManager::new(Arc::clone(&repository));
        Self {
            repository,
            index: Arc::new(NullIndex::new()),
            config,
            minter: None,
            tombstones,
        }
    }

    /// Sets the secondary index.
    #[must_use]
    pub fn with_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = index;
        self
    }

    /// Sets the identity-minting hook.
    #[must_use]
    pub fn with_minter(mut self, minter: Arc<dyn IdentityMinter>) -> Self {
        self.minter = Some(minter);
        self
    }

    /// The tombstone manager bound to this coordinator's repository.
    #[must_use]
    pub fn tombstones(&self) -> &TombstoneManager {
        &self.tombstones
    }

    /// Probes the existence of a URI.
    pub fn exists(&self, uri: &ResourceUri) -> CoreResult<Existence> {
        self.tombstones.exists(uri)
    }

    /// Persists a resource, creating or updating as its lifecycle state
    /// requires.
    ///
    /// Fails fast with `ReadOnly`, before any network call, when the
    /// resource is read-only or destroyed. An update whose change set
    /// is empty succeeds without a network call.
    pub fn save(&self, resource: &mut Resource) -> CoreResult<bool> {
        resource.ensure_mutable()?;
        if resource.is_new() {
            self.create(resource)?;
        } else {
            self.update(resource)?;
        }
        Ok(true)
    }

    /// Creates a resource on the repository.
    ///
    /// Identity comes from (in order): an identity already assigned,
    /// the minter hook, or the repository's response to a
    /// create-in-container request. Once the parent identity is
    /// confirmed, derived identities are assigned to all contained
    /// resources and each is saved in declaration order; eager children
    /// are created even when empty. Concludes with a refresh.
    pub fn create(&self, resource: &mut Resource) -> CoreResult<()> {
        resource.ensure_mutable()?;
        if !resource.is_new() {
            return Err(CoreError::invalid_argument(
                "create requires a resource that has not been persisted",
            ));
        }

        let description = match resource.identity().cloned() {
            Some(uri) => self.repository.put(&uri, resource.attributes())?,
            None => {
                if let Some(minter) = &self.minter {
                    let slug = minter.mint(resource);
                    let uri = self.config.base_container.child(&slug)?;
                    resource.assign_identity(uri.clone())?;
                    self.repository.put(&uri, resource.attributes())?
                } else {
                    let description = self
                        .repository
                        .post(&self.config.base_container, resource.attributes())?;
                    resource.assign_identity(description.uri.clone())?;
                    description
                }
            }
        };
        debug!(uri = %description.uri, "resource created");

        // Parent identity is confirmed; children may now derive theirs.
        {
            let children = resource.children_mut()?;
            children.materialize();
            children.assign_identities(&description.uri)?;
        }
        self.save_children(resource, false)?;

        self.refresh(resource)?;
        self.sync_index(resource);
        Ok(())
    }

    /// Applies local changes to an already-persisted resource.
    ///
    /// Computes a change set restricted to the modified keys; an empty
    /// change set with no dirty children is a no-op success with zero
    /// network operations. Otherwise a partial update scoped to exactly
    /// the changed predicates is issued, then only the contained
    /// resources flagged dirty are saved, then the baseline is
    /// refreshed.
    pub fn update(&self, resource: &mut Resource) -> CoreResult<()> {
        resource.ensure_mutable()?;
        let uri = resource
            .identity()
            .cloned()
            .ok_or_else(|| CoreError::identity_missing("update requires an assigned identity"))?;

        let changes = compute_change_set(
            resource.baseline(),
            resource.attributes(),
            resource.modified_keys(),
        );
        let dirty_children = resource.children().changed().next().is_some();
        if changes.is_empty() && !dirty_children {
            debug!(uri = %uri, "nothing to save");
            return Ok(());
        }

        if !changes.is_empty() {
            self.repository
                .patch(&uri, &changes, resource.version_token())?;
            debug!(uri = %uri, predicates = ?changes.predicates(), "resource patched");
        }

        // The cascade strictly follows the primary update succeeding.
        resource.children_mut()?.assign_identities(&uri)?;
        self.save_children(resource, true)?;

        self.refresh(resource)?;
        self.sync_index(resource);
        Ok(())
    }

    /// Deletes a resource.
    ///
    /// A `New` or already-`Destroyed` resource is a no-op: the instance
    /// is returned unchanged and no remote call is issued. The
    /// transition to `Destroyed` happens before the remote delete
    /// resolves, guarding against reentrant deletes of the same
    /// instance; a failed remote delete therefore leaves the instance
    /// destroyed while the remote side still exists, surfaced to the
    /// caller as the error itself.
    pub fn delete(&self, resource: &mut Resource, options: DeleteOptions) -> CoreResult<()> {
        if resource.is_new() || resource.is_destroyed() {
            return Ok(());
        }
        if resource.is_read_only() {
            return Err(CoreError::read_only(
                "delete rejected: resource is marked read-only",
            ));
        }
        let uri = resource
            .identity()
            .cloned()
            .ok_or_else(|| CoreError::identity_missing("delete requires an assigned identity"))?;

        resource.mark_destroyed();
        self.repository.delete(&uri)?;
        debug!(uri = %uri, "resource deleted");

        if self.config.index_sync {
            if let Err(err) = self.index.delete(&uri) {
                warn!(uri = %uri, error = %err, "index deletion failed");
            }
        }

        if options.eradicate {
            self.tombstones.eradicate(&uri)?;
        }
        Ok(())
    }

    /// Re-reads remote state into the resource's baseline and marks all
    /// contained resources clean.
    pub fn refresh(&self, resource: &mut Resource) -> CoreResult<()> {
        resource.ensure_mutable()?;
        let uri = resource
            .identity()
            .cloned()
            .ok_or_else(|| CoreError::identity_missing("refresh requires an assigned identity"))?;
        let description = self.repository.fetch(&uri)?;
        resource.absorb(&description);
        resource.children_unguarded().mark_all_clean();
        Ok(())
    }

    /// Saves contained resources in cascade order, marking each clean
    /// after its write is confirmed.
    fn save_children(&self, resource: &mut Resource, only_dirty: bool) -> CoreResult<()> {
        let pending: Vec<(String, Option<ResourceUri>, ChildContent)> = resource
            .children()
            .iter()
            .filter(|c| !only_dirty || c.is_dirty())
            .map(|c| {
                (
                    c.slug().to_string(),
                    c.identity().cloned(),
                    c.content().clone(),
                )
            })
            .collect();

        for (slug, identity, content) in pending {
            let uri = identity.ok_or_else(|| {
                CoreError::identity_missing(format!(
                    "contained resource {slug:?} has no derived identity"
                ))
            })?;
            match &content {
                ChildContent::Binary {
                    content_type,
                    content,
                } => {
                    self.repository.put_binary(&uri, content_type, content)?;
                }
                ChildContent::Attributes(map) => {
                    self.repository.put(&uri, map)?;
                }
                ChildContent::Empty => {
                    self.repository.put(&uri, &AttributeMap::new())?;
                }
            }
            resource.children_unguarded().mark_clean(&slug);
            debug!(uri = %uri, slug = %slug, "contained resource saved");
        }
        Ok(())
    }

    fn sync_index(&self, resource: &Resource) {
        if !self.config.index_sync {
            return;
        }
        let Some(uri) = resource.identity() else {
            return;
        };
        let document = serialize_for_index(resource);
        if let Err(err) = self.index.index(uri, &document) {
            warn!(uri = %uri, error = %err, "index synchronization failed");
        }
    }
}

impl std::fmt::Debug for PersistenceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceCoordinator")
            .field("config", &self.config)
            .field("has_minter", &self.minter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contained::{ChildKind, ChildSchema, CreationPolicy};
    use crate::index::{IndexEvent, RecordingIndex};
    use lodestore_repository::{InMemoryRepository, Operation};

    fn base() -> ResourceUri {
        ResourceUri::parse("http://repo/objects").unwrap()
    }

    fn setup() -> (Arc<InMemoryRepository>, PersistenceCoordinator) {
        let repo = Arc::new(InMemoryRepository::new());
        let coordinator = PersistenceCoordinator::new(
            Arc::clone(&repo) as Arc<dyn Repository>,
            CoordinatorConfig::new(base()),
        );
        (repo, coordinator)
    }

    struct FixedMinter(&'static str);

    impl IdentityMinter for FixedMinter {
        fn mint(&self, _resource: &Resource) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn save_new_resource_defers_identity_to_repository() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        resource.set_one("title", "A").unwrap();

        assert!(coordinator.save(&mut resource).unwrap());
        assert!(resource.is_persisted());
        let identity = resource.identity().unwrap();
        assert!(base().contains(identity));
        assert_eq!(repo.count(Operation::Post), 1);
        assert_eq!(repo.count(Operation::Patch), 0);
        assert!(resource.version_token().is_some());
    }

    #[test]
    fn save_new_resource_uses_minter_hook() {
        let (repo, coordinator) = setup();
        let coordinator = coordinator.with_minter(Arc::new(FixedMinter("item-1")));
        let mut resource = Resource::new();

        coordinator.save(&mut resource).unwrap();
        assert_eq!(
            resource.identity().unwrap().as_str(),
            "http://repo/objects/item-1"
        );
        assert_eq!(repo.count(Operation::Put), 1);
        assert_eq!(repo.count(Operation::Post), 0);
    }

    #[test]
    fn save_new_resource_with_preassigned_identity() {
        let (repo, coordinator) = setup();
        let uri = ResourceUri::parse("http://repo/objects/fixed").unwrap();
        let mut resource = Resource::new();
        resource.assign_identity(uri.clone()).unwrap();

        coordinator.save(&mut resource).unwrap();
        assert!(repo.stores(&uri));
        assert_eq!(repo.count(Operation::Post), 0);
    }

    #[test]
    fn create_rejects_persisted_resource() {
        let (_repo, coordinator) = setup();
        let mut resource = Resource::new();
        coordinator.save(&mut resource).unwrap();

        let result = coordinator.create(&mut resource);
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn update_patches_only_changed_predicates() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        resource.set_one("title", "A").unwrap();
        resource.set_one("creator", "X").unwrap();
        coordinator.save(&mut resource).unwrap();

        resource.set_one("title", "B").unwrap();
        coordinator.save(&mut resource).unwrap();

        assert_eq!(repo.count(Operation::Patch), 1);
        let journal = repo.journal();
        let patch = journal
            .iter()
            .find(|r| r.operation == Operation::Patch)
            .unwrap();
        assert_eq!(patch.uri, *resource.identity().unwrap());

        let fetched = repo.fetch(resource.identity().unwrap()).unwrap();
        assert_eq!(
            fetched.attributes.first("title"),
            Some(&lodestore_protocol::Value::from("B"))
        );
        assert_eq!(
            fetched.attributes.first("creator"),
            Some(&lodestore_protocol::Value::from("X"))
        );
    }

    #[test]
    fn unchanged_save_issues_zero_network_calls() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        resource.set_one("title", "A").unwrap();
        coordinator.save(&mut resource).unwrap();

        repo.clear_journal();
        assert!(coordinator.save(&mut resource).unwrap());
        assert!(repo.journal().is_empty());
    }

    #[test]
    fn eager_child_is_created_exactly_once_with_derived_identity() {
        let (repo, coordinator) = setup();
        let schema = Arc::new(
            ChildSchema::new()
                .declare("descMetadata", CreationPolicy::Eager, ChildKind::Structured)
                .unwrap()
                .declare("thumbnail", CreationPolicy::Lazy, ChildKind::Binary)
                .unwrap(),
        );
        let mut resource = Resource::with_schema(schema);
        coordinator.save(&mut resource).unwrap();

        let parent = resource.identity().unwrap().clone();
        let child = resource
            .children()
            .get("descMetadata")
            .unwrap()
            .unwrap()
            .identity()
            .unwrap()
            .clone();
        assert_eq!(
            child.as_str(),
            format!("{}/descMetadata", parent.as_str())
        );
        // One put for the eager child; the lazy child was never touched.
        let puts: Vec<_> = repo
            .journal()
            .into_iter()
            .filter(|r| r.operation == Operation::Put)
            .collect();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].uri, child);
        assert!(!repo.stores(&parent.child("thumbnail").unwrap()));
    }

    #[test]
    fn update_saves_only_dirty_children() {
        let (repo, coordinator) = setup();
        let schema = Arc::new(
            ChildSchema::new()
                .declare("descMetadata", CreationPolicy::Eager, ChildKind::Structured)
                .unwrap()
                .declare("rightsMetadata", CreationPolicy::Eager, ChildKind::Structured)
                .unwrap(),
        );
        let mut resource = Resource::with_schema(schema);
        coordinator.save(&mut resource).unwrap();
        repo.clear_journal();

        resource
            .children_mut()
            .unwrap()
            .update_attributes("descMetadata", |map| map.set_one("title", "A"))
            .unwrap();
        coordinator.save(&mut resource).unwrap();

        let puts: Vec<_> = repo
            .journal()
            .into_iter()
            .filter(|r| r.operation == Operation::Put)
            .collect();
        assert_eq!(puts.len(), 1);
        assert!(puts[0].uri.as_str().ends_with("/descMetadata"));
        // No patch on the parent: its own attributes were untouched.
        assert_eq!(repo.count(Operation::Patch), 0);
    }

    #[test]
    fn lazy_child_attached_after_create_is_saved_on_update() {
        let (repo, coordinator) = setup();
        let schema = Arc::new(
            ChildSchema::new()
                .declare("thumbnail", CreationPolicy::Lazy, ChildKind::Binary)
                .unwrap(),
        );
        let mut resource = Resource::with_schema(schema);
        coordinator.save(&mut resource).unwrap();
        repo.clear_journal();

        resource
            .children_mut()
            .unwrap()
            .attach(
                "thumbnail",
                ChildContent::Binary {
                    content_type: "image/png".into(),
                    content: vec![1, 2, 3],
                },
            )
            .unwrap();
        coordinator.save(&mut resource).unwrap();

        assert_eq!(repo.count(Operation::PutBinary), 1);
        let child = resource.identity().unwrap().child("thumbnail").unwrap();
        assert!(repo.stores(&child));
    }

    #[test]
    fn delete_freezes_instance_and_leaves_tombstone() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        coordinator.save(&mut resource).unwrap();
        let uri = resource.identity().unwrap().clone();

        coordinator.delete(&mut resource, DeleteOptions::default()).unwrap();
        assert!(resource.is_destroyed());
        assert_eq!(repo.probe(&uri).unwrap(), Existence::Gone);

        // A second delete is a pure no-op.
        repo.clear_journal();
        coordinator.delete(&mut resource, DeleteOptions::default()).unwrap();
        assert!(repo.journal().is_empty());
    }

    #[test]
    fn delete_of_vanished_remote_surfaces_object_not_found() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        coordinator.save(&mut resource).unwrap();
        let uri = resource.identity().unwrap().clone();

        // The remote side disappears behind our back, marker included.
        repo.delete(&uri).unwrap();
        repo.delete(&uri.tombstone()).unwrap();

        let result = coordinator.delete(&mut resource, DeleteOptions::default());
        assert!(matches!(result, Err(CoreError::ObjectNotFound { .. })));
        // The instance froze before the remote call resolved.
        assert!(resource.is_destroyed());
    }

    #[test]
    fn delete_new_resource_is_a_no_op() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        coordinator.delete(&mut resource, DeleteOptions::default()).unwrap();
        assert!(resource.is_new());
        assert!(repo.journal().is_empty());
    }

    #[test]
    fn delete_with_eradicate_purges_marker() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        coordinator.save(&mut resource).unwrap();
        let uri = resource.identity().unwrap().clone();

        coordinator
            .delete(&mut resource, DeleteOptions::eradicating())
            .unwrap();
        assert_eq!(repo.probe(&uri).unwrap(), Existence::Absent);
    }

    #[test]
    fn save_after_delete_is_rejected() {
        let (_repo, coordinator) = setup();
        let mut resource = Resource::new();
        coordinator.save(&mut resource).unwrap();
        coordinator.delete(&mut resource, DeleteOptions::default()).unwrap();

        let result = coordinator.save(&mut resource);
        assert!(matches!(result, Err(CoreError::ReadOnly { .. })));
    }

    #[test]
    fn read_only_guards_fire_before_network() {
        let (repo, coordinator) = setup();
        let mut resource = Resource::new();
        coordinator.save(&mut resource).unwrap();
        resource.mark_read_only();
        repo.clear_journal();

        assert!(matches!(
            coordinator.save(&mut resource),
            Err(CoreError::ReadOnly { .. })
        ));
        assert!(matches!(
            coordinator.delete(&mut resource, DeleteOptions::default()),
            Err(CoreError::ReadOnly { .. })
        ));
        assert!(repo.journal().is_empty());
    }

    #[test]
    fn index_sees_saves_and_deletes() {
        let repo = Arc::new(InMemoryRepository::new());
        let index = Arc::new(RecordingIndex::new());
        let coordinator = PersistenceCoordinator::new(
            Arc::clone(&repo) as Arc<dyn Repository>,
            CoordinatorConfig::new(base()),
        )
        .with_index(Arc::clone(&index) as Arc<dyn SearchIndex>);

        let mut resource = Resource::new();
        resource.set_one("title", "A").unwrap();
        coordinator.save(&mut resource).unwrap();
        let uri = resource.identity().unwrap().clone();
        coordinator.delete(&mut resource, DeleteOptions::default()).unwrap();

        let events = index.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], IndexEvent::Indexed { uri: u, .. } if *u == uri));
        assert!(matches!(&events[1], IndexEvent::Deleted { uri: u } if *u == uri));
    }

    #[test]
    fn index_sync_toggle_disables_all_calls() {
        let repo = Arc::new(InMemoryRepository::new());
        let index = Arc::new(RecordingIndex::new());
        let coordinator = PersistenceCoordinator::new(
            Arc::clone(&repo) as Arc<dyn Repository>,
            CoordinatorConfig::new(base()).with_index_sync(false),
        )
        .with_index(Arc::clone(&index) as Arc<dyn SearchIndex>);

        let mut resource = Resource::new();
        coordinator.save(&mut resource).unwrap();
        coordinator.delete(&mut resource, DeleteOptions::default()).unwrap();
        assert!(index.events().is_empty());
    }

    #[test]
    fn index_failure_does_not_fail_save() {
        let repo = Arc::new(InMemoryRepository::new());
        let index = Arc::new(RecordingIndex::new());
        index.set_failing(true);
        let coordinator = PersistenceCoordinator::new(
            Arc::clone(&repo) as Arc<dyn Repository>,
            CoordinatorConfig::new(base()),
        )
        .with_index(Arc::clone(&index) as Arc<dyn SearchIndex>);

        let mut resource = Resource::new();
        assert!(coordinator.save(&mut resource).unwrap());
        assert!(resource.is_persisted());
    }

    #[test]
    fn refresh_discards_local_modifications() {
        let (_repo, coordinator) = setup();
        let mut resource = Resource::new();
        resource.set_one("title", "A").unwrap();
        coordinator.save(&mut resource).unwrap();

        resource.set_one("title", "B").unwrap();
        coordinator.refresh(&mut resource).unwrap();
        assert_eq!(
            resource.first("title"),
            Some(&lodestore_protocol::Value::from("A"))
        );
        assert!(resource.modified_keys().is_empty());
    }
}
