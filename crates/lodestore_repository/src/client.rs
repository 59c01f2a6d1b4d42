//! Repository client abstraction.

use crate::error::RepositoryResult;
use lodestore_protocol::{AttributeMap, ChangeSet, Existence, ResourceDescription, ResourceUri};

/// A synchronous client for a Linked-Data-Platform-style repository.
///
/// This trait abstracts the wire protocol, allowing different
/// implementations (HTTP, in-memory for testing). Every call blocks the
/// caller until response; cancellation, timeout, and retry are entirely
/// the implementation's concern.
pub trait Repository: Send + Sync {
    /// Probes the existence of a resource.
    ///
    /// Absence and gone-with-tombstone are ordinary outcomes here, never
    /// errors; callers pattern-match on [`Existence`].
    fn probe(&self, uri: &ResourceUri) -> RepositoryResult<Existence>;

    /// Reads a resource's description.
    ///
    /// Fails with `NotFound` for an absent resource and `Gone` when only
    /// a tombstone marker remains.
    fn fetch(&self, uri: &ResourceUri) -> RepositoryResult<ResourceDescription>;

    /// Creates or fully replaces a structured resource at a known URI.
    ///
    /// Fails with `Gone` while a tombstone for the URI remains.
    fn put(
        &self,
        uri: &ResourceUri,
        attributes: &AttributeMap,
    ) -> RepositoryResult<ResourceDescription>;

    /// Creates or fully replaces a binary resource at a known URI.
    fn put_binary(
        &self,
        uri: &ResourceUri,
        content_type: &str,
        content: &[u8],
    ) -> RepositoryResult<ResourceDescription>;

    /// Creates a resource inside a container, letting the repository
    /// mint the identity. Returns the description carrying the assigned
    /// URI.
    fn post(
        &self,
        container: &ResourceUri,
        attributes: &AttributeMap,
    ) -> RepositoryResult<ResourceDescription>;

    /// Applies a partial update scoped to exactly the change set's
    /// predicates.
    ///
    /// `version_token` is the optimistic-concurrency hook: when given,
    /// the repository may reject the write with `Conflict`. Callers that
    /// pass `None` opt out of conflict detection.
    fn patch(
        &self,
        uri: &ResourceUri,
        changes: &ChangeSet,
        version_token: Option<&str>,
    ) -> RepositoryResult<ResourceDescription>;

    /// Deletes a resource, leaving a tombstone marker at the reserved
    /// child path. Deleting the tombstone path itself purges the marker.
    ///
    /// Fails with `NotFound` for an absent target.
    fn delete(&self, uri: &ResourceUri) -> RepositoryResult<()>;
}
