//! In-memory repository for testing.

use crate::client::Repository;
use crate::error::{RepositoryError, RepositoryResult};
use lodestore_protocol::{
    AttributeMap, ChangeSet, Existence, ResourceDescription, ResourceUri, Value,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// The kind of repository call, as recorded in the operation journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Existence probe.
    Probe,
    /// Resource read.
    Fetch,
    /// Full structured create/replace.
    Put,
    /// Full binary create/replace.
    PutBinary,
    /// Create-in-container with minted identity.
    Post,
    /// Partial update.
    Patch,
    /// Delete (resource or tombstone marker).
    Delete,
}

/// One entry of the operation journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    /// The kind of call.
    pub operation: Operation,
    /// The URI the call targeted.
    pub uri: ResourceUri,
}

#[derive(Debug, Clone)]
enum StoredContent {
    Attributes(AttributeMap),
    Binary {
        content_type: String,
        content: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
struct StoredResource {
    content: StoredContent,
    version_token: String,
}

#[derive(Debug, Default)]
struct State {
    resources: BTreeMap<String, StoredResource>,
    tombstones: BTreeSet<String>,
}

/// An in-memory repository with full protocol semantics.
///
/// Suitable for unit and integration tests. Implements:
/// - Tombstones: a delete retains a marker that blocks identity reuse
///   until the marker itself is deleted
/// - Containment: deleting a resource deletes everything under it
/// - Server-minted identities for create-in-container
/// - Version tokens, rotated on every write and verified on conditional
///   partial updates
///
/// Every call is recorded in an operation journal so tests can assert
/// exact call counts and ordering.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
    journal: Mutex<Vec<OperationRecord>>,
    next_version: AtomicU64,
}

impl InMemoryRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the operation journal.
    #[must_use]
    pub fn journal(&self) -> Vec<OperationRecord> {
        self.journal.lock().clone()
    }

    /// Returns how many calls of the given kind were made.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.journal
            .lock()
            .iter()
            .filter(|r| r.operation == operation)
            .count()
    }

    /// Clears the operation journal.
    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    /// Returns true if a resource is stored at the URI.
    #[must_use]
    pub fn stores(&self, uri: &ResourceUri) -> bool {
        self.state.read().resources.contains_key(uri.as_str())
    }

    /// Returns the number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().resources.len()
    }

    /// Returns true if no resources are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().resources.is_empty()
    }

    fn record(&self, operation: Operation, uri: &ResourceUri) {
        self.journal.lock().push(OperationRecord {
            operation,
            uri: uri.clone(),
        });
    }

    fn next_token(&self) -> String {
        let n = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        format!("v{n}")
    }

    fn describe(uri: &ResourceUri, stored: &StoredResource) -> ResourceDescription {
        let attributes = match &stored.content {
            StoredContent::Attributes(map) => map.clone(),
            StoredContent::Binary {
                content_type,
                content,
            } => {
                let mut map = AttributeMap::new();
                map.set_one("content_type", content_type.as_str());
                map.set_one("size", Value::Int(content.len() as i64));
                map
            }
        };
        ResourceDescription::new(uri.clone(), attributes)
            .with_version_token(stored.version_token.clone())
    }

    fn store(
        &self,
        uri: &ResourceUri,
        content: StoredContent,
    ) -> RepositoryResult<ResourceDescription> {
        if uri.is_tombstone() {
            return Err(RepositoryError::Protocol(format!(
                "cannot write to a tombstone path: {uri}"
            )));
        }
        let mut state = self.state.write();
        if state.tombstones.contains(uri.as_str()) {
            return Err(RepositoryError::gone(uri.clone()));
        }
        let stored = StoredResource {
            content,
            version_token: self.next_token(),
        };
        let description = Self::describe(uri, &stored);
        state.resources.insert(uri.as_str().to_string(), stored);
        Ok(description)
    }
}

impl Repository for InMemoryRepository {
    fn probe(&self, uri: &ResourceUri) -> RepositoryResult<Existence> {
        self.record(Operation::Probe, uri);
        let state = self.state.read();
        if let Some(subject) = uri.tombstone_subject() {
            return Ok(if state.tombstones.contains(subject.as_str()) {
                Existence::Present
            } else {
                Existence::Absent
            });
        }
        Ok(if state.resources.contains_key(uri.as_str()) {
            Existence::Present
        } else if state.tombstones.contains(uri.as_str()) {
            Existence::Gone
        } else {
            Existence::Absent
        })
    }

    fn fetch(&self, uri: &ResourceUri) -> RepositoryResult<ResourceDescription> {
        self.record(Operation::Fetch, uri);
        let state = self.state.read();
        match state.resources.get(uri.as_str()) {
            Some(stored) => Ok(Self::describe(uri, stored)),
            None if state.tombstones.contains(uri.as_str()) => {
                Err(RepositoryError::gone(uri.clone()))
            }
            None => Err(RepositoryError::not_found(uri.clone())),
        }
    }

    fn put(
        &self,
        uri: &ResourceUri,
        attributes: &AttributeMap,
    ) -> RepositoryResult<ResourceDescription> {
        self.record(Operation::Put, uri);
        self.store(uri, StoredContent::Attributes(attributes.clone()))
    }

    fn put_binary(
        &self,
        uri: &ResourceUri,
        content_type: &str,
        content: &[u8],
    ) -> RepositoryResult<ResourceDescription> {
        self.record(Operation::PutBinary, uri);
        self.store(
            uri,
            StoredContent::Binary {
                content_type: content_type.to_string(),
                content: content.to_vec(),
            },
        )
    }

    fn post(
        &self,
        container: &ResourceUri,
        attributes: &AttributeMap,
    ) -> RepositoryResult<ResourceDescription> {
        self.record(Operation::Post, container);
        let slug = Uuid::new_v4().to_string();
        let minted = container.child(&slug)?;
        self.store(&minted, StoredContent::Attributes(attributes.clone()))
    }

    fn patch(
        &self,
        uri: &ResourceUri,
        changes: &ChangeSet,
        version_token: Option<&str>,
    ) -> RepositoryResult<ResourceDescription> {
        self.record(Operation::Patch, uri);
        let mut state = self.state.write();
        let stored = match state.resources.get(uri.as_str()) {
            Some(stored) => stored,
            None if state.tombstones.contains(uri.as_str()) => {
                return Err(RepositoryError::gone(uri.clone()))
            }
            None => return Err(RepositoryError::not_found(uri.clone())),
        };
        if let Some(token) = version_token {
            if token != stored.version_token {
                return Err(RepositoryError::conflict(uri.clone()));
            }
        }
        let mut attributes = match &stored.content {
            StoredContent::Attributes(map) => map.clone(),
            StoredContent::Binary { .. } => {
                return Err(RepositoryError::Protocol(format!(
                    "cannot patch a binary resource: {uri}"
                )))
            }
        };
        changes.apply(&mut attributes);
        let updated = StoredResource {
            content: StoredContent::Attributes(attributes),
            version_token: self.next_token(),
        };
        let description = Self::describe(uri, &updated);
        state.resources.insert(uri.as_str().to_string(), updated);
        Ok(description)
    }

    fn delete(&self, uri: &ResourceUri) -> RepositoryResult<()> {
        self.record(Operation::Delete, uri);
        let mut state = self.state.write();

        // Deleting a tombstone path purges the marker.
        if let Some(subject) = uri.tombstone_subject() {
            return if state.tombstones.remove(subject.as_str()) {
                Ok(())
            } else {
                Err(RepositoryError::not_found(uri.clone()))
            };
        }

        if !state.resources.contains_key(uri.as_str()) {
            return if state.tombstones.contains(uri.as_str()) {
                Err(RepositoryError::gone(uri.clone()))
            } else {
                Err(RepositoryError::not_found(uri.clone()))
            };
        }

        // Delete the resource and everything contained under it, leaving
        // a marker for each removed identity.
        let prefix = format!("{}/", uri.as_str());
        let removed: Vec<String> = state
            .resources
            .keys()
            .filter(|key| *key == uri.as_str() || key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in removed {
            state.resources.remove(&key);
            state.tombstones.insert(key);
        }
        Ok(())
    }
}
