//! Secondary search-index boundary.
//!
//! Index synchronization is best effort and non-transactional: a
//! failure here never rolls back or fails the primary repository
//! operation, so repository state and index state can diverge for a
//! window.

use crate::resource::Resource;
use lodestore_protocol::ResourceUri;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A secondary index consumed by the persistence coordinator.
///
/// Calls are fire-and-forget relative to the primary repository
/// operation. Implementations report failure through the error string;
/// the coordinator logs it and moves on.
pub trait SearchIndex: Send + Sync {
    /// Indexes (creates or updates) the serialized representation of a
    /// resource.
    fn index(&self, uri: &ResourceUri, document: &serde_json::Value) -> Result<(), String>;

    /// Deletes a resource from the index.
    fn delete(&self, uri: &ResourceUri) -> Result<(), String>;
}

/// Builds the serialized representation handed to the index.
#[must_use]
pub fn serialize_for_index(resource: &Resource) -> serde_json::Value {
    serde_json::json!({
        "id": resource.identity().map(ToString::to_string),
        "attributes": resource.attributes(),
    })
}

/// An index that ignores every call.
#[derive(Debug, Default)]
pub struct NullIndex;

impl NullIndex {
    /// Creates a no-op index.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SearchIndex for NullIndex {
    fn index(&self, _uri: &ResourceUri, _document: &serde_json::Value) -> Result<(), String> {
        Ok(())
    }

    fn delete(&self, _uri: &ResourceUri) -> Result<(), String> {
        Ok(())
    }
}

/// One call observed by the [`RecordingIndex`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    /// A resource was indexed.
    Indexed {
        /// The indexed identity.
        uri: ResourceUri,
        /// The serialized representation.
        document: serde_json::Value,
    },
    /// A resource was deleted from the index.
    Deleted {
        /// The deleted identity.
        uri: ResourceUri,
    },
}

/// A recording index for tests.
///
/// Records every call and can be switched into a failing mode to
/// exercise the best-effort contract.
#[derive(Debug, Default)]
pub struct RecordingIndex {
    events: Mutex<Vec<IndexEvent>>,
    failing: AtomicBool,
}

impl RecordingIndex {
    /// Creates a recording index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the observed calls.
    #[must_use]
    pub fn events(&self) -> Vec<IndexEvent> {
        self.events.lock().clone()
    }

    /// Makes every subsequent call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            Err("index unavailable".into())
        } else {
            Ok(())
        }
    }
}

impl SearchIndex for RecordingIndex {
    fn index(&self, uri: &ResourceUri, document: &serde_json::Value) -> Result<(), String> {
        self.check()?;
        self.events.lock().push(IndexEvent::Indexed {
            uri: uri.clone(),
            document: document.clone(),
        });
        Ok(())
    }

    fn delete(&self, uri: &ResourceUri) -> Result<(), String> {
        self.check()?;
        self.events
            .lock()
            .push(IndexEvent::Deleted { uri: uri.clone() });
        Ok(())
    }
}
