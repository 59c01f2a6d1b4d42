//! Tombstone probing and eradication.

use crate::error::CoreResult;
use lodestore_protocol::{Existence, ResourceUri};
use lodestore_repository::Repository;
use std::sync::Arc;
use tracing::debug;

/// Distinguishes "never existed" from "deleted, marker remains" and
/// purges retained markers on request.
///
/// The repository keeps a deletion marker at a reserved child path of
/// the original URI; while it remains, the identity cannot be reused.
pub struct TombstoneManager {
    repository: Arc<dyn Repository>,
}

impl TombstoneManager {
    /// Creates a manager over a repository client.
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Probes the existence of a resource.
    ///
    /// Three-way outcome, never an error for absence: `Present`, `Gone`
    /// (deleted with the marker retained), or `Absent` (never existed,
    /// or deleted without a marker).
    pub fn exists(&self, uri: &ResourceUri) -> CoreResult<Existence> {
        Ok(self.repository.probe(uri)?)
    }

    /// Returns true if only the tombstone marker remains for the URI.
    pub fn gone(&self, uri: &ResourceUri) -> CoreResult<bool> {
        Ok(self.exists(uri)?.is_gone())
    }

    /// Purges the tombstone marker for a deleted resource, permitting
    /// the identity to be reused.
    ///
    /// Returns `Ok(false)` without issuing a delete when the probe does
    /// not report `Gone`; purging a marker that is not there is a
    /// deliberate no-op, not an error. This operation sits outside
    /// normal protocol guarantees: it re-opens a URI the repository
    /// would otherwise permanently refuse to reuse.
    pub fn eradicate(&self, uri: &ResourceUri) -> CoreResult<bool> {
        if self.exists(uri)? != Existence::Gone {
            return Ok(false);
        }
        self.repository.delete(&uri.tombstone())?;
        debug!(uri = %uri, "tombstone eradicated");
        Ok(true)
    }
}

impl std::fmt::Debug for TombstoneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TombstoneManager").finish_non_exhaustive()
    }
}
