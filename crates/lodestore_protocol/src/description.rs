//! Resource descriptions and existence probe results.

use crate::uri::ResourceUri;
use crate::value::AttributeMap;
use serde::{Deserialize, Serialize};

/// Outcome of a three-way existence probe.
///
/// Probes never signal through errors; callers pattern-match on this
/// result instead of catching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Existence {
    /// The resource exists on the repository.
    Present,
    /// The resource existed and was deleted; a tombstone marker remains.
    Gone,
    /// The resource never existed, or was deleted without a marker.
    Absent,
}

impl Existence {
    /// Returns true if the resource is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Existence::Present)
    }

    /// Returns true if only the tombstone marker remains.
    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self, Existence::Gone)
    }
}

/// The state of a resource as described by a repository read.
///
/// Returned by fetches and writes; carries everything the engine needs
/// to refresh its local baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescription {
    /// The resource's identity.
    pub uri: ResourceUri,
    /// Attribute state as known to the repository.
    pub attributes: AttributeMap,
    /// Opaque version token assigned by the repository, if any.
    pub version_token: Option<String>,
}

impl ResourceDescription {
    /// Creates a description with no version token.
    pub fn new(uri: ResourceUri, attributes: AttributeMap) -> Self {
        Self {
            uri,
            attributes,
            version_token: None,
        }
    }

    /// Sets the version token.
    #[must_use]
    pub fn with_version_token(mut self, token: impl Into<String>) -> Self {
        self.version_token = Some(token.into());
        self
    }
}
