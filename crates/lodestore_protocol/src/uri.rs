//! Resource identifiers.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved path segment under which the repository retains a deletion
/// marker for a removed resource.
pub const TOMBSTONE_SEGMENT: &str = "fcr:tombstone";

/// Identifier of an addressable repository resource.
///
/// Resource URIs are:
/// - Immutable once assigned to a resource
/// - Hierarchical; a contained child lives at `parent/slug`
/// - Never terminated by a slash
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceUri(String);

impl ResourceUri {
    /// Parses and validates a resource URI.
    ///
    /// The URI must be non-empty, free of whitespace, and must not end
    /// with a slash.
    pub fn parse(uri: impl Into<String>) -> ProtocolResult<Self> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(ProtocolError::invalid_uri("URI must not be empty"));
        }
        if uri.chars().any(char::is_whitespace) {
            return Err(ProtocolError::invalid_uri(format!(
                "URI must not contain whitespace: {uri:?}"
            )));
        }
        if uri.ends_with('/') {
            return Err(ProtocolError::invalid_uri(format!(
                "URI must not end with a slash: {uri:?}"
            )));
        }
        Ok(Self(uri))
    }

    /// Returns the URI as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the identity of a contained child resource.
    ///
    /// The child identity is always `self + "/" + slug`; it cannot be
    /// chosen independently of the parent.
    pub fn child(&self, slug: &str) -> ProtocolResult<Self> {
        validate_slug(slug)?;
        Ok(Self(format!("{}/{}", self.0, slug)))
    }

    /// Returns the reserved tombstone path for this resource.
    #[must_use]
    pub fn tombstone(&self) -> Self {
        Self(format!("{}/{}", self.0, TOMBSTONE_SEGMENT))
    }

    /// Returns true if this URI addresses a tombstone marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.0
            .rsplit('/')
            .next()
            .is_some_and(|segment| segment == TOMBSTONE_SEGMENT)
    }

    /// Returns the URI the tombstone marker stands for, if this is a
    /// tombstone path.
    #[must_use]
    pub fn tombstone_subject(&self) -> Option<Self> {
        self.0
            .strip_suffix(TOMBSTONE_SEGMENT)
            .and_then(|prefix| prefix.strip_suffix('/'))
            .filter(|prefix| !prefix.is_empty())
            .map(|prefix| Self(prefix.to_string()))
    }

    /// Returns true if `other` is contained under this URI.
    #[must_use]
    pub fn contains(&self, other: &ResourceUri) -> bool {
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Validates a child slug: non-empty, no slashes, no whitespace.
fn validate_slug(slug: &str) -> ProtocolResult<()> {
    if slug.is_empty() {
        return Err(ProtocolError::invalid_slug("slug must not be empty"));
    }
    if slug.contains('/') {
        return Err(ProtocolError::invalid_slug(format!(
            "slug must not contain a slash: {slug:?}"
        )));
    }
    if slug.chars().any(char::is_whitespace) {
        return Err(ProtocolError::invalid_slug(format!(
            "slug must not contain whitespace: {slug:?}"
        )));
    }
    Ok(())
}

impl fmt::Debug for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceUri({})", self.0)
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceUri {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ResourceUri> for String {
    fn from(uri: ResourceUri) -> Self {
        uri.0
    }
}

impl AsRef<str> for ResourceUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
