//! The domain object's persistence-facing state.

use crate::contained::{ChildSchema, ContainedResources};
use crate::error::{CoreError, CoreResult};
use lodestore_protocol::{AttributeMap, ResourceDescription, ResourceUri, Value};
use std::sync::Arc;

/// Lifecycle state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not yet created on the repository; identity unset or unconfirmed.
    New,
    /// Created on the repository; identity assigned and confirmed.
    Persisted,
    /// Deleted. Terminal: the resource accepts no further mutation.
    Destroyed,
}

/// An addressable domain object mapped 1:1 to a remote repository
/// entity.
///
/// A resource tracks three things the repository cannot see: which
/// predicates were assigned since the last confirmed round-trip
/// (`modified`), the last attribute state known to match the remote side
/// (`baseline`, used solely for diffing), and its owned contained
/// resources. The baseline is only ever replaced after a confirmed
/// successful remote read or write, never by local assignment.
#[derive(Debug, Clone)]
pub struct Resource {
    identity: Option<ResourceUri>,
    lifecycle: Lifecycle,
    attributes: AttributeMap,
    baseline: AttributeMap,
    modified: Vec<String>,
    read_only: bool,
    version_token: Option<String>,
    children: ContainedResources,
}

impl Resource {
    /// Creates a new, not-yet-persisted resource with no declared
    /// children.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(Arc::new(ChildSchema::new()))
    }

    /// Creates a new resource over a shared child schema.
    #[must_use]
    pub fn with_schema(schema: Arc<ChildSchema>) -> Self {
        Self {
            identity: None,
            lifecycle: Lifecycle::New,
            attributes: AttributeMap::new(),
            baseline: AttributeMap::new(),
            modified: Vec::new(),
            read_only: false,
            version_token: None,
            children: ContainedResources::new(schema),
        }
    }

    /// The resource's identity, if assigned.
    #[must_use]
    pub fn identity(&self) -> Option<&ResourceUri> {
        self.identity.as_ref()
    }

    /// Assigns the identity. Identities are immutable once assigned.
    pub fn assign_identity(&mut self, uri: ResourceUri) -> CoreResult<()> {
        self.ensure_mutable()?;
        if let Some(existing) = &self.identity {
            return Err(CoreError::IdentityAssigned {
                uri: existing.clone(),
            });
        }
        self.identity = Some(uri);
        Ok(())
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns true if the resource has not been created remotely.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.lifecycle == Lifecycle::New
    }

    /// Returns true if the resource exists remotely.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.lifecycle == Lifecycle::Persisted
    }

    /// Returns true if the resource has been deleted.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.lifecycle == Lifecycle::Destroyed
    }

    /// Marks the resource read-only. Irreversible for this instance.
    pub fn mark_read_only(&mut self) {
        self.read_only = true;
    }

    /// Returns true if the resource is marked read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The current attribute state.
    #[must_use]
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// The last attribute state known to match the remote repository.
    #[must_use]
    pub fn baseline(&self) -> &AttributeMap {
        &self.baseline
    }

    /// Predicates assigned since the last baseline refresh, in
    /// first-touch order.
    #[must_use]
    pub fn modified_keys(&self) -> &[String] {
        &self.modified
    }

    /// The opaque version token from the last confirmed round-trip.
    #[must_use]
    pub fn version_token(&self) -> Option<&str> {
        self.version_token.as_deref()
    }

    /// All values for a predicate (empty when unset).
    #[must_use]
    pub fn get(&self, predicate: &str) -> &[Value] {
        self.attributes.get(predicate)
    }

    /// The first value for a predicate.
    #[must_use]
    pub fn first(&self, predicate: &str) -> Option<&Value> {
        self.attributes.first(predicate)
    }

    /// Replaces all values for a predicate and flags it modified.
    pub fn set(&mut self, predicate: impl Into<String>, values: Vec<Value>) -> CoreResult<()> {
        self.ensure_mutable()?;
        let predicate = predicate.into();
        self.touch(&predicate);
        self.attributes.set(predicate, values);
        Ok(())
    }

    /// Replaces a predicate with a single value and flags it modified.
    pub fn set_one(
        &mut self,
        predicate: impl Into<String>,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        self.set(predicate, vec![value.into()])
    }

    /// Appends a value to a predicate and flags it modified.
    pub fn push(
        &mut self,
        predicate: impl Into<String>,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        self.ensure_mutable()?;
        let predicate = predicate.into();
        self.touch(&predicate);
        self.attributes.push(predicate, value);
        Ok(())
    }

    /// Removes a predicate entirely and flags it modified.
    pub fn clear(&mut self, predicate: &str) -> CoreResult<()> {
        self.ensure_mutable()?;
        self.touch(predicate);
        self.attributes.remove(predicate);
        Ok(())
    }

    /// The contained-resource registry.
    #[must_use]
    pub fn children(&self) -> &ContainedResources {
        &self.children
    }

    /// Mutable access to the contained-resource registry.
    ///
    /// Fails when the resource is read-only or destroyed, like any
    /// other mutation.
    pub fn children_mut(&mut self) -> CoreResult<&mut ContainedResources> {
        self.ensure_mutable()?;
        Ok(&mut self.children)
    }

    /// Fails unless the resource accepts mutation.
    pub(crate) fn ensure_mutable(&self) -> CoreResult<()> {
        if self.lifecycle == Lifecycle::Destroyed {
            return Err(CoreError::read_only(format!(
                "resource is destroyed: {}",
                self.display_identity()
            )));
        }
        if self.read_only {
            return Err(CoreError::read_only(format!(
                "resource is marked read-only: {}",
                self.display_identity()
            )));
        }
        Ok(())
    }

    /// Replaces the baseline from a confirmed remote description and
    /// resets modification tracking.
    pub(crate) fn absorb(&mut self, description: &ResourceDescription) {
        self.attributes = description.attributes.clone();
        self.baseline = description.attributes.clone();
        self.modified.clear();
        self.version_token = description.version_token.clone();
        self.lifecycle = Lifecycle::Persisted;
    }

    /// Transitions to `Destroyed`. Terminal.
    pub(crate) fn mark_destroyed(&mut self) {
        self.lifecycle = Lifecycle::Destroyed;
    }

    /// Registry access for the coordinator, bypassing the mutability
    /// guard (used only to mark children clean after confirmed writes).
    pub(crate) fn children_unguarded(&mut self) -> &mut ContainedResources {
        &mut self.children
    }

    fn touch(&mut self, predicate: &str) {
        if !self.modified.iter().any(|k| k == predicate) {
            self.modified.push(predicate.to_string());
        }
    }

    fn display_identity(&self) -> String {
        self.identity
            .as_ref()
            .map_or_else(|| "<new>".to_string(), ToString::to_string)
    }
}

impl Default for Resource {
    fn default() -> Self {
        Self::new()
    }
}
