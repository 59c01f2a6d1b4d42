//! Contained resources: declarations, materialization, dirty tracking.
//!
//! A contained resource is a child exclusively owned by one parent for
//! its entire lifetime. Its identity is always derived from the parent
//! (`parent/slug`) and only materializes once the parent's identity is
//! known. Declarations form a per-type schema, built once and shared;
//! the per-instance registry tracks materialized children and their
//! dirty state independently of the parent's own diff.

use crate::error::{CoreError, CoreResult};
use lodestore_protocol::{AttributeMap, ResourceUri};
use std::sync::Arc;

/// When a declared child is created on the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPolicy {
    /// Created automatically when the parent is created, even if empty.
    Eager,
    /// Created only once content has been assigned.
    Lazy,
}

/// The class hint of a declared child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// A nested structured sub-resource (attribute map content).
    Structured,
    /// An attached binary file.
    Binary,
}

/// A single child declaration.
#[derive(Debug, Clone)]
pub struct ChildSpec {
    slug: String,
    policy: CreationPolicy,
    kind: ChildKind,
}

impl ChildSpec {
    /// The child's local name, unique within the parent's registry.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// The declared creation policy.
    #[must_use]
    pub fn policy(&self) -> CreationPolicy {
        self.policy
    }

    /// The declared class hint.
    #[must_use]
    pub fn kind(&self) -> ChildKind {
        self.kind
    }
}

/// The static child schema of a resource type.
///
/// Built once per type and shared across instances; declaration
/// parameters are validated here, at declaration time, never at save
/// time. Declaration order is preserved and drives the create cascade.
#[derive(Debug, Clone, Default)]
pub struct ChildSchema {
    specs: Vec<ChildSpec>,
}

impl ChildSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a child.
    ///
    /// Fails with `InvalidDeclaration` for an empty slug, a slug
    /// containing a slash or whitespace, or a duplicate slug.
    pub fn declare(
        mut self,
        slug: impl Into<String>,
        policy: CreationPolicy,
        kind: ChildKind,
    ) -> CoreResult<Self> {
        let slug = slug.into();
        validate_declared_slug(&slug)?;
        if self.get(&slug).is_some() {
            return Err(CoreError::invalid_declaration(format!(
                "duplicate child slug: {slug:?}"
            )));
        }
        self.specs.push(ChildSpec { slug, policy, kind });
        Ok(self)
    }

    /// Looks up a declaration by slug.
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&ChildSpec> {
        self.specs.iter().find(|spec| spec.slug == slug)
    }

    /// Iterates declarations in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = &ChildSpec> {
        self.specs.iter()
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn validate_declared_slug(slug: &str) -> CoreResult<()> {
    if slug.is_empty() {
        return Err(CoreError::invalid_declaration(
            "child slug must not be empty",
        ));
    }
    if slug.contains('/') || slug.chars().any(char::is_whitespace) {
        return Err(CoreError::invalid_declaration(format!(
            "child slug must not contain slashes or whitespace: {slug:?}"
        )));
    }
    Ok(())
}

/// Content of a contained resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildContent {
    /// No content assigned yet (eager children start here).
    Empty,
    /// Structured content.
    Attributes(AttributeMap),
    /// Binary content.
    Binary {
        /// Media type of the content.
        content_type: String,
        /// Raw bytes.
        content: Vec<u8>,
    },
}

impl ChildContent {
    fn kind_hint(&self) -> ChildKind {
        match self {
            ChildContent::Binary { .. } => ChildKind::Binary,
            _ => ChildKind::Structured,
        }
    }
}

/// A materialized contained resource.
#[derive(Debug, Clone)]
pub struct ContainedResource {
    slug: String,
    policy: CreationPolicy,
    kind: ChildKind,
    identity: Option<ResourceUri>,
    content: ChildContent,
    dirty: bool,
    ad_hoc: bool,
}

impl ContainedResource {
    /// The child's local name.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// The creation policy in effect.
    #[must_use]
    pub fn policy(&self) -> CreationPolicy {
        self.policy
    }

    /// The class hint in effect.
    #[must_use]
    pub fn kind(&self) -> ChildKind {
        self.kind
    }

    /// The derived identity, once the parent's identity is known.
    #[must_use]
    pub fn identity(&self) -> Option<&ResourceUri> {
        self.identity.as_ref()
    }

    /// The current content.
    #[must_use]
    pub fn content(&self) -> &ChildContent {
        &self.content
    }

    /// Structured content, if any.
    #[must_use]
    pub fn attributes(&self) -> Option<&AttributeMap> {
        match &self.content {
            ChildContent::Attributes(map) => Some(map),
            _ => None,
        }
    }

    /// Returns true if the child has unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns true if this child was attached without a declaration.
    #[must_use]
    pub fn is_ad_hoc(&self) -> bool {
        self.ad_hoc
    }
}

/// The per-instance registry of contained resources.
///
/// Children materialize lazily: eager-policy declarations are always
/// present after [`materialize`](Self::materialize) even if empty,
/// lazy-policy declarations appear only once content is assigned, and
/// an undeclared slug may be attached ad hoc, creating a single-use
/// anonymous declaration scoped to this instance.
#[derive(Debug, Clone, Default)]
pub struct ContainedResources {
    schema: Arc<ChildSchema>,
    children: Vec<ContainedResource>,
}

impl ContainedResources {
    /// Creates a registry over a shared schema.
    #[must_use]
    pub fn new(schema: Arc<ChildSchema>) -> Self {
        Self {
            schema,
            children: Vec::new(),
        }
    }

    /// The schema this registry resolves declarations against.
    #[must_use]
    pub fn schema(&self) -> &ChildSchema {
        &self.schema
    }

    /// Iterates declared slugs in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.schema.declared().map(ChildSpec::slug)
    }

    /// Ensures every eager-policy declaration has a materialized child.
    pub fn materialize(&mut self) {
        let missing: Vec<ChildSpec> = self
            .schema
            .declared()
            .filter(|spec| {
                spec.policy() == CreationPolicy::Eager && self.find(spec.slug()).is_none()
            })
            .cloned()
            .collect();
        for spec in missing {
            self.children.push(ContainedResource {
                slug: spec.slug().to_string(),
                policy: spec.policy(),
                kind: spec.kind(),
                identity: None,
                content: ChildContent::Empty,
                dirty: false,
                ad_hoc: false,
            });
        }
    }

    /// Assigns content to a child, materializing it if needed and
    /// marking it dirty.
    ///
    /// A declared slug resolves through the schema. An undeclared slug
    /// is permitted and creates an anonymous lazy declaration scoped to
    /// this instance, with the kind inferred from the content.
    pub fn attach(&mut self, slug: &str, content: ChildContent) -> CoreResult<()> {
        if let Some(child) = self.find_mut(slug) {
            child.content = content;
            child.dirty = true;
            return Ok(());
        }
        let (policy, kind, ad_hoc) = match self.schema.get(slug) {
            Some(spec) => (spec.policy(), spec.kind(), false),
            None => {
                validate_declared_slug(slug).map_err(|_| {
                    CoreError::invalid_argument(format!("invalid ad-hoc child slug: {slug:?}"))
                })?;
                (CreationPolicy::Lazy, content.kind_hint(), true)
            }
        };
        self.children.push(ContainedResource {
            slug: slug.to_string(),
            policy,
            kind,
            identity: None,
            content,
            dirty: true,
            ad_hoc,
        });
        Ok(())
    }

    /// Looks up a child by slug.
    ///
    /// Returns `Ok(None)` for a declared child that has not
    /// materialized yet; fails with `UnknownChild` for a slug that is
    /// neither declared nor attached ad hoc.
    pub fn get(&self, slug: &str) -> CoreResult<Option<&ContainedResource>> {
        if let Some(child) = self.find(slug) {
            return Ok(Some(child));
        }
        if self.schema.get(slug).is_some() {
            return Ok(None);
        }
        Err(CoreError::unknown_child(slug.to_string()))
    }

    /// Applies an edit to a structured child's attributes, materializing
    /// the child if needed and marking it dirty.
    pub fn update_attributes(
        &mut self,
        slug: &str,
        edit: impl FnOnce(&mut AttributeMap),
    ) -> CoreResult<()> {
        let mut map = match self.find(slug) {
            Some(child) => match &child.content {
                ChildContent::Attributes(map) => map.clone(),
                ChildContent::Empty => AttributeMap::new(),
                ChildContent::Binary { .. } => {
                    return Err(CoreError::invalid_argument(format!(
                        "child {slug:?} holds binary content"
                    )))
                }
            },
            None => AttributeMap::new(),
        };
        edit(&mut map);
        self.attach(slug, ChildContent::Attributes(map))
    }

    /// Iterates materialized children: declared children in declaration
    /// order, then ad-hoc children in attachment order.
    pub fn iter(&self) -> impl Iterator<Item = &ContainedResource> {
        let declared = self
            .schema
            .declared()
            .filter_map(|spec| self.find(spec.slug()));
        let ad_hoc = self.children.iter().filter(|c| c.ad_hoc);
        declared.chain(ad_hoc)
    }

    /// Iterates the subset of children flagged dirty, in cascade order.
    pub fn changed(&self) -> impl Iterator<Item = &ContainedResource> {
        self.iter().filter(|c| c.dirty)
    }

    /// Returns the number of materialized children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true if no child has materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Derives identities for all materialized children from the
    /// parent's identity. Identities already derived stay untouched.
    pub(crate) fn assign_identities(&mut self, parent: &ResourceUri) -> CoreResult<()> {
        for child in &mut self.children {
            if child.identity.is_none() {
                child.identity = Some(parent.child(&child.slug)?);
            }
        }
        Ok(())
    }

    /// Marks every child clean.
    pub(crate) fn mark_all_clean(&mut self) {
        for child in &mut self.children {
            child.dirty = false;
        }
    }

    /// Marks one child clean.
    pub(crate) fn mark_clean(&mut self, slug: &str) {
        if let Some(child) = self.find_mut(slug) {
            child.dirty = false;
        }
    }

    fn find(&self, slug: &str) -> Option<&ContainedResource> {
        self.children.iter().find(|c| c.slug == slug)
    }

    fn find_mut(&mut self, slug: &str) -> Option<&mut ContainedResource> {
        self.children.iter_mut().find(|c| c.slug == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestore_protocol::Value;

    fn schema() -> Arc<ChildSchema> {
        Arc::new(
            ChildSchema::new()
                .declare("descMetadata", CreationPolicy::Eager, ChildKind::Structured)
                .unwrap()
                .declare("thumbnail", CreationPolicy::Lazy, ChildKind::Binary)
                .unwrap(),
        )
    }

    #[test]
    fn declaration_validation() {
        assert!(ChildSchema::new()
            .declare("", CreationPolicy::Eager, ChildKind::Structured)
            .is_err());
        assert!(ChildSchema::new()
            .declare("a/b", CreationPolicy::Eager, ChildKind::Structured)
            .is_err());

        let result = ChildSchema::new()
            .declare("meta", CreationPolicy::Eager, ChildKind::Structured)
            .unwrap()
            .declare("meta", CreationPolicy::Lazy, ChildKind::Binary);
        assert!(matches!(result, Err(CoreError::InvalidDeclaration { .. })));
    }

    #[test]
    fn materialize_creates_only_eager_children() {
        let mut registry = ContainedResources::new(schema());
        registry.materialize();

        assert_eq!(registry.len(), 1);
        let child = registry.get("descMetadata").unwrap().unwrap();
        assert_eq!(child.content(), &ChildContent::Empty);
        assert!(!child.is_dirty());

        // Lazy child is declared but not materialized.
        assert!(registry.get("thumbnail").unwrap().is_none());
    }

    #[test]
    fn attach_materializes_lazy_child_dirty() {
        let mut registry = ContainedResources::new(schema());
        registry
            .attach(
                "thumbnail",
                ChildContent::Binary {
                    content_type: "image/png".into(),
                    content: vec![1, 2, 3],
                },
            )
            .unwrap();

        let child = registry.get("thumbnail").unwrap().unwrap();
        assert!(child.is_dirty());
        assert_eq!(child.kind(), ChildKind::Binary);
        assert!(!child.is_ad_hoc());
    }

    #[test]
    fn ad_hoc_attachment_is_scoped_to_instance() {
        let mut registry = ContainedResources::new(schema());
        registry
            .attach("notes", ChildContent::Attributes(AttributeMap::new()))
            .unwrap();

        let child = registry.get("notes").unwrap().unwrap();
        assert!(child.is_ad_hoc());
        assert_eq!(child.policy(), CreationPolicy::Lazy);

        // A fresh registry over the same schema knows nothing about it.
        let other = ContainedResources::new(schema());
        assert!(matches!(
            other.get("notes"),
            Err(CoreError::UnknownChild { .. })
        ));
    }

    #[test]
    fn unknown_slug_fails() {
        let registry = ContainedResources::new(schema());
        assert!(matches!(
            registry.get("missing"),
            Err(CoreError::UnknownChild { .. })
        ));
    }

    #[test]
    fn identity_derivation_waits_for_parent() {
        let mut registry = ContainedResources::new(schema());
        registry.materialize();
        assert!(registry
            .get("descMetadata")
            .unwrap()
            .unwrap()
            .identity()
            .is_none());

        let parent = ResourceUri::parse("http://repo/objects/1").unwrap();
        registry.assign_identities(&parent).unwrap();
        assert_eq!(
            registry
                .get("descMetadata")
                .unwrap()
                .unwrap()
                .identity()
                .unwrap()
                .as_str(),
            "http://repo/objects/1/descMetadata"
        );
    }

    #[test]
    fn changed_tracks_dirty_subset() {
        let mut registry = ContainedResources::new(schema());
        registry.materialize();
        assert_eq!(registry.changed().count(), 0);

        registry
            .update_attributes("descMetadata", |map| map.set_one("title", "A"))
            .unwrap();
        let dirty: Vec<_> = registry.changed().map(|c| c.slug().to_string()).collect();
        assert_eq!(dirty, vec!["descMetadata"]);

        registry.mark_all_clean();
        assert_eq!(registry.changed().count(), 0);
    }

    #[test]
    fn update_attributes_preserves_existing_values() {
        let mut registry = ContainedResources::new(schema());
        registry
            .update_attributes("descMetadata", |map| map.set_one("title", "A"))
            .unwrap();
        registry
            .update_attributes("descMetadata", |map| map.set_one("creator", "B"))
            .unwrap();

        let child = registry.get("descMetadata").unwrap().unwrap();
        let attrs = child.attributes().unwrap();
        assert_eq!(attrs.first("title"), Some(&Value::from("A")));
        assert_eq!(attrs.first("creator"), Some(&Value::from("B")));
    }
}
