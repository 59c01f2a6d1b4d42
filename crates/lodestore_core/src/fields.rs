//! Static field-to-child delegation.
//!
//! Maps domain field names onto predicates of structured contained
//! resources through a declared table resolved at call time, so no
//! per-field accessors are generated anywhere.

use crate::error::{CoreError, CoreResult};
use crate::resource::Resource;
use lodestore_protocol::Value;

/// How many values a delegated field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one value.
    One,
    /// Any number of values.
    Many,
}

/// One entry of the field map.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    field: String,
    child: String,
    predicate: String,
    cardinality: Cardinality,
}

impl FieldSpec {
    /// The domain-facing field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The slug of the child the field delegates to.
    #[must_use]
    pub fn child(&self) -> &str {
        &self.child
    }

    /// The predicate on the child holding the values.
    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// The declared cardinality.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

/// A statically declared mapping from field names to contained-resource
/// predicates, with a generic accessor/mutator pair.
///
/// Declared once per type, like the child schema it rides on.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<FieldSpec>,
}

impl FieldMap {
    /// Creates an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a delegated field.
    ///
    /// Fails with `InvalidDeclaration` for an empty field name, an
    /// empty target, or a duplicate field name.
    pub fn declare(
        mut self,
        field: impl Into<String>,
        child: impl Into<String>,
        predicate: impl Into<String>,
        cardinality: Cardinality,
    ) -> CoreResult<Self> {
        let field = field.into();
        let child = child.into();
        let predicate = predicate.into();
        if field.is_empty() {
            return Err(CoreError::invalid_declaration(
                "field name must not be empty",
            ));
        }
        if child.is_empty() || predicate.is_empty() {
            return Err(CoreError::invalid_declaration(format!(
                "field {field:?} must name a child slug and a predicate"
            )));
        }
        if self.get(&field).is_some() {
            return Err(CoreError::invalid_declaration(format!(
                "duplicate field: {field:?}"
            )));
        }
        self.entries.push(FieldSpec {
            field,
            child,
            predicate,
            cardinality,
        });
        Ok(self)
    }

    /// Looks up a field declaration.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldSpec> {
        self.entries.iter().find(|spec| spec.field == field)
    }

    /// Iterates declarations in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = &FieldSpec> {
        self.entries.iter()
    }

    /// Reads the values of a delegated field.
    ///
    /// Returns an empty vector when the target child has not
    /// materialized yet.
    pub fn get_values(&self, resource: &Resource, field: &str) -> CoreResult<Vec<Value>> {
        let spec = self
            .get(field)
            .ok_or_else(|| CoreError::unknown_field(field.to_string()))?;
        let child = resource.children().get(&spec.child)?;
        Ok(child
            .and_then(|c| c.attributes())
            .map(|attrs| attrs.get(&spec.predicate).to_vec())
            .unwrap_or_default())
    }

    /// Writes the values of a delegated field, materializing the target
    /// child and marking it dirty.
    ///
    /// Fails with `InvalidArgument` when more than one value is given
    /// for a `Cardinality::One` field.
    pub fn set_values(
        &self,
        resource: &mut Resource,
        field: &str,
        values: Vec<Value>,
    ) -> CoreResult<()> {
        let spec = self
            .get(field)
            .ok_or_else(|| CoreError::unknown_field(field.to_string()))?;
        if spec.cardinality == Cardinality::One && values.len() > 1 {
            return Err(CoreError::invalid_argument(format!(
                "field {field:?} accepts at most one value, got {}",
                values.len()
            )));
        }
        let predicate = spec.predicate.clone();
        let child = spec.child.clone();
        resource
            .children_mut()?
            .update_attributes(&child, |attrs| attrs.set(predicate, values))
    }

    /// Writes a single value to a delegated field.
    pub fn set_one(
        &self,
        resource: &mut Resource,
        field: &str,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        self.set_values(resource, field, vec![value.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contained::{ChildKind, ChildSchema, CreationPolicy};
    use std::sync::Arc;

    fn schema() -> Arc<ChildSchema> {
        Arc::new(
            ChildSchema::new()
                .declare("descMetadata", CreationPolicy::Eager, ChildKind::Structured)
                .unwrap(),
        )
    }

    fn fields() -> FieldMap {
        FieldMap::new()
            .declare("title", "descMetadata", "dc:title", Cardinality::One)
            .unwrap()
            .declare("subjects", "descMetadata", "dc:subject", Cardinality::Many)
            .unwrap()
    }

    #[test]
    fn declaration_validation() {
        assert!(FieldMap::new()
            .declare("", "child", "p", Cardinality::One)
            .is_err());
        assert!(FieldMap::new()
            .declare("f", "", "p", Cardinality::One)
            .is_err());

        let result = FieldMap::new()
            .declare("f", "child", "p", Cardinality::One)
            .unwrap()
            .declare("f", "other", "q", Cardinality::Many);
        assert!(matches!(result, Err(CoreError::InvalidDeclaration { .. })));
    }

    #[test]
    fn set_and_get_roundtrip() {
        let map = fields();
        let mut resource = Resource::with_schema(schema());

        map.set_one(&mut resource, "title", "Annals").unwrap();
        assert_eq!(
            map.get_values(&resource, "title").unwrap(),
            vec![Value::from("Annals")]
        );

        // The target child is now dirty.
        let dirty: Vec<_> = resource
            .children()
            .changed()
            .map(|c| c.slug().to_string())
            .collect();
        assert_eq!(dirty, vec!["descMetadata"]);
    }

    #[test]
    fn unmaterialized_child_reads_empty() {
        let map = fields();
        let resource = Resource::with_schema(schema());
        assert!(map.get_values(&resource, "title").unwrap().is_empty());
    }

    #[test]
    fn unknown_field_fails() {
        let map = fields();
        let resource = Resource::with_schema(schema());
        assert!(matches!(
            map.get_values(&resource, "missing"),
            Err(CoreError::UnknownField { .. })
        ));
    }

    #[test]
    fn cardinality_one_rejects_multiple_values() {
        let map = fields();
        let mut resource = Resource::with_schema(schema());
        let result = map.set_values(
            &mut resource,
            "title",
            vec![Value::from("A"), Value::from("B")],
        );
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn cardinality_many_accepts_multiple_values() {
        let map = fields();
        let mut resource = Resource::with_schema(schema());
        map.set_values(
            &mut resource,
            "subjects",
            vec![Value::from("a"), Value::from("b")],
        )
        .unwrap();
        assert_eq!(map.get_values(&resource, "subjects").unwrap().len(), 2);
    }
}
