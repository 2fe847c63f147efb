//! Relationship descriptors.
//!
//! A descriptor captures everything about a relationship that does not depend
//! on which parents are being fetched: the primary and dependent entities, the
//! navigation hops between them and the projection shape. It is built once per
//! mapping configuration and reused for every batch.

use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use relmap_schema::{EntityModel, SchemaMetadata};

use super::plan::{EntityKey, Hop, PlanShape, Projection};
use crate::error::{FetchError, FetchResult};
use crate::view::{view_key, View};

/// A dotted navigation path such as `orders` or `orders.lines`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationPath {
    segments: Vec<SmolStr>,
}

impl NavigationPath {
    /// Parse a dotted path.
    pub fn parse(path: &str) -> Self {
        let segments = if path.trim().is_empty() {
            Vec::new()
        } else {
            path.split('.').map(|s| SmolStr::new(s.trim())).collect()
        };
        Self { segments }
    }

    /// Get the path segments.
    pub fn segments(&self) -> &[SmolStr] {
        &self.segments
    }

    /// Check if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for NavigationPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for NavigationPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Resolved description of a relationship from a primary to a dependent entity.
#[derive(Debug, Clone)]
pub struct RelationshipDescriptor {
    path: NavigationPath,
    dependent_model: EntityModel,
    shape: Arc<PlanShape>,
}

impl RelationshipDescriptor {
    /// Resolve `path` from `primary_entity` and check it ends at `dependent_entity`.
    ///
    /// Fails with a configuration error when either entity is unknown or lacks
    /// a single identifier, when a path segment is not a declared relation, or
    /// when the path ends somewhere other than the dependent entity.
    pub fn build<M>(
        metadata: &M,
        primary_entity: &str,
        path: impl Into<NavigationPath>,
        dependent_entity: &str,
    ) -> FetchResult<Self>
    where
        M: SchemaMetadata + ?Sized,
    {
        let path = path.into();
        let primary_model = metadata
            .entity(primary_entity)
            .ok_or_else(|| FetchError::unknown_entity(primary_entity))?;
        let primary = entity_key(primary_model)?;

        if path.is_empty() || path.segments().iter().any(SmolStr::is_empty) {
            return Err(FetchError::unsupported_shape(
                path.to_string(),
                "relation path must name at least one relation",
            )
            .with_entity(primary_entity));
        }

        let mut current = primary_model;
        let mut hops = Vec::with_capacity(path.segments().len());
        for segment in path.segments() {
            let relation = current
                .get_relation(segment)
                .ok_or_else(|| FetchError::unknown_relation(current.name(), segment.as_str()))?;
            let join = metadata
                .join_columns(current, relation)
                .map_err(|e| FetchError::from(e).with_relation(path.to_string()))?;
            let target = metadata
                .entity(&relation.target)
                .ok_or_else(|| FetchError::unknown_entity(relation.target.as_str()))?;

            hops.push(Hop {
                relation: segment.clone(),
                target_entity: target.name.clone(),
                target_table: target.table.clone(),
                local_column: join.local,
                remote_column: join.remote,
                through: join.through,
                to_many: relation.is_many(),
            });
            current = target;
        }

        if current.name() != dependent_entity {
            return Err(FetchError::unsupported_shape(
                path.to_string(),
                format!(
                    "path resolves to `{}`, expected `{}` or a sequence of it",
                    current.name(),
                    dependent_entity
                ),
            )
            .with_entity(primary_entity));
        }
        let dependent = entity_key(current)?;

        let projection = if hops.iter().any(|h| h.to_many) {
            Projection::Flatten
        } else {
            Projection::Single
        };

        debug!(
            primary = %primary.entity,
            path = %path,
            dependent = %dependent.entity,
            hops = hops.len(),
            projection = ?projection,
            "Built relationship descriptor"
        );

        Ok(Self {
            path,
            dependent_model: current.clone(),
            shape: Arc::new(PlanShape {
                primary,
                dependent,
                hops,
                projection,
            }),
        })
    }

    /// Build a descriptor whose dependent entity is the source of view `V`.
    ///
    /// Also checks that `V` is keyed by the dependent entity's identifier.
    pub fn for_view<V, M>(
        metadata: &M,
        primary_entity: &str,
        path: impl Into<NavigationPath>,
    ) -> FetchResult<Self>
    where
        V: View,
        M: SchemaMetadata + ?Sized,
    {
        view_key::<V>()?;
        let descriptor = Self::build(metadata, primary_entity, path, V::SOURCE_ENTITY)?;
        descriptor.ensure_view::<V>()?;
        Ok(descriptor)
    }

    /// Check that view `V` can hold this relationship's dependents.
    ///
    /// `V` must be projected from the dependent entity and keyed by its
    /// identifier field, otherwise correlation pairs would never match.
    pub(crate) fn ensure_view<V: View>(&self) -> FetchResult<()> {
        let key = view_key::<V>()?;
        if self.dependent_entity() != V::SOURCE_ENTITY {
            return Err(FetchError::unsupported_shape(
                self.path.to_string(),
                format!(
                    "relationship yields `{}` but `{}` is projected from `{}`",
                    self.dependent_entity(),
                    std::any::type_name::<V>(),
                    V::SOURCE_ENTITY
                ),
            )
            .with_entity(self.primary_entity()));
        }
        if key != self.dependent_key_field() {
            return Err(FetchError::unsupported_shape(
                self.path.to_string(),
                format!(
                    "`{}` is keyed by `{}` but `{}` is identified by `{}`",
                    std::any::type_name::<V>(),
                    key,
                    self.dependent_entity(),
                    self.dependent_key_field()
                ),
            )
            .with_entity(self.primary_entity()));
        }
        Ok(())
    }

    /// Get the primary entity name.
    pub fn primary_entity(&self) -> &str {
        &self.shape.primary.entity
    }

    /// Get the dependent entity name.
    pub fn dependent_entity(&self) -> &str {
        &self.shape.dependent.entity
    }

    /// Get the identifier field of the primary entity.
    pub fn primary_key_field(&self) -> &str {
        &self.shape.primary.key_field
    }

    /// Get the identifier field of the dependent entity.
    pub fn dependent_key_field(&self) -> &str {
        &self.shape.dependent.key_field
    }

    /// Get the dependent entity model.
    pub fn dependent_model(&self) -> &EntityModel {
        &self.dependent_model
    }

    /// Get the navigation path.
    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    /// Check if the relationship yields a sequence per parent.
    pub fn is_to_many(&self) -> bool {
        self.shape.projection.is_flatten()
    }

    /// Get the resolved navigation hops.
    pub fn hops(&self) -> &[Hop] {
        &self.shape.hops
    }

    /// Get the shared plan shape.
    pub fn shape(&self) -> &Arc<PlanShape> {
        &self.shape
    }
}

impl fmt::Display for RelationshipDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.primary_entity(), self.path)
    }
}

fn entity_key(model: &EntityModel) -> FetchResult<EntityKey> {
    let ids = model.id_fields();
    match ids.as_slice() {
        [id] => Ok(EntityKey {
            entity: model.name.clone(),
            table: model.table.clone(),
            key_field: id.name.clone(),
            key_column: SmolStr::new(id.column()),
        }),
        [] => Err(FetchError::missing_identifier(model.name())),
        many => Err(FetchError::composite_identifier(model.name(), many.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::{shop_schema, OrderView, TagView};
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use relmap_schema::{FieldDef, RelationDef, Schema};

    #[test]
    fn test_path_parse() {
        let path = NavigationPath::parse("orders.lines");
        assert_eq!(path.segments(), &["orders", "lines"]);
        assert_eq!(path.to_string(), "orders.lines");
        assert!(NavigationPath::parse("  ").is_empty());
    }

    #[test]
    fn test_build_one_to_many() {
        let schema = shop_schema();
        let descriptor = RelationshipDescriptor::for_view::<OrderView, _>(&schema, "Customer", "orders").unwrap();

        assert_eq!(descriptor.primary_entity(), "Customer");
        assert_eq!(descriptor.dependent_entity(), "Order");
        assert_eq!(descriptor.primary_key_field(), "id");
        assert!(descriptor.is_to_many());
        assert_eq!(descriptor.hops().len(), 1);
        assert_eq!(descriptor.hops()[0].remote_column, "customer_id");
        assert_eq!(descriptor.to_string(), "Customer.orders");
    }

    #[test]
    fn test_build_many_to_one_is_single() {
        let schema = shop_schema();
        let descriptor = RelationshipDescriptor::build(&schema, "Order", "customer", "Customer").unwrap();

        assert!(!descriptor.is_to_many());
        assert_eq!(descriptor.shape().projection, Projection::Single);
    }

    #[test]
    fn test_build_multi_hop_flattens() {
        let schema = shop_schema();
        let descriptor = RelationshipDescriptor::for_view::<TagView, _>(&schema, "Customer", "orders.tags").unwrap();

        assert!(descriptor.is_to_many());
        assert_eq!(descriptor.hops().len(), 2);
        assert!(descriptor.hops()[1].through.is_some());
    }

    #[test]
    fn test_unknown_entity() {
        let schema = shop_schema();
        let err = RelationshipDescriptor::build(&schema, "Invoice", "lines", "Order").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownEntity);
    }

    #[test]
    fn test_unknown_relation() {
        let schema = shop_schema();
        let err = RelationshipDescriptor::build(&schema, "Customer", "ordrs", "Order").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownRelation);
        assert_eq!(err.context.relation.as_deref(), Some("ordrs"));
    }

    #[test]
    fn test_wrong_dependent() {
        let schema = shop_schema();
        let err = RelationshipDescriptor::build(&schema, "Customer", "orders", "Tag").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedRelationShape);
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_path() {
        let schema = shop_schema();
        let err = RelationshipDescriptor::build(&schema, "Customer", "", "Customer").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedRelationShape);

        let err = RelationshipDescriptor::build(&schema, "Customer", "orders..tags", "Tag").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedRelationShape);
    }

    #[test]
    fn test_dependent_without_identifier() {
        let schema = Schema::new()
            .with_entity(
                EntityModel::new("Customer")
                    .field(FieldDef::id("id"))
                    .relation(RelationDef::one_to_many("notes", "Note").references(["customer_id"])),
            )
            .with_entity(EntityModel::new("Note").field(FieldDef::new("customer_id")));

        let err = RelationshipDescriptor::build(&schema, "Customer", "notes", "Note").unwrap_err();
        assert!(err.is_configuration());
    }

    struct OrderByCustomer;

    impl View for OrderByCustomer {
        const SOURCE_ENTITY: &'static str = "Order";
        const PRIMARY_KEY: &'static [&'static str] = &["customer_id"];

        fn primary_key_value(&self) -> Value {
            Value::Null
        }
    }

    #[test]
    fn test_view_keyed_by_foreign_field() {
        let schema = shop_schema();
        let err = RelationshipDescriptor::for_view::<OrderByCustomer, _>(&schema, "Customer", "orders")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedRelationShape);
        assert!(err.is_configuration());
        assert!(err.to_string().contains("customer_id"));

        let descriptor = RelationshipDescriptor::build(&schema, "Customer", "orders", "Order").unwrap();
        assert!(descriptor.ensure_view::<OrderView>().is_ok());
        assert!(descriptor.ensure_view::<OrderByCustomer>().is_err());
    }

    #[test]
    fn test_composite_primary_rejected() {
        let schema = Schema::new()
            .with_entity(
                EntityModel::new("OrderLine")
                    .field(FieldDef::id("order_id"))
                    .field(FieldDef::id("line_no")),
            );

        let err = RelationshipDescriptor::build(&schema, "OrderLine", "product", "Product").unwrap_err();
        assert_eq!(err.code, ErrorCode::CompositeIdentifier);
    }
}
