//! Entity registry and the metadata accessor used by descriptor builders.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::model::EntityModel;
use crate::relation::{JoinTableSpec, RelationDef, RelationKind};

/// Read access to store metadata.
///
/// Descriptor builders only ever need to look entities up by name, so any
/// registry (generated code, a live catalog, a parsed `relmap.toml`) can back
/// the fetcher by implementing this trait.
pub trait SchemaMetadata: Send + Sync {
    /// Look up an entity by name.
    fn entity(&self, name: &str) -> Option<&EntityModel>;

    /// Resolve the singular join columns of a relation declared on `owner`.
    fn join_columns(&self, owner: &EntityModel, relation: &RelationDef) -> SchemaResult<JoinColumns> {
        let target = self.entity(&relation.target).ok_or_else(|| SchemaError::UnknownTarget {
            entity: owner.name.to_string(),
            relation: relation.name.to_string(),
            target: relation.target.to_string(),
        })?;
        resolve_join(owner, relation, target)
    }
}

/// Columns joining an owner row to the rows of a relation's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumns {
    /// Column on the owning entity.
    pub local: SmolStr,
    /// Column on the target entity.
    pub remote: SmolStr,
    /// Join table linking the two, for many-to-many relations.
    pub through: Option<JoinTableSpec>,
}

fn single_key(
    owner: &EntityModel,
    relation: &RelationDef,
    model: &EntityModel,
    declared: &[SmolStr],
    side: &str,
) -> SchemaResult<SmolStr> {
    match declared {
        [field] => Ok(SmolStr::new(model.column_of(field))),
        [] => model
            .single_id_field()
            .map(|f| SmolStr::new(f.column()))
            .ok_or_else(|| {
                SchemaError::invalid_relation(
                    owner.name(),
                    relation.name(),
                    format!("{} `{}` has no single identifier to join on", side, model.name()),
                )
            }),
        _ => Err(SchemaError::invalid_relation(
            owner.name(),
            relation.name(),
            format!("composite {} keys are not supported", side),
        )),
    }
}

fn resolve_join(
    owner: &EntityModel,
    relation: &RelationDef,
    target: &EntityModel,
) -> SchemaResult<JoinColumns> {
    if relation.kind == RelationKind::OneToMany && relation.references.is_empty() {
        return Err(SchemaError::invalid_relation(
            owner.name(),
            relation.name(),
            "one_to_many relations must name the foreign key in `references`",
        ));
    }
    if relation.kind == RelationKind::ManyToMany && relation.through.is_none() {
        return Err(SchemaError::invalid_relation(
            owner.name(),
            relation.name(),
            "many_to_many relations require a `through` join table",
        ));
    }

    Ok(JoinColumns {
        local: single_key(owner, relation, owner, &relation.fields, "owner")?,
        remote: single_key(owner, relation, target, &relation.references, "target")?,
        through: relation.through.clone(),
    })
}

/// An in-memory registry of entity models.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entities: IndexMap<SmolStr, EntityModel>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, replacing any previous definition with the same name.
    pub fn with_entity(mut self, model: EntityModel) -> Self {
        self.entities.insert(model.name.clone(), model);
        self
    }

    /// Add an entity, rejecting duplicates.
    pub fn add_entity(&mut self, model: EntityModel) -> SchemaResult<()> {
        if self.entities.contains_key(&model.name) {
            return Err(SchemaError::duplicate("entity", model.name.as_str()));
        }
        self.entities.insert(model.name.clone(), model);
        Ok(())
    }

    /// Get all entities in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.values()
    }

    /// Get the number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Validate every relation against the registered entities.
    ///
    /// All problems are collected rather than stopping at the first one.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut errors = Vec::new();

        for model in self.entities.values() {
            if model.table.is_empty() {
                errors.push(SchemaError::invalid_entity(model.name(), "table name is empty"));
            }
            for relation in model.relations.values() {
                if let Err(e) = self.join_columns(model, relation) {
                    errors.push(e);
                }
            }
        }

        debug!(entities = self.entities.len(), errors = errors.len(), "Validated schema");

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            count => Err(SchemaError::ValidationFailed { count, errors }),
        }
    }
}

impl SchemaMetadata for Schema {
    fn entity(&self, name: &str) -> Option<&EntityModel> {
        self.entities.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDef;
    use pretty_assertions::assert_eq;

    fn shop() -> Schema {
        Schema::new()
            .with_entity(
                EntityModel::new("Customer")
                    .table("customers")
                    .field(FieldDef::id("id"))
                    .relation(RelationDef::one_to_many("orders", "Order").references(["customer_id"])),
            )
            .with_entity(
                EntityModel::new("Order")
                    .table("orders")
                    .field(FieldDef::id("id"))
                    .field(FieldDef::new("customer_id"))
                    .relation(RelationDef::many_to_one("customer", "Customer").fields(["customer_id"]))
                    .relation(RelationDef::many_to_many(
                        "tags",
                        "Tag",
                        JoinTableSpec::new("order_tags", "order_id", "tag_id"),
                    )),
            )
            .with_entity(EntityModel::new("Tag").table("tags").field(FieldDef::id("id")))
    }

    #[test]
    fn test_lookup() {
        let schema = shop();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.entity("Order").map(|m| m.table_name()), Some("orders"));
        assert!(schema.entity("Invoice").is_none());
    }

    #[test]
    fn test_one_to_many_join_columns() {
        let schema = shop();
        let customer = schema.entity("Customer").unwrap();
        let rel = customer.get_relation("orders").unwrap();

        let join = schema.join_columns(customer, rel).unwrap();
        assert_eq!(
            join,
            JoinColumns {
                local: "id".into(),
                remote: "customer_id".into(),
                through: None,
            }
        );
    }

    #[test]
    fn test_many_to_one_join_columns() {
        let schema = shop();
        let order = schema.entity("Order").unwrap();
        let rel = order.get_relation("customer").unwrap();

        let join = schema.join_columns(order, rel).unwrap();
        assert_eq!(join.local, "customer_id");
        assert_eq!(join.remote, "id");
    }

    #[test]
    fn test_many_to_many_join_columns() {
        let schema = shop();
        let order = schema.entity("Order").unwrap();
        let rel = order.get_relation("tags").unwrap();

        let join = schema.join_columns(order, rel).unwrap();
        assert_eq!(join.local, "id");
        assert_eq!(join.remote, "id");
        assert_eq!(join.through.unwrap().target_column, "tag_id");
    }

    #[test]
    fn test_validate_ok() {
        assert!(shop().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let schema = shop().with_entity(
            EntityModel::new("Invoice")
                .field(FieldDef::id("id"))
                .relation(RelationDef::one_to_many("lines", "InvoiceLine").references(["invoice_id"]))
                .relation(RelationDef::one_to_many("payments", "Order")),
        );

        match schema.validate() {
            Err(SchemaError::ValidationFailed { count, .. }) => assert_eq!(count, 2),
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_composite_join_rejected() {
        let schema = shop().with_entity(
            EntityModel::new("Shipment")
                .field(FieldDef::id("id"))
                .relation(RelationDef::many_to_one("order", "Order").fields(["order_id", "region"])),
        );

        assert!(matches!(
            schema.validate(),
            Err(SchemaError::InvalidRelation { ref relation, .. }) if relation == "order"
        ));
    }

    #[test]
    fn test_add_entity_rejects_duplicates() {
        let mut schema = shop();
        let err = schema.add_entity(EntityModel::new("Tag")).unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
    }
}
