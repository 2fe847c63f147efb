//! Entity definitions: what the store knows about a record type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::relation::RelationDef;

/// A scalar field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: SmolStr,
    /// Column name in the store (defaults to the field name).
    pub column: Option<SmolStr>,
    /// Whether this field is part of the entity identifier.
    pub is_id: bool,
}

impl FieldDef {
    /// Create a plain field.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            column: None,
            is_id: false,
        }
    }

    /// Create an identifier field.
    pub fn id(name: impl Into<SmolStr>) -> Self {
        Self {
            is_id: true,
            ..Self::new(name)
        }
    }

    /// Map the field onto a differently named column.
    pub fn with_column(mut self, column: impl Into<SmolStr>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Get the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the column backing this field.
    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// A record type known to the store (maps to a table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityModel {
    /// Entity name.
    pub name: SmolStr,
    /// Table name.
    pub table: SmolStr,
    /// Scalar fields, in declaration order.
    pub fields: IndexMap<SmolStr, FieldDef>,
    /// Navigable relations, in declaration order.
    pub relations: IndexMap<SmolStr, RelationDef>,
}

impl EntityModel {
    /// Create a new entity whose table shares its name.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            fields: IndexMap::new(),
            relations: IndexMap::new(),
        }
    }

    /// Set the table name.
    pub fn table(mut self, table: impl Into<SmolStr>) -> Self {
        self.table = table.into();
        self
    }

    /// Add a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Add a relation.
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Get the entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Get a relation by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    /// Get the identifier field(s).
    pub fn id_fields(&self) -> Vec<&FieldDef> {
        self.fields.values().filter(|f| f.is_id).collect()
    }

    /// Get the identifier field when the entity has exactly one.
    pub fn single_id_field(&self) -> Option<&FieldDef> {
        let ids = self.id_fields();
        if ids.len() == 1 { Some(ids[0]) } else { None }
    }

    /// Resolve a field name to its column, falling back to the name itself.
    pub fn column_of<'a>(&'a self, field: &'a str) -> &'a str {
        self.fields.get(field).map_or(field, FieldDef::column)
    }
}
