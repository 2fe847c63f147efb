//! Relation definitions between entities.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Kind of relation between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// One-to-one relation (e.g., Customer has one Profile).
    OneToOne,
    /// One-to-many relation (e.g., Customer has many Orders).
    OneToMany,
    /// Many-to-one relation (e.g., Order belongs to Customer).
    ManyToOne,
    /// Many-to-many relation through a join table (e.g., Order has many Tags).
    ManyToMany,
}

impl RelationKind {
    /// Check if this relation yields multiple records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Check if this relation yields a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Get the kind name as used in `relmap.toml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::OneToMany => "one_to_many",
            Self::ManyToOne => "many_to_one",
            Self::ManyToMany => "many_to_many",
        }
    }
}

/// Join table for many-to-many relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinTableSpec {
    /// Name of the join table.
    pub table: SmolStr,
    /// Column referencing the owning entity.
    pub source_column: SmolStr,
    /// Column referencing the target entity.
    pub target_column: SmolStr,
}

impl JoinTableSpec {
    /// Create a new join table spec.
    pub fn new(
        table: impl Into<SmolStr>,
        source_column: impl Into<SmolStr>,
        target_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table: table.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// A navigable relation declared on an entity.
///
/// For direct relations the owning entity's `fields` are matched against the
/// target's `references`. For many-to-many relations the join table links the
/// owner's `fields` to the target's `references`. Empty `fields` or
/// `references` fall back to the respective identifier, except that a
/// one-to-many relation must name the foreign key on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation name (navigation segment).
    pub name: SmolStr,
    /// Kind of relation.
    pub kind: RelationKind,
    /// Target entity name.
    pub target: SmolStr,
    /// Key fields on the owning entity.
    pub fields: Vec<SmolStr>,
    /// Referenced fields on the target entity.
    pub references: Vec<SmolStr>,
    /// Join table for many-to-many relations.
    pub through: Option<JoinTableSpec>,
}

impl RelationDef {
    fn with_kind(name: impl Into<SmolStr>, kind: RelationKind, target: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            fields: Vec::new(),
            references: Vec::new(),
            through: None,
        }
    }

    /// Create a one-to-one relation.
    pub fn one_to_one(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::with_kind(name, RelationKind::OneToOne, target)
    }

    /// Create a one-to-many relation.
    pub fn one_to_many(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::with_kind(name, RelationKind::OneToMany, target)
    }

    /// Create a many-to-one relation.
    pub fn many_to_one(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::with_kind(name, RelationKind::ManyToOne, target)
    }

    /// Create a many-to-many relation through a join table.
    pub fn many_to_many(
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        through: JoinTableSpec,
    ) -> Self {
        Self {
            through: Some(through),
            ..Self::with_kind(name, RelationKind::ManyToMany, target)
        }
    }

    /// Set the key fields on the owning entity.
    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the referenced fields on the target entity.
    pub fn references(mut self, refs: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        self.references = refs.into_iter().map(Into::into).collect();
        self
    }

    /// Get the relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if following this relation yields a sequence.
    pub fn is_many(&self) -> bool {
        self.kind.is_many()
    }
}
