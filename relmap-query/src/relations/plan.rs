//! Batch query plans.
//!
//! A plan is the store-agnostic description of the single correlation query
//! issued for one batch: the pre-resolved navigation hops of a
//! [`RelationshipDescriptor`] plus the distinct set of parent identifiers.
//! Engines either interpret the hops directly or render them to SQL with
//! [`BatchQueryPlan::to_sql`].

use indexmap::IndexSet;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::debug;

use relmap_schema::JoinTableSpec;

use super::descriptor::RelationshipDescriptor;
use crate::sql::{quote_identifier, DatabaseType};
use crate::value::Value;

/// An entity together with its single identifier column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKey {
    /// Entity name.
    pub entity: SmolStr,
    /// Table name.
    pub table: SmolStr,
    /// Identifier field name.
    pub key_field: SmolStr,
    /// Identifier column name.
    pub key_column: SmolStr,
}

/// One navigation step of a relation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    /// Relation name on the source entity.
    pub relation: SmolStr,
    /// Entity reached by this hop.
    pub target_entity: SmolStr,
    /// Table of the entity reached by this hop.
    pub target_table: SmolStr,
    /// Column on the source side of the join.
    pub local_column: SmolStr,
    /// Column on the target side of the join.
    pub remote_column: SmolStr,
    /// Join table for many-to-many hops.
    pub through: Option<JoinTableSpec>,
    /// Whether this hop may yield several rows per source row.
    pub to_many: bool,
}

/// How the correlation query projects child identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// At most one child per parent row.
    Single,
    /// Zero or more children per parent row, flattened into pairs.
    Flatten,
}

impl Projection {
    /// Check if this projection flattens a sequence.
    pub fn is_flatten(&self) -> bool {
        matches!(self, Self::Flatten)
    }
}

/// The part of a plan that never changes between batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanShape {
    /// The entity the query filters on.
    pub primary: EntityKey,
    /// The entity whose identifiers are projected.
    pub dependent: EntityKey,
    /// Navigation hops from primary to dependent.
    pub hops: Vec<Hop>,
    /// Projection of the final hop.
    pub projection: Projection,
}

impl PlanShape {
    /// Check if plain joins can reach the same dependent twice from one parent.
    ///
    /// True for multi-hop paths and join tables.
    pub fn may_repeat_edges(&self) -> bool {
        self.hops.len() > 1 || self.hops.iter().any(|h| h.through.is_some())
    }

    /// Alias used for the table reached by the final hop.
    fn leaf_alias(&self) -> String {
        format!("t{}", self.hops.len())
    }
}

/// A correlation query for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchQueryPlan {
    shape: Arc<PlanShape>,
    parent_ids: IndexSet<Value>,
}

impl BatchQueryPlan {
    /// Get the shared shape.
    pub fn shape(&self) -> &Arc<PlanShape> {
        &self.shape
    }

    /// Get the distinct parent identifiers, in first-seen order.
    pub fn parent_ids(&self) -> &IndexSet<Value> {
        &self.parent_ids
    }

    /// Get the projection.
    pub fn projection(&self) -> Projection {
        self.shape.projection
    }

    /// Check if the plan filters on no identifiers and would return nothing.
    pub fn is_empty(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Render the plan as a parameterized SQL query.
    ///
    /// The result set has two columns, `parent_id` and `child_id`, with one
    /// row per parent/dependent edge.
    pub fn to_sql(&self, db: DatabaseType) -> (String, Vec<Value>) {
        let shape = &*self.shape;
        let mut sql = format!(
            "SELECT {}p.{} AS parent_id, {}.{} AS child_id FROM {} AS p",
            if shape.may_repeat_edges() { "DISTINCT " } else { "" },
            quote_identifier(&shape.primary.key_column),
            shape.leaf_alias(),
            quote_identifier(&shape.dependent.key_column),
            quote_identifier(&shape.primary.table),
        );

        let mut previous = "p".to_string();
        for (i, hop) in shape.hops.iter().enumerate() {
            let alias = format!("t{}", i + 1);
            match &hop.through {
                None => {
                    sql.push_str(&format!(
                        " INNER JOIN {} AS {alias} ON {alias}.{} = {previous}.{}",
                        quote_identifier(&hop.target_table),
                        quote_identifier(&hop.remote_column),
                        quote_identifier(&hop.local_column),
                    ));
                }
                Some(jt) => {
                    let link = format!("j{}", i + 1);
                    sql.push_str(&format!(
                        " INNER JOIN {} AS {link} ON {link}.{} = {previous}.{}",
                        quote_identifier(&jt.table),
                        quote_identifier(&jt.source_column),
                        quote_identifier(&hop.local_column),
                    ));
                    sql.push_str(&format!(
                        " INNER JOIN {} AS {alias} ON {alias}.{} = {link}.{}",
                        quote_identifier(&hop.target_table),
                        quote_identifier(&hop.remote_column),
                        quote_identifier(&jt.target_column),
                    ));
                }
            }
            previous = alias;
        }

        let placeholders: Vec<_> = (1..=self.parent_ids.len())
            .map(|i| db.placeholder(i))
            .collect();
        sql.push_str(&format!(
            " WHERE p.{} IN ({})",
            quote_identifier(&shape.primary.key_column),
            placeholders.join(", ")
        ));

        (sql, self.parent_ids.iter().cloned().collect())
    }
}

/// Builds [`BatchQueryPlan`]s from a descriptor and a set of parent identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchQueryPlanner;

impl BatchQueryPlanner {
    /// Plan the correlation query for the given parent identifiers.
    ///
    /// Identifiers are deduplicated; null identifiers can never match a row and
    /// are dropped. Planning is pure: the same descriptor and identifier set
    /// always produce equal plans sharing one [`PlanShape`].
    pub fn plan<'a, I>(descriptor: &RelationshipDescriptor, parent_ids: I) -> BatchQueryPlan
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let parent_ids: IndexSet<Value> = parent_ids
            .into_iter()
            .filter(|id| !id.is_null())
            .cloned()
            .collect();

        debug!(
            relation = %descriptor,
            parent_ids = parent_ids.len(),
            "Planned batch query"
        );

        BatchQueryPlan {
            shape: Arc::clone(descriptor.shape()),
            parent_ids,
        }
    }
}
