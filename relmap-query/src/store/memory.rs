//! In-memory query engine.
//!
//! `MemoryStore` evaluates batch plans hop by hop over tables of [`Row`]s. It
//! is the reference engine for tests and embedded use, and records how often
//! it was queried so callers can assert round-trip counts.

use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use relmap_schema::EntityModel;

use crate::engine::QueryEngine;
use crate::error::{FetchError, FetchResult};
use crate::relations::{BatchQueryPlan, CorrelationKeyPair, Projection};
use crate::value::{Row, Value};

/// A query engine over in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<SmolStr, Vec<Row>>>,
    latency: Option<Duration>,
    fail_queries: AtomicBool,
    key_queries: AtomicUsize,
    row_loads: AtomicUsize,
    loaded_ids: Mutex<Vec<Vec<Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every query by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a row to a table, builder style.
    pub fn with_row(self, table: &str, row: Row) -> Self {
        self.insert(table, row);
        self
    }

    /// Add a row to a table.
    pub fn insert(&self, table: &str, row: Row) {
        self.tables
            .write()
            .entry(SmolStr::new(table))
            .or_default()
            .push(row);
    }

    /// Create an empty table.
    pub fn create_table(&self, table: &str) {
        self.tables.write().entry(SmolStr::new(table)).or_default();
    }

    /// Load rows from a JSON array of objects.
    pub fn load_json(&self, table: &str, json: &serde_json::Value) -> FetchResult<usize> {
        let items = json.as_array().ok_or_else(|| {
            FetchError::malformed_query(format!("seed data for `{}` must be a JSON array", table))
        })?;

        let rows = items
            .iter()
            .map(|item| {
                Row::from_json(item)
                    .ok_or_else(|| FetchError::row_decode(table, format!("unsupported JSON row: {}", item)))
            })
            .collect::<FetchResult<Vec<_>>>()?;

        let count = rows.len();
        self.tables
            .write()
            .entry(SmolStr::new(table))
            .or_default()
            .extend(rows);
        Ok(count)
    }

    /// Make every subsequent query fail (or succeed again).
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Number of correlation queries executed.
    pub fn key_queries(&self) -> usize {
        self.key_queries.load(Ordering::SeqCst)
    }

    /// Number of row loads executed.
    pub fn row_loads(&self) -> usize {
        self.row_loads.load(Ordering::SeqCst)
    }

    /// Identifier sets requested by each row load, in call order.
    pub fn loaded_ids(&self) -> Vec<Vec<Value>> {
        self.loaded_ids.lock().clone()
    }

    async fn simulate(&self, operation: &str) -> FetchResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(FetchError::query_failed(format!("{} rejected by memory store", operation)));
        }
        Ok(())
    }

    fn evaluate(&self, plan: &BatchQueryPlan) -> FetchResult<Vec<CorrelationKeyPair>> {
        let tables = self.tables.read();
        let shape = plan.shape();
        let table = |name: &str| {
            tables
                .get(name)
                .ok_or_else(|| FetchError::malformed_query(format!("unknown table `{}`", name)))
        };

        let mut pairs = Vec::new();
        for root in table(&shape.primary.table)? {
            let parent_id = root.get_or_null(&shape.primary.key_column);
            if !plan.parent_ids().contains(parent_id) {
                continue;
            }

            let mut frontier: Vec<&Row> = vec![root];
            for hop in &shape.hops {
                let targets = table(&hop.target_table)?;
                let mut next = Vec::new();
                for row in &frontier {
                    let local = row.get_or_null(&hop.local_column);
                    if local.is_null() {
                        continue;
                    }
                    match &hop.through {
                        None => next.extend(
                            targets
                                .iter()
                                .filter(|t| t.get_or_null(&hop.remote_column) == local),
                        ),
                        Some(jt) => {
                            for link in table(&jt.table)? {
                                if link.get_or_null(&jt.source_column) != local {
                                    continue;
                                }
                                let remote = link.get_or_null(&jt.target_column);
                                next.extend(
                                    targets
                                        .iter()
                                        .filter(|t| t.get_or_null(&hop.remote_column) == remote),
                                );
                            }
                        }
                    }
                }
                frontier = next;
            }

            // One pair per edge, however many paths reach the child.
            let children: IndexSet<&Value> = frontier
                .iter()
                .map(|row| row.get_or_null(&shape.dependent.key_column))
                .filter(|id| !id.is_null())
                .collect();
            let take = match shape.projection {
                Projection::Single => 1,
                Projection::Flatten => usize::MAX,
            };
            pairs.extend(
                children
                    .into_iter()
                    .take(take)
                    .map(|child| CorrelationKeyPair::new(parent_id.clone(), child.clone())),
            );
        }

        Ok(pairs)
    }
}

#[async_trait]
impl QueryEngine for MemoryStore {
    async fn fetch_key_pairs(&self, plan: &BatchQueryPlan) -> FetchResult<Vec<CorrelationKeyPair>> {
        self.key_queries.fetch_add(1, Ordering::SeqCst);
        self.simulate("correlation query").await?;

        let pairs = self.evaluate(plan)?;
        debug!(
            primary = %plan.shape().primary.entity,
            parent_ids = plan.parent_ids().len(),
            pairs = pairs.len(),
            "Evaluated batch plan"
        );
        Ok(pairs)
    }

    async fn load_rows(&self, entity: &EntityModel, ids: &[Value]) -> FetchResult<Vec<Row>> {
        self.row_loads.fetch_add(1, Ordering::SeqCst);
        self.loaded_ids.lock().push(ids.to_vec());
        self.simulate("row load").await?;

        let key = entity
            .single_id_field()
            .ok_or_else(|| FetchError::missing_identifier(entity.name()))?;
        let tables = self.tables.read();
        let rows = tables
            .get(entity.table_name())
            .ok_or_else(|| FetchError::malformed_query(format!("unknown table `{}`", entity.table)))?;

        let rows: Vec<Row> = rows
            .iter()
            .filter(|row| ids.contains(row.get_or_null(key.column())))
            .cloned()
            .collect();
        trace!(entity = %entity.name, requested = ids.len(), found = rows.len(), "Loaded rows");
        Ok(rows)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tables", &self.tables.read().len())
            .field("key_queries", &self.key_queries())
            .field("row_loads", &self.row_loads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::{BatchQueryPlanner, RelationshipDescriptor};
    use crate::testing::{seeded_store, shop_schema};
    use pretty_assertions::assert_eq;

    fn pairs(raw: &[(i64, i64)]) -> Vec<CorrelationKeyPair> {
        raw.iter()
            .map(|&(p, c)| CorrelationKeyPair::new(Value::Int(p), Value::Int(c)))
            .collect()
    }

    #[tokio::test]
    async fn test_one_to_many_pairs() {
        let store = seeded_store();
        let descriptor = RelationshipDescriptor::build(&shop_schema(), "Customer", "orders", "Order").unwrap();
        let ids = [Value::Int(1), Value::Int(2), Value::Int(3)];
        let plan = BatchQueryPlanner::plan(&descriptor, &ids);

        let result = store.fetch_key_pairs(&plan).await.unwrap();
        assert_eq!(result, pairs(&[(1, 10), (1, 11), (3, 12)]));
        assert_eq!(store.key_queries(), 1);
    }

    #[tokio::test]
    async fn test_many_to_one_pairs() {
        let store = seeded_store();
        let descriptor = RelationshipDescriptor::build(&shop_schema(), "Order", "customer", "Customer").unwrap();
        let ids = [Value::Int(10), Value::Int(12)];
        let plan = BatchQueryPlanner::plan(&descriptor, &ids);

        let result = store.fetch_key_pairs(&plan).await.unwrap();
        assert_eq!(result, pairs(&[(10, 1), (12, 3)]));
    }

    #[tokio::test]
    async fn test_many_to_many_through_join_table() {
        let store = seeded_store();
        let descriptor = RelationshipDescriptor::build(&shop_schema(), "Order", "tags", "Tag").unwrap();
        let ids = [Value::Int(10), Value::Int(11)];
        let plan = BatchQueryPlanner::plan(&descriptor, &ids);

        let result = store.fetch_key_pairs(&plan).await.unwrap();
        assert_eq!(result, pairs(&[(10, 100), (10, 101), (11, 100)]));
    }

    #[tokio::test]
    async fn test_multi_hop_emits_each_edge_once() {
        let store = seeded_store();
        let descriptor =
            RelationshipDescriptor::build(&shop_schema(), "Customer", "orders.tags", "Tag").unwrap();
        let ids = [Value::Int(1)];
        let plan = BatchQueryPlanner::plan(&descriptor, &ids);

        // Orders 10 and 11 both carry tag 100.
        let result = store.fetch_key_pairs(&plan).await.unwrap();
        assert_eq!(result, pairs(&[(1, 100), (1, 101)]));
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = seeded_store();
        store.fail_queries(true);
        let descriptor = RelationshipDescriptor::build(&shop_schema(), "Customer", "orders", "Order").unwrap();
        let ids = [Value::Int(1)];

        let err = store
            .fetch_key_pairs(&BatchQueryPlanner::plan(&descriptor, &ids))
            .await
            .unwrap_err();
        assert!(err.is_store_execution());
    }

    #[test]
    fn test_load_json_rejects_non_array() {
        let store = MemoryStore::new();
        let err = store.load_json("orders", &serde_json::json!({"id": 1})).unwrap_err();
        assert!(err.is_store_execution());
    }
}
