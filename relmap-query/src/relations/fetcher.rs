//! The batch relationship fetcher.

use indexmap::IndexSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn, Instrument};

use super::descriptor::RelationshipDescriptor;
use super::distribute::distribute;
use super::item::FetcherItem;
use super::keys::CorrelationKeyPair;
use super::plan::{BatchQueryPlan, BatchQueryPlanner};
use crate::error::{FetchError, FetchResult};
use crate::loader::{DedupLoader, EntityLoader};
use crate::session::MappingSession;
use crate::value::Value;
use crate::view::View;

/// Resolves one relationship for a batch of parents with a single correlation
/// query and a single loader call.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use relmap_query::prelude::*;
/// # use relmap_query::{FromRow, Row};
/// # struct OrderView { id: i64 }
/// # impl View for OrderView {
/// #     const SOURCE_ENTITY: &'static str = "Order";
/// #     const PRIMARY_KEY: &'static [&'static str] = &["id"];
/// #     fn primary_key_value(&self) -> Value { self.id.into() }
/// # }
/// # impl FromRow for OrderView {
/// #     fn from_row(row: &Row) -> FetchResult<Self> {
/// #         Ok(Self { id: row.get_or_null("id").as_int().unwrap_or_default() })
/// #     }
/// # }
/// # async fn run(schema: relmap_schema::Schema, store: Arc<MemoryStore>) -> FetchResult<()> {
/// let descriptor = RelationshipDescriptor::for_view::<OrderView, _>(&schema, "Customer", "orders")?;
/// let fetcher = RelationFetcher::<OrderView>::new(descriptor)?;
/// let session = MappingSession::new(store);
///
/// let (item, orders) = FetcherItem::channel(1);
/// fetcher.apply(vec![item], &session).await?;
/// let orders = orders.await.unwrap_or_default();
/// # Ok(())
/// # }
/// ```
pub struct RelationFetcher<V, L = DedupLoader> {
    descriptor: Arc<RelationshipDescriptor>,
    loader: L,
    _view: PhantomData<fn() -> V>,
}

impl<V: View> RelationFetcher<V, DedupLoader>
where
    V: crate::view::FromRow,
{
    /// Create a fetcher that materializes views from store rows.
    pub fn new(descriptor: impl Into<Arc<RelationshipDescriptor>>) -> FetchResult<Self> {
        Self::with_loader(descriptor, DedupLoader::default())
    }
}

impl<V, L> RelationFetcher<V, L>
where
    V: View,
    L: EntityLoader<V>,
{
    /// Create a fetcher with a custom loader.
    ///
    /// Fails when the descriptor's dependent entity is not the source of `V`
    /// or `V` is not keyed by that entity's single identifier field.
    pub fn with_loader(
        descriptor: impl Into<Arc<RelationshipDescriptor>>,
        loader: L,
    ) -> FetchResult<Self> {
        let descriptor = descriptor.into();
        descriptor.ensure_view::<V>()?;

        Ok(Self {
            descriptor,
            loader,
            _view: PhantomData,
        })
    }

    /// Get the relationship descriptor.
    pub fn descriptor(&self) -> &Arc<RelationshipDescriptor> {
        &self.descriptor
    }

    /// Get the loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Fetch the dependents of every item's parent and run the item callbacks.
    ///
    /// Issues at most one correlation query and one loader call no matter how
    /// many items are passed. On success every callback has run exactly once,
    /// with an empty list for parents that have no dependents. When the query
    /// or the loader fails no callback runs. Callback failures are returned
    /// as callback errors.
    pub async fn apply(&self, items: Vec<FetcherItem<V>>, session: &MappingSession) -> FetchResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let span = tracing::debug_span!(
            "relation_fetch",
            relation = %self.descriptor,
            items = items.len()
        );

        async move {
            let plan = BatchQueryPlanner::plan(&self.descriptor, items.iter().map(FetcherItem::parent_id));
            let (pairs, children) = if plan.is_empty() {
                trace!("No parent identifiers, skipping store round trip");
                (Vec::new(), Vec::new())
            } else {
                self.fetch_with_timeout(&plan, session).await?
            };

            debug!(
                pairs = pairs.len(),
                children = children.len(),
                "Fetched relationship batch"
            );

            distribute(
                items,
                &pairs,
                &children,
                plan.projection(),
                session.config().callback_dispatch,
                session.stats(),
            )
            .await
        }
        .instrument(span)
        .await
    }

    async fn fetch_with_timeout(
        &self,
        plan: &BatchQueryPlan,
        session: &MappingSession,
    ) -> FetchResult<(Vec<CorrelationKeyPair>, Vec<Arc<V>>)> {
        let Some(limit) = session.config().query_timeout else {
            return self.fetch(plan, session).await;
        };

        match tokio::time::timeout(limit, self.fetch(plan, session)).await {
            Ok(result) => result,
            Err(_) => {
                session.stats().record_timeout();
                warn!(
                    relation = %self.descriptor,
                    timeout_ms = limit.as_millis() as u64,
                    "Relationship fetch timed out"
                );
                Err(FetchError::timeout(limit.as_millis() as u64)
                    .with_relation(self.descriptor.to_string()))
            }
        }
    }

    async fn fetch(
        &self,
        plan: &BatchQueryPlan,
        session: &MappingSession,
    ) -> FetchResult<(Vec<CorrelationKeyPair>, Vec<Arc<V>>)> {
        let config = session.config();
        if config.log_plans {
            debug!(plan = ?plan, "Executing batch plan");
        }
        if config.log_sql {
            let (sql, params) = plan.to_sql(config.dialect);
            trace!(sql = %sql, params = params.len(), "Batch query SQL");
        }

        session.stats().record_batch();
        let pairs = session.engine().fetch_key_pairs(plan).await?;
        session.stats().record_key_pairs(pairs.len());

        let child_ids: Vec<Value> = pairs
            .iter()
            .map(|pair| pair.child_id.clone())
            .filter(|id| !id.is_null())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        if child_ids.is_empty() {
            return Ok((pairs, Vec::new()));
        }

        let children = self
            .loader
            .load(self.descriptor.dependent_model(), &child_ids, session)
            .await?;
        Ok((pairs, children))
    }
}

impl<V, L> fmt::Debug for RelationFetcher<V, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationFetcher")
            .field("relation", &self.descriptor.to_string())
            .field("view", &std::any::type_name::<V>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::error::ErrorCode;
    use crate::testing::{seeded_store, shop_schema, CustomerView, OrderView, TagView};
    use pretty_assertions::assert_eq;
    use relmap_schema::CallbackDispatch;
    use std::time::Duration;

    fn order_fetcher() -> RelationFetcher<OrderView> {
        let descriptor =
            RelationshipDescriptor::for_view::<OrderView, _>(&shop_schema(), "Customer", "orders").unwrap();
        RelationFetcher::new(descriptor).unwrap()
    }

    fn ids<V: View>(values: &[Arc<V>]) -> Vec<Value> {
        values.iter().map(|v| v.primary_key_value()).collect()
    }

    #[tokio::test]
    async fn test_customer_orders_single_round_trip() {
        let store = Arc::new(seeded_store());
        let session = MappingSession::new(store.clone());
        let fetcher = order_fetcher();

        let (one, one_rx) = FetcherItem::channel(1);
        let (two, two_rx) = FetcherItem::channel(2);
        let (three, three_rx) = FetcherItem::channel(3);
        fetcher.apply(vec![one, two, three], &session).await.unwrap();

        assert_eq!(ids(&one_rx.await.unwrap()), vec![Value::Int(10), Value::Int(11)]);
        assert_eq!(ids(&two_rx.await.unwrap()), Vec::<Value>::new());
        assert_eq!(ids(&three_rx.await.unwrap()), vec![Value::Int(12)]);

        assert_eq!(store.key_queries(), 1);
        assert_eq!(
            store.loaded_ids(),
            vec![vec![Value::Int(10), Value::Int(11), Value::Int(12)]]
        );
    }

    #[tokio::test]
    async fn test_empty_items_touch_nothing() {
        let store = Arc::new(seeded_store());
        let session = MappingSession::new(store.clone());

        order_fetcher().apply(Vec::new(), &session).await.unwrap();

        assert_eq!(store.key_queries(), 0);
        assert_eq!(store.row_loads(), 0);
    }

    #[tokio::test]
    async fn test_no_pairs_skips_loader() {
        let store = Arc::new(seeded_store());
        let session = MappingSession::new(store.clone());

        let (item, rx) = FetcherItem::channel(2);
        order_fetcher().apply(vec![item], &session).await.unwrap();

        assert!(rx.await.unwrap().is_empty());
        assert_eq!(store.key_queries(), 1);
        assert_eq!(store.row_loads(), 0);
    }

    #[tokio::test]
    async fn test_null_parent_gets_empty_list_without_query() {
        let store = Arc::new(seeded_store());
        let session = MappingSession::new(store.clone());

        let (item, rx) = FetcherItem::channel(Value::Null);
        order_fetcher().apply(vec![item], &session).await.unwrap();

        assert!(rx.await.unwrap().is_empty());
        assert_eq!(store.key_queries(), 0);
    }

    #[tokio::test]
    async fn test_to_one_relationship() {
        let store = Arc::new(seeded_store());
        let session = MappingSession::new(store);
        let descriptor =
            RelationshipDescriptor::for_view::<CustomerView, _>(&shop_schema(), "Order", "customer").unwrap();
        let fetcher = RelationFetcher::<CustomerView>::new(descriptor).unwrap();

        let (ten, ten_rx) = FetcherItem::channel(10);
        let (twelve, twelve_rx) = FetcherItem::channel(12);
        fetcher.apply(vec![ten, twelve], &session).await.unwrap();

        assert_eq!(ids(&ten_rx.await.unwrap()), vec![Value::Int(1)]);
        assert_eq!(ids(&twelve_rx.await.unwrap()), vec![Value::Int(3)]);
    }

    #[tokio::test]
    async fn test_store_failure_runs_no_callbacks() {
        let store = Arc::new(seeded_store());
        store.fail_queries(true);
        let session = MappingSession::new(store);

        let (item, rx) = FetcherItem::channel(1);
        let err = order_fetcher().apply(vec![item], &session).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::QueryFailed);
        assert!(rx.await.is_err());
        assert_eq!(session.stats().snapshot().callbacks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let store = Arc::new(seeded_store().with_latency(Duration::from_secs(5)));
        let session = MappingSession::with_config(
            store,
            FetchConfig::new().with_timeout(Duration::from_millis(100)),
        );

        let (item, rx) = FetcherItem::channel(1);
        let err = order_fetcher().apply(vec![item], &session).await.unwrap_err();

        assert!(err.is_timeout());
        assert!(rx.await.is_err());
        assert_eq!(session.stats().snapshot().timeouts, 1);
    }

    #[tokio::test]
    async fn test_concurrent_dispatch() {
        let store = Arc::new(seeded_store());
        let session = MappingSession::with_config(
            store,
            FetchConfig::new().with_dispatch(CallbackDispatch::Concurrent),
        );

        let (one, one_rx) = FetcherItem::channel(1);
        let (three, three_rx) = FetcherItem::channel(3);
        order_fetcher().apply(vec![one, three], &session).await.unwrap();

        assert_eq!(one_rx.await.unwrap().len(), 2);
        assert_eq!(three_rx.await.unwrap().len(), 1);
    }

    #[test]
    fn test_view_must_match_dependent() {
        let descriptor =
            RelationshipDescriptor::build(&shop_schema(), "Customer", "orders", "Order").unwrap();
        let err = RelationFetcher::<TagView>::new(descriptor).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedRelationShape);
    }
}
