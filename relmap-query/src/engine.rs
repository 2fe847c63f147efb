//! The store interface consumed by relationship fetches.

use async_trait::async_trait;

use relmap_schema::EntityModel;

use crate::error::FetchResult;
use crate::relations::{BatchQueryPlan, CorrelationKeyPair};
use crate::value::{Row, Value};

/// A store able to run correlation queries and load entity rows.
///
/// Implementations either interpret the plan's hops directly or execute
/// [`BatchQueryPlan::to_sql`]. Errors must be reported as store execution
/// errors (`R2xxx`); the fetcher propagates them unchanged.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run the correlation query, returning one pair per matched edge.
    ///
    /// Duplicate pairs are tolerated.
    async fn fetch_key_pairs(&self, plan: &BatchQueryPlan) -> FetchResult<Vec<CorrelationKeyPair>>;

    /// Load the rows of `entity` whose identifier is in `ids`.
    ///
    /// Identifiers with no row are silently absent from the result.
    async fn load_rows(&self, entity: &EntityModel, ids: &[Value]) -> FetchResult<Vec<Row>>;
}
