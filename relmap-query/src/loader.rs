//! Entity loaders.
//!
//! An [`EntityLoader`] turns a set of dependent identifiers into destination
//! views. The stock [`DedupLoader`] consults the session cache first and only
//! materializes identifiers the session has not seen, so a view reached
//! through several relationships is built once.

use async_trait::async_trait;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use relmap_schema::EntityModel;

use crate::error::{FetchError, FetchResult};
use crate::session::MappingSession;
use crate::value::Value;
use crate::view::{FromRow, View};

/// Resolves dependent identifiers to destination views.
///
/// Implementations must return at most one view per distinct identifier.
/// Identifiers with no stored entity are omitted.
#[async_trait]
pub trait EntityLoader<V: View>: Send + Sync {
    /// Load the views of `entity` identified by `ids`.
    async fn load(
        &self,
        entity: &EntityModel,
        ids: &[Value],
        session: &MappingSession,
    ) -> FetchResult<Vec<Arc<V>>>;
}

/// Builds fresh views for identifiers missing from the session cache.
#[async_trait]
pub trait Materialize<V: View>: Send + Sync {
    /// Materialize the views of `entity` identified by `ids`.
    async fn materialize(
        &self,
        entity: &EntityModel,
        ids: &[Value],
        session: &MappingSession,
    ) -> FetchResult<Vec<V>>;
}

/// Materializes views by loading rows through the session engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowMaterializer;

#[async_trait]
impl<V: View + FromRow> Materialize<V> for RowMaterializer {
    async fn materialize(
        &self,
        entity: &EntityModel,
        ids: &[Value],
        session: &MappingSession,
    ) -> FetchResult<Vec<V>> {
        let rows = session.engine().load_rows(entity, ids).await?;
        trace!(entity = %entity.name, rows = rows.len(), "Loaded entity rows");
        rows.iter()
            .map(|row| V::from_row(row).map_err(|e| e.with_entity(entity.name())))
            .collect()
    }
}

/// Loader backed by the session identity cache.
#[derive(Debug, Clone, Default)]
pub struct DedupLoader<M = RowMaterializer> {
    inner: M,
}

impl<M> DedupLoader<M> {
    /// Wrap a materializer.
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    /// Get the wrapped materializer.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<V, M> EntityLoader<V> for DedupLoader<M>
where
    V: View,
    M: Materialize<V>,
{
    async fn load(
        &self,
        entity: &EntityModel,
        ids: &[Value],
        session: &MappingSession,
    ) -> FetchResult<Vec<Arc<V>>> {
        session.stats().record_loader_call();

        let requested: IndexSet<&Value> = ids.iter().filter(|id| !id.is_null()).collect();
        let mut found: HashMap<Value, Arc<V>> = HashMap::with_capacity(requested.len());
        let mut missing = Vec::new();

        for id in &requested {
            match session.cache().get::<V>(entity.name(), id) {
                Some(view) => {
                    session.stats().record_hit();
                    found.insert((*id).clone(), view);
                }
                None => {
                    session.stats().record_miss();
                    missing.push((*id).clone());
                }
            }
        }

        debug!(
            entity = %entity.name,
            requested = requested.len(),
            cached = found.len(),
            missing = missing.len(),
            "Resolving dependent views"
        );

        if !missing.is_empty() {
            let views = self.inner.materialize(entity, &missing, session).await?;
            session.stats().record_materialized(views.len());

            for view in views {
                let id = view.primary_key_value();
                if !requested.contains(&id) {
                    return Err(FetchError::internal(format!(
                        "materializer returned `{}` {} which was not requested",
                        entity.name, id
                    )));
                }
                let resident = session.cache().insert(entity.name(), view)?;
                found.insert(id, resident);
            }
        }

        Ok(requested
            .into_iter()
            .filter_map(|id| found.remove(id))
            .collect())
    }
}
