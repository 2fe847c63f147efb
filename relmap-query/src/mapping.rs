//! Relationship mappings.
//!
//! A [`RelationMapping`] binds one destination field to a relation path. The
//! mapping engine queues a [`FetcherItem`] per parent while it projects rows
//! and flushes the queue once the parents are known:
//!
//! ```rust,no_run
//! use relmap_query::prelude::*;
//! use relmap_query::mapping::{MappingItem, RelationMapping};
//! # use relmap_query::{FromRow, Row};
//! # struct OrderView { id: i64 }
//! # impl View for OrderView {
//! #     const SOURCE_ENTITY: &'static str = "Order";
//! #     const PRIMARY_KEY: &'static [&'static str] = &["id"];
//! #     fn primary_key_value(&self) -> Value { self.id.into() }
//! # }
//! # impl FromRow for OrderView {
//! #     fn from_row(row: &Row) -> FetchResult<Self> {
//! #         Ok(Self { id: row.get_or_null("id").as_int().unwrap_or_default() })
//! #     }
//! # }
//! # async fn run(schema: relmap_schema::Schema, session: MappingSession) -> FetchResult<()> {
//! let mapping = RelationMapping::<OrderView>::new(
//!     &schema,
//!     "Customer",
//!     MappingItem::relation("orders", "orders").batch(),
//! )?;
//!
//! let mut queue = mapping.queue();
//! let first = queue.request(1);
//! let second = queue.request(2);
//! mapping.flush(&mut queue, &session).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use relmap_schema::SchemaMetadata;

use crate::error::{FetchError, FetchResult};
use crate::loader::{DedupLoader, EntityLoader};
use crate::relations::{FetcherItem, NavigationPath, RelationFetcher, RelationshipDescriptor};
use crate::session::MappingSession;
use crate::value::Value;
use crate::view::{FromRow, View};

/// How a relationship field is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationshipMappingStyle {
    /// Each parent is fetched on its own.
    #[default]
    Default,
    /// All queued parents are fetched together.
    Batch,
}

/// A destination field sourced from a relation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingItem {
    field: SmolStr,
    source: NavigationPath,
    style: RelationshipMappingStyle,
}

impl MappingItem {
    /// Map `field` from the relation at `path`.
    pub fn relation(field: impl Into<SmolStr>, path: impl Into<NavigationPath>) -> Self {
        Self {
            field: field.into(),
            source: path.into(),
            style: RelationshipMappingStyle::Default,
        }
    }

    /// Resolve this field with batched fetches.
    pub fn batch(self) -> Self {
        self.with_style(RelationshipMappingStyle::Batch)
    }

    /// Set the mapping style.
    pub fn with_style(mut self, style: RelationshipMappingStyle) -> Self {
        self.style = style;
        self
    }

    /// Get the destination field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the relation path.
    pub fn source(&self) -> &NavigationPath {
        &self.source
    }

    /// Get the mapping style.
    pub fn style(&self) -> RelationshipMappingStyle {
        self.style
    }
}

/// Post-processes every dependent delivered by one flush.
#[async_trait]
pub trait BatchProcessor<V: View>: Send + Sync {
    /// Process the distinct dependents of a flush, in delivery order.
    async fn process(&self, values: &[Arc<V>], session: &MappingSession) -> FetchResult<()>;
}

/// Pending fetch items of one relationship mapping.
pub struct FetchQueue<V> {
    pending: Vec<FetcherItem<V>>,
}

impl<V: View> FetchQueue<V> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Queue an item.
    pub fn push(&mut self, item: FetcherItem<V>) {
        self.pending.push(item);
    }

    /// Queue a parent and get a receiver for its dependents.
    pub fn request(&mut self, parent_id: impl Into<Value>) -> oneshot::Receiver<Vec<Arc<V>>> {
        let (item, rx) = FetcherItem::channel(parent_id);
        self.push(item);
        rx
    }

    /// Get the number of queued items.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every queued item.
    pub fn take(&mut self) -> Vec<FetcherItem<V>> {
        std::mem::take(&mut self.pending)
    }
}

impl<V: View> Default for FetchQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A relationship field mapping with its prepared fetcher.
pub struct RelationMapping<V, L = DedupLoader> {
    item: MappingItem,
    fetcher: RelationFetcher<V, L>,
    processor: Option<Box<dyn BatchProcessor<V>>>,
}

impl<V> RelationMapping<V>
where
    V: View + FromRow,
{
    /// Prepare a mapping that materializes views from store rows.
    pub fn new<M>(metadata: &M, primary_entity: &str, item: MappingItem) -> FetchResult<Self>
    where
        M: SchemaMetadata + ?Sized,
    {
        Self::with_loader(metadata, primary_entity, item, DedupLoader::default())
    }
}

impl<V, L> RelationMapping<V, L>
where
    V: View,
    L: EntityLoader<V>,
{
    /// Prepare a mapping with a custom loader.
    pub fn with_loader<M>(
        metadata: &M,
        primary_entity: &str,
        item: MappingItem,
        loader: L,
    ) -> FetchResult<Self>
    where
        M: SchemaMetadata + ?Sized,
    {
        let descriptor =
            RelationshipDescriptor::for_view::<V, M>(metadata, primary_entity, item.source().clone())
                .map_err(|e| e.with_field(item.field()))?;
        let fetcher = RelationFetcher::with_loader(descriptor, loader)?;

        Ok(Self {
            item,
            fetcher,
            processor: None,
        })
    }

    /// Attach the batch processor.
    ///
    /// A mapping accepts a single processor; a second one is a configuration error.
    pub fn batch_processor(mut self, processor: impl BatchProcessor<V> + 'static) -> FetchResult<Self> {
        if self.processor.is_some() {
            return Err(FetchError::configuration(format!(
                "Only one batch processor may be defined for `{}`",
                self.item.field()
            ))
            .with_field(self.item.field()));
        }
        self.processor = Some(Box::new(processor));
        Ok(self)
    }

    /// Get the mapping item.
    pub fn item(&self) -> &MappingItem {
        &self.item
    }

    /// Get the prepared fetcher.
    pub fn fetcher(&self) -> &RelationFetcher<V, L> {
        &self.fetcher
    }

    /// Create an empty queue for this mapping.
    pub fn queue(&self) -> FetchQueue<V> {
        FetchQueue::new()
    }

    /// Resolve every queued item, returning how many were resolved.
    pub async fn flush(&self, queue: &mut FetchQueue<V>, session: &MappingSession) -> FetchResult<usize> {
        let items = queue.take();
        let count = items.len();
        if count == 0 {
            return Ok(0);
        }

        let delivered: Arc<Mutex<IndexMap<Value, Arc<V>>>> = Arc::default();
        let items: Vec<_> = match self.processor {
            Some(_) => items
                .into_iter()
                .map(|item| {
                    let delivered = Arc::clone(&delivered);
                    item.inspect(move |values| {
                        let mut delivered = delivered.lock();
                        for value in values {
                            delivered
                                .entry(value.primary_key_value())
                                .or_insert_with(|| Arc::clone(value));
                        }
                    })
                })
                .collect(),
            None => items,
        };

        debug!(
            field = %self.item.field,
            items = count,
            style = ?self.item.style,
            "Flushing relationship mapping"
        );

        match self.item.style {
            RelationshipMappingStyle::Batch => self.fetcher.apply(items, session).await?,
            RelationshipMappingStyle::Default => {
                for item in items {
                    self.fetcher.apply(vec![item], session).await?;
                }
            }
        }

        if let Some(processor) = &self.processor {
            let values: Vec<Arc<V>> = delivered.lock().values().cloned().collect();
            processor.process(&values, session).await?;
        }

        Ok(count)
    }
}
