//! # relmap
//!
//! Batched relationship fetching for object-graph mappers.
//!
//! relmap resolves a relationship for a whole batch of parent objects with a
//! fixed number of store round trips, independent of the batch size:
//! - Relation paths are resolved once into a [`RelationshipDescriptor`]
//! - Each batch issues one correlation query and one loader call
//! - Views are shared through a session-scoped identity cache
//! - Every parent's callback runs exactly once, with an empty list when it has
//!   no dependents
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use relmap::prelude::*;
//! use relmap::{FromRow, Row};
//!
//! struct OrderView {
//!     id: i64,
//! }
//!
//! impl View for OrderView {
//!     const SOURCE_ENTITY: &'static str = "Order";
//!     const PRIMARY_KEY: &'static [&'static str] = &["id"];
//!
//!     fn primary_key_value(&self) -> Value {
//!         self.id.into()
//!     }
//! }
//!
//! impl FromRow for OrderView {
//!     fn from_row(row: &Row) -> FetchResult<Self> {
//!         let id = row
//!             .get_or_null("id")
//!             .as_int()
//!             .ok_or_else(|| FetchError::row_decode("Order", "missing id"))?;
//!         Ok(Self { id })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelmapConfig::from_str(r#"
//!     [entities.Customer]
//!     table = "customers"
//!     id = ["id"]
//!
//!     [entities.Customer.relations.orders]
//!     kind = "one_to_many"
//!     target = "Order"
//!     references = ["customer_id"]
//!
//!     [entities.Order]
//!     table = "orders"
//!     id = ["id"]
//!     fields = ["customer_id"]
//! "#)?;
//! let schema = config.schema()?;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.insert("customers", Row::new().with("id", 1));
//! store.insert("orders", Row::new().with("id", 10).with("customer_id", 1));
//!
//! let descriptor = RelationshipDescriptor::for_view::<OrderView, _>(&schema, "Customer", "orders")?;
//! let fetcher = RelationFetcher::<OrderView>::new(descriptor)?;
//! let session = MappingSession::with_config(store, FetchConfig::from(&config));
//!
//! let (item, orders) = FetcherItem::channel(1);
//! fetcher.apply(vec![item], &session).await?;
//! assert_eq!(orders.await?.len(), 1);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Store metadata and configuration.
pub mod schema {
    pub use relmap_schema::*;
}

pub use relmap_query::*;

pub use relmap_schema::{RelmapConfig, Schema, SchemaError, SchemaMetadata};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use relmap_query::prelude::*;
    pub use relmap_schema::{RelmapConfig, Schema, SchemaMetadata};
}
