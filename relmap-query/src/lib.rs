//! # relmap-query
//!
//! Batched relationship fetching for the relmap object mapper.
//!
//! When a mapping projects many parents that each need related objects, the
//! naive approach runs one query per parent. This crate resolves one
//! relationship for the whole batch with:
//! - One correlation query returning `{parent_id, child_id}` pairs
//! - One loader call for the distinct child identifiers, deduplicated against
//!   a session-scoped identity cache
//! - Exactly one completion callback per parent
//!
//! ## Descriptors and plans
//!
//! Relation paths are resolved once against store metadata. Planning a batch
//! only adds the parent identifiers:
//!
//! ```rust
//! use relmap_query::{BatchQueryPlanner, DatabaseType, RelationshipDescriptor, Value};
//! use relmap_schema::{EntityModel, FieldDef, RelationDef, Schema};
//!
//! let schema = Schema::new()
//!     .with_entity(
//!         EntityModel::new("Customer")
//!             .table("customers")
//!             .field(FieldDef::id("id"))
//!             .relation(RelationDef::one_to_many("orders", "Order").references(["customer_id"])),
//!     )
//!     .with_entity(
//!         EntityModel::new("Order")
//!             .table("orders")
//!             .field(FieldDef::id("id"))
//!             .field(FieldDef::new("customer_id")),
//!     );
//!
//! let descriptor = RelationshipDescriptor::build(&schema, "Customer", "orders", "Order").unwrap();
//! assert!(descriptor.is_to_many());
//!
//! let ids = [Value::Int(1), Value::Int(2), Value::Int(1)];
//! let plan = BatchQueryPlanner::plan(&descriptor, &ids);
//! assert_eq!(plan.parent_ids().len(), 2);
//!
//! let (sql, params) = plan.to_sql(DatabaseType::PostgreSQL);
//! assert!(sql.ends_with("WHERE p.id IN ($1, $2)"));
//! assert_eq!(params.len(), 2);
//! ```
//!
//! ## Fetching
//!
//! See [`RelationFetcher`] for applying a descriptor to a batch of
//! [`FetcherItem`]s, and [`mapping`] for queuing items per destination field.

pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod logging;
pub mod mapping;
pub mod relations;
pub mod session;
pub mod sql;
pub mod store;
pub mod value;
pub mod view;

#[cfg(test)]
mod testing;

pub use config::FetchConfig;
pub use engine::QueryEngine;
pub use error::{BoxError, ErrorCode, ErrorContext, ErrorKind, FetchError, FetchResult};
pub use loader::{DedupLoader, EntityLoader, Materialize, RowMaterializer};
pub use mapping::{BatchProcessor, FetchQueue, MappingItem, RelationMapping, RelationshipMappingStyle};
pub use relations::{
    BatchQueryPlan, BatchQueryPlanner, CorrelationKeyPair, FetcherItem, NavigationPath, Projection,
    RelationFetcher, RelationshipDescriptor,
};
pub use session::{FetchStats, MappingSession, SessionCache, SessionStats};
pub use sql::DatabaseType;
pub use store::MemoryStore;
pub use value::{Row, Value};
pub use view::{FromRow, View};

pub use relmap_schema::CallbackDispatch;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::FetchConfig;
    pub use crate::engine::QueryEngine;
    pub use crate::error::{FetchError, FetchResult};
    pub use crate::loader::{DedupLoader, EntityLoader};
    pub use crate::mapping::{FetchQueue, MappingItem, RelationMapping};
    pub use crate::relations::{FetcherItem, RelationFetcher, RelationshipDescriptor};
    pub use crate::session::MappingSession;
    pub use crate::store::MemoryStore;
    pub use crate::value::Value;
    pub use crate::view::View;
    pub use relmap_schema::CallbackDispatch;
}
