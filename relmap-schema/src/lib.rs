//! # relmap-schema
//!
//! Store metadata for the relmap relationship fetcher.
//!
//! This crate provides:
//! - Entity models with identifier fields and declared relations
//! - A [`SchemaMetadata`] accessor used to build relationship descriptors
//! - Configuration parsing for `relmap.toml` files
//!
//! ## Example
//!
//! ```rust
//! use relmap_schema::{EntityModel, FieldDef, RelationDef, Schema, SchemaMetadata};
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
//! schema.validate().unwrap();
//! assert!(schema.entity("Order").is_some());
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod relation;
pub mod schema;

pub use config::{CallbackDispatch, RelmapConfig};
pub use error::{SchemaError, SchemaResult};
pub use model::{EntityModel, FieldDef};
pub use relation::{JoinTableSpec, RelationDef, RelationKind};
pub use schema::{JoinColumns, Schema, SchemaMetadata};
