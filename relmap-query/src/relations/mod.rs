//! Batched relationship fetching.
//!
//! This module provides:
//! - [`RelationshipDescriptor`]: a relation path resolved once against store metadata
//! - [`BatchQueryPlanner`]: turns a descriptor plus parent identifiers into a [`BatchQueryPlan`]
//! - [`RelationFetcher`]: runs a plan, loads dependents and completes each [`FetcherItem`]

mod descriptor;
mod distribute;
mod fetcher;
mod item;
mod keys;
mod plan;

pub use descriptor::{NavigationPath, RelationshipDescriptor};
pub use distribute::{correlate, distribute};
pub use fetcher::RelationFetcher;
pub use item::FetcherItem;
pub use keys::CorrelationKeyPair;
pub use plan::{BatchQueryPlan, BatchQueryPlanner, EntityKey, Hop, PlanShape, Projection};
