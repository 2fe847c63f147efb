//! Correlation keys carried through a batch query.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A `{parent_id, child_id}` row produced by a batch query.
///
/// Hosts with typed identifiers may produce `CorrelationKeyPair<i64, Uuid>` and
/// call [`erase`](Self::erase) before handing rows back to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKeyPair<P = Value, C = Value> {
    /// Identifier of the primary (parent) row.
    pub parent_id: P,
    /// Identifier of the dependent (child) row.
    pub child_id: C,
}

impl<P, C> CorrelationKeyPair<P, C> {
    /// Create a new key pair.
    pub fn new(parent_id: P, child_id: C) -> Self {
        Self { parent_id, child_id }
    }

    /// Split into `(parent_id, child_id)`.
    pub fn into_tuple(self) -> (P, C) {
        (self.parent_id, self.child_id)
    }
}

impl<P: Into<Value>, C: Into<Value>> CorrelationKeyPair<P, C> {
    /// Convert both identifiers into [`Value`]s.
    pub fn erase(self) -> CorrelationKeyPair {
        CorrelationKeyPair {
            parent_id: self.parent_id.into(),
            child_id: self.child_id.into(),
        }
    }
}

impl<P, C> From<(P, C)> for CorrelationKeyPair<P, C> {
    fn from((parent_id, child_id): (P, C)) -> Self {
        Self { parent_id, child_id }
    }
}
