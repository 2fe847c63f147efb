//! Session-scoped identity cache.
//!
//! Within a session each `(entity, view type, identifier)` resolves to exactly
//! one shared instance. The first insert for a key wins; later inserts of the
//! same key return the resident instance and drop their own.

use parking_lot::RwLock;
use smol_str::SmolStr;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{FetchError, FetchResult};
use crate::value::Value;
use crate::view::View;

type Entry = Arc<dyn Any + Send + Sync>;

/// Key of a cached view instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    entity: SmolStr,
    view: TypeId,
    id: Value,
}

impl CacheKey {
    /// Build the key for view `V` of `entity` with identifier `id`.
    pub fn of<V: View>(entity: &str, id: Value) -> Self {
        Self {
            entity: SmolStr::new(entity),
            view: TypeId::of::<V>(),
            id,
        }
    }

    /// Get the entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Get the identifier.
    pub fn id(&self) -> &Value {
        &self.id
    }
}

/// Identity map of materialized views.
#[derive(Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl SessionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the instance of `V` for `id`.
    pub fn get<V: View>(&self, entity: &str, id: &Value) -> Option<Arc<V>> {
        let key = CacheKey::of::<V>(entity, id.clone());
        let entry = self.entries.read().get(&key).cloned()?;
        entry.downcast::<V>().ok()
    }

    /// Insert a view keyed by its own identifier.
    ///
    /// Returns the resident instance, which is `view` unless another instance
    /// with the same key was inserted first.
    pub fn insert<V: View>(&self, entity: &str, view: V) -> FetchResult<Arc<V>> {
        let key = CacheKey::of::<V>(entity, view.primary_key_value());
        let mut entries = self.entries.write();
        let entry = entries
            .entry(key)
            .or_insert_with(|| Arc::new(view) as Entry)
            .clone();
        drop(entries);

        entry.downcast::<V>().map_err(|_| {
            FetchError::internal(format!(
                "session cache entry for `{}` is not a `{}`",
                entity,
                std::any::type_name::<V>()
            ))
        })
    }

    /// Check if an instance of `V` is cached for `id`.
    pub fn contains<V: View>(&self, entity: &str, id: &Value) -> bool {
        self.entries
            .read()
            .contains_key(&CacheKey::of::<V>(entity, id.clone()))
    }

    /// Get the number of cached instances.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached instance.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("entries", &self.len())
            .finish()
    }
}
