//! Result distribution.
//!
//! Correlation key pairs say which parent owns which child; loaded views say
//! what each child is. Distribution joins the two and hands every fetch item
//! the views that belong to its parent.

use futures::future::try_join_all;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

use relmap_schema::CallbackDispatch;

use super::item::FetcherItem;
use super::keys::CorrelationKeyPair;
use super::plan::Projection;
use crate::error::FetchResult;
use crate::session::SessionStats;
use crate::value::Value;
use crate::view::View;

/// Compute the dependents of each parent identifier, in `parents` order.
///
/// - Every parent gets an entry, empty when nothing correlates to it.
/// - A view is delivered to a parent only if a pair links the two.
/// - Duplicate pairs and duplicate views are delivered once.
/// - Within an entry, views keep the order of `children`.
/// - With [`Projection::Single`] an entry holds at most one view: the first
///   correlated one in `children` order. Extra pairs from the engine are
///   ignored.
pub fn correlate<'a, V: View>(
    parents: impl IntoIterator<Item = &'a Value>,
    pairs: &[CorrelationKeyPair],
    children: &[Arc<V>],
    projection: Projection,
) -> Vec<Vec<Arc<V>>> {
    let mut slots: HashMap<&Value, Vec<usize>> = HashMap::new();
    let mut results = Vec::new();
    for (index, parent) in parents.into_iter().enumerate() {
        slots.entry(parent).or_default().push(index);
        results.push(Vec::new());
    }

    let mut parents_by_child: HashMap<&Value, IndexSet<&Value>> = HashMap::new();
    for pair in pairs {
        parents_by_child
            .entry(&pair.child_id)
            .or_default()
            .insert(&pair.parent_id);
    }

    let mut seen = HashSet::with_capacity(children.len());
    for child in children {
        let child_id = child.primary_key_value();
        let Some(owners) = parents_by_child.get(&child_id) else {
            continue;
        };
        if !seen.insert(child_id.clone()) {
            continue;
        }
        for owner in owners {
            for &index in slots.get(*owner).into_iter().flatten() {
                if projection == Projection::Single && !results[index].is_empty() {
                    continue;
                }
                results[index].push(Arc::clone(child));
            }
        }
    }

    results
}

/// Deliver `children` to `items` and run their callbacks.
///
/// With [`CallbackDispatch::Sequential`] callbacks run in item order and the
/// first failure stops the remaining ones. With
/// [`CallbackDispatch::Concurrent`] all callbacks are polled together and the
/// first failure is returned once observed.
pub async fn distribute<V: View>(
    items: Vec<FetcherItem<V>>,
    pairs: &[CorrelationKeyPair],
    children: &[Arc<V>],
    projection: Projection,
    dispatch: CallbackDispatch,
    stats: &SessionStats,
) -> FetchResult<()> {
    let grouped = correlate(items.iter().map(FetcherItem::parent_id), pairs, children, projection);
    trace!(
        items = items.len(),
        pairs = pairs.len(),
        children = children.len(),
        dispatch = ?dispatch,
        "Distributing batch results"
    );

    match dispatch {
        CallbackDispatch::Sequential => {
            for (item, values) in items.into_iter().zip(grouped) {
                stats.record_callback();
                item.resolve(values).await?;
            }
        }
        CallbackDispatch::Concurrent => {
            let pending = items.into_iter().zip(grouped).map(|(item, values)| {
                stats.record_callback();
                item.resolve(values)
            });
            try_join_all(pending).await?;
        }
    }

    Ok(())
}
