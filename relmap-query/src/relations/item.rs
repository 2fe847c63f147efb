//! Fetch items: one parent waiting for its dependents.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::error::{BoxError, FetchError, FetchResult};
use crate::value::Value;

type Callback<V> = Box<dyn FnOnce(Vec<Arc<V>>) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// A parent identifier paired with the callback that receives its dependents.
///
/// The callback is invoked exactly once per successful batch, with an empty
/// list when the parent has no dependents. It is never invoked when the batch
/// fails before distribution.
pub struct FetcherItem<V> {
    parent_id: Value,
    callback: Callback<V>,
}

impl<V: Send + Sync + 'static> FetcherItem<V> {
    /// Create an item whose callback returns a future.
    pub fn new<F, Fut>(parent_id: impl Into<Value>, callback: F) -> Self
    where
        F: FnOnce(Vec<Arc<V>>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            parent_id: parent_id.into(),
            callback: Box::new(move |values| callback(values).boxed()),
        }
    }

    /// Create an item with a synchronous callback.
    pub fn sync<F>(parent_id: impl Into<Value>, callback: F) -> Self
    where
        F: FnOnce(Vec<Arc<V>>) -> Result<(), BoxError> + Send + 'static,
    {
        Self::new(parent_id, move |values| futures::future::ready(callback(values)))
    }

    /// Create an item that forwards its dependents to a channel.
    ///
    /// The receiver resolves once the batch has been distributed. It reports a
    /// closed channel when the batch failed and the callback never ran.
    pub fn channel(parent_id: impl Into<Value>) -> (Self, oneshot::Receiver<Vec<Arc<V>>>) {
        let (tx, rx) = oneshot::channel();
        let item = Self::sync(parent_id, move |values| {
            // A dropped receiver means the caller stopped waiting.
            let _ = tx.send(values);
            Ok(())
        });
        (item, rx)
    }

    /// Get the parent identifier.
    pub fn parent_id(&self) -> &Value {
        &self.parent_id
    }

    /// Observe the delivered dependents before the callback runs.
    pub(crate) fn inspect<F>(self, inspect: F) -> Self
    where
        F: FnOnce(&[Arc<V>]) + Send + 'static,
    {
        let Self { parent_id, callback } = self;
        Self {
            parent_id,
            callback: Box::new(move |values| {
                inspect(&values);
                callback(values)
            }),
        }
    }

    /// Run the callback with the dependents of this parent.
    pub(crate) fn resolve(self, values: Vec<Arc<V>>) -> BoxFuture<'static, FetchResult<()>> {
        let Self { parent_id, callback } = self;
        callback(values)
            .map(move |result| result.map_err(|e| FetchError::callback(&parent_id, e)))
            .boxed()
    }
}

impl<V> fmt::Debug for FetcherItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetcherItem")
            .field("parent_id", &self.parent_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_item() {
        let (item, rx) = FetcherItem::<i64>::channel(1);
        assert_eq!(item.parent_id(), &Value::Int(1));

        item.resolve(vec![Arc::new(5)]).await.unwrap();
        assert_eq!(*rx.await.unwrap()[0], 5);
    }

    #[tokio::test]
    async fn test_callback_error_is_wrapped() {
        let item = FetcherItem::<i64>::sync(7, |_| Err("rejected".into()));

        let err = item.resolve(Vec::new()).await.unwrap_err();
        assert!(err.is_callback());
        assert!(err.message.contains("rejected"));
    }
}
