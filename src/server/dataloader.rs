use std::collections::HashMap;
use std::fmt::Debug;
use std::future::poll_fn;
use std::hash::Hash;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::task::{Poll, Waker};

use parking_lot::Mutex;
use tracing::trace;

pub type BatchFuture<K, V> = Pin<Box<dyn Future<Output = HashMap<K, V>> + Send>>;

pub trait BatchLoader: Send + 'static {
    type K: Hash + Eq + Clone + Debug + Send + 'static;
    type V: Clone + Default + Send + 'static;

    /// Resolves all `keys` at once. Keys missing from the returned map resolve
    /// to `V::default()`.
    fn load_batch(&mut self, keys: Vec<Self::K>) -> BatchFuture<Self::K, Self::V>;
}

enum Entry<V> {
    Requested(Vec<Waker>),
    Ready(V),
}

struct LoaderInner<B: BatchLoader> {
    values: HashMap<B::K, Entry<B::V>>,
    pending_keys: HashMap<B::K, Vec<Waker>>,
    load_batch: B,
}

/// Collects every key requested while a wrapped future is pending and
/// resolves them in a single [`BatchLoader::load_batch`] call.
///
/// Resolved values are cached for the lifetime of the loader, which is meant
/// to be a single request.
pub struct DataLoader<B: BatchLoader> {
    inner: Arc<Mutex<LoaderInner<B>>>,
}

impl<B: BatchLoader> Clone for DataLoader<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: BatchLoader> DataLoader<B> {
    pub fn new(load_batch: B) -> Self {
        let inner = LoaderInner {
            load_batch,
            values: Default::default(),
            pending_keys: Default::default(),
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Only completes when polled from within [`DataLoader::wrap`].
    pub fn load(&self, key: B::K) -> impl Future<Output = B::V> {
        poll_fn(move |cx| {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;

            let wakers = match inner.values.get_mut(&key) {
                Some(Entry::Ready(v)) => {
                    return Poll::Ready(v.clone());
                }
                Some(Entry::Requested(wakers)) => wakers,
                None => inner.pending_keys.entry(key.clone()).or_insert_with(|| {
                    trace!(?key, "queueing key for the next batch");
                    vec![]
                }),
            };

            wakers.push(cx.waker().clone());
            Poll::Pending
        })
    }

    /// Drops every resolved value so the next `load` goes back to the
    /// batch loader. Keys that are still in flight are kept.
    pub fn clear(&self) {
        self.inner
            .lock()
            .values
            .retain(|_, entry| matches!(entry, Entry::Requested(_)));
    }

    pub async fn wrap<O>(&self, fut: impl Future<Output = O>) -> O {
        let mut currently_loading: Option<(Vec<B::K>, BatchFuture<B::K, B::V>)> = None;

        let mut fut = pin!(fut);
        poll_fn(move |cx| {
            if let Some((keys, batch)) = &mut currently_loading {
                match batch.as_mut().poll(cx) {
                    Poll::Ready(mut loaded) => {
                        let mut inner = self.inner.lock();

                        // Wake all the `load` calls waiting on this batch
                        for key in keys.drain(..) {
                            let value = loaded.remove(&key).unwrap_or_default();
                            if let Some(Entry::Requested(wakers)) =
                                inner.values.insert(key, Entry::Ready(value))
                            {
                                wakers.into_iter().for_each(Waker::wake);
                            }
                        }

                        currently_loading = None;
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            let res = fut.as_mut().poll(cx);
            if res.is_pending() {
                // We have polled the inner future once, during which it may have registered more
                // keys to load.
                let mut guard = self.inner.lock();
                let inner = &mut *guard;

                if !inner.pending_keys.is_empty() {
                    let mut keys = Vec::with_capacity(inner.pending_keys.len());
                    for (k, wakers) in std::mem::take(&mut inner.pending_keys) {
                        keys.push(k.clone());
                        inner.values.insert(k, Entry::Requested(wakers));
                    }

                    trace!(?keys, "dispatching batch");
                    let batch = inner.load_batch.load_batch(keys.clone());
                    currently_loading = Some((keys, batch));

                    // Wake immediately, to instruct the runtime to call `poll` again.
                    cx.waker().wake_by_ref();
                }
            }
            res
        })
        .await
    }
}
