//! A set of keys where every member expires after a per-insert duration, polled as a `Stream` of
//! expired keys. Used by the peer pool to schedule "unban this peer" / "retry this dial" without
//! a dedicated timer task per peer.

use futures::stream::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::time::delay_queue::{self, DelayQueue};

pub struct HashSetDelay<T>
where
    T: std::hash::Hash + Eq + Clone,
{
    items: HashMap<T, delay_queue::Key>,
    delay_queue: DelayQueue<T>,
}

impl<T> Default for HashSetDelay<T>
where
    T: std::hash::Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HashSetDelay<T>
where
    T: std::hash::Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            delay_queue: DelayQueue::new(),
        }
    }

    /// Inserts `item`, to expire after `duration`. Re-inserting an already-present item resets
    /// its expiry to `duration` from now rather than stacking a second timer for it.
    pub fn insert_at(&mut self, item: T, duration: Duration) {
        if let Some(key) = self.items.get(&item) {
            self.delay_queue.reset(key, duration);
        } else {
            let key = self.delay_queue.insert(item.clone(), duration);
            self.items.insert(item, key);
        }
    }

    pub fn contains_key(&self, item: &T) -> bool {
        self.items.contains_key(item)
    }

    /// Removes `item` before it expires; a no-op if it isn't present.
    pub fn remove(&mut self, item: &T) {
        if let Some(key) = self.items.remove(item) {
            self.delay_queue.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &T> {
        self.items.keys()
    }
}

impl<T> Stream for HashSetDelay<T>
where
    T: std::hash::Hash + Eq + Clone + Unpin,
{
    type Item = Result<T, tokio_util::time::delay_queue::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.delay_queue).poll_expired(cx) {
            Poll::Ready(Some(Ok(expired))) => {
                self.items.remove(expired.get_ref());
                Poll::Ready(Some(Ok(expired.into_inner())))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn expires_after_duration() {
        let mut set = HashSetDelay::new();
        set.insert_at("peer-a", Duration::from_millis(10));
        assert!(set.contains_key(&"peer-a"));

        let expired = set.next().await.unwrap().unwrap();
        assert_eq!(expired, "peer-a");
        assert!(!set.contains_key(&"peer-a"));
    }

    #[tokio::test]
    async fn removed_item_never_expires() {
        let mut set = HashSetDelay::new();
        set.insert_at("peer-a", Duration::from_millis(10));
        set.remove(&"peer-a");
        assert_eq!(set.len(), 0);
    }
}
