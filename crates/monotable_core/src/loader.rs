//! Request-coalescing key cache.

use std::collections::HashMap;

use monotable_codec::Item;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

/// What a caller should do after asking the cache about a key.
pub(crate) enum Claim {
    /// A completed result is cached; use it.
    Hit(Option<Item>),
    /// Another task is fetching this key; await its result.
    Wait(oneshot::Receiver<Option<Item>>),
    /// Nobody is fetching; the caller owns the fetch and must call
    /// [`KeyCache::complete`] or [`KeyCache::abandon`].
    Fetch,
}

enum Slot {
    Ready(Option<Item>),
    Pending(Vec<oneshot::Sender<Option<Item>>>),
}

/// Coalesces repeated gets of the same key and caches completed results.
///
/// Within one logical batch window, concurrent gets of a key share a
/// single underlying fetch: the first claimant fetches, later claimants
/// wait on a channel. Completed entries are plain per-key values with
/// last-writer-wins updates; writes overwrite the touched entry and
/// deletes record known absence. There is no cross-key ordering.
#[derive(Default)]
pub(crate) struct KeyCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl KeyCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ask about a key, registering interest.
    pub(crate) fn claim(&self, canon: &str) -> Claim {
        let mut slots = self.slots.lock();
        match slots.get_mut(canon) {
            Some(Slot::Ready(item)) => Claim::Hit(item.clone()),
            Some(Slot::Pending(waiters)) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Claim::Wait(rx)
            }
            None => {
                slots.insert(canon.to_string(), Slot::Pending(Vec::new()));
                Claim::Fetch
            }
        }
    }

    /// Record a fetch result and wake every waiter with a copy.
    pub(crate) fn complete(&self, canon: &str, result: Option<Item>) {
        let waiters = {
            let mut slots = self.slots.lock();
            match slots.insert(canon.to_string(), Slot::Ready(result.clone())) {
                Some(Slot::Pending(waiters)) => waiters,
                _ => Vec::new(),
            }
        };
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    /// Drop a failed fetch. Waiters observe a closed channel and retry
    /// with their own claim.
    pub(crate) fn abandon(&self, canon: &str) {
        let mut slots = self.slots.lock();
        if matches!(slots.get(canon), Some(Slot::Pending(_))) {
            slots.remove(canon);
        }
    }

    /// Overwrite a key's entry (writes, deletes, query population).
    pub(crate) fn store(&self, canon: &str, result: Option<Item>) {
        trace!(key = canon, present = result.is_some(), "cache updated");
        self.complete(canon, result);
    }

    /// Forget everything: the logical batch window is over.
    pub(crate) fn clear(&self) {
        self.slots.lock().retain(|_, slot| matches!(slot, Slot::Pending(_)));
    }
}
