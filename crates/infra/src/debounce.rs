//! Per-channel debouncing on tokio timers.
//!
//! Each channel holds at most one pending timer. Scheduling again on the same
//! channel aborts the previous timer, so only the last value settles.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug)]
struct Pending {
    ticket: u64,
    handle: JoinHandle<()>,
}

type PendingMap<K> = Arc<Mutex<HashMap<K, Pending>>>;

fn lock<K>(pending: &Mutex<HashMap<K, Pending>>) -> MutexGuard<'_, HashMap<K, Pending>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct Debouncer<K> {
    pending: PendingMap<K>,
    next_ticket: AtomicU64,
}

impl<K> Default for Debouncer<K> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart `channel`'s timer; `on_settle(value)` runs once `delay` passes
    /// without another `schedule`/`cancel` on the same channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<V, F, Fut>(&self, channel: K, value: V, delay: Duration, on_settle: F)
    where
        V: Send + 'static,
        F: FnOnce(V) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let pending = Arc::clone(&self.pending);
        let key = channel.clone();

        // Held until the new entry is inserted so the timer task can never
        // observe the map before its own ticket is in it.
        let mut map = lock(&self.pending);
        if let Some(previous) = map.remove(&channel) {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = lock(&pending);
                match map.get(&key) {
                    Some(p) if p.ticket == ticket => {
                        map.remove(&key);
                    }
                    _ => return,
                }
            }
            on_settle(value).await;
        });

        map.insert(channel, Pending { ticket, handle });
    }

    pub fn cancel(&self, channel: &K) {
        if let Some(previous) = lock(&self.pending).remove(channel) {
            previous.handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        for (_, previous) in lock(&self.pending).drain() {
            previous.handle.abort();
        }
    }

    /// True while `channel` has a timer that has not fired yet.
    pub fn is_pending(&self, channel: &K) -> bool {
        lock(&self.pending).contains_key(channel)
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, previous) in lock(&self.pending).drain() {
            previous.handle.abort();
        }
    }
}
