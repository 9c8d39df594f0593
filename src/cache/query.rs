// SPDX-License-Identifier: MPL-2.0

//! Generic per-key query cache.
//!
//! Every key runs a small state machine: absent → `Fetching` → `Fresh` →
//! `Stale` → `Fetching` → …, with `Fetching` → `Error` on failure. An
//! `Error` entry keeps serving its last good value and retriggers on the
//! next request. Concurrent requests for one key coalesce onto a single
//! in-flight fetch; a superseded fetch is discarded on completion, never
//! applied.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Freshness of a cached entry. Absent entries are the implicit empty state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Fresh,
    Stale,
    Error,
}

struct Entry<V, E> {
    phase: Phase,
    /// Last good value; survives staleness and later errors.
    value: Option<V>,
    error: Option<E>,
    /// Bumped whenever a new fetch starts or a write-through lands. A fetch
    /// only applies its result if the generation still matches.
    generation: u64,
    subscribers: usize,
    waiters: usize,
    /// Carries the generation of each settle to coalesced waiters.
    notify: watch::Sender<u64>,
    task: Option<JoinHandle<()>>,
}

impl<V, E> Entry<V, E> {
    /// New entries start stale with no value; the first fetch populates them.
    fn new() -> Self {
        Self {
            phase: Phase::Stale,
            value: None,
            error: None,
            generation: 0,
            subscribers: 0,
            waiters: 0,
            notify: watch::channel(0).0,
            task: None,
        }
    }
}

type Entries<K, V, E> = Mutex<HashMap<K, Entry<V, E>>>;
type Fetcher<K, V, E> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<V, E>> + Send + Sync>;

/// One cache per entity kind; the typed store bundles several of these over
/// a shared fetch discipline.
pub struct QueryCache<K, V, E> {
    entries: Arc<Entries<K, V, E>>,
    fetcher: Fetcher<K, V, E>,
}

impl<K, V, E> QueryCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new<F, Fut>(fetcher: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            fetcher: Arc::new(move |key: K| -> BoxFuture<'static, Result<V, E>> {
                Box::pin(fetcher(key))
            }),
        }
    }

    /// Resolve the key through the cache: a fresh entry answers immediately,
    /// anything else joins or starts the single in-flight fetch.
    pub async fn fetch(&self, key: K) -> Result<V, E> {
        let _waiter = WaiterGuard::register(&self.entries, key.clone());
        let mut awaited: Option<u64> = None;
        loop {
            let mut rx = {
                let mut entries = self.entries.lock().unwrap();
                let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
                match entry.phase {
                    Phase::Fresh => {
                        return Ok(entry
                            .value
                            .clone()
                            .expect("fresh entry always holds a value"));
                    }
                    Phase::Error if awaited.is_some_and(|g| entry.generation >= g) => {
                        return Err(entry
                            .error
                            .clone()
                            .expect("error entry always holds an error"));
                    }
                    // A stale entry, or an error we did not wait on.
                    Phase::Stale | Phase::Error => self.start_fetch(&key, entry),
                    Phase::Fetching => {}
                }
                awaited = Some(entry.generation);
                entry.notify.subscribe()
            };
            let _ = rx.changed().await;
        }
    }

    /// Register interest in a key and trigger a fetch if it needs one. The
    /// guard keeps the entry resident; dropping it releases the interest.
    pub fn subscribe(&self, key: K) -> Subscription<K, V, E> {
        let rx = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
            entry.subscribers += 1;
            if matches!(entry.phase, Phase::Stale | Phase::Error) {
                self.start_fetch(&key, entry);
            }
            entry.notify.subscribe()
        };
        Subscription {
            entries: self.entries.clone(),
            key,
            rx,
        }
    }

    /// Last good value for the key, whatever its freshness.
    pub fn cached(&self, key: &K) -> Option<V> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .and_then(|e| e.value.clone())
    }

    pub fn phase(&self, key: &K) -> Option<Phase> {
        self.entries.lock().unwrap().get(key).map(|e| e.phase)
    }

    /// Write an authoritative value straight into the cache. Supersedes any
    /// in-flight fetch for the key; its late result will be discarded.
    pub fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key).or_insert_with(Entry::new);
        if let Some(task) = entry.task.take() {
            task.abort();
        }
        entry.generation += 1;
        entry.value = Some(value);
        entry.error = None;
        entry.phase = Phase::Fresh;
        entry.notify.send_replace(entry.generation);
    }

    /// Invalidate one key: a subscribed or in-flight entry refetches at
    /// once, an idle one is marked stale and refetches on its next request.
    pub fn mark_stale(&self, key: &K) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            self.refresh_or_stale(key, entry);
        }
    }

    /// Invalidate every key currently in the cache.
    pub fn mark_all_stale(&self) {
        let mut entries = self.entries.lock().unwrap();
        for (key, entry) in entries.iter_mut() {
            self.refresh_or_stale(key, entry);
        }
    }

    /// Drop entries nobody subscribes to or waits on.
    pub fn evict_unused(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| {
            entry.subscribers > 0 || entry.waiters > 0 || entry.phase == Phase::Fetching
        });
    }

    /// Abort all in-flight fetches and clear the cache.
    pub fn shutdown(&self) {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.values_mut() {
            if let Some(task) = entry.task.take() {
                task.abort();
            }
        }
        entries.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn refresh_or_stale(&self, key: &K, entry: &mut Entry<V, E>) {
        if entry.phase == Phase::Fetching || entry.subscribers > 0 {
            // The running flight predates the invalidation; replace it.
            self.start_fetch(key, entry);
        } else {
            entry.phase = Phase::Stale;
        }
    }

    /// Start a new flight for the key. Caller holds the entries lock.
    fn start_fetch(&self, key: &K, entry: &mut Entry<V, E>) {
        if let Some(task) = entry.task.take() {
            task.abort();
        }
        entry.generation += 1;
        entry.phase = Phase::Fetching;
        let generation = entry.generation;
        let future = (self.fetcher)(key.clone());
        let entries = Arc::downgrade(&self.entries);
        let key = key.clone();
        entry.task = Some(tokio::spawn(async move {
            let result = future.await;
            let Some(entries) = entries.upgrade() else {
                return;
            };
            let mut entries = entries.lock().unwrap();
            let Some(entry) = entries.get_mut(&key) else {
                return;
            };
            if entry.generation != generation {
                // Superseded while in flight; discard.
                return;
            }
            entry.task = None;
            match result {
                Ok(value) => {
                    entry.value = Some(value);
                    entry.error = None;
                    entry.phase = Phase::Fresh;
                }
                Err(error) => {
                    entry.error = Some(error);
                    entry.phase = Phase::Error;
                }
            }
            entry.notify.send_replace(generation);
        }));
    }
}

/// Long-lived interest in one key. Keeps the entry resident and its
/// invalidations eager; dropping the guard releases that.
pub struct Subscription<K, V, E>
where
    K: Eq + Hash + Clone,
{
    entries: Arc<Entries<K, V, E>>,
    key: K,
    rx: watch::Receiver<u64>,
}

impl<K, V, E> Subscription<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Last good value for the subscribed key.
    pub fn latest(&self) -> Option<V> {
        self.entries
            .lock()
            .unwrap()
            .get(&self.key)
            .and_then(|e| e.value.clone())
    }

    /// Wait for the next settle of this key. Returns false if the cache was
    /// shut down.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<K, V, E> Drop for Subscription<K, V, E>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
        reap(&mut entries, &self.key);
    }
}

struct WaiterGuard<K, V, E>
where
    K: Eq + Hash + Clone,
{
    entries: Arc<Entries<K, V, E>>,
    key: K,
}

impl<K, V, E> WaiterGuard<K, V, E>
where
    K: Eq + Hash + Clone,
{
    fn register(entries: &Arc<Entries<K, V, E>>, key: K) -> Self {
        {
            let mut guard = entries.lock().unwrap();
            let entry = guard.entry(key.clone()).or_insert_with(Entry::new);
            entry.waiters += 1;
        }
        Self {
            entries: entries.clone(),
            key,
        }
    }
}

impl<K, V, E> Drop for WaiterGuard<K, V, E>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.waiters = entry.waiters.saturating_sub(1);
        }
        reap(&mut entries, &self.key);
    }
}

/// Cancel and tidy up after the last subscriber or waiter leaves a key.
fn reap<K, V, E>(entries: &mut HashMap<K, Entry<V, E>>, key: &K)
where
    K: Eq + Hash,
{
    let Some(entry) = entries.get_mut(key) else {
        return;
    };
    if entry.subscribers > 0 || entry.waiters > 0 {
        return;
    }
    if entry.phase == Phase::Fetching {
        // Nobody is left to observe the flight.
        if let Some(task) = entry.task.take() {
            task.abort();
        }
        entry.generation += 1;
        entry.phase = Phase::Stale;
    }
    let drop_entry = entry.value.is_none();
    if drop_entry {
        entries.remove(key);
    }
}
