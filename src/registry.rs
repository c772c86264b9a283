use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Keyed lookup table shared between threads behind a single lock.
///
/// Every method takes the lock for the duration of the call only, so
/// snapshots returned by [`Registry::values`] and [`Registry::items`] are
/// owned copies. Share it with `Arc<Registry<..>>`.
#[derive(Debug)]
pub struct Registry<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        // A panic while holding the lock cannot leave a map half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn values(&self) -> Vec<V> {
        self.lock().values().cloned().collect()
    }

    pub fn items(&self) -> Vec<(K, V)> {
        self.lock()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.lock().insert(key, value)
    }

    /// Merges `entries` in one locked step.
    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) {
        self.lock().extend(entries);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
