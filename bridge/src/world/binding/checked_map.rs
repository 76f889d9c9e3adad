use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::world::binding::error::BindingError;

/// A HashMap which refuses to silently replace an existing key
pub struct CheckedMap<K: Eq + Hash, V> {
    inner: HashMap<K, V>,
}

impl<K: Eq + Hash + Debug, V> CheckedMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Inserts a value for a key which must not be present yet
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(), BindingError> {
        if self.inner.contains_key(&key) {
            return Err(BindingError::DuplicateMapKey {
                key: format!("{:?}", key),
            });
        }

        self.inner.insert(key, value);
        Ok(())
    }

    /// Inserts a value for a key which must not be present yet
    ///
    /// # Panics
    ///
    /// Panics if the key is already present.
    /// Consider using `try_insert` for error handling instead.
    pub fn insert(&mut self, key: K, value: V) {
        self.try_insert(key, value)
            .expect("Cannot insert and replace value for given key. Check first.")
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, K, V> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Eq + Hash + Debug, V> Default for CheckedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
