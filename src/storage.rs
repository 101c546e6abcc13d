//! Local storage for one registry layer
//!
//! Holds the key to service mapping plus the secondary alias mapping from
//! tag to the key that produced it. Locking is the caller's concern.

use crate::{DiError, Key, Result, Service};
use ahash::RandomState;
use std::collections::HashMap;

/// Key and alias maps of a single registry layer
pub(crate) struct Layer {
    /// Services by key
    services: HashMap<Key, Service, RandomState>,
    /// Key registered under each alias tag
    keys_by_tag: HashMap<String, Key, RandomState>,
}

impl Layer {
    /// Create an empty layer
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            services: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            keys_by_tag: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Find the service for a key, by identity first and then by alias tag.
    pub fn lookup(&self, key: &Key) -> Option<&Service> {
        if let Some(service) = self.services.get(key) {
            return Some(service);
        }

        let tag = key.tag()?;
        let aliased = self.keys_by_tag.get(&*tag)?;
        self.services.get(aliased)
    }

    /// Fail if the key, or a key with the same tag, is already present.
    pub fn ensure_vacant(&self, key: &Key) -> Result<()> {
        if self.services.contains_key(key) {
            return Err(DiError::duplicate(key));
        }

        if let Some(tag) = key.tag() {
            if self.keys_by_tag.contains_key(&*tag) {
                return Err(DiError::duplicate(key));
            }
        }

        Ok(())
    }

    /// Validate and insert
    pub fn insert(&mut self, key: Key, service: Service) -> Result<()> {
        self.ensure_vacant(&key)?;

        if let Some(tag) = key.tag() {
            self.keys_by_tag.insert(tag.into_owned(), key.clone());
        }
        self.services.insert(key, service);

        Ok(())
    }

    /// Check if a key resolves in this layer
    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.lookup(key).is_some()
    }

    /// Get number of registered services
    #[inline]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Get all registered keys
    pub fn keys(&self) -> Vec<Key> {
        self.services.keys().cloned().collect()
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("count", &self.len())
            .field("tags", &self.keys_by_tag.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceKey;
    use std::borrow::Cow;

    #[derive(PartialEq, Eq, Hash)]
    struct Named(&'static str);

    impl ServiceKey for Named {
        fn tag(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }
    }

    #[test]
    fn test_layer_insert_and_lookup() {
        let mut layer = Layer::new();
        layer.insert(Key::from("a"), Service::new(1u8)).unwrap();

        let service = layer.lookup(&Key::from("a")).unwrap();
        assert_eq!(service.downcast_ref::<u8>(), Some(&1));
        assert!(layer.lookup(&Key::from("b")).is_none());
    }

    #[test]
    fn test_layer_lookup_by_tag() {
        let mut layer = Layer::new();
        layer.insert(Key::new(Named("db")), Service::new(2u8)).unwrap();

        // A string key reaches the value key through its tag
        assert!(layer.contains(&Key::from("db")));
    }

    #[test]
    fn test_layer_rejects_duplicates() {
        let mut layer = Layer::new();
        layer.insert(Key::from("db"), Service::new(1u8)).unwrap();

        let same_key = layer.insert(Key::from("db"), Service::new(2u8));
        assert!(matches!(same_key, Err(DiError::DuplicateKey { .. })));

        let same_tag = layer.insert(Key::new(Named("db")), Service::new(3u8));
        assert!(matches!(same_tag, Err(DiError::DuplicateKey { .. })));

        // First value retained
        let service = layer.lookup(&Key::from("db")).unwrap();
        assert_eq!(service.downcast_ref::<u8>(), Some(&1));
        assert_eq!(layer.len(), 1);
    }
}
