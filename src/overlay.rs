//! Read-shadowing overlays
//!
//! An [`Overlay`] re-assigns services for one specialised code path, e.g. a
//! logger carrying request fields for a short-lived handler, without touching
//! the registry it wraps.

use crate::{Inject, Injectable, Key, Registry, Resolve, Result, Service};
use ahash::RandomState;
use std::collections::HashMap;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A registry wrapped in a fixed map of services.
///
/// Lookups check the map by exact key and then fall through to the wrapped
/// registry. Writes go straight to the wrapped registry and never touch the
/// map. The map is fixed at construction, so reads need no locking of their
/// own.
///
/// Unlike [`Registry::with_values`], the map is not validated: it may hold
/// keys the base already has, or two keys sharing a tag.
///
/// # Examples
///
/// ```rust
/// use service_injector::{Registry, Service};
///
/// let registry = Registry::new();
/// registry.set("a", 10).unwrap();
/// registry.set("b", 20).unwrap();
///
/// let overlay = registry.overlay([("a", Service::new(40))]);
/// assert_eq!(overlay.get("a").unwrap().cloned::<i32>(), Some(40));
/// assert_eq!(overlay.get("b").unwrap().cloned::<i32>(), Some(20));
///
/// // The base is untouched
/// assert_eq!(registry.get("a").unwrap().cloned::<i32>(), Some(10));
/// ```
#[derive(Clone)]
pub struct Overlay {
    base: Registry,
    shadow: HashMap<Key, Service, RandomState>,
}

impl Overlay {
    /// Wrap `base` with the given services.
    pub fn new<K, I>(base: &Registry, services: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Service)>,
    {
        let shadow: HashMap<Key, Service, RandomState> = services
            .into_iter()
            .map(|(key, service)| (key.into(), service))
            .collect();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_injector",
            base_depth = base.depth(),
            shadowed = shadow.len(),
            "Creating overlay"
        );

        Self {
            base: base.clone(),
            shadow,
        }
    }

    /// Look up a service, preferring the overlay map.
    pub fn get(&self, key: impl Into<Key>) -> Result<Service> {
        let key = key.into();
        let result = self.resolve(&key);

        #[cfg(feature = "logging")]
        if result.is_err() {
            debug!(
                target: "service_injector",
                key = %key,
                "Service not found in overlay or base registry"
            );
        }

        result
    }

    /// Look up a service, panicking if it is missing.
    #[track_caller]
    pub fn must_get(&self, key: impl Into<Key>) -> Service {
        match self.get(key) {
            Ok(service) => service,
            Err(err) => panic!("{err}"),
        }
    }

    /// Register a value in the wrapped registry.
    #[inline]
    pub fn set<T: Injectable>(&self, key: impl Into<Key>, value: T) -> Result<()> {
        self.base.set(key, value)
    }

    /// Register a type-erased service in the wrapped registry.
    #[inline]
    pub fn set_service(&self, key: impl Into<Key>, service: Service) -> Result<()> {
        self.base.set_service(key, service)
    }

    /// Register a value in the wrapped registry, panicking if the key is taken.
    #[track_caller]
    pub fn must_set<T: Injectable>(&self, key: impl Into<Key>, value: T) {
        self.base.must_set(key, value);
    }

    /// Populate `target`'s annotated fields, favouring overlay services.
    #[inline]
    pub fn inject<T: Inject>(&self, target: &mut T) -> Result<()> {
        crate::inject(self, target)
    }

    /// The wrapped registry.
    #[inline]
    pub fn base(&self) -> &Registry {
        &self.base
    }

    /// Number of services in the overlay map.
    #[inline]
    pub fn len(&self) -> usize {
        self.shadow.len()
    }

    /// Check if the overlay map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shadow.is_empty()
    }
}

impl Resolve for Overlay {
    fn resolve(&self, key: &Key) -> Result<Service> {
        if let Some(service) = self.shadow.get(key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_injector",
                key = %key,
                location = "overlay",
                "Service resolved"
            );
            return Ok(service.clone());
        }

        self.base.resolve(key)
    }
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("shadowed", &self.shadow.len())
            .field("base", &self.base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiError;

    #[derive(Clone, Debug, PartialEq)]
    struct IntWrapper(i32);

    fn base() -> Registry {
        let registry = Registry::new();
        registry.set("a", IntWrapper(10)).unwrap();
        registry.set("b", IntWrapper(20)).unwrap();
        registry.set("c", IntWrapper(30)).unwrap();
        registry
    }

    fn int(overlay: &Overlay, key: &str) -> Option<IntWrapper> {
        overlay.get(key).unwrap().cloned::<IntWrapper>()
    }

    #[test]
    fn test_get() {
        let overlay = base().overlay([
            ("a", Service::new(IntWrapper(40))),
            ("d", Service::new(IntWrapper(50))),
        ]);

        assert_eq!(int(&overlay, "a"), Some(IntWrapper(40)));
        assert_eq!(int(&overlay, "b"), Some(IntWrapper(20)));
        assert_eq!(int(&overlay, "c"), Some(IntWrapper(30)));
        assert_eq!(int(&overlay, "d"), Some(IntWrapper(50)));
        assert_eq!(overlay.len(), 2);
    }

    #[test]
    fn test_set_writes_to_base() {
        let registry = base();
        let overlay = Overlay::new(&registry, [("a", Service::new(IntWrapper(40)))]);

        overlay.set("e", IntWrapper(60)).unwrap();
        assert_eq!(
            registry.get("e").unwrap().cloned::<IntWrapper>(),
            Some(IntWrapper(60))
        );
        assert_eq!(overlay.len(), 1);

        // Shadowed keys still collide in the base
        assert!(matches!(
            overlay.set("a", IntWrapper(0)),
            Err(DiError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_shadow_not_validated() {
        // Same key as the base is fine in an overlay
        let registry = base();
        let overlay = registry.overlay([("b", Service::new(IntWrapper(1)))]);
        assert_eq!(int(&overlay, "b"), Some(IntWrapper(1)));
        assert_eq!(
            registry.get("b").unwrap().cloned::<IntWrapper>(),
            Some(IntWrapper(20))
        );
    }

    #[test]
    fn test_missing_falls_through_to_base_error() {
        let overlay = base().overlay(Vec::<(Key, Service)>::new());
        let err = overlay.get("zzz").unwrap_err();
        assert!(err.is_not_found());
        assert!(overlay.is_empty());
    }

    #[test]
    #[should_panic(expected = "no service registered")]
    fn test_must_get_panics() {
        base().overlay([("a", Service::new(IntWrapper(1)))]).must_get("unregistered");
    }

    #[test]
    #[should_panic(expected = r#"duplicate service key "a""#)]
    fn test_must_set_panics() {
        // Writes go to the base, which already holds "a"
        let overlay = base().overlay(Vec::<(Key, Service)>::new());
        overlay.must_set("a", IntWrapper(1));
    }
}
