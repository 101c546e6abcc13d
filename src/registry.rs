//! Layered service registry
//!
//! The `Registry` maps keys to services. Layers created with
//! [`Registry::with_values`] shadow reads for the keys they were seeded with
//! and delegate every write to the root of their chain, so all registrations
//! across a hierarchy converge on one authoritative store.

use crate::storage::Layer;
use crate::{DiError, Inject, Injectable, Key, Overlay, Result, Service};
use parking_lot::RwLock;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Read capability the resolver needs from a registry.
///
/// Implemented by [`Registry`] and [`Overlay`]; implement it to inject from
/// any other source of services.
pub trait Resolve: Send + Sync {
    /// Look up the service registered to a key.
    fn resolve(&self, key: &Key) -> Result<Service>;
}

struct Inner {
    /// Local store, guarded by one reader/writer lock
    layer: RwLock<Layer>,
    /// Registry this layer was created over
    parent: Option<Registry>,
    /// Layer depth for debugging (0 = root)
    depth: u32,
}

/// Keyed service registry.
///
/// `Registry` is a cheap handle: clones share the same store. Lookups take a
/// shared lock, registrations an exclusive one, and no lock is held while
/// calling into another layer.
///
/// # Examples
///
/// ```rust
/// use service_injector::Registry;
///
/// #[derive(Clone)]
/// struct Database { url: String }
///
/// let registry = Registry::new();
/// registry.set("db", Database { url: "postgres://localhost".into() }).unwrap();
///
/// let db = registry.get("db").unwrap().downcast::<Database>().unwrap();
/// assert_eq!(db.url, "postgres://localhost");
///
/// // Keys are unique
/// assert!(registry.set("db", Database { url: "other".into() }).is_err());
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    /// Create a new, empty root registry.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a root registry with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "service_injector",
            capacity = capacity,
            "Creating new root registry"
        );

        Self::from_layer(Layer::with_capacity(capacity), None)
    }

    fn from_layer(layer: Layer, parent: Option<Registry>) -> Self {
        let depth = parent.as_ref().map_or(0, |parent| parent.depth() + 1);
        Self {
            inner: Arc::new(Inner {
                layer: RwLock::new(layer),
                parent,
                depth,
            }),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a value under a key.
    ///
    /// Fails with [`DiError::DuplicateKey`] if this layer already holds the
    /// key or another key with the same tag. On a layered registry the write
    /// goes to the root, after the same check has passed on every layer on
    /// the way up.
    #[inline]
    pub fn set<T: Injectable>(&self, key: impl Into<Key>, value: T) -> Result<()> {
        self.set_service(key, Service::new(value))
    }

    /// Register an already shared value.
    #[inline]
    pub fn set_arc<T: Injectable>(&self, key: impl Into<Key>, value: Arc<T>) -> Result<()> {
        self.set_service(key, Service::from_arc(value))
    }

    /// Register a type-erased service, e.g. [`Service::nil`].
    pub fn set_service(&self, key: impl Into<Key>, service: Service) -> Result<()> {
        let key = key.into();
        let mut current = self;

        // Every layer on the way to the root must be free of the key
        while let Some(parent) = current.inner.parent.as_ref() {
            if let Err(err) = current.inner.layer.read().ensure_vacant(&key) {
                #[cfg(feature = "logging")]
                debug!(
                    target: "service_injector",
                    key = %key,
                    depth = current.depth(),
                    "Rejected duplicate registration"
                );
                return Err(err);
            }
            current = parent;
        }

        let result = current.inner.layer.write().insert(key.clone(), service);

        #[cfg(feature = "logging")]
        match &result {
            Ok(()) => debug!(
                target: "service_injector",
                key = %key,
                depth = self.depth(),
                delegated = self.depth() > 0,
                "Registered service"
            ),
            Err(_) => debug!(
                target: "service_injector",
                key = %key,
                "Rejected duplicate registration"
            ),
        }

        result
    }

    /// Register a value, panicking if the key is taken.
    ///
    /// Meant for start-up wiring, where a clash is a programming error.
    #[track_caller]
    pub fn must_set<T: Injectable>(&self, key: impl Into<Key>, value: T) {
        if let Err(err) = self.set(key, value) {
            panic!("{err}");
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look up the service registered to a key.
    ///
    /// Each layer is checked by key and then by the key's tag before falling
    /// back to the parent.
    #[inline]
    pub fn get(&self, key: impl Into<Key>) -> Result<Service> {
        let key = key.into();
        match self.lookup(&key) {
            Some(service) => Ok(service),
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "service_injector",
                    key = %key,
                    depth = self.depth(),
                    "Service not found in registry or parent chain"
                );
                Err(DiError::not_found(&key))
            }
        }
    }

    /// Look up a service, panicking if it is missing.
    #[track_caller]
    pub fn must_get(&self, key: impl Into<Key>) -> Service {
        match self.get(key) {
            Ok(service) => service,
            Err(err) => panic!("{err}"),
        }
    }

    /// Walk the chain for a key. Misses are left to the caller to report.
    fn lookup(&self, key: &Key) -> Option<Service> {
        let mut current = Some(self);

        while let Some(registry) = current {
            if let Some(service) = registry.inner.layer.read().lookup(key) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "service_injector",
                    key = %key,
                    depth = self.depth(),
                    found_depth = registry.depth(),
                    "Service resolved"
                );
                return Some(service.clone());
            }
            current = registry.inner.parent.as_ref();
        }

        None
    }

    /// Check if a key resolves in this registry or any parent.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        let mut current = Some(self);

        while let Some(registry) = current {
            if registry.inner.layer.read().contains(&key) {
                return true;
            }
            current = registry.inner.parent.as_ref();
        }

        false
    }

    // =========================================================================
    // Layering
    // =========================================================================

    /// Create a child registry that shadows reads with the given services.
    ///
    /// The services are registered into a fresh layer through the usual
    /// validation, so two entries with the same tag are rejected. Later
    /// [`set`](Registry::set) calls on the child modify this registry (more
    /// precisely, the root of its chain).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_injector::{Registry, Service};
    ///
    /// let base = Registry::new();
    /// base.set("mode", "production").unwrap();
    ///
    /// let child = base.with_values([("mode", Service::new("test"))]).unwrap();
    /// assert_eq!(child.get("mode").unwrap().cloned::<&str>(), Some("test"));
    /// assert_eq!(base.get("mode").unwrap().cloned::<&str>(), Some("production"));
    ///
    /// child.set("port", 8080u16).unwrap();
    /// assert!(base.contains("port"));
    /// ```
    pub fn with_values<K, I>(&self, services: I) -> Result<Registry>
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Service)>,
    {
        let mut layer = Layer::new();
        for (key, service) in services {
            layer.insert(key.into(), service)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_injector",
            parent_depth = self.depth(),
            shadowed = layer.len(),
            "Creating layered registry"
        );

        Ok(Self::from_layer(layer, Some(self.clone())))
    }

    /// Like [`with_values`](Registry::with_values), panicking on a clash.
    #[track_caller]
    pub fn must_with_values<K, I>(&self, services: I) -> Registry
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Service)>,
    {
        match self.with_values(services) {
            Ok(registry) => registry,
            Err(err) => panic!("{err}"),
        }
    }

    /// Wrap this registry in a read-only shadow map. See [`Overlay`].
    #[inline]
    pub fn overlay<K, I>(&self, services: I) -> Overlay
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Service)>,
    {
        Overlay::new(self, services)
    }

    /// Populate `target`'s annotated fields from this registry.
    ///
    /// Shorthand for [`inject`](crate::inject)`(self, target)`.
    #[inline]
    pub fn inject<T: Inject>(&self, target: &mut T) -> Result<()> {
        crate::inject(self, target)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Number of services in this layer (not including parents).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.layer.read().len()
    }

    /// Check if this layer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.layer.read().is_empty()
    }

    /// Keys registered in this layer.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.layer.read().keys()
    }

    /// Layer depth (0 = root).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.inner.depth
    }

    /// Whether this registry has no parent.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// The registry this one was layered over.
    #[inline]
    pub fn parent(&self) -> Option<&Registry> {
        self.inner.parent.as_ref()
    }

    /// Whether both handles share one store.
    #[inline]
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Resolve for Registry {
    #[inline]
    fn resolve(&self, key: &Key) -> Result<Service> {
        self.lookup(key).ok_or_else(|| DiError::not_found(key))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("service_count", &self.len())
            .field("depth", &self.inner.depth)
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}
