//! # Service Injector - Keyed Service Registry with Field Injection
//!
//! A registry of shared services looked up by key, and a resolver that fills
//! a struct's annotated fields from it.
//!
//! ## Features
//!
//! - **Keyed** - Services are registered under string keys or any hashable
//!   value type; value keys may carry a string tag reachable by string lookup
//! - **Layered** - Child registries shadow reads, while every write lands in
//!   the root of the chain
//! - **Overlays** - Re-point a few keys for one code path without touching
//!   the underlying registry
//! - **Field injection** - `#[derive(Inject)]` describes which fields come
//!   from which keys, including embedded structs and optional fields
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use service_injector::{Inject, Registry};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Default, Inject)]
//! struct UserService {
//!     #[inject("db")]
//!     pub db: Option<Arc<Database>>,
//!     #[inject(key = "greeting", optional)]
//!     pub greeting: String,
//! }
//!
//! let registry = Registry::new();
//! registry.set("db", Database { url: "postgres://localhost".into() }).unwrap();
//!
//! let mut users = UserService::default();
//! registry.inject(&mut users).unwrap();
//!
//! assert_eq!(users.db.unwrap().url, "postgres://localhost");
//! assert!(users.greeting.is_empty());
//! ```
//!
//! ## Layers and Overlays
//!
//! ```rust
//! use service_injector::{Registry, Service};
//!
//! let root = Registry::new();
//! root.set("env", "production").unwrap();
//!
//! // Reads of "env" through the child see the child's value
//! let child = root.with_values([("env", Service::new("test"))]).unwrap();
//! assert_eq!(child.get("env").unwrap().cloned::<&str>(), Some("test"));
//!
//! // Writes through the child land in the root
//! child.set("region", "eu-west-1").unwrap();
//! assert!(root.contains("region"));
//!
//! // An overlay never writes its map anywhere
//! let overlay = root.overlay([("region", Service::new("us-east-1"))]);
//! assert_eq!(overlay.get("region").unwrap().cloned::<&str>(), Some("us-east-1"));
//! assert_eq!(root.get("region").unwrap().cloned::<&str>(), Some("eu-west-1"));
//! ```

// Lets the derive macro's `::service_injector` paths resolve inside this crate
extern crate self as service_injector;

pub mod context;
mod descriptor;
mod error;
mod inject;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod overlay;
mod registry;
mod service;
mod storage;

pub use descriptor::*;
pub use error::*;
pub use inject::{__private, inject};
pub use key::*;
pub use overlay::*;
pub use registry::*;
pub use service::*;

#[cfg(feature = "derive")]
pub use service_injector_derive::Inject;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BoxError, DiError, Inject, Injectable, Key, Overlay, PostInject, Registry, Resolve,
        Result, Service, ServiceKey,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::sync::Arc;

    #[derive(PartialEq, Eq, Hash)]
    struct Slot(&'static str);

    impl ServiceKey for Slot {
        fn tag(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }
    }

    #[derive(Clone)]
    struct Database {
        url: String,
    }

    #[test]
    fn test_set_then_get_returns_same_value() {
        let registry = Registry::new();
        let db = Arc::new(Database { url: "test".into() });
        registry.set_arc("db", Arc::clone(&db)).unwrap();

        let resolved = registry.get("db").unwrap().downcast::<Database>().unwrap();
        assert!(Arc::ptr_eq(&db, &resolved));
    }

    #[test]
    fn test_tagged_key_reachable_by_string() {
        let registry = Registry::new();
        registry.set(Key::new(Slot("primary")), Database { url: "p".into() }).unwrap();

        let by_tag = registry.get("primary").unwrap().cloned::<Database>().unwrap();
        assert_eq!(by_tag.url, "p");

        // The string now collides with the tag
        assert!(registry.set("primary", 0u8).is_err());
    }

    #[test]
    fn test_layered_reads_and_writes() {
        let root = Registry::new();
        root.set("shared", 1u32).unwrap();

        let child = root
            .with_values([("shared", Service::new(2u32))])
            .unwrap();
        assert_eq!(child.get("shared").unwrap().cloned::<u32>(), Some(2));
        assert_eq!(root.get("shared").unwrap().cloned::<u32>(), Some(1));

        child.set("added", 3u32).unwrap();
        assert_eq!(root.get("added").unwrap().cloned::<u32>(), Some(3));
    }

    #[test]
    fn test_overlay_is_read_only_shadow() {
        let root = Registry::new();
        root.set("shared", 1u32).unwrap();

        let overlay = root.overlay([("shared", Service::new(5u32))]);
        overlay.set("new", 6u32).unwrap();

        assert_eq!(overlay.get("shared").unwrap().cloned::<u32>(), Some(5));
        assert_eq!(root.get("shared").unwrap().cloned::<u32>(), Some(1));
        assert_eq!(root.get("new").unwrap().cloned::<u32>(), Some(6));
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let registry: Registry = Registry::default();
        let result: Result<Service> = registry.get("nothing");
        assert!(matches!(result, Err(DiError::NotFound { .. })));
        let _: Arc<u8> = Arc::new(0);
    }
}
