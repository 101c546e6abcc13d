//! Registered values
//!
//! A [`Service`] is what a registry stores under a key: a type-erased,
//! shared value that remembers the name of its type so that injection can
//! report what it found when a field cannot accept it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Marker trait for types that can be stored in a registry.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// A type-erased registered value.
///
/// Cloning is cheap: the value itself is behind an `Arc`. A service may also
/// be *nil*, the counterpart of registering "nothing" under a key. A nil
/// service is found by lookups but never converts to any field type.
#[derive(Clone)]
pub struct Service {
    value: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
}

impl Service {
    /// Wrap a value.
    #[inline]
    pub fn new<T: Injectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without another allocation.
    #[inline]
    pub fn from_arc<T: Injectable>(value: Arc<T>) -> Self {
        Self {
            value: Some(value as Arc<dyn Any + Send + Sync>),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The nil service.
    #[inline]
    pub const fn nil() -> Self {
        Self {
            value: None,
            type_name: "nil",
        }
    }

    /// Whether this is the nil service.
    #[inline]
    pub fn is_nil(&self) -> bool {
        self.value.is_none()
    }

    /// Name of the stored value's type, `"nil"` for the nil service.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the stored value has type `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.value.as_ref().is_some_and(|value| value.is::<T>())
    }

    /// Borrow the stored value as `T`.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref::<T>()
    }

    /// Share the stored value as `Arc<T>`.
    ///
    /// Accepts both a value stored as `T` and one stored as `Arc<T>`, so
    /// `registry.set(key, db)` and `registry.set(key, Arc::new(db))` both
    /// satisfy an `Arc<Db>` field.
    pub fn downcast<T: Injectable>(&self) -> Option<Arc<T>> {
        let value = self.value.as_ref()?;
        match Arc::clone(value).downcast::<T>() {
            Ok(shared) => Some(shared),
            Err(_) => value.downcast_ref::<Arc<T>>().cloned(),
        }
    }

    /// Share a value stored as `Arc<T>`.
    ///
    /// Works for unsized `T` such as `str`, slices and trait objects, which
    /// can only be registered behind an `Arc`.
    #[inline]
    pub fn shared<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.downcast_ref::<Arc<T>>().cloned()
    }

    /// Clone the stored value out as `T`.
    #[inline]
    pub fn cloned<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Whether both services share the same allocation (two nils are equal).
    pub fn ptr_eq(&self, other: &Service) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct IntWrapper(i32);

    #[test]
    fn test_downcast_value() {
        let service = Service::new(IntWrapper(42));
        assert!(service.is::<IntWrapper>());
        assert_eq!(*service.downcast::<IntWrapper>().unwrap(), IntWrapper(42));
        assert_eq!(service.cloned::<IntWrapper>(), Some(IntWrapper(42)));
        assert!(service.downcast::<String>().is_none());
    }

    #[test]
    fn test_downcast_shares_allocation() {
        let shared = Arc::new(IntWrapper(1));
        let service = Service::from_arc(Arc::clone(&shared));
        assert!(Arc::ptr_eq(&shared, &service.downcast::<IntWrapper>().unwrap()));
    }

    #[test]
    fn test_downcast_stored_arc() {
        // Registered as Arc<T> by value
        let service = Service::new(Arc::new(IntWrapper(3)));
        assert_eq!(*service.downcast::<IntWrapper>().unwrap(), IntWrapper(3));
        assert!(service.cloned::<IntWrapper>().is_none());
    }

    #[test]
    fn test_shared_unsized() {
        let name: Arc<str> = Arc::from("primary");
        let service = Service::new(Arc::clone(&name));
        assert!(Arc::ptr_eq(&name, &service.shared::<str>().unwrap()));
        assert!(service.shared::<[u8]>().is_none());
        assert!(Service::nil().shared::<str>().is_none());
    }

    #[test]
    fn test_nil() {
        let nil = Service::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.type_name(), "nil");
        assert!(nil.downcast::<IntWrapper>().is_none());
        assert!(nil.cloned::<IntWrapper>().is_none());
        assert!(nil.ptr_eq(&Service::nil()));
    }

    #[test]
    fn test_type_name() {
        let service = Service::new(IntWrapper(0));
        assert!(service.type_name().ends_with("IntWrapper"));
    }
}
