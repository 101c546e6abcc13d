//! Registry keys and their alias tags
//!
//! A [`Key`] is either a string or an arbitrary value whose type implements
//! [`ServiceKey`]. String keys are their own tag. A value key may declare a
//! tag too, which makes it resolvable by that string: a string `"db"` and a
//! value key tagged `"db"` name the same slot in a registry.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A value usable as a registry key.
///
/// Implement this for your own key types. Override [`tag`](ServiceKey::tag)
/// when the key should also be reachable through a string, e.g. from an
/// `#[inject("...")]` annotation.
///
/// # Examples
///
/// ```rust
/// use service_injector::{Key, Registry, ServiceKey};
/// use std::borrow::Cow;
///
/// #[derive(PartialEq, Eq, Hash)]
/// struct DatabaseKey;
///
/// impl ServiceKey for DatabaseKey {
///     fn tag(&self) -> Option<Cow<'_, str>> {
///         Some(Cow::Borrowed("db"))
///     }
/// }
///
/// let registry = Registry::new();
/// registry.set(Key::new(DatabaseKey), 5432u16).unwrap();
///
/// // Reachable through its tag
/// let port = registry.get("db").unwrap();
/// assert_eq!(port.downcast_ref::<u16>(), Some(&5432));
/// ```
pub trait ServiceKey: Any + Send + Sync + Eq + Hash {
    /// String alias for this key, if any.
    fn tag(&self) -> Option<Cow<'_, str>> {
        None
    }
}

/// Object-safe view of a [`ServiceKey`]
trait DynKey: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn eq_key(&self, other: &dyn DynKey) -> bool;
    fn hash_key(&self, state: &mut dyn Hasher);
    fn tag(&self) -> Option<Cow<'_, str>>;
    fn type_name(&self) -> &'static str;
}

impl<K: ServiceKey> DynKey for K {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_key(&self, other: &dyn DynKey) -> bool {
        other
            .as_any()
            .downcast_ref::<K>()
            .is_some_and(|other| other == self)
    }

    fn hash_key(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<K>().hash(&mut state);
        self.hash(&mut state);
    }

    fn tag(&self) -> Option<Cow<'_, str>> {
        ServiceKey::tag(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<K>()
    }
}

#[derive(Clone)]
enum Repr {
    Name(Arc<str>),
    Value(Arc<dyn DynKey>),
}

/// Opaque, cheaply cloneable registry key.
#[derive(Clone)]
pub struct Key(Repr);

impl Key {
    /// Create a key from a [`ServiceKey`] value.
    #[inline]
    pub fn new<K: ServiceKey>(key: K) -> Self {
        Self(Repr::Value(Arc::new(key)))
    }

    /// Alias tag of this key.
    ///
    /// Strings are their own tag. Value keys return whatever
    /// [`ServiceKey::tag`] declares.
    #[inline]
    pub fn tag(&self) -> Option<Cow<'_, str>> {
        match &self.0 {
            Repr::Name(name) => Some(Cow::Borrowed(&**name)),
            Repr::Value(value) => value.tag(),
        }
    }

    /// The string, if this is a string key.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            Repr::Name(name) => Some(&**name),
            Repr::Value(_) => None,
        }
    }

    /// Borrow the key value if it has type `K`.
    #[inline]
    pub fn downcast_ref<K: ServiceKey>(&self) -> Option<&K> {
        match &self.0 {
            Repr::Name(_) => None,
            Repr::Value(value) => value.as_any().downcast_ref::<K>(),
        }
    }

    /// Unqualified name of the key's type.
    pub fn type_name(&self) -> &'static str {
        match &self.0 {
            Repr::Name(_) => "str",
            Repr::Value(value) => short_type_name(value.type_name()),
        }
    }
}

/// Strip the module path from a type name, keeping generic arguments as-is.
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Repr::Name(a), Repr::Name(b)) => a == b,
            (Repr::Value(a), Repr::Value(b)) => a.eq_key(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Repr::Name(name) => {
                state.write_u8(0);
                name.hash(state);
            }
            Repr::Value(value) => {
                state.write_u8(1);
                value.hash_key(state);
            }
        }
    }
}

/// Human-readable rendering used in error messages: strings are quoted,
/// tagged value keys render as `Type ("tag")`, untagged ones as `Type`.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Name(name) => write!(f, "\"{name}\""),
            Repr::Value(value) => match value.tag() {
                Some(tag) => write!(f, "{} (\"{tag}\")", self.type_name()),
                None => f.write_str(self.type_name()),
            },
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl From<&str> for Key {
    #[inline]
    fn from(name: &str) -> Self {
        Self(Repr::Name(Arc::from(name)))
    }
}

impl From<String> for Key {
    #[inline]
    fn from(name: String) -> Self {
        Self(Repr::Name(Arc::from(name)))
    }
}

impl From<&String> for Key {
    #[inline]
    fn from(name: &String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<&Key> for Key {
    #[inline]
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
