//! Field descriptors for injection targets
//!
//! An injection target describes its fields once, as a [`Descriptor`]: an
//! ordered list of service fields (a registry key to resolve plus a setter)
//! and embedded fields (a nested target whose fields are promoted into the
//! same pass), and an optional post-injection hook. `#[derive(Inject)]`
//! writes descriptors for you; the builder below is the manual route.
//!
//! # Example
//!
//! ```rust
//! use service_injector::{Descriptor, Field, Inject, Registry, Service};
//! use std::sync::Arc;
//!
//! struct Database(String);
//!
//! #[derive(Default)]
//! struct Handler {
//!     db: Option<Arc<Database>>,
//! }
//!
//! impl Inject for Handler {
//!     fn describe() -> Descriptor<Self> {
//!         Descriptor::new().field(Field::service::<Option<Arc<Database>>>(
//!             "db",
//!             "database",
//!             |handler: &mut Self, service: &Service| match service.downcast::<Database>() {
//!                 Some(db) => {
//!                     handler.db = Some(db);
//!                     true
//!                 }
//!                 None => false,
//!             },
//!         ))
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry.set("database", Database("postgres://localhost".into())).unwrap();
//!
//! let mut handler = Handler::default();
//! registry.inject(&mut handler).unwrap();
//! assert_eq!(handler.db.unwrap().0, "postgres://localhost");
//! ```

use crate::{BoxError, DiError, Resolve, Result, Service};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Converts a resolved service and stores it in the field. Returns `false`
/// when the service cannot be converted to the field's type.
pub type Setter<T> = fn(&mut T, &Service) -> bool;

/// Injects an embedded field in place, returning how many annotated fields
/// the nested walk found.
pub type Walker<T> = fn(&mut T, &dyn Resolve) -> Result<usize>;

/// Post-injection hook.
pub type Hook<T> = fn(&mut T) -> std::result::Result<(), BoxError>;

/// A type whose fields can be populated from a registry.
///
/// Usually derived. Types without fields to inject describe themselves with
/// an empty descriptor, which makes injecting them a no-op.
pub trait Inject: 'static {
    /// Build the field descriptors of this type.
    ///
    /// Called once per type; the result is cached for the life of the process.
    fn describe() -> Descriptor<Self>
    where
        Self: Sized;
}

/// Optional callback run after a target's own fields have been injected.
///
/// With `#[derive(Inject)]`, opt in with `#[inject(post_inject)]` on the struct.
pub trait PostInject {
    /// Finish initialisation from the injected fields.
    fn post_inject(&mut self) -> std::result::Result<(), BoxError>;
}

/// How one field takes part in injection
pub enum FieldKind<T> {
    /// Annotated with a registry key
    Service(ServiceField<T>),
    /// Nested target promoted into the parent's pass
    Embedded(EmbeddedField<T>),
}

/// A field annotated with a registry key
pub struct ServiceField<T> {
    key: &'static str,
    optional: Option<&'static str>,
    declared_type: &'static str,
    setter: Option<Setter<T>>,
}

impl<T> ServiceField<T> {
    /// Registry key named by the injection annotation.
    #[inline]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Raw optionality annotation, if present.
    #[inline]
    pub fn optional_annotation(&self) -> Option<&'static str> {
        self.optional
    }

    /// Name of the field's declared type.
    #[inline]
    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    /// Whether the field can be assigned.
    #[inline]
    pub fn is_settable(&self) -> bool {
        self.setter.is_some()
    }

    #[inline]
    pub(crate) fn setter(&self) -> Option<Setter<T>> {
        self.setter
    }
}

/// An embedded (promoted) field
pub struct EmbeddedField<T> {
    walker: Option<Walker<T>>,
}

impl<T> EmbeddedField<T> {
    /// Whether the nested target can be reached.
    #[inline]
    pub fn is_accessible(&self) -> bool {
        self.walker.is_some()
    }

    #[inline]
    pub(crate) fn walker(&self) -> Option<Walker<T>> {
        self.walker
    }
}

/// One entry of a [`Descriptor`]
pub struct Field<T> {
    name: &'static str,
    kind: FieldKind<T>,
}

impl<T> Field<T> {
    /// A settable field resolved from `key`. `F` is the field's declared type.
    #[inline]
    pub fn service<F: ?Sized>(name: &'static str, key: &'static str, setter: Setter<T>) -> Self {
        Self {
            name,
            kind: FieldKind::Service(ServiceField {
                key,
                optional: None,
                declared_type: std::any::type_name::<F>(),
                setter: Some(setter),
            }),
        }
    }

    /// An annotated field that cannot be assigned. Injecting it fails with
    /// [`DiError::InvalidField`] once its key resolves.
    #[inline]
    pub fn sealed<F: ?Sized>(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Service(ServiceField {
                key,
                optional: None,
                declared_type: std::any::type_name::<F>(),
                setter: None,
            }),
        }
    }

    /// An embedded field injected through `walker`.
    #[inline]
    pub fn embedded(name: &'static str, walker: Walker<T>) -> Self {
        Self {
            name,
            kind: FieldKind::Embedded(EmbeddedField {
                walker: Some(walker),
            }),
        }
    }

    /// An embedded field that cannot be reached; it is skipped.
    #[inline]
    pub fn hidden(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Embedded(EmbeddedField { walker: None }),
        }
    }

    /// Attach an optionality annotation. It must parse as a boolean when the
    /// field is injected.
    #[inline]
    pub fn optional(mut self, annotation: &'static str) -> Self {
        if let FieldKind::Service(service) = &mut self.kind {
            service.optional = Some(annotation);
        }
        self
    }

    /// Field name, used in error messages.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How the field takes part in injection.
    #[inline]
    pub fn kind(&self) -> &FieldKind<T> {
        &self.kind
    }

    /// Whether a failed lookup of this field is tolerated.
    ///
    /// Embedded fields and fields without the annotation are required.
    pub fn is_optional(&self) -> Result<bool> {
        match &self.kind {
            FieldKind::Service(ServiceField {
                optional: Some(annotation),
                ..
            }) => parse_bool(annotation).ok_or_else(|| DiError::invalid_tag(self.name, *annotation)),
            _ => Ok(false),
        }
    }
}

/// Boolean parsing with the spellings accepted by optionality annotations.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Field descriptors and hook of one target type
pub struct Descriptor<T> {
    type_name: &'static str,
    fields: Vec<Field<T>>,
    hook: Option<Hook<T>>,
}

impl<T: 'static> Descriptor<T> {
    /// An empty descriptor: no fields, no hook.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            fields: Vec::new(),
            hook: None,
        }
    }

    /// Append a field. Fields are injected in the order they are added.
    #[inline]
    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the post-injection hook.
    #[inline]
    pub fn hook(mut self, hook: Hook<T>) -> Self {
        self.hook = Some(hook);
        self
    }
}

impl<T> Descriptor<T> {
    /// Name of the described type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in injection order.
    #[inline]
    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    /// The post-injection hook, if any.
    #[inline]
    pub fn post_inject(&self) -> Option<Hook<T>> {
        self.hook
    }
}

impl<T: 'static> Default for Descriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.iter().map(Field::name).collect::<Vec<_>>())
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}

// =============================================================================
// Descriptor cache
// =============================================================================

static DESCRIPTORS: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>, RandomState>> =
    Lazy::new(|| DashMap::with_hasher(RandomState::new()));

/// The cached descriptor of `T`, built on first use.
pub fn descriptor_of<T: Inject>() -> Arc<Descriptor<T>> {
    let type_id = TypeId::of::<T>();

    if let Some(cached) = DESCRIPTORS.get(&type_id) {
        if let Ok(descriptor) = Arc::clone(cached.value()).downcast::<Descriptor<T>>() {
            return descriptor;
        }
    }

    // Built outside the map lock; a racing thread may build it too, and the
    // first insert wins.
    let built = Arc::new(T::describe());
    let entry = DESCRIPTORS
        .entry(type_id)
        .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>);

    Arc::clone(entry.value())
        .downcast::<Descriptor<T>>()
        .unwrap_or(built)
}

// =============================================================================
// Non-struct targets
// =============================================================================

macro_rules! opaque_targets {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Inject for $ty {
                #[inline]
                fn describe() -> Descriptor<Self> {
                    Descriptor::new()
                }
            }
        )*
    };
}

opaque_targets!(
    (),
    bool,
    char,
    String,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);

impl<T: Inject> Inject for Box<T> {
    fn describe() -> Descriptor<Self> {
        Descriptor::new().field(Field::embedded("*", |boxed: &mut Self, registry: &dyn Resolve| {
            crate::inject::walk(&mut **boxed, registry)
        }))
    }
}

impl<T: Inject> Inject for Option<T> {
    fn describe() -> Descriptor<Self> {
        Descriptor::new().field(Field::embedded("*", |slot: &mut Self, registry: &dyn Resolve| {
            match slot {
                Some(target) => crate::inject::walk(target, registry),
                None => Ok(0),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        value: u32,
    }

    impl Inject for Plain {
        fn describe() -> Descriptor<Self> {
            Descriptor::new()
                .field(
                    Field::service::<u32>("value", "value", |plain: &mut Self, service: &Service| {
                        service.cloned::<u32>().map(|v| plain.value = v).is_some()
                    })
                    .optional("yes"),
                )
                .field(Field::sealed::<u32>("locked", "locked"))
                .field(Field::hidden("inner"))
        }
    }

    #[test]
    fn test_builder() {
        let descriptor = Plain::describe();
        assert!(descriptor.type_name().ends_with("Plain"));
        assert_eq!(descriptor.fields().len(), 3);
        assert!(descriptor.post_inject().is_none());

        let names: Vec<_> = descriptor.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["value", "locked", "inner"]);

        match descriptor.fields()[0].kind() {
            FieldKind::Service(service) => {
                assert_eq!(service.key(), "value");
                assert_eq!(service.declared_type(), "u32");
                assert_eq!(service.optional_annotation(), Some("yes"));
                assert!(service.is_settable());
            }
            FieldKind::Embedded(_) => panic!("expected a service field"),
        }

        match descriptor.fields()[2].kind() {
            FieldKind::Embedded(embedded) => assert!(!embedded.is_accessible()),
            FieldKind::Service(_) => panic!("expected an embedded field"),
        }
    }

    #[test]
    fn test_optional_annotation() {
        let descriptor = Plain::describe();
        let err = descriptor.fields()[0].is_optional().unwrap_err();
        assert!(matches!(err, DiError::InvalidTag { field: "value", .. }));

        assert_eq!(descriptor.fields()[1].is_optional().unwrap(), false);

        let field = Field::<Plain>::sealed::<u32>("x", "x").optional("True");
        assert!(field.is_optional().unwrap());
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(yes), Some(true));
        }
        for no in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(no), Some(false));
        }
        for bad in ["", "yup", "tRUE", "2"] {
            assert_eq!(parse_bool(bad), None);
        }
    }

    #[test]
    fn test_descriptor_cached() {
        let first = descriptor_of::<Plain>();
        let second = descriptor_of::<Plain>();
        assert!(Arc::ptr_eq(&first, &second));

        // Plain's value is written only through its setter
        let mut plain = Plain { value: 0 };
        let setter = match first.fields()[0].kind() {
            FieldKind::Service(service) => service.setter().unwrap(),
            FieldKind::Embedded(_) => unreachable!(),
        };
        assert!(setter(&mut plain, &Service::new(9u32)));
        assert_eq!(plain.value, 9);
    }

    #[test]
    fn test_opaque_targets_are_empty() {
        assert!(descriptor_of::<String>().fields().is_empty());
        assert!(descriptor_of::<()>().fields().is_empty());
        assert_eq!(descriptor_of::<Option<Plain>>().fields().len(), 1);
    }
}
