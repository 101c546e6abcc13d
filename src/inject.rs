//! Field injection
//!
//! Walks a target's [`Descriptor`](crate::Descriptor), resolving each
//! annotated field from a registry and assigning it. Embedded fields are
//! walked in the same pass, as if their fields belonged to the outer target.
//! Each target's post-injection hook runs once its own fields are done.

use crate::descriptor::{FieldKind, descriptor_of};
use crate::{DiError, Inject, Key, Resolve, Result};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Populate the annotated fields of `target` from `registry`.
///
/// Fields are visited in declaration order. The first failure stops the
/// walk; fields already assigned keep their new values.
///
/// A field whose lookup fails is left untouched when its optionality
/// annotation parses as `true`. Every other failure is returned:
///
/// - a missing required service: [`DiError::NotFound`]
/// - an annotation that is not a boolean: [`DiError::InvalidTag`]
/// - a field that cannot be assigned: [`DiError::InvalidField`]
/// - a service of the wrong type, or nil: [`DiError::TypeMismatch`]
/// - a failing post-injection hook: [`DiError::Hook`], message unchanged
///
/// # Examples
///
/// ```rust
/// use service_injector::{Descriptor, Field, Inject, Registry, Service};
///
/// #[derive(Default)]
/// struct Config {
///     port: u16,
/// }
///
/// impl Inject for Config {
///     fn describe() -> Descriptor<Self> {
///         Descriptor::new().field(Field::service::<u16>("port", "port", |config: &mut Self, service: &Service| {
///             service.cloned::<u16>().map(|port| config.port = port).is_some()
///         }))
///     }
/// }
///
/// let registry = Registry::new();
/// registry.set("port", 8080u16).unwrap();
///
/// let mut config = Config::default();
/// service_injector::inject(&registry, &mut config).unwrap();
/// assert_eq!(config.port, 8080);
/// ```
pub fn inject<T: Inject>(registry: &dyn Resolve, target: &mut T) -> Result<()> {
    #[cfg(feature = "logging")]
    debug!(
        target: "service_injector",
        target_type = std::any::type_name::<T>(),
        "Injecting target"
    );

    walk(target, registry).map(|_| ())
}

/// Inject one target. Returns the number of annotated fields found in it
/// and its embedded fields, whether or not they resolved.
pub(crate) fn walk<T: Inject>(target: &mut T, registry: &dyn Resolve) -> Result<usize> {
    let descriptor = descriptor_of::<T>();
    let mut annotated = 0;

    for field in descriptor.fields() {
        match field.kind() {
            FieldKind::Embedded(embedded) => {
                let Some(walker) = embedded.walker() else {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "service_injector",
                        field = field.name(),
                        "Skipping inaccessible embedded field"
                    );
                    continue;
                };
                annotated += walker(target, registry)?;
            }
            FieldKind::Service(service_field) => {
                annotated += 1;

                let optional = field.is_optional()?;
                let key = Key::from(service_field.key());

                let service = match registry.resolve(&key) {
                    Ok(service) => service,
                    Err(_) if optional => continue,
                    Err(err) => {
                        #[cfg(feature = "logging")]
                        debug!(
                            target: "service_injector",
                            field = field.name(),
                            key = %key,
                            "Service not found for required field"
                        );
                        return Err(err);
                    }
                };

                let Some(setter) = service_field.setter() else {
                    return Err(DiError::invalid_field(field.name()));
                };

                if !setter(target, &service) {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "service_injector",
                        field = field.name(),
                        declared_type = service_field.declared_type(),
                        found_type = service.type_name(),
                        "Service type does not fit field"
                    );
                    return Err(DiError::type_mismatch(field.name(), service.type_name()));
                }

                #[cfg(feature = "logging")]
                trace!(
                    target: "service_injector",
                    field = field.name(),
                    key = %key,
                    "Field injected"
                );
            }
        }
    }

    if let Some(hook) = descriptor.post_inject() {
        #[cfg(feature = "logging")]
        trace!(
            target: "service_injector",
            target_type = descriptor.type_name(),
            "Running post-inject hook"
        );
        hook(target).map_err(DiError::Hook)?;
    }

    Ok(annotated)
}

/// Support code for `#[derive(Inject)]`. Not public API.
#[doc(hidden)]
pub mod __private {
    use super::walk;
    use crate::{Inject, Resolve, Result};

    /// Walk an embedded value held inline.
    #[inline]
    pub fn walk_embedded<T: Inject>(target: &mut T, registry: &dyn Resolve) -> Result<usize> {
        walk(target, registry)
    }

    /// Walk an embedded value held behind an `Option`.
    ///
    /// An empty slot is filled with `T::default()` first. If the walk finds
    /// no annotated fields at all, the slot is emptied again.
    pub fn walk_optional<T: Inject + Default>(
        slot: &mut Option<T>,
        registry: &dyn Resolve,
    ) -> Result<usize> {
        let allocated = slot.is_none();
        let target = slot.get_or_insert_with(T::default);

        let annotated = walk(target, registry)?;
        if allocated && annotated == 0 {
            *slot = None;
        }

        Ok(annotated)
    }
}
