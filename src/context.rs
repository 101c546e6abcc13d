//! Ambient registry carriers
//!
//! Code far from `main` often needs the registry without having it passed
//! down explicitly. Three carriers are provided:
//!
//! - [`global`]: one lazily created, process-wide registry
//! - [`with_registry`]: a registry made current for the duration of a closure
//!   on the calling thread
//! - `scope` (feature `async`): a registry made current for a future,
//!   following it across the threads of a tokio runtime
//!
//! [`current`] returns the innermost registry made current, if any.
//!
//! # Example
//!
//! ```rust
//! use service_injector::{Registry, context};
//!
//! let registry = Registry::new();
//! registry.set("name", "request-7").unwrap();
//!
//! context::with_registry(&registry, || {
//!     let current = context::current().unwrap();
//!     assert_eq!(current.get("name").unwrap().cloned::<&str>(), Some("request-7"));
//! });
//!
//! assert!(context::current().is_none());
//! ```

use crate::Registry;
use once_cell::sync::Lazy;
use std::cell::RefCell;

#[cfg(feature = "logging")]
use tracing::trace;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::default);

/// The process-wide registry, created on first access.
pub fn global() -> &'static Registry {
    &GLOBAL
}

thread_local! {
    static CURRENT: RefCell<Vec<Registry>> = const { RefCell::new(Vec::new()) };
}

/// Pops the thread's current registry, even if the closure panics.
struct Restore;

impl Drop for Restore {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with `registry` as the current registry of this thread.
///
/// Calls nest; the previous registry is current again once `f` returns.
pub fn with_registry<R>(registry: &Registry, f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "logging")]
    trace!(
        target: "service_injector",
        depth = registry.depth(),
        "Entering registry context"
    );

    CURRENT.with(|stack| stack.borrow_mut().push(registry.clone()));
    let _restore = Restore;
    f()
}

/// The innermost registry made current, if any.
///
/// With feature `async`, a registry set by [`scope`] for the running task
/// takes precedence over the thread's.
pub fn current() -> Option<Registry> {
    #[cfg(feature = "async")]
    if let Ok(registry) = TASK_REGISTRY.try_with(Registry::clone) {
        return Some(registry);
    }

    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// The current registry, or the global one.
pub fn current_or_global() -> Registry {
    current().unwrap_or_else(|| global().clone())
}

#[cfg(feature = "async")]
tokio::task_local! {
    static TASK_REGISTRY: Registry;
}

/// Run `future` with `registry` as the current registry of its task.
///
/// # Example
///
/// ```rust
/// use service_injector::{Registry, context};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = Registry::new();
/// registry.set("port", 8080u16).unwrap();
///
/// let port = context::scope(registry, async {
///     tokio::task::yield_now().await;
///     context::current().unwrap().get("port").unwrap().cloned::<u16>()
/// })
/// .await;
/// assert_eq!(port, Some(8080));
/// # }
/// ```
#[cfg(feature = "async")]
pub async fn scope<F: std::future::Future>(registry: Registry, future: F) -> F::Output {
    #[cfg(feature = "logging")]
    trace!(
        target: "service_injector",
        depth = registry.depth(),
        "Entering task registry scope"
    );

    TASK_REGISTRY.scope(registry, future).await
}
