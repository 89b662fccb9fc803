use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::BoxFuture;

use crate::construct::Construct;
use crate::errors::{CallableError, RegisterError, ResolveError, ShutdownErrors, ValidationError};
use crate::registry::{Entry, Provider, Registration, Registry};
use crate::resolver::Resolver;
use crate::resources::ResourceTracker;
use crate::types::{DynError, Injectable, Instance, Lifetime, ServiceKey};
use crate::validator;

/// Auto-wiring dependency injection container.
///
/// Registrations are declared up front (the composition root), then
/// instances are resolved on demand with per-type lifetime policies.
/// Each container is an independent, explicitly constructed object:
/// multiple containers can coexist, each owning its registration table,
/// its singleton and scoped cache tiers, and its tracked resources.
///
/// ```rust
/// use kapsel_di::{Container, Entry, Lifetime};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// let mut container = Container::new();
/// container
///     .register(Entry::factory(
///         |_| Ok(Greeter { greeting: "hello".into() }),
///         Lifetime::Singleton,
///     ))
///     .unwrap();
///
/// let greeter = container.resolve::<Greeter>().unwrap();
/// assert_eq!(greeter.greeting, "hello");
/// ```
#[derive(Default)]
pub struct Container {
    registry: Registry,
    singletons: Mutex<HashMap<ServiceKey, Instance>>,
    scoped: Mutex<HashMap<ServiceKey, Instance>>,
    resources: ResourceTracker,
}

impl Container {
    pub fn new() -> Container {
        Container::default()
    }

    // ------------------------------------------------------------------
    //   Registering
    // ------------------------------------------------------------------

    /// Register an entry under the default (unnamed) key for its type
    pub fn register<T: Injectable>(&mut self, entry: Entry<T>) -> Result<(), RegisterError> {
        self.insert(None, entry)
    }

    /// Register an entry under a name; named entries are never auto-wired
    pub fn register_named<T: Injectable>(
        &mut self,
        name: &'static str,
        entry: Entry<T>,
    ) -> Result<(), RegisterError> {
        self.insert(Some(name), entry)
    }

    /// Bind `T` to its own declared constructor
    pub fn register_type<T: Construct>(&mut self, lifetime: Lifetime) -> Result<(), RegisterError> {
        self.register(Entry::<T>::bind(lifetime))
    }

    /// Register a factory function for creating instances
    pub fn register_factory<T, F>(&mut self, factory: F, lifetime: Lifetime) -> Result<(), RegisterError>
    where
        T: Injectable,
        F: Fn(&Resolver<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.register(Entry::factory(factory, lifetime))
    }

    /// Register an async factory; resolvable only through `async_resolve`
    pub fn register_async_factory<T, F>(
        &mut self,
        factory: F,
        lifetime: Lifetime,
    ) -> Result<(), RegisterError>
    where
        T: Injectable,
        F: for<'a> Fn(&'a Resolver<'a>) -> BoxFuture<'a, Result<T, DynError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Entry::async_factory(factory, lifetime))
    }

    /// Register a pre-built instance (always a singleton), replacing any
    /// previous entry under the default key
    pub fn register_instance<T: Injectable>(&mut self, value: T) {
        // Entry::instance sets the replace flag, so this cannot collide
        let _ = self.register(Entry::instance(value));
    }

    /// Named counterpart of [`Container::register_instance`]
    pub fn register_instance_named<T: Injectable>(&mut self, name: &'static str, value: T) {
        let _ = self.register_named(name, Entry::instance(value));
    }

    fn insert<T: Injectable>(
        &mut self,
        name: Option<&'static str>,
        entry: Entry<T>,
    ) -> Result<(), RegisterError> {
        let (registration, replace) = entry.into_registration();
        let key = ServiceKey::from_info(registration.type_info, name);

        // A pre-built instance with a cleanup becomes a tracked resource the
        // moment it enters the table; it is never produced by the resolver.
        if let (Provider::Instance(instance), Some(cleanup)) =
            (&registration.provider, &registration.cleanup)
        {
            self.resources.track(
                registration.type_info,
                instance.clone(),
                cleanup.clone(),
                Lifetime::Singleton,
            );
        }

        self.registry.insert(key, registration, replace)
    }

    // ------------------------------------------------------------------
    //   Resolving
    // ------------------------------------------------------------------

    /// Resolve a dependency by type (sync-only).
    ///
    /// Fails with [`ResolveError::RequiresAsync`] if any transitively
    /// reached registration carries an async factory.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        Resolver::new(self).resolve::<T>()
    }

    /// Resolve the entry registered for `T` under `name` (sync-only)
    pub fn resolve_named<T: Injectable>(&self, name: &'static str) -> Result<Arc<T>, ResolveError> {
        Resolver::new(self).resolve_named::<T>(name)
    }

    /// Resolve a dependency by type, accepting sync and async factories
    pub async fn async_resolve<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        Resolver::new(self).resolve_async::<T>().await
    }

    /// Named counterpart of [`Container::async_resolve`]
    pub async fn async_resolve_named<T: Injectable>(
        &self,
        name: &'static str,
    ) -> Result<Arc<T>, ResolveError> {
        Resolver::new(self).resolve_named_async::<T>(name).await
    }

    // ------------------------------------------------------------------
    //   Validation
    // ------------------------------------------------------------------

    /// Walk every default registration's declared parameters without
    /// instantiating anything, reporting every unresolvable required
    /// dependency in one pass. Useful at startup to catch configuration
    /// errors early.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validator::validate(&self.registry)
    }

    // ------------------------------------------------------------------
    //   Lifecycle
    // ------------------------------------------------------------------

    /// Discard all scoped instances and tear down the resources produced
    /// by scoped and transient registrations. Singletons and the
    /// registration table are untouched; the next scoped resolution
    /// constructs a fresh instance.
    pub fn clear_scope(&self) -> Result<(), CallableError> {
        lock(&self.scoped).clear();
        let failures = self.resources.shutdown_scope_sync();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownErrors { errors: failures }.into())
        }
    }

    /// Shutdown all resources (sync-only) in reverse creation order.
    ///
    /// Async-only cleanups are skipped and reported in the aggregate
    /// error; every cleanup is attempted regardless of earlier failures.
    /// A second call is a no-op.
    pub fn shutdown_resources(&self) -> Result<(), CallableError> {
        let failures = self.resources.shutdown_sync();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownErrors { errors: failures }.into())
        }
    }

    /// Shutdown all resources (sync and async) in reverse creation order
    pub async fn async_shutdown_resources(&self) -> Result<(), CallableError> {
        let failures = self.resources.shutdown_async().await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownErrors { errors: failures }.into())
        }
    }

    // ------------------------------------------------------------------
    //   Cache tiers (crate-internal, used by the resolver)
    // ------------------------------------------------------------------

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn cache_get(&self, lifetime: Lifetime, key: &ServiceKey) -> Option<Instance> {
        match lifetime {
            Lifetime::Transient => None,
            Lifetime::Singleton => lock(&self.singletons).get(key).cloned(),
            Lifetime::Scoped => lock(&self.scoped).get(key).cloned(),
        }
    }

    /// Tracks the produced instance if its registration declares a cleanup,
    /// then stores it in the tier matching its lifetime. The singleton and
    /// scoped tiers insert compare-and-set style: if a concurrent resolution
    /// already populated the slot, the cached instance wins and is returned
    /// to every caller.
    pub(crate) fn store(
        &self,
        key: ServiceKey,
        registration: &Registration,
        instance: Instance,
    ) -> Instance {
        if let Some(cleanup) = &registration.cleanup {
            self.resources.track(
                registration.type_info,
                instance.clone(),
                cleanup.clone(),
                registration.lifetime,
            );
        }
        match registration.lifetime {
            Lifetime::Transient => instance,
            Lifetime::Singleton => lock(&self.singletons)
                .entry(key)
                .or_insert(instance)
                .clone(),
            Lifetime::Scoped => lock(&self.scoped).entry(key).or_insert(instance).clone(),
        }
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("singletons", &lock(&self.singletons).len())
            .field("scoped", &lock(&self.scoped).len())
            .finish_non_exhaustive()
    }
}

/// Dropping the container runs a final sync teardown, so resources are
/// released on every exit path even when `shutdown_resources` was never
/// called. Failures and skipped async cleanups are logged, not raised.
impl Drop for Container {
    fn drop(&mut self) {
        if self.resources.is_empty() {
            return;
        }
        if let Err(error) = self.shutdown_resources() {
            tracing::warn!("teardown on drop reported failures: {error}");
        }
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
