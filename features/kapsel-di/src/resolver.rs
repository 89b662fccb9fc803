use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{future::BoxFuture, FutureExt};

use crate::construct::{Args, ParamSpec};
use crate::container::Container;
use crate::errors::{CallableError, ResolveError};
use crate::registry::{Provider, Registration};
use crate::types::{Injectable, Instance, ServiceKey};

/// Per-call resolution context.
///
/// Each top-level `resolve`/`async_resolve` creates one of these, so every
/// logical resolution owns its resolution-path stack: concurrent resolutions
/// of overlapping types never see each other's in-flight state. Factories
/// receive a reference to the active resolver and pull their dependencies
/// through it, which keeps factory-driven cycles on the same stack.
pub struct Resolver<'c> {
    container: &'c Container,
    stack: Mutex<Vec<ServiceKey>>,
}

impl<'c> Resolver<'c> {
    pub(crate) fn new(container: &'c Container) -> Resolver<'c> {
        Resolver {
            container,
            stack: Mutex::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    //   Typed surface (used by callers and factories)
    // ------------------------------------------------------------------

    /// Resolve the default entry for `T` (sync-only)
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        downcast(self.resolve_key(ServiceKey::of::<T>())?)
    }

    /// Resolve the entry registered for `T` under `name` (sync-only)
    pub fn resolve_named<T: Injectable>(&self, name: &'static str) -> Result<Arc<T>, ResolveError> {
        downcast(self.resolve_key(ServiceKey::named::<T>(name))?)
    }

    /// Resolve the default entry for `T`, yielding `None` when unregistered
    pub fn try_resolve<T: Injectable>(&self) -> Result<Option<Arc<T>>, ResolveError> {
        if !self.container.registry().contains(&ServiceKey::of::<T>()) {
            return Ok(None);
        }
        self.resolve::<T>().map(Some)
    }

    /// Resolve the default entry for `T`, accepting async factories
    pub async fn resolve_async<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        downcast(self.resolve_key_async(ServiceKey::of::<T>()).await?)
    }

    /// Resolve the named entry for `T`, accepting async factories
    pub async fn resolve_named_async<T: Injectable>(
        &self,
        name: &'static str,
    ) -> Result<Arc<T>, ResolveError> {
        downcast(self.resolve_key_async(ServiceKey::named::<T>(name)).await?)
    }

    /// Async counterpart of [`Resolver::try_resolve`]
    pub async fn try_resolve_async<T: Injectable>(&self) -> Result<Option<Arc<T>>, ResolveError> {
        if !self.container.registry().contains(&ServiceKey::of::<T>()) {
            return Ok(None);
        }
        self.resolve_async::<T>().await.map(Some)
    }

    // ------------------------------------------------------------------
    //   Recursive resolution
    // ------------------------------------------------------------------

    pub(crate) fn resolve_key(&self, key: ServiceKey) -> Result<Instance, ResolveError> {
        let Some(registration) = self.container.registry().lookup(&key) else {
            return Err(ResolveError::MissingRegistration(key));
        };

        // Pre-built instances skip construction and caching entirely
        if let Provider::Instance(instance) = &registration.provider {
            return Ok(instance.clone());
        }

        if let Some(hit) = self.container.cache_get(registration.lifetime, &key) {
            return Ok(hit);
        }

        self.enter(key)?;
        let built = self.construct(&key, &registration);
        self.exit(&key);

        Ok(self.container.store(key, &registration, built?))
    }

    pub(crate) fn resolve_key_async<'a>(
        &'a self,
        key: ServiceKey,
    ) -> BoxFuture<'a, Result<Instance, ResolveError>> {
        async move {
            let Some(registration) = self.container.registry().lookup(&key) else {
                return Err(ResolveError::MissingRegistration(key));
            };

            if let Provider::Instance(instance) = &registration.provider {
                return Ok(instance.clone());
            }

            if let Some(hit) = self.container.cache_get(registration.lifetime, &key) {
                return Ok(hit);
            }

            self.enter(key)?;
            let built = self.construct_async(&key, &registration).await;
            self.exit(&key);

            Ok(self.container.store(key, &registration, built?))
        }
        .boxed()
    }

    fn construct(
        &self,
        key: &ServiceKey,
        registration: &Registration,
    ) -> Result<Instance, ResolveError> {
        match &registration.provider {
            Provider::Instance(instance) => Ok(instance.clone()),
            Provider::AsyncFactory(_) => Err(ResolveError::RequiresAsync(key.type_info)),
            Provider::Factory(factory) => {
                tracing::debug!("constructing `{}` via factory", key.display_name());
                factory(self).map_err(|e| CallableError::factory(key.type_info, e).into())
            }
            Provider::Constructor(constructor) => {
                let args = self.resolve_params(&registration.params)?;
                tracing::debug!("constructing `{}`", key.display_name());
                constructor
                    .build(args)
                    .map_err(|e| CallableError::factory(key.type_info, e).into())
            }
        }
    }

    async fn construct_async(
        &self,
        key: &ServiceKey,
        registration: &Registration,
    ) -> Result<Instance, ResolveError> {
        match &registration.provider {
            Provider::Instance(instance) => Ok(instance.clone()),
            Provider::AsyncFactory(factory) => {
                tracing::debug!("constructing `{}` via async factory", key.display_name());
                factory(self)
                    .await
                    .map_err(|e| CallableError::factory(key.type_info, e).into())
            }
            Provider::Factory(factory) => {
                tracing::debug!("constructing `{}` via factory", key.display_name());
                factory(self).map_err(|e| CallableError::factory(key.type_info, e).into())
            }
            Provider::Constructor(constructor) => {
                let args = self.resolve_params_async(&registration.params).await?;
                tracing::debug!("constructing `{}`", key.display_name());
                constructor
                    .build(args)
                    .map_err(|e| CallableError::factory(key.type_info, e).into())
            }
        }
    }

    /// Resolves declared parameters left to right. The first failure aborts
    /// the whole resolution; no partially built object is ever returned.
    fn resolve_params(&self, params: &[ParamSpec]) -> Result<Args, ResolveError> {
        let mut values = Vec::with_capacity(params.len());
        for param in params {
            let key = ServiceKey::from_info(param.type_info, None);
            let value = if self.container.registry().contains(&key) {
                Some(self.resolve_key(key)?)
            } else {
                self.unregistered_param(param, key)?
            };
            values.push((param.name, value));
        }
        Ok(Args::new(values))
    }

    async fn resolve_params_async(&self, params: &[ParamSpec]) -> Result<Args, ResolveError> {
        let mut values = Vec::with_capacity(params.len());
        for param in params {
            let key = ServiceKey::from_info(param.type_info, None);
            let value = if self.container.registry().contains(&key) {
                Some(self.resolve_key_async(key).await?)
            } else {
                self.unregistered_param(param, key)?
            };
            values.push((param.name, value));
        }
        Ok(Args::new(values))
    }

    fn unregistered_param(
        &self,
        param: &ParamSpec,
        key: ServiceKey,
    ) -> Result<Option<Instance>, ResolveError> {
        if param.optional {
            return Ok(None);
        }
        if let Some(make) = &param.default {
            return Ok(Some(make()));
        }
        Err(ResolveError::MissingRegistration(key))
    }

    // ------------------------------------------------------------------
    //   Resolution-path stack
    // ------------------------------------------------------------------

    /// Pushes `key`, failing with the full cycle path when it is already
    /// on the stack. Runs before any parameter recursion.
    fn enter(&self, key: ServiceKey) -> Result<(), ResolveError> {
        let mut stack = self.lock_stack();
        if stack.contains(&key) {
            let cycle = render_cycle(&stack, &key);
            tracing::error!("circular dependency: {cycle}");
            return Err(ResolveError::CircularDependency { cycle });
        }
        stack.push(key);
        Ok(())
    }

    fn exit(&self, key: &ServiceKey) {
        let mut stack = self.lock_stack();
        if let Some(position) = stack.iter().rposition(|entry| entry == key) {
            stack.remove(position);
        }
    }

    fn lock_stack(&self) -> MutexGuard<'_, Vec<ServiceKey>> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Renders a resolution path in discovery order, e.g. `A -> B -> A`
pub(crate) fn render_cycle(stack: &[ServiceKey], current: &ServiceKey) -> String {
    let mut names: Vec<String> = stack.iter().map(ServiceKey::display_name).collect();
    names.push(current.display_name());
    names.join(" -> ")
}

fn downcast<T: Injectable>(instance: Instance) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast::<T>()
        .map_err(|actual| ResolveError::Downcast {
            required: std::any::type_name::<T>(),
            actual,
        })
}
