use std::{
    any::TypeId,
    collections::HashMap,
    marker::PhantomData,
    sync::Arc,
};

use futures::{future::BoxFuture, FutureExt, TryFutureExt};

use crate::construct::{Construct, ConstructorOf, DynConstruct, ParamSpec};
use crate::errors::RegisterError;
use crate::resolver::Resolver;
use crate::resources::Cleanup;
use crate::types::{DynError, Injectable, Instance, Lifetime, ServiceKey, TypeInfo};

pub(crate) type SyncFactoryFn =
    Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, DynError> + Send + Sync>;
pub(crate) type AsyncFactoryFn =
    Arc<dyn for<'a> Fn(&'a Resolver<'a>) -> BoxFuture<'a, Result<Instance, DynError>> + Send + Sync>;

/// How a registration produces its instances
pub(crate) enum Provider {
    /// Bind to the type's own declared constructor
    Constructor(Arc<dyn DynConstruct>),
    /// Call a registered factory function
    Factory(SyncFactoryFn),
    /// Call a registered async factory function
    AsyncFactory(AsyncFactoryFn),
    /// Hand out a pre-built instance, never reconstructed
    Instance(Instance),
}

/// One immutable entry of the registration table
pub(crate) struct Registration {
    pub(crate) type_info: TypeInfo,
    pub(crate) lifetime: Lifetime,
    pub(crate) provider: Provider,
    pub(crate) cleanup: Option<Cleanup>,
    pub(crate) params: Vec<ParamSpec>,
}

/// Typed builder for a registration entry.
///
/// ```rust
/// use kapsel_di::{Container, Entry, Lifetime};
///
/// struct Port(u16);
///
/// let mut container = Container::new();
/// container
///     .register(Entry::factory(|_| Ok(Port(8080)), Lifetime::Singleton))
///     .unwrap();
/// ```
pub struct Entry<T> {
    lifetime: Lifetime,
    provider: Provider,
    cleanup: Option<Cleanup>,
    params: Vec<ParamSpec>,
    replace: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Entry<T> {
    /// Bind to `T`'s declared constructor; parameters are auto-wired
    pub fn bind(lifetime: Lifetime) -> Entry<T>
    where
        T: Construct,
    {
        Entry {
            lifetime,
            provider: Provider::Constructor(Arc::new(ConstructorOf::<T>::new())),
            cleanup: None,
            params: T::parameters(),
            replace: false,
            _marker: PhantomData,
        }
    }

    /// Produce instances through `factory`, which may pull further
    /// dependencies from the resolver it is handed
    pub fn factory<F>(factory: F, lifetime: Lifetime) -> Entry<T>
    where
        F: Fn(&Resolver<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Entry {
            lifetime,
            provider: Provider::Factory(Arc::new(move |resolver: &Resolver<'_>| {
                factory(resolver).map(Instance::new)
            })),
            cleanup: None,
            params: Vec::new(),
            replace: false,
            _marker: PhantomData,
        }
    }

    /// Produce instances through an async factory; only resolvable through
    /// the async resolution path
    pub fn async_factory<F>(factory: F, lifetime: Lifetime) -> Entry<T>
    where
        F: for<'a> Fn(&'a Resolver<'a>) -> BoxFuture<'a, Result<T, DynError>>
            + Send
            + Sync
            + 'static,
    {
        Entry {
            lifetime,
            provider: Provider::AsyncFactory(Arc::new(move |resolver: &Resolver<'_>| {
                factory(resolver).map_ok(Instance::new).boxed()
            })),
            cleanup: None,
            params: Vec::new(),
            replace: false,
            _marker: PhantomData,
        }
    }

    /// Register a pre-built instance (always a singleton). Registering over
    /// an occupied key replaces the previous entry.
    pub fn instance(value: T) -> Entry<T> {
        Entry {
            lifetime: Lifetime::Singleton,
            provider: Provider::Instance(Instance::new(value)),
            cleanup: None,
            params: Vec::new(),
            replace: true,
            _marker: PhantomData,
        }
    }

    /// Attach a sync cleanup, invoked once per produced instance at teardown
    pub fn with_cleanup<F>(mut self, cleanup: F) -> Entry<T>
    where
        F: Fn(Arc<T>) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.cleanup = Some(Cleanup::Sync(Arc::new(
            move |instance: Instance| -> Result<(), DynError> {
                let typed = instance
                    .downcast::<T>()
                    .map_err(|actual| format!("cleanup expected another type, got `{actual}`"))?;
                cleanup(typed)
            },
        )));
        self
    }

    /// Attach an async cleanup; sync teardown will skip it and record a failure
    pub fn with_async_cleanup<F>(mut self, cleanup: F) -> Entry<T>
    where
        F: Fn(Arc<T>) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync + 'static,
    {
        self.cleanup = Some(Cleanup::Async(Arc::new(move |instance: Instance| {
            match instance.downcast::<T>() {
                Ok(typed) => cleanup(typed),
                Err(actual) => {
                    let message = format!("cleanup expected another type, got `{actual}`");
                    async move { Err(message.into()) }.boxed()
                }
            }
        })));
        self
    }

    /// Declare the dependencies a factory pulls, so `validate` can check them
    pub fn with_dependencies(mut self, params: Vec<ParamSpec>) -> Entry<T> {
        self.params = params;
        self
    }

    pub(crate) fn into_registration(self) -> (Registration, bool) {
        (
            Registration {
                type_info: TypeInfo::of::<T>(),
                lifetime: self.lifetime,
                provider: self.provider,
                cleanup: self.cleanup,
                params: self.params,
            },
            self.replace,
        )
    }
}

/// Per-type slots: one default entry plus any named entries
#[derive(Default)]
struct TypeRegistrations {
    default: Option<Arc<Registration>>,
    named: HashMap<&'static str, Arc<Registration>>,
}

impl TypeRegistrations {
    fn get(&self, name: Option<&'static str>) -> Option<&Arc<Registration>> {
        match name {
            None => self.default.as_ref(),
            Some(name) => self.named.get(name),
        }
    }
}

/// The registration table: at most one entry per (type, name) key
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<TypeId, TypeRegistrations>,
}

impl Registry {
    pub(crate) fn insert(
        &mut self,
        key: ServiceKey,
        registration: Registration,
        replace: bool,
    ) -> Result<(), RegisterError> {
        let slots = self.entries.entry(key.type_info.type_id).or_default();
        let occupied = slots.get(key.name).is_some();
        if occupied && !replace {
            return Err(RegisterError::Duplicate(key));
        }
        tracing::debug!(
            "registered `{}` as {:?}{}",
            key.display_name(),
            registration.lifetime,
            if occupied { " (replaced)" } else { "" },
        );
        match key.name {
            None => slots.default = Some(Arc::new(registration)),
            Some(name) => {
                slots.named.insert(name, Arc::new(registration));
            }
        }
        Ok(())
    }

    pub(crate) fn lookup(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        self.entries
            .get(&key.type_info.type_id)
            .and_then(|slots| slots.get(key.name))
            .cloned()
    }

    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        self.entries
            .get(&key.type_info.type_id)
            .is_some_and(|slots| slots.get(key.name).is_some())
    }

    /// Every default (unnamed) entry, for the validation walk
    pub(crate) fn defaults(&self) -> impl Iterator<Item = &Arc<Registration>> {
        self.entries.values().filter_map(|slots| slots.default.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Svc(u8);

    #[test]
    fn duplicate_default_is_rejected() {
        let mut registry = Registry::default();
        let (first, _) = Entry::factory(|_| Ok(Svc(1)), Lifetime::Transient).into_registration();
        let (second, _) = Entry::factory(|_| Ok(Svc(2)), Lifetime::Transient).into_registration();
        registry.insert(ServiceKey::of::<Svc>(), first, false).unwrap();
        let err = registry
            .insert(ServiceKey::of::<Svc>(), second, false)
            .unwrap_err();
        assert!(matches!(err, RegisterError::Duplicate(_)));
    }

    #[test]
    fn named_and_default_occupy_separate_slots() {
        let mut registry = Registry::default();
        let (default, _) = Entry::factory(|_| Ok(Svc(1)), Lifetime::Transient).into_registration();
        let (named, _) = Entry::factory(|_| Ok(Svc(2)), Lifetime::Transient).into_registration();
        registry.insert(ServiceKey::of::<Svc>(), default, false).unwrap();
        registry
            .insert(ServiceKey::named::<Svc>("alt"), named, false)
            .unwrap();
        assert!(registry.contains(&ServiceKey::of::<Svc>()));
        assert!(registry.contains(&ServiceKey::named::<Svc>("alt")));
        assert!(!registry.contains(&ServiceKey::named::<Svc>("other")));
    }

    #[test]
    fn instance_entries_may_replace() {
        let mut registry = Registry::default();
        let (first, replace) = Entry::instance(Svc(1)).into_registration();
        assert!(replace);
        registry.insert(ServiceKey::of::<Svc>(), first, replace).unwrap();
        let (second, replace) = Entry::instance(Svc(2)).into_registration();
        registry.insert(ServiceKey::of::<Svc>(), second, replace).unwrap();
        let entry = registry.lookup(&ServiceKey::of::<Svc>()).unwrap();
        let Provider::Instance(instance) = &entry.provider else {
            panic!("expected instance provider");
        };
        assert_eq!(instance.downcast::<Svc>().unwrap().0, 2);
    }
}
