use std::{ops::Deref, sync::Arc};

use kapsel_di::{Args, Construct, DynError, Injectable, ParamSpec};

use crate::provider::ConfigProvider;

/// A wrapper type that makes a config struct injectable.
///
/// Declaring `Config<T>` as a constructor parameter pulls `T` out of the
/// registered [`ConfigProvider`] during auto-wiring, so modules read their
/// config without knowing about the provider.
///
/// ```rust
/// use kapsel_config::{Config, ConfigProvider};
/// use kapsel_di::{Args, Construct, Container, DynError, Lifetime, ParamSpec};
///
/// #[derive(Clone)]
/// struct WorkerConfig {
///     threads: usize,
/// }
///
/// struct WorkerPool {
///     threads: usize,
/// }
///
/// impl Construct for WorkerPool {
///     fn parameters() -> Vec<ParamSpec> {
///         vec![ParamSpec::required::<Config<WorkerConfig>>("config")]
///     }
///     fn build(mut args: Args) -> Result<Self, DynError> {
///         let config = args.take::<Config<WorkerConfig>>("config")?;
///         Ok(WorkerPool { threads: config.threads })
///     }
/// }
///
/// let mut provider = ConfigProvider::new();
/// provider.add(WorkerConfig { threads: 4 }).unwrap();
///
/// let mut container = Container::new();
/// container.register_instance(provider);
/// container.register_type::<Config<WorkerConfig>>(Lifetime::Singleton).unwrap();
/// container.register_type::<WorkerPool>(Lifetime::Singleton).unwrap();
///
/// let pool = container.resolve::<WorkerPool>().unwrap();
/// assert_eq!(pool.threads, 4);
/// ```
#[derive(Debug)]
pub struct Config<T> {
    inner: Arc<T>,
}

impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Injectable> Construct for Config<T> {
    fn parameters() -> Vec<ParamSpec> {
        vec![ParamSpec::required::<ConfigProvider>("provider")]
    }

    fn build(mut args: Args) -> Result<Self, DynError> {
        let provider = args.take::<ConfigProvider>("provider")?;
        let inner = provider.require::<T>()?;
        Ok(Config { inner })
    }
}
