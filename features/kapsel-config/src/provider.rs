use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use kapsel_di::{Injectable, TypeInfo};

use crate::errors::{GetConfigError, RegisterConfigError};

/// A registry of config structs, keyed by type.
///
/// Built once in the composition root, then registered with the container
/// as a pre-built instance so [`crate::Config`] parameters can pull from it.
#[derive(Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("configs", &self.configs.len())
            .finish()
    }
}

impl ConfigProvider {
    pub fn new() -> ConfigProvider {
        ConfigProvider::default()
    }

    /// Add a config to the registry.
    ///
    /// Registering the same config type twice is an error.
    pub fn add<T: Injectable>(&mut self, config: T) -> Result<&mut Self, RegisterConfigError> {
        let type_info = TypeInfo::of::<T>();
        if self.configs.contains_key(&type_info.type_id) {
            return Err(RegisterConfigError::AlreadyRegistered(type_info));
        }
        tracing::debug!("added config `{}`", type_info.short_name());
        self.configs.insert(type_info.type_id, Arc::new(config));
        Ok(self)
    }

    /// Add a config only when one was produced, for chaining
    pub fn maybe_add<T: Injectable>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, RegisterConfigError> {
        match config {
            Some(config) => self.add(config),
            None => Ok(self),
        }
    }

    /// Retrieve a config by type
    pub fn get<T: Injectable>(&self) -> Option<Arc<T>> {
        self.configs
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.clone().downcast::<T>().ok())
    }

    /// Retrieve a config by type, failing when it was never added
    pub fn require<T: Injectable>(&self) -> Result<Arc<T>, GetConfigError> {
        self.get::<T>()
            .ok_or_else(|| GetConfigError::Missing(TypeInfo::of::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(PartialEq, Debug)]
    struct AppConfig {
        name: &'static str,
    }

    #[test]
    fn configs_are_retrieved_by_type() {
        let mut provider = ConfigProvider::new();
        provider.add(AppConfig { name: "kapsel" }).unwrap();

        assert_eq!(provider.require::<AppConfig>().unwrap().name, "kapsel");
    }

    #[test]
    fn duplicate_configs_are_rejected() {
        let mut provider = ConfigProvider::new();
        provider.add(AppConfig { name: "first" }).unwrap();
        let error = provider.add(AppConfig { name: "second" }).unwrap_err();
        assert!(matches!(error, RegisterConfigError::AlreadyRegistered(_)));
    }

    #[test]
    fn missing_configs_surface_as_errors() {
        let provider = ConfigProvider::new();
        assert!(provider.get::<AppConfig>().is_none());
        assert!(matches!(
            provider.require::<AppConfig>(),
            Err(GetConfigError::Missing(_))
        ));
    }

    #[test]
    fn maybe_add_skips_none() {
        let mut provider = ConfigProvider::new();
        provider.maybe_add::<AppConfig>(None).unwrap();
        assert!(provider.get::<AppConfig>().is_none());
    }
}
