use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use modi_di::{Injectable, Instance, Provider, TypeInfo};

use crate::{
    config::Config,
    errors::{GetConfigError, RegisterConfigError},
};

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type. Every registered config can also be
/// handed out as a singleton [Provider] of [Config], to be declared as a dependency.
#[derive(Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, Instance>,
    providers: Mutex<HashMap<TypeId, Provider>>,
}

impl ConfigProvider {
    /// Initializes an empty Config Provider
    pub fn initialize() -> Self {
        Self::default()
    }

    /// Retrieve a config with specified type.
    ///
    /// If the config type is not available, it will return [`GetConfigError::Missing`]
    pub fn get_config<T: Injectable>(&self) -> Result<Arc<T>, GetConfigError> {
        let type_info = TypeInfo::of::<T>();

        self.configs
            .get(&type_info.type_id)
            .and_then(|config| config.downcast::<T>().ok())
            .ok_or(GetConfigError::Missing(type_info))
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return
    /// [`RegisterConfigError::AlreadyRegistered`]
    pub fn add_config<T: Injectable>(
        &mut self,
        config: T,
    ) -> Result<&mut Self, RegisterConfigError> {
        let type_info = TypeInfo::of::<T>();

        if self.configs.contains_key(&type_info.type_id) {
            return Err(RegisterConfigError::AlreadyRegistered(type_info));
        }

        tracing::debug!("Registering config '{type_info}'");
        self.configs.insert(type_info.type_id, Instance::new(config));
        Ok(self)
    }

    /// Can optionally add a config to the registry.
    ///
    /// If the config provided is `Some(T)`, it will be the same as calling [`ConfigProvider::add_config`]
    /// If the config provided is `None`, then the function just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Injectable>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, RegisterConfigError> {
        match config {
            Some(c) => self.add_config(c),
            None => Ok(self),
        }
    }

    /// Singleton provider of `Config<T>`, named `config:<type name>`
    ///
    /// Repeated calls hand out the same provider, so it can be shared by any number of modules.
    pub fn provider<T: Injectable>(&self) -> Result<Provider, GetConfigError> {
        let type_info = TypeInfo::of::<T>();
        let mut providers = self
            .providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(provider) = providers.get(&type_info.type_id) {
            return Ok(provider.clone());
        }

        let config = Config::new(self.get_config::<T>()?);
        let provider = Provider::value(format!("config:{}", type_info.type_name), config);
        providers.insert(type_info.type_id, provider.clone());
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
