use std::{ops::Deref, sync::Arc};

use modi_di::{DepValues, Injectable, ResolveError};

/// A wrapper type to allow for config injections
///
/// [crate::provider::ConfigProvider::provider] exposes every registered config as a provider
/// of `Config<T>`, which factories and consumers declare like any other dependency.
///
/// # Example
/// ```rust
/// use std::convert::Infallible;
///
/// use modi_config::{config::Config, provider::ConfigProvider};
/// use modi_di::{DepValues, Provider};
///
/// struct DbConfig {
///     url: String,
/// }
///
/// let mut configs = ConfigProvider::initialize();
/// configs
///     .add_config(DbConfig { url: "postgres://localhost".to_string() })
///     .unwrap();
///
/// let db = Provider::builder("db")
///     .dep("config", &configs.provider::<DbConfig>().unwrap())
///     .factory(|deps: DepValues| async move {
///         let config = Config::<DbConfig>::from_deps(&deps, "config")?;
///         Ok::<_, modi_di::ResolveError>(config.url.clone())
///     })
///     .unwrap();
///
/// let url = futures::executor::block_on(db.resolve_as::<String>()).unwrap();
/// assert_eq!(*url, "postgres://localhost");
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}

impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Config<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Injectable> Config<T> {
    /// Reads the config resolved under `alias`
    pub fn from_deps(deps: &DepValues, alias: &str) -> Result<Self, ResolveError> {
        Ok(deps.get::<Config<T>>(alias)?.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::provider::ConfigProvider;

    struct Limits {
        max: usize,
    }

    #[test]
    fn resolves_through_the_container() {
        let mut configs = ConfigProvider::initialize();
        configs.add_config(Limits { max: 3 }).unwrap();
        let provider = configs.provider::<Limits>().unwrap();

        let config = block_on(provider.resolve_as::<Config<Limits>>()).unwrap();
        assert_eq!(config.max, 3);
        assert!(Arc::ptr_eq(
            &config.inner(),
            &configs.get_config::<Limits>().unwrap()
        ));
    }

    #[test]
    fn wrong_alias_is_reported() {
        let deps = DepValues::new();
        assert!(matches!(
            Config::<Limits>::from_deps(&deps, "limits"),
            Err(ResolveError::DependencyMissing { alias }) if alias == "limits"
        ));
    }
}
