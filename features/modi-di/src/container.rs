use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};

use futures::{
    future::{self, BoxFuture, Shared},
    FutureExt,
};

use crate::{
    errors::ResolveError,
    identity::Identity,
    module::ModuleContext,
    provider::{Lifecycle, Provider, ProviderMap},
    types::{DepValues, Instance},
};

/// A resolution in flight or already settled - shared between every caller
type SharedResolution = Shared<BoxFuture<'static, Result<Instance, ResolveError>>>;

/// Application scoped container resolving providers to values
///
/// Cheap to clone - clones share the same singleton cache.
#[derive(Clone)]
pub struct Container(Arc<ContainerInner>);
struct ContainerInner {
    /// Keyed by the identity of the provider after contract and override substitution
    singletons: Mutex<HashMap<Identity, SharedResolution>>,
    /// Replacement providers keyed by the name they replace
    overrides: HashMap<String, Provider>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("singletons", &self.singleton_count())
            .field("overrides", &self.0.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::with_overrides(Vec::new())
    }

    /// Creates a container substituting every provider whose name matches one of `overrides`
    ///
    /// If two overrides share a name, the last one wins.
    pub fn with_overrides(overrides: impl IntoIterator<Item = Provider>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|provider| (provider.name().to_string(), provider))
            .collect();

        Self(Arc::new(ContainerInner {
            singletons: Mutex::new(HashMap::new()),
            overrides,
        }))
    }

    /// Returns the provider actually constructed when `provider` is requested from `ctx`
    ///
    /// Contracts are replaced by the same-name binding of the module, then overrides apply by name.
    pub fn substitute(
        &self,
        provider: &Provider,
        ctx: &ModuleContext,
    ) -> Result<Provider, ResolveError> {
        let mut resolved = provider.clone();

        if resolved.is_contract() {
            resolved = ctx
                .binding(resolved.name())
                .cloned()
                .ok_or_else(|| ResolveError::MissingContractBinding {
                    contract: provider.name().to_string(),
                    module: ctx.name().to_string(),
                })?;
            tracing::trace!(
                "Contract '{}' bound to {} in module '{}'",
                provider.name(),
                resolved.identity(),
                ctx.name()
            );
        }

        if let Some(replacement) = self.0.overrides.get(resolved.name()) {
            tracing::trace!(
                "Provider '{}' overridden by {}",
                resolved.name(),
                replacement.identity()
            );
            resolved = replacement.clone();
        }

        Ok(resolved)
    }

    /// Resolves a provider within the given module context
    ///
    /// Singletons are constructed at most once for the lifetime of the container,
    /// transient providers are constructed on every call.
    pub fn get(
        &self,
        provider: &Provider,
        ctx: &ModuleContext,
    ) -> BoxFuture<'static, Result<Instance, ResolveError>> {
        let provider = match self.substitute(provider, ctx) {
            Ok(provider) => provider,
            Err(error) => return future::ready(Err(error)).boxed(),
        };

        match provider.lifecycle() {
            Lifecycle::Transient => self.instantiate(provider, ctx.clone()),
            Lifecycle::Singleton => {
                // Store the shared future before anyone polls it, so concurrent callers join it
                let resolution = self
                    .0
                    .singletons
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(provider.identity())
                    .or_insert_with(|| {
                        tracing::trace!("First request for singleton '{}'", provider.name());
                        self.instantiate(provider.clone(), ctx.clone()).shared()
                    })
                    .clone();

                resolution.boxed()
            }
        }
    }

    /// Resolves every provider of the map, keyed by its alias
    pub async fn resolve_map(
        &self,
        map: &ProviderMap,
        ctx: &ModuleContext,
    ) -> Result<DepValues, ResolveError> {
        let resolutions = map.iter().map(|(alias, provider)| {
            let alias = alias.clone();
            let resolution = self.get(provider, ctx);
            async move { Ok::<_, ResolveError>((alias, resolution.await?)) }
        });

        Ok(future::try_join_all(resolutions)
            .await?
            .into_iter()
            .collect())
    }

    /// Number of singleton identities requested so far
    pub fn singleton_count(&self) -> usize {
        self.0
            .singletons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn instantiate(
        &self,
        provider: Provider,
        ctx: ModuleContext,
    ) -> BoxFuture<'static, Result<Instance, ResolveError>> {
        let container = self.clone();
        async move {
            if provider.is_contract() {
                return Err(ResolveError::ContractInvoked(provider.name().to_string()));
            }

            let deps = container.resolve_map(provider.deps(), &ctx).await?;

            tracing::debug!(
                "Constructing '{}' ({}, {:?})",
                provider.name(),
                provider.identity(),
                provider.lifecycle()
            );
            let instance =
                provider
                    .construct(deps)
                    .await
                    .map_err(|error| ResolveError::FactoryFailed {
                        provider: provider.name().to_string(),
                        error: Arc::new(error),
                    })?;
            tracing::debug!("Constructed instance of {}", instance.info.type_name);

            Ok(instance)
        }
        .boxed()
    }
}
