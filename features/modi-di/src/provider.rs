use std::{collections::BTreeMap, fmt::Debug, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    container::Container,
    errors::{CompositionError, ResolveError},
    factories::{ContractFactory, DynFactory, ProviderFactory, ValueFactory},
    host::Scope,
    identity::{Identity, IdentityKind},
    module::ModuleContext,
    types::{DepValues, DynError, Injectable, Instance, TypeInfo},
};

/// Dependencies of a provider or consumer, keyed by local alias
pub type ProviderMap = BTreeMap<String, Provider>;

/// Whether a resolved value is shared or built per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    /// One value for the lifetime of the container
    #[default]
    Singleton,
    /// A fresh value on every resolution
    Transient,
}

/// Context handed to `on_ready` and `on_close`
#[derive(Clone)]
pub struct HookContext {
    /// Root scope of the application
    pub scope: Scope,
    pub deps: DepValues,
    pub value: Instance,
}

/// Context handed to `on_error`
#[derive(Clone)]
pub struct ErrorHookContext {
    pub scope: Scope,
    pub deps: DepValues,
    pub value: Instance,
    pub error: Arc<DynError>,
}

pub type ProviderHook =
    Arc<dyn Fn(HookContext) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;
pub type ProviderErrorHook =
    Arc<dyn Fn(ErrorHookContext) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;

/// Optional application lifecycle hooks of a provider
#[derive(Clone, Default)]
pub struct ProviderHooks {
    pub on_ready: Option<ProviderHook>,
    pub on_close: Option<ProviderHook>,
    pub on_error: Option<ProviderErrorHook>,
}

impl ProviderHooks {
    fn declared(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            self.on_ready.as_ref().map(|_| "onReady"),
            self.on_close.as_ref().map(|_| "onClose"),
            self.on_error.as_ref().map(|_| "onError"),
        ]
        .into_iter()
        .flatten()
    }
}

/// A lazily evaluated service descriptor
///
/// Cheap to clone - clones share the identity of the original.
/// Descriptors are immutable, a provider can therefore only depend on providers created before
/// it, which rules out dependency cycles.
#[derive(Clone)]
pub struct Provider(Arc<ProviderInner>);
struct ProviderInner {
    identity: Identity,
    name: String,
    lifecycle: Lifecycle,
    deps: ProviderMap,
    factory: Arc<dyn DynFactory>,
    hooks: ProviderHooks,
    is_contract: bool,
}

impl Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.0.name)
            .field("identity", &self.0.identity)
            .field("lifecycle", &self.0.lifecycle)
            .field("supplies", &self.0.factory.supplies().type_name)
            .field("deps", &self.0.deps.keys().collect::<Vec<_>>())
            .field("is_contract", &self.0.is_contract)
            .finish()
    }
}

impl Provider {
    /// Starts the declaration of a provider
    pub fn builder(name: impl Into<String>) -> ProviderBuilder {
        ProviderBuilder {
            name: name.into(),
            lifecycle: Lifecycle::default(),
            deps: ProviderMap::new(),
            hooks: ProviderHooks::default(),
        }
    }

    /// A singleton provider of an already built value
    pub fn value<T: Injectable>(name: impl Into<String>, value: T) -> Provider {
        Self::assemble(
            name.into(),
            Lifecycle::Singleton,
            ProviderMap::new(),
            Arc::new(ValueFactory(Instance::new(value))),
            ProviderHooks::default(),
            false,
        )
    }

    /// A placeholder for an abstract capability of type `T`.
    ///
    /// Modules satisfy it by binding a provider of the same name.
    pub fn contract<T: Injectable>(name: impl Into<String>) -> Provider {
        let name = name.into();
        let factory = ContractFactory {
            name: name.clone(),
            supplies: TypeInfo::of::<T>(),
        };
        Self::assemble(
            name,
            Lifecycle::Singleton,
            ProviderMap::new(),
            Arc::new(factory),
            ProviderHooks::default(),
            true,
        )
    }

    fn assemble(
        name: String,
        lifecycle: Lifecycle,
        deps: ProviderMap,
        factory: Arc<dyn DynFactory>,
        hooks: ProviderHooks,
        is_contract: bool,
    ) -> Provider {
        Provider(Arc::new(ProviderInner {
            identity: Identity::allocate(IdentityKind::Provider),
            name,
            lifecycle,
            deps,
            factory,
            hooks,
            is_contract,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn identity(&self) -> Identity {
        self.0.identity
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.0.lifecycle
    }

    pub fn deps(&self) -> &ProviderMap {
        &self.0.deps
    }

    pub fn hooks(&self) -> &ProviderHooks {
        &self.0.hooks
    }

    pub fn is_contract(&self) -> bool {
        self.0.is_contract
    }

    /// Type produced by the factory
    pub fn supplies(&self) -> TypeInfo {
        self.0.factory.supplies()
    }

    /// Runs the factory with already resolved dependencies
    pub(crate) fn construct(
        &self,
        deps: DepValues,
    ) -> BoxFuture<'static, Result<Instance, DynError>> {
        let factory = self.0.factory.clone();
        async move { factory.construct(deps).await }.boxed()
    }

    /// Returns a new provider with the same name, lifecycle, factory and hooks
    /// but with the dependencies returned by `updater`.
    ///
    /// The new provider has a fresh identity, the original is left untouched.
    pub fn with_providers(&self, updater: impl FnOnce(ProviderMap) -> ProviderMap) -> Provider {
        let deps = updater(self.0.deps.clone());
        Self::assemble(
            self.0.name.clone(),
            self.0.lifecycle,
            deps,
            self.0.factory.clone(),
            self.0.hooks.clone(),
            self.0.is_contract,
        )
    }

    /// Resolves the provider outside of any module tree, using a throwaway container
    pub async fn resolve(&self) -> Result<Instance, ResolveError> {
        Container::new().get(self, &ModuleContext::detached()).await
    }

    /// Typed variant of [Provider::resolve]
    pub async fn resolve_as<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        let instance = self.resolve().await?;
        instance
            .downcast::<T>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                required_type: std::any::type_name::<T>(),
                actual_type,
            })
    }
}

/// Declares a [Provider]
pub struct ProviderBuilder {
    name: String,
    lifecycle: Lifecycle,
    deps: ProviderMap,
    hooks: ProviderHooks,
}

impl ProviderBuilder {
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn transient(self) -> Self {
        self.lifecycle(Lifecycle::Transient)
    }

    /// Adds a dependency, resolved and handed to the factory under `alias`
    pub fn dep(mut self, alias: impl Into<String>, provider: &Provider) -> Self {
        self.deps.insert(alias.into(), provider.clone());
        self
    }

    pub fn deps(mut self, deps: ProviderMap) -> Self {
        self.deps.extend(deps);
        self
    }

    pub fn on_ready<Fun, Fut>(mut self, hook: Fun) -> Self
    where
        Fun: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.hooks.on_ready = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    pub fn on_close<Fun, Fut>(mut self, hook: Fun) -> Self
    where
        Fun: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.hooks.on_close = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    pub fn on_error<Fun, Fut>(mut self, hook: Fun) -> Self
    where
        Fun: Fn(ErrorHookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.hooks.on_error = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    /// Finishes the declaration with an async function building the value
    ///
    /// Fails if a transient provider declares lifecycle hooks
    pub fn factory<Fun, FunFuture, T, E>(self, factory: Fun) -> Result<Provider, CompositionError>
    where
        Fun: Fn(DepValues) -> FunFuture + Send + Sync + 'static,
        FunFuture: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError>,
    {
        self.with_factory(factory)
    }

    /// Finishes the declaration with any [ProviderFactory]
    pub fn with_factory<Factory: ProviderFactory>(
        self,
        factory: Factory,
    ) -> Result<Provider, CompositionError> {
        if self.lifecycle == Lifecycle::Transient {
            if let Some(hook) = self.hooks.declared().next() {
                return Err(CompositionError::InvalidLifecycleDeclaration {
                    hook,
                    provider: self.name,
                });
            }
        }

        Ok(Provider::assemble(
            self.name,
            self.lifecycle,
            self.deps,
            Arc::new(factory),
            self.hooks,
            false,
        ))
    }
}
