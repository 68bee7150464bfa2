use std::{fmt::Debug, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    adapter::{Adapter, AdapterCache, AdapterMap},
    container::Container,
    errors::AppError,
    host::Scope,
    module::ModuleContext,
    provider::{Provider, ProviderMap},
    types::{DepValues, DynError},
};

/// When a consumer runs during the registration of its module
///
/// Hooks run first, then installers, then controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConsumerKind {
    Hook,
    Installer,
    Controller,
}

impl std::fmt::Display for ConsumerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConsumerKind::Hook => "hook",
            ConsumerKind::Installer => "installer",
            ConsumerKind::Controller => "controller",
        })
    }
}

/// Everything a consumer gets to work with while its module registers
#[derive(Clone)]
pub struct ConsumerContext {
    /// Host scope of the module
    pub scope: Scope,
    /// Resolved `deps` of the consumer
    pub deps: DepValues,
    /// Resolved `adaps` of the consumer
    pub adaps: DepValues,
    pub container: Container,
    pub module: ModuleContext,
}

type BuildFn =
    Arc<dyn Fn(ConsumerContext) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;

/// A hook, installer or controller attached to a module
#[derive(Clone)]
pub struct Consumer {
    kind: ConsumerKind,
    name: String,
    deps: ProviderMap,
    adaps: AdapterMap,
    build: BuildFn,
}

impl Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("deps", &self.deps.keys().collect::<Vec<_>>())
            .field("adaps", &self.adaps.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Consumer {
    pub fn hook(name: impl Into<String>) -> ConsumerBuilder {
        ConsumerBuilder::new(ConsumerKind::Hook, name.into())
    }

    pub fn installer(name: impl Into<String>) -> ConsumerBuilder {
        ConsumerBuilder::new(ConsumerKind::Installer, name.into())
    }

    pub fn controller(name: impl Into<String>) -> ConsumerBuilder {
        ConsumerBuilder::new(ConsumerKind::Controller, name.into())
    }

    /// A consumer of the given kind named `unknown`
    pub fn anonymous(kind: ConsumerKind) -> ConsumerBuilder {
        ConsumerBuilder::new(kind, "unknown".to_string())
    }

    pub fn kind(&self) -> ConsumerKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &ProviderMap {
        &self.deps
    }

    pub fn adaps(&self) -> &AdapterMap {
        &self.adaps
    }

    /// Same consumer with the dependencies returned by `updater`
    pub fn with_providers(&self, updater: impl FnOnce(ProviderMap) -> ProviderMap) -> Consumer {
        Consumer {
            deps: updater(self.deps.clone()),
            ..self.clone()
        }
    }

    /// Resolves `deps` through the container and `adaps` through the adapter cache,
    /// then runs the consumer callback
    pub async fn register(
        &self,
        scope: &Scope,
        container: &Container,
        ctx: &ModuleContext,
        cache: &mut AdapterCache,
    ) -> Result<(), AppError> {
        tracing::debug!(
            "Registering {} '{}' of module '{}'",
            self.kind,
            self.name,
            ctx.name()
        );

        let deps = container.resolve_map(&self.deps, ctx).await?;
        let adaps = cache.resolve_map(&self.adaps, scope).await?;

        (self.build)(ConsumerContext {
            scope: scope.clone(),
            deps,
            adaps,
            container: container.clone(),
            module: ctx.clone(),
        })
        .await
        .map_err(|error| AppError::ConsumerFailed {
            consumer: self.name.clone(),
            module: ctx.name().to_string(),
            error,
        })
    }
}

/// Declares a [Consumer]
pub struct ConsumerBuilder {
    kind: ConsumerKind,
    name: String,
    deps: ProviderMap,
    adaps: AdapterMap,
}

impl ConsumerBuilder {
    fn new(kind: ConsumerKind, name: String) -> Self {
        Self {
            kind,
            name,
            deps: ProviderMap::new(),
            adaps: AdapterMap::new(),
        }
    }

    pub fn dep(mut self, alias: impl Into<String>, provider: &Provider) -> Self {
        self.deps.insert(alias.into(), provider.clone());
        self
    }

    pub fn deps(mut self, deps: ProviderMap) -> Self {
        self.deps.extend(deps);
        self
    }

    pub fn adapter(mut self, alias: impl Into<String>, adapter: &Adapter) -> Self {
        self.adaps.insert(alias.into(), adapter.clone());
        self
    }

    /// Finishes the declaration with the callback run at registration
    pub fn build<Fun, FunFuture, E>(self, build: Fun) -> Consumer
    where
        Fun: Fn(ConsumerContext) -> FunFuture + Send + Sync + 'static,
        FunFuture: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<DynError>,
    {
        Consumer {
            kind: self.kind,
            name: self.name,
            deps: self.deps,
            adaps: self.adaps,
            build: Arc::new(move |ctx| {
                build(ctx)
                    .map(|result| result.map_err(Into::into))
                    .boxed()
            }),
        }
    }
}
