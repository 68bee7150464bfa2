use std::{
    collections::HashSet,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::lock::Mutex;

use crate::{
    container::Container,
    dependency_graph::{DependencyGraph, RegistryEntry},
    errors::{AppError, ResolveError},
    host::{memory::MemoryHost, Scope},
    module::{register_module, Module},
    provider::{ErrorHookContext, HookContext, Provider, ProviderHook, ProviderHooks},
    types::{Injectable, Instance},
};

//////////////////////////////////////////////////////////////////////
///
/// An application goes through three steps.
/// 1. The AppBuilder takes the root module and the overrides
/// 2. build() checks the dependency graph, creates the container and registers every module
/// 3. ready() and close() run the lifecycle hooks of every reachable provider

pub struct AppBuilder {
    root: Module,
    overrides: Vec<Provider>,
    host: Option<Scope>,
}

impl AppBuilder {
    /// Replaces every provider named like `provider`, wherever it is requested
    pub fn override_with(mut self, provider: Provider) -> Self {
        self.overrides.push(provider);
        self
    }

    pub fn overrides(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.overrides.extend(providers);
        self
    }

    /// Registers the module tree below `scope` instead of a fresh [MemoryHost]
    pub fn host(mut self, scope: Scope) -> Self {
        self.host = Some(scope);
        self
    }

    pub async fn build(self) -> Result<App, AppError> {
        let AppBuilder {
            root,
            overrides,
            host,
        } = self;

        tracing::debug!(
            "Building application '{}' with {} overrides",
            root.name(),
            overrides.len()
        );

        // Pure pre-flight, nothing has been resolved or registered yet
        let graph = DependencyGraph::new(&root, &overrides)?;

        let container = Container::with_overrides(overrides);
        let scope = host.unwrap_or_else(MemoryHost::root);

        register_module(&scope, &root, &container).await?;

        tracing::debug!("Application '{}' registered", root.name());

        Ok(App {
            root,
            scope,
            container,
            registry: graph.into_registry(),
            ready: Mutex::new(false),
            closed: AtomicBool::new(false),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum LifecycleHook {
    Ready,
    Close,
}

impl LifecycleHook {
    fn name(self) -> &'static str {
        match self {
            LifecycleHook::Ready => "onReady",
            LifecycleHook::Close => "onClose",
        }
    }

    fn select(self, hooks: &ProviderHooks) -> Option<&ProviderHook> {
        match self {
            LifecycleHook::Ready => hooks.on_ready.as_ref(),
            LifecycleHook::Close => hooks.on_close.as_ref(),
        }
    }
}

/// A registered application
pub struct App {
    root: Module,
    scope: Scope,
    container: Container,
    registry: Vec<RegistryEntry>,
    /// Held while `on_ready` hooks run, set once all of them succeeded
    ready: Mutex<bool>,
    closed: AtomicBool,
}

impl Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root.name())
            .field("container", &self.container)
            .field("providers", &self.registry.len())
            .finish()
    }
}

impl App {
    pub fn builder(root: Module) -> AppBuilder {
        AppBuilder {
            root,
            overrides: Vec::new(),
            host: None,
        }
    }

    pub fn root(&self) -> &Module {
        &self.root
    }

    /// Host scope the root module was registered under
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Every reachable provider in discovery order
    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.registry.iter().map(|entry| &entry.provider)
    }

    /// Resolves a provider in the context of the root module
    pub async fn get(&self, provider: &Provider) -> Result<Instance, ResolveError> {
        self.container.get(provider, &self.root.context()).await
    }

    /// Typed variant of [App::get]
    pub async fn get_as<T: Injectable>(&self, provider: &Provider) -> Result<Arc<T>, ResolveError> {
        self.get(provider)
            .await?
            .downcast::<T>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                required_type: std::any::type_name::<T>(),
                actual_type,
            })
    }

    /// Runs `on_ready` of every reachable provider, once for the lifetime of the application
    ///
    /// If a hook fails, the next call runs all `on_ready` hooks again.
    pub async fn ready(&self) -> Result<(), AppError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::AlreadyClosed);
        }

        let mut ready = self.ready.lock().await;
        if *ready {
            return Ok(());
        }
        self.run_hooks(LifecycleHook::Ready).await?;
        *ready = true;
        Ok(())
    }

    /// Runs `on_close` of every reachable provider
    ///
    /// Only the first call runs the hooks, even if one of them fails.
    pub async fn close(&self) -> Result<(), AppError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(AppError::AlreadyClosed);
        }
        self.run_hooks(LifecycleHook::Close).await
    }

    async fn run_hooks(&self, hook: LifecycleHook) -> Result<(), AppError> {
        let mut seen = HashSet::new();

        for entry in &self.registry {
            // Hooks belong to whatever actually gets constructed
            let target = match self.container.substitute(&entry.provider, &entry.module) {
                Ok(target) => target,
                Err(error) => {
                    tracing::warn!(
                        "Skipping {} of '{}': {error}",
                        hook.name(),
                        entry.provider.name()
                    );
                    continue;
                }
            };

            if !seen.insert(target.identity()) {
                continue;
            }
            let Some(callback) = hook.select(target.hooks()) else {
                continue;
            };

            tracing::debug!("Running {} of '{}'", hook.name(), target.name());

            let deps = self
                .container
                .resolve_map(target.deps(), &entry.module)
                .await?;
            let value = self.container.get(&target, &entry.module).await?;
            let ctx = HookContext {
                scope: self.scope.clone(),
                deps,
                value,
            };

            if let Err(error) = callback(ctx.clone()).await {
                let error = Arc::new(error);
                if let Some(on_error) = &target.hooks().on_error {
                    let error_ctx = ErrorHookContext {
                        scope: ctx.scope,
                        deps: ctx.deps,
                        value: ctx.value,
                        error: error.clone(),
                    };
                    if let Err(nested) = on_error(error_ctx).await {
                        tracing::warn!("onError of '{}' failed: {nested}", target.name());
                    }
                }

                return Err(AppError::HookFailed {
                    hook: hook.name(),
                    provider: target.name().to_string(),
                    error,
                });
            }
        }

        Ok(())
    }
}
