use std::{fmt::Debug, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    adapter::AdapterCache,
    consumer::{Consumer, ConsumerKind},
    container::Container,
    errors::AppError,
    host::Scope,
    identity::{Identity, IdentityKind},
    provider::{Provider, ProviderMap},
};

/// Name and bindings of the module a resolution was triggered from
///
/// Contracts are looked up in these bindings only, never in those of ancestors or descendants.
#[derive(Clone, Debug)]
pub struct ModuleContext {
    name: Arc<str>,
    bindings: Arc<[Provider]>,
}

impl ModuleContext {
    pub fn new(name: impl Into<String>, bindings: Vec<Provider>) -> Self {
        Self {
            name: Arc::from(name.into()),
            bindings: Arc::from(bindings),
        }
    }

    /// Context of a resolution happening outside of any module tree
    pub fn detached() -> Self {
        Self::new("<detached>", Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bindings(&self) -> &[Provider] {
        &self.bindings
    }

    /// The binding satisfying the contract named `name`
    pub fn binding(&self, name: &str) -> Option<&Provider> {
        self.bindings.iter().find(|binding| binding.name() == name)
    }
}

/// A named node of the composition tree
///
/// Cheap to clone - clones share the identity of the original.
#[derive(Clone)]
pub struct Module(Arc<ModuleInner>);
struct ModuleInner {
    identity: Identity,
    name: String,
    encapsulate: bool,
    sub_modules: Vec<Module>,
    bindings: Vec<Provider>,
    hooks: Vec<Consumer>,
    installers: Vec<Consumer>,
    controllers: Vec<Consumer>,
}

impl Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.0.name)
            .field("identity", &self.0.identity)
            .field("encapsulate", &self.0.encapsulate)
            .field("bindings", &self.0.bindings)
            .field("consumers", &self.consumers().collect::<Vec<_>>())
            .field("sub_modules", &self.0.sub_modules)
            .finish()
    }
}

impl Module {
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder {
            name: name.into(),
            encapsulate: true,
            sub_modules: Vec::new(),
            bindings: Vec::new(),
            hooks: Vec::new(),
            installers: Vec::new(),
            controllers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn identity(&self) -> Identity {
        self.0.identity
    }

    pub fn encapsulate(&self) -> bool {
        self.0.encapsulate
    }

    pub fn sub_modules(&self) -> &[Module] {
        &self.0.sub_modules
    }

    pub fn bindings(&self) -> &[Provider] {
        &self.0.bindings
    }

    /// All consumers in registration order: hooks, installers, then controllers
    pub fn consumers(&self) -> impl Iterator<Item = &Consumer> {
        self.0
            .hooks
            .iter()
            .chain(&self.0.installers)
            .chain(&self.0.controllers)
    }

    /// Context handed to every resolution triggered by this module's consumers
    pub fn context(&self) -> ModuleContext {
        ModuleContext::new(self.0.name.clone(), self.0.bindings.clone())
    }

    /// Depth first walk, parents before children
    pub fn walk(&self, visit: &mut impl FnMut(&Module)) {
        visit(self);
        for sub_module in &self.0.sub_modules {
            sub_module.walk(visit);
        }
    }

    /// Returns a new module whose top level consumers depend on what `updater` returns
    ///
    /// Sub-modules and bindings are kept as they are, the new module has a fresh identity.
    pub fn with_providers(&self, updater: impl Fn(ProviderMap) -> ProviderMap) -> Module {
        let update = |consumers: &[Consumer]| -> Vec<Consumer> {
            consumers
                .iter()
                .map(|consumer| consumer.with_providers(&updater))
                .collect()
        };

        Module(Arc::new(ModuleInner {
            identity: Identity::allocate(IdentityKind::Module),
            name: self.0.name.clone(),
            encapsulate: self.0.encapsulate,
            sub_modules: self.0.sub_modules.clone(),
            bindings: self.0.bindings.clone(),
            hooks: update(&self.0.hooks),
            installers: update(&self.0.installers),
            controllers: update(&self.0.controllers),
        }))
    }
}

/// Declares a [Module]
pub struct ModuleBuilder {
    name: String,
    encapsulate: bool,
    sub_modules: Vec<Module>,
    bindings: Vec<Provider>,
    hooks: Vec<Consumer>,
    installers: Vec<Consumer>,
    controllers: Vec<Consumer>,
}

impl ModuleBuilder {
    /// Whether additions of this module stay inside it, defaults to true
    pub fn encapsulate(mut self, encapsulate: bool) -> Self {
        self.encapsulate = encapsulate;
        self
    }

    pub fn sub_module(mut self, module: Module) -> Self {
        self.sub_modules.push(module);
        self
    }

    /// Satisfies contracts of the same name requested by this module's consumers
    pub fn bind(mut self, provider: &Provider) -> Self {
        self.bindings.push(provider.clone());
        self
    }

    /// Attaches a consumer, ordered by its kind and then by insertion
    pub fn consumer(mut self, consumer: Consumer) -> Self {
        match consumer.kind() {
            ConsumerKind::Hook => self.hooks.push(consumer),
            ConsumerKind::Installer => self.installers.push(consumer),
            ConsumerKind::Controller => self.controllers.push(consumer),
        }
        self
    }

    pub fn build(self) -> Module {
        Module(Arc::new(ModuleInner {
            identity: Identity::allocate(IdentityKind::Module),
            name: self.name,
            encapsulate: self.encapsulate,
            sub_modules: self.sub_modules,
            bindings: self.bindings,
            hooks: self.hooks,
            installers: self.installers,
            controllers: self.controllers,
        }))
    }
}

/// Registers the module into a child scope of `parent`, then recurses into its sub-modules
///
/// Every module gets a fresh [AdapterCache] for its own consumers.
pub fn register_module<'a>(
    parent: &'a Scope,
    module: &'a Module,
    container: &'a Container,
) -> BoxFuture<'a, Result<(), AppError>> {
    async move {
        tracing::debug!(
            "Registering module '{}' ({}) under '{}'",
            module.name(),
            module.identity(),
            parent.name()
        );

        let scope = parent.register_scope(module.name(), module.encapsulate());
        let ctx = module.context();
        let mut cache = AdapterCache::new();

        for consumer in module.consumers() {
            consumer.register(&scope, container, &ctx, &mut cache).await?;
        }

        for sub_module in module.sub_modules() {
            register_module(&scope, sub_module, container).await?;
        }

        Ok(())
    }
    .boxed()
}
