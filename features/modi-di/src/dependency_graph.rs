use std::collections::{HashMap, HashSet};

use crate::{
    errors::CompositionError,
    identity::Identity,
    module::{Module, ModuleContext},
    provider::Provider,
};

/// A provider reachable from the module tree, with the module it was first discovered through
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub provider: Provider,
    pub module: ModuleContext,
}

/// Binds names to the one identity allowed to carry them
struct NameRegistry {
    kind: &'static str,
    names: HashMap<String, Identity>,
}

impl NameRegistry {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            names: HashMap::new(),
        }
    }

    fn ensure_unique(&mut self, name: &str, identity: Identity) -> Result<(), CompositionError> {
        match self.names.get(name) {
            None => {
                self.names.insert(name.to_string(), identity);
                Ok(())
            }
            Some(existing) if *existing == identity => Ok(()),
            Some(existing) => Err(CompositionError::DuplicateIdentity {
                kind: self.kind,
                name: name.to_string(),
                existing: *existing,
                duplicate: identity,
            }),
        }
    }
}

/// Graph of the entire application
///
/// Built by a pure, synchronous pass over the module tree before anything is registered or
/// resolved. Every module name and every provider name reachable from a consumer must be bound
/// to a single descriptor. Bindings and overrides stand in for other descriptors under the same
/// name, so they are exempt from the name check wherever they are reached. Their dependencies
/// are not.
pub struct DependencyGraph {
    modules: NameRegistry,
    providers: NameRegistry,
    /// Identities of every binding and override
    substitutes: HashSet<Identity>,
    /// Providers already in the registry
    visited: HashSet<Identity>,
    /// Providers already walked from a given module, contracts bind differently per module
    walked: HashSet<(Identity, String)>,
    /// Discovery order, substitutes included
    registry: Vec<RegistryEntry>,
}

impl DependencyGraph {
    pub fn new(root: &Module, overrides: &[Provider]) -> Result<Self, CompositionError> {
        let mut graph = Self {
            modules: NameRegistry::new("module"),
            providers: NameRegistry::new("provider"),
            substitutes: HashSet::new(),
            visited: HashSet::new(),
            walked: HashSet::new(),
            registry: Vec::new(),
        };

        let mut modules = Vec::new();
        root.walk(&mut |module| modules.push(module.clone()));

        for module in &modules {
            graph
                .modules
                .ensure_unique(module.name(), module.identity())?;
            graph
                .substitutes
                .extend(module.bindings().iter().map(Provider::identity));
        }
        graph
            .substitutes
            .extend(overrides.iter().map(Provider::identity));

        for module in &modules {
            let ctx = module.context();
            for consumer in module.consumers() {
                for provider in consumer.deps().values() {
                    graph.visit(provider, &ctx)?;
                }
            }
        }

        let root_ctx = root.context();
        for replacement in overrides {
            graph.visit(replacement, &root_ctx)?;
        }

        tracing::debug!(
            "Dependency graph checked: {} modules, {} provider names, {} reachable providers",
            graph.modules.names.len(),
            graph.providers.names.len(),
            graph.registry.len()
        );

        Ok(graph)
    }

    /// Every reachable provider in discovery order
    pub fn registry(&self) -> &[RegistryEntry] {
        &self.registry
    }

    pub fn into_registry(self) -> Vec<RegistryEntry> {
        self.registry
    }

    /// Identity bound to a provider name, if the name is reachable
    pub fn provider_identity(&self, name: &str) -> Option<Identity> {
        self.providers.names.get(name).copied()
    }

    /// Identity bound to a module name
    pub fn module_identity(&self, name: &str) -> Option<Identity> {
        self.modules.names.get(name).copied()
    }

    fn visit(&mut self, provider: &Provider, ctx: &ModuleContext) -> Result<(), CompositionError> {
        if !self.enter(provider, ctx) {
            return Ok(());
        }

        if self.visited.insert(provider.identity()) {
            if !self.substitutes.contains(&provider.identity()) {
                self.providers
                    .ensure_unique(provider.name(), provider.identity())?;
            }
            self.record(provider, ctx);
        }

        for dependency in provider.deps().values() {
            self.visit(dependency, ctx)?;
        }

        if provider.is_contract() {
            if let Some(binding) = ctx.binding(provider.name()) {
                self.visit(binding, ctx)?;
            }
        }

        Ok(())
    }

    /// Returns false if the provider was already walked from this module
    fn enter(&mut self, provider: &Provider, ctx: &ModuleContext) -> bool {
        self.walked
            .insert((provider.identity(), ctx.name().to_string()))
    }

    fn record(&mut self, provider: &Provider, ctx: &ModuleContext) {
        self.registry.push(RegistryEntry {
            provider: provider.clone(),
            module: ctx.clone(),
        });
    }
}
