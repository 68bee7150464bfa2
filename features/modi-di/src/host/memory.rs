use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard},
};

use crate::{
    errors::HostError,
    host::{HostScope, Scope},
    types::Instance,
};

/// In-memory host.
///
/// Decorations live in layers. Every encapsulated scope opens a new layer holding a snapshot of
/// everything visible from its parent at creation, so it sees its ancestors while its own
/// additions stay inside. A transparent scope shares the layer of its parent, which makes its
/// additions visible to whoever registers after it in that layer. Scopes registered before the
/// addition keep their snapshot and never see it.
pub struct MemoryHost;

impl MemoryHost {
    /// Creates the root scope of a fresh host
    pub fn root() -> Scope {
        Self::named("root")
    }

    pub fn named(name: &str) -> Scope {
        Arc::new(MemoryScope {
            name: name.to_string(),
            layer: Arc::new(Layer::new(HashMap::new())),
        })
    }
}

struct Layer {
    /// Visible from the parent when the layer was opened
    inherited: HashMap<String, Instance>,
    decorations: RwLock<HashMap<String, Instance>>,
}

impl Layer {
    fn new(inherited: HashMap<String, Instance>) -> Self {
        Self {
            inherited,
            decorations: RwLock::new(HashMap::new()),
        }
    }

    fn own(&self) -> RwLockReadGuard<'_, HashMap<String, Instance>> {
        self.decorations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, key: &str) -> Option<Instance> {
        self.own()
            .get(key)
            .or_else(|| self.inherited.get(key))
            .cloned()
    }

    fn snapshot(&self) -> HashMap<String, Instance> {
        let mut visible = self.inherited.clone();
        visible.extend(
            self.own()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        visible
    }
}

/// A scope of the [MemoryHost]
pub struct MemoryScope {
    name: String,
    layer: Arc<Layer>,
}

impl HostScope for MemoryScope {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_scope(&self, name: &str, encapsulate: bool) -> Scope {
        let layer = if encapsulate {
            Arc::new(Layer::new(self.layer.snapshot()))
        } else {
            self.layer.clone()
        };

        tracing::trace!(
            "Registered scope '{name}' under '{}' (encapsulate: {encapsulate})",
            self.name
        );

        Arc::new(MemoryScope {
            name: name.to_string(),
            layer,
        })
    }

    fn decorate(&self, key: &str, value: Instance) -> Result<(), HostError> {
        if self.layer.lookup(key).is_some() {
            return Err(HostError::DecorationAlreadyPresent {
                key: key.to_string(),
                scope: self.name.clone(),
            });
        }

        self.layer
            .decorations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get_decoration(&self, key: &str) -> Result<Instance, HostError> {
        self.layer
            .lookup(key)
            .ok_or_else(|| HostError::UndeclaredDecoration {
                key: key.to_string(),
                scope: self.name.clone(),
            })
    }
}
