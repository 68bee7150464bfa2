use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    future::Future,
    sync::Arc,
};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    errors::ResolveError,
    host::Scope,
    identity::{Identity, IdentityKind},
    types::{DepValues, DynError, Injectable, Instance},
};

/// Adapters of a consumer, keyed by local alias
pub type AdapterMap = BTreeMap<String, Adapter>;

/// Handed to an adapter when it exposes its value
#[derive(Clone)]
pub struct AdapterContext {
    /// Scope of the module currently being registered
    pub scope: Scope,
}

type ExposeFn =
    Arc<dyn Fn(AdapterContext) -> BoxFuture<'static, Result<Instance, DynError>> + Send + Sync>;

/// A stateless accessor to a capability of the host
///
/// Adapters are not part of the dependency graph. They are evaluated at most once per
/// module registration pass, against the scope of that module.
#[derive(Clone)]
pub struct Adapter(Arc<AdapterInner>);
struct AdapterInner {
    identity: Identity,
    name: String,
    expose: ExposeFn,
}

impl Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("name", &self.0.name)
            .field("identity", &self.0.identity)
            .finish()
    }
}

impl Adapter {
    pub fn new<Fun, FunFuture, T, E>(name: impl Into<String>, expose: Fun) -> Self
    where
        Fun: Fn(AdapterContext) -> FunFuture + Send + Sync + 'static,
        FunFuture: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError>,
    {
        let expose: ExposeFn = Arc::new(move |ctx| {
            expose(ctx)
                .map(|result| result.map(Instance::new).map_err(Into::into))
                .boxed()
        });

        Self(Arc::new(AdapterInner {
            identity: Identity::allocate(IdentityKind::Adapter),
            name: name.into(),
            expose,
        }))
    }

    pub fn anonymous<Fun, FunFuture, T, E>(expose: Fun) -> Self
    where
        Fun: Fn(AdapterContext) -> FunFuture + Send + Sync + 'static,
        FunFuture: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError>,
    {
        Self::new("unknown", expose)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn identity(&self) -> Identity {
        self.0.identity
    }
}

/// Memoizes adapter values for one module registration pass
///
/// Keyed by adapter identity: an adapter referenced by several consumers, or twice by the
/// same consumer under different aliases, is evaluated exactly once.
#[derive(Default)]
pub struct AdapterCache {
    values: HashMap<Identity, Instance>,
}

impl AdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the cached value or evaluates the adapter against `scope`
    pub async fn resolve(
        &mut self,
        adapter: &Adapter,
        scope: &Scope,
    ) -> Result<Instance, ResolveError> {
        if let Some(value) = self.values.get(&adapter.identity()) {
            tracing::trace!("Adapter '{}' served from cache", adapter.name());
            return Ok(value.clone());
        }

        let ctx = AdapterContext {
            scope: scope.clone(),
        };
        let value = (adapter.0.expose)(ctx)
            .await
            .map_err(|error| ResolveError::AdapterFailed {
                adapter: adapter.name().to_string(),
                error: Arc::new(error),
            })?;

        self.values.insert(adapter.identity(), value.clone());
        Ok(value)
    }

    /// Resolves every adapter of the map, keyed by its alias
    pub async fn resolve_map(
        &mut self,
        adapters: &AdapterMap,
        scope: &Scope,
    ) -> Result<DepValues, ResolveError> {
        let mut values = DepValues::new();
        for (alias, adapter) in adapters {
            let value = self.resolve(adapter, scope).await?;
            values.insert(alias.clone(), value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use futures::executor::block_on;

    use super::*;
    use crate::host::memory::MemoryHost;

    #[test]
    fn aliases_of_one_adapter_evaluate_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let scope_name = Adapter::new("scope-name", move |ctx: AdapterContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            let name = ctx.scope.name().to_string();
            async move { Ok::<_, Infallible>(name) }
        });

        let adapters = AdapterMap::from([
            ("first".to_string(), scope_name.clone()),
            ("second".to_string(), scope_name.clone()),
        ]);

        let scope = MemoryHost::root();
        let mut cache = AdapterCache::new();
        let values = block_on(cache.resolve_map(&adapters, &scope)).unwrap();
        block_on(cache.resolve(&scope_name, &scope)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(*values.get::<String>("first").unwrap(), "root");
        assert!(values
            .instance("first")
            .unwrap()
            .same_as(values.instance("second").unwrap()));
    }

    #[test]
    fn failures_name_the_adapter() {
        let broken = Adapter::anonymous(|_| async { Err::<(), _>("no socket") });
        let mut cache = AdapterCache::new();

        match block_on(cache.resolve(&broken, &MemoryHost::root())) {
            Err(ResolveError::AdapterFailed { adapter, .. }) => assert_eq!(adapter, "unknown"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(cache.is_empty());
    }
}
