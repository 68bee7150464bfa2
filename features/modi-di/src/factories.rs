use std::future::Future;

use futures::{future::BoxFuture, FutureExt};

use crate::{
    errors::ResolveError,
    types::{DepValues, DynError, Injectable, Instance, TypeInfo},
};

/// A Factory providing instances of a given type from its resolved dependencies
///
/// Implemented for any `Fn(DepValues) -> impl Future<Output = Result<T, E>>`
pub trait ProviderFactory: Send + Sync + 'static {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Constructs a new instance of the factory's provided type
    ///
    /// All dependencies declared on the provider are resolved before this is called
    fn construct(
        &self,
        deps: DepValues,
    ) -> impl Future<Output = Result<Self::Provides, impl Into<DynError>>> + Send + '_;
}

impl<Fun, FunFuture, T, E> ProviderFactory for Fun
where
    Fun: Fn(DepValues) -> FunFuture + Send + Sync + 'static,
    FunFuture: Future<Output = Result<T, E>> + Send + 'static,
    T: Injectable,
    E: Into<DynError>,
{
    type Provides = T;

    #[allow(refining_impl_trait)]
    fn construct(&self, deps: DepValues) -> FunFuture {
        self(deps)
    }
}

/// Wrapper Trait for factories, providing instances of Any
pub(crate) trait DynFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    fn construct(&self, deps: DepValues) -> BoxFuture<'_, Result<Instance, DynError>>;
}
// Impl DynFactory for any ProviderFactory
impl<T: Injectable, SpecificFactory: ProviderFactory<Provides = T>> DynFactory for SpecificFactory {
    fn supplies(&self) -> TypeInfo {
        SpecificFactory::supplies()
    }

    fn construct(&self, deps: DepValues) -> BoxFuture<'_, Result<Instance, DynError>> {
        async move {
            // Forward the call to the specific implementation
            ProviderFactory::construct(self, deps)
                .await
                .map(Instance::new)
                .map_err(|e| e.into())
        }
        .boxed()
    }
}

/// Factory of a pre built value - every construction hands out the same allocation
pub(crate) struct ValueFactory(pub Instance);

impl DynFactory for ValueFactory {
    fn supplies(&self) -> TypeInfo {
        self.0.info
    }

    fn construct(&self, _: DepValues) -> BoxFuture<'_, Result<Instance, DynError>> {
        let instance = self.0.clone();
        async move { Ok(instance) }.boxed()
    }
}

/// Placeholder factory of a contract, it must never run
pub(crate) struct ContractFactory {
    pub name: String,
    pub supplies: TypeInfo,
}

impl DynFactory for ContractFactory {
    fn supplies(&self) -> TypeInfo {
        self.supplies
    }

    fn construct(&self, _: DepValues) -> BoxFuture<'_, Result<Instance, DynError>> {
        tracing::error!(
            "Factory of contract '{}' invoked - a binding is missing upstream",
            self.name
        );
        let error = ResolveError::ContractInvoked(self.name.clone());
        async move { Err(error.into()) }.boxed()
    }
}
