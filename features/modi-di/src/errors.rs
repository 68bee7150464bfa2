use std::sync::Arc;

use thiserror::Error;

use crate::{identity::Identity, types::DynError};

/// Structural errors in the composition - raised before anything is resolved
#[derive(Error, Debug, Clone)]
pub enum CompositionError {
    /// Two different descriptors are registered under the same name
    #[error("Duplicate {kind} name \"{name}\" bound to different instances: {existing} vs {duplicate}.")]
    DuplicateIdentity {
        kind: &'static str,
        name: String,
        existing: Identity,
        duplicate: Identity,
    },
    /// A transient provider declared a lifecycle hook
    #[error(
        "Provider \"{provider}\" is declared as transient but defines a \"{hook}\" hook. \
         Transient providers may be instantiated many times and do not share hooks across instances. \
         Use a singleton provider if you need lifecycle management."
    )]
    InvalidLifecycleDeclaration {
        hook: &'static str,
        provider: String,
    },
}

/// Errors while resolving a provider or adapter
///
/// Must be Clone, as a failed singleton construction is shared with every waiter
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// A contract was requested by a module which does not bind it
    #[error("Contract \"{contract}\" has no binding in module \"{module}\"")]
    MissingContractBinding { contract: String, module: String },
    /// The placeholder factory of a contract ran - it must always be substituted first
    #[error("Factory of contract \"{0}\" was invoked - contracts must be bound before resolution")]
    ContractInvoked(String),
    /// A provider factory failed
    #[error("Factory for '{provider}' failed - error: {error}")]
    FactoryFailed {
        provider: String,
        error: Arc<DynError>,
    },
    /// An adapter failed to expose its value
    #[error("Adapter '{adapter}' failed - error: {error}")]
    AdapterFailed {
        adapter: String,
        error: Arc<DynError>,
    },
    /// A value was requested under an alias that was never declared
    #[error("No dependency is declared under the alias '{alias}'")]
    DependencyMissing { alias: String },

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Errors raised by the host while managing scopes and decorations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The decoration is not visible from the requesting scope
    #[error("Decoration '{key}' is not declared in scope '{scope}'")]
    UndeclaredDecoration { key: String, scope: String },
    /// The decoration is already visible from the scope it was added to
    #[error("Decoration '{key}' has already been added to scope '{scope}'")]
    DecorationAlreadyPresent { key: String, scope: String },
}

/// Errors while building or running an application
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Host(#[from] HostError),
    /// A hook, installer or controller callback failed during registration
    #[error("Consumer '{consumer}' in module '{module}' failed - error: {error}")]
    ConsumerFailed {
        consumer: String,
        module: String,
        error: DynError,
    },
    /// A provider lifecycle hook failed
    #[error("Hook '{hook}' of provider '{provider}' failed - error: {error}")]
    HookFailed {
        hook: &'static str,
        provider: String,
        error: Arc<DynError>,
    },
    #[error("The application has already been closed")]
    AlreadyClosed,
}
