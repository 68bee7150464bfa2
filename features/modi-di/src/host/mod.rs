use std::sync::Arc;

use crate::{
    errors::{HostError, ResolveError},
    types::{Injectable, Instance},
};

pub mod memory;

/// A registration scope handed out by the host.
///
/// The core never creates scopes itself: every module is registered into a child scope
/// obtained from its parent with [HostScope::register_scope].
pub trait HostScope: Send + Sync {
    /// Name of the module this scope was registered for
    fn name(&self) -> &str;

    /// Creates a child scope.
    ///
    /// An encapsulated child gets its own decoration layer, a transparent child
    /// writes into the layer of its parent.
    fn register_scope(&self, name: &str, encapsulate: bool) -> Scope;

    /// Adds a decoration visible from this scope and every scope that can see it
    fn decorate(&self, key: &str, value: Instance) -> Result<(), HostError>;

    /// Looks up a decoration visible from this scope
    fn get_decoration(&self, key: &str) -> Result<Instance, HostError>;
}

/// Shared handle to a host scope
pub type Scope = Arc<dyn HostScope>;

impl dyn HostScope {
    /// Typed access to a decoration
    pub fn decoration<T: Injectable>(&self, key: &str) -> Result<Arc<T>, ResolveError> {
        let instance = self.get_decoration(key)?;
        instance
            .downcast::<T>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                required_type: std::any::type_name::<T>(),
                actual_type,
            })
    }

    /// Returns true if the decoration is visible from this scope
    pub fn has_decoration(&self, key: &str) -> bool {
        self.get_decoration(key).is_ok()
    }
}
