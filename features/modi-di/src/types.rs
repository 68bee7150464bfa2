use std::{
    any::{Any, TypeId},
    collections::BTreeMap,
    sync::Arc,
};

use crate::errors::ResolveError;

/// All user supplied failures are boxed into this
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume that we are using a multithreaded async runtime
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A resolved value - produced by a provider factory, an adapter or a decoration
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub fn new<ExistingInstance: Injectable>(instance: ExistingInstance) -> Self {
        Instance {
            info: TypeInfo::of::<ExistingInstance>(),
            instance: Arc::new(instance),
        }
    }

    /// Wraps an already shared value without re-allocating it
    pub fn from_arc<ExistingInstance: Injectable>(instance: Arc<ExistingInstance>) -> Self {
        Instance {
            info: TypeInfo::of::<ExistingInstance>(),
            instance,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Returns true if both instances point at the same allocation
    pub fn same_as(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Resolved values keyed by the local alias they were declared under.
///
/// Used for provider dependencies as well as for adapter maps handed to consumers.
#[derive(Clone, Debug, Default)]
pub struct DepValues {
    values: BTreeMap<String, Instance>,
}

impl DepValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, instance: Instance) {
        self.values.insert(alias.into(), instance);
    }

    /// Typed access to a resolved value
    pub fn get<T: Injectable>(&self, alias: &str) -> Result<Arc<T>, ResolveError> {
        let instance = self.instance(alias)?;
        instance
            .downcast::<T>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                required_type: std::any::type_name::<T>(),
                actual_type,
            })
    }

    /// Untyped access to a resolved value
    pub fn instance(&self, alias: &str) -> Result<&Instance, ResolveError> {
        self.values
            .get(alias)
            .ok_or_else(|| ResolveError::DependencyMissing {
                alias: alias.to_string(),
            })
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.values.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.values.iter().map(|(alias, instance)| (alias.as_str(), instance))
    }
}

impl FromIterator<(String, Instance)> for DepValues {
    fn from_iter<I: IntoIterator<Item = (String, Instance)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
