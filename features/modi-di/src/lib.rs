//! Modi DI resolves a declarative graph of named providers for a tree of modules.
//!
//! The crate is split into the following parts:
//!
//! 1. [Provider] - lazily evaluated, named service descriptors with a lifecycle, dependencies,
//!    a factory and optional application hooks. [Provider::contract] declares a placeholder
//!    that modules satisfy with bindings.
//! 2. [Container] - resolves providers within a [ModuleContext]: contract binding, then
//!    application wide overrides, then singleton caching or transient construction.
//! 3. [Module] - the composition tree. Each module owns hooks, installers and controllers
//!    ([Consumer]), bindings and sub-modules, and registers into its own host [Scope].
//! 4. [AdapterCache] - per module memoization of [Adapter] values read from the host.
//! 5. [App] - the composition root: checks the [DependencyGraph], registers the tree and runs
//!    provider lifecycle hooks.
//!
//! # Example
//!
//! ```rust
//! use std::convert::Infallible;
//!
//! use modi_di::{App, Consumer, ConsumerContext, DepValues, Module, Provider, ResolveError};
//!
//! let db = Provider::builder("db")
//!     .factory(|_| async { Ok::<_, Infallible>(String::from("postgres://localhost")) })
//!     .unwrap();
//!
//! let repo = Provider::builder("repo")
//!     .dep("db", &db)
//!     .factory(|deps: DepValues| async move {
//!         let url = deps.get::<String>("db")?;
//!         Ok::<_, ResolveError>(format!("repo@{url}"))
//!     })
//!     .unwrap();
//!
//! let root = Module::builder("root")
//!     .consumer(
//!         Consumer::controller("users")
//!             .dep("repo", &repo)
//!             .build(|ctx: ConsumerContext| async move {
//!                 assert_eq!(*ctx.deps.get::<String>("repo")?, "repo@postgres://localhost");
//!                 Ok::<_, ResolveError>(())
//!             }),
//!     )
//!     .build();
//!
//! let app = futures::executor::block_on(App::builder(root).build()).unwrap();
//! futures::executor::block_on(app.ready()).unwrap();
//! futures::executor::block_on(app.close()).unwrap();
//! ```

pub mod adapter;
pub mod app;
pub mod consumer;
pub mod container;
pub mod dependency_graph;
pub mod errors;
pub mod factories;
pub mod host;
pub mod identity;
pub mod module;
pub mod provider;
pub mod types;

pub use adapter::{Adapter, AdapterCache, AdapterContext, AdapterMap};
pub use app::{App, AppBuilder};
pub use consumer::{Consumer, ConsumerBuilder, ConsumerContext, ConsumerKind};
pub use container::Container;
pub use dependency_graph::{DependencyGraph, RegistryEntry};
pub use errors::{AppError, CompositionError, HostError, ResolveError};
pub use factories::ProviderFactory;
pub use host::{memory::MemoryHost, HostScope, Scope};
pub use identity::{Identity, IdentityKind};
pub use module::{register_module, Module, ModuleBuilder, ModuleContext};
pub use provider::{
    ErrorHookContext, HookContext, Lifecycle, Provider, ProviderBuilder, ProviderHooks,
    ProviderMap,
};
pub use types::{DepValues, DynError, Injectable, Instance, TypeInfo};
