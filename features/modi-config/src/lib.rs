//! Modi Config provides a registry of configs that can be injected in the rest of the
//! modules.
//!
//! Modi Config is split into two major parts:
//! 1. ConfigProvider: Used to create the registry of all configs
//! 2. Config<T>: A wrapper type handed to factories and consumers that depend on a config
//!
//! # Examples
//!
//! ```rust
//! use modi_config::provider::ConfigProvider;
//!
//! #[derive(Clone)]
//! struct AppConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! let app_config = AppConfig {
//!     host: "localhost".to_string(),
//!     port: 8080_u16,
//! };
//!
//! let mut config_provider = ConfigProvider::initialize();
//! config_provider.add_config(app_config.clone()).unwrap();
//!
//! let retrieved_config = config_provider.get_config::<AppConfig>().unwrap();
//! assert_eq!(app_config.host, retrieved_config.host);
//! assert_eq!(app_config.port, retrieved_config.port);
//! ```

pub mod config;
pub mod errors;
pub mod provider;
