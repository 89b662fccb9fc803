//! Typed application configuration, injectable through the container.
//!
//! Config structs are collected into a [`ConfigProvider`] registry at
//! composition time. Services never depend on the provider directly:
//! they declare a [`Config<T>`] constructor parameter, and auto-wiring
//! pulls the matching config out of the registry.
//!
//! ```rust
//! use kapsel_config::{Config, ConfigProvider};
//! use kapsel_di::{Container, Lifetime};
//!
//! #[derive(Clone)]
//! struct HttpConfig {
//!     port: u16,
//! }
//!
//! let mut provider = ConfigProvider::new();
//! provider.add(HttpConfig { port: 8080 }).unwrap();
//!
//! let mut container = Container::new();
//! container.register_instance(provider);
//! container
//!     .register_type::<Config<HttpConfig>>(Lifetime::Singleton)
//!     .unwrap();
//!
//! let config = container.resolve::<Config<HttpConfig>>().unwrap();
//! assert_eq!(config.port, 8080);
//! ```

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use errors::{GetConfigError, RegisterConfigError};
pub use provider::ConfigProvider;
