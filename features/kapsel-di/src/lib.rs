//! Auto-wiring dependency injection container with per-type lifetimes.
//!
//! A [`Container`] holds a table of registrations declared in the
//! composition root. Resolution builds object graphs on demand: a
//! registration either binds a type to its own declared constructor
//! (the [`Construct`] trait, whose parameters are auto-wired), calls a
//! registered factory, or hands out a pre-built instance. Every
//! registration carries a lifetime policy — transient, singleton or
//! scoped — and may attach a cleanup routine, which makes the produced
//! instance a tracked resource torn down in reverse creation order.
//!
//! Resolution is available synchronously and asynchronously; the
//! container's own bookkeeping never suspends, only registered async
//! factories and cleanups do. Cycles are caught per resolution call with
//! the full offending path in the error.
//!
//! ```rust
//! use std::sync::Arc;
//! use kapsel_di::{Args, Construct, Container, DynError, Lifetime, ParamSpec};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! impl Construct for Database {
//!     fn parameters() -> Vec<ParamSpec> {
//!         vec![]
//!     }
//!     fn build(_: Args) -> Result<Self, DynError> {
//!         Ok(Database { url: "sqlite::memory:".into() })
//!     }
//! }
//!
//! struct Repository {
//!     database: Arc<Database>,
//! }
//!
//! impl Construct for Repository {
//!     fn parameters() -> Vec<ParamSpec> {
//!         vec![ParamSpec::required::<Database>("database")]
//!     }
//!     fn build(mut args: Args) -> Result<Self, DynError> {
//!         Ok(Repository { database: args.take::<Database>("database")? })
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.register_type::<Database>(Lifetime::Singleton).unwrap();
//! container.register_type::<Repository>(Lifetime::Transient).unwrap();
//!
//! container.validate().unwrap();
//! let repository = container.resolve::<Repository>().unwrap();
//! assert_eq!(repository.database.url, "sqlite::memory:");
//! ```

pub mod construct;
pub mod container;
pub mod errors;
pub mod registry;
pub mod resolver;
pub mod types;

mod resources;
mod validator;

pub use construct::{Args, ArgsError, Construct, ParamSpec};
pub use container::Container;
pub use errors::{
    CallableError, CleanupFailure, ErrorCode, RegisterError, ResolveError, ShutdownErrors,
    ValidationError, ValidationFailure, ValidationReason,
};
pub use registry::Entry;
pub use resolver::Resolver;
pub use types::{DynError, Injectable, Instance, Lifetime, ServiceKey, TypeInfo};
