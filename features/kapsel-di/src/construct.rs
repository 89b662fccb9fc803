use std::{marker::PhantomData, sync::Arc};

use thiserror::Error;

use crate::types::{DynError, Injectable, Instance, TypeInfo};

/// Metadata for one constructor parameter, in declaration order.
///
/// Auto-wiring always resolves a parameter against the *default* entry of
/// its declared type. An optional parameter resolves to absence when that
/// type is unregistered; a parameter with a default producer falls back to
/// it instead of failing.
#[derive(Clone)]
pub struct ParamSpec {
    pub(crate) name: &'static str,
    pub(crate) type_info: TypeInfo,
    pub(crate) optional: bool,
    pub(crate) default: Option<Arc<dyn Fn() -> Instance + Send + Sync>>,
}

impl ParamSpec {
    /// A required parameter; resolution fails when its type is unregistered
    pub fn required<T: Injectable>(name: &'static str) -> ParamSpec {
        ParamSpec {
            name,
            type_info: TypeInfo::of::<T>(),
            optional: false,
            default: None,
        }
    }

    /// An optional parameter; resolves to `None` when its type is unregistered
    pub fn optional<T: Injectable>(name: &'static str) -> ParamSpec {
        ParamSpec {
            name,
            type_info: TypeInfo::of::<T>(),
            optional: true,
            default: None,
        }
    }

    /// Falls back to `make` when the parameter's type is unregistered
    pub fn with_default<T: Injectable>(
        name: &'static str,
        make: impl Fn() -> T + Send + Sync + 'static,
    ) -> ParamSpec {
        ParamSpec {
            name,
            type_info: TypeInfo::of::<T>(),
            optional: false,
            default: Some(Arc::new(move || Instance::new(make()))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl std::fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("type", &self.type_info.type_name)
            .field("optional", &self.optional)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Errors while taking resolved arguments out of [`Args`]
#[derive(Error, Debug)]
pub enum ArgsError {
    /// No parameter of that name was declared, or it was already taken
    #[error("no resolved argument named `{0}`")]
    Unknown(&'static str),
    /// The parameter resolved to absence but was taken as required
    #[error("argument `{0}` resolved to absence, take it with `take_optional`")]
    Absent(&'static str),
    /// The resolved value was not of the requested type
    #[error("argument `{name}` holds `{actual}`, not the requested type")]
    Mismatch { name: &'static str, actual: &'static str },
}

/// Resolved constructor arguments, handed to [`Construct::build`].
///
/// Values are taken by declared parameter name; optional parameters that
/// resolved to absence must be taken with [`Args::take_optional`].
pub struct Args {
    values: Vec<(&'static str, Option<Instance>)>,
}

impl Args {
    pub(crate) fn new(values: Vec<(&'static str, Option<Instance>)>) -> Args {
        Args { values }
    }

    pub fn take<T: Injectable>(&mut self, name: &'static str) -> Result<Arc<T>, ArgsError> {
        match self.take_optional::<T>(name)? {
            Some(value) => Ok(value),
            None => Err(ArgsError::Absent(name)),
        }
    }

    pub fn take_optional<T: Injectable>(
        &mut self,
        name: &'static str,
    ) -> Result<Option<Arc<T>>, ArgsError> {
        let index = self
            .values
            .iter()
            .position(|(n, _)| *n == name)
            .ok_or(ArgsError::Unknown(name))?;
        let (_, value) = self.values.remove(index);
        match value {
            Some(instance) => instance
                .downcast::<T>()
                .map(Some)
                .map_err(|actual| ArgsError::Mismatch { name, actual }),
            None => Ok(None),
        }
    }
}

/// A type the container can build from declared parameters.
///
/// This is the registration-time type descriptor: since Rust has no runtime
/// constructor introspection, a constructible type declares its ordered
/// parameter list and consumes the resolved values itself.
///
/// ```rust
/// use std::sync::Arc;
/// use kapsel_di::{Args, Construct, DynError, ParamSpec};
///
/// struct Database;
/// # impl Construct for Database {
/// #     fn parameters() -> Vec<ParamSpec> { vec![] }
/// #     fn build(_: Args) -> Result<Self, DynError> { Ok(Database) }
/// # }
/// struct UserService {
///     database: Arc<Database>,
/// }
///
/// impl Construct for UserService {
///     fn parameters() -> Vec<ParamSpec> {
///         vec![ParamSpec::required::<Database>("database")]
///     }
///
///     fn build(mut args: Args) -> Result<Self, DynError> {
///         Ok(UserService {
///             database: args.take::<Database>("database")?,
///         })
///     }
/// }
/// ```
pub trait Construct: Injectable + Sized {
    /// Ordered constructor parameters
    fn parameters() -> Vec<ParamSpec>;

    /// Builds the instance from resolved arguments
    fn build(args: Args) -> Result<Self, DynError>;
}

/// Object-safe wrapper over [`Construct`], stored in the registration table
pub(crate) trait DynConstruct: Send + Sync {
    fn build(&self, args: Args) -> Result<Instance, DynError>;
}

pub(crate) struct ConstructorOf<T>(PhantomData<fn() -> T>);

impl<T> ConstructorOf<T> {
    pub(crate) fn new() -> ConstructorOf<T> {
        ConstructorOf(PhantomData)
    }
}

impl<T: Construct> DynConstruct for ConstructorOf<T> {
    fn build(&self, args: Args) -> Result<Instance, DynError> {
        T::build(args).map(Instance::new)
    }
}
