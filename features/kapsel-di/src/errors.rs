use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, ServiceKey, TypeInfo};

/// Structured classification code carried by every error.
///
/// Rendered as `LAYER::COMPONENT::CATEGORY::SEVERITY[::RECOVERABLE]` and
/// appended to the human-readable message after ` >> `, so callers can
/// classify failures without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub layer: &'static str,
    pub component: &'static str,
    pub category: &'static str,
    pub severity: &'static str,
    pub recoverable: bool,
}

impl ErrorCode {
    pub(crate) const fn new(
        layer: &'static str,
        component: &'static str,
        category: &'static str,
        severity: &'static str,
    ) -> ErrorCode {
        ErrorCode {
            layer,
            component,
            category,
            severity,
            recoverable: false,
        }
    }

    pub(crate) const fn recoverable(mut self) -> ErrorCode {
        self.recoverable = true;
        self
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}::{}::{}",
            self.layer, self.component, self.category, self.severity
        )?;
        if self.recoverable {
            f.write_str("::RECOVERABLE")?;
        }
        Ok(())
    }
}

/// Errors while inserting registrations
#[derive(Error, Debug, Clone)]
pub enum RegisterError {
    /// The exact (type, name) key is already occupied
    #[error("a registration already exists for `{0}` >> CONTAINER::REGISTRY::USAGE::CRITICAL")]
    Duplicate(ServiceKey),
}

impl RegisterError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegisterError::Duplicate(_) => {
                ErrorCode::new("CONTAINER", "REGISTRY", "USAGE", "CRITICAL")
            }
        }
    }
}

/// Errors while resolving a dependency
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The requested key has no table entry
    #[error("`{0}` is not registered >> DEPENDENCY::RESOLVER::MISSING::CRITICAL")]
    MissingRegistration(ServiceKey),

    /// The resolution path revisited a key already on its own stack
    #[error("circular dependency detected: `{cycle}` >> DEPENDENCY::RESOLVER::USAGE::CRITICAL")]
    CircularDependency { cycle: String },

    /// A sync resolve reached a registration that carries an async factory
    #[error("`{0}` requires an async factory, use `async_resolve` >> CALLABLE::RESOLVER::USAGE::ERROR::RECOVERABLE")]
    RequiresAsync(TypeInfo),

    /// A produced or cached instance was not of the required type
    #[error("failed to downcast, required: `{required}` actual: `{actual}` >> CONTAINER::RESOLVER::UNEXPECTED::CRITICAL")]
    Downcast {
        required: &'static str,
        actual: &'static str,
    },

    /// A registered callable failed
    #[error(transparent)]
    Callable(#[from] CallableError),
}

impl ResolveError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ResolveError::MissingRegistration(_) => {
                ErrorCode::new("DEPENDENCY", "RESOLVER", "MISSING", "CRITICAL")
            }
            ResolveError::CircularDependency { .. } => {
                ErrorCode::new("DEPENDENCY", "RESOLVER", "USAGE", "CRITICAL")
            }
            ResolveError::RequiresAsync(_) => {
                ErrorCode::new("CALLABLE", "RESOLVER", "USAGE", "ERROR").recoverable()
            }
            ResolveError::Downcast { .. } => {
                ErrorCode::new("CONTAINER", "RESOLVER", "UNEXPECTED", "CRITICAL")
            }
            ResolveError::Callable(inner) => inner.code(),
        }
    }
}

/// A registered factory or cleanup routine failed
#[derive(Error, Debug, Clone)]
pub enum CallableError {
    /// A factory or constructor returned an error
    #[error("factory for `{type_info}` failed: {error} >> CALLABLE::RESOLVER::UNEXPECTED::ERROR")]
    Factory {
        type_info: TypeInfo,
        error: Arc<DynError>,
    },

    /// One or more cleanups failed during teardown
    #[error(transparent)]
    Shutdown(#[from] ShutdownErrors),
}

impl CallableError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CallableError::Factory { .. } => {
                ErrorCode::new("CALLABLE", "RESOLVER", "UNEXPECTED", "ERROR")
            }
            CallableError::Shutdown(inner) => inner.code(),
        }
    }

    pub(crate) fn factory(type_info: TypeInfo, error: DynError) -> CallableError {
        CallableError::Factory {
            type_info,
            error: Arc::new(error),
        }
    }
}

/// Aggregate of every cleanup failure from one teardown pass.
///
/// Teardown never stops early, so this lists every resource that failed
/// or had to be skipped, in the order they were attempted.
#[derive(Error, Debug, Clone)]
pub struct ShutdownErrors {
    pub errors: Vec<CleanupFailure>,
}

impl ShutdownErrors {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::new("RESOURCE", "CONTAINER", "UNEXPECTED", "ERROR")
    }
}

impl std::fmt::Display for ShutdownErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "errors raised while shutting down resources:")?;
        for error in &self.errors {
            writeln!(f, "- {error}")?;
        }
        write!(f, " >> {}", self.code())
    }
}

/// A single resource that could not be torn down
#[derive(Error, Debug, Clone)]
pub enum CleanupFailure {
    /// The cleanup routine returned an error
    #[error("cleanup for `{type_info}` failed: {error}")]
    Raised {
        type_info: TypeInfo,
        error: Arc<DynError>,
    },

    /// A sync teardown met an async-only cleanup and skipped it
    #[error("cleanup for `{type_info}` is async-only and was skipped, use `async_shutdown_resources`")]
    AsyncOnly { type_info: TypeInfo },
}

/// Aggregate of every unresolvable dependency found by a validation pass
#[derive(Error, Debug, Clone)]
pub struct ValidationError {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::new("DEPENDENCY", "VALIDATOR", "MISSING", "ERROR")
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "container validation found unresolvable dependencies:")?;
        for failure in &self.failures {
            writeln!(f, "- {failure}")?;
        }
        write!(f, " >> {}", self.code())
    }
}

/// One unresolvable constructor parameter
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    /// The registration declaring the parameter
    pub consumer: TypeInfo,
    /// The declared parameter name
    pub parameter: &'static str,
    /// The type the parameter requires
    pub required: TypeInfo,
    pub reason: ValidationReason,
}

#[derive(Debug, Clone)]
pub enum ValidationReason {
    /// The required type has no default registration
    NotRegistered,
    /// The declared parameters form a cycle
    Cycle(String),
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            ValidationReason::NotRegistered => write!(
                f,
                "`{}` requires `{}` for parameter `{}`, which is not registered",
                self.consumer.short_name(),
                self.required.short_name(),
                self.parameter,
            ),
            ValidationReason::Cycle(cycle) => write!(
                f,
                "`{}` parameter `{}` closes a dependency cycle: `{cycle}`",
                self.consumer.short_name(),
                self.parameter,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceKey;

    #[test]
    fn code_renders_layered_string() {
        let code = ErrorCode::new("DEPENDENCY", "RESOLVER", "MISSING", "CRITICAL");
        assert_eq!(code.to_string(), "DEPENDENCY::RESOLVER::MISSING::CRITICAL");
        assert_eq!(
            code.recoverable().to_string(),
            "DEPENDENCY::RESOLVER::MISSING::CRITICAL::RECOVERABLE"
        );
    }

    #[test]
    fn messages_end_with_their_code() {
        struct Svc;
        let errors = [
            ResolveError::MissingRegistration(ServiceKey::of::<Svc>()),
            ResolveError::CircularDependency {
                cycle: "A -> B -> A".into(),
            },
            ResolveError::RequiresAsync(TypeInfo::of::<Svc>()),
        ];
        for error in errors {
            let rendered = error.to_string();
            assert!(
                rendered.ends_with(&error.code().to_string()),
                "`{rendered}` does not end with its code"
            );
        }
    }
}
