use kapsel_di::TypeInfo;

/// Errors when trying to acquire a config
#[derive(thiserror::Error, Debug, Clone)]
pub enum GetConfigError {
    /// No config of the required type was added to the provider
    #[error("no config of type `{0}` is registered")]
    Missing(TypeInfo),
}

/// Errors when trying to register a config
#[derive(thiserror::Error, Debug, Clone)]
pub enum RegisterConfigError {
    /// A config of this type is already registered
    #[error("a config of type `{0}` is already registered")]
    AlreadyRegistered(TypeInfo),
}
