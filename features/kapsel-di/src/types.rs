use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// All errors crossing the factory/cleanup boundary are boxed
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume that resolution may be driven from a multithreaded async runtime,
/// so anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

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

    /// The type name with module paths stripped, for compact diagnostics
    pub fn short_name(&self) -> String {
        strip_paths(self.type_name)
    }
}

/// Strips module paths from a type name, keeping generic structure intact.
///
/// `kapsel::tests::Repo<alloc::string::String>` becomes `Repo<String>`.
fn strip_paths(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut segment_start = out.len();
    let mut chars = type_name.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                let _ = chars.next();
                out.truncate(segment_start);
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' => {
                out.push(c);
                segment_start = out.len();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Key of a registration: a type identity plus an optional name.
///
/// The unnamed key is the *default* entry for its type. Auto-wiring only
/// ever resolves defaults; named entries are for manual resolution.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct ServiceKey {
    pub type_info: TypeInfo,
    pub name: Option<&'static str>,
}
impl ServiceKey {
    pub fn of<T: 'static>() -> ServiceKey {
        ServiceKey {
            type_info: TypeInfo::of::<T>(),
            name: None,
        }
    }

    pub fn named<T: 'static>(name: &'static str) -> ServiceKey {
        ServiceKey {
            type_info: TypeInfo::of::<T>(),
            name: Some(name),
        }
    }

    pub(crate) fn from_info(type_info: TypeInfo, name: Option<&'static str>) -> ServiceKey {
        ServiceKey { type_info, name }
    }

    /// Compact rendering used in cycle paths and error messages
    pub fn display_name(&self) -> String {
        match self.name {
            Some(name) => format!("{}[{}]", self.type_info.short_name(), name),
            None => self.type_info.short_name(),
        }
    }
}
impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name {
            Some(name) => write!(f, "{} (name `{name}`)", self.type_info),
            None => write!(f, "{}", self.type_info),
        }
    }
}

/// Instance reuse policy of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// A new instance on every resolution, never cached
    Transient,
    /// One instance for the lifetime of the container
    Singleton,
    /// One instance per scope, discarded by `clear_scope`
    Scoped,
}

/// A produced instance, type-erased for storage in the cache tiers
#[derive(Clone)]
pub struct Instance {
    info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Injectable>(value: T) -> Instance {
        Instance {
            info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    /// Recovers the typed instance. On mismatch returns the actual type name.
    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.value.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    #[test]
    fn short_name_strips_module_paths() {
        assert_eq!(strip_paths("kapsel_di::types::tests::Plain"), "Plain");
        assert_eq!(
            strip_paths("alloc::vec::Vec<alloc::string::String>"),
            "Vec<String>"
        );
        assert_eq!(strip_paths("(core::option::Option<u8>, u16)"), "(Option<u8>, u16)");
    }

    #[test]
    fn downcast_reports_actual_type_on_mismatch() {
        let instance = Instance::new(Plain);
        let err = instance.downcast::<String>().unwrap_err();
        assert!(err.ends_with("Plain"));
    }

    #[test]
    fn named_and_default_keys_differ() {
        assert_ne!(ServiceKey::of::<Plain>(), ServiceKey::named::<Plain>("x"));
        assert_eq!(ServiceKey::named::<Plain>("x"), ServiceKey::named::<Plain>("x"));
    }
}
