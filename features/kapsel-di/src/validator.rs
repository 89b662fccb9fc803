use std::{any::TypeId, collections::HashSet, sync::Arc};

use crate::errors::{ValidationError, ValidationFailure, ValidationReason};
use crate::registry::{Registration, Registry};
use crate::resolver::render_cycle;
use crate::types::{ServiceKey, TypeInfo};

/// Dry-run walk of every default registration's declared parameters.
///
/// Nothing is instantiated. Every required parameter whose type has no
/// default registration anywhere in the chain is collected, as is every
/// declared-parameter cycle; the walk never stops at the first failure.
pub(crate) fn validate(registry: &Registry) -> Result<(), ValidationError> {
    let mut walk = Walk {
        registry,
        checked: HashSet::new(),
        reported: HashSet::new(),
        failures: Vec::new(),
    };

    for registration in registry.defaults() {
        if walk.checked.contains(&registration.type_info.type_id) {
            continue;
        }
        let mut path = Vec::new();
        walk.visit(registration, &mut path);
    }

    if walk.failures.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            failures: walk.failures,
        })
    }
}

struct Walk<'r> {
    registry: &'r Registry,
    /// Subtrees already fully walked
    checked: HashSet<TypeId>,
    /// (consumer, parameter) pairs already reported
    reported: HashSet<(TypeId, &'static str)>,
    failures: Vec<ValidationFailure>,
}

impl Walk<'_> {
    fn visit(&mut self, registration: &Arc<Registration>, path: &mut Vec<ServiceKey>) {
        let key = ServiceKey::from_info(registration.type_info, None);
        path.push(key);

        for param in &registration.params {
            let param_key = ServiceKey::from_info(param.type_info, None);
            match self.registry.lookup(&param_key) {
                Some(dependency) => {
                    if path.contains(&param_key) {
                        self.report(
                            registration,
                            param.name,
                            param.type_info,
                            ValidationReason::Cycle(render_cycle(path, &param_key)),
                        );
                    } else if !self.checked.contains(&param_key.type_info.type_id) {
                        self.visit(&dependency, path);
                    }
                }
                None => {
                    if !param.optional && param.default.is_none() {
                        self.report(
                            registration,
                            param.name,
                            param.type_info,
                            ValidationReason::NotRegistered,
                        );
                    }
                }
            }
        }

        path.pop();
        self.checked.insert(key.type_info.type_id);
    }

    fn report(
        &mut self,
        registration: &Registration,
        parameter: &'static str,
        required: TypeInfo,
        reason: ValidationReason,
    ) {
        if self
            .reported
            .insert((registration.type_info.type_id, parameter))
        {
            self.failures.push(ValidationFailure {
                consumer: registration.type_info,
                parameter,
                required,
                reason,
            });
        }
    }
}
