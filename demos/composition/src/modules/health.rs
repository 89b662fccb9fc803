use kapsel_di::DynError;

type HealthCheck = dyn Fn() -> Result<(), DynError> + Send + Sync;

/// Collects health checks from other modules.
///
/// Left unregistered by default; the request handler treats it as an
/// optional dependency.
pub struct HealthService {
    checks: Vec<Box<HealthCheck>>,
}

impl Default for HealthService {
    fn default() -> Self {
        HealthService::new()
    }
}

impl HealthService {
    pub fn new() -> HealthService {
        HealthService { checks: Vec::new() }
    }

    pub fn add_check(&mut self, check: Box<HealthCheck>) {
        self.checks.push(check);
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    pub fn check_health(&self) -> Result<(), DynError> {
        for check in &self.checks {
            check()?;
        }
        Ok(())
    }
}
