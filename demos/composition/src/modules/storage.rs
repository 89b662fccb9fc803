use std::sync::Mutex;

use kapsel_di::DynError;

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Stand-in for a pooled database connection
pub struct Database {
    url: String,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Database, DynError> {
        tracing::debug!("connecting to {url}");
        Ok(Database { url: url.to_string() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Scoped per-request session cache
#[derive(Default)]
pub struct SessionStore {
    open: Mutex<Vec<String>>,
}

impl SessionStore {
    pub fn open(&self, session: &str) {
        self.open.lock().unwrap().push(session.to_string());
    }

    pub fn flush(&self) -> Result<(), DynError> {
        let flushed = self.open.lock().unwrap().len();
        tracing::debug!("flushed {flushed} sessions");
        Ok(())
    }
}

impl kapsel_di::Construct for SessionStore {
    fn parameters() -> Vec<kapsel_di::ParamSpec> {
        vec![]
    }

    fn build(_: kapsel_di::Args) -> Result<Self, DynError> {
        Ok(SessionStore::default())
    }
}
