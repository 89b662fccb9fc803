use std::sync::Arc;

use futures::{executor::block_on, future::BoxFuture, FutureExt};
use kapsel_config::{Config, ConfigProvider};
use kapsel_di::{
    Args, Construct, Container, DynError, Entry, Lifetime, ParamSpec, Resolver,
};

use crate::modules::{
    health::HealthService,
    storage::{Database, DatabaseConfig, SessionStore},
};

mod modules;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let container = match compose() {
        Ok(container) => container,
        Err(error) => {
            eprintln!("composition failed: {error}");
            return;
        }
    };

    // catch wiring mistakes before anything is constructed
    if let Err(report) = container.validate() {
        eprintln!("{report}");
        return;
    }

    block_on(run(&container));

    if let Err(error) = block_on(container.async_shutdown_resources()) {
        eprintln!("shutdown reported failures: {error}");
    }
}

fn compose() -> Result<Container, Box<dyn std::error::Error>> {
    let mut configs = ConfigProvider::new();
    configs.add(DatabaseConfig {
        url: "postgres://localhost/app".into(),
    })?;

    let mut health = HealthService::new();
    health.add_check(Box::new(|| Ok(())));

    let mut container = Container::new();
    container.register_instance(configs);
    container.register_instance(health);
    container.register_type::<Config<DatabaseConfig>>(Lifetime::Singleton)?;
    container.register_async_factory(connect_database, Lifetime::Singleton)?;
    container.register(
        Entry::<SessionStore>::bind(Lifetime::Scoped)
            .with_cleanup(|store| store.flush()),
    )?;
    container.register_type::<RequestHandler>(Lifetime::Transient)?;
    Ok(container)
}

fn connect_database<'a>(
    resolver: &'a Resolver<'a>,
) -> BoxFuture<'a, Result<Database, DynError>> {
    async move {
        let config = resolver.resolve_async::<Config<DatabaseConfig>>().await?;
        Database::connect(&config.url).await
    }
    .boxed()
}

async fn run(container: &Container) {
    for request in ["alpha", "beta"] {
        match container.async_resolve::<RequestHandler>().await {
            Ok(handler) => handler.handle(request),
            Err(error) => eprintln!("{error}"),
        }
        // each request gets a fresh session scope
        if let Err(error) = container.clear_scope() {
            eprintln!("scope teardown reported failures: {error}");
        }
    }
}

struct RequestHandler {
    database: Arc<Database>,
    sessions: Arc<SessionStore>,
    health: Option<Arc<HealthService>>,
}

impl Construct for RequestHandler {
    fn parameters() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required::<Database>("database"),
            ParamSpec::required::<SessionStore>("sessions"),
            ParamSpec::optional::<HealthService>("health"),
        ]
    }

    fn build(mut args: Args) -> Result<Self, DynError> {
        Ok(RequestHandler {
            database: args.take::<Database>("database")?,
            sessions: args.take::<SessionStore>("sessions")?,
            health: args.take_optional::<HealthService>("health")?,
        })
    }
}

impl RequestHandler {
    fn handle(&self, request: &str) {
        if let Some(health) = &self.health {
            if let Err(error) = health.check_health() {
                tracing::warn!("health check failed: {error}");
                return;
            }
        }
        self.sessions.open(request);
        tracing::info!(
            "handled `{request}` against {} (health checks: {})",
            self.database.url(),
            self.health.as_ref().map_or(0, |h| h.check_count()),
        );
    }
}
