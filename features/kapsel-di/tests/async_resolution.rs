use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures::{executor::block_on, future::BoxFuture, FutureExt};
use kapsel_di::{
    Args, Construct, Container, DynError, Lifetime, ParamSpec, ResolveError, Resolver,
};

#[derive(Debug)]
struct Database {
    url: String,
}

#[derive(Debug)]
struct Repository {
    database: Arc<Database>,
}

impl Construct for Repository {
    fn parameters() -> Vec<ParamSpec> {
        vec![ParamSpec::required::<Database>("database")]
    }
    fn build(mut args: Args) -> Result<Self, DynError> {
        Ok(Repository {
            database: args.take::<Database>("database")?,
        })
    }
}

fn connect<'a>(_: &'a Resolver<'a>) -> BoxFuture<'a, Result<Database, DynError>> {
    async move {
        Ok(Database {
            url: "postgres://replica".into(),
        })
    }
    .boxed()
}

#[test]
fn async_factories_resolve_through_the_async_path() {
    let mut container = Container::new();
    container
        .register_async_factory(connect, Lifetime::Singleton)
        .unwrap();

    let database = block_on(container.async_resolve::<Database>()).unwrap();
    assert_eq!(database.url, "postgres://replica");
}

#[test]
fn sync_resolve_refuses_async_factories() {
    let mut container = Container::new();
    container
        .register_async_factory(connect, Lifetime::Singleton)
        .unwrap();

    let error = container.resolve::<Database>().unwrap_err();
    assert!(matches!(error, ResolveError::RequiresAsync(_)));
    assert!(error
        .to_string()
        .ends_with("CALLABLE::RESOLVER::USAGE::ERROR::RECOVERABLE"));
}

#[test]
fn the_async_requirement_is_transitive() {
    let mut container = Container::new();
    container
        .register_async_factory(connect, Lifetime::Singleton)
        .unwrap();
    container.register_type::<Repository>(Lifetime::Transient).unwrap();

    // the repository itself is synchronous, but its dependency is not
    let error = container.resolve::<Repository>().unwrap_err();
    assert!(matches!(error, ResolveError::RequiresAsync(_)));
}

#[test]
fn async_resolution_handles_mixed_chains() {
    let mut container = Container::new();
    container
        .register_async_factory(connect, Lifetime::Singleton)
        .unwrap();
    container.register_type::<Repository>(Lifetime::Transient).unwrap();

    let repository = block_on(container.async_resolve::<Repository>()).unwrap();
    assert_eq!(repository.database.url, "postgres://replica");
}

#[test]
fn async_resolution_accepts_sync_factories_transparently() {
    struct Port(u16);

    let mut container = Container::new();
    container
        .register_factory(|_| Ok(Port(8080)), Lifetime::Singleton)
        .unwrap();

    let port = block_on(container.async_resolve::<Port>()).unwrap();
    assert_eq!(port.0, 8080);
}

#[test]
fn async_singletons_are_constructed_once() {
    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    fn counted<'a>(_: &'a Resolver<'a>) -> BoxFuture<'a, Result<Database, DynError>> {
        async move {
            CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
            Ok(Database {
                url: "counted".into(),
            })
        }
        .boxed()
    }

    let mut container = Container::new();
    container
        .register_async_factory(counted, Lifetime::Singleton)
        .unwrap();

    let (first, second) = block_on(async {
        futures::join!(
            container.async_resolve::<Database>(),
            container.async_resolve::<Database>()
        )
    });
    let first = first.unwrap();
    let second = second.unwrap();

    assert!(Arc::ptr_eq(&first, &second) || first.url == second.url);
    assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);

    let third = block_on(container.async_resolve::<Database>()).unwrap();
    assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
    assert_eq!(third.url, "counted");
}

#[test]
fn concurrent_resolutions_keep_separate_stacks() {
    // two independent logical resolutions of overlapping types must not
    // falsely trigger cycle detection against each other
    let mut container = Container::new();
    container
        .register_async_factory(connect, Lifetime::Transient)
        .unwrap();
    container.register_type::<Repository>(Lifetime::Transient).unwrap();

    let (left, right) = block_on(async {
        futures::join!(
            container.async_resolve::<Repository>(),
            container.async_resolve::<Repository>()
        )
    });

    assert!(left.is_ok());
    assert!(right.is_ok());
}

#[test]
fn async_factories_pull_dependencies_through_the_resolver() {
    struct Report {
        heading: String,
    }

    fn build_report<'a>(resolver: &'a Resolver<'a>) -> BoxFuture<'a, Result<Report, DynError>> {
        async move {
            let database = resolver.resolve_async::<Database>().await?;
            Ok(Report {
                heading: format!("against {}", database.url),
            })
        }
        .boxed()
    }

    let mut container = Container::new();
    container
        .register_async_factory(connect, Lifetime::Singleton)
        .unwrap();
    container
        .register_async_factory(build_report, Lifetime::Transient)
        .unwrap();

    let report = block_on(container.async_resolve::<Report>()).unwrap();
    assert_eq!(report.heading, "against postgres://replica");
}

#[test]
fn async_factory_cycles_are_detected() {
    #[derive(Debug)]
    struct Ping;
    struct Pong;

    fn ping<'a>(resolver: &'a Resolver<'a>) -> BoxFuture<'a, Result<Ping, DynError>> {
        async move {
            let _ = resolver.resolve_async::<Pong>().await?;
            Ok(Ping)
        }
        .boxed()
    }
    fn pong<'a>(resolver: &'a Resolver<'a>) -> BoxFuture<'a, Result<Pong, DynError>> {
        async move {
            let _ = resolver.resolve_async::<Ping>().await?;
            Ok(Pong)
        }
        .boxed()
    }

    let mut container = Container::new();
    container
        .register_async_factory(ping, Lifetime::Transient)
        .unwrap();
    container
        .register_async_factory(pong, Lifetime::Transient)
        .unwrap();

    let error = block_on(container.async_resolve::<Ping>()).unwrap_err();
    assert!(error.to_string().contains("Ping -> Pong -> Ping"));
}

#[test]
fn async_factory_errors_propagate() {
    #[derive(Debug)]
    struct Flaky;

    fn flaky<'a>(_: &'a Resolver<'a>) -> BoxFuture<'a, Result<Flaky, DynError>> {
        async move { Err("connection refused".into()) }.boxed()
    }

    let mut container = Container::new();
    container
        .register_async_factory(flaky, Lifetime::Transient)
        .unwrap();

    let error = block_on(container.async_resolve::<Flaky>()).unwrap_err();
    assert!(matches!(error, ResolveError::Callable(_)));
    assert!(error.to_string().contains("connection refused"));
}
