use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use kapsel_di::{Container, Entry, Lifetime};

struct Service {
    id: usize,
}

fn register_service(container: &mut Container, lifetime: Lifetime) -> Arc<AtomicUsize> {
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = constructed.clone();
    container
        .register(Entry::factory(
            move |_| {
                Ok(Service {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                })
            },
            lifetime,
        ))
        .unwrap();
    constructed
}

#[test]
fn singleton_resolutions_share_one_instance() {
    let mut container = Container::new();
    let constructed = register_service(&mut container, Lifetime::Singleton);

    let first = container.resolve::<Service>().unwrap();
    let second = container.resolve::<Service>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
}

#[test]
fn transient_resolutions_are_always_fresh() {
    let mut container = Container::new();
    let constructed = register_service(&mut container, Lifetime::Transient);

    let first = container.resolve::<Service>().unwrap();
    let second = container.resolve::<Service>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_ne!(first.id, second.id);
    assert_eq!(constructed.load(Ordering::SeqCst), 2);
}

#[test]
fn scoped_resolutions_share_within_a_scope() {
    let mut container = Container::new();
    let constructed = register_service(&mut container, Lifetime::Scoped);

    let first = container.resolve::<Service>().unwrap();
    let second = container.resolve::<Service>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
}

#[test]
fn clear_scope_yields_a_fresh_scoped_instance() {
    let mut container = Container::new();
    let constructed = register_service(&mut container, Lifetime::Scoped);

    let before = container.resolve::<Service>().unwrap();
    container.clear_scope().unwrap();
    let after = container.resolve::<Service>().unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(constructed.load(Ordering::SeqCst), 2);
}

#[test]
fn clear_scope_leaves_singletons_untouched() {
    let mut container = Container::new();
    register_service(&mut container, Lifetime::Singleton);

    let before = container.resolve::<Service>().unwrap();
    container.clear_scope().unwrap();
    let after = container.resolve::<Service>().unwrap();

    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn singletons_are_shared_across_scopes() {
    struct Scoped;
    let mut container = Container::new();
    register_service(&mut container, Lifetime::Singleton);
    container
        .register(Entry::factory(|_| Ok(Scoped), Lifetime::Scoped))
        .unwrap();

    let singleton_before = container.resolve::<Service>().unwrap();
    let scoped_before = container.resolve::<Scoped>().unwrap();
    container.clear_scope().unwrap();
    let singleton_after = container.resolve::<Service>().unwrap();
    let scoped_after = container.resolve::<Scoped>().unwrap();

    assert!(Arc::ptr_eq(&singleton_before, &singleton_after));
    assert!(!Arc::ptr_eq(&scoped_before, &scoped_after));
}
