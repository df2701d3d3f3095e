//! Every rejected operation leaves a `tracing` event behind.

use std::rc::Rc;

use tracing::Level;
use viewstate::{
    Change, Component, LocalStorage, ObservableBox, PropertySubscriber, RenderCx, Result,
    StateConfig, StateError, SubscriberRegistry, View,
};
use viewstate_harness::LogCapture;

struct Nop;

impl PropertySubscriber for Nop {
    fn property_has_changed(&self, _change: &Change<'_>) {}
}

#[test]
fn absent_write_warns() {
    let capture = LogCapture::new();
    let _guard = capture.install();

    let registry = SubscriberRegistry::new();
    let cell = ObservableBox::with_owner(&registry, Some(1_i32), None, "maybe").unwrap();
    assert!(cell.set(None).is_err());

    let warns = capture.at(Level::WARN);
    assert!(warns.iter().any(|e| e.message.contains("absent value rejected")
        && e.field("name") == Some("maybe")));
}

#[test]
fn delete_with_subscribers_logs_an_error_with_the_count() {
    let capture = LogCapture::new();
    let _guard = capture.install();

    let registry = SubscriberRegistry::new();
    let store = LocalStorage::new(&registry);
    store.set_or_create("theme", "light".to_owned());
    let _a = store.link::<String>("theme", None, "a").unwrap();
    let _b = store.prop::<String>("theme", None, "b").unwrap();

    assert!(!store.delete("theme"));
    let errors = capture.at(Level::ERROR);
    let event = errors
        .iter()
        .find(|e| e.message.contains("still has subscribers"))
        .expect("delete rejection logged");
    assert_eq!(event.field("name"), Some("theme"));
    assert_eq!(event.field("subscribers"), Some("2"));
}

#[test]
fn use_after_teardown_warns() {
    struct Empty;
    impl Component for Empty {
        fn render(&mut self, _cx: &RenderCx<'_>) -> Result<()> {
            Ok(())
        }
    }

    let capture = LogCapture::new();
    let _guard = capture.install();

    let registry = SubscriberRegistry::new();
    let mut view = View::builder(&registry, "gone").build(|_| Ok(Empty)).unwrap();
    view.about_to_be_deleted().unwrap();
    assert!(matches!(
        view.perform_render(),
        Err(StateError::UseAfterTeardown { .. })
    ));
    assert!(capture.contains(Level::WARN, "view used after teardown"));

    let cell = ObservableBox::new(&registry, 1_u8).unwrap();
    cell.teardown(None);
    assert!(cell.set(2).is_err());
    assert!(capture.contains(Level::WARN, "write after teardown rejected"));
}

#[test]
fn stale_subscriber_is_reported_during_notify() {
    let capture = LogCapture::new();
    let _guard = capture.install();

    let registry = SubscriberRegistry::new();
    let cell = ObservableBox::new(&registry, 0_u8).unwrap();
    let nop = Rc::new(Nop);
    let id = registry.register(&nop).unwrap();
    cell.subscribe(id);
    registry.unregister(id);

    cell.set(1).unwrap();
    assert!(capture.contains(Level::ERROR, "unknown subscriber id"));
    assert_eq!(cell.subscriber_count(), 0);
}

#[test]
fn registry_exhaustion_is_an_error_event() {
    let capture = LogCapture::new();
    let _guard = capture.install();

    let registry = SubscriberRegistry::with_config(StateConfig::default().with_max_subscribers(2));
    let _a = ObservableBox::new(&registry, 0_u8).unwrap();
    let _b = ObservableBox::new(&registry, 0_u8).unwrap();
    assert!(matches!(
        ObservableBox::new(&registry, 0_u8),
        Err(StateError::RegistryExhausted { live: 2 })
    ));
    assert!(capture.contains(Level::ERROR, "subscriber registry exhausted"));
}

#[test]
fn store_type_mismatch_warns() {
    let capture = LogCapture::new();
    let _guard = capture.install();

    let registry = SubscriberRegistry::new();
    let store = LocalStorage::new(&registry);
    store.set_or_create("n", 1_i32);
    assert!(!store.set("n", 1_u64));
    assert!(capture.contains(Level::WARN, "different type"));
}

#[test]
fn subscribing_an_unregistered_id_warns() {
    let capture = LogCapture::new();
    let _guard = capture.install();

    let registry = SubscriberRegistry::new();
    let store = LocalStorage::new(&registry);
    store.set_or_create("n", 1_i32);
    let nop = Rc::new(Nop);
    let id = registry.register(&nop).unwrap();
    registry.unregister(id);

    assert!(!store.subscribe_to_changes_of("n", id));
    assert_eq!(store.number_of_subscribers_to("n"), Some(0));
    let warns = capture.at(Level::WARN);
    assert!(warns.iter().any(|e| e.message.contains("subscribe with unregistered id")
        && e.field("subscriber") == Some(&*id.to_string())));
}
