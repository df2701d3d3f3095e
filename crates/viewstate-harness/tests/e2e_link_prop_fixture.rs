//! End-to-end run of the parent/child link-prop fixture through the host.

use viewstate::{Lifecycle, SubscriberRegistry};
use viewstate_harness::LinkPropFixture;
use viewstate_harness::fixtures::PROP_VALUE;

#[test]
fn first_render_registers_everything() {
    let registry = SubscriberRegistry::new();
    let mut fx = LinkPropFixture::build(&registry).unwrap();
    fx.host.render_all().unwrap();

    assert_eq!(registry.count(), 7);
    assert_eq!(fx.for_link_subscribers(), 2);

    let child = fx.child.borrow();
    assert_eq!(child.lifecycle(), Lifecycle::Idle);
    assert_eq!(
        child.component().last_seen,
        Some((true, PROP_VALUE.to_owned(), 0))
    );
    let deps: Vec<String> = child.properties_needed_to_render().into_iter().collect();
    assert_eq!(deps, ["clicks_", "link_", "prop_"]);
}

#[test]
fn parent_write_reaches_child_link_only() {
    let registry = SubscriberRegistry::new();
    let mut fx = LinkPropFixture::build(&registry).unwrap();
    fx.host.render_all().unwrap();

    fx.parent.borrow().component().for_link.set(false).unwrap();

    {
        let child = fx.child.borrow();
        assert!(!child.component().link.get());
        assert_eq!(child.component().plain, 7);
        assert!(child.needs_render());
    }
    assert!(fx.parent.borrow().needs_render());

    assert_eq!(fx.host.flush().unwrap(), 2);
    assert_eq!(
        fx.child.borrow().component().last_seen,
        Some((false, PROP_VALUE.to_owned(), 0))
    );
    assert_eq!(fx.host.flush().unwrap(), 0);
}

#[test]
fn child_link_write_reaches_parent() {
    let registry = SubscriberRegistry::new();
    let mut fx = LinkPropFixture::build(&registry).unwrap();
    fx.host.render_all().unwrap();

    fx.child.borrow().component().link.set(false).unwrap();
    assert!(!fx.parent.borrow().component().for_link.get());
    assert!(fx.parent.borrow().needs_render());
    assert!(fx.child.borrow().needs_render());
}

#[test]
fn prop_flows_down_but_not_up() {
    let registry = SubscriberRegistry::new();
    let mut fx = LinkPropFixture::build(&registry).unwrap();
    fx.host.render_all().unwrap();

    fx.child
        .borrow()
        .component()
        .prop
        .set("local edit".to_owned())
        .unwrap();
    assert_eq!(fx.parent.borrow().component().for_prop.get(), PROP_VALUE);
    assert!(!fx.parent.borrow().needs_render());

    fx.parent
        .borrow()
        .component()
        .for_prop
        .set("from parent".to_owned())
        .unwrap();
    assert_eq!(fx.child.borrow().component().prop.get(), "from parent");
    fx.host.flush().unwrap();
    assert_eq!(
        fx.child.borrow().component().last_seen,
        Some((true, "from parent".to_owned(), 0))
    );
}

#[test]
fn teardown_child_then_parent() {
    let registry = SubscriberRegistry::new();
    let mut fx = LinkPropFixture::build(&registry).unwrap();
    fx.host.render_all().unwrap();

    assert!(fx.host.unmount("child").unwrap());
    assert_eq!(fx.for_link_subscribers(), 1);
    assert_eq!(registry.count(), 3);
    assert_eq!(fx.child.borrow().lifecycle(), Lifecycle::TornDown);

    // The parent keeps working without the child.
    fx.parent.borrow().component().for_link.set(false).unwrap();
    assert_eq!(fx.host.flush().unwrap(), 1);

    assert!(fx.host.unmount("parent").unwrap());
    assert_eq!(fx.for_link_subscribers(), 0);
    assert_eq!(registry.count(), 0);
    assert_eq!(fx.host.mounted(), 0);
}

#[test]
fn unmount_all_tears_down_children_first() {
    let registry = SubscriberRegistry::new();
    let mut fx = LinkPropFixture::build(&registry).unwrap();
    fx.host.render_all().unwrap();
    fx.host.unmount_all().unwrap();
    assert_eq!(registry.count(), 0);
    assert!(!fx.host.unmount("child").unwrap());
}
