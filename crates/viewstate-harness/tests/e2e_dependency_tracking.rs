//! Dependency tracking through the host: which views re-render, and when.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use viewstate::{
    Component, LocalStorage, ObservableBox, Params, RenderCx, Result, SubscriberRegistry, View,
};
use viewstate_harness::Host;

struct Toggle {
    detailed: ObservableBox<bool>,
    summary: ObservableBox<String>,
    detail: ObservableBox<String>,
    renders: u32,
}

impl Component for Toggle {
    fn render(&mut self, cx: &RenderCx<'_>) -> Result<()> {
        self.renders += 1;
        if cx.read(&self.detailed) {
            let _ = cx.read(&self.detail);
        } else {
            let _ = cx.read(&self.summary);
        }
        Ok(())
    }
}

fn toggle(registry: &SubscriberRegistry) -> Rc<RefCell<View<Toggle>>> {
    let view = View::builder(registry, "toggle")
        .build(|scope| {
            Ok(Toggle {
                detailed: scope.state("detailed", false)?,
                summary: scope.state("summary", "short".to_owned())?,
                detail: scope.state("detail", "long".to_owned())?,
                renders: 0,
            })
        })
        .unwrap();
    Rc::new(RefCell::new(view))
}

#[test]
fn branch_change_moves_the_dependency_set() {
    let registry = SubscriberRegistry::new();
    let view = toggle(&registry);
    let mut host = Host::new();
    host.mount(&view);
    host.render_all().unwrap();

    let (detailed, summary, detail) = {
        let v = view.borrow();
        let c = v.component();
        (c.detailed.clone(), c.summary.clone(), c.detail.clone())
    };

    detail.set("longer".into()).unwrap();
    assert_eq!(host.flush().unwrap(), 0);

    detailed.set(true).unwrap();
    assert_eq!(host.flush().unwrap(), 1);

    summary.set("shorter".into()).unwrap();
    assert_eq!(host.flush().unwrap(), 0);

    detail.set("longest".into()).unwrap();
    assert_eq!(host.flush().unwrap(), 1);
    assert_eq!(view.borrow().component().renders, 3);
}

struct SelfFeeding {
    counter: ObservableBox<u32>,
    limit: u32,
}

impl Component for SelfFeeding {
    fn render(&mut self, cx: &RenderCx<'_>) -> Result<()> {
        let n = cx.read(&self.counter);
        if n < self.limit {
            cx.write(&self.counter, n + 1)?;
        }
        Ok(())
    }
}

#[test]
fn writes_during_render_settle_through_flush() {
    let registry = SubscriberRegistry::new();
    let view = View::builder(&registry, "feeder")
        .build(|scope| {
            Ok(SelfFeeding {
                counter: scope.state("counter", 0)?,
                limit: 3,
            })
        })
        .unwrap();
    let view = Rc::new(RefCell::new(view));
    let mut host = Host::new();
    host.mount(&view);

    host.render_all().unwrap();
    assert!(view.borrow().needs_render());
    assert_eq!(host.flush().unwrap(), 3);
    assert_eq!(view.borrow().component().counter.get(), 3);
}

struct StoreReader {
    theme: ObservableBox<String>,
}

impl Component for StoreReader {
    fn render(&mut self, cx: &RenderCx<'_>) -> Result<()> {
        let _ = cx.read(&self.theme);
        Ok(())
    }
}

#[test]
fn store_changes_rerender_every_bound_view() {
    let registry = SubscriberRegistry::new();
    let params = Params::new().with("theme", "light".to_owned());
    let store = LocalStorage::from_params(&registry, &params);
    let mut host = Host::new();

    let top = View::builder(&registry, "top")
        .storage(&store)
        .build(|scope| {
            Ok(StoreReader {
                theme: scope.storage_prop("theme", String::new(), "theme")?,
            })
        })
        .unwrap();
    let nested = View::builder(&registry, "nested")
        .parent(top.core())
        .build(|scope| {
            Ok(StoreReader {
                theme: scope.storage_link("theme", String::new(), "theme")?,
            })
        })
        .unwrap();
    let top = Rc::new(RefCell::new(top));
    let nested = Rc::new(RefCell::new(nested));
    host.mount(&top);
    host.mount(&nested);
    host.render_all().unwrap();

    assert!(store.set("theme", "dark".to_owned()));
    assert_eq!(host.flush().unwrap(), 2);
    assert_eq!(top.borrow().component().theme.get(), "dark");

    // Link write from the nested view: store and the top view's prop follow.
    nested.borrow().component().theme.set("sepia".into()).unwrap();
    assert_eq!(store.get::<String>("theme").as_deref(), Some("sepia"));
    assert_eq!(top.borrow().component().theme.get(), "sepia");
    assert_eq!(host.flush().unwrap(), 2);

    host.unmount_all().unwrap();
    assert_eq!(store.number_of_subscribers_to("theme"), Some(0));
    assert!(store.about_to_be_deleted());
    assert_eq!(registry.count(), 0);
}

#[test]
fn watches_fire_without_a_render_dependency() {
    struct Silent {
        volume: ObservableBox<u8>,
    }
    impl Component for Silent {
        fn render(&mut self, _cx: &RenderCx<'_>) -> Result<()> {
            Ok(())
        }
    }

    let registry = SubscriberRegistry::new();
    let seen = Rc::new(Cell::new(0_u32));
    let view = View::builder(&registry, "silent")
        .build(|scope| {
            let volume = scope.state("volume", 1)?;
            let seen = Rc::clone(&seen);
            scope.declare_watch("volume", move |name| {
                assert_eq!(name, "volume");
                seen.set(seen.get() + 1);
            });
            Ok(Silent { volume })
        })
        .unwrap();
    let view = Rc::new(RefCell::new(view));
    let mut host = Host::new();
    host.mount(&view);
    host.render_all().unwrap();

    view.borrow().component().volume.set(2).unwrap();
    view.borrow().component().volume.set(2).unwrap();
    assert_eq!(seen.get(), 1);
    assert_eq!(host.flush().unwrap(), 0);
}
