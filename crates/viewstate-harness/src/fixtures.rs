#![forbid(unsafe_code)]

//! Reference parent/child fixture.
//!
//! The parent owns `forLink_` (`true`) and `forProp_` (`"ForProp Value
//! OK"`). The child holds a Link of the first as `link_`, a Prop of the
//! second as `prop_`, one state box of its own, and a plain field that no
//! box observes.

use std::cell::RefCell;
use std::rc::Rc;

use viewstate::{Component, ObservableBox, RenderCx, Result, SubscriberRegistry, View};

use crate::host::Host;

pub const PROP_VALUE: &str = "ForProp Value OK";

#[derive(Debug)]
pub struct ParentFixture {
    pub for_link: ObservableBox<bool>,
    pub for_prop: ObservableBox<String>,
    pub renders: u32,
}

impl Component for ParentFixture {
    fn render(&mut self, cx: &RenderCx<'_>) -> Result<()> {
        let _ = cx.read(&self.for_link);
        let _ = cx.read(&self.for_prop);
        self.renders += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ChildFixture {
    pub link: ObservableBox<bool>,
    pub prop: ObservableBox<String>,
    pub clicks: ObservableBox<i32>,
    /// Not observed; only the render body touches it.
    pub plain: u32,
    /// Values seen by the last render.
    pub last_seen: Option<(bool, String, i32)>,
}

impl Component for ChildFixture {
    fn render(&mut self, cx: &RenderCx<'_>) -> Result<()> {
        self.last_seen = Some((cx.read(&self.link), cx.read(&self.prop), cx.read(&self.clicks)));
        Ok(())
    }
}

/// Parent and child views, both mounted in a [`Host`].
pub struct LinkPropFixture {
    pub registry: SubscriberRegistry,
    pub host: Host,
    pub parent: Rc<RefCell<View<ParentFixture>>>,
    pub child: Rc<RefCell<View<ChildFixture>>>,
}

impl LinkPropFixture {
    /// Build and mount both views. Nothing is rendered yet.
    pub fn build(registry: &SubscriberRegistry) -> Result<Self> {
        let parent = View::builder(registry, "parent").build(|scope| {
            Ok(ParentFixture {
                for_link: scope.state("forLink_", true)?,
                for_prop: scope.state("forProp_", PROP_VALUE.to_owned())?,
                renders: 0,
            })
        })?;

        let for_link = parent.component().for_link.clone();
        let for_prop = parent.component().for_prop.clone();
        let child = View::builder(registry, "child")
            .parent(parent.core())
            .build(|scope| {
                Ok(ChildFixture {
                    link: scope.link(&for_link, "link_")?,
                    prop: scope.prop(&for_prop, "prop_")?,
                    clicks: scope.state("clicks_", 0)?,
                    plain: 7,
                    last_seen: None,
                })
            })?;

        let parent = Rc::new(RefCell::new(parent));
        let child = Rc::new(RefCell::new(child));
        let mut host = Host::new();
        host.mount(&parent);
        host.mount(&child);
        Ok(Self {
            registry: registry.clone(),
            host,
            parent,
            child,
        })
    }

    /// Subscriber count of the parent's `forLink_` box.
    #[must_use]
    pub fn for_link_subscribers(&self) -> usize {
        self.parent.borrow().component().for_link.subscriber_count()
    }
}
