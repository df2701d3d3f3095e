#![forbid(unsafe_code)]

//! Shared, registered half of a view.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::config::ParamPolicy;
use crate::reactive::ErasedBox;
use crate::registry::{Change, PropertySubscriber, SubscriberId, SubscriberRegistry};
use crate::storage::LocalStorage;

/// Where a view is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Built, never rendered.
    Constructed,
    /// Inside a tracked render pass.
    Rendering,
    /// Between render passes.
    Idle,
    /// [`View::about_to_be_deleted`](crate::View::about_to_be_deleted) ran.
    TornDown,
}

pub(crate) type WatchFn = Rc<dyn Fn(&str)>;

/// The registered part of a view: dependency set, dirty flag, and the
/// boxes the view owns or consumes.
///
/// Held in an `Rc` so the registry can reach it while the component itself
/// is borrowed by a render pass.
pub struct ViewCore {
    pub(super) id: String,
    pub(super) subscriber_id: SubscriberId,
    pub(super) registry: SubscriberRegistry,
    pub(super) parent: Option<SubscriberId>,
    pub(super) state: Cell<Lifecycle>,
    pub(super) deps: RefCell<BTreeSet<String>>,
    pub(super) needs_render: Cell<bool>,
    pub(super) owned: RefCell<Vec<Rc<dyn ErasedBox>>>,
    pub(super) derived: RefCell<Vec<Rc<dyn ErasedBox>>>,
    pub(super) watches: RefCell<AHashMap<String, WatchFn>>,
    pub(super) provided: RefCell<AHashMap<String, Rc<dyn ErasedBox>>>,
    pub(super) storage: RefCell<Option<LocalStorage>>,
    pub(super) policy: ParamPolicy,
    pub(super) render_count: Cell<u64>,
}

impl fmt::Debug for ViewCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCore")
            .field("id", &self.id)
            .field("subscriber_id", &self.subscriber_id)
            .field("parent", &self.parent)
            .field("state", &self.state.get())
            .field("deps", &*self.deps.borrow())
            .field("needs_render", &self.needs_render.get())
            .finish_non_exhaustive()
    }
}

impl ViewCore {
    /// Host-assigned view id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registry id; distinct from [`id`](Self::id).
    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    #[must_use]
    pub fn parent(&self) -> Option<SubscriberId> {
        self.parent
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.get()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.state.get() == Lifecycle::TornDown
    }

    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.needs_render.get()
    }

    /// Read and reset the dirty flag.
    pub fn take_needs_render(&self) -> bool {
        self.needs_render.replace(false)
    }

    /// Completed render passes.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.render_count.get()
    }

    #[must_use]
    pub fn param_policy(&self) -> ParamPolicy {
        self.policy
    }

    /// Names read during the last (or current) tracked pass.
    #[must_use]
    pub fn properties_needed_to_render(&self) -> BTreeSet<String> {
        self.deps.borrow().clone()
    }

    /// The store shared with ancestors. A top-level view without one gets an
    /// empty store on first access.
    pub fn storage(&self) -> LocalStorage {
        if let Some(store) = self.storage.borrow().as_ref() {
            return store.clone();
        }
        warn!(
            view = %self.id,
            "view accessed storage without one provided; creating an empty store"
        );
        let store = LocalStorage::new(&self.registry);
        *self.storage.borrow_mut() = Some(store.clone());
        store
    }

    /// Registry this view and its boxes live in.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub(super) fn adopt_owned(&self, cell: Rc<dyn ErasedBox>) {
        self.owned.borrow_mut().push(cell);
    }

    pub(super) fn adopt_derived(&self, cell: Rc<dyn ErasedBox>) {
        self.derived.borrow_mut().push(cell);
    }

    pub(super) fn owned_named(&self, name: &str) -> Option<Rc<dyn ErasedBox>> {
        self.owned
            .borrow()
            .iter()
            .find(|b| b.name().as_deref() == Some(name))
            .cloned()
    }

    /// Tear down every owned box and binding, drop watches and provided
    /// entries, and release the registry id.
    pub(super) fn release(&self) {
        let owned: Vec<_> = self.owned.borrow_mut().drain(..).collect();
        let derived: Vec<_> = self.derived.borrow_mut().drain(..).collect();
        for cell in derived.iter().chain(owned.iter()) {
            cell.teardown(Some(self.subscriber_id));
        }
        self.watches.borrow_mut().clear();
        self.provided.borrow_mut().clear();
        self.registry.unregister(self.subscriber_id);
        self.state.set(Lifecycle::TornDown);
        debug!(
            view = %self.id,
            id = %self.subscriber_id,
            owned = owned.len(),
            derived = derived.len(),
            "view torn down"
        );
    }
}

impl PropertySubscriber for ViewCore {
    fn info(&self) -> String {
        format!("View[{}] '{}'", self.subscriber_id, self.id)
    }

    fn property_has_changed(&self, change: &Change<'_>) {
        let Some(name) = change.name else {
            debug!(view = %self.id, source = %change.source, "change of unnamed box ignored");
            return;
        };
        if self.is_torn_down() {
            warn!(view = %self.id, name, "change notification after teardown");
            return;
        }
        if self.state.get() == Lifecycle::Rendering || self.deps.borrow().contains(name) {
            debug!(view = %self.id, name, "property has changed; view needs render");
            self.needs_render.set(true);
        } else {
            debug!(view = %self.id, name, "property has changed; not a render dependency");
        }
        let watch = self.watches.borrow().get(name).cloned();
        if let Some(watch) = watch {
            debug!(view = %self.id, name, "calling watch");
            watch(name);
        }
    }

    fn property_read(&self, name: &str) {
        if self.state.get() == Lifecycle::Rendering && name != "unknown" {
            self.deps.borrow_mut().insert(name.to_owned());
        }
    }
}

impl Drop for ViewCore {
    fn drop(&mut self) {
        if self.state.get() != Lifecycle::TornDown {
            self.registry.unregister(self.subscriber_id);
        }
    }
}
