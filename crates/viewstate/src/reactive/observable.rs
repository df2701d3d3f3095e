#![forbid(unsafe_code)]

//! Observable box: the minimal reactive unit.
//!
//! # Design
//!
//! [`ObservableBox<T>`] is a handle to a shared `Rc` cell holding the value,
//! the ordered subscriber id set, and the binding mode. Cloning the handle
//! shares the cell.
//!
//! A write runs in two phases. First every affected cache is brought up to
//! date: the written box, its two-way sources up the chain, and every
//! binding derived from any of them (transitively). Then each changed box
//! notifies its subscribers, skipping the subscriber that caused its change.
//! No `RefCell` borrow is held while a subscriber hook runs.
//!
//! # Failure Modes
//!
//! - **Absent value**: `set` returns [`StateError::InvalidValue`]; value and
//!   subscribers are untouched.
//! - **Torn-down box or source**: `set`, `create_link`, and `create_prop`
//!   return [`StateError::UseAfterTeardown`].
//! - **Stale subscriber id** (dropped without unregistering): logged at
//!   `error` and pruned during the next notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use crate::error::{Result, StateError};
use crate::registry::{Change, PropertySubscriber, SubscriberId, SubscriberRegistry};
use crate::value::{StateValue, ValueShape};

/// How a box obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingMode {
    /// Holds its own value.
    Owned,
    /// Link: writes are forwarded to the source.
    TwoWay,
    /// Prop: writes stay local; the source overwrites on change.
    OneWay,
}

enum Source<T: StateValue> {
    None,
    TwoWay(Weak<BoxCell<T>>),
    OneWay(Weak<BoxCell<T>>),
}

impl<T: StateValue> Source<T> {
    fn mode(&self) -> BindingMode {
        match self {
            Self::None => BindingMode::Owned,
            Self::TwoWay(_) => BindingMode::TwoWay,
            Self::OneWay(_) => BindingMode::OneWay,
        }
    }

    fn weak(&self) -> Option<&Weak<BoxCell<T>>> {
        match self {
            Self::None => None,
            Self::TwoWay(w) | Self::OneWay(w) => Some(w),
        }
    }
}

/// Shared interior of an [`ObservableBox`].
pub(crate) struct BoxCell<T: StateValue> {
    id: SubscriberId,
    me: Weak<BoxCell<T>>,
    registry: SubscriberRegistry,
    value: RefCell<T>,
    name: RefCell<Option<String>>,
    owner: Option<SubscriberId>,
    /// Ordered set; insertion order is notification order.
    subscribers: RefCell<Vec<SubscriberId>>,
    /// Bindings sourced from this box, resynchronized before notification.
    dependents: RefCell<Vec<(SubscriberId, Weak<BoxCell<T>>)>>,
    source: Source<T>,
    torn_down: Cell<bool>,
    /// Open commits that have already synced this box.
    in_flight: Cell<u32>,
}

/// What a propagation carries.
enum Write<T> {
    Value(T),
    /// Contents changed in place; identity did not.
    Touch,
}

struct Pending<T: StateValue> {
    cell: Rc<BoxCell<T>>,
    exclude: Option<SubscriberId>,
}

impl<T: StateValue> BoxCell<T> {
    fn label(&self) -> String {
        self.name
            .borrow()
            .clone()
            .unwrap_or_else(|| "unknown".to_owned())
    }

    fn source_cell(&self) -> Option<Rc<BoxCell<T>>> {
        self.source.weak().and_then(Weak::upgrade)
    }

    /// Replace the held value and move this box's ownership from the old
    /// value to the new one.
    fn store(&self, new: T) {
        let old = self.value.replace(new);
        let value = self.value.borrow();
        if !old.same(&value) {
            old.release_owner(self.id);
            value.adopt_owner(self.id);
        }
    }

    /// Reject writes through a broken or torn-down two-way chain before
    /// anything is mutated.
    fn check_upstream(&self) -> Result<()> {
        let mut next = match &self.source {
            Source::TwoWay(w) => Some(w.clone()),
            _ => None,
        };
        while let Some(weak) = next {
            let Some(src) = weak.upgrade() else {
                warn!(id = %self.id, name = %self.label(), "link source dropped");
                return Err(StateError::after_teardown(self.label()));
            };
            if src.torn_down.get() {
                warn!(
                    id = %self.id,
                    name = %self.label(),
                    source = %src.id,
                    "link source torn down"
                );
                return Err(StateError::after_teardown(src.label()));
            }
            next = match &src.source {
                Source::TwoWay(w) => Some(w.clone()),
                _ => None,
            };
        }
        Ok(())
    }

    fn commit(self: &Rc<Self>, write: Write<T>) -> Result<()> {
        if self.torn_down.get() {
            warn!(id = %self.id, name = %self.label(), "write after teardown rejected");
            return Err(StateError::after_teardown(self.label()));
        }
        let forced = matches!(write, Write::Touch);
        if let Write::Value(new) = &write {
            if new.is_absent() {
                warn!(id = %self.id, name = %self.label(), "absent value rejected");
                return Err(StateError::invalid_value(self.label()));
            }
            if self.value.borrow().same(new) {
                debug!(id = %self.id, name = %self.label(), "set with unchanged value ignored");
                return Ok(());
            }
        }
        self.check_upstream()?;

        // Phase 1: bring caches up to date.
        let mut plan = vec![Pending {
            cell: Rc::clone(self),
            exclude: None,
        }];
        if let Write::Value(new) = &write {
            debug!(
                id = %self.id,
                name = %self.label(),
                from = ?*self.value.borrow(),
                to = ?new,
                "set"
            );
            self.store(new.clone());
        }

        let mut child = Rc::clone(self);
        while let Source::TwoWay(weak) = &child.source {
            let Some(src) = weak.upgrade() else { break };
            if let Write::Value(new) = &write {
                if src.value.borrow().same(new) {
                    break;
                }
                src.store(new.clone());
            }
            plan.push(Pending {
                cell: Rc::clone(&src),
                exclude: Some(child.id),
            });
            child = src;
        }

        let mut i = 0;
        while i < plan.len() {
            let cell = Rc::clone(&plan[i].cell);
            let exclude = plan[i].exclude;
            let dependents = cell.dependents.borrow().clone();
            for (dep_id, weak) in dependents {
                if Some(dep_id) == exclude || plan.iter().any(|p| p.cell.id == dep_id) {
                    continue;
                }
                let Some(dep) = weak.upgrade() else { continue };
                if dep.absorb(&cell, forced) {
                    plan.push(Pending {
                        cell: dep,
                        exclude: None,
                    });
                }
            }
            i += 1;
        }

        // Phase 2: notify. Planned boxes ignore the echo from their source.
        for pending in &plan {
            pending.cell.in_flight.set(pending.cell.in_flight.get() + 1);
        }
        for pending in &plan {
            pending.cell.notify(pending.exclude);
        }
        for pending in &plan {
            pending.cell.in_flight.set(pending.cell.in_flight.get() - 1);
        }
        Ok(())
    }

    /// Copy the source value into this binding. Returns whether it changed.
    fn absorb(&self, source: &BoxCell<T>, forced: bool) -> bool {
        if self.torn_down.get() {
            return false;
        }
        let incoming = source.value.borrow().clone();
        if !forced && self.value.borrow().same(&incoming) {
            return false;
        }
        debug!(id = %self.id, name = %self.label(), source = %source.id, "binding resynchronized");
        self.store(incoming);
        true
    }

    fn notify(&self, exclude: Option<SubscriberId>) {
        let subscribers = self.subscribers.borrow().clone();
        let name = self.name.borrow().clone();
        let change = Change {
            source: self.id,
            name: name.as_deref(),
        };
        debug!(
            id = %self.id,
            name = name.as_deref().unwrap_or("unknown"),
            count = subscribers.len(),
            "notify has changed"
        );

        let mut stale = Vec::new();
        for id in subscribers {
            if Some(id) == exclude {
                continue;
            }
            match self.registry.lookup(id) {
                Some(subscriber) => subscriber.property_has_changed(&change),
                None => {
                    error!(id = %self.id, subscriber = %id, "notify: unknown subscriber id");
                    stale.push(id);
                }
            }
        }
        if !stale.is_empty() {
            self.subscribers.borrow_mut().retain(|id| !stale.contains(id));
        }
    }

    fn subscribe(&self, id: SubscriberId) -> bool {
        if !self.registry.contains(id) {
            warn!(
                id = %self.id,
                name = %self.label(),
                subscriber = %id,
                "subscribe with unregistered id"
            );
            return false;
        }
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.contains(&id) {
            return false;
        }
        subscribers.push(id);
        true
    }

    fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| *s != id);
        subscribers.len() != before
    }

    fn detach_from_source(&self) {
        if let Some(src) = self.source_cell() {
            src.unsubscribe(self.id);
            src.dependents.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl<T: StateValue> PropertySubscriber for BoxCell<T> {
    fn info(&self) -> String {
        let kind = match self.source.mode() {
            BindingMode::Owned => "ObservableBox",
            BindingMode::TwoWay => "Link",
            BindingMode::OneWay => "Prop",
        };
        format!("{kind}[{}] '{}'", self.id, self.label())
    }

    // Bindings are already synchronized by the write that produced this
    // change; this only catches a source that changed through another path.
    fn property_has_changed(&self, change: &Change<'_>) {
        if self.in_flight.get() > 0 {
            return;
        }
        let Some(src) = self.source_cell() else {
            return;
        };
        if change.source == src.id && self.absorb(&src, false) {
            self.notify(None);
        }
    }

    fn object_has_changed(&self, field: &str) {
        if let Some(src) = self.source_cell() {
            // The source holds the same object and propagates to us.
            if !src.torn_down.get() && src.value.borrow().same(&self.value.borrow()) {
                return;
            }
        }
        let Some(me) = self.me.upgrade() else {
            return;
        };
        debug!(id = %self.id, name = %self.label(), field, "observed content changed");
        if let Err(err) = me.commit(Write::Touch) {
            warn!(
                id = %self.id,
                name = %self.label(),
                field,
                %err,
                "observed change not propagated"
            );
        }
    }
}

impl<T: StateValue> Drop for BoxCell<T> {
    fn drop(&mut self) {
        if self.torn_down.get() {
            return;
        }
        self.value.get_mut().release_owner(self.id);
        if let Some(src) = self.source.weak().and_then(Weak::upgrade) {
            src.subscribers.borrow_mut().retain(|s| *s != self.id);
            src.dependents.borrow_mut().retain(|(id, _)| *id != self.id);
        }
        self.registry.unregister(self.id);
    }
}

/// A reactive value cell.
///
/// Owned boxes hold their value. Links and Props are boxes sourced from
/// another box; both stay subscribed to the source until torn down.
///
/// # Invariants
///
/// 1. The held value is never the absent sentinel.
/// 2. Every id in the subscriber set was registered when it subscribed.
/// 3. After [`teardown`](Self::teardown), writes and new bindings are
///    rejected.
pub struct ObservableBox<T: StateValue> {
    cell: Rc<BoxCell<T>>,
}

impl<T: StateValue> Clone for ObservableBox<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: StateValue> fmt::Debug for ObservableBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableBox")
            .field("id", &self.cell.id)
            .field("name", &*self.cell.name.borrow())
            .field("value", &*self.cell.value.borrow())
            .field("mode", &self.cell.source.mode())
            .field("subscribers", &self.cell.subscribers.borrow().len())
            .finish()
    }
}

impl<T: StateValue> ObservableBox<T> {
    /// Create an unowned, unnamed box.
    pub fn new(registry: &SubscriberRegistry, value: T) -> Result<Self> {
        Self::build(registry, value, None, None, Source::None)
    }

    /// Create a box owned by `owner` (subscribed from the start) and named
    /// `name`. An empty name leaves the box unnamed.
    pub fn with_owner(
        registry: &SubscriberRegistry,
        value: T,
        owner: Option<SubscriberId>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let name = Some(name.into()).filter(|n| !n.is_empty());
        Self::build(registry, value, owner, name, Source::None)
    }

    fn build(
        registry: &SubscriberRegistry,
        value: T,
        owner: Option<SubscriberId>,
        name: Option<String>,
        source: Source<T>,
    ) -> Result<Self> {
        if value.is_absent() {
            let label = name.unwrap_or_else(|| "unknown".to_owned());
            warn!(name = %label, "box construction with absent value rejected");
            return Err(StateError::invalid_value(label));
        }
        let id = registry.reserve_id()?;
        let cell = Rc::new_cyclic(|me| BoxCell {
            id,
            me: me.clone(),
            registry: registry.clone(),
            value: RefCell::new(value),
            name: RefCell::new(name),
            owner,
            subscribers: RefCell::new(owner.into_iter().collect()),
            dependents: RefCell::new(Vec::new()),
            source,
            torn_down: Cell::new(false),
            in_flight: Cell::new(0),
        });
        let weak: Weak<dyn PropertySubscriber> =
            Rc::downgrade(&cell) as Weak<dyn PropertySubscriber>;
        registry.attach(id, weak);
        cell.value.borrow().adopt_owner(id);
        debug!(
            %id,
            name = %cell.label(),
            shape = ?T::SHAPE,
            mode = ?cell.source.mode(),
            "box created"
        );
        Ok(Self { cell })
    }

    /// Current value. No side effects.
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if the closure writes to this same box.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.borrow())
    }

    /// Replace the value and notify subscribers.
    ///
    /// Equal values (by the shape policy) are a no-op. For a Link the write
    /// reaches the source; for a Prop it stays local.
    pub fn set(&self, value: T) -> Result<()> {
        self.cell.commit(Write::Value(value))
    }

    /// Notify as if the value changed, after mutating reference content in
    /// place. Bindings sharing the reference are notified too.
    pub fn notify_has_changed(&self) -> Result<()> {
        self.cell.commit(Write::Touch)
    }

    /// Two-way binding sourced from this box, subscribed by `consumer`.
    pub fn create_link(&self, consumer: Option<SubscriberId>, as_name: &str) -> Result<Self> {
        self.derive(consumer, as_name, BindingMode::TwoWay)
    }

    /// One-way binding sourced from this box, subscribed by `consumer`.
    pub fn create_prop(&self, consumer: Option<SubscriberId>, as_name: &str) -> Result<Self> {
        self.derive(consumer, as_name, BindingMode::OneWay)
    }

    fn derive(
        &self,
        consumer: Option<SubscriberId>,
        as_name: &str,
        mode: BindingMode,
    ) -> Result<Self> {
        if self.cell.torn_down.get() {
            warn!(
                id = %self.cell.id,
                name = %self.cell.label(),
                ?mode,
                "binding to torn-down box rejected"
            );
            return Err(StateError::after_teardown(self.cell.label()));
        }
        let weak = Rc::downgrade(&self.cell);
        let source = match mode {
            BindingMode::OneWay => Source::OneWay(weak),
            _ => Source::TwoWay(weak),
        };
        let name = Some(as_name.to_owned()).filter(|n| !n.is_empty());
        let derived = Self::build(&self.cell.registry, self.get(), consumer, name, source)?;
        self.cell.subscribe(derived.cell.id);
        self.cell
            .dependents
            .borrow_mut()
            .push((derived.cell.id, Rc::downgrade(&derived.cell)));
        Ok(derived)
    }

    /// Subscribe a registered id. Returns `false` if already subscribed or
    /// if `id` is not in the registry.
    pub fn subscribe(&self, id: SubscriberId) -> bool {
        self.cell.subscribe(id)
    }

    /// Unsubscribe an id. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.cell.unsubscribe(id)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscribers.borrow().len()
    }

    /// Subscriber ids in notification order.
    #[must_use]
    pub fn subscribers(&self) -> Vec<SubscriberId> {
        self.cell.subscribers.borrow().clone()
    }

    /// Detach `for_view` (or the owner when `None`), detach from the source
    /// if this is a binding, and release the registry id.
    ///
    /// Does not require an empty subscriber set. A second call is a no-op.
    pub fn teardown(&self, for_view: Option<SubscriberId>) {
        let cell = &self.cell;
        if cell.torn_down.get() {
            debug!(id = %cell.id, name = %cell.label(), "teardown of torn-down box ignored");
            return;
        }
        if let Some(target) = for_view.or(cell.owner) {
            cell.unsubscribe(target);
        }
        cell.detach_from_source();
        cell.value.borrow().release_owner(cell.id);
        cell.registry.unregister(cell.id);
        cell.torn_down.set(true);
        debug!(
            id = %cell.id,
            name = %cell.label(),
            remaining = cell.subscribers.borrow().len(),
            "box torn down"
        );
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.cell.id
    }

    /// Display name used for dependency tracking and notifications.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.cell.name.borrow().clone()
    }

    /// Rename the box. Empty names are ignored.
    pub fn set_info(&self, name: &str) {
        if !name.is_empty() {
            *self.cell.name.borrow_mut() = Some(name.to_owned());
        }
    }

    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.cell.source.mode()
    }

    #[must_use]
    pub fn shape(&self) -> ValueShape {
        T::SHAPE
    }

    #[must_use]
    pub fn owner(&self) -> Option<SubscriberId> {
        self.cell.owner
    }

    /// Id of the source box, for bindings whose source is still alive.
    #[must_use]
    pub fn source_id(&self) -> Option<SubscriberId> {
        self.cell.source_cell().map(|s| s.id)
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.cell.torn_down.get()
    }

    /// Whether two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;

    struct Counter {
        changes: Cell<u32>,
        names: StdRefCell<Vec<Option<String>>>,
    }

    impl PropertySubscriber for Counter {
        fn property_has_changed(&self, change: &Change<'_>) {
            self.changes.set(self.changes.get() + 1);
            self.names
                .borrow_mut()
                .push(change.name.map(str::to_owned));
        }
    }

    fn counter(registry: &SubscriberRegistry) -> (Rc<Counter>, SubscriberId) {
        let c = Rc::new(Counter {
            changes: Cell::new(0),
            names: StdRefCell::new(Vec::new()),
        });
        let id = registry.register(&c).unwrap();
        (c, id)
    }

    #[test]
    fn set_notifies_each_subscriber_once() {
        let registry = SubscriberRegistry::new();
        let (c, cid) = counter(&registry);
        let cell = ObservableBox::with_owner(&registry, 1_i32, Some(cid), "count").unwrap();
        cell.set(2).unwrap();
        assert_eq!(cell.get(), 2);
        assert_eq!(c.changes.get(), 1);
        assert_eq!(c.names.borrow()[0].as_deref(), Some("count"));
    }

    #[test]
    fn equal_primitive_write_is_silent() {
        let registry = SubscriberRegistry::new();
        let (c, cid) = counter(&registry);
        let cell = ObservableBox::with_owner(&registry, "a".to_string(), Some(cid), "s").unwrap();
        cell.set("a".to_string()).unwrap();
        assert_eq!(c.changes.get(), 0);
    }

    #[test]
    fn reference_boxes_compare_by_identity() {
        let registry = SubscriberRegistry::new();
        let (c, cid) = counter(&registry);
        let first = Rc::new(vec![1, 2, 3]);
        let cell =
            ObservableBox::with_owner(&registry, Rc::clone(&first), Some(cid), "list").unwrap();

        cell.set(Rc::clone(&first)).unwrap();
        assert_eq!(c.changes.get(), 0);

        cell.set(Rc::new(vec![1, 2, 3])).unwrap();
        assert_eq!(c.changes.get(), 1);
    }

    #[test]
    fn absent_value_is_rejected() {
        let registry = SubscriberRegistry::new();
        let (c, cid) = counter(&registry);
        let cell = ObservableBox::with_owner(&registry, Some(3_i32), Some(cid), "n").unwrap();
        assert_eq!(
            cell.set(None),
            Err(StateError::InvalidValue { name: "n".into() })
        );
        assert_eq!(cell.get(), Some(3));
        assert_eq!(c.changes.get(), 0);

        assert!(ObservableBox::<Option<i32>>::new(&registry, None).is_err());
    }

    #[test]
    fn link_writes_reach_source_and_back() {
        let registry = SubscriberRegistry::new();
        let source = ObservableBox::new(&registry, 10_i32).unwrap();
        let link = source.create_link(None, "l").unwrap();

        link.set(20).unwrap();
        assert_eq!(source.get(), 20);

        source.set(30).unwrap();
        assert_eq!(link.get(), 30);
    }

    #[test]
    fn prop_writes_stay_local() {
        let registry = SubscriberRegistry::new();
        let source = ObservableBox::new(&registry, 10_i32).unwrap();
        let prop = source.create_prop(None, "p").unwrap();

        prop.set(20).unwrap();
        assert_eq!(source.get(), 10);
        assert_eq!(prop.get(), 20);

        source.set(30).unwrap();
        assert_eq!(prop.get(), 30);
    }

    #[test]
    fn writer_is_not_notified_of_its_own_change() {
        let registry = SubscriberRegistry::new();
        let (owner, oid) = counter(&registry);
        let (consumer, cid) = counter(&registry);
        let source = ObservableBox::with_owner(&registry, 0_i32, Some(oid), "src").unwrap();
        let link = source.create_link(Some(cid), "lnk").unwrap();

        link.set(5).unwrap();
        // Owner hears about the source change, consumer about the link change.
        assert_eq!(owner.changes.get(), 1);
        assert_eq!(consumer.changes.get(), 1);
    }

    #[test]
    fn sibling_bindings_are_synced_before_any_notification() {
        struct Peek {
            sibling: ObservableBox<i32>,
            seen: Cell<i32>,
        }
        impl PropertySubscriber for Peek {
            fn property_has_changed(&self, _change: &Change<'_>) {
                self.seen.set(self.sibling.get());
            }
        }

        let registry = SubscriberRegistry::new();
        let source = ObservableBox::new(&registry, 0_i32).unwrap();
        let writer = source.create_link(None, "w").unwrap();
        let sibling = source.create_prop(None, "s").unwrap();
        let peek = Rc::new(Peek {
            sibling: sibling.clone(),
            seen: Cell::new(-1),
        });
        let pid = registry.register(&peek).unwrap();
        // Subscribed to the source ahead of the sibling prop.
        assert!(source.unsubscribe(sibling.id()));
        assert!(source.subscribe(pid));
        assert!(source.subscribe(sibling.id()));

        writer.set(7).unwrap();
        assert_eq!(peek.seen.get(), 7);
    }

    #[test]
    fn binding_hears_a_nan_write_once() {
        let registry = SubscriberRegistry::new();
        let (c, cid) = counter(&registry);
        let source = ObservableBox::new(&registry, 0.0_f64).unwrap();
        let prop = source.create_prop(Some(cid), "p").unwrap();
        let link = source.create_link(Some(cid), "l").unwrap();

        source.set(f64::NAN).unwrap();
        assert!(prop.get().is_nan());
        assert!(link.get().is_nan());
        assert_eq!(c.changes.get(), 2);

        link.set(1.0).unwrap();
        assert_eq!(prop.get(), 1.0);
        assert_eq!(c.changes.get(), 4);
    }

    #[test]
    fn unregistered_ids_cannot_subscribe() {
        let registry = SubscriberRegistry::new();
        let (_c, cid) = counter(&registry);
        let source = ObservableBox::new(&registry, 0_i32).unwrap();
        registry.unregister(cid);

        assert!(!source.subscribe(cid));
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn link_of_link_propagates_through_the_chain() {
        let registry = SubscriberRegistry::new();
        let root = ObservableBox::new(&registry, 1_u32).unwrap();
        let mid = root.create_link(None, "mid").unwrap();
        let leaf = mid.create_link(None, "leaf").unwrap();
        let side = root.create_prop(None, "side").unwrap();

        leaf.set(9).unwrap();
        assert_eq!(mid.get(), 9);
        assert_eq!(root.get(), 9);
        assert_eq!(side.get(), 9);

        root.set(4).unwrap();
        assert_eq!(leaf.get(), 4);
    }

    #[test]
    fn touch_notifies_reference_bindings() {
        let registry = SubscriberRegistry::new();
        let (c, cid) = counter(&registry);
        let shared = Rc::new(StdRefCell::new(vec![1]));
        let source = ObservableBox::new(&registry, Rc::clone(&shared)).unwrap();
        let _prop = source.create_prop(Some(cid), "items").unwrap();

        shared.borrow_mut().push(2);
        source.notify_has_changed().unwrap();
        assert_eq!(c.changes.get(), 1);
    }

    #[test]
    fn teardown_detaches_from_source_and_registry() {
        let registry = SubscriberRegistry::new();
        let (_c, cid) = counter(&registry);
        let source = ObservableBox::new(&registry, 0_i32).unwrap();
        let link = source.create_link(Some(cid), "l").unwrap();
        assert_eq!(source.subscriber_count(), 1);
        assert_eq!(registry.count(), 3);

        link.teardown(None);
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(link.subscriber_count(), 0);
        assert_eq!(registry.count(), 2);
        assert!(link.is_torn_down());

        link.teardown(None);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn use_after_teardown_is_rejected() {
        let registry = SubscriberRegistry::new();
        let source = ObservableBox::new(&registry, 0_i32).unwrap();
        let link = source.create_link(None, "l").unwrap();
        source.teardown(None);

        assert!(matches!(source.set(1), Err(StateError::UseAfterTeardown { .. })));
        assert!(matches!(link.set(1), Err(StateError::UseAfterTeardown { .. })));
        assert!(matches!(
            source.create_prop(None, "p"),
            Err(StateError::UseAfterTeardown { .. })
        ));
        assert_eq!(link.get(), 0);
    }

    #[test]
    fn dropping_a_binding_releases_its_subscription() {
        let registry = SubscriberRegistry::new();
        let source = ObservableBox::new(&registry, 0_i32).unwrap();
        {
            let _prop = source.create_prop(None, "p").unwrap();
            assert_eq!(source.subscriber_count(), 1);
        }
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn stale_subscriber_ids_are_pruned() {
        let registry = SubscriberRegistry::new();
        let source = ObservableBox::new(&registry, 0_i32).unwrap();
        let (c, cid) = counter(&registry);
        source.subscribe(cid);
        registry.unregister(cid);
        source.set(1).unwrap();
        assert_eq!(c.changes.get(), 0);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn info_describes_binding_kind() {
        let registry = SubscriberRegistry::new();
        let source = ObservableBox::with_owner(&registry, 0_i32, None, "src").unwrap();
        let link = source.create_link(None, "lnk").unwrap();
        let rows = registry.dump_diagnostics();
        let infos: Vec<String> = rows.into_iter().filter_map(|r| r.info).collect();
        assert!(infos.iter().any(|i| i.starts_with("ObservableBox") && i.contains("'src'")));
        assert!(infos.iter().any(|i| i.starts_with("Link") && i.contains("'lnk'")));
        assert_eq!(link.source_id(), Some(source.id()));
    }
}
