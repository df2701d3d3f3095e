#![forbid(unsafe_code)]

//! Named property store.
//!
//! # Design
//!
//! [`LocalStorage`] maps names to type-erased boxes. A box is created on
//! first write (or from the initial [`Params`]); afterwards its value can
//! change but its identity cannot. Links and Props handed out by the store
//! stay subscribed to the stored box, so an entry with live bindings cannot
//! be deleted.
//!
//! The store keeps the boolean / `Option` surface of a property bag: a
//! rejected call logs and returns `false` or `None`.
//!
//! # Invariants
//!
//! 1. An entry is removed only when its subscriber count is zero.
//! 2. [`clear`](LocalStorage::clear) removes everything or nothing.
//! 3. No map borrow is held while a box operation runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, error, warn};

use crate::params::Params;
use crate::reactive::erased::downcast;
use crate::reactive::{ErasedBox, ObservableBox};
use crate::registry::{SubscriberId, SubscriberRegistry};
use crate::value::StateValue;

struct StorageInner {
    registry: SubscriberRegistry,
    entries: RefCell<AHashMap<String, Rc<dyn ErasedBox>>>,
}

/// Shared handle to a named property store.
#[derive(Clone)]
pub struct LocalStorage {
    inner: Rc<StorageInner>,
}

impl fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorage")
            .field("keys", &self.keys())
            .finish()
    }
}

impl LocalStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new(registry: &SubscriberRegistry) -> Self {
        Self {
            inner: Rc::new(StorageInner {
                registry: registry.clone(),
                entries: RefCell::new(AHashMap::new()),
            }),
        }
    }

    /// Create a store holding one entry per present, non-absent parameter.
    #[must_use]
    pub fn from_params(registry: &SubscriberRegistry, params: &Params) -> Self {
        let store = Self::new(registry);
        for (name, value) in params.iter() {
            let Some(value) = value.filter(|v| !v.absent()) else {
                debug!(name, "absent initial value skipped");
                continue;
            };
            match value.create_box(registry, None, name) {
                Ok(cell) => {
                    store.inner.entries.borrow_mut().insert(name.to_owned(), cell);
                }
                Err(err) => error!(name, %err, "initial store entry not created"),
            }
        }
        store
    }

    fn entry(&self, name: &str) -> Option<Rc<dyn ErasedBox>> {
        self.inner.entries.borrow().get(name).cloned()
    }

    fn typed<T: StateValue>(&self, name: &str) -> Option<ObservableBox<T>> {
        let entry = self.entry(name)?;
        let typed = downcast::<T>(entry.as_ref());
        if typed.is_none() {
            warn!(
                name,
                stored = entry.value_type(),
                requested = std::any::type_name::<T>(),
                "store entry has a different type"
            );
        }
        typed
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.inner.entries.borrow().contains_key(name)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Entry names, sorted. A fresh vector on every call.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.entries.borrow().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Current value of `name`, or `None` if missing or of another type.
    #[must_use]
    pub fn get<T: StateValue>(&self, name: &str) -> Option<T> {
        self.typed::<T>(name).map(|b| b.get())
    }

    /// Update an existing entry.
    ///
    /// Returns `false` for an unknown name, an absent value, or a type
    /// mismatch.
    pub fn set<T: StateValue>(&self, name: &str, value: T) -> bool {
        if value.is_absent() {
            warn!(name, "absent value rejected by store");
            return false;
        }
        if !self.has(name) {
            warn!(name, "set of unknown store entry");
            return false;
        }
        let Some(cell) = self.typed::<T>(name) else {
            return false;
        };
        match cell.set(value) {
            Ok(()) => true,
            Err(err) => {
                warn!(name, %err, "store set rejected");
                false
            }
        }
    }

    /// Update `name`, creating an unowned entry if it does not exist.
    pub fn set_or_create<T: StateValue>(&self, name: &str, value: T) -> bool {
        if value.is_absent() {
            warn!(name, "absent value rejected by store");
            return false;
        }
        if self.has(name) {
            return self.set(name, value);
        }
        match ObservableBox::with_owner(&self.inner.registry, value, None, name) {
            Ok(cell) => {
                debug!(name, id = %cell.id(), "store entry created");
                self.inner
                    .entries
                    .borrow_mut()
                    .insert(name.to_owned(), Rc::new(cell));
                true
            }
            Err(err) => {
                error!(name, %err, "store entry not created");
                false
            }
        }
    }

    /// Two-way binding to `name`, subscribed by `consumer` and named
    /// `as_name` (or `name` when empty).
    pub fn link<T: StateValue>(
        &self,
        name: &str,
        consumer: Option<SubscriberId>,
        as_name: &str,
    ) -> Option<ObservableBox<T>> {
        let Some(cell) = self.typed::<T>(name) else {
            if !self.has(name) {
                warn!(name, "link to unknown store entry");
            }
            return None;
        };
        let as_name = if as_name.is_empty() { name } else { as_name };
        cell.create_link(consumer, as_name)
            .inspect_err(|err| warn!(name, %err, "store link rejected"))
            .ok()
    }

    /// Like [`link`](Self::link), creating the entry from `default` first if
    /// it is missing.
    pub fn set_and_link<T: StateValue>(
        &self,
        name: &str,
        default: T,
        consumer: Option<SubscriberId>,
        as_name: &str,
    ) -> Option<ObservableBox<T>> {
        if !self.has(name) && !self.set_or_create(name, default) {
            return None;
        }
        self.link(name, consumer, as_name)
    }

    /// One-way binding to `name`, subscribed by `consumer` and named
    /// `as_name` (or `name` when empty).
    pub fn prop<T: StateValue>(
        &self,
        name: &str,
        consumer: Option<SubscriberId>,
        as_name: &str,
    ) -> Option<ObservableBox<T>> {
        let Some(cell) = self.typed::<T>(name) else {
            if !self.has(name) {
                warn!(name, "prop of unknown store entry");
            }
            return None;
        };
        let as_name = if as_name.is_empty() { name } else { as_name };
        cell.create_prop(consumer, as_name)
            .inspect_err(|err| warn!(name, %err, "store prop rejected"))
            .ok()
    }

    /// Like [`prop`](Self::prop), creating the entry from `default` first if
    /// it is missing. Reference-shaped defaults are not auto-created: a Prop
    /// would share the reference with the store.
    pub fn set_and_prop<T: StateValue>(
        &self,
        name: &str,
        default: T,
        consumer: Option<SubscriberId>,
        as_name: &str,
    ) -> Option<ObservableBox<T>> {
        if !self.has(name) {
            if !T::SHAPE.is_primitive() {
                error!(name, "prop default must be primitive-shaped; entry not created");
                return None;
            }
            if !self.set_or_create(name, default) {
                return None;
            }
        }
        self.prop(name, consumer, as_name)
    }

    /// Remove `name` and tear its box down.
    ///
    /// Returns `false` if the entry is unknown or still has subscribers.
    pub fn delete(&self, name: &str) -> bool {
        let Some(cell) = self.entry(name) else {
            warn!(name, "delete of unknown store entry");
            return false;
        };
        let subscribers = cell.subscriber_count();
        if subscribers > 0 {
            error!(name, subscribers, "store entry still has subscribers; not deleted");
            return false;
        }
        cell.teardown(None);
        self.inner.entries.borrow_mut().remove(name);
        debug!(name, "store entry deleted");
        true
    }

    /// Remove every entry, provided none has subscribers.
    pub fn clear(&self) -> bool {
        let entries: Vec<(String, Rc<dyn ErasedBox>)> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), Rc::clone(v)))
            .collect();
        let busy: Vec<(&str, usize)> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.subscriber_count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        if !busy.is_empty() {
            for (name, subscribers) in &busy {
                error!(name, subscribers, "store entry still has subscribers; store not cleared");
            }
            return false;
        }
        for (_, cell) in &entries {
            cell.teardown(None);
        }
        self.inner.entries.borrow_mut().clear();
        debug!(removed = entries.len(), "store cleared");
        true
    }

    /// Subscribe a registered id to changes of `name`.
    pub fn subscribe_to_changes_of(&self, name: &str, id: SubscriberId) -> bool {
        let Some(cell) = self.entry(name) else {
            warn!(name, subscriber = %id, "subscribe to unknown store entry");
            return false;
        };
        cell.subscribe(id)
    }

    pub fn unsubscribe_from_changes_of(&self, name: &str, id: SubscriberId) -> bool {
        match self.entry(name) {
            Some(cell) => cell.unsubscribe(id),
            None => {
                warn!(name, subscriber = %id, "unsubscribe from unknown store entry");
                false
            }
        }
    }

    /// Subscriber count of `name`, or `None` if the entry is unknown.
    #[must_use]
    pub fn number_of_subscribers_to(&self, name: &str) -> Option<usize> {
        self.entry(name).map(|cell| cell.subscriber_count())
    }

    /// Release the store. Same contract as [`clear`](Self::clear).
    pub fn about_to_be_deleted(&self) -> bool {
        self.clear()
    }

    /// Registry the store creates its boxes in.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.inner.registry
    }

    /// Whether two handles share the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
