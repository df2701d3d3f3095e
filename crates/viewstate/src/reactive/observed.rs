#![forbid(unsafe_code)]

//! Observed objects: shared content that announces its own mutations.
//!
//! An [`ObservedObject<T>`] is a reference-shaped value. Every box holding
//! one is recorded as an owning property: it joins when the object is
//! stored (construction, `set`, or resynchronization from a source) and
//! leaves when the value is replaced, the box is torn down, or the box is
//! dropped.
//!
//! A mutation through [`update`](ObservedObject::update) or
//! [`set_field`](ObservedObject::set_field) reaches each owning box, which
//! then propagates exactly like
//! [`notify_has_changed`](crate::ObservableBox::notify_has_changed). A
//! binding whose live source holds the same object leaves the change to
//! that source, so every subscriber hears about a mutation once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::registry::{SubscriberId, SubscriberRegistry};
use crate::value::{StateValue, ValueShape};

struct ObservedInner<T> {
    registry: SubscriberRegistry,
    value: RefCell<T>,
    /// Ordered set of owning box ids.
    owners: RefCell<Vec<SubscriberId>>,
}

/// Shared handle to content whose mutations notify the boxes holding it.
pub struct ObservedObject<T> {
    inner: Rc<ObservedInner<T>>,
}

impl<T> Clone for ObservedObject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservedObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedObject")
            .field("value", &*self.inner.value.borrow())
            .field("owners", &self.inner.owners.borrow().len())
            .finish()
    }
}

impl<T: fmt::Debug + 'static> ObservedObject<T> {
    /// Wrap `value`. Owners are resolved through `registry`.
    #[must_use]
    pub fn new(registry: &SubscriberRegistry, value: T) -> Self {
        Self {
            inner: Rc::new(ObservedInner {
                registry: registry.clone(),
                value: RefCell::new(value),
                owners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Read the content. No notification.
    ///
    /// # Panics
    ///
    /// Panics if the closure mutates this same object.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Mutate the content and notify every owner, whether or not anything
    /// actually changed.
    pub fn update<R>(&self, field: &str, f: impl FnOnce(&mut T) -> R) -> R {
        let out = f(&mut *self.inner.value.borrow_mut());
        self.notify_property_has_changed(field);
        out
    }

    /// Write one field selected by `slot`. An equal value is a no-op.
    ///
    /// Returns whether the field changed.
    pub fn set_field<V: PartialEq>(
        &self,
        field: &str,
        value: V,
        slot: impl FnOnce(&mut T) -> &mut V,
    ) -> bool {
        {
            let mut content = self.inner.value.borrow_mut();
            let target = slot(&mut *content);
            if *target == value {
                debug!(field, "observed field set with unchanged value ignored");
                return false;
            }
            *target = value;
        }
        self.notify_property_has_changed(field);
        true
    }

    /// Tell every owner that `field` changed.
    pub fn notify_property_has_changed(&self, field: &str) {
        let owners = self.inner.owners.borrow().clone();
        debug!(field, owners = owners.len(), "observed object changed");

        let mut stale = Vec::new();
        for id in owners {
            match self.inner.registry.lookup(id) {
                Some(owner) => owner.object_has_changed(field),
                None => {
                    error!(owner = %id, field, "observed object: unknown owner id");
                    stale.push(id);
                }
            }
        }
        if !stale.is_empty() {
            self.inner.owners.borrow_mut().retain(|id| !stale.contains(id));
        }
    }

    /// Record a registered box as an owner. Returns `false` if it already
    /// was one or if `id` is not in the registry.
    pub fn add_owning_property(&self, id: SubscriberId) -> bool {
        if !self.inner.registry.contains(id) {
            warn!(owner = %id, "observed object: owner not registered");
            return false;
        }
        let mut owners = self.inner.owners.borrow_mut();
        if owners.contains(&id) {
            return false;
        }
        owners.push(id);
        true
    }

    /// Drop an owner. Returns `false` if it was not one.
    pub fn remove_owning_property(&self, id: SubscriberId) -> bool {
        let mut owners = self.inner.owners.borrow_mut();
        let before = owners.len();
        owners.retain(|o| *o != id);
        owners.len() != before
    }

    /// Owning box ids in notification order.
    #[must_use]
    pub fn owners(&self) -> Vec<SubscriberId> {
        self.inner.owners.borrow().clone()
    }

    /// Whether two handles share the same content.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug + 'static> StateValue for ObservedObject<T> {
    const SHAPE: ValueShape = ValueShape::Reference;

    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }

    fn adopt_owner(&self, owner: SubscriberId) {
        self.add_owning_property(owner);
    }

    fn release_owner(&self, owner: SubscriberId) {
        self.remove_owning_property(owner);
    }
}
