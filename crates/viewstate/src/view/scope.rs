#![forbid(unsafe_code)]

//! View construction: the builder and the scope a component is initialized
//! in.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::{debug, error, warn};

use crate::config::ParamPolicy;
use crate::error::{Result, StateError};
use crate::params::Params;
use crate::reactive::erased::downcast;
use crate::reactive::{ErasedBox, ObservableBox};
use crate::registry::{PropertySubscriber, SubscriberId, SubscriberRegistry};
use crate::storage::LocalStorage;
use crate::value::StateValue;
use crate::view::shared::{Lifecycle, ViewCore};
use crate::view::{Component, View};

/// Builder for a [`View`].
///
/// A child view (see [`parent`](Self::parent)) inherits its parent's store
/// and provided properties; a top-level view may be handed a store.
#[derive(Debug)]
#[must_use]
pub struct ViewBuilder {
    registry: SubscriberRegistry,
    id: String,
    parent: Option<SubscriberId>,
    provided: AHashMap<String, Rc<dyn ErasedBox>>,
    storage: Option<LocalStorage>,
    params: Option<Params>,
    policy: ParamPolicy,
}

impl ViewBuilder {
    pub(super) fn new(registry: &SubscriberRegistry, id: String) -> Self {
        Self {
            registry: registry.clone(),
            id,
            parent: None,
            provided: AHashMap::new(),
            storage: None,
            params: None,
            policy: registry.config().param_policy,
        }
    }

    /// Make this a child of `parent`.
    pub fn parent(mut self, parent: &ViewCore) -> Self {
        self.parent = Some(parent.subscriber_id());
        self.provided = parent.provided.borrow().clone();
        self.storage = Some(parent.storage());
        self
    }

    /// Store for a top-level view. Ignored for child views, which always
    /// share the parent's store.
    pub fn storage(mut self, storage: &LocalStorage) -> Self {
        if self.parent.is_some() {
            warn!(view = %self.id, "child view keeps the parent's storage");
        } else {
            self.storage = Some(storage.clone());
        }
        self
    }

    /// Initial parameters, applied after the component is built.
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn policy(mut self, policy: ParamPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register the view, build its component in a [`ViewScope`], then apply
    /// the initial parameters.
    ///
    /// On failure everything the scope created is torn down again.
    pub fn build<C, F>(self, init: F) -> Result<View<C>>
    where
        C: Component,
        F: FnOnce(&mut ViewScope<'_>) -> Result<C>,
    {
        let subscriber_id = self.registry.reserve_id()?;
        let core = Rc::new(ViewCore {
            id: self.id,
            subscriber_id,
            registry: self.registry.clone(),
            parent: self.parent,
            state: Cell::new(Lifecycle::Constructed),
            deps: RefCell::new(BTreeSet::new()),
            needs_render: Cell::new(false),
            owned: RefCell::new(Vec::new()),
            derived: RefCell::new(Vec::new()),
            watches: RefCell::new(AHashMap::new()),
            provided: RefCell::new(self.provided),
            storage: RefCell::new(self.storage),
            policy: self.policy,
            render_count: Cell::new(0),
        });
        let weak: Weak<dyn PropertySubscriber> =
            Rc::downgrade(&core) as Weak<dyn PropertySubscriber>;
        self.registry.attach(subscriber_id, weak);
        debug!(view = %core.id, id = %subscriber_id, parent = ?core.parent, "view registered");

        let mut scope = ViewScope { core: &core };
        let component = match init(&mut scope) {
            Ok(component) => component,
            Err(err) => {
                error!(view = %core.id, %err, "view construction failed");
                core.release();
                return Err(err);
            }
        };
        let view = View { core, component };
        if let Some(params) = self.params
            && let Err(err) = view.update_with_value_params(&params)
        {
            error!(view = %view.id(), %err, "initial parameters rejected");
            view.core.release();
            return Err(err);
        }
        Ok(view)
    }
}

/// Construction context for a component: creates boxes owned by the view
/// and bindings consumed by it.
pub struct ViewScope<'a> {
    core: &'a Rc<ViewCore>,
}

impl ViewScope<'_> {
    /// View-owned state box named `name`.
    pub fn state<T: StateValue>(&mut self, name: &str, init: T) -> Result<ObservableBox<T>> {
        let owner = Some(self.core.subscriber_id);
        let cell = ObservableBox::with_owner(&self.core.registry, init, owner, name)?;
        self.core.adopt_owned(Rc::new(cell.clone()));
        Ok(cell)
    }

    /// Two-way binding to `source` (typically a parent's box).
    pub fn link<T: StateValue>(
        &mut self,
        source: &ObservableBox<T>,
        as_name: &str,
    ) -> Result<ObservableBox<T>> {
        let cell = source.create_link(Some(self.core.subscriber_id), as_name)?;
        self.core.adopt_derived(Rc::new(cell.clone()));
        Ok(cell)
    }

    /// One-way binding to `source`.
    pub fn prop<T: StateValue>(
        &mut self,
        source: &ObservableBox<T>,
        as_name: &str,
    ) -> Result<ObservableBox<T>> {
        let cell = source.create_prop(Some(self.core.subscriber_id), as_name)?;
        self.core.adopt_derived(Rc::new(cell.clone()));
        Ok(cell)
    }

    /// Two-way binding to store entry `key`, created from `default` if
    /// missing.
    pub fn storage_link<T: StateValue>(
        &mut self,
        key: &str,
        default: T,
        as_name: &str,
    ) -> Result<ObservableBox<T>> {
        let store = self.core.storage();
        let cell = store
            .set_and_link(key, default, Some(self.core.subscriber_id), as_name)
            .ok_or_else(|| store_binding_error::<T>(&store, key))?;
        self.core.adopt_derived(Rc::new(cell.clone()));
        Ok(cell)
    }

    /// One-way binding to store entry `key`, created from `default` if
    /// missing.
    pub fn storage_prop<T: StateValue>(
        &mut self,
        key: &str,
        default: T,
        as_name: &str,
    ) -> Result<ObservableBox<T>> {
        let store = self.core.storage();
        let cell = store
            .set_and_prop(key, default, Some(self.core.subscriber_id), as_name)
            .ok_or_else(|| store_binding_error::<T>(&store, key))?;
        self.core.adopt_derived(Rc::new(cell.clone()));
        Ok(cell)
    }

    /// Offer `cell` to descendants under `name`.
    pub fn provide<T: StateValue>(&mut self, name: &str, cell: &ObservableBox<T>) -> Result<()> {
        let mut provided = self.core.provided.borrow_mut();
        if provided.contains_key(name) {
            error!(view = %self.core.id, name, "duplicate provide");
            return Err(StateError::DuplicateProvide { name: name.to_owned() });
        }
        provided.insert(name.to_owned(), Rc::new(cell.clone()));
        Ok(())
    }

    /// Two-way binding to the box an ancestor provided under `name`.
    pub fn consume<T: StateValue>(
        &mut self,
        name: &str,
        as_name: &str,
    ) -> Result<ObservableBox<T>> {
        let provided = self.core.provided.borrow().get(name).cloned();
        let Some(provided) = provided else {
            error!(view = %self.core.id, name, "consume of missing provide");
            return Err(StateError::MissingProvide { name: name.to_owned() });
        };
        let Some(source) = downcast::<T>(provided.as_ref()) else {
            warn!(
                view = %self.core.id,
                name,
                provided = provided.value_type(),
                "consume type mismatch"
            );
            return Err(StateError::TypeMismatch {
                name: name.to_owned(),
                expected: type_name::<T>(),
            });
        };
        self.link(&source, as_name)
    }

    /// Call `callback` on every change of the property named `name`,
    /// whether or not the last render read it.
    pub fn declare_watch(&mut self, name: &str, callback: impl Fn(&str) + 'static) {
        let previous = self
            .core
            .watches
            .borrow_mut()
            .insert(name.to_owned(), Rc::new(callback));
        if previous.is_some() {
            debug!(view = %self.core.id, name, "watch replaced");
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.core.id
    }

    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        self.core.subscriber_id
    }

    /// The view's store (see [`ViewCore::storage`]).
    pub fn storage(&self) -> LocalStorage {
        self.core.storage()
    }
}

fn store_binding_error<T: StateValue>(store: &LocalStorage, key: &str) -> StateError {
    if store.has(key) {
        StateError::TypeMismatch {
            name: key.to_owned(),
            expected: type_name::<T>(),
        }
    } else {
        StateError::UnknownKey { name: key.to_owned() }
    }
}
