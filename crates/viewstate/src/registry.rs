#![forbid(unsafe_code)]

//! Subscriber registry: the id space through which every notification is
//! addressed.
//!
//! # Design
//!
//! [`SubscriberRegistry`] maps [`SubscriberId`] to a `Weak` handle of a
//! [`PropertySubscriber`]. The registry never owns subscribers; boxes and
//! views own themselves and unregister on teardown (or on drop).
//!
//! A registry handle is cheap to clone and shares state. Tests build
//! isolated registries with [`SubscriberRegistry::new`]; applications use
//! the process-wide slot managed by [`init`], [`current`], and [`shutdown`].
//!
//! # Invariants
//!
//! 1. Two live registrations never share an id (ids are monotonic).
//! 2. [`unregister`](SubscriberRegistry::unregister) is idempotent.
//! 3. No borrow of the registry is held while a subscriber hook runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::{debug, error, warn};

use crate::config::StateConfig;
use crate::error::{Result, StateError};

/// Identifier handed out by a [`SubscriberRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a "property changed" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<'a> {
    /// Id of the box whose value changed.
    pub source: SubscriberId,
    /// Display name of that box, if it has one.
    pub name: Option<&'a str>,
}

/// Capability object stored in the registry.
///
/// Both hooks default to no-ops so a subscriber implements only what it
/// observes.
pub trait PropertySubscriber {
    /// Short description used by [`SubscriberRegistry::dump_diagnostics`].
    fn info(&self) -> String {
        "unknown".to_owned()
    }

    /// A box this subscriber is subscribed to changed its value.
    fn property_has_changed(&self, change: &Change<'_>) {
        let _ = change;
    }

    /// Content of an observed object this subscriber holds was mutated in
    /// place. `field` names the mutated part.
    fn object_has_changed(&self, field: &str) {
        let _ = field;
    }

    /// A property was read during a tracked render pass.
    fn property_read(&self, name: &str) {
        let _ = name;
    }
}

/// One row of [`SubscriberRegistry::dump_diagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberInfo {
    pub id: SubscriberId,
    /// `None` when the handle has already been dropped.
    pub info: Option<String>,
}

struct RegistryInner {
    entries: AHashMap<SubscriberId, Weak<dyn PropertySubscriber>>,
    next_id: u64,
    config: StateConfig,
}

/// Shared id → subscriber map.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SubscriberRegistry")
            .field("live", &inner.entries.len())
            .field("next_id", &inner.next_id)
            .finish()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberRegistry {
    /// Create an isolated registry with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    /// Create an isolated registry.
    #[must_use]
    pub fn with_config(config: StateConfig) -> Self {
        debug!(max_subscribers = config.max_subscribers, "subscriber registry created");
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                entries: AHashMap::new(),
                next_id: 0,
                config,
            })),
        }
    }

    /// Configuration this registry was created with.
    #[must_use]
    pub fn config(&self) -> StateConfig {
        self.inner.borrow().config.clone()
    }

    /// Register a subscriber and return its id.
    ///
    /// Fails only when the registry is exhausted.
    pub fn register<S: PropertySubscriber + 'static>(
        &self,
        handle: &Rc<S>,
    ) -> Result<SubscriberId> {
        let id = self.reserve_id()?;
        let weak: Weak<dyn PropertySubscriber> =
            Rc::downgrade(handle) as Weak<dyn PropertySubscriber>;
        self.attach(id, weak);
        Ok(id)
    }

    /// Hand out a fresh id without registering a handle yet.
    ///
    /// Used by subscribers that need their id before they exist.
    pub(crate) fn reserve_id(&self) -> Result<SubscriberId> {
        let mut inner = self.inner.borrow_mut();
        let live = inner.entries.len();
        if live >= inner.config.max_subscribers {
            error!(live, "subscriber registry exhausted");
            return Err(StateError::RegistryExhausted { live });
        }
        let Some(next) = inner.next_id.checked_add(1) else {
            error!(live, "subscriber id space exhausted");
            return Err(StateError::RegistryExhausted { live });
        };
        let id = SubscriberId(inner.next_id);
        inner.next_id = next;
        Ok(id)
    }

    pub(crate) fn attach(&self, id: SubscriberId, handle: Weak<dyn PropertySubscriber>) {
        let previous = self.inner.borrow_mut().entries.insert(id, handle);
        if previous.is_some() {
            error!(%id, "subscriber id attached twice");
        }
    }

    /// Remove a registration. Returns `false` if `id` was not present.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.inner.borrow_mut().entries.remove(&id).is_some();
        if !removed {
            debug!(%id, "unregister: id not present");
        }
        removed
    }

    /// Resolve an id to a live subscriber.
    #[must_use]
    pub fn lookup(&self, id: SubscriberId) -> Option<Rc<dyn PropertySubscriber>> {
        let weak = self.inner.borrow().entries.get(&id).cloned();
        weak.and_then(|w| w.upgrade())
    }

    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.borrow().entries.contains_key(&id)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Log every registration at `debug` level and return the same rows,
    /// ordered by id.
    pub fn dump_diagnostics(&self) -> Vec<SubscriberInfo> {
        let mut handles: Vec<(SubscriberId, Weak<dyn PropertySubscriber>)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(id, weak)| (*id, weak.clone()))
            .collect();
        handles.sort_by_key(|(id, _)| *id);

        debug!(count = handles.len(), "subscriber registry dump (start)");
        let rows: Vec<SubscriberInfo> = handles
            .into_iter()
            .map(|(id, weak)| {
                let info = weak.upgrade().map(|s| s.info());
                debug!(%id, info = info.as_deref().unwrap_or("<dropped>"), "subscriber");
                SubscriberInfo { id, info }
            })
            .collect();
        debug!("subscriber registry dump (end)");
        rows
    }

    /// Whether two handles share the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// ---------------------------------------------------------------------------
// Process-wide slot
// ---------------------------------------------------------------------------

thread_local! {
    static CURRENT: RefCell<Option<SubscriberRegistry>> = const { RefCell::new(None) };
}

/// Create the process-wide registry.
///
/// If one already exists it is returned unchanged and an error is logged.
pub fn init(config: StateConfig) -> SubscriberRegistry {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(existing) = slot.as_ref() {
            error!("registry::init called twice; keeping the existing registry");
            return existing.clone();
        }
        let registry = SubscriberRegistry::with_config(config);
        *slot = Some(registry.clone());
        registry
    })
}

/// The process-wide registry, if [`init`] has run.
#[must_use]
pub fn current() -> Option<SubscriberRegistry> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Release the process-wide registry. Returns `false` if none existed.
///
/// Live registrations are reported but not torn down; handles held
/// elsewhere keep the registry alive.
pub fn shutdown() -> bool {
    let taken = CURRENT.with(|slot| slot.borrow_mut().take());
    match taken {
        Some(registry) => {
            let live = registry.count();
            if live > 0 {
                warn!(live, "registry shut down with live subscribers");
            }
            true
        }
        None => {
            debug!("registry::shutdown without init");
            false
        }
    }
}
