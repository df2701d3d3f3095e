#![forbid(unsafe_code)]

//! Process-wide application store.
//!
//! The application store is one [`LocalStorage`] kept in a thread-local
//! slot, managed like the registry slot: [`init`] creates it, [`current`]
//! reads it, [`get_or_create`] creates an empty one on first use, and
//! [`shutdown`] releases it.
//!
//! The free functions forward to the slot's store and create it on demand.
//!
//! # Failure Modes
//!
//! - **Second [`init`]**: logged at `error`; the existing store is kept.
//! - **Use before [`init`]**: logged at `warn`; an empty store is created
//!   in the process-wide registry (itself created from
//!   [`StateConfig::from_env`] if missing).
//! - **[`shutdown`] with bound entries**: refused like
//!   [`LocalStorage::clear`]; the store stays in the slot.

use std::cell::RefCell;

use tracing::{debug, error, warn};

use crate::config::StateConfig;
use crate::params::Params;
use crate::reactive::ObservableBox;
use crate::registry::{self, SubscriberId, SubscriberRegistry};
use crate::storage::LocalStorage;
use crate::value::StateValue;

thread_local! {
    static APP: RefCell<Option<LocalStorage>> = const { RefCell::new(None) };
}

/// Create the application store from `params`.
///
/// If one already exists it is returned unchanged and an error is logged.
pub fn init(registry: &SubscriberRegistry, params: &Params) -> LocalStorage {
    if let Some(existing) = current() {
        error!("app store init called twice; keeping the existing store");
        return existing;
    }
    let store = LocalStorage::from_params(registry, params);
    debug!(entries = store.size(), "app store created");
    APP.with(|slot| *slot.borrow_mut() = Some(store.clone()));
    store
}

/// The application store, if one exists.
#[must_use]
pub fn current() -> Option<LocalStorage> {
    APP.with(|slot| slot.borrow().clone())
}

/// The application store, creating an empty one if [`init`] never ran.
pub fn get_or_create() -> LocalStorage {
    if let Some(store) = current() {
        return store;
    }
    warn!("app store missing; creating an empty one");
    let registry = registry::current().unwrap_or_else(|| registry::init(StateConfig::from_env()));
    init(&registry, &Params::new())
}

/// Release the application store.
///
/// Returns `false` if there was none, or if an entry still has subscribers;
/// in the latter case nothing is removed.
pub fn shutdown() -> bool {
    let Some(store) = current() else {
        debug!("app store shutdown without init");
        return false;
    };
    if !store.about_to_be_deleted() {
        warn!(entries = store.size(), "app store still bound; not shut down");
        return false;
    }
    APP.with(|slot| slot.borrow_mut().take());
    debug!("app store shut down");
    true
}

// ---------------------------------------------------------------------------
// Forwarders
// ---------------------------------------------------------------------------

/// [`LocalStorage::link`] on the application store.
pub fn link<T: StateValue>(
    name: &str,
    consumer: Option<SubscriberId>,
    as_name: &str,
) -> Option<ObservableBox<T>> {
    get_or_create().link(name, consumer, as_name)
}

/// [`LocalStorage::set_and_link`] on the application store.
pub fn set_and_link<T: StateValue>(
    name: &str,
    default: T,
    consumer: Option<SubscriberId>,
    as_name: &str,
) -> Option<ObservableBox<T>> {
    get_or_create().set_and_link(name, default, consumer, as_name)
}

/// [`LocalStorage::prop`] on the application store.
pub fn prop<T: StateValue>(
    name: &str,
    consumer: Option<SubscriberId>,
    as_name: &str,
) -> Option<ObservableBox<T>> {
    get_or_create().prop(name, consumer, as_name)
}

/// [`LocalStorage::set_and_prop`] on the application store.
pub fn set_and_prop<T: StateValue>(
    name: &str,
    default: T,
    consumer: Option<SubscriberId>,
    as_name: &str,
) -> Option<ObservableBox<T>> {
    get_or_create().set_and_prop(name, default, consumer, as_name)
}

#[must_use]
pub fn has(name: &str) -> bool {
    get_or_create().has(name)
}

#[must_use]
pub fn get<T: StateValue>(name: &str) -> Option<T> {
    get_or_create().get(name)
}

pub fn set<T: StateValue>(name: &str, value: T) -> bool {
    get_or_create().set(name, value)
}

pub fn set_or_create<T: StateValue>(name: &str, value: T) -> bool {
    get_or_create().set_or_create(name, value)
}

pub fn delete(name: &str) -> bool {
    get_or_create().delete(name)
}

#[must_use]
pub fn keys() -> Vec<String> {
    get_or_create().keys()
}

#[must_use]
pub fn size() -> usize {
    get_or_create().size()
}

pub fn clear() -> bool {
    get_or_create().clear()
}

#[must_use]
pub fn number_of_subscribers_to(name: &str) -> Option<usize> {
    get_or_create().number_of_subscribers_to(name)
}

pub fn subscribe_to_changes_of(name: &str, id: SubscriberId) -> bool {
    get_or_create().subscribe_to_changes_of(name, id)
}

pub fn unsubscribe_from_changes_of(name: &str, id: SubscriberId) -> bool {
    get_or_create().unsubscribe_from_changes_of(name, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_lifecycle() {
        assert!(current().is_none());
        let registry = SubscriberRegistry::new();
        let store = init(&registry, &Params::new().with("theme", "dark".to_string()));
        let again = init(&registry, &Params::new().with("other", 1_i32));
        assert!(store.ptr_eq(&again));
        assert_eq!(keys(), ["theme"]);

        let theme = link::<String>("theme", None, "t").unwrap();
        theme.set("light".into()).unwrap();
        assert_eq!(get::<String>("theme").as_deref(), Some("light"));
        assert_eq!(number_of_subscribers_to("theme"), Some(1));

        assert!(!shutdown());
        assert!(current().is_some_and(|s| s.ptr_eq(&store)));

        theme.teardown(None);
        assert!(shutdown());
        assert!(current().is_none());
        assert!(!shutdown());
    }

    #[test]
    fn first_use_creates_an_empty_store() {
        assert!(current().is_none());
        assert!(set_or_create("count", 1_i32));
        assert!(registry::current().is_some());
        assert!(has("count"));
        assert_eq!(size(), 1);

        let flag = set_and_prop("flag", true, None, "").unwrap();
        flag.set(false).unwrap();
        assert_eq!(get::<bool>("flag"), Some(true));
        assert!(set("flag", false));
        assert!(set("flag", true));
        assert!(flag.get());

        assert!(!clear());
        drop(flag);
        assert!(delete("count"));
        assert!(shutdown());
        assert!(registry::shutdown());
    }
}
