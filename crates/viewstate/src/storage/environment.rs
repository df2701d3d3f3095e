#![forbid(unsafe_code)]

//! Environment-backed properties.
//!
//! An [`Environment`] publishes values supplied by an [`EnvBackend`] (color
//! mode, font scale, language, ...) into a [`LocalStorage`]. Each published
//! key is held through a Prop, so the environment counts as a subscriber of
//! the entry until [`Environment::about_to_be_deleted`].

use std::fmt;

use tracing::{debug, warn};

use crate::reactive::ObservableBox;
use crate::storage::LocalStorage;

/// A value the environment can publish.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for EnvValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for EnvValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for EnvValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<String> for EnvValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for EnvValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Source of environment values.
pub trait EnvBackend {
    /// Current value for `key`, or `None` when the backend does not know it.
    fn value(&self, key: &str) -> Option<EnvValue>;
}

impl<F> EnvBackend for F
where
    F: Fn(&str) -> Option<EnvValue>,
{
    fn value(&self, key: &str) -> Option<EnvValue> {
        self(key)
    }
}

enum EnvProp {
    Bool(ObservableBox<bool>),
    Number(ObservableBox<f64>),
    Text(ObservableBox<String>),
}

impl EnvProp {
    fn get(&self) -> EnvValue {
        match self {
            Self::Bool(p) => EnvValue::Bool(p.get()),
            Self::Number(p) => EnvValue::Number(p.get()),
            Self::Text(p) => EnvValue::Text(p.get()),
        }
    }

    fn teardown(&self) {
        match self {
            Self::Bool(p) => p.teardown(None),
            Self::Number(p) => p.teardown(None),
            Self::Text(p) => p.teardown(None),
        }
    }
}

/// Publishes backend values into a store.
pub struct Environment<B> {
    backend: B,
    storage: LocalStorage,
    props: Vec<(String, EnvProp)>,
}

impl<B: EnvBackend> fmt::Debug for Environment<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl<B: EnvBackend> Environment<B> {
    #[must_use]
    pub fn new(backend: B, storage: &LocalStorage) -> Self {
        Self {
            backend,
            storage: storage.clone(),
            props: Vec::new(),
        }
    }

    /// Publish `key`, using the backend value if it has one and `default`
    /// otherwise.
    ///
    /// Returns `false` without touching the store when `key` already exists
    /// there.
    pub fn env_prop(&mut self, key: &str, default: impl Into<EnvValue>) -> bool {
        if self.storage.has(key) {
            warn!(key, "environment key already in store; not published");
            return false;
        }
        let value = self.backend.value(key).unwrap_or_else(|| default.into());
        let prop = match value {
            EnvValue::Bool(v) => self.storage.set_and_prop(key, v, None, key).map(EnvProp::Bool),
            EnvValue::Number(v) => self
                .storage
                .set_and_prop(key, v, None, key)
                .map(EnvProp::Number),
            EnvValue::Text(v) => self.storage.set_and_prop(key, v, None, key).map(EnvProp::Text),
        };
        let Some(prop) = prop else {
            warn!(key, "environment prop not created");
            return false;
        };
        debug!(key, value = %prop.get(), "environment prop published");
        self.props.push((key.to_owned(), prop));
        true
    }

    /// [`env_prop`](Self::env_prop) for each `(key, default)` pair. Returns
    /// how many keys were published.
    pub fn env_props<K, V>(&mut self, props: impl IntoIterator<Item = (K, V)>) -> usize
    where
        K: AsRef<str>,
        V: Into<EnvValue>,
    {
        props
            .into_iter()
            .map(|(k, v)| self.env_prop(k.as_ref(), v))
            .filter(|published| *published)
            .count()
    }

    /// Published keys in publication order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.props.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Value of a published key as seen through its prop.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<EnvValue> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, p)| p.get())
    }

    /// Push a backend change into the store.
    pub fn on_value_changed(&self, key: &str, value: EnvValue) -> bool {
        let ok = match &value {
            EnvValue::Bool(v) => self.storage.set(key, *v),
            EnvValue::Number(v) => self.storage.set(key, *v),
            EnvValue::Text(v) => self.storage.set(key, v.clone()),
        };
        if ok {
            debug!(key, %value, "environment value changed");
        } else {
            warn!(key, %value, "environment value change rejected");
        }
        ok
    }

    /// Tear down every prop and delete the published keys from the store.
    ///
    /// Returns how many keys were removed. A key another consumer still
    /// subscribes to stays in the store.
    pub fn about_to_be_deleted(&mut self) -> usize {
        let mut released = 0;
        for (key, prop) in self.props.drain(..) {
            prop.teardown();
            if self.storage.delete(&key) {
                released += 1;
            } else {
                warn!(key, "environment key still in use; left in store");
            }
        }
        released
    }
}
